//! GeoJSON writers.

use std::io;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

/// An axis aligned rectangle feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    pub id: String,
    pub min: (f64, f64),
    pub max: (f64, f64),
    pub properties: Vec<(String, Value)>,
}

impl Rectangle {
    pub fn new(id: &str, min: (f64, f64), max: (f64, f64)) -> Self {
        Self {
            id: id.to_string(),
            min,
            max,
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.push((name.to_string(), value.into()));
        self
    }

    fn to_feature(&self) -> Value {
        let (x0, y0) = self.min;
        let (x1, y1) = self.max;
        let properties: Map<String, Value> = self.properties.iter().cloned().collect();
        json!({
            "type": "Feature",
            "id": self.id,
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]],
            },
            "properties": properties,
        })
    }
}

/// Writes a feature collection of `rectangles` to `dir/name`.
pub fn write_rectangles(
    dir: &Path,
    name: &str,
    crs: Option<&str>,
    rectangles: &[Rectangle],
) -> io::Result<PathBuf> {
    let mut collection = json!({
        "type": "FeatureCollection",
        "features": rectangles.iter().map(Rectangle::to_feature).collect::<Vec<_>>(),
    });
    if let Some(crs) = crs {
        collection["crs"] = json!(crs);
    }
    let path = dir.join(name);
    std::fs::write(&path, collection.to_string())?;
    Ok(path)
}
