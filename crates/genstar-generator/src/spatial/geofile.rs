//! GeoJSON geometry files.

use std::path::Path;

use genstar_core::{Feature, Geometry, GenstarError, Point, Polygon, PropertyValue, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

/// Features read from one geometry file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoFile {
    /// Coordinate reference system declared by the file.
    pub crs: Option<String>,
    pub features: Vec<Feature>,
}

impl GeoFile {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            crs: None,
            features,
        }
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }
}

/// Reads nest, census and covariate geometry files.
pub trait GeometryReader {
    fn read(&self, path: &Path) -> Result<GeoFile>;
}

/// Reads GeoJSON feature collections.
///
/// `Point`, `Polygon` and `MultiPolygon` geometries are supported. The
/// collection may carry a `crs`, either as a plain string or as a named
/// crs object. Features without an `id` are numbered in file order.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonReader;

impl GeoJsonReader {
    pub fn new() -> Self {
        Self
    }

    /// Parses a feature collection held in memory; `path` is only used in errors.
    pub fn parse(&self, path: &Path, contents: &str) -> Result<GeoFile> {
        let raw: RawCollection =
            serde_json::from_str(contents).map_err(|e| GenstarError::geometry(path, e.to_string()))?;

        let crs = raw.crs.as_ref().and_then(crs_name);
        let features = raw
            .features
            .into_iter()
            .enumerate()
            .map(|(i, f)| f.into_feature(i).map_err(|m| GenstarError::geometry(path, m)))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            event = "geofile_loaded",
            path = %path.display(),
            features = features.len(),
            crs = crs.as_deref().unwrap_or("none"),
        );
        Ok(GeoFile { crs, features })
    }
}

impl GeometryReader for GeoJsonReader {
    fn read(&self, path: &Path) -> Result<GeoFile> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| GenstarError::geometry(path, e.to_string()))?;
        self.parse(path, &contents)
    }
}

#[derive(Deserialize)]
struct RawCollection {
    #[serde(default)]
    crs: Option<serde_json::Value>,
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    id: Option<serde_json::Value>,
    geometry: RawGeometry,
    #[serde(default)]
    properties: IndexMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Point { coordinates: Vec<f64> },
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
}

impl RawFeature {
    fn into_feature(self, index: usize) -> std::result::Result<Feature, String> {
        let id = match self.id {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => index.to_string(),
        };
        let geometry = match self.geometry {
            RawGeometry::Point { coordinates } => Geometry::Point(point(&coordinates)?),
            RawGeometry::Polygon { coordinates } => Geometry::Polygon(polygon(&coordinates)?),
            RawGeometry::MultiPolygon { coordinates } => Geometry::MultiPolygon(
                coordinates
                    .iter()
                    .map(|p| polygon(p))
                    .collect::<std::result::Result<_, _>>()?,
            ),
        };

        let mut feature = Feature::new(id, geometry);
        for (name, value) in self.properties {
            let value = match value {
                serde_json::Value::Bool(b) => PropertyValue::Bool(b),
                serde_json::Value::Number(n) => match n.as_f64() {
                    Some(n) => PropertyValue::Number(n),
                    None => continue,
                },
                serde_json::Value::String(s) => PropertyValue::Text(s),
                _ => continue,
            };
            feature = feature.with_property(name, value);
        }
        Ok(feature)
    }
}

fn crs_name(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        other => other
            .get("properties")
            .and_then(|p| p.get("name"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string),
    }
}

fn point(coordinates: &[f64]) -> std::result::Result<Point, String> {
    match coordinates {
        [x, y, ..] => Ok(Point::new(*x, *y)),
        _ => Err(format!("position needs two coordinates, got {}", coordinates.len())),
    }
}

fn ring(coordinates: &[Vec<f64>]) -> std::result::Result<Vec<Point>, String> {
    let mut points = coordinates
        .iter()
        .map(|c| point(c))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return Err("polygon ring needs at least three positions".to_string());
    }
    Ok(points)
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> std::result::Result<Polygon, String> {
    let (exterior, holes) = rings
        .split_first()
        .ok_or_else(|| "polygon without exterior ring".to_string())?;
    let mut polygon = Polygon::new(ring(exterior)?);
    for hole in holes {
        polygon = polygon.with_hole(ring(hole)?);
    }
    Ok(polygon)
}
