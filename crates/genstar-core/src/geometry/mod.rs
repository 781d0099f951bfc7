//! Planar geometry for spatial localization.
//!
//! Coordinates are treated as planar; reprojection is left to the caller.

use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Attempts made to find an interior point by rejection sampling.
const RANDOM_POINT_ATTEMPTS: usize = 1000;

/// A planar coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point at `distance` from this one in direction `angle` (radians).
    pub fn offset(&self, distance: f64, angle: f64) -> Point {
        Point::new(
            self.x + distance * angle.cos(),
            self.y + distance * angle.sin(),
        )
    }
}

/// Axis aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    fn of<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bbox = BoundingBox {
            min: first,
            max: first,
        };
        for p in iter {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        Some(bbox)
    }

    fn union(self, other: BoundingBox) -> BoundingBox {
        BoundingBox {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }
}

/// A polygon with one exterior ring and optional holes.
///
/// Rings need not be closed; the last vertex connects back to the first.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<Point>,
    pub holes: Vec<Vec<Point>>,
}

impl Polygon {
    pub fn new(exterior: Vec<Point>) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    /// Axis aligned rectangle, convenient for grids of nests.
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(vec![
            Point::new(min_x, min_y),
            Point::new(max_x, min_y),
            Point::new(max_x, max_y),
            Point::new(min_x, max_y),
        ])
    }

    pub fn with_hole(mut self, hole: Vec<Point>) -> Self {
        self.holes.push(hole);
        self
    }

    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|h| ring_area(h).abs()).sum();
        (ring_area(&self.exterior).abs() - holes).max(0.0)
    }

    pub fn contains(&self, p: &Point) -> bool {
        ring_contains(&self.exterior, p) && !self.holes.iter().any(|h| ring_contains(h, p))
    }

    pub fn centroid(&self) -> Option<Point> {
        ring_centroid(&self.exterior)
    }

    /// Distance from `p` to the polygon, zero when inside.
    pub fn distance_to(&self, p: &Point) -> f64 {
        if self.contains(p) {
            return 0.0;
        }
        std::iter::once(&self.exterior)
            .chain(self.holes.iter())
            .map(|ring| ring_distance(ring, p))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::of(&self.exterior)
    }
}

/// Geometry of a nest or census feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    pub fn area(&self) -> f64 {
        match self {
            Geometry::Point(_) => 0.0,
            Geometry::Polygon(p) => p.area(),
            Geometry::MultiPolygon(ps) => ps.iter().map(Polygon::area).sum(),
        }
    }

    /// Area weighted centroid.
    pub fn centroid(&self) -> Option<Point> {
        match self {
            Geometry::Point(p) => Some(*p),
            Geometry::Polygon(p) => p.centroid(),
            Geometry::MultiPolygon(ps) => {
                let total: f64 = ps.iter().map(Polygon::area).sum();
                if total <= 0.0 {
                    return ps.first().and_then(Polygon::centroid);
                }
                let (x, y) = ps.iter().fold((0.0, 0.0), |(x, y), p| {
                    match p.centroid() {
                        Some(c) => (x + c.x * p.area(), y + c.y * p.area()),
                        None => (x, y),
                    }
                });
                Some(Point::new(x / total, y / total))
            }
        }
    }

    pub fn contains(&self, p: &Point) -> bool {
        match self {
            Geometry::Point(q) => q == p,
            Geometry::Polygon(poly) => poly.contains(p),
            Geometry::MultiPolygon(ps) => ps.iter().any(|poly| poly.contains(p)),
        }
    }

    /// Distance from `p` to the geometry, zero when inside.
    pub fn distance_to(&self, p: &Point) -> f64 {
        match self {
            Geometry::Point(q) => q.distance(p),
            Geometry::Polygon(poly) => poly.distance_to(p),
            Geometry::MultiPolygon(ps) => ps
                .iter()
                .map(|poly| poly.distance_to(p))
                .fold(f64::INFINITY, f64::min),
        }
    }

    /// Centroid to centroid distance between two geometries.
    pub fn centroid_distance(&self, other: &Geometry) -> Option<f64> {
        Some(self.centroid()?.distance(&other.centroid()?))
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            Geometry::Point(p) => BoundingBox::of(std::iter::once(p)),
            Geometry::Polygon(poly) => poly.bounding_box(),
            Geometry::MultiPolygon(ps) => ps
                .iter()
                .filter_map(Polygon::bounding_box)
                .reduce(BoundingBox::union),
        }
    }

    /// Draws a point uniformly inside the geometry.
    ///
    /// Multi polygons pick a part proportionally to its area first. Returns
    /// `None` when rejection sampling finds no interior point.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Point> {
        match self {
            Geometry::Point(p) => Some(*p),
            Geometry::Polygon(poly) => random_point_in(poly, rng),
            Geometry::MultiPolygon(ps) => {
                let total: f64 = ps.iter().map(Polygon::area).sum();
                if total <= 0.0 {
                    return ps.first().and_then(Polygon::centroid);
                }
                let mut pick = rng.random_range(0.0..total);
                for poly in ps {
                    let area = poly.area();
                    if pick < area {
                        return random_point_in(poly, rng);
                    }
                    pick -= area;
                }
                ps.last().and_then(|poly| random_point_in(poly, rng))
            }
        }
    }
}

fn random_point_in<R: Rng + ?Sized>(poly: &Polygon, rng: &mut R) -> Option<Point> {
    let bbox = poly.bounding_box()?;
    if bbox.min.x >= bbox.max.x || bbox.min.y >= bbox.max.y {
        return poly.centroid();
    }
    (0..RANDOM_POINT_ATTEMPTS)
        .map(|_| {
            Point::new(
                rng.random_range(bbox.min.x..bbox.max.x),
                rng.random_range(bbox.min.y..bbox.max.y),
            )
        })
        .find(|p| poly.contains(p))
}

// Signed shoelace area.
fn ring_area(ring: &[Point]) -> f64 {
    edges(ring).map(|(a, b)| a.x * b.y - b.x * a.y).sum::<f64>() / 2.0
}

fn ring_centroid(ring: &[Point]) -> Option<Point> {
    if ring.is_empty() {
        return None;
    }
    let area = ring_area(ring);
    if area.abs() < f64::EPSILON {
        let n = ring.len() as f64;
        let (x, y) = ring.iter().fold((0.0, 0.0), |(x, y), p| (x + p.x, y + p.y));
        return Some(Point::new(x / n, y / n));
    }
    let (cx, cy) = edges(ring).fold((0.0, 0.0), |(cx, cy), (a, b)| {
        let cross = a.x * b.y - b.x * a.y;
        (cx + (a.x + b.x) * cross, cy + (a.y + b.y) * cross)
    });
    Some(Point::new(cx / (6.0 * area), cy / (6.0 * area)))
}

// Even-odd ray casting.
fn ring_contains(ring: &[Point], p: &Point) -> bool {
    let mut inside = false;
    for (a, b) in edges(ring) {
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

fn ring_distance(ring: &[Point], p: &Point) -> f64 {
    edges(ring)
        .map(|(a, b)| segment_distance(a, b, p))
        .fold(f64::INFINITY, f64::min)
}

fn segment_distance(a: &Point, b: &Point, p: &Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return a.distance(p);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    Point::new(a.x + t * dx, a.y + t * dy).distance(p)
}

fn edges(ring: &[Point]) -> impl Iterator<Item = (&Point, &Point)> {
    let n = ring.len();
    (0..n).map(move |i| (&ring[i], &ring[(i + 1) % n]))
}

/// A feature property value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl PropertyValue {
    /// Numeric view; text holding a number also qualifies.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::Text(s) => s.trim().parse().ok(),
            PropertyValue::Bool(_) => None,
        }
    }

    /// Textual view, used to join features on identifiers.
    pub fn as_text(&self) -> String {
        match self {
            PropertyValue::Bool(b) => b.to_string(),
            PropertyValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            PropertyValue::Number(n) => n.to_string(),
            PropertyValue::Text(s) => s.clone(),
        }
    }
}

/// A geometry with an identifier and properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub geometry: Geometry,
    pub properties: IndexMap<String, PropertyValue>,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            geometry,
            properties: IndexMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Looks up a property, ignoring case.
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .get(name)
            .or_else(|| {
                self.properties
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
    }

    /// Numeric spatial feature, ignoring case in the name.
    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.property(name).and_then(PropertyValue::as_f64)
    }
}
