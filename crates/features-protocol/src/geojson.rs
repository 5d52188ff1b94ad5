//! GeoJSON geometry types.
//!
//! Geometries appear as filter operands (spatial CQL predicates) and in
//! feature records returned by backends. Only the coordinate arrays are
//! modelled; positions keep any Z/M ordinate they carry.

use serde::{Deserialize, Serialize};

/// A position: longitude, latitude and optional extra ordinates.
pub type Position = Vec<f64>;

/// GeoJSON geometry types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    /// Create a point geometry.
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry::Point(vec![lon, lat])
    }

    /// Create a polygon from a single outer ring.
    pub fn polygon(ring: Vec<Position>) -> Self {
        Geometry::Polygon(vec![ring])
    }

    /// Rectangular polygon covering a west/south/east/north box.
    pub fn from_bbox(west: f64, south: f64, east: f64, north: f64) -> Self {
        Geometry::polygon(vec![
            vec![west, south],
            vec![east, south],
            vec![east, north],
            vec![west, north],
            vec![west, south],
        ])
    }

    /// GeoJSON type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// All positions of the geometry, rings included.
    pub fn positions(&self) -> Vec<&Position> {
        match self {
            Geometry::Point(p) => vec![p],
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.iter().collect(),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter().flatten().collect()
            }
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().collect(),
        }
    }

    /// Bounding box as [west, south, east, north], None for an empty geometry.
    pub fn bbox(&self) -> Option<[f64; 4]> {
        let mut positions = self.positions().into_iter().filter(|p| p.len() >= 2);
        let first = positions.next()?;
        let mut bbox = [first[0], first[1], first[0], first[1]];
        for p in positions {
            bbox[0] = bbox[0].min(p[0]);
            bbox[1] = bbox[1].min(p[1]);
            bbox[2] = bbox[2].max(p[0]);
            bbox[3] = bbox[3].max(p[1]);
        }
        Some(bbox)
    }

    /// Point-in-polygon test for areal geometries.
    ///
    /// Uses ray casting on the outer ring and excludes holes. Non-areal
    /// geometries never contain a point.
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        match self {
            Geometry::Polygon(rings) => polygon_contains(rings, lon, lat),
            Geometry::MultiPolygon(polys) => polys.iter().any(|rings| polygon_contains(rings, lon, lat)),
            _ => false,
        }
    }

    pub fn is_areal(&self) -> bool {
        matches!(self, Geometry::Polygon(_) | Geometry::MultiPolygon(_))
    }
}

fn polygon_contains(rings: &[Vec<Position>], lon: f64, lat: f64) -> bool {
    match rings.split_first() {
        Some((outer, holes)) => {
            ring_contains(outer, lon, lat) && !holes.iter().any(|hole| ring_contains(hole, lon, lat))
        }
        None => false,
    }
}

fn ring_contains(ring: &[Position], lon: f64, lat: f64) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let (xi, yi) = (ring[i][0], ring[i][1]);
        let (xj, yj) = (ring[j][0], ring[j][1]);

        if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}
