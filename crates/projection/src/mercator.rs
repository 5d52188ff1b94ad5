//! Spherical (Web) Mercator, EPSG:3857 and its legacy alias 900913.

use std::f64::consts::PI;

use crate::{Projection, ProjectionError};

/// Spherical Mercator on the WGS84 semi-major axis.
#[derive(Debug, Clone, Copy)]
pub struct WebMercator {
    /// Sphere radius (meters)
    pub radius: f64,
}

impl WebMercator {
    pub fn new() -> Self {
        Self { radius: 6378137.0 }
    }
}

impl Default for WebMercator {
    fn default() -> Self {
        Self::new()
    }
}

impl Projection for WebMercator {
    fn project(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() >= 90.0 {
            return Err(ProjectionError::OutOfDomain(lon, lat));
        }
        let x = self.radius * lon.to_radians();
        let y = self.radius * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
        Ok((x, y))
    }

    fn unproject(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::OutOfDomain(x, y));
        }
        let lon = (x / self.radius).to_degrees();
        let lat = (2.0 * (y / self.radius).exp().atan() - PI / 2.0).to_degrees();
        Ok((lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin() {
        let (lon, lat) = WebMercator::new().unproject(0.0, 0.0).unwrap();
        assert!(lon.abs() < 1e-12);
        assert!(lat.abs() < 1e-12);
    }

    #[test]
    fn test_antimeridian() {
        let (lon, _) = WebMercator::new().unproject(20037508.342789244, 0.0).unwrap();
        assert!((lon - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip() {
        let merc = WebMercator::new();
        let (x, y) = merc.project(2.35, 48.85).unwrap();
        let (lon, lat) = merc.unproject(x, y).unwrap();
        assert!((lon - 2.35).abs() < 1e-9);
        assert!((lat - 48.85).abs() < 1e-9);
    }

    #[test]
    fn test_pole_is_out_of_domain() {
        assert!(WebMercator::new().project(0.0, 90.0).is_err());
    }
}
