//! Coordinate reference system transformations.
//!
//! Implements the inverse (and forward) map projections needed to turn
//! projected bounding boxes into WGS84 longitude/latitude, without
//! external dependencies.

pub mod lambert;
pub mod mercator;

pub use lambert::LambertConformal;
pub use mercator::WebMercator;

use thiserror::Error;

/// Projection failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProjectionError {
    /// Input coordinate is not finite or outside the projection domain.
    #[error("Coordinate outside projection domain: ({0}, {1})")]
    OutOfDomain(f64, f64),

    /// Iterative latitude computation did not settle.
    #[error("Inverse projection did not converge")]
    NoConvergence,
}

/// A map projection between geographic degrees and projected metres.
pub trait Projection {
    /// Geographic (lon, lat) in degrees to projected (x, y).
    fn project(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError>;

    /// Projected (x, y) to geographic (lon, lat) in degrees.
    fn unproject(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError>;
}
