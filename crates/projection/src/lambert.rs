//! Lambert Conformal Conic projection (ellipsoidal, two standard parallels).
//!
//! Used by national grids such as the French Lambert-93 (EPSG:2154).
//! The projection parameters include:
//! - Latitude of origin (lat0) and central meridian (lon0)
//! - Standard parallels latin1 and latin2
//! - False easting / northing
//! - Ellipsoid semi-major axis and flattening

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::{Projection, ProjectionError};

const MAX_ITERATIONS: usize = 15;
const TOLERANCE: f64 = 1e-12;

/// Lambert Conformal Conic projection parameters.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Central meridian in radians
    pub lon0: f64,
    /// False easting (meters)
    pub x0: f64,
    /// False northing (meters)
    pub y0: f64,
    /// Semi-major axis (meters)
    pub a: f64,
    /// First eccentricity
    pub e: f64,
    /// Cone constant (n)
    n: f64,
    /// F constant
    f: f64,
    /// Rho at the latitude of origin
    rho0: f64,
}

impl LambertConformal {
    /// Build a projection from degrees and ellipsoid parameters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lat0_deg: f64,
        lon0_deg: f64,
        latin1_deg: f64,
        latin2_deg: f64,
        x0: f64,
        y0: f64,
        a: f64,
        inverse_flattening: f64,
    ) -> Self {
        let flattening = 1.0 / inverse_flattening;
        let e = (2.0 * flattening - flattening * flattening).sqrt();

        let lat0 = lat0_deg.to_radians();
        let latin1 = latin1_deg.to_radians();
        let latin2 = latin2_deg.to_radians();

        let m1 = m(latin1, e);
        let m2 = m(latin2, e);
        let t1 = t(latin1, e);
        let t2 = t(latin2, e);

        let n = if (latin1 - latin2).abs() < 1e-10 {
            // Tangent cone
            latin1.sin()
        } else {
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };
        let f = m1 / (n * t1.powf(n));
        let rho0 = a * f * t(lat0, e).powf(n);

        Self {
            lon0: lon0_deg.to_radians(),
            x0,
            y0,
            a,
            e,
            n,
            f,
            rho0,
        }
    }

    /// Lambert-93 on GRS80 (EPSG:2154).
    pub fn lambert93() -> Self {
        Self::new(
            46.5,           // lat0
            3.0,            // lon0
            49.0,           // latin1
            44.0,           // latin2
            700000.0,       // x0
            6600000.0,      // y0
            6378137.0,      // GRS80 a
            298.257222101,  // GRS80 1/f
        )
    }
}

impl Projection for LambertConformal {
    fn project(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() >= 90.0 {
            return Err(ProjectionError::OutOfDomain(lon, lat));
        }
        let rho = self.a * self.f * t(lat.to_radians(), self.e).powf(self.n);
        let theta = self.n * (lon.to_radians() - self.lon0);
        let x = self.x0 + rho * theta.sin();
        let y = self.y0 + self.rho0 - rho * theta.cos();
        Ok((x, y))
    }

    fn unproject(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::OutOfDomain(x, y));
        }
        let dx = x - self.x0;
        let dy = self.rho0 - (y - self.y0);
        let sign = self.n.signum();
        let rho = sign * (dx * dx + dy * dy).sqrt();
        let theta = (sign * dx).atan2(sign * dy);

        let lon = theta / self.n + self.lon0;

        if rho == 0.0 {
            return Ok((lon.to_degrees(), sign * 90.0));
        }

        let t_prime = (rho / (self.a * self.f)).powf(1.0 / self.n);
        let mut lat = FRAC_PI_2 - 2.0 * t_prime.atan();
        for _ in 0..MAX_ITERATIONS {
            let es = self.e * lat.sin();
            let next = FRAC_PI_2 - 2.0 * (t_prime * ((1.0 - es) / (1.0 + es)).powf(self.e / 2.0)).atan();
            if (next - lat).abs() < TOLERANCE {
                return Ok((lon.to_degrees(), next.to_degrees()));
            }
            lat = next;
        }

        Err(ProjectionError::NoConvergence)
    }
}

fn m(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    phi.cos() / (1.0 - es * es).sqrt()
}

fn t(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}
