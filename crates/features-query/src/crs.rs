//! CRS identifiers accepted by `bbox-crs` and reprojection to WGS84.

use std::fmt;

use features_protocol::crs::{CRS84, CRS84H};
use features_protocol::FeaturesError;
use projection::{LambertConformal, Projection, WebMercator};

const EPSG_HTTP_PREFIX: &str = "http://www.opengis.net/def/crs/epsg/";
const EPSG_URN_PREFIX: &str = "urn:ogc:def:crs:epsg:";

/// Message for identifiers outside the EPSG authority.
pub const UNSUPPORTED_CRS_MESSAGE: &str = "Unsupported CRS, only OGC URNs (starting with urn:ogc:def:crs:EPSG) and OGC http-URIs (starting with http://www.opengis.net/def/crs/EPSG) with EPSG authority are supported";

/// Reference systems the built-in transform knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrsCode {
    /// OGC CRS84 / CRS84h, lon/lat order
    Crs84,
    /// WGS84 Geographic
    Epsg4326,
    /// ETRS89 Geographic
    Epsg4258,
    /// NAD83 Geographic
    Epsg4269,
    /// Web Mercator (meters), also 900913
    Epsg3857,
    /// RGF93 / Lambert-93 (meters)
    Epsg2154,
}

impl CrsCode {
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(CrsCode::Epsg4326),
            4258 => Some(CrsCode::Epsg4258),
            4269 => Some(CrsCode::Epsg4269),
            3857 | 900913 => Some(CrsCode::Epsg3857),
            2154 => Some(CrsCode::Epsg2154),
            _ => None,
        }
    }

    /// Check if this is a geographic (lon/lat) CRS.
    ///
    /// Geographic inputs are read longitude first, the same way as CRS84.
    pub fn is_geographic(&self) -> bool {
        matches!(
            self,
            CrsCode::Crs84 | CrsCode::Epsg4326 | CrsCode::Epsg4258 | CrsCode::Epsg4269
        )
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CrsCode::Crs84 => "CRS84",
            CrsCode::Epsg4326 => "EPSG:4326",
            CrsCode::Epsg4258 => "EPSG:4258",
            CrsCode::Epsg4269 => "EPSG:4269",
            CrsCode::Epsg3857 => "EPSG:3857",
            CrsCode::Epsg2154 => "EPSG:2154",
        };
        write!(f, "{}", code)
    }
}

/// Lookup and reprojection of coordinate reference systems.
pub trait CrsTransform: Send + Sync {
    /// Resolve a CRS identifier.
    fn lookup(&self, crs: &str) -> Result<CrsCode, FeaturesError>;

    /// Reproject an (x, y) point expressed in `crs` to WGS84 (lon, lat).
    fn reproject(&self, x: f64, y: f64, crs: CrsCode) -> Result<(f64, f64), FeaturesError>;
}

/// Whether the identifier is one of the default OGC CRS84 URIs.
pub fn is_default_crs(crs: &str) -> bool {
    crs == CRS84 || crs == CRS84H
}

/// Extract the EPSG code from an OGC http-URI, URN or `EPSG:` shorthand.
pub fn parse_epsg_code(crs: &str) -> Result<u32, FeaturesError> {
    let lower = crs.trim().to_lowercase();
    let code = if let Some(rest) = lower.strip_prefix(EPSG_HTTP_PREFIX) {
        rest.rsplit('/').next().unwrap_or_default().to_string()
    } else if let Some(rest) = lower.strip_prefix(EPSG_URN_PREFIX) {
        rest.rsplit(':').next().unwrap_or_default().to_string()
    } else if let Some(rest) = lower.strip_prefix("epsg:") {
        rest.to_string()
    } else {
        return Err(FeaturesError::bad_request(UNSUPPORTED_CRS_MESSAGE));
    };

    code.parse::<u32>()
        .map_err(|_| FeaturesError::bad_request("Invalid CRS format"))
}

/// Transform backed by the `projection` crate.
#[derive(Debug, Clone)]
pub struct BuiltinCrs {
    mercator: WebMercator,
    lambert93: LambertConformal,
}

impl BuiltinCrs {
    pub fn new() -> Self {
        Self {
            mercator: WebMercator::new(),
            lambert93: LambertConformal::lambert93(),
        }
    }
}

impl Default for BuiltinCrs {
    fn default() -> Self {
        Self::new()
    }
}

impl CrsTransform for BuiltinCrs {
    fn lookup(&self, crs: &str) -> Result<CrsCode, FeaturesError> {
        if is_default_crs(crs) {
            return Ok(CrsCode::Crs84);
        }
        let code = parse_epsg_code(crs)?;
        CrsCode::from_epsg(code)
            .ok_or_else(|| FeaturesError::bad_request(format!("Unsupported CRS EPSG:{}", code)))
    }

    fn reproject(&self, x: f64, y: f64, crs: CrsCode) -> Result<(f64, f64), FeaturesError> {
        let result = match crs {
            code if code.is_geographic() => Ok((x, y)),
            CrsCode::Epsg3857 => self.mercator.unproject(x, y),
            CrsCode::Epsg2154 => self.lambert93.unproject(x, y),
            _ => Ok((x, y)),
        };
        result.map_err(|e| FeaturesError::bad_request(format!("Cannot reproject bounding box: {}", e)))
    }
}
