//! Features API response types.
//!
//! Landing page, conformance declaration, exception body and healthcheck.

use serde::{Deserialize, Serialize};

use crate::conformance;
use crate::media_types;
use crate::types::Link;

/// Landing page response for the API root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LandingPage {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub links: Vec<Link>,
}

impl LandingPage {
    /// Create a new landing page with standard links.
    pub fn new(title: impl Into<String>, description: impl Into<String>, base_url: &str) -> Self {
        let links = vec![
            Link::new(base_url, "self")
                .with_type(media_types::JSON)
                .with_title("This document"),
            Link::new(format!("{}/definition", base_url), "service-desc")
                .with_type(media_types::OPENAPI_JSON)
                .with_title("API definition"),
            Link::new(format!("{}/conformance", base_url), "conformance")
                .with_type(media_types::JSON)
                .with_title("Conformance classes"),
            Link::new(format!("{}/collections", base_url), "data")
                .with_type(media_types::JSON)
                .with_title("Collections"),
        ];

        Self {
            title: title.into(),
            description: Some(description.into()),
            links,
        }
    }
}

/// Conformance declaration response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConformanceClasses {
    #[serde(rename = "conformsTo")]
    pub conforms_to: Vec<String>,
}

impl ConformanceClasses {
    /// Conformance classes implemented by this server.
    pub fn current() -> Self {
        Self {
            conforms_to: [
                conformance::CORE,
                conformance::OAS30,
                conformance::GEOJSON,
                conformance::FILTER,
                conformance::FEATURES_FILTER,
                conformance::SIMPLE_CQL,
                conformance::CQL_JSON,
                conformance::CQL_TEXT,
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }

    /// Check if a conformance class is declared.
    pub fn contains(&self, class: &str) -> bool {
        self.conforms_to.iter().any(|c| c == class)
    }
}

/// Exception body returned with every error status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExceptionResponse {
    /// Error class (`BadRequest`, `NotFound`, `GeneralError`).
    pub name: String,

    pub message: String,

    /// HTTP status code.
    pub code: u16,
}

impl ExceptionResponse {
    pub fn new(name: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            code,
        }
    }
}

/// Healthcheck body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub name: String,
    pub version: String,

    #[serde(rename = "buildNumber", skip_serializing_if = "Option::is_none")]
    pub build_number: Option<String>,
}

impl HealthStatus {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            build_number: None,
        }
    }

    pub fn with_build_number(mut self, build_number: Option<String>) -> Self {
        self.build_number = build_number;
        self
    }
}
