//! Service configuration loading and types.
//!
//! Configuration comes from a YAML file, then a few environment
//! variables are applied on top (`FEATURES_BASE_URL`, `LIMIT`, `OFFSET`,
//! `MAX`).

use std::path::Path;

use anyhow::{Context, Result};
use features_query::{BackendPagination, PaginationSettings};
use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::catalog::Layer;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_description")]
    pub description: String,

    /// Public URL of the server, without the API path.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix of every API route.
    #[serde(default = "default_api_path")]
    pub api_path: String,

    #[serde(default)]
    pub pagination: PaginationSettings,

    /// Query parameters never used as property filters.
    #[serde(default = "default_reserved")]
    pub reserved_query_parameters: Vec<String>,

    /// Generic (non features) backends allowed to be exposed.
    #[serde(default)]
    pub exposed_services: Vec<String>,

    /// Layer catalog; when absent collections come from the backends.
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,

    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: default_description(),
            base_url: default_base_url(),
            api_path: default_api_path(),
            pagination: PaginationSettings::default(),
            reserved_query_parameters: default_reserved(),
            exposed_services: Vec::new(),
            catalog: None,
            backends: Vec::new(),
        }
    }
}

fn default_title() -> String {
    "Features API".to_string()
}

fn default_description() -> String {
    "OGC API - Features access to backend data services".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_api_path() -> String {
    "/api".to_string()
}

fn default_reserved() -> Vec<String> {
    vec!["jwt".to_string(), "token".to_string()]
}

/// Static layer catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub layers: Vec<Layer>,
}

/// A backend target declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Service path; the collection name is its last segment.
    pub name: String,

    #[serde(default)]
    pub kind: BackendKind,

    /// Whether the service is published by a remote process.
    #[serde(default = "default_remote")]
    pub remote: bool,

    #[serde(default)]
    pub pagination: BackendPagination,

    pub source: BackendSource,
}

fn default_remote() -> bool {
    true
}

/// Where a backend's records come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendSource {
    /// JSON records (array or FeatureCollection) loaded at startup.
    Memory { path: String },
    /// Remote service queried over HTTP.
    Http { url: String },
}

impl FeaturesConfig {
    /// Load configuration from a YAML file, falling back to defaults when
    /// the file does not exist, then apply environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read: {}", path))?;
            let config: FeaturesConfig = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse: {}", path))?;
            tracing::info!(
                backends = config.backends.len(),
                "Loaded features configuration from {}",
                path
            );
            config
        } else {
            tracing::warn!("Features config file {} does not exist, using defaults", path);
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("FEATURES_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(limit) = lookup("LIMIT") {
            self.pagination.default_limit = limit
                .parse()
                .with_context(|| format!("Invalid LIMIT value: {}", limit))?;
        }
        if let Some(offset) = lookup("OFFSET") {
            self.pagination.default_offset = offset
                .parse()
                .with_context(|| format!("Invalid OFFSET value: {}", offset))?;
        }
        if let Some(max) = lookup("MAX") {
            self.pagination.max_limit = Some(
                max.parse()
                    .with_context(|| format!("Invalid MAX value: {}", max))?,
            );
        }
        Ok(())
    }

    /// Base URL of the API used in every link.
    pub fn api_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.api_path.trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = FeaturesConfig::default();
        assert_eq!(config.pagination.default_limit, 500);
        assert_eq!(config.pagination.default_offset, 0);
        assert_eq!(config.pagination.max_limit, None);
        assert_eq!(config.reserved_query_parameters, vec!["jwt", "token"]);
        assert_eq!(config.api_url(), "http://localhost:8081/api");
    }

    #[test]
    fn test_config_yaml_parsing() {
        let yaml = r#"
title: Hub'Eau
base_url: http://example.com/
api_path: /ogc
pagination:
  default_limit: 100
  max_limit: 1000
exposed_services: [sensors]
catalog:
  layers:
    - name: Hubeau
      description: Water levels
      service: hubeau-observations
      probeService: hubeau-stations
      bbox: [-5.0, 41.0, 10.0, 51.5]
      from: P7D
      every: PT1H
      filters:
        - name: Toulouse
          active:
            eq: [{property: code_station}, "'O200004001'"]
backends:
  - name: api/hubeau-observations
    kind: features
    pagination: { default: 50, max: 200 }
    source:
      type: memory
      path: data/observations.json
  - name: api/sensors
    kind: generic
    remote: false
    source:
      type: http
      url: http://sensors:8080
"#;
        let config: FeaturesConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.api_url(), "http://example.com/ogc");
        assert_eq!(config.pagination.default_limit, 100);
        assert_eq!(config.pagination.default_offset, 0);
        assert_eq!(config.pagination.max_limit, Some(1000));

        let layers = &config.catalog.as_ref().unwrap().layers;
        assert_eq!(layers[0].probe_service.as_deref(), Some("hubeau-stations"));
        assert_eq!(layers[0].filters.len(), 1);

        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.backends[0].kind, BackendKind::Features);
        assert_eq!(config.backends[0].pagination.max, Some(200));
        assert!(config.backends[0].remote);
        assert!(!config.backends[1].remote);
        assert_eq!(
            config.backends[1].source,
            BackendSource::Http { url: "http://sensors:8080".to_string() }
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            [("LIMIT", "20"), ("OFFSET", "5"), ("MAX", "100"), ("FEATURES_BASE_URL", "https://kano.io")]
                .into_iter()
                .collect();
        let mut config = FeaturesConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.pagination.default_limit, 20);
        assert_eq!(config.pagination.default_offset, 5);
        assert_eq!(config.pagination.max_limit, Some(100));
        assert_eq!(config.api_url(), "https://kano.io/api");
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = FeaturesConfig::default();
        assert!(config
            .apply_env(|key| (key == "LIMIT").then(|| "many".to_string()))
            .is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "title: From file\nreserved_query_parameters: [apiKey]").unwrap();

        let config = FeaturesConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.title, "From file");
        assert_eq!(config.reserved_query_parameters, vec!["apiKey"]);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = FeaturesConfig::load("/nonexistent/features.yaml").unwrap();
        assert_eq!(config.title, "Features API");
    }
}
