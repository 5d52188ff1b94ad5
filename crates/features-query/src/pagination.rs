//! Effective limit/offset computation and paging links.

use features_protocol::{media_types, Link};
use serde::{Deserialize, Serialize};

use crate::params::QueryParameters;

/// Process-wide pagination defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationSettings {
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    #[serde(default)]
    pub default_offset: u64,

    /// Upper bound applied to every request.
    #[serde(default)]
    pub max_limit: Option<u64>,
}

fn default_limit() -> u64 {
    500
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_offset: 0,
            max_limit: None,
        }
    }
}

/// Pagination bounds declared by one backend target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendPagination {
    #[serde(default)]
    pub default: Option<u64>,

    #[serde(default)]
    pub max: Option<u64>,
}

/// Global settings combined with the target's own bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPolicy {
    pub global_default_limit: u64,
    pub global_default_offset: u64,
    pub global_max_limit: Option<u64>,
    pub backend_default_limit: Option<u64>,
    pub backend_max_limit: Option<u64>,
}

impl PaginationPolicy {
    pub fn new(settings: &PaginationSettings, backend: &BackendPagination) -> Self {
        Self {
            global_default_limit: settings.default_limit,
            global_default_offset: settings.default_offset,
            global_max_limit: settings.max_limit,
            backend_default_limit: backend.default,
            backend_max_limit: backend.max,
        }
    }

    /// Smallest of the configured maxima, if any.
    pub fn max_limit(&self) -> Option<u64> {
        match (self.global_max_limit, self.backend_max_limit) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Limit and offset actually applied to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectivePage {
    pub limit: u64,
    pub offset: u64,
}

/// Resolve requested values against the policy.
pub fn compute_effective(limit: Option<u64>, offset: Option<u64>, policy: &PaginationPolicy) -> EffectivePage {
    let requested = limit
        .or(policy.backend_default_limit)
        .unwrap_or(policy.global_default_limit);
    let limit = match policy.max_limit() {
        Some(max) => requested.min(max),
        None => requested,
    };
    EffectivePage {
        limit,
        offset: offset.unwrap_or(policy.global_default_offset),
    }
}

/// Build `self` and, when more results remain, `next` links.
///
/// `query` is the original request query; its own `limit`/`offset` are
/// replaced by the effective ones. A zero limit never gets a `next` link,
/// since it would point back at the same page.
pub fn build_links(
    base_url: &str,
    collection_id: &str,
    query: &QueryParameters,
    page: EffectivePage,
    number_returned: u64,
    number_matched: u64,
) -> Vec<Link> {
    let items_url = format!(
        "{}/collections/{}/items",
        base_url,
        urlencoding::encode(collection_id)
    );
    let echoed = query.without(&["limit", "offset"]);

    let mut links = vec![Link::new(page_href(&items_url, &echoed, page), "self")
        .with_type(media_types::GEO_JSON)
        .with_title("This document")];

    if page.limit > 0 && page.offset.saturating_add(number_returned) < number_matched {
        let next = EffectivePage {
            limit: page.limit,
            offset: page.offset.saturating_add(page.limit),
        };
        links.push(
            Link::new(page_href(&items_url, &echoed, next), "next")
                .with_type(media_types::GEO_JSON)
                .with_title("Next page"),
        );
    }
    links
}

fn page_href(items_url: &str, query: &QueryParameters, page: EffectivePage) -> String {
    let mut pairs: Vec<String> = query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    pairs.push(format!("limit={}", page.limit));
    pairs.push(format!("offset={}", page.offset));
    format!("{}?{}", items_url, pairs.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(global_max: Option<u64>, backend_default: Option<u64>, backend_max: Option<u64>) -> PaginationPolicy {
        PaginationPolicy::new(
            &PaginationSettings {
                default_limit: 500,
                default_offset: 0,
                max_limit: global_max,
            },
            &BackendPagination {
                default: backend_default,
                max: backend_max,
            },
        )
    }

    #[test]
    fn test_global_defaults() {
        let page = compute_effective(None, None, &policy(None, None, None));
        assert_eq!(page, EffectivePage { limit: 500, offset: 0 });
    }

    #[test]
    fn test_backend_default_wins_over_global() {
        let page = compute_effective(None, Some(5), &policy(None, Some(50), None));
        assert_eq!(page, EffectivePage { limit: 50, offset: 5 });
    }

    #[test]
    fn test_requested_is_clamped_by_smallest_max() {
        assert_eq!(compute_effective(Some(1000), None, &policy(Some(200), None, Some(100))).limit, 100);
        assert_eq!(compute_effective(Some(1000), None, &policy(Some(200), None, None)).limit, 200);
        assert_eq!(compute_effective(Some(10), None, &policy(Some(200), None, Some(100))).limit, 10);
    }

    #[test]
    fn test_links_without_next() {
        let links = build_links(
            "http://localhost/api",
            "stations",
            &QueryParameters::default(),
            EffectivePage { limit: 10, offset: 0 },
            4,
            4,
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "http://localhost/api/collections/stations/items?limit=10&offset=0");
    }

    #[test]
    fn test_links_with_next() {
        let query: QueryParameters = vec![
            ("limit".to_string(), "10".to_string()),
            ("name".to_string(), "La Garonne".to_string()),
        ]
        .into_iter()
        .collect();
        let links = build_links(
            "http://localhost/api",
            "stations~rivers",
            &query,
            EffectivePage { limit: 10, offset: 10 },
            10,
            25,
        );
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].rel, "next");
        assert_eq!(
            links[1].href,
            "http://localhost/api/collections/stations~rivers/items?name=La%20Garonne&limit=10&offset=20"
        );
    }

    #[test]
    fn test_next_boundary() {
        let page = EffectivePage { limit: 10, offset: 20 };
        let q = QueryParameters::default();
        assert_eq!(build_links("b", "c", &q, page, 5, 25).len(), 1);
        assert_eq!(build_links("b", "c", &q, page, 4, 25).len(), 2);
    }

    #[test]
    fn test_next_offset_saturates_on_huge_limit() {
        let page = EffectivePage { limit: u64::MAX, offset: 5 };
        let links = build_links("b", "c", &QueryParameters::default(), page, 10, 100);

        assert_eq!(links.len(), 2);
        assert_eq!(links[1].href, format!("b/collections/c/items?limit={}&offset={}", u64::MAX, u64::MAX));
    }

    #[test]
    fn test_zero_limit_has_no_next() {
        let page = EffectivePage { limit: 0, offset: 0 };
        let links = build_links("b", "c", &QueryParameters::default(), page, 0, 25);

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].rel, "self");
    }
}
