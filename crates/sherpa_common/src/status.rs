//! Diagnostics payloads returned by the daemon's status endpoints.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `GET /v1/health` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Counters for one fallback-tracked category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounters {
    pub primary: u64,
    pub fallback: u64,
    pub errors: u64,
}

impl CategoryCounters {
    /// Fallback share of successful calls, or `None` below the sample floor.
    pub fn fallback_ratio(&self, min_sample: u64) -> Option<f64> {
        let total = self.primary + self.fallback;
        if total > min_sample {
            Some(self.fallback as f64 / total as f64)
        } else {
            None
        }
    }
}

/// `GET /v1/metrics` payload: category name to counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsSnapshot {
    pub categories: BTreeMap<String, CategoryCounters>,
}

impl MetricsSnapshot {
    pub fn get(&self, category: &str) -> CategoryCounters {
        self.categories.get(category).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_as_bare_map() {
        let mut snap = MetricsSnapshot::default();
        snap.categories.insert(
            "weather".to_string(),
            CategoryCounters {
                primary: 3,
                fallback: 1,
                errors: 0,
            },
        );
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["weather"]["primary"], 3);
        assert!(json.get("categories").is_none());
    }

    #[test]
    fn ratio_needs_more_than_min_sample_calls() {
        let c = CategoryCounters {
            primary: 2,
            fallback: 8,
            errors: 0,
        };
        assert_eq!(c.fallback_ratio(10), None);

        let c = CategoryCounters {
            primary: 1,
            fallback: 10,
            errors: 0,
        };
        let ratio = c.fallback_ratio(10).unwrap();
        assert!((ratio - 10.0 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn errors_do_not_count_toward_the_sample() {
        let c = CategoryCounters {
            primary: 0,
            fallback: 0,
            errors: 50,
        };
        assert_eq!(c.fallback_ratio(10), None);
    }
}
