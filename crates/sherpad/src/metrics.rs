//! Fallback metrics and alerting.
//!
//! One `IntCounterVec` holds every counter, so the JSON snapshot, the
//! alert checks and the prometheus exposition all read the same numbers.
//! Alerts are advisory: they are logged and returned, never acted on.

use prometheus::{
    register_int_counter_vec_with_registry, Encoder, IntCounterVec, Registry, TextEncoder,
};
use sherpa_common::{AlertsConfig, CategoryCounters, MetricsSnapshot};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Call families tracked by the fallback counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricCategory {
    Weather,
    Geocode,
    Route,
    Chat,
}

impl MetricCategory {
    pub const ALL: [MetricCategory; 4] = [
        MetricCategory::Weather,
        MetricCategory::Geocode,
        MetricCategory::Route,
        MetricCategory::Chat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::Weather => "weather",
            MetricCategory::Geocode => "geocode",
            MetricCategory::Route => "route",
            MetricCategory::Chat => "chat",
        }
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which way a tracked call went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Primary,
    Fallback,
    Error,
}

impl Outcome {
    const ALL: [Outcome; 3] = [Outcome::Primary, Outcome::Fallback, Outcome::Error];

    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Primary => "primary",
            Outcome::Fallback => "fallback",
            Outcome::Error => "error",
        }
    }
}

/// What tripped an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    ErrorCount,
    FallbackRatio,
}

/// One firing alert condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub category: MetricCategory,
    pub kind: AlertKind,
    pub message: String,
}

/// Process-lifetime fallback counters plus the alert thresholds.
#[derive(Clone)]
pub struct MetricsRegistry {
    calls_total: IntCounterVec,
    thresholds: AlertsConfig,
    registry: Arc<Registry>,
}

impl MetricsRegistry {
    pub fn new(thresholds: AlertsConfig) -> Self {
        let registry = Registry::new();

        let calls_total = register_int_counter_vec_with_registry!(
            "sherpa_fallback_calls_total",
            "Enrichment and model calls by category and outcome",
            &["category", "outcome"],
            registry
        )
        .unwrap();

        // Touch every series up front so the exposition is complete from
        // the first scrape.
        for category in MetricCategory::ALL {
            for outcome in Outcome::ALL {
                calls_total.with_label_values(&[category.as_str(), outcome.as_str()]);
            }
        }

        Self {
            calls_total,
            thresholds,
            registry: Arc::new(registry),
        }
    }

    /// Pure counter increment, no I/O.
    pub fn record(&self, category: MetricCategory, outcome: Outcome) {
        self.calls_total
            .with_label_values(&[category.as_str(), outcome.as_str()])
            .inc();
    }

    pub fn record_primary(&self, category: MetricCategory) {
        self.record(category, Outcome::Primary);
    }

    pub fn record_fallback(&self, category: MetricCategory) {
        self.record(category, Outcome::Fallback);
    }

    pub fn record_error(&self, category: MetricCategory) {
        self.record(category, Outcome::Error);
    }

    fn counters(&self, category: MetricCategory) -> CategoryCounters {
        let read = |outcome: Outcome| {
            self.calls_total
                .with_label_values(&[category.as_str(), outcome.as_str()])
                .get()
        };
        CategoryCounters {
            primary: read(Outcome::Primary),
            fallback: read(Outcome::Fallback),
            errors: read(Outcome::Error),
        }
    }

    /// Counters for every category, for the JSON diagnostics surface.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut categories = BTreeMap::new();
        for category in MetricCategory::ALL {
            categories.insert(category.as_str().to_string(), self.counters(category));
        }
        MetricsSnapshot { categories }
    }

    /// Evaluate the alert conditions against the current counters.
    ///
    /// Fires when a category's error count since startup reaches the
    /// threshold, or when fallback serves more than the configured share
    /// of calls over a meaningful sample.
    pub fn check_alerts(&self) -> Vec<Alert> {
        let mut alerts = Vec::new();
        for category in MetricCategory::ALL {
            let counters = self.counters(category);

            if counters.errors >= self.thresholds.error_threshold {
                alerts.push(Alert {
                    category,
                    kind: AlertKind::ErrorCount,
                    message: format!(
                        "{}: {} errors since startup (threshold {})",
                        category, counters.errors, self.thresholds.error_threshold
                    ),
                });
            }

            if let Some(ratio) = counters.fallback_ratio(self.thresholds.min_sample) {
                if ratio > self.thresholds.fallback_ratio {
                    alerts.push(Alert {
                        category,
                        kind: AlertKind::FallbackRatio,
                        message: format!(
                            "{}: fallback served {:.0}% of {} calls",
                            category,
                            ratio * 100.0,
                            counters.primary + counters.fallback
                        ),
                    });
                }
            }
        }
        alerts
    }

    /// Log every firing alert. Invoked after each tracked call; alerts
    /// never block or alter the response.
    pub fn warn_alerts(&self) {
        for alert in self.check_alerts() {
            warn!("[!]  ALERT {}", alert.message);
        }
    }

    /// Export all counters in prometheus text format.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new(AlertsConfig::default())
    }
}
