//! Enrichment fallback pairs.
//!
//! Each category (weather, geocoding, routing) pairs a paid primary
//! provider with a free fallback behind one trait. The pair driver is
//! uniform: try primary, on any provider error try the fallback with the
//! same parameters, record the outcome, and raise the category error
//! only when both sides fail. Results carry a `_source` tag naming the
//! provider that actually served them.

pub mod geocode;
pub mod routing;
pub mod weather;

use async_trait::async_trait;
use sherpa_common::{
    Config, GeocodeResult, RouteSummary, ServiceCategory, SherpaError, WeatherReport,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::credentials::CredentialManager;
use crate::metrics::{MetricCategory, MetricsRegistry};

/// Why one provider call failed. Every variant sends the driver to the
/// fallback; the distinctions exist for logs and tests.
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("transport error: {0}")]
    Http(String),
    #[error("status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("permission denied: {0}")]
    Denied(String),
    #[error("no results: {0}")]
    NoResults(String),
    #[error("unexpected payload: {0}")]
    Decode(String),
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn id(&self) -> &'static str;
    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherReport, EnrichError>;
}

#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    fn id(&self) -> &'static str;
    async fn geocode(&self, query: &str) -> Result<GeocodeResult, EnrichError>;
}

#[async_trait]
pub trait RouteProvider: Send + Sync {
    fn id(&self) -> &'static str;
    async fn route(
        &self,
        from: (f64, f64),
        to: (f64, f64),
        waypoints: &[(f64, f64)],
    ) -> Result<RouteSummary, EnrichError>;
}

// ============================================================================
// Pair driver
// ============================================================================

/// How a pair call ended.
#[derive(Debug)]
pub enum PairResult<T> {
    Primary(T),
    Fallback(T),
    /// Both sides failed; messages name provider and cause.
    Failed { primary: String, fallback: String },
}

/// One primary (optional, it needs a credential) plus one fallback.
pub struct FallbackPair<P> {
    primary: Option<P>,
    fallback: P,
    primary_id: String,
    fallback_id: String,
}

impl<P: Clone> FallbackPair<P> {
    pub fn new(
        primary: Option<P>,
        primary_id: impl Into<String>,
        fallback: P,
        fallback_id: impl Into<String>,
    ) -> Self {
        Self {
            primary,
            fallback,
            primary_id: primary_id.into(),
            fallback_id: fallback_id.into(),
        }
    }

    /// Drive one call through the pair. `call` receives the provider to
    /// use, so it runs against primary and fallback with identical
    /// parameters.
    pub async fn run<T, F, Fut>(&self, call: F) -> PairResult<T>
    where
        F: Fn(P) -> Fut,
        Fut: Future<Output = Result<T, EnrichError>>,
    {
        let primary_failure = match &self.primary {
            Some(provider) => match call(provider.clone()).await {
                Ok(value) => return PairResult::Primary(value),
                Err(e) => {
                    warn!("[!]  {} failed: {}", self.primary_id, e);
                    format!("{}: {}", self.primary_id, e)
                }
            },
            None => format!("{}: not configured", self.primary_id),
        };

        match call(self.fallback.clone()).await {
            Ok(value) => PairResult::Fallback(value),
            Err(e) => {
                warn!("[!]  {} failed: {}", self.fallback_id, e);
                PairResult::Failed {
                    primary: primary_failure,
                    fallback: format!("{}: {}", self.fallback_id, e),
                }
            }
        }
    }
}

// ============================================================================
// Service
// ============================================================================

/// Location plus best-effort weather for a freshly captured destination.
#[derive(Debug, Clone)]
pub struct DestinationSnapshot {
    pub location: GeocodeResult,
    pub weather: Option<WeatherReport>,
}

pub struct EnrichmentService {
    weather: FallbackPair<Arc<dyn WeatherProvider>>,
    geocode: FallbackPair<Arc<dyn GeocodeProvider>>,
    route: FallbackPair<Arc<dyn RouteProvider>>,
    metrics: Arc<MetricsRegistry>,
}

impl EnrichmentService {
    pub fn new(
        weather: FallbackPair<Arc<dyn WeatherProvider>>,
        geocode: FallbackPair<Arc<dyn GeocodeProvider>>,
        route: FallbackPair<Arc<dyn RouteProvider>>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            weather,
            geocode,
            route,
            metrics,
        }
    }

    /// Wire the real providers: Google primaries behind the mapping
    /// credential pool, keyless fallbacks always available.
    pub async fn from_config(
        config: &Config,
        credentials: &CredentialManager,
        metrics: Arc<MetricsRegistry>,
    ) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.enrichment.request_timeout_secs);

        let weather_primary = credentials
            .initialize_client(ServiceCategory::Mapping, weather::GOOGLE_WEATHER, |group| {
                async move { weather::GoogleWeather::new(&group.key, timeout) }
            })
            .await;
        let weather = FallbackPair::new(
            weather_primary.map(|c| c as Arc<dyn WeatherProvider>),
            weather::GOOGLE_WEATHER,
            Arc::new(weather::OpenMeteo::new(timeout)?) as Arc<dyn WeatherProvider>,
            weather::OPEN_METEO,
        );

        let geocode_primary = credentials
            .initialize_client(ServiceCategory::Mapping, geocode::GOOGLE_GEOCODING, |group| {
                async move { geocode::GoogleGeocode::new(&group.key, timeout) }
            })
            .await;
        let geocode_pair = FallbackPair::new(
            geocode_primary.map(|c| c as Arc<dyn GeocodeProvider>),
            geocode::GOOGLE_GEOCODING,
            Arc::new(geocode::Nominatim::new(timeout, &config.enrichment.user_agent)?)
                as Arc<dyn GeocodeProvider>,
            geocode::NOMINATIM,
        );

        let route_primary = credentials
            .initialize_client(ServiceCategory::Mapping, routing::GOOGLE_DIRECTIONS, |group| {
                async move { routing::GoogleDirections::new(&group.key, timeout) }
            })
            .await;
        let route = FallbackPair::new(
            route_primary.map(|c| c as Arc<dyn RouteProvider>),
            routing::GOOGLE_DIRECTIONS,
            Arc::new(routing::Osrm::new(timeout)?) as Arc<dyn RouteProvider>,
            routing::OSRM,
        );

        Ok(Self::new(weather, geocode_pair, route, metrics))
    }

    pub async fn weather_at(&self, lat: f64, lon: f64) -> Result<WeatherReport, SherpaError> {
        let result = self
            .weather
            .run(|p| async move { p.fetch(lat, lon).await })
            .await;
        self.settle(MetricCategory::Weather, result, |primary, fallback| {
            SherpaError::WeatherUnavailable { primary, fallback }
        })
    }

    pub async fn geocode_place(&self, query: &str) -> Result<GeocodeResult, SherpaError> {
        let result = self
            .geocode
            .run(|p| {
                let query = query.to_string();
                async move { p.geocode(&query).await }
            })
            .await;
        self.settle(MetricCategory::Geocode, result, |primary, fallback| {
            SherpaError::GeocodeUnavailable { primary, fallback }
        })
    }

    /// Geocode the place, then fetch weather at the hit. Weather failure
    /// degrades to location-only; geocoding failure is the real error.
    pub async fn destination_snapshot(
        &self,
        place: &str,
    ) -> Result<DestinationSnapshot, SherpaError> {
        let location = self.geocode_place(place).await?;
        let weather = match self.weather_at(location.lat, location.lng).await {
            Ok(report) => Some(report),
            Err(e) => {
                info!("[~]  No weather for {}: {}", place, e);
                None
            }
        };
        Ok(DestinationSnapshot { location, weather })
    }

    /// Route between two named places. Waypoints are geocoded one by
    /// one; a waypoint that cannot be geocoded is dropped, never fatal.
    pub async fn route_between(
        &self,
        from: &str,
        to: &str,
        waypoints: &[String],
    ) -> Result<RouteSummary, SherpaError> {
        let origin = self.geocode_place(from).await?;
        let destination = self.geocode_place(to).await?;

        let mut via: Vec<(f64, f64)> = Vec::new();
        for waypoint in waypoints {
            match self.geocode_place(waypoint).await {
                Ok(hit) => via.push((hit.lat, hit.lng)),
                Err(e) => info!("[~]  Dropping waypoint '{}': {}", waypoint, e),
            }
        }

        let from_pt = (origin.lat, origin.lng);
        let to_pt = (destination.lat, destination.lng);
        let result = self
            .route
            .run(|p| {
                let via = via.clone();
                async move { p.route(from_pt, to_pt, &via).await }
            })
            .await;
        self.settle(MetricCategory::Route, result, |primary, fallback| {
            SherpaError::RouteUnavailable { primary, fallback }
        })
    }

    fn settle<T>(
        &self,
        category: MetricCategory,
        result: PairResult<T>,
        on_failure: impl FnOnce(String, String) -> SherpaError,
    ) -> Result<T, SherpaError> {
        let out = match result {
            PairResult::Primary(value) => {
                self.metrics.record_primary(category);
                Ok(value)
            }
            PairResult::Fallback(value) => {
                self.metrics.record_fallback(category);
                Ok(value)
            }
            PairResult::Failed { primary, fallback } => {
                self.metrics.record_error(category);
                Err(on_failure(primary, fallback))
            }
        };
        self.metrics.warn_alerts();
        out
    }
}

// ============================================================================
// Human-readable summaries
// ============================================================================

pub fn summarize_weather(place: &str, report: &WeatherReport) -> String {
    format!(
        "Current weather in {}: {:.0}°C, {} (humidity {:.0}%, wind {:.0} km/h).",
        place, report.temperature_c, report.condition, report.humidity_pct, report.wind_kph
    )
}

pub fn summarize_location(hit: &GeocodeResult) -> String {
    format!(
        "{} sits at {:.4}, {:.4}.",
        hit.formatted_address, hit.lat, hit.lng
    )
}

pub fn summarize_route(from: &str, to: &str, route: &RouteSummary) -> String {
    format!(
        "Driving from {} to {}: {} over {}.",
        from,
        to,
        format_distance(route.distance_meters),
        format_duration(route.duration_seconds)
    )
}

fn format_distance(meters: u64) -> String {
    if meters >= 1000 {
        format!("{:.0} km", meters as f64 / 1000.0)
    } else {
        format!("{} m", meters)
    }
}

fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{} h {:02} min", hours, minutes)
    } else {
        format!("{} min", minutes.max(1))
    }
}
