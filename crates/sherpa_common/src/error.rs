//! Shared error taxonomy.

use thiserror::Error;

use crate::service::ServiceCategory;

/// Errors that cross crate boundaries.
///
/// Enrichment errors carry both provider names so a single log line says
/// exactly which pair was exhausted. The chat path never surfaces these
/// to the end user; it degrades and keeps serving.
#[derive(Error, Debug)]
pub enum SherpaError {
    #[error("no credential available for category '{category}'")]
    NoCredentialAvailable { category: ServiceCategory },

    #[error("weather unavailable (primary: {primary}, fallback: {fallback})")]
    WeatherUnavailable { primary: String, fallback: String },

    #[error("geocoding unavailable (primary: {primary}, fallback: {fallback})")]
    GeocodeUnavailable { primary: String, fallback: String },

    #[error("routing unavailable (primary: {primary}, fallback: {fallback})")]
    RouteUnavailable { primary: String, fallback: String },
}
