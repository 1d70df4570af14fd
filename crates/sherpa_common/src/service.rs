//! Service categories and per-client diagnostics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// External capability classes the daemon talks to.
///
/// Each category carries its own credential preference order in the
/// configuration; clients are initialized lazily per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceCategory {
    /// Conversational model generation (Gemini tiers).
    ModelGeneration,
    /// Calendar / tasks / mail style productivity APIs.
    ProductivitySuite,
    /// Realtime sync database.
    RealtimeDataStore,
    /// Geocoding, directions and weather.
    Mapping,
    /// Vision / image labeling.
    ImageAnalysis,
    /// Text translation.
    Translation,
    /// Text to speech.
    SpeechSynthesis,
    /// Video intelligence.
    VideoAnalysis,
    /// Blob storage buckets.
    ObjectStorage,
    /// Secret manager access.
    SecretStorage,
}

impl ServiceCategory {
    /// Every category, in display order.
    pub const ALL: [ServiceCategory; 10] = [
        ServiceCategory::ModelGeneration,
        ServiceCategory::ProductivitySuite,
        ServiceCategory::RealtimeDataStore,
        ServiceCategory::Mapping,
        ServiceCategory::ImageAnalysis,
        ServiceCategory::Translation,
        ServiceCategory::SpeechSynthesis,
        ServiceCategory::VideoAnalysis,
        ServiceCategory::ObjectStorage,
        ServiceCategory::SecretStorage,
    ];

    /// Stable kebab-case name used in config keys, logs and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::ModelGeneration => "model-generation",
            ServiceCategory::ProductivitySuite => "productivity-suite",
            ServiceCategory::RealtimeDataStore => "realtime-data-store",
            ServiceCategory::Mapping => "mapping",
            ServiceCategory::ImageAnalysis => "image-analysis",
            ServiceCategory::Translation => "translation",
            ServiceCategory::SpeechSynthesis => "speech-synthesis",
            ServiceCategory::VideoAnalysis => "video-analysis",
            ServiceCategory::ObjectStorage => "object-storage",
            ServiceCategory::SecretStorage => "secret-storage",
        }
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the most recent initialization attempt for one named
/// service client.
///
/// Records are only ever overwritten, never deleted, so `sherpactl services`
/// always shows the full picture including clients that failed to come up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceClientStatus {
    /// Whether a usable client instance exists.
    pub initialized: bool,
    /// Credential group that satisfied the request, when initialized.
    pub assigned_group: Option<String>,
    /// Why the last attempt failed, when it did.
    pub last_error: Option<String>,
    /// When this record was last written.
    pub updated_at: DateTime<Utc>,
}

impl ServiceClientStatus {
    pub fn ready(group: &str) -> Self {
        Self {
            initialized: true,
            assigned_group: Some(group.to_string()),
            last_error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn failed(reason: &str) -> Self {
        Self {
            initialized: false,
            assigned_group: None,
            last_error: Some(reason.to_string()),
            updated_at: Utc::now(),
        }
    }
}
