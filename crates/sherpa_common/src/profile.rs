//! Travel profile and conversation stage types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

/// What the assistant has learned about the trip so far.
///
/// Fields are captured verbatim from user messages (trimmed, never
/// reworded) so the model sees exactly what the user said.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travelers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
}

impl TravelProfile {
    pub fn is_empty(&self) -> bool {
        self.destination.is_none()
            && self.budget.is_none()
            && self.dates.is_none()
            && self.travelers.is_none()
            && self.interests.is_none()
    }

    /// Short human summary for logs and prompts, e.g.
    /// `destination: Tokyo; dates: early June`.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(d) = &self.destination {
            parts.push(format!("destination: {}", d));
        }
        if let Some(b) = &self.budget {
            parts.push(format!("budget: {}", b));
        }
        if let Some(d) = &self.dates {
            parts.push(format!("dates: {}", d));
        }
        if let Some(t) = &self.travelers {
            parts.push(format!("travelers: {}", t));
        }
        if let Some(i) = &self.interests {
            parts.push(format!("interests: {}", i.join(", ")));
        }
        if parts.is_empty() {
            "nothing yet".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Where the slot-filling conversation currently is.
///
/// Stages advance linearly through the trip details, then settle in
/// `General` once an itinerary has been produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationStage {
    #[default]
    Greeting,
    Destination,
    Budget,
    Dates,
    Travelers,
    Interests,
    ItineraryRequest,
    SaveItinerary,
    General,
}

impl ConversationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStage::Greeting => "GREETING",
            ConversationStage::Destination => "DESTINATION",
            ConversationStage::Budget => "BUDGET",
            ConversationStage::Dates => "DATES",
            ConversationStage::Travelers => "TRAVELERS",
            ConversationStage::Interests => "INTERESTS",
            ConversationStage::ItineraryRequest => "ITINERARY_REQUEST",
            ConversationStage::SaveItinerary => "SAVE_ITINERARY",
            ConversationStage::General => "GENERAL",
        }
    }
}

impl fmt::Display for ConversationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional persistence hook for per-user conversation state.
///
/// The daemon stays stateless by default: every request replays its own
/// history. A store only short-circuits that replay when profile caching
/// is switched on in the config.
pub trait ProfileStore: Send + Sync {
    fn load(&self, user_id: &str) -> Option<(ConversationStage, TravelProfile)>;
    fn save(&self, user_id: &str, stage: ConversationStage, profile: &TravelProfile);
}

/// In-process store. Contents live exactly as long as the daemon does.
#[derive(Default)]
pub struct MemoryProfileStore {
    inner: RwLock<HashMap<String, (ConversationStage, TravelProfile)>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self, user_id: &str) -> Option<(ConversationStage, TravelProfile)> {
        self.inner
            .read()
            .ok()
            .and_then(|map| map.get(user_id).cloned())
    }

    fn save(&self, user_id: &str, stage: ConversationStage, profile: &TravelProfile) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(user_id.to_string(), (stage, profile.clone()));
        }
    }
}
