//! Chat surface wire types.
//!
//! The chat contract is camelCase on the wire; callers are browser and
//! mobile frontends that expect `userId` / `enhancedData` style keys.

use serde::{Deserialize, Serialize};

use crate::enrichment::EnhancedData;
use crate::profile::{ConversationStage, TravelProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One prior turn, replayed by the caller on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Inbound conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    /// Full prior conversation, oldest first. The daemon reconstructs
    /// stage and profile from this on every call.
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    /// Only used when profile caching is enabled on the daemon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A destination the model floated alongside its reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationIdea {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One day of a generated itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDay {
    pub day: u32,
    pub title: String,
    #[serde(default)]
    pub activities: Vec<String>,
}

/// A full generated itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub destination: String,
    #[serde(default)]
    pub days: Vec<ItineraryDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Outbound conversation turn.
///
/// `message` and `suggestions` are always present; the caller can render
/// a reply without checking anything else. The optional payloads appear
/// only when the turn produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destinations: Option<Vec<DestinationIdea>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itinerary: Option<Itinerary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_data: Option<EnhancedData>,
    /// Stage the conversation is in after this turn.
    pub stage: ConversationStage,
    /// Profile after this turn's captures.
    pub profile: TravelProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_history_and_user_id() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(req.message, "hi");
        assert!(req.history.is_empty());
        assert!(req.user_id.is_none());
    }

    #[test]
    fn request_accepts_camel_case_user_id() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"message":"hi","userId":"u-42"}"#).unwrap();
        assert_eq!(req.user_id.as_deref(), Some("u-42"));
    }

    #[test]
    fn response_uses_camel_case_enhanced_data_key() {
        let resp = ChatResponse {
            message: "hello".to_string(),
            suggestions: vec!["Plan a trip".to_string()],
            destinations: None,
            itinerary: None,
            enhanced_data: Some(EnhancedData::default()),
            stage: ConversationStage::Greeting,
            profile: TravelProfile::default(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("enhancedData").is_some());
        assert!(json.get("enhanced_data").is_none());
        assert_eq!(json["stage"], "GREETING");
    }

    #[test]
    fn turn_roles_serialize_lowercase() {
        let turn = ChatTurn::assistant("sure");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
