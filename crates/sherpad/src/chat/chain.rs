//! Ordered model fallback chain.
//!
//! Providers are tried strictly best-first. A provider failure moves to
//! the next provider; a parse failure does not, the raw text is served
//! instead. The last provider gets bounded retries with linear backoff.
//! When everything is exhausted the chain serves a canned apology; it
//! never returns an error.

use async_trait::async_trait;
use sherpa_common::{ChatTurn, DestinationIdea, Itinerary};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::chat::decode;
use crate::metrics::{MetricCategory, MetricsRegistry, Outcome};

/// Why a provider call failed. Parse trouble is deliberately absent:
/// undecodable output is still a served reply.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Http(String),
    #[error("status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("request timed out")]
    Timeout,
    #[error("provider returned no text")]
    Empty,
}

/// One model call: persona, prior turns, current message.
#[derive(Debug, Clone)]
pub struct ModelTurnRequest {
    pub system: String,
    pub history: Vec<ChatTurn>,
    pub message: String,
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, request: &ModelTurnRequest) -> Result<String, ProviderError>;
}

/// Apology served when every provider is exhausted.
pub const APOLOGY: &str =
    "I'm having trouble reaching my travel brain right now. Please try again in a moment.";

/// Suggestions served with the apology and padded into thin replies.
pub const GENERIC_SUGGESTIONS: [&str; 3] = [
    "Tell me where you'd like to go",
    "Ask for a day-by-day itinerary",
    "Check the weather at a destination",
];

/// What a chain call always produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub message: String,
    /// Always exactly three entries.
    pub suggestions: Vec<String>,
    pub destinations: Vec<DestinationIdea>,
    pub itinerary: Option<Itinerary>,
    /// Provider that served this reply; `None` for the terminal apology.
    pub served_by: Option<String>,
}

impl ChatReply {
    fn terminal() -> Self {
        Self {
            message: APOLOGY.to_string(),
            suggestions: GENERIC_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            destinations: Vec::new(),
            itinerary: None,
            served_by: None,
        }
    }
}

pub struct ModelFallbackChain {
    providers: Vec<Arc<dyn ModelProvider>>,
    last_retries: u32,
    base_backoff: Duration,
    metrics: Arc<MetricsRegistry>,
}

impl ModelFallbackChain {
    pub fn new(
        providers: Vec<Arc<dyn ModelProvider>>,
        last_retries: u32,
        base_backoff: Duration,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            providers,
            last_retries,
            base_backoff,
            metrics,
        }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Run the chain for one turn. First success wins; later providers
    /// are never called once a reply is served.
    pub async fn generate_reply(&self, request: &ModelTurnRequest) -> ChatReply {
        for (index, provider) in self.providers.iter().enumerate() {
            let is_last = index + 1 == self.providers.len();
            // The last provider is the last line of defense and earns
            // extra attempts before the chain gives up.
            let attempts = if is_last { 1 + self.last_retries } else { 1 };

            for attempt in 1..=attempts {
                if attempt > 1 {
                    let wait = self.base_backoff * (attempt - 1);
                    info!(
                        "[~]  {} retry {}/{} after {:?}",
                        provider.name(),
                        attempt - 1,
                        attempts - 1,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }

                match provider.generate(request).await {
                    Ok(raw) => {
                        let outcome = if index == 0 {
                            Outcome::Primary
                        } else {
                            Outcome::Fallback
                        };
                        self.metrics.record(MetricCategory::Chat, outcome);
                        self.metrics.warn_alerts();
                        return reply_from_raw(provider.name(), &raw);
                    }
                    Err(e) => {
                        warn!(
                            "[!]  Model {} attempt {}/{} failed: {}",
                            provider.name(),
                            attempt,
                            attempts,
                            e
                        );
                    }
                }
            }
        }

        self.metrics.record(MetricCategory::Chat, Outcome::Error);
        self.metrics.warn_alerts();
        warn!("[!]  Every model provider exhausted, serving canned reply");
        ChatReply::terminal()
    }
}

/// Turn raw model text into a reply. Decode failures synthesize a plain
/// reply from the raw text; they are not provider failures.
fn reply_from_raw(provider: &str, raw: &str) -> ChatReply {
    let decoded = decode::decode_reply(raw);
    let message = decoded
        .message
        .unwrap_or_else(|| raw.trim().to_string());
    ChatReply {
        message,
        suggestions: normalize_suggestions(decoded.suggestions),
        destinations: decoded.destinations,
        itinerary: decoded.itinerary,
        served_by: Some(provider.to_string()),
    }
}

/// Clamp the suggestion list to exactly three entries, topping up from
/// the generic set without duplicating.
fn normalize_suggestions(mut suggestions: Vec<String>) -> Vec<String> {
    suggestions.truncate(3);
    for generic in GENERIC_SUGGESTIONS {
        if suggestions.len() >= 3 {
            break;
        }
        if !suggestions.iter().any(|s| s == generic) {
            suggestions.push(generic.to_string());
        }
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestions_are_always_exactly_three() {
        assert_eq!(normalize_suggestions(vec![]).len(), 3);
        assert_eq!(
            normalize_suggestions(vec!["one".to_string()]).len(),
            3
        );
        let four: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(normalize_suggestions(four), vec!["a", "b", "c"]);
    }

    #[test]
    fn top_up_skips_duplicates_of_generics() {
        let one = vec![GENERIC_SUGGESTIONS[0].to_string()];
        let out = normalize_suggestions(one);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], GENERIC_SUGGESTIONS[0]);
        assert_eq!(out[1], GENERIC_SUGGESTIONS[1]);
        assert_eq!(out[2], GENERIC_SUGGESTIONS[2]);
    }

    #[test]
    fn undecodable_text_becomes_the_message() {
        let reply = reply_from_raw("gemini-1.5-pro", "Kyoto in June is beautiful.");
        assert_eq!(reply.message, "Kyoto in June is beautiful.");
        assert_eq!(reply.suggestions.len(), 3);
        assert_eq!(reply.served_by.as_deref(), Some("gemini-1.5-pro"));
    }

    #[test]
    fn terminal_reply_shape() {
        let reply = ChatReply::terminal();
        assert_eq!(reply.message, APOLOGY);
        assert_eq!(reply.suggestions.len(), 3);
        assert!(reply.served_by.is_none());
        assert!(reply.itinerary.is_none());
    }
}
