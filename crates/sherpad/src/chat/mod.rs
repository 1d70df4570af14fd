//! Conversation engine.
//!
//! One turn = restore state, advance the stage machine, call the model
//! chain, attach enrichment, echo stage and profile back. The engine
//! never fails a turn; every degradation path ends in a served reply.

pub mod chain;
pub mod decode;
pub mod gemini;

use sherpa_common::{
    ChatRequest, ChatResponse, ConversationStage, EnhancedData, ProfileStore, TravelProfile,
};
use std::sync::Arc;
use tracing::info;

use crate::chat::chain::{ChatReply, ModelFallbackChain, ModelTurnRequest};
use crate::enrichment::{self, EnrichmentService};
use crate::stage;

/// Inputs shorter than this are treated as vague.
const VAGUE_MIN_CHARS: usize = 12;

const VAGUE_PATTERNS: &[&str] = &[
    "where should i go",
    "any suggestions",
    "any ideas",
    "recommend somewhere",
    "what do you recommend",
    "somewhere nice",
    "i don't know where",
];

const RESPONSE_CONTRACT: &str = "Respond with a single JSON object shaped like \
{\"message\": string, \"suggestions\": [string, string, string], \
\"destinations\": [{\"name\": string, \"country\": string, \"reason\": string}]}. \
Put your whole answer in \"message\"; \"destinations\" only when you are proposing places.";

const ITINERARY_CONTRACT: &str = "Respond with a single JSON object shaped like \
{\"message\": string, \"suggestions\": [string, string, string], \
\"itinerary\": {\"destination\": string, \"days\": [{\"day\": number, \"title\": string, \
\"activities\": [string]}], \"notes\": string}}.";

const VAGUE_INSTRUCTION: &str =
    "\nThe user's request is vague. Ask one clarifying question before recommending anything.";

/// A message with no substance to act on: very short, or one of the
/// generic "where should I go" asks.
pub fn is_vague(message: &str) -> bool {
    let trimmed = message.trim();
    if trimmed.chars().count() < VAGUE_MIN_CHARS {
        return true;
    }
    let lower = trimmed.to_lowercase();
    VAGUE_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

pub struct ChatEngine {
    chain: ModelFallbackChain,
    enrichment: Arc<EnrichmentService>,
    store: Option<Arc<dyn ProfileStore>>,
    persona: String,
}

impl ChatEngine {
    pub fn new(
        chain: ModelFallbackChain,
        enrichment: Arc<EnrichmentService>,
        persona: impl Into<String>,
        store: Option<Arc<dyn ProfileStore>>,
    ) -> Self {
        Self {
            chain,
            enrichment,
            store,
            persona: persona.into(),
        }
    }

    /// Drive one full turn. Always produces a response.
    pub async fn handle_turn(&self, request: &ChatRequest) -> ChatResponse {
        let (stage_before, mut profile) = self.restore_state(request);
        let stage_after = stage::advance(stage_before, &request.message, &mut profile);
        let plan = stage::plan_turn(stage_before, stage_after, &request.message, &profile);

        let reply = if plan.generate_itinerary {
            self.itinerary_turn(request, &profile).await
        } else {
            self.chat_turn(request, &profile, stage_after).await
        };

        let mut message = reply.message;
        let mut enhanced = EnhancedData::default();

        if let Some(place) = &plan.enrich_destination {
            match self.enrichment.destination_snapshot(place).await {
                Ok(snapshot) => {
                    message.push_str("\n\n");
                    message.push_str(&enrichment::summarize_location(&snapshot.location));
                    if let Some(weather) = &snapshot.weather {
                        message.push(' ');
                        message.push_str(&enrichment::summarize_weather(place, weather));
                    }
                    enhanced.weather = snapshot.weather;
                    enhanced.location = Some(snapshot.location);
                }
                Err(e) => info!("[~]  Enrichment skipped for '{}': {}", place, e),
            }
        }

        if let Some((from, to)) = &plan.route {
            match self.enrichment.route_between(from, to, &[]).await {
                Ok(route) => {
                    message.push_str("\n\n");
                    message.push_str(&enrichment::summarize_route(from, to, &route));
                    enhanced.route = Some(route);
                }
                Err(e) => info!("[~]  Route skipped ({} -> {}): {}", from, to, e),
            }
        }

        if let (Some(store), Some(user_id)) = (&self.store, &request.user_id) {
            store.save(user_id, stage_after, &profile);
        }

        ChatResponse {
            message,
            suggestions: reply.suggestions,
            destinations: (!reply.destinations.is_empty()).then_some(reply.destinations),
            itinerary: reply.itinerary,
            enhanced_data: (!enhanced.is_empty()).then_some(enhanced),
            stage: stage_after,
            profile,
        }
    }

    /// History replay is authoritative; the store only answers when the
    /// caller sent no history at all.
    fn restore_state(&self, request: &ChatRequest) -> (ConversationStage, TravelProfile) {
        if request.history.is_empty() {
            if let (Some(store), Some(user_id)) = (&self.store, &request.user_id) {
                if let Some(saved) = store.load(user_id) {
                    return saved;
                }
            }
        }
        stage::replay(&request.history)
    }

    async fn chat_turn(
        &self,
        request: &ChatRequest,
        profile: &TravelProfile,
        stage: ConversationStage,
    ) -> ChatReply {
        let turn = ModelTurnRequest {
            system: self.system_prompt(profile, stage, is_vague(&request.message)),
            history: request.history.clone(),
            message: request.message.clone(),
        };
        self.chain.generate_reply(&turn).await
    }

    async fn itinerary_turn(&self, request: &ChatRequest, profile: &TravelProfile) -> ChatReply {
        let turn = ModelTurnRequest {
            system: self.itinerary_prompt(profile),
            history: request.history.clone(),
            message: request.message.clone(),
        };
        let reply = self.chain.generate_reply(&turn).await;
        if reply.itinerary.is_none() && reply.served_by.is_some() {
            info!("[~]  Model reply carried no itinerary structure, serving text only");
        }
        reply
    }

    fn system_prompt(
        &self,
        profile: &TravelProfile,
        stage: ConversationStage,
        vague: bool,
    ) -> String {
        let mut prompt = format!(
            "{}\n\nKnown trip details: {}.\nConversation stage: {}.\n{}",
            self.persona,
            profile.summary(),
            stage,
            RESPONSE_CONTRACT
        );
        if vague {
            prompt.push_str(VAGUE_INSTRUCTION);
        }
        prompt
    }

    fn itinerary_prompt(&self, profile: &TravelProfile) -> String {
        format!(
            "{}\n\nBuild a day-by-day itinerary for this trip: {}.\n{}",
            self.persona,
            profile.summary(),
            ITINERARY_CONTRACT
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_are_vague() {
        assert!(is_vague("hi"));
        assert!(is_vague("beach?"));
        assert!(!is_vague("I want two weeks in Japan in June"));
    }

    #[test]
    fn generic_travel_asks_are_vague_regardless_of_length() {
        assert!(is_vague("honestly, where should I go this summer?"));
        assert!(is_vague("do you have any suggestions for somewhere warm"));
        assert!(!is_vague("compare Lisbon and Porto for a food trip"));
    }
}
