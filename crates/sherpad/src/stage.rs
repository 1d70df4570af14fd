//! Conversation stage machine.
//!
//! A small deterministic slot-filler: each user turn advances one step
//! through the trip questions and captures the answer verbatim. The
//! machine is pure; callers replay the supplied history to rebuild state,
//! so the daemon itself holds nothing between requests.

use sherpa_common::{ChatRole, ChatTurn, ConversationStage, TravelProfile};

const GREETING_WORDS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "hiya",
    "howdy",
    "good morning",
    "good afternoon",
    "good evening",
];

const ITINERARY_WORDS: &[&str] = &[
    "itinerary",
    "day by day",
    "day-by-day",
    "plan my days",
    "full plan",
];

const ROUTE_WORDS: &[&str] = &[
    "route",
    "directions",
    "distance",
    "drive",
    "driving",
    "how far",
];

/// True when the message opens with a greeting word followed by a word
/// boundary, so "hi there" matches but "high season" does not.
pub fn is_greeting(message: &str) -> bool {
    let lower = message.trim().to_lowercase();
    GREETING_WORDS.iter().any(|word| {
        lower.strip_prefix(word).map_or(false, |rest| {
            rest.chars().next().map_or(true, |c| !c.is_alphanumeric())
        })
    })
}

/// Apply one user message: greeting interrupt first, then the fixed
/// successor table with verbatim capture.
///
/// A greeting from any stage except `Greeting` restarts the flow and
/// writes nothing. `Greeting` itself is waiting for the first real
/// answer and advances without capturing the pleasantries.
pub fn advance(
    stage: ConversationStage,
    message: &str,
    profile: &mut TravelProfile,
) -> ConversationStage {
    if stage != ConversationStage::Greeting && is_greeting(message) {
        return ConversationStage::Greeting;
    }

    let text = message.trim();
    match stage {
        ConversationStage::Greeting => ConversationStage::Destination,
        ConversationStage::Destination => {
            if !text.is_empty() {
                profile.destination = Some(text.to_string());
            }
            ConversationStage::Budget
        }
        ConversationStage::Budget => {
            if !text.is_empty() {
                profile.budget = Some(text.to_string());
            }
            ConversationStage::Dates
        }
        ConversationStage::Dates => {
            if !text.is_empty() {
                profile.dates = Some(text.to_string());
            }
            ConversationStage::Travelers
        }
        ConversationStage::Travelers => {
            if !text.is_empty() {
                profile.travelers = Some(text.to_string());
            }
            ConversationStage::Interests
        }
        ConversationStage::Interests => {
            let interests: Vec<String> = text
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect();
            if !interests.is_empty() {
                profile.interests = Some(interests);
            }
            ConversationStage::ItineraryRequest
        }
        ConversationStage::ItineraryRequest => ConversationStage::SaveItinerary,
        ConversationStage::SaveItinerary => ConversationStage::General,
        ConversationStage::General => ConversationStage::General,
    }
}

/// Rebuild stage and profile from caller-supplied history. Only user
/// turns drive the machine; assistant turns are display-only.
pub fn replay(history: &[ChatTurn]) -> (ConversationStage, TravelProfile) {
    let mut stage = ConversationStage::Greeting;
    let mut profile = TravelProfile::default();
    for turn in history {
        if turn.role == ChatRole::User {
            stage = advance(stage, &turn.content, &mut profile);
        }
    }
    (stage, profile)
}

/// Whether enough of the trip is known to build an itinerary. The stage
/// alone never gates generation; this predicate does.
pub fn can_generate_itinerary(profile: &TravelProfile) -> bool {
    profile.destination.is_some()
        && (profile.budget.is_some() || profile.dates.is_some() || profile.interests.is_some())
}

/// Side work one turn should trigger besides the model call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnPlan {
    /// Geocode plus weather lookup for this place.
    pub enrich_destination: Option<String>,
    /// Route lookup between two named places.
    pub route: Option<(String, String)>,
    /// Generate a full itinerary this turn.
    pub generate_itinerary: bool,
}

/// Decide the side work for one turn. `previous` is the stage the message
/// arrived in, `next` the stage after `advance`.
pub fn plan_turn(
    previous: ConversationStage,
    next: ConversationStage,
    message: &str,
    profile: &TravelProfile,
) -> TurnPlan {
    let mut plan = TurnPlan::default();

    // A greeting restart does nothing but greet.
    if next == ConversationStage::Greeting {
        return plan;
    }

    if let Some((from, to)) = parse_route_query(message) {
        plan.route = Some((from, to));
    }

    // A freshly captured destination gets a location and weather snapshot.
    if previous == ConversationStage::Destination && profile.destination.is_some() {
        plan.enrich_destination = profile.destination.clone();
    }

    let itinerary_turn = previous == ConversationStage::ItineraryRequest
        || (previous == ConversationStage::General && asks_for_itinerary(message));
    if itinerary_turn && can_generate_itinerary(profile) {
        plan.generate_itinerary = true;
        if plan.enrich_destination.is_none() {
            plan.enrich_destination = profile.destination.clone();
        }
    }

    plan
}

fn asks_for_itinerary(message: &str) -> bool {
    let lower = message.to_lowercase();
    contains_any(&lower, ITINERARY_WORDS)
}

/// Pull origin and destination out of an explicit route ask such as
/// "how far is the drive from Oslo to Bergen?". Returns the place names
/// with their original casing.
pub fn parse_route_query(message: &str) -> Option<(String, String)> {
    let lower = message.to_lowercase();
    if !contains_any(&lower, ROUTE_WORDS) {
        return None;
    }

    let from_idx = find_ci(message, " from ", 0)?;
    let to_idx = find_ci(message, " to ", from_idx + 6)?;

    let origin = message[from_idx + 6..to_idx].trim();
    let destination = message[to_idx + 4..]
        .trim()
        .trim_end_matches(['?', '!', '.']);

    if origin.is_empty() || destination.is_empty() {
        return None;
    }
    Some((origin.to_string(), destination.trim().to_string()))
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| text.contains(needle))
}

/// Case-insensitive find that keeps byte offsets valid for the original
/// string (ASCII-only lowering, so non-ASCII bytes are untouched).
fn find_ci(haystack: &str, needle: &str, start: usize) -> Option<usize> {
    haystack
        .get(start..)?
        .to_ascii_lowercase()
        .find(needle)
        .map(|idx| start + idx)
}
