//! Lenient decoding of model output.
//!
//! Models are told to answer in JSON but routinely wrap it in prose or
//! markdown fences. All brace-scanning leniency lives here. Failing to
//! decode is never an error; the caller falls back to the raw text.

use serde_json::Value;
use sherpa_common::{DestinationIdea, Itinerary, ItineraryDay};

/// Reply fields recovered from raw model text. Anything the model did
/// not produce stays empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedReply {
    pub message: Option<String>,
    pub suggestions: Vec<String>,
    pub destinations: Vec<DestinationIdea>,
    pub itinerary: Option<Itinerary>,
}

/// Best-effort extraction of the outermost JSON object in `text`.
///
/// Scans from the first `{` to the last `}`; if that span is not valid
/// JSON the whole extraction yields `None`. Good enough for fenced or
/// prose-wrapped payloads, deliberately not a JSON repairer.
pub fn extract_json(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Decode whatever reply structure can be recovered from `raw`.
pub fn decode_reply(raw: &str) -> DecodedReply {
    let Some(value) = extract_json(raw) else {
        return DecodedReply::default();
    };
    DecodedReply {
        message: string_field(&value, "message"),
        suggestions: string_list(&value, "suggestions"),
        destinations: destination_list(&value),
        itinerary: itinerary_field(&value),
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn destination_list(value: &Value) -> Vec<DestinationIdea> {
    value
        .get("destinations")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(destination_item).collect())
        .unwrap_or_default()
}

// Models emit destinations either as plain strings or as objects.
fn destination_item(item: &Value) -> Option<DestinationIdea> {
    match item {
        Value::String(name) => {
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(DestinationIdea {
                name: name.to_string(),
                country: None,
                reason: None,
            })
        }
        Value::Object(_) => {
            let name = string_field(item, "name")?;
            Some(DestinationIdea {
                name,
                country: string_field(item, "country"),
                reason: string_field(item, "reason"),
            })
        }
        _ => None,
    }
}

fn itinerary_field(value: &Value) -> Option<Itinerary> {
    let raw = value.get("itinerary")?;
    let destination = string_field(raw, "destination").unwrap_or_default();
    let days: Vec<ItineraryDay> = raw
        .get("days")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| day_item(index, item))
                .collect()
        })
        .unwrap_or_default();

    if destination.is_empty() && days.is_empty() {
        return None;
    }
    Some(Itinerary {
        destination,
        days,
        notes: string_field(raw, "notes"),
    })
}

fn day_item(index: usize, item: &Value) -> Option<ItineraryDay> {
    let obj = item.as_object()?;
    let day = obj
        .get("day")
        .and_then(value_to_u32)
        .unwrap_or((index + 1) as u32);
    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("")
        .to_string();
    let activities: Vec<String> = obj
        .get("activities")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    if title.is_empty() && activities.is_empty() {
        return None;
    }
    Some(ItineraryDay {
        day,
        title,
        activities,
    })
}

// Numbers arrive as numbers or as quoted strings, depending on the model.
fn value_to_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().map(|v| v as u32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_markdown_fences() {
        let raw = "Here you go:\n```json\n{\"message\": \"Kyoto is lovely\"}\n```\nEnjoy!";
        let decoded = decode_reply(raw);
        assert_eq!(decoded.message.as_deref(), Some("Kyoto is lovely"));
    }

    #[test]
    fn extracts_from_prose_wrapping() {
        let raw = "Sure! {\"message\": \"ok\", \"suggestions\": [\"a\", \"b\"]} hope that helps";
        let decoded = decode_reply(raw);
        assert_eq!(decoded.message.as_deref(), Some("ok"));
        assert_eq!(decoded.suggestions, vec!["a", "b"]);
    }

    #[test]
    fn nested_objects_survive_the_brace_scan() {
        let raw = r#"{"message": "hi", "itinerary": {"destination": "Kyoto", "days": [{"day": 1, "title": "Arrival", "activities": ["check in"]}]}}"#;
        let decoded = decode_reply(raw);
        let itinerary = decoded.itinerary.unwrap();
        assert_eq!(itinerary.destination, "Kyoto");
        assert_eq!(itinerary.days.len(), 1);
        assert_eq!(itinerary.days[0].title, "Arrival");
    }

    #[test]
    fn no_json_yields_the_default() {
        assert_eq!(decode_reply("just plain prose"), DecodedReply::default());
        assert_eq!(decode_reply(""), DecodedReply::default());
        assert_eq!(decode_reply("} {"), DecodedReply::default());
    }

    #[test]
    fn invalid_json_span_yields_the_default() {
        assert_eq!(decode_reply("{not json at all}"), DecodedReply::default());
    }

    #[test]
    fn destinations_accept_strings_and_objects() {
        let raw = r#"{"destinations": ["Lisbon", {"name": "Porto", "country": "Portugal", "reason": "wine"}, 42]}"#;
        let decoded = decode_reply(raw);
        assert_eq!(decoded.destinations.len(), 2);
        assert_eq!(decoded.destinations[0].name, "Lisbon");
        assert_eq!(decoded.destinations[1].country.as_deref(), Some("Portugal"));
    }

    #[test]
    fn day_numbers_accept_quoted_strings() {
        let raw = r#"{"itinerary": {"destination": "Oslo", "days": [{"day": "2", "title": "Fjords"}]}}"#;
        let decoded = decode_reply(raw);
        assert_eq!(decoded.itinerary.unwrap().days[0].day, 2);
    }

    #[test]
    fn missing_day_numbers_fall_back_to_position() {
        let raw = r#"{"itinerary": {"destination": "Oslo", "days": [{"title": "Arrive"}, {"title": "Explore"}]}}"#;
        let decoded = decode_reply(raw);
        let days = decoded.itinerary.unwrap().days;
        assert_eq!(days[0].day, 1);
        assert_eq!(days[1].day, 2);
    }

    #[test]
    fn blank_strings_are_dropped_everywhere() {
        let raw = r#"{"message": "   ", "suggestions": ["", "  ", "real"]}"#;
        let decoded = decode_reply(raw);
        assert_eq!(decoded.message, None);
        assert_eq!(decoded.suggestions, vec!["real"]);
    }
}
