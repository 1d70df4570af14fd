//! Normalized enrichment results.
//!
//! Every provider for a category, paid primary or free fallback, is
//! flattened into the same shape before it leaves the daemon. The
//! `_source` tag records which provider actually served the data so
//! downstream consumers can see degradation without parsing logs.

use serde::{Deserialize, Serialize};

/// Current conditions at a point, in metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub wind_kph: f64,
    /// Short human-readable condition, e.g. "partly cloudy".
    pub condition: String,
    #[serde(rename = "_source")]
    pub source: String,
}

/// Rectangle around a geocoded place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// A place name resolved to coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(rename = "_source")]
    pub source: String,
}

/// A computed route between two places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub distance_meters: u64,
    pub duration_seconds: u64,
    /// Encoded polyline when the provider supplies one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
    #[serde(rename = "_source")]
    pub source: String,
}

/// Enrichment attached to a chat response. Absent categories are
/// omitted from the wire entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeocodeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteSummary>,
}

impl EnhancedData {
    pub fn is_empty(&self) -> bool {
        self.weather.is_none() && self.location.is_none() && self.route.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_tag_uses_underscore_name_on_the_wire() {
        let report = WeatherReport {
            temperature_c: 21.5,
            humidity_pct: 60.0,
            wind_kph: 12.0,
            condition: "clear".to_string(),
            source: "open-meteo".to_string(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["_source"], "open-meteo");
        assert_eq!(json["temperatureC"], 21.5);
        assert!(json.get("source").is_none());
    }

    #[test]
    fn empty_enhanced_data_serializes_to_empty_object() {
        let data = EnhancedData::default();
        assert!(data.is_empty());
        assert_eq!(serde_json::to_string(&data).unwrap(), "{}");
    }

    #[test]
    fn geocode_omits_missing_bounding_box() {
        let hit = GeocodeResult {
            formatted_address: "Tokyo, Japan".to_string(),
            lat: 35.6762,
            lng: 139.6503,
            bounding_box: None,
            source: "nominatim".to_string(),
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert!(json.get("boundingBox").is_none());
        assert_eq!(json["formattedAddress"], "Tokyo, Japan");
    }
}
