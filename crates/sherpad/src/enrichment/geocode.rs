//! Geocoding providers: Google Geocoding primary, Nominatim fallback.

use async_trait::async_trait;
use serde::Deserialize;
use sherpa_common::{BoundingBox, GeocodeResult};
use std::time::Duration;

use super::{EnrichError, GeocodeProvider};

pub const GOOGLE_GEOCODING: &str = "google-geocoding";
pub const NOMINATIM: &str = "nominatim";

const GOOGLE_BASE: &str = "https://maps.googleapis.com";
const NOMINATIM_BASE: &str = "https://nominatim.openstreetmap.org";

// ============================================================================
// Google Geocoding
// ============================================================================

pub struct GoogleGeocode {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleGeocode {
    pub fn new(api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: GOOGLE_BASE.to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Deserialize)]
struct GoogleGeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GoogleHit>,
}

#[derive(Deserialize)]
struct GoogleHit {
    formatted_address: String,
    geometry: GoogleGeometry,
}

#[derive(Deserialize)]
struct GoogleGeometry {
    location: GoogleLatLng,
    viewport: Option<GoogleViewport>,
}

#[derive(Deserialize)]
struct GoogleLatLng {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct GoogleViewport {
    northeast: GoogleLatLng,
    southwest: GoogleLatLng,
}

/// Google reports API-level failures inside a 200 body; the `status`
/// string is the real signal.
fn normalize_google(raw: GoogleGeocodeResponse) -> Result<GeocodeResult, EnrichError> {
    match raw.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Err(EnrichError::NoResults("zero results".to_string())),
        "REQUEST_DENIED" | "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => {
            return Err(EnrichError::Denied(
                raw.error_message.unwrap_or_else(|| raw.status.clone()),
            ))
        }
        other => {
            return Err(EnrichError::Decode(format!(
                "status {}: {}",
                other,
                raw.error_message.unwrap_or_default()
            )))
        }
    }

    let hit = raw
        .results
        .into_iter()
        .next()
        .ok_or_else(|| EnrichError::NoResults("empty result list".to_string()))?;
    Ok(GeocodeResult {
        formatted_address: hit.formatted_address,
        lat: hit.geometry.location.lat,
        lng: hit.geometry.location.lng,
        bounding_box: hit.geometry.viewport.map(|v| BoundingBox {
            north: v.northeast.lat,
            south: v.southwest.lat,
            east: v.northeast.lng,
            west: v.southwest.lng,
        }),
        source: GOOGLE_GEOCODING.to_string(),
    })
}

#[async_trait]
impl GeocodeProvider for GoogleGeocode {
    fn id(&self) -> &'static str {
        GOOGLE_GEOCODING
    }

    async fn geocode(&self, query: &str) -> Result<GeocodeResult, EnrichError> {
        let url = format!("{}/maps/api/geocode/json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("address", query), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| EnrichError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::Status {
                code: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let raw: GoogleGeocodeResponse = response
            .json()
            .await
            .map_err(|e| EnrichError::Decode(e.to_string()))?;
        normalize_google(raw)
    }
}

// ============================================================================
// Nominatim
// ============================================================================

pub struct Nominatim {
    base_url: String,
    client: reqwest::Client,
}

impl Nominatim {
    /// Nominatim's usage policy requires an identifying User-Agent.
    pub fn new(timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            base_url: NOMINATIM_BASE.to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Deserialize)]
struct NominatimHit {
    display_name: String,
    /// Coordinates arrive as quoted decimal strings.
    lat: String,
    lon: String,
    /// `[south, north, west, east]`, also as strings.
    #[serde(default)]
    boundingbox: Vec<String>,
}

fn normalize_nominatim(mut hits: Vec<NominatimHit>) -> Result<GeocodeResult, EnrichError> {
    if hits.is_empty() {
        return Err(EnrichError::NoResults("empty result list".to_string()));
    }
    let hit = hits.remove(0);
    let lat: f64 = hit
        .lat
        .trim()
        .parse()
        .map_err(|_| EnrichError::Decode(format!("bad latitude '{}'", hit.lat)))?;
    let lng: f64 = hit
        .lon
        .trim()
        .parse()
        .map_err(|_| EnrichError::Decode(format!("bad longitude '{}'", hit.lon)))?;

    let bounding_box = parse_bounding_box(&hit.boundingbox);

    Ok(GeocodeResult {
        formatted_address: hit.display_name,
        lat,
        lng,
        bounding_box,
        source: NOMINATIM.to_string(),
    })
}

fn parse_bounding_box(raw: &[String]) -> Option<BoundingBox> {
    if raw.len() != 4 {
        return None;
    }
    let mut parsed = [0.0f64; 4];
    for (slot, value) in parsed.iter_mut().zip(raw) {
        *slot = value.trim().parse().ok()?;
    }
    Some(BoundingBox {
        south: parsed[0],
        north: parsed[1],
        west: parsed[2],
        east: parsed[3],
    })
}

#[async_trait]
impl GeocodeProvider for Nominatim {
    fn id(&self) -> &'static str {
        NOMINATIM
    }

    async fn geocode(&self, query: &str) -> Result<GeocodeResult, EnrichError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| EnrichError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::Status {
                code: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let hits: Vec<NominatimHit> = response
            .json()
            .await
            .map_err(|e| EnrichError::Decode(e.to_string()))?;
        normalize_nominatim(hits)
    }
}
