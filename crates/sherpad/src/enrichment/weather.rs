//! Weather providers: Google Weather API primary, Open-Meteo fallback.

use async_trait::async_trait;
use serde::Deserialize;
use sherpa_common::WeatherReport;
use std::time::Duration;

use super::{EnrichError, WeatherProvider};

pub const GOOGLE_WEATHER: &str = "google-weather";
pub const OPEN_METEO: &str = "open-meteo";

const GOOGLE_BASE: &str = "https://weather.googleapis.com";
const OPEN_METEO_BASE: &str = "https://api.open-meteo.com";

fn transport(e: reqwest::Error) -> EnrichError {
    EnrichError::Http(e.to_string())
}

async fn status_error(response: reqwest::Response) -> EnrichError {
    let code = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(200).collect();
    if code == 403 {
        EnrichError::Denied(body)
    } else {
        EnrichError::Status { code, body }
    }
}

// ============================================================================
// Google Weather
// ============================================================================

pub struct GoogleWeather {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleWeather {
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
#[serde(rename_all = "camelCase")]
struct GoogleConditions {
    temperature: Option<GoogleDegrees>,
    relative_humidity: Option<f64>,
    wind: Option<GoogleWind>,
    weather_condition: Option<GoogleCondition>,
}

#[derive(Deserialize)]
struct GoogleDegrees {
    degrees: Option<f64>,
}

#[derive(Deserialize)]
struct GoogleWind {
    speed: Option<GoogleSpeed>,
}

#[derive(Deserialize)]
struct GoogleSpeed {
    value: Option<f64>,
}

#[derive(Deserialize)]
struct GoogleCondition {
    description: Option<GoogleText>,
}

#[derive(Deserialize)]
struct GoogleText {
    text: Option<String>,
}

fn normalize_google(raw: GoogleConditions) -> Result<WeatherReport, EnrichError> {
    let temperature_c = raw
        .temperature
        .and_then(|t| t.degrees)
        .ok_or_else(|| EnrichError::Decode("missing temperature".to_string()))?;
    Ok(WeatherReport {
        temperature_c,
        humidity_pct: raw.relative_humidity.unwrap_or(0.0),
        wind_kph: raw.wind.and_then(|w| w.speed).and_then(|s| s.value).unwrap_or(0.0),
        condition: raw
            .weather_condition
            .and_then(|c| c.description)
            .and_then(|d| d.text)
            .map(|t| t.to_lowercase())
            .unwrap_or_else(|| "unknown".to_string()),
        source: GOOGLE_WEATHER.to_string(),
    })
}

#[async_trait]
impl WeatherProvider for GoogleWeather {
    fn id(&self) -> &'static str {
        GOOGLE_WEATHER
    }

    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherReport, EnrichError> {
        let url = format!("{}/v1/currentConditions:lookup", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("location.latitude", &lat.to_string()),
                ("location.longitude", &lon.to_string()),
                ("unitsSystem", "METRIC"),
            ])
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let raw: GoogleConditions = response
            .json()
            .await
            .map_err(|e| EnrichError::Decode(e.to_string()))?;
        normalize_google(raw)
    }
}

// ============================================================================
// Open-Meteo
// ============================================================================

pub struct OpenMeteo {
    base_url: String,
    client: reqwest::Client,
}

impl OpenMeteo {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: OPEN_METEO_BASE.to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Deserialize)]
struct OpenMeteoResponse {
    current: Option<OpenMeteoCurrent>,
}

#[derive(Deserialize)]
struct OpenMeteoCurrent {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
    weather_code: Option<u32>,
}

/// WMO weather interpretation codes, grouped coarsely.
fn describe_weather_code(code: u32) -> &'static str {
    match code {
        0 => "clear sky",
        1..=3 => "partly cloudy",
        45 | 48 => "fog",
        51..=57 => "drizzle",
        61..=67 => "rain",
        71..=77 => "snow",
        80..=82 => "rain showers",
        85 | 86 => "snow showers",
        95..=99 => "thunderstorm",
        _ => "unsettled",
    }
}

fn normalize_open_meteo(raw: OpenMeteoResponse) -> Result<WeatherReport, EnrichError> {
    let current = raw
        .current
        .ok_or_else(|| EnrichError::Decode("missing current block".to_string()))?;
    let temperature_c = current
        .temperature_2m
        .ok_or_else(|| EnrichError::Decode("missing temperature".to_string()))?;
    Ok(WeatherReport {
        temperature_c,
        humidity_pct: current.relative_humidity_2m.unwrap_or(0.0),
        wind_kph: current.wind_speed_10m.unwrap_or(0.0),
        condition: describe_weather_code(current.weather_code.unwrap_or(u32::MAX)).to_string(),
        source: OPEN_METEO.to_string(),
    })
}

#[async_trait]
impl WeatherProvider for OpenMeteo {
    fn id(&self) -> &'static str {
        OPEN_METEO
    }

    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherReport, EnrichError> {
        let url = format!("{}/v1/forecast", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", lat.to_string().as_str()),
                ("longitude", lon.to_string().as_str()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code",
                ),
            ])
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let raw: OpenMeteoResponse = response
            .json()
            .await
            .map_err(|e| EnrichError::Decode(e.to_string()))?;
        normalize_open_meteo(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_payload_normalizes_field_for_field() {
        let raw: GoogleConditions = serde_json::from_str(
            r#"{
                "temperature": {"degrees": 21.5},
                "relativeHumidity": 58,
                "wind": {"speed": {"value": 11.2}},
                "weatherCondition": {"description": {"text": "Partly cloudy"}}
            }"#,
        )
        .unwrap();
        let report = normalize_google(raw).unwrap();
        assert_eq!(report.temperature_c, 21.5);
        assert_eq!(report.humidity_pct, 58.0);
        assert_eq!(report.wind_kph, 11.2);
        assert_eq!(report.condition, "partly cloudy");
        assert_eq!(report.source, GOOGLE_WEATHER);
    }

    #[test]
    fn google_without_temperature_is_a_decode_error() {
        let raw: GoogleConditions = serde_json::from_str("{}").unwrap();
        assert!(matches!(normalize_google(raw), Err(EnrichError::Decode(_))));
    }

    #[test]
    fn open_meteo_payload_normalizes_with_wmo_condition() {
        let raw: OpenMeteoResponse = serde_json::from_str(
            r#"{"current": {"temperature_2m": 14.8, "relative_humidity_2m": 71, "wind_speed_10m": 22.7, "weather_code": 61}}"#,
        )
        .unwrap();
        let report = normalize_open_meteo(raw).unwrap();
        assert_eq!(report.temperature_c, 14.8);
        assert_eq!(report.condition, "rain");
        assert_eq!(report.source, OPEN_METEO);
    }

    #[test]
    fn weather_codes_group_sensibly() {
        assert_eq!(describe_weather_code(0), "clear sky");
        assert_eq!(describe_weather_code(2), "partly cloudy");
        assert_eq!(describe_weather_code(95), "thunderstorm");
        assert_eq!(describe_weather_code(33), "unsettled");
    }
}
