//! Routing providers: Google Directions primary, OSRM fallback.

use async_trait::async_trait;
use serde::Deserialize;
use sherpa_common::RouteSummary;
use std::fmt::Write as _;
use std::time::Duration;

use super::{EnrichError, RouteProvider};

pub const GOOGLE_DIRECTIONS: &str = "google-directions";
pub const OSRM: &str = "osrm";

const GOOGLE_BASE: &str = "https://maps.googleapis.com";
const OSRM_BASE: &str = "https://router.project-osrm.org";

// ============================================================================
// Google Directions
// ============================================================================

pub struct GoogleDirections {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleDirections {
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
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
    overview_polyline: Option<DirectionsPolyline>,
}

#[derive(Deserialize)]
struct DirectionsLeg {
    distance: Option<DirectionsValue>,
    duration: Option<DirectionsValue>,
}

#[derive(Deserialize)]
struct DirectionsValue {
    value: u64,
}

#[derive(Deserialize)]
struct DirectionsPolyline {
    points: String,
}

/// Legs are summed: with waypoints Google reports one leg per segment.
fn normalize_directions(raw: DirectionsResponse) -> Result<RouteSummary, EnrichError> {
    match raw.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" | "NOT_FOUND" => {
            return Err(EnrichError::NoResults("no route found".to_string()))
        }
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

    let route = raw
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| EnrichError::NoResults("empty route list".to_string()))?;
    let distance_meters = route
        .legs
        .iter()
        .filter_map(|leg| leg.distance.as_ref())
        .map(|d| d.value)
        .sum();
    let duration_seconds = route
        .legs
        .iter()
        .filter_map(|leg| leg.duration.as_ref())
        .map(|d| d.value)
        .sum();

    Ok(RouteSummary {
        distance_meters,
        duration_seconds,
        polyline: route.overview_polyline.map(|p| p.points),
        source: GOOGLE_DIRECTIONS.to_string(),
    })
}

#[async_trait]
impl RouteProvider for GoogleDirections {
    fn id(&self) -> &'static str {
        GOOGLE_DIRECTIONS
    }

    async fn route(
        &self,
        from: (f64, f64),
        to: (f64, f64),
        waypoints: &[(f64, f64)],
    ) -> Result<RouteSummary, EnrichError> {
        let url = format!("{}/maps/api/directions/json", self.base_url);
        let mut request = self.client.get(&url).query(&[
            ("origin", format!("{},{}", from.0, from.1)),
            ("destination", format!("{},{}", to.0, to.1)),
            ("key", self.api_key.clone()),
        ]);
        if !waypoints.is_empty() {
            let joined = waypoints
                .iter()
                .map(|(lat, lng)| format!("via:{},{}", lat, lng))
                .collect::<Vec<_>>()
                .join("|");
            request = request.query(&[("waypoints", joined)]);
        }

        let response = request
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

        let raw: DirectionsResponse = response
            .json()
            .await
            .map_err(|e| EnrichError::Decode(e.to_string()))?;
        normalize_directions(raw)
    }
}

// ============================================================================
// OSRM
// ============================================================================

pub struct Osrm {
    base_url: String,
    client: reqwest::Client,
}

impl Osrm {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: OSRM_BASE.to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    /// Meters.
    distance: f64,
    /// Seconds.
    duration: f64,
    geometry: Option<String>,
}

fn normalize_osrm(raw: OsrmResponse) -> Result<RouteSummary, EnrichError> {
    if raw.code != "Ok" {
        return Err(EnrichError::NoResults(format!("osrm code {}", raw.code)));
    }
    let route = raw
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| EnrichError::NoResults("empty route list".to_string()))?;
    Ok(RouteSummary {
        distance_meters: route.distance.round() as u64,
        duration_seconds: route.duration.round() as u64,
        polyline: route.geometry,
        source: OSRM.to_string(),
    })
}

/// OSRM wants `lon,lat;lon,lat;...` with waypoints between the endpoints.
fn osrm_coordinates(from: (f64, f64), to: (f64, f64), waypoints: &[(f64, f64)]) -> String {
    let mut path = String::new();
    let _ = write!(path, "{},{}", from.1, from.0);
    for (lat, lng) in waypoints {
        let _ = write!(path, ";{},{}", lng, lat);
    }
    let _ = write!(path, ";{},{}", to.1, to.0);
    path
}

#[async_trait]
impl RouteProvider for Osrm {
    fn id(&self) -> &'static str {
        OSRM
    }

    async fn route(
        &self,
        from: (f64, f64),
        to: (f64, f64),
        waypoints: &[(f64, f64)],
    ) -> Result<RouteSummary, EnrichError> {
        let url = format!(
            "{}/route/v1/driving/{}",
            self.base_url,
            osrm_coordinates(from, to, waypoints)
        );
        let response = self
            .client
            .get(&url)
            .query(&[("overview", "full"), ("geometries", "polyline")])
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

        let raw: OsrmResponse = response
            .json()
            .await
            .map_err(|e| EnrichError::Decode(e.to_string()))?;
        normalize_osrm(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_legs_are_summed() {
        let raw: DirectionsResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "routes": [{
                    "legs": [
                        {"distance": {"value": 250000}, "duration": {"value": 10800}},
                        {"distance": {"value": 213000}, "duration": {"value": 13500}}
                    ],
                    "overview_polyline": {"points": "abc123"}
                }]
            }"#,
        )
        .unwrap();
        let route = normalize_directions(raw).unwrap();
        assert_eq!(route.distance_meters, 463_000);
        assert_eq!(route.duration_seconds, 24_300);
        assert_eq!(route.polyline.as_deref(), Some("abc123"));
        assert_eq!(route.source, GOOGLE_DIRECTIONS);
    }

    #[test]
    fn directions_not_found_is_no_results() {
        let raw: DirectionsResponse =
            serde_json::from_str(r#"{"status": "NOT_FOUND", "routes": []}"#).unwrap();
        assert!(matches!(
            normalize_directions(raw),
            Err(EnrichError::NoResults(_))
        ));
    }

    #[test]
    fn osrm_rounds_floats_into_integers() {
        let raw: OsrmResponse = serde_json::from_str(
            r#"{"code": "Ok", "routes": [{"distance": 463217.9, "duration": 24312.4, "geometry": "poly"}]}"#,
        )
        .unwrap();
        let route = normalize_osrm(raw).unwrap();
        assert_eq!(route.distance_meters, 463_218);
        assert_eq!(route.duration_seconds, 24_312);
        assert_eq!(route.source, OSRM);
    }

    #[test]
    fn osrm_error_code_is_no_results() {
        let raw: OsrmResponse =
            serde_json::from_str(r#"{"code": "NoRoute", "routes": []}"#).unwrap();
        assert!(matches!(normalize_osrm(raw), Err(EnrichError::NoResults(_))));
    }

    #[test]
    fn osrm_path_is_lon_lat_ordered_with_waypoints_between() {
        let path = osrm_coordinates((59.91, 10.75), (60.39, 5.32), &[(61.0, 8.5)]);
        assert_eq!(path, "10.75,59.91;8.5,61;5.32,60.39");
    }
}
