use std::time::Duration;

use geosync_core::Coordinates;
use serde::Deserialize;
use tracing::debug;

use crate::geocoder::{GeocodeHit, Geocoder, LookupError};

#[derive(Clone, Debug)]
pub struct NominatimSettings {
    pub endpoint: String,
    /// Sent on every request; the public service rejects anonymous clients.
    pub user_agent: String,
    pub country_codes: Option<String>,
    pub timeout: Duration,
}

impl Default for NominatimSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org/search".into(),
            user_agent: concat!("geosync/", env!("CARGO_PKG_VERSION")).into(),
            country_codes: Some("us".into()),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Blocking client for a Nominatim-compatible `/search` endpoint.
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    settings: NominatimSettings,
}

impl NominatimGeocoder {
    pub fn new(settings: NominatimSettings) -> Result<Self, LookupError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| LookupError::Setup(e.to_string()))?;
        Ok(Self { client, settings })
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, query: &str) -> Result<GeocodeHit, LookupError> {
        let mut params = vec![("q", query), ("format", "json"), ("limit", "1")];
        if let Some(cc) = self.settings.country_codes.as_deref().filter(|c| !c.is_empty()) {
            params.push(("countrycodes", cc));
        }

        let resp = self
            .client
            .get(&self.settings.endpoint)
            .query(&params)
            .send()
            .map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Http(status.as_u16()));
        }
        let body = resp.bytes().map_err(classify)?;
        debug!(query, bytes = body.len(), "nominatim response");
        parse_search_response(&body)
    }
}

fn classify(e: reqwest::Error) -> LookupError {
    if e.is_timeout() {
        LookupError::Timeout
    } else {
        LookupError::Transport(e.to_string())
    }
}

#[derive(Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Parse a `format=json` search body. Coordinates arrive as decimal strings.
pub fn parse_search_response(body: &[u8]) -> Result<GeocodeHit, LookupError> {
    let places: Vec<Place> = serde_json::from_slice(body).map_err(|e| LookupError::Malformed(e.to_string()))?;
    let place = places.into_iter().next().ok_or(LookupError::NoMatch)?;
    let parse = |field: &str, raw: &str| {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| LookupError::Malformed(format!("{field}={raw:?}")))
    };
    Ok(GeocodeHit {
        coords: Coordinates::new(parse("lat", &place.lat)?, parse("lon", &place.lon)?),
        label: place.display_name,
    })
}
