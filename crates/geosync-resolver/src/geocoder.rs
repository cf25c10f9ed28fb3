use geosync_core::{Coordinates, Record};
use thiserror::Error;

/// Best match returned by a resolution service.
#[derive(Clone, Debug, PartialEq)]
pub struct GeocodeHit {
    pub coords: Coordinates,
    pub label: Option<String>,
}

/// Why a single lookup produced no coordinates. None of these are cached.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("request timed out")]
    Timeout,
    #[error("service answered http {0}")]
    Http(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no match")]
    NoMatch,
    #[error("transport: {0}")]
    Transport(String),
    #[error("client setup: {0}")]
    Setup(String),
}

/// Free-text address lookup. Implementations make exactly one external
/// request per call; pacing is the caller's job.
pub trait Geocoder {
    fn geocode(&self, query: &str) -> Result<GeocodeHit, LookupError>;
}

impl<G: Geocoder + ?Sized> Geocoder for &G {
    fn geocode(&self, query: &str) -> Result<GeocodeHit, LookupError> {
        (**self).geocode(query)
    }
}

impl<G: Geocoder + ?Sized> Geocoder for std::sync::Arc<G> {
    fn geocode(&self, query: &str) -> Result<GeocodeHit, LookupError> {
        (**self).geocode(query)
    }
}

/// `"{street}, {city}, {region} {postal}, {suffix}"`; the suffix is omitted when blank.
pub fn build_query(record: &Record, suffix: &str) -> String {
    let mut q = format!(
        "{}, {}, {} {}",
        record.street.trim(),
        record.city.trim(),
        record.region.trim(),
        record.postal.trim()
    )
    .trim_end()
    .to_string();
    if !suffix.trim().is_empty() {
        q.push_str(", ");
        q.push_str(suffix.trim());
    }
    q
}
