use std::sync::Mutex;

use geosync_core::Coordinates;

use crate::geocoder::{GeocodeHit, Geocoder, LookupError};

/// Offline geocoder for tests.
///
/// Answers from a list of `(query fragment, outcome)` rules, first match wins;
/// unmatched queries fall through to the default. Every query is recorded.
pub struct ScriptedGeocoder {
    rules: Vec<(String, Result<Coordinates, LookupError>)>,
    fallback: Result<Coordinates, LookupError>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGeocoder {
    /// Every query resolves to `coords`.
    pub fn always(coords: Coordinates) -> Self {
        Self {
            rules: Vec::new(),
            fallback: Ok(coords),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every query fails with `err`.
    pub fn failing(err: LookupError) -> Self {
        Self {
            rules: Vec::new(),
            fallback: Err(err),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on(mut self, fragment: &str, outcome: Result<Coordinates, LookupError>) -> Self {
        self.rules.push((fragment.to_string(), outcome));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Geocoder for ScriptedGeocoder {
    fn geocode(&self, query: &str) -> Result<GeocodeHit, LookupError> {
        self.lock().push(query.to_string());
        let outcome = self
            .rules
            .iter()
            .find(|(fragment, _)| query.contains(fragment.as_str()))
            .map(|(_, outcome)| outcome)
            .unwrap_or(&self.fallback);
        outcome.clone().map(|coords| GeocodeHit { coords, label: None })
    }
}
