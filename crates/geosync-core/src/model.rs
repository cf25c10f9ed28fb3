use serde::{Deserialize, Serialize};

use crate::{ids::*, types::*};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub street: String,
    pub city: String,
    pub region: String,
    pub postal: String,
    pub status: FacilityStatus,
    /// Kept as published; compared as text.
    pub capacity: String,
    pub license_date: String,
    /// Comma-delimited citation identifiers, possibly empty.
    pub citations: String,
}

impl Record {
    /// The fields whose change invalidates a resolved location.
    /// Region is deliberately excluded.
    pub fn address_key(&self) -> String {
        format!("{}{}{}", self.street, self.city, self.postal)
    }

    /// Full address line for humans, including region.
    pub fn display_address(&self) -> String {
        format!("{}, {}, {} {}", self.street, self.city, self.region, self.postal)
            .trim()
            .to_string()
    }

    pub fn citation_count(&self) -> usize {
        count_citations(&self.citations)
    }

    pub fn capacity_value(&self) -> Option<u32> {
        self.capacity.trim().parse().ok()
    }

    /// Street, city and region must all be present to attempt a lookup.
    pub fn has_resolvable_address(&self) -> bool {
        !self.street.trim().is_empty() && !self.city.trim().is_empty() && !self.region.trim().is_empty()
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Unknown"
        } else {
            &self.name
        }
    }
}

pub fn count_citations(raw: &str) -> usize {
    raw.split(',').filter(|c| !c.trim().is_empty()).count()
}

/// A resolved real-world location.
///
/// Serialized as `{"lat": .., "lon": ..}`, which is what the serving process reads.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}
