use serde::{Deserialize, Serialize};

/// Header names of the dataset columns the pipeline reads.
///
/// Columns absent from a file read as empty strings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ColumnMap {
    pub id: String,
    pub name: String,
    pub street: String,
    pub city: String,
    pub region: String,
    pub postal: String,
    pub status: String,
    pub capacity: String,
    pub license_date: String,
    pub citations: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            id: "Facility Number".into(),
            name: "Facility Name".into(),
            street: "Facility Address".into(),
            city: "Facility City".into(),
            region: "Facility State".into(),
            postal: "Facility Zip".into(),
            status: "Facility Status".into(),
            capacity: "Facility Capacity".into(),
            license_date: "License First Date".into(),
            citations: "Citation Numbers".into(),
        }
    }
}
