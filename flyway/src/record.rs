use serde::{Deserialize, Serialize};

/// One raw telemetry row as it appears in the source table.
///
/// Field renames follow the Movebank-style column headers of the
/// source dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Identifier of the tracked individual.
    #[serde(rename = "tag-local-identifier")]
    pub individual: String,

    /// Longitude in degrees.
    #[serde(rename = "location-long")]
    pub lon: f64,

    /// Latitude in degrees.
    #[serde(rename = "location-lat")]
    pub lat: f64,

    /// ISO-8601 capture time, when the source provides one.
    #[serde(rename = "timestamp", default)]
    pub timestamp: Option<String>,
}

impl TrackRecord {
    pub fn new(individual: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            individual: individual.into(),
            lon,
            lat,
            timestamp: None,
        }
    }

    pub fn timestamped(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}
