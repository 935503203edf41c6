use crate::crs::Crs;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A record's longitude/latitude is non-finite or outside
    /// geographic bounds. Conversion of the whole batch aborts; no
    /// records are silently dropped.
    #[error("record {row}: invalid coordinate ({lon}, {lat})")]
    InvalidCoordinate { row: usize, lon: f64, lat: f64 },

    #[error("no tracking points to aggregate")]
    EmptyTrackSet,

    /// The timestamp ordering policy was requested but a record has no
    /// timestamp to sort by.
    #[error("record {row}: ordering by timestamp but record has none")]
    MissingTimestamp { row: usize },

    /// Simplification left a polygon with zero area and the caller did
    /// not opt into empty results.
    #[error("simplification collapsed polygon {index} at tolerance {tolerance}")]
    DegenerateSimplification { index: usize, tolerance: f64 },

    #[error("CRS mismatch: {left} vs {right}")]
    CrsMismatch { left: Crs, right: Crs },
}
