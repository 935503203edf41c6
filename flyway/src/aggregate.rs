use crate::{convert::PointSet, Crs, PipelineError};
use geo::geometry::{LineString, Point};
use log::debug;
use std::collections::HashMap;

/// How a single individual's points are ordered within its track.
///
/// The source table is not guaranteed to be chronologically ordered,
/// and a wrong guess silently misrepresents migration direction, so
/// the choice is an explicit parameter rather than a default buried in
/// the aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderPolicy {
    /// Keep each individual's points in raw input order.
    #[default]
    InputOrder,

    /// Stable-sort each individual's points by capture timestamp.
    /// Records without a timestamp fail with
    /// [`PipelineError::MissingTimestamp`].
    ///
    /// Timestamps are compared as strings. ISO-8601 values in one
    /// shared UTC offset (the source's all-`Z` convention) sort
    /// chronologically; mixed offsets are not normalized.
    Timestamp,
}

/// Per-individual path, start, and end tables.
///
/// Rows are keyed by individual identifier in the order identifiers
/// first appear in the input; the three tables always have the same
/// keys in the same order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackTables {
    pub(crate) crs: Crs,
    pub(crate) paths: Vec<(String, LineString<f64>)>,
    pub(crate) starts: Vec<(String, Point<f64>)>,
    pub(crate) ends: Vec<(String, Point<f64>)>,
}

impl TrackTables {
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Number of distinct individuals.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[(String, LineString<f64>)] {
        &self.paths
    }

    pub fn starts(&self) -> &[(String, Point<f64>)] {
        &self.starts
    }

    pub fn ends(&self) -> &[(String, Point<f64>)] {
        &self.ends
    }
}

/// Groups points by individual and builds the path/start/end tables.
///
/// A single-point track yields a degenerate zero-length path (the
/// point repeated) with start == end, never an invalid one-coordinate
/// line.
pub fn aggregate_tracks(
    points: &PointSet,
    order: OrderPolicy,
) -> Result<TrackTables, PipelineError> {
    if points.is_empty() {
        return Err(PipelineError::EmptyTrackSet);
    }
    if order == OrderPolicy::Timestamp {
        if let Some(row) = points.timestamps().iter().position(Option::is_none) {
            return Err(PipelineError::MissingTimestamp { row });
        }
    }

    // Group row indices per individual, keeping first-appearance order
    // of the identifiers themselves.
    let mut id_order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (row, id) in points.individuals().iter().enumerate() {
        groups
            .entry(id.as_str())
            .or_insert_with(|| {
                id_order.push(id.as_str());
                Vec::new()
            })
            .push(row);
    }

    let mut paths = Vec::with_capacity(id_order.len());
    let mut starts = Vec::with_capacity(id_order.len());
    let mut ends = Vec::with_capacity(id_order.len());

    for id in id_order {
        let mut rows = groups.remove(id).unwrap_or_default();
        if order == OrderPolicy::Timestamp {
            // Stable: equal timestamps keep their input order.
            rows.sort_by(|&a, &b| points.timestamps()[a].cmp(&points.timestamps()[b]));
        }
        let track: Vec<Point<f64>> = rows.iter().map(|&row| points.points()[row]).collect();
        let (Some(&first), Some(&last)) = (track.first(), track.last()) else {
            // Unreachable: every grouped id has at least one row.
            continue;
        };

        let line = if track.len() < 2 {
            LineString::from(vec![first, first])
        } else {
            LineString::from(track)
        };

        paths.push((id.to_string(), line));
        starts.push((id.to_string(), first));
        ends.push((id.to_string(), last));
    }

    debug!(
        "aggregated {} individuals from {} points",
        paths.len(),
        points.len()
    );
    Ok(TrackTables {
        crs: points.crs(),
        paths,
        starts,
        ends,
    })
}
