use crate::{Crs, PipelineError, TrackRecord};
use geo::geometry::Point;
use log::debug;

/// Converted telemetry: one point per input record, in input order,
/// every point tagged with the same CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    pub(crate) crs: Crs,
    pub(crate) individuals: Vec<String>,
    pub(crate) timestamps: Vec<Option<String>>,
    pub(crate) points: Vec<Point<f64>>,
}

impl PointSet {
    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point<f64>] {
        &self.points
    }

    pub fn individuals(&self) -> &[String] {
        &self.individuals
    }

    pub fn timestamps(&self) -> &[Option<String>] {
        &self.timestamps
    }
}

/// Turns raw records into geographic points.
///
/// Output is parallel to the input: same length, same order. A record
/// with a non-finite or out-of-range coordinate fails the whole batch
/// with [`PipelineError::InvalidCoordinate`].
pub fn convert_records(records: &[TrackRecord], crs: Crs) -> Result<PointSet, PipelineError> {
    let mut individuals = Vec::with_capacity(records.len());
    let mut timestamps = Vec::with_capacity(records.len());
    let mut points = Vec::with_capacity(records.len());

    for (row, record) in records.iter().enumerate() {
        if !in_bounds(record.lon, record.lat) {
            return Err(PipelineError::InvalidCoordinate {
                row,
                lon: record.lon,
                lat: record.lat,
            });
        }
        individuals.push(record.individual.clone());
        timestamps.push(record.timestamp.clone());
        points.push(Point::new(record.lon, record.lat));
    }

    debug!("converted {} records to {crs} points", points.len());
    Ok(PointSet {
        crs,
        individuals,
        timestamps,
        points,
    })
}

fn in_bounds(lon: f64, lat: f64) -> bool {
    lon.is_finite()
        && lat.is_finite()
        && (-180.0..=180.0).contains(&lon)
        && (-90.0..=90.0).contains(&lat)
}
