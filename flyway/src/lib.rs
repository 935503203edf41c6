//! Geospatial pipeline for animal-tracking telemetry.
//!
//! Raw tabular coordinate records become CRS-tagged point geometries,
//! per-individual migration paths with start/end locations, and
//! simplified overlay polygons; every expensive stage is memoized
//! through a content-addressed [`memo::Store`].

mod aggregate;
mod context;
mod convert;
mod crs;
mod error;
mod overlay;
mod record;
mod simplify;

pub use crate::{
    aggregate::{aggregate_tracks, OrderPolicy, TrackTables},
    context::Pipeline,
    convert::{convert_records, PointSet},
    crs::Crs,
    error::PipelineError,
    overlay::{overlap_report, Overlap},
    record::TrackRecord,
    simplify::{simplify_areas, BoundarySet},
};
pub use geo;
