use crate::{
    aggregate::{aggregate_tracks, OrderPolicy, TrackTables},
    convert::{convert_records, PointSet},
    simplify::{simplify_areas, BoundarySet},
    Crs, PipelineError, TrackRecord,
};
use geo::geometry::{Coord, LineString, MultiPolygon, Point, Polygon};
use memo::{OpTag, Store};
use serde::{Deserialize, Serialize};

const CONVERT_OP: OpTag = OpTag::new("convert-points", 1);
const AGGREGATE_OP: OpTag = OpTag::new("aggregate-tracks", 1);
const SIMPLIFY_OP: OpTag = OpTag::new("simplify-areas", 1);

/// Per-run pipeline context.
///
/// Owns the memo store handle and the run configuration (CRS, ordering
/// policy, simplification tolerance) and threads them through every
/// stage. All state is explicit here; no stage reads process-wide
/// variables.
pub struct Pipeline {
    store: Store,
    crs: Crs,
    order: OrderPolicy,
    tolerance: f64,
    allow_empty: bool,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder {
            crs: Crs::default(),
            order: OrderPolicy::default(),
            tolerance: 0.1,
            allow_empty: false,
        }
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Memoized [`convert_records`].
    pub fn points(&self, records: &[TrackRecord]) -> Result<PointSet, PipelineError> {
        let input = (self.crs.code(), records);
        let rows: Vec<PointRow> = self.store.get_or_compute(CONVERT_OP, &input, || {
            convert_records(records, self.crs).map(|set| point_rows(&set))
        })?;
        Ok(rows_to_points(self.crs, rows))
    }

    /// Memoized [`aggregate_tracks`].
    pub fn tracks(&self, points: &PointSet) -> Result<TrackTables, PipelineError> {
        let input = (points.crs().code(), order_label(self.order), point_rows(points));
        let rows: TrackRows = self.store.get_or_compute(AGGREGATE_OP, &input, || {
            aggregate_tracks(points, self.order).map(|tables| track_rows(&tables))
        })?;
        Ok(rows_to_tracks(points.crs(), rows))
    }

    /// Memoized [`simplify_areas`] at this run's tolerance.
    pub fn areas(&self, boundaries: &BoundarySet) -> Result<BoundarySet, PipelineError> {
        let input = (
            boundaries.crs().code(),
            self.tolerance.to_bits(),
            self.allow_empty,
            boundary_rows(boundaries),
        );
        let rows: Vec<MultiPolyRow> = self.store.get_or_compute(SIMPLIFY_OP, &input, || {
            simplify_areas(boundaries, self.tolerance, self.allow_empty)
                .map(|set| boundary_rows(&set))
        })?;
        Ok(rows_to_boundaries(boundaries.crs(), rows))
    }
}

pub struct PipelineBuilder {
    crs: Crs,
    order: OrderPolicy,
    tolerance: f64,
    allow_empty: bool,
}

impl PipelineBuilder {
    pub fn crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    pub fn order(mut self, order: OrderPolicy) -> Self {
        self.order = order;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    pub fn build(self, store: Store) -> Pipeline {
        Pipeline {
            store,
            crs: self.crs,
            order: self.order,
            tolerance: self.tolerance,
            allow_empty: self.allow_empty,
        }
    }
}

// Persisted shadows of the stage outputs. Cached values and hashed
// inputs go through these rather than `geo` types directly, keeping
// the on-disk entry format independent of geometry-crate internals.

#[derive(Serialize, Deserialize)]
struct PointRow {
    individual: String,
    timestamp: Option<String>,
    x: f64,
    y: f64,
}

type CoordRow = (f64, f64);
/// Rings of one polygon; first ring is the exterior.
type PolyRow = Vec<Vec<CoordRow>>;
type MultiPolyRow = Vec<PolyRow>;

#[derive(Serialize, Deserialize)]
struct TrackRows {
    paths: Vec<(String, Vec<CoordRow>)>,
    starts: Vec<(String, CoordRow)>,
    ends: Vec<(String, CoordRow)>,
}

fn order_label(order: OrderPolicy) -> &'static str {
    match order {
        OrderPolicy::InputOrder => "input",
        OrderPolicy::Timestamp => "timestamp",
    }
}

fn point_rows(set: &PointSet) -> Vec<PointRow> {
    set.individuals
        .iter()
        .zip(&set.timestamps)
        .zip(&set.points)
        .map(|((individual, timestamp), point)| PointRow {
            individual: individual.clone(),
            timestamp: timestamp.clone(),
            x: point.x(),
            y: point.y(),
        })
        .collect()
}

fn rows_to_points(crs: Crs, rows: Vec<PointRow>) -> PointSet {
    let mut individuals = Vec::with_capacity(rows.len());
    let mut timestamps = Vec::with_capacity(rows.len());
    let mut points = Vec::with_capacity(rows.len());
    for row in rows {
        individuals.push(row.individual);
        timestamps.push(row.timestamp);
        points.push(Point::new(row.x, row.y));
    }
    PointSet {
        crs,
        individuals,
        timestamps,
        points,
    }
}

fn line_row(line: &LineString<f64>) -> Vec<CoordRow> {
    line.coords().map(|c| (c.x, c.y)).collect()
}

fn row_line(row: Vec<CoordRow>) -> LineString<f64> {
    LineString::from(row)
}

fn track_rows(tables: &TrackTables) -> TrackRows {
    TrackRows {
        paths: tables
            .paths
            .iter()
            .map(|(id, line)| (id.clone(), line_row(line)))
            .collect(),
        starts: tables
            .starts
            .iter()
            .map(|(id, p)| (id.clone(), (p.x(), p.y())))
            .collect(),
        ends: tables
            .ends
            .iter()
            .map(|(id, p)| (id.clone(), (p.x(), p.y())))
            .collect(),
    }
}

fn rows_to_tracks(crs: Crs, rows: TrackRows) -> TrackTables {
    TrackTables {
        crs,
        paths: rows
            .paths
            .into_iter()
            .map(|(id, row)| (id, row_line(row)))
            .collect(),
        starts: rows
            .starts
            .into_iter()
            .map(|(id, (x, y))| (id, Point::new(x, y)))
            .collect(),
        ends: rows
            .ends
            .into_iter()
            .map(|(id, (x, y))| (id, Point::new(x, y)))
            .collect(),
    }
}

fn ring_row(ring: &LineString<f64>) -> Vec<CoordRow> {
    ring.coords().map(|c| (c.x, c.y)).collect()
}

fn row_ring(row: Vec<CoordRow>) -> LineString<f64> {
    LineString::from(
        row.into_iter()
            .map(|(x, y)| Coord { x, y })
            .collect::<Vec<_>>(),
    )
}

fn boundary_rows(set: &BoundarySet) -> Vec<MultiPolyRow> {
    set.features
        .iter()
        .map(|multi| {
            multi
                .0
                .iter()
                .map(|poly| {
                    std::iter::once(ring_row(poly.exterior()))
                        .chain(poly.interiors().iter().map(ring_row))
                        .collect()
                })
                .collect()
        })
        .collect()
}

fn rows_to_boundaries(crs: Crs, rows: Vec<MultiPolyRow>) -> BoundarySet {
    let features = rows
        .into_iter()
        .map(|multi| {
            MultiPolygon(
                multi
                    .into_iter()
                    .map(|mut rings| {
                        let exterior = if rings.is_empty() {
                            LineString::new(Vec::new())
                        } else {
                            row_ring(rings.remove(0))
                        };
                        let interiors = rings.into_iter().map(row_ring).collect();
                        Polygon::new(exterior, interiors)
                    })
                    .collect(),
            )
        })
        .collect();
    BoundarySet { crs, features }
}
