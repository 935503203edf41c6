use crate::{Crs, PipelineError};
use geo::{geometry::MultiPolygon, Area, CoordsIter, SimplifyVwPreserve};
use log::debug;
use rayon::prelude::*;

/// Overlay boundary geometries (protected areas and the like), one
/// multi-polygon per source feature, in source order.
///
/// Attributes stay with the caller; because simplification preserves
/// feature order, callers can zip them back onto the output.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundarySet {
    pub(crate) crs: Crs,
    pub(crate) features: Vec<MultiPolygon<f64>>,
}

impl BoundarySet {
    pub fn new(crs: Crs, features: Vec<MultiPolygon<f64>>) -> Self {
        Self { crs, features }
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[MultiPolygon<f64>] {
        &self.features
    }

    /// Total coordinate count across all features.
    pub fn vertex_count(&self) -> usize {
        self.features.iter().map(|f| f.coords_count()).sum()
    }
}

/// Topology-preserving simplification of every feature under one
/// tolerance.
///
/// Deterministic: the same input and tolerance always yield the same
/// geometry, and zero tolerance is an exact no-op. A feature whose
/// simplified form has zero area fails with
/// [`PipelineError::DegenerateSimplification`] unless `allow_empty`.
pub fn simplify_areas(
    areas: &BoundarySet,
    tolerance: f64,
    allow_empty: bool,
) -> Result<BoundarySet, PipelineError> {
    if tolerance == 0.0 {
        return Ok(areas.clone());
    }

    let features = areas
        .features
        .par_iter()
        .enumerate()
        .map(|(index, feature)| {
            let simplified = feature.simplify_vw_preserve(&tolerance);
            if !allow_empty && simplified.unsigned_area() == 0.0 {
                return Err(PipelineError::DegenerateSimplification { index, tolerance });
            }
            Ok(simplified)
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        "simplified {} features: {} -> {} vertices at tolerance {tolerance}",
        areas.features.len(),
        areas.vertex_count(),
        features.iter().map(|f| f.coords_count()).sum::<usize>(),
    );
    Ok(BoundarySet {
        crs: areas.crs,
        features,
    })
}

#[cfg(test)]
mod tests {
    use super::{simplify_areas, BoundarySet, MultiPolygon};
    use crate::{Crs, PipelineError};
    use approx::assert_relative_eq;
    use geo::{polygon, Area, CoordsIter};

    fn square() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ]])
    }

    /// Square with a nearly-collinear midpoint nick on each side.
    fn nicked_square() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 0.5, y: 0.001),
            (x: 1.0, y: 0.0),
            (x: 1.001, y: 0.5),
            (x: 1.0, y: 1.0),
            (x: 0.5, y: 0.999),
            (x: 0.0, y: 1.0),
            (x: -0.001, y: 0.5),
        ]])
    }

    #[test]
    fn test_zero_tolerance_is_noop() {
        let areas = BoundarySet::new(Crs::WGS84, vec![square()]);
        let simplified = simplify_areas(&areas, 0.0, false).unwrap();
        assert_eq!(simplified, areas);
    }

    #[test]
    fn test_vertex_count_never_grows() {
        let areas = BoundarySet::new(Crs::WGS84, vec![nicked_square(), square()]);
        for tolerance in [0.0001, 0.01, 0.5] {
            let simplified = simplify_areas(&areas, tolerance, false).unwrap();
            assert_eq!(simplified.len(), areas.len());
            for (before, after) in areas.features().iter().zip(simplified.features()) {
                assert!(after.coords_count() <= before.coords_count());
            }
        }
    }

    #[test]
    fn test_nicks_removed_at_coarse_tolerance() {
        let areas = BoundarySet::new(Crs::WGS84, vec![nicked_square()]);
        let simplified = simplify_areas(&areas, 0.01, false).unwrap();
        assert!(simplified.vertex_count() < areas.vertex_count());
    }

    #[test]
    fn test_area_deviation_is_bounded() {
        let areas = BoundarySet::new(Crs::WGS84, vec![nicked_square()]);
        let simplified = simplify_areas(&areas, 0.01, false).unwrap();
        assert_relative_eq!(
            simplified.features()[0].unsigned_area(),
            areas.features()[0].unsigned_area(),
            max_relative = 0.05
        );
    }

    #[test]
    fn test_idempotent_for_fixed_tolerance() {
        let areas = BoundarySet::new(Crs::WGS84, vec![nicked_square()]);
        let once = simplify_areas(&areas, 0.01, false).unwrap();
        let twice = simplify_areas(&once, 0.01, false).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_zero_area_result_fails() {
        // Collinear ring: zero area going in, zero area coming out.
        let flat = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 2.0, y: 0.0),
        ]]);
        let areas = BoundarySet::new(Crs::WGS84, vec![square(), flat]);

        let err = simplify_areas(&areas, 0.1, false).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DegenerateSimplification { index: 1, .. }
        ));

        let allowed = simplify_areas(&areas, 0.1, true).unwrap();
        assert_eq!(allowed.len(), 2);
    }

    #[test]
    fn test_crs_preserved() {
        let areas = BoundarySet::new(Crs::epsg(3857), vec![square()]);
        let simplified = simplify_areas(&areas, 0.5, false).unwrap();
        assert_eq!(simplified.crs(), Crs::epsg(3857));
    }
}
