use crate::{BoundarySet, PipelineError, TrackTables};
use geo::Intersects;

/// How many overlay features one individual's path crosses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    pub individual: String,
    pub crossed: usize,
}

/// Counts, per individual, the overlay features its path intersects.
///
/// Fails fast with [`PipelineError::CrsMismatch`] when the two inputs
/// disagree on reference system; intersecting geometries from
/// different CRSs would silently misalign.
pub fn overlap_report(
    tables: &TrackTables,
    areas: &BoundarySet,
) -> Result<Vec<Overlap>, PipelineError> {
    if tables.crs() != areas.crs() {
        return Err(PipelineError::CrsMismatch {
            left: tables.crs(),
            right: areas.crs(),
        });
    }

    Ok(tables
        .paths()
        .iter()
        .map(|(individual, path)| Overlap {
            individual: individual.clone(),
            crossed: areas
                .features()
                .iter()
                .filter(|feature| feature.intersects(path))
                .count(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{overlap_report, Overlap};
    use crate::{
        aggregate_tracks, convert_records, BoundarySet, Crs, OrderPolicy, PipelineError,
        TrackRecord,
    };
    use geo::{geometry::MultiPolygon, polygon};

    fn tables() -> crate::TrackTables {
        let records = vec![
            TrackRecord::new("A7", -2.0, 0.5),
            TrackRecord::new("A7", 2.0, 0.5),
            TrackRecord::new("B3", -2.0, 5.0),
            TrackRecord::new("B3", 2.0, 5.0),
        ];
        let set = convert_records(&records, Crs::WGS84).unwrap();
        aggregate_tracks(&set, OrderPolicy::InputOrder).unwrap()
    }

    fn unit_square_at(x: f64, y: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
        ]])
    }

    #[test]
    fn test_crossing_counts() {
        let areas = BoundarySet::new(
            Crs::WGS84,
            vec![unit_square_at(-1.0, 0.0), unit_square_at(0.5, 0.0)],
        );
        let report = overlap_report(&tables(), &areas).unwrap();
        assert_eq!(
            report,
            [
                Overlap {
                    individual: "A7".to_string(),
                    crossed: 2
                },
                Overlap {
                    individual: "B3".to_string(),
                    crossed: 0
                },
            ]
        );
    }

    #[test]
    fn test_crs_mismatch_fails() {
        let areas = BoundarySet::new(Crs::epsg(3857), vec![unit_square_at(0.0, 0.0)]);
        let err = overlap_report(&tables(), &areas).unwrap_err();
        assert!(matches!(err, PipelineError::CrsMismatch { .. }));
    }
}
