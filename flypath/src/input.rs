use anyhow::{Context, Result};
use flyway::{
    geo::geometry::{Geometry as GeoGeometry, MultiPolygon},
    BoundarySet, Crs, TrackRecord,
};
use geojson::{FeatureCollection, GeoJson, JsonObject};
use log::warn;
use std::{fs::File, path::Path};

/// Overlay features split into geometry (for the pipeline) and the
/// per-feature attributes that ride along unchanged.
pub struct AreaFeatures {
    pub properties: Vec<Option<JsonObject>>,
    pub boundaries: BoundarySet,
}

pub fn read_records(path: &Path) -> Result<Vec<TrackRecord>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening tracks {path:?}"))?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: TrackRecord = row?;
        records.push(record);
    }
    Ok(records)
}

pub fn read_areas(path: &Path, crs: Crs) -> Result<AreaFeatures> {
    let file = File::open(path).with_context(|| format!("opening areas {path:?}"))?;
    let geojson = GeoJson::from_reader(file)?;
    let collection = FeatureCollection::try_from(geojson)?;

    let mut properties = Vec::with_capacity(collection.features.len());
    let mut features = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            warn!("skipping overlay feature without geometry");
            continue;
        };
        let multi = match GeoGeometry::<f64>::try_from(geometry.value)? {
            GeoGeometry::Polygon(polygon) => MultiPolygon(vec![polygon]),
            GeoGeometry::MultiPolygon(multi) => multi,
            _ => {
                warn!("skipping non-polygon overlay feature");
                continue;
            }
        };
        properties.push(feature.properties);
        features.push(multi);
    }

    Ok(AreaFeatures {
        properties,
        boundaries: BoundarySet::new(crs, features),
    })
}
