use anyhow::{Context, Result};
use flyway::{BoundarySet, TrackTables};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use std::{fs::File, path::Path};

/// Writes the three per-individual tables as
/// `paths.geojson`, `starts.geojson`, and `ends.geojson`.
pub fn write_paths(tables: &TrackTables, out_dir: &Path) -> Result<()> {
    write_collection(
        &out_dir.join("paths.geojson"),
        tables
            .paths()
            .iter()
            .map(|(id, line)| keyed_feature(id, Value::from(line)))
            .collect(),
    )?;
    write_collection(
        &out_dir.join("starts.geojson"),
        tables
            .starts()
            .iter()
            .map(|(id, point)| keyed_feature(id, Value::from(point)))
            .collect(),
    )?;
    write_collection(
        &out_dir.join("ends.geojson"),
        tables
            .ends()
            .iter()
            .map(|(id, point)| keyed_feature(id, Value::from(point)))
            .collect(),
    )
}

/// Writes `areas_simplified.geojson`, re-attaching each feature's
/// original attributes by position.
pub fn write_areas(
    areas: &BoundarySet,
    properties: &[Option<JsonObject>],
    out_dir: &Path,
) -> Result<()> {
    let features = areas
        .features()
        .iter()
        .zip(properties)
        .map(|(multi, props)| Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::from(multi))),
            id: None,
            properties: props.clone(),
            foreign_members: None,
        })
        .collect();
    write_collection(&out_dir.join("areas_simplified.geojson"), features)
}

fn keyed_feature(id: &str, value: Value) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("tag-local-identifier".to_string(), JsonValue::from(id));
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn write_collection(path: &Path, features: Vec<Feature>) -> Result<()> {
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    let file = File::create(path).with_context(|| format!("creating {path:?}"))?;
    serde_json::to_writer(file, &collection)?;
    Ok(())
}
