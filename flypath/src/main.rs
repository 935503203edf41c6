mod input;
mod options;
mod output;

use anyhow::{anyhow, Error as AnyError, Result};
use clap::Parser;
use flyway::{overlap_report, Crs, Pipeline};
use memo::Store;
use options::{Cli, Command};
use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
};

fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();
    env_logger::init();

    let store = Store::open(&cli.cache_dir)?;
    let pipeline = Pipeline::builder()
        .crs(Crs::epsg(cli.epsg))
        .order(cli.order.0)
        .tolerance(cli.tolerance)
        .allow_empty(cli.allow_empty)
        .build(store);

    match cli.cmd.clone() {
        Command::Paths { out_dir } => {
            let records = input::read_records(required(&cli.tracks, "--tracks")?)?;
            let points = pipeline.points(&records)?;
            let tables = pipeline.tracks(&points)?;
            std::fs::create_dir_all(&out_dir)?;
            output::write_paths(&tables, &out_dir)?;
        }
        Command::Areas { out_dir } => {
            let raw = input::read_areas(required(&cli.areas, "--areas")?, pipeline.crs())?;
            let simplified = pipeline.areas(&raw.boundaries)?;
            std::fs::create_dir_all(&out_dir)?;
            output::write_areas(&simplified, &raw.properties, &out_dir)?;
        }
        Command::Summary => print_summary(&pipeline, &cli)?,
        Command::ClearCache => pipeline.store().clear()?,
    }
    Ok(())
}

fn required<'a>(path: &'a Option<PathBuf>, flag: &str) -> Result<&'a Path> {
    path.as_deref()
        .ok_or_else(|| anyhow!("{flag} is required for this command"))
}

/// Prints one CSV row per individual: record count, path vertex count,
/// and (when an overlay file is given) how many areas the path crosses.
fn print_summary(pipeline: &Pipeline, cli: &Cli) -> Result<()> {
    let records = input::read_records(required(&cli.tracks, "--tracks")?)?;
    let points = pipeline.points(&records)?;
    let tables = pipeline.tracks(&points)?;

    let overlaps = match &cli.areas {
        Some(path) => {
            let raw = input::read_areas(path, pipeline.crs())?;
            let simplified = pipeline.areas(&raw.boundaries)?;
            Some(overlap_report(&tables, &simplified)?)
        }
        None => None,
    };

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in &records {
        *counts.entry(record.individual.as_str()).or_default() += 1;
    }

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "individual,records,path_vertices,crossed_areas")?;
    for (row, (id, path)) in tables.paths().iter().enumerate() {
        let record_count = counts.get(id.as_str()).copied().unwrap_or(0);
        let vertices = path.coords().count();
        match &overlaps {
            Some(overlaps) => writeln!(
                stdout,
                "{id},{record_count},{vertices},{}",
                overlaps[row].crossed
            )?,
            None => writeln!(stdout, "{id},{record_count},{vertices},-")?,
        }
    }
    Ok(())
}
