use anyhow::{anyhow, Error as AnyError};
use clap::{Parser, Subcommand};
use flyway::OrderPolicy;
use std::{path::PathBuf, str::FromStr};

/// Derive per-individual migration paths, start/end locations, and
/// simplified conservation-area overlays from raw tracking telemetry.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// CSV of raw tracking records.
    #[arg(short, long)]
    pub tracks: Option<PathBuf>,

    /// GeoJSON collection of overlay boundary polygons.
    #[arg(short, long)]
    pub areas: Option<PathBuf>,

    /// Directory for the persisted computation cache.
    #[arg(short, long, default_value = "cache_dir")]
    pub cache_dir: PathBuf,

    /// Simplification tolerance for overlay polygons.
    #[arg(long, default_value_t = 0.1)]
    pub tolerance: f64,

    /// Allow simplification to empty a polygon instead of failing.
    #[arg(long, default_value_t = false)]
    pub allow_empty: bool,

    /// EPSG code shared by all inputs.
    #[arg(long, default_value_t = 4326)]
    pub epsg: u32,

    /// Per-track point ordering: "input" or "timestamp".
    #[arg(long, default_value = "input")]
    pub order: Order,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Clone, Copy, Debug)]
pub struct Order(pub OrderPolicy);

impl FromStr for Order {
    type Err = AnyError;

    fn from_str(s: &str) -> Result<Self, AnyError> {
        match s {
            "input" => Ok(Self(OrderPolicy::InputOrder)),
            "timestamp" => Ok(Self(OrderPolicy::Timestamp)),
            other => Err(anyhow!("not an ordering policy: {other}")),
        }
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Write paths.geojson, starts.geojson, and ends.geojson.
    Paths {
        /// Output directory.
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Write areas_simplified.geojson.
    Areas {
        /// Output directory.
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Print per-individual record counts and overlay crossings.
    Summary,

    /// Delete the persisted computation cache.
    ClearCache,
}
