use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use crate::layers::basemap::{self, Basemap, DEFAULT_BASEMAP};
use crate::layers::{self, file::load_registry, LayerDef};

/// tui-webgis - terminal viewer for provincial WebGIS layers
#[derive(Parser, Debug)]
#[command(name = "tui-webgis")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding local layer sources
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Base URL for root-relative layer sources (e.g. http://localhost:5173)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Read every layer from the data directory, remote ones included
    #[arg(long)]
    pub offline: bool,

    /// TOML layer registry replacing the built-in catalog
    #[arg(long, value_name = "FILE")]
    pub layers: Option<PathBuf>,

    /// Initial basemap (osm, topo, satellite, terrain)
    #[arg(long, default_value = DEFAULT_BASEMAP)]
    pub basemap: String,

    /// Initial zoom level
    #[arg(long, default_value_t = 9)]
    pub zoom: u8,

    /// Log file (the terminal belongs to the UI)
    #[arg(long, default_value = "tui-webgis.log")]
    pub log_file: PathBuf,
}

/// Validated startup settings
#[derive(Debug)]
pub struct Settings {
    pub registry: Vec<LayerDef>,
    pub basemap: &'static Basemap,
    pub zoom: u8,
    pub data_dir: PathBuf,
    pub base_url: Option<String>,
    pub offline: bool,
    pub log_file: PathBuf,
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let Some(basemap) = basemap::find(&cli.basemap) else {
            let known: Vec<_> = basemap::BASEMAPS.iter().map(|b| b.id).collect();
            bail!("unknown basemap '{}' (expected one of: {})", cli.basemap, known.join(", "));
        };

        let registry = match &cli.layers {
            Some(path) => load_registry(path)?,
            None => layers::registry(),
        };

        Ok(Self {
            registry,
            basemap,
            zoom: cli.zoom.min(basemap.max_zoom),
            data_dir: cli.data_dir,
            base_url: cli.base_url,
            offline: cli.offline,
            log_file: cli.log_file,
        })
    }
}
