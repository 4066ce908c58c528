use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::app::theme::DEFAULT_THEME;

/// 12x16 in at this resolution is already ~830 MB of RGB
pub const MAX_DPI: u32 = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

/// Render a stylized map poster of a city's roads, land and water
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// City to render; also names the output file
    #[arg(short = 'c', long)]
    pub city: String,

    /// Country the city is in
    #[arg(short = 'C', long)]
    pub country: String,

    /// Theme name, looked up as <themes-dir>/<name>.json
    #[arg(short = 't', long, default_value = DEFAULT_THEME)]
    pub theme: String,

    /// Distance in metres from the centre to the top and bottom edges
    #[arg(short = 'd', long, default_value_t = 5000)]
    pub distance: u32,

    /// Output format; prompted for when omitted
    #[arg(short = 'f', long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Centre latitude; skips geocoding when given with --lon
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Centre longitude; skips geocoding when given with --lat
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    #[arg(long, env = "MAP_POSTER_THEMES_DIR", default_value = "themes")]
    pub themes_dir: PathBuf,

    #[arg(long, env = "MAP_POSTER_OUTPUT_DIR", default_value = "posters")]
    pub output_dir: PathBuf,

    /// Raster resolution; the poster is always 12x16 inches
    #[arg(long, default_value_t = 300)]
    pub dpi: u32,

    /// Ignore cached Overpass responses and download everything again,
    /// replacing the cached copies
    #[arg(long)]
    pub no_cache: bool,

    /// Where Overpass responses are cached
    #[arg(long, env = "MAP_POSTER_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Overpass interpreter URL; repeat to add fallbacks
    #[arg(long = "overpass-url")]
    pub overpass_urls: Vec<String>,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if self.distance == 0 {
            return Err(anyhow!("--distance must be greater than zero"));
        }
        if self.dpi == 0 || self.dpi > MAX_DPI {
            return Err(anyhow!("--dpi must be between 1 and {}", MAX_DPI));
        }
        if let Some(lat) = self.lat {
            // cos(lat) vanishes at the poles and the longitude span blows up
            if !(lat > -90.0 && lat < 90.0) {
                return Err(anyhow!("--lat {} must be strictly between -90 and 90", lat));
            }
        }
        if let Some(lon) = self.lon {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(anyhow!("--lon {} is outside [-180, 180]", lon));
            }
        }
        Ok(())
    }

    /// Explicit centre point, if both coordinates were given
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }

    /// Cache directory, or `None` when no platform cache location exists
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone().or_else(|| {
            dirs::cache_dir()
                .or_else(|| std::env::current_dir().ok().map(|d| d.join(".cache")))
                .map(|d| d.join("map-poster").join("overpass"))
        })
    }
}

/// Ask for the output format. Anything other than `png`/`svg`, including EOF, means SVG.
pub fn prompt_format<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> OutputFormat {
    let _ = write!(output, "Output format - enter 'png' or 'svg' [svg]: ");
    let _ = output.flush();

    let mut line = String::new();
    if input.read_line(&mut line).is_err() {
        return OutputFormat::Svg;
    }
    match line.trim().to_lowercase().as_str() {
        "png" => OutputFormat::Png,
        _ => OutputFormat::Svg,
    }
}
