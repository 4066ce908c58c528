mod app;

extern crate pretty_env_logger;
#[macro_use] extern crate log;

use anyhow::Result;
use clap::Parser;
use nominatim::NominatimAPI;
use overpass::{GeoCoord, OverpassAPI};
use std::io;
use std::time::Instant;

use app::config::{prompt_format, Args};
use app::output::generate_output_filename;
use app::poster::{create_poster, PosterRequest};
use app::render::Canvas;
use app::theme::load_theme;

#[tokio::main]
async fn main() {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let started = Instant::now();
    let args = Args::parse();

    if let Err(e) = run(args, started).await {
        error!("✗ CRITICAL ERROR: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args, started: Instant) -> Result<()> {
    args.validate()?;

    let format = match args.format {
        Some(format) => format,
        None => prompt_format(&mut io::stdin().lock(), &mut io::stdout()),
    };

    let theme = load_theme(&args.themes_dir, &args.theme)?;
    let center = resolve_center(&args).await?;
    let output = generate_output_filename(&args.output_dir, &args.city, &args.theme, format)?;

    let mut api = OverpassAPI::new()?.with_endpoints(args.overpass_urls.clone());
    if let Some(dir) = args.resolved_cache_dir() {
        debug!("Overpass cache at {}", dir.display());
        api = api.with_cache_dir(dir);
    }
    if args.no_cache {
        api = api.refresh_cache();
    }

    let request = PosterRequest {
        city: args.city.clone(),
        country: args.country.clone(),
        center,
        distance_m: args.distance,
        output,
        format,
        canvas: Canvas::poster(args.dpi),
    };

    create_poster(&api, &theme, &request, started).await
}

/// Use --lat/--lon when given, otherwise geocode the city
async fn resolve_center(args: &Args) -> Result<GeoCoord> {
    if let Some((lat, lon)) = args.coordinates() {
        info!("📍 Using coordinates {:.5}, {:.5}", lat, lon);
        return Ok(GeoCoord::new(lat, lon));
    }

    info!("📍 Looking up {}, {}...", args.city, args.country);
    let place = NominatimAPI::new()?.geocode(&args.city, &args.country).await?;
    Ok(GeoCoord::new(place.lat, place.lon))
}
