use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use overpass::{BoundingBox, GeoCoord, OverpassAPI, Polygon, TagFilter};
use std::path::PathBuf;
use std::time::Instant;

use crate::app::config::OutputFormat;
use crate::app::render::{render_poster, Canvas, PosterExtent, PosterLayers};
use crate::app::styling::get_styling;
use crate::app::theme::Theme;

/// Extra margin fetched around the visible window so roads run off the edge
pub const DOWNLOAD_MARGIN_M: u32 = 2000;

/// Everything needed to produce one poster
#[derive(Debug, Clone)]
pub struct PosterRequest {
    pub city: String,
    pub country: String,
    pub center: GeoCoord,
    pub distance_m: u32,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub canvas: Canvas,
}

impl PosterRequest {
    pub fn download_bbox(&self) -> BoundingBox {
        let dist = (self.distance_m + DOWNLOAD_MARGIN_M) as f64;
        BoundingBox::from_point(self.center.lat, self.center.lon, dist)
    }
}

/// Sea, lakes, bays and river areas
pub fn water_tags() -> TagFilter {
    TagFilter::new()
        .one_of("natural", &["water", "bay", "strait"])
        .one_of("waterway", &["riverbank"])
}

/// Administrative areas; together they cover the land surface
pub fn land_tags() -> TagFilter {
    TagFilter::new()
        .one_of("boundary", &["administrative"])
        .one_of("admin_level", &["4", "6", "8"])
}

/// A failed feature layer is logged and drawn empty rather than aborting the poster.
async fn fetch_layer(
    api: &OverpassAPI,
    bbox: &BoundingBox,
    tags: &TagFilter,
    label: &str,
    progress: &ProgressBar,
) -> Vec<Polygon> {
    let result = api.fetch_polygons(bbox, tags).await;
    progress.inc(1);
    match result {
        Ok(polygons) => {
            debug!("{} layer: {} polygons", label, polygons.len());
            polygons
        }
        Err(e) => {
            warn!("Skipping {} layer: {:#}", label, e);
            Vec::new()
        }
    }
}

pub async fn create_poster(api: &OverpassAPI, theme: &Theme, request: &PosterRequest, started: Instant) -> Result<()> {
    info!("🚀 Starting poster generation for {}, {}...", request.city, request.country);
    let bbox = request.download_bbox();

    // 1. Roads
    info!("📡 Requesting road network from OpenStreetMap...");
    let mut network = api.fetch_road_network(&bbox).await?;
    info!("📊 Downloaded {} road segments.", network.edge_count());

    info!("🔧 Simplifying road geometry for clean lines...");
    network.simplify();
    info!("✓ Road network processing complete ({} edges).", network.edge_count());

    // 2. Land and water
    info!("🌊 Fetching geography features (Land and Water)...");
    let progress = ProgressBar::new(2);
    progress.set_style(ProgressStyle::with_template("{msg} [{bar:20}] {pos}/{len}")?);
    progress.set_message("Extracting Geometry");
    let (water, land) = (water_tags(), land_tags());
    let (inland_water, landmass) = futures::join!(
        fetch_layer(api, &bbox, &water, "water", &progress),
        fetch_layer(api, &bbox, &land, "land", &progress),
    );
    progress.finish_and_clear();
    info!("✓ Geography features processed.");

    // 3. Render
    info!("🎨 Initializing map canvas and calculating crop...");
    let extent = PosterExtent::new(request.center, request.distance_m as f64, &request.canvas);
    let (colors, widths) = get_styling(&network, theme);

    info!("🖌️ Drawing layers (Land -> Water -> Roads)...");
    let layers = PosterLayers {
        land: &landmass,
        water: &inland_water,
        roads: &network,
        road_colors: &colors,
        road_widths_pt: &widths,
    };

    // 4. Export
    render_poster(&request.output, request.format, &request.canvas, extent, theme, &layers, || {
        info!("✓ All layers drawn successfully.");
        info!("💾 Saving high-resolution {} file...", request.format.extension().to_uppercase());
    })?;

    info!("✨ DONE! Total time elapsed: {:.2} seconds.", started.elapsed().as_secs_f64());
    info!("📂 File saved to: {}", request.output.display());
    Ok(())
}
