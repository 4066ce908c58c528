extern crate pretty_env_logger;
#[macro_use] extern crate log;

use overpass::{BoundingBox, OverpassAPI, TagFilter};
use std::env;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    pretty_env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 5 {
        eprintln!("Usage: {} <roads|water|land> <lat> <lon> <dist_m>", args[0]);
        eprintln!("");
        eprintln!("Examples:");
        eprintln!("  {} roads 3.1631 101.7014 1000", args[0]);
        eprintln!("  {} water 3.1631 101.7014 3000", args[0]);
        std::process::exit(1);
    }

    let lat: f64 = args[2].parse()?;
    let lon: f64 = args[3].parse()?;
    let dist: f64 = args[4].parse()?;
    let bbox = BoundingBox::from_point(lat, lon, dist);

    let api = OverpassAPI::new()?;
    info!("Bounding box: {}", bbox.overpass_filter());

    match args[1].as_str() {
        "roads" => {
            let mut network = api.fetch_road_network(&bbox).await?;
            println!("Downloaded {} road segments", network.edge_count());
            network.simplify();
            println!("Simplified to {} edges between {} nodes", network.edge_count(), network.node_count());
        }
        "water" => {
            let tags = TagFilter::new()
                .one_of("natural", &["water", "bay", "strait"])
                .one_of("waterway", &["riverbank"]);
            let polygons = api.fetch_polygons(&bbox, &tags).await?;
            println!("Found {} water polygons", polygons.len());
        }
        "land" => {
            let tags = TagFilter::new()
                .one_of("boundary", &["administrative"])
                .one_of("admin_level", &["4", "6", "8"]);
            let polygons = api.fetch_polygons(&bbox, &tags).await?;
            println!("Found {} land polygons", polygons.len());
        }
        other => {
            eprintln!("Unknown layer: {}", other);
            std::process::exit(1);
        }
    }

    Ok(())
}
