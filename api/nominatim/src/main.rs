extern crate pretty_env_logger;

use nominatim::NominatimAPI;
use std::env;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    pretty_env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <city> <country>", args[0]);
        eprintln!("");
        eprintln!("Example:");
        eprintln!("  {} \"Kuala Lumpur\" Malaysia", args[0]);
        std::process::exit(1);
    }

    let api = NominatimAPI::new()?;
    let place = api.geocode(&args[1], &args[2]).await?;

    println!("{}", place.display_name);
    println!("lat: {}", place.lat);
    println!("lon: {}", place.lon);

    Ok(())
}
