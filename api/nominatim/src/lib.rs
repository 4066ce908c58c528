use anyhow::{anyhow, Context, Result};
use log::*;
use reqwest::Client;
use serde::Deserialize;

/// Nominatim geocoding client
pub struct NominatimAPI {
    client: Client,
    base_url: String,
}

/// A geocoded place
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

/// Raw search hit; Nominatim encodes coordinates as strings
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

impl NominatimAPI {
    /// Create a new Nominatim client
    pub fn new() -> Result<Self> {
        // Nominatim's usage policy rejects requests without an identifying agent
        let client = Client::builder()
            .user_agent(concat!("map-poster/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: "https://nominatim.openstreetmap.org/search".to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Resolve a city within a country to its best-ranked coordinates
    pub async fn geocode(&self, city: &str, country: &str) -> Result<Place> {
        let params = search_params(city, country);
        info!("Geocoding {}, {}", city, country);

        let response = self.client.get(&self.base_url).query(&params).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Nominatim request failed: {} - URL: {}", response.status(),
                format!("{}?{}", self.base_url, serde_urlencoded::to_string(&params).unwrap_or_default())));
        }

        let text = response.text().await?;
        let place = parse_search_results(&text)?
            .ok_or_else(|| anyhow!("no match for {}, {}", city, country))?;

        info!("Resolved to {} ({:.5}, {:.5})", place.display_name, place.lat, place.lon);
        Ok(place)
    }
}

fn search_params<'a>(city: &'a str, country: &'a str) -> Vec<(&'static str, &'a str)> {
    vec![
        ("city", city),
        ("country", country),
        ("format", "json"),
        ("limit", "1"),
    ]
}

/// First hit of a JSON search response, if any
fn parse_search_results(text: &str) -> Result<Option<Place>> {
    let hits: Vec<SearchHit> = serde_json::from_str(text).context("invalid Nominatim response")?;

    let Some(hit) = hits.into_iter().next() else {
        return Ok(None);
    };

    let lat: f64 = hit.lat.parse().with_context(|| format!("bad latitude {:?}", hit.lat))?;
    let lon: f64 = hit.lon.parse().with_context(|| format!("bad longitude {:?}", hit.lon))?;

    Ok(Some(Place {
        lat,
        lon,
        display_name: hit.display_name,
    }))
}
