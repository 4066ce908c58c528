#[macro_use] extern crate log;

pub mod geometry;
pub mod network;
pub mod response;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use geometry::{BoundingBox, GeoCoord, Polygon};
pub use network::{RoadEdge, RoadNetwork};
pub use response::OverpassResponse;

pub const DEFAULT_ENDPOINTS: [&str; 2] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
];

/// Server-side timeout in seconds; the HTTP timeout gets a little headroom on top.
const QUERY_TIMEOUT_SECS: u64 = 180;

/// OSMnx `network_type="all"` highway filter
const ALL_HIGHWAYS_FILTER: &str = r#"["highway"]["area"!~"yes"]["highway"!~"abandoned|construction|no|planned|platform|proposed|raceway|razed"]"#;

/// Tag predicate for feature queries. An element matches when any clause matches;
/// a clause with no values matches any value of its key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagFilter {
    clauses: Vec<(String, Vec<String>)>,
}

impl TagFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn any(mut self, key: &str) -> Self {
        self.clauses.push((key.to_string(), Vec::new()));
        self
    }

    pub fn one_of(mut self, key: &str, values: &[&str]) -> Self {
        self.clauses
            .push((key.to_string(), values.iter().map(|v| v.to_string()).collect()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Overpass QL selectors, one per clause
    fn selectors(&self) -> Vec<String> {
        self.clauses
            .iter()
            .map(|(key, values)| match values.len() {
                0 => format!("[\"{}\"]", key),
                1 => format!("[\"{}\"=\"{}\"]", key, values[0]),
                _ => format!("[\"{}\"~\"^({})$\"]", key, values.join("|")),
            })
            .collect()
    }
}

/// Query for every drivable/walkable way plus the nodes they reference.
pub fn road_network_query(bbox: &BoundingBox) -> String {
    format!(
        "[out:json][timeout:{}];(way{}({}););out body;>;out skel qt;",
        QUERY_TIMEOUT_SECS,
        ALL_HIGHWAYS_FILTER,
        bbox.overpass_filter()
    )
}

/// Query for ways and relations matching `tags`, with inline geometry.
pub fn features_query(bbox: &BoundingBox, tags: &TagFilter) -> String {
    let filter = bbox.overpass_filter();
    let body: String = tags
        .selectors()
        .iter()
        .map(|selector| format!("way{selector}({filter});relation{selector}({filter});"))
        .collect();
    format!("[out:json][timeout:{}];({});out geom;", QUERY_TIMEOUT_SECS, body)
}

/// Overpass API client with an optional on-disk response cache
pub struct OverpassAPI {
    client: Client,
    endpoints: Vec<String>,
    cache_dir: Option<PathBuf>,
    refresh: bool,
}

impl OverpassAPI {
    /// Create a client against the public endpoints, without caching
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(QUERY_TIMEOUT_SECS + 20))
            .user_agent(concat!("map-poster/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoints: DEFAULT_ENDPOINTS.iter().map(ToString::to_string).collect(),
            cache_dir: None,
            refresh: false,
        })
    }

    /// Replace the endpoint list. An empty list keeps the defaults.
    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        if !endpoints.is_empty() {
            self.endpoints = endpoints;
        }
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Skip cached responses but still store fresh ones
    pub fn refresh_cache(mut self) -> Self {
        self.refresh = true;
        self
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Fetch the road graph around `bbox`, truncated by edge but not simplified.
    pub async fn fetch_road_network(&self, bbox: &BoundingBox) -> Result<RoadNetwork> {
        let response = self.query(&road_network_query(bbox)).await?;
        let mut network = RoadNetwork::from_response(response);
        network.truncate_by_edge(bbox);
        Ok(network)
    }

    /// Fetch areal features matching `tags`
    pub async fn fetch_polygons(&self, bbox: &BoundingBox, tags: &TagFilter) -> Result<Vec<Polygon>> {
        if tags.is_empty() {
            return Err(anyhow!("feature query needs at least one tag"));
        }
        Ok(self.query(&features_query(bbox, tags)).await?.into_polygons())
    }

    /// Run a raw query, consulting the cache first. Only responses that
    /// parse cleanly are cached.
    pub async fn query(&self, query: &str) -> Result<OverpassResponse> {
        let cache_path = self.cache_dir.as_deref().map(|dir| cache_path(dir, query));

        if let Some(path) = cache_path.as_deref().filter(|_| !self.refresh) {
            if let Some(response) = load_cache(path) {
                return Ok(response);
            }
        }

        let (text, response) = self.request(query).await?;

        if let Some(path) = &cache_path {
            if let Err(e) = save_cache(path, &text) {
                warn!("Failed to write Overpass cache {}: {}", path.display(), e);
            }
        }

        Ok(response)
    }

    /// POST the query to each endpoint in turn until one returns a usable response
    async fn request(&self, query: &str) -> Result<(String, OverpassResponse)> {
        let mut errors = Vec::new();

        for url in &self.endpoints {
            info!("Querying Overpass at {}", url);
            let response = match self.client.post(url).form(&[("data", query)]).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Overpass request to {} failed: {}", url, e);
                    errors.push(format!("{url}: {e}"));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                warn!("Overpass at {} answered HTTP {}", url, status);
                errors.push(format!("{url}: HTTP {status}"));
                continue;
            }

            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Reading Overpass response from {} failed: {}", url, e);
                    errors.push(format!("{url}: {e}"));
                    continue;
                }
            };
            info!("Received {} bytes from {}", text.len(), url);

            match OverpassResponse::parse(&text) {
                Ok(parsed) => return Ok((text, parsed)),
                Err(e) => {
                    warn!("Unusable Overpass response from {}: {:#}", url, e);
                    errors.push(format!("{url}: {e:#}"));
                }
            }
        }

        Err(anyhow!("all Overpass endpoints failed: {}", errors.join("; ")))
    }
}

/// Cache file for a query: `<dir>/<crc32 of query>.json`
pub fn cache_path(dir: &Path, query: &str) -> PathBuf {
    let key = crc32fast::hash(query.as_bytes());
    dir.join(format!("{:08x}.json", key))
}

/// Store a response for `query` as if it had been downloaded
pub fn store_cached(dir: &Path, query: &str, text: &str) -> Result<()> {
    save_cache(&cache_path(dir, query), text)
}

/// A cached response, or `None` when missing. Unparseable entries are removed.
fn load_cache(path: &Path) -> Option<OverpassResponse> {
    let text = fs::read_to_string(path).ok()?;
    match OverpassResponse::parse(&text) {
        Ok(response) => {
            info!("Using cached Overpass response {}", path.display());
            Some(response)
        }
        Err(e) => {
            warn!("Discarding bad Overpass cache {}: {:#}", path.display(), e);
            let _ = fs::remove_file(path);
            None
        }
    }
}

/// Write through a temporary file so readers never see a partial entry
fn save_cache(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
    fs::write(&tmp, text).with_context(|| format!("writing {}", tmp.display()))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("moving cache entry to {}", path.display()));
    }
    Ok(())
}
