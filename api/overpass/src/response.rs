use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

use crate::geometry::{build_multipolygon, is_closed_ring, GeoCoord, Polygon};

/// Top-level `[out:json]` payload
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub remark: Option<String>,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node(Node),
    Way(Way),
    Relation(Relation),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Way {
    pub id: i64,
    #[serde(default)]
    pub nodes: Vec<i64>,
    /// Only present for `out geom` queries
    #[serde(default)]
    pub geometry: Vec<GeoCoord>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Relation {
    pub id: i64,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub member_type: String,
    #[serde(rename = "ref")]
    pub reference: i64,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub geometry: Vec<GeoCoord>,
}

impl OverpassResponse {
    pub fn parse(text: &str) -> Result<Self> {
        let response: OverpassResponse =
            serde_json::from_str(text).context("invalid Overpass JSON")?;
        if let Some(remark) = &response.remark {
            // Timeouts and memory exhaustion arrive as a 200 with partial elements
            if remark.trim_start().starts_with("runtime error") {
                return Err(anyhow!("Overpass query failed: {}", remark.trim()));
            }
            warn!("Overpass remark: {}", remark);
        }
        Ok(response)
    }

    /// Keep only areal geometry: closed ways and multipolygon/boundary relations.
    pub fn into_polygons(self) -> Vec<Polygon> {
        let mut polygons = Vec::new();

        for element in self.elements {
            match element {
                Element::Way(way) => {
                    if is_closed_ring(&way.geometry) {
                        polygons.push(Polygon::new(way.geometry));
                    }
                }
                Element::Relation(relation) => {
                    let areal = matches!(
                        relation.tags.get("type").map(String::as_str),
                        Some("multipolygon") | Some("boundary")
                    );
                    if !areal {
                        continue;
                    }

                    let mut outer = Vec::new();
                    let mut inner = Vec::new();
                    for member in relation.members {
                        if member.member_type != "way" || member.geometry.len() < 2 {
                            continue;
                        }
                        match member.role.as_str() {
                            "outer" | "" => outer.push(member.geometry),
                            "inner" => inner.push(member.geometry),
                            _ => {}
                        }
                    }

                    let assembled = build_multipolygon(outer, inner);
                    if assembled.is_empty() {
                        debug!("Relation {} produced no closed rings", relation.id);
                    }
                    polygons.extend(assembled);
                }
                _ => {}
            }
        }

        polygons
    }
}
