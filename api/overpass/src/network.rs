use std::collections::{HashMap, HashSet};

use crate::geometry::{BoundingBox, GeoCoord};
use crate::response::{Element, OverpassResponse};

/// One road edge. Before simplification `geometry` is just the two end nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadEdge {
    pub u: i64,
    pub v: i64,
    /// `highway` values of every way merged into this edge, in first-seen order
    pub highway: Vec<String>,
    pub geometry: Vec<GeoCoord>,
}

impl RoadEdge {
    /// Highway tags joined into one lowercase string, `unclassified` when untagged.
    pub fn highway_label(&self) -> String {
        if self.highway.is_empty() {
            return "unclassified".to_string();
        }
        self.highway.join(" ").to_lowercase()
    }
}

/// Undirected road graph keyed by OSM node id
#[derive(Debug, Clone, Default)]
pub struct RoadNetwork {
    pub nodes: HashMap<i64, GeoCoord>,
    pub edges: Vec<RoadEdge>,
}

impl RoadNetwork {
    /// Build the unsimplified graph: one edge per consecutive node pair of every way.
    pub fn from_response(response: OverpassResponse) -> Self {
        let mut nodes = HashMap::new();
        let mut ways = Vec::new();

        for element in response.elements {
            match element {
                Element::Node(node) => {
                    nodes.insert(node.id, GeoCoord::new(node.lat, node.lon));
                }
                Element::Way(way) => ways.push(way),
                _ => {}
            }
        }

        let mut edges = Vec::new();
        for way in ways {
            let highway: Vec<String> = way.tags.get("highway").cloned().into_iter().collect();
            for pair in way.nodes.windows(2) {
                let (u, v) = (pair[0], pair[1]);
                let (Some(&a), Some(&b)) = (nodes.get(&u), nodes.get(&v)) else {
                    debug!("Way {} references a node missing from the response", way.id);
                    continue;
                };
                edges.push(RoadEdge {
                    u,
                    v,
                    highway: highway.clone(),
                    geometry: vec![a, b],
                });
            }
        }

        Self { nodes, edges }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Keep every edge with at least one end inside `bbox`, then drop unreferenced nodes.
    pub fn truncate_by_edge(&mut self, bbox: &BoundingBox) {
        let inside: HashSet<i64> = self
            .nodes
            .iter()
            .filter(|(_, coord)| bbox.contains(**coord))
            .map(|(id, _)| *id)
            .collect();

        self.edges
            .retain(|edge| inside.contains(&edge.u) || inside.contains(&edge.v));

        let referenced: HashSet<i64> = self.edges.iter().flat_map(|e| [e.u, e.v]).collect();
        self.nodes.retain(|id, _| referenced.contains(id));
    }

    fn incidence(&self) -> HashMap<i64, Vec<usize>> {
        let mut incidence: HashMap<i64, Vec<usize>> = HashMap::new();
        for (idx, edge) in self.edges.iter().enumerate() {
            incidence.entry(edge.u).or_default().push(idx);
            if edge.v != edge.u {
                incidence.entry(edge.v).or_default().push(idx);
            }
        }
        incidence
    }

    fn is_endpoint(&self, node: i64, incident: &[usize]) -> bool {
        let mut neighbours = HashSet::new();
        for &idx in incident {
            let edge = &self.edges[idx];
            if edge.u == edge.v {
                return true;
            }
            neighbours.insert(if edge.u == node { edge.v } else { edge.u });
        }
        neighbours.len() != 2 || incident.len() != 2
    }

    /// Collapse chains of interstitial nodes into single edges between endpoints.
    ///
    /// Merged edges carry the concatenated geometry and the union of their highway
    /// values. Rings without any endpoint are left untouched.
    pub fn simplify(&mut self) {
        let incidence = self.incidence();
        let endpoints: HashSet<i64> = incidence
            .iter()
            .filter(|(node, incident)| self.is_endpoint(**node, incident))
            .map(|(node, _)| *node)
            .collect();

        let mut visited = vec![false; self.edges.len()];
        let mut simplified = Vec::new();

        let mut starts: Vec<i64> = endpoints.iter().copied().collect();
        starts.sort_unstable();

        for start in starts {
            for &first in &incidence[&start] {
                if visited[first] {
                    continue;
                }
                visited[first] = true;

                let mut geometry = vec![self.nodes[&start]];
                let mut highway: Vec<String> = Vec::new();
                let mut edge_idx = first;
                let mut current = start;

                loop {
                    let edge = &self.edges[edge_idx];
                    let forward = edge.u == current;
                    let next = if forward { edge.v } else { edge.u };

                    if forward {
                        geometry.extend(edge.geometry.iter().skip(1));
                    } else {
                        geometry.extend(edge.geometry.iter().rev().skip(1));
                    }
                    for tag in &edge.highway {
                        if !highway.contains(tag) {
                            highway.push(tag.clone());
                        }
                    }

                    current = next;
                    if endpoints.contains(&current) {
                        break;
                    }

                    // Interstitial nodes have exactly two incident edges
                    match incidence[&current].iter().find(|&&idx| !visited[idx]) {
                        Some(&idx) => {
                            visited[idx] = true;
                            edge_idx = idx;
                        }
                        None => break,
                    }
                }

                simplified.push(RoadEdge {
                    u: start,
                    v: current,
                    highway,
                    geometry,
                });
            }
        }

        let before = self.edges.len();
        for (idx, edge) in self.edges.drain(..).enumerate() {
            if !visited[idx] {
                simplified.push(edge);
            }
        }
        self.edges = simplified;

        let referenced: HashSet<i64> = self.edges.iter().flat_map(|e| [e.u, e.v]).collect();
        self.nodes.retain(|id, _| referenced.contains(id));

        debug!("Simplified {} edges into {}", before, self.edges.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A T-junction: 1-2-3-4 along a primary road, 3-5 a residential spur.
    // Node 6 lies far outside the test bbox.
    const ROADS: &str = r#"{
        "elements": [
            {"type": "way", "id": 100, "nodes": [1, 2, 3, 4], "tags": {"highway": "primary"}},
            {"type": "way", "id": 101, "nodes": [3, 5], "tags": {"highway": "residential"}},
            {"type": "way", "id": 102, "nodes": [5, 6], "tags": {"highway": "service"}},
            {"type": "node", "id": 1, "lat": 0.0, "lon": 0.0},
            {"type": "node", "id": 2, "lat": 0.0, "lon": 0.1},
            {"type": "node", "id": 3, "lat": 0.0, "lon": 0.2},
            {"type": "node", "id": 4, "lat": 0.0, "lon": 0.3},
            {"type": "node", "id": 5, "lat": 0.1, "lon": 0.2},
            {"type": "node", "id": 6, "lat": 5.0, "lon": 5.0}
        ]
    }"#;

    fn network() -> RoadNetwork {
        RoadNetwork::from_response(OverpassResponse::parse(ROADS).unwrap())
    }

    #[test]
    fn test_from_response_builds_segment_edges() {
        let network = network();
        assert_eq!(network.edge_count(), 5);
        assert_eq!(network.node_count(), 6);
        assert_eq!(network.edges[0].geometry.len(), 2);
    }

    #[test]
    fn test_truncate_by_edge_keeps_edges_crossing_boundary() {
        let mut network = network();
        network.truncate_by_edge(&BoundingBox::new(-1.0, 1.0, -1.0, 1.0));
        // 5-6 crosses the boundary and is kept, along with node 6
        assert_eq!(network.edge_count(), 5);
        assert!(network.nodes.contains_key(&6));

        let mut network = self::network();
        network.truncate_by_edge(&BoundingBox::new(-1.0, 0.15, -1.0, 0.05));
        // Only nodes 1 and 2 are inside: edges 1-2 and 2-3 survive
        assert_eq!(network.edge_count(), 2);
        assert_eq!(network.node_count(), 3);
    }

    #[test]
    fn test_simplify_merges_interstitial_nodes() {
        let mut network = network();
        network.simplify();
        // 1-2-3 merges through node 2; 3-4, 3-5-6 merge through 5
        assert_eq!(network.edge_count(), 3);
        assert!(!network.nodes.contains_key(&2));
        assert!(!network.nodes.contains_key(&5));

        let spur = network
            .edges
            .iter()
            .find(|e| (e.u == 3 && e.v == 6) || (e.u == 6 && e.v == 3))
            .unwrap();
        assert_eq!(spur.geometry.len(), 3);
        assert_eq!(spur.highway_label(), if spur.u == 3 { "residential service" } else { "service residential" });

        let main = network
            .edges
            .iter()
            .find(|e| (e.u == 1 && e.v == 3) || (e.u == 3 && e.v == 1))
            .unwrap();
        assert_eq!(main.geometry.len(), 3);
        assert_eq!(main.highway, vec!["primary".to_string()]);
    }

    #[test]
    fn test_simplify_keeps_isolated_ring() {
        let text = r#"{
            "elements": [
                {"type": "way", "id": 1, "nodes": [1, 2, 3, 1], "tags": {"highway": "footway"}},
                {"type": "node", "id": 1, "lat": 0.0, "lon": 0.0},
                {"type": "node", "id": 2, "lat": 0.0, "lon": 1.0},
                {"type": "node", "id": 3, "lat": 1.0, "lon": 1.0}
            ]
        }"#;
        let mut network = RoadNetwork::from_response(OverpassResponse::parse(text).unwrap());
        network.simplify();
        assert_eq!(network.edge_count(), 3);
    }

    #[test]
    fn test_highway_label_defaults_to_unclassified() {
        let edge = RoadEdge {
            u: 1,
            v: 2,
            highway: Vec::new(),
            geometry: Vec::new(),
        };
        assert_eq!(edge.highway_label(), "unclassified");
    }
}
