use overpass::{RoadEdge, RoadNetwork};

use crate::app::theme::{Rgba, Theme};

/// Drawing class of a road, decided by substring match on its highway tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadClass {
    Motorway,
    Primary,
    Secondary,
    Residential,
}

impl RoadClass {
    /// First match wins: motorway, then trunk/primary, then secondary
    pub fn classify(highway: &str) -> Self {
        let highway = highway.to_lowercase();
        if highway.contains("motorway") {
            RoadClass::Motorway
        } else if highway.contains("trunk") || highway.contains("primary") {
            RoadClass::Primary
        } else if highway.contains("secondary") {
            RoadClass::Secondary
        } else {
            RoadClass::Residential
        }
    }

    pub fn of_edge(edge: &RoadEdge) -> Self {
        Self::classify(&edge.highway_label())
    }

    /// Line width in points
    pub fn width_pt(&self) -> f64 {
        match self {
            RoadClass::Motorway => 1.2,
            RoadClass::Primary => 1.0,
            RoadClass::Secondary => 0.6,
            RoadClass::Residential => 0.3,
        }
    }

    pub fn color(&self, theme: &Theme) -> Rgba {
        match self {
            RoadClass::Motorway => theme.motorway(),
            RoadClass::Primary => theme.primary(),
            RoadClass::Secondary => theme.secondary(),
            RoadClass::Residential => theme.residential(),
        }
    }
}

/// Per-edge colours and widths (points), in edge order
pub fn get_styling(network: &RoadNetwork, theme: &Theme) -> (Vec<Rgba>, Vec<f64>) {
    network
        .edges
        .iter()
        .map(|edge| {
            let class = RoadClass::of_edge(edge);
            (class.color(theme), class.width_pt())
        })
        .unzip()
}

/// Convert a width in points to whole pixels at `dpi`, never thinner than one pixel.
pub fn points_to_pixels(width_pt: f64, dpi: u32) -> u32 {
    ((width_pt * dpi as f64 / 72.0).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use overpass::GeoCoord;

    fn edge(tags: &[&str]) -> RoadEdge {
        RoadEdge {
            u: 1,
            v: 2,
            highway: tags.iter().map(|t| t.to_string()).collect(),
            geometry: vec![GeoCoord::new(0.0, 0.0), GeoCoord::new(0.0, 1.0)],
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(RoadClass::classify("motorway_link"), RoadClass::Motorway);
        assert_eq!(RoadClass::classify("trunk"), RoadClass::Primary);
        assert_eq!(RoadClass::classify("Primary"), RoadClass::Primary);
        assert_eq!(RoadClass::classify("secondary_link"), RoadClass::Secondary);
        assert_eq!(RoadClass::classify("tertiary"), RoadClass::Residential);
        assert_eq!(RoadClass::classify("unclassified"), RoadClass::Residential);
    }

    #[test]
    fn test_merged_tags_take_highest_match() {
        // A merged edge carrying both tags is drawn as the more important road
        assert_eq!(RoadClass::of_edge(&edge(&["residential", "primary"])), RoadClass::Primary);
        assert_eq!(RoadClass::of_edge(&edge(&["secondary", "motorway"])), RoadClass::Motorway);
        assert_eq!(RoadClass::of_edge(&edge(&[])), RoadClass::Residential);
    }

    #[test]
    fn test_get_styling() {
        let network = RoadNetwork {
            nodes: Default::default(),
            edges: vec![edge(&["motorway"]), edge(&["service"]), edge(&["secondary"])],
        };
        let theme = Theme::default();
        let (colors, widths) = get_styling(&network, &theme);
        assert_eq!(colors, vec![theme.motorway(), theme.residential(), theme.secondary()]);
        assert_eq!(widths, vec![1.2, 0.3, 0.6]);
    }

    #[test]
    fn test_points_to_pixels() {
        assert_eq!(points_to_pixels(1.2, 300), 5);
        assert_eq!(points_to_pixels(0.3, 300), 1);
        assert_eq!(points_to_pixels(0.3, 72), 1);
        assert_eq!(points_to_pixels(1.0, 144), 2);
    }
}
