use serde::Deserialize;

/// Mean earth radius in metres, the value OSMnx uses for its bbox math.
pub const EARTH_RADIUS_M: f64 = 6_371_009.0;

/// Geographic coordinate as Overpass returns it in `out geom` blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct GeoCoord {
    pub lat: f64,
    pub lon: f64,
}

impl GeoCoord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        }
    }

    /// Square box extending `dist_m` metres north, south, east and west of a point.
    pub fn from_point(lat: f64, lon: f64, dist_m: f64) -> Self {
        let delta_lat = (dist_m / EARTH_RADIUS_M).to_degrees();
        let delta_lon = delta_lat / lat.to_radians().cos();
        Self::new(lon - delta_lon, lon + delta_lon, lat - delta_lat, lat + delta_lat)
    }

    /// Overpass QL bbox filter order: south,west,north,east
    pub fn overpass_filter(&self) -> String {
        format!("{},{},{},{}", self.min_lat, self.min_lon, self.max_lat, self.max_lon)
    }

    pub fn contains(&self, point: GeoCoord) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lon >= self.min_lon
            && point.lon <= self.max_lon
    }
}

/// Areal feature: one exterior ring plus any holes. Rings are closed (first == last).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<GeoCoord>,
    pub holes: Vec<Vec<GeoCoord>>,
}

impl Polygon {
    pub fn new(exterior: Vec<GeoCoord>) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }
}

pub fn is_closed_ring(ring: &[GeoCoord]) -> bool {
    ring.len() >= 4 && ring.first() == ring.last()
}

/// Stitch way fragments end-to-end into closed rings.
///
/// Fragments may be oriented either way. Chains that never close are dropped.
pub fn assemble_rings(chains: Vec<Vec<GeoCoord>>) -> Vec<Vec<GeoCoord>> {
    let mut pending: Vec<Vec<GeoCoord>> = chains.into_iter().filter(|c| c.len() >= 2).collect();
    let mut rings = Vec::new();

    while let Some(mut current) = pending.pop() {
        loop {
            if current.len() >= 2 && current.first() == current.last() {
                if current.len() >= 4 {
                    rings.push(current);
                }
                break;
            }

            let (Some(&head), Some(&tail)) = (current.first(), current.last()) else {
                break;
            };
            let touches = |c: &Vec<GeoCoord>| {
                let (first, last) = (c[0], c[c.len() - 1]);
                first == tail || last == tail || first == head || last == head
            };
            let Some(idx) = pending.iter().position(touches) else {
                break;
            };

            let mut other = pending.swap_remove(idx);
            let (first, last) = (other[0], other[other.len() - 1]);
            if first == tail {
                current.extend(other.into_iter().skip(1));
            } else if last == tail {
                other.reverse();
                current.extend(other.into_iter().skip(1));
            } else {
                if first == head {
                    other.reverse();
                }
                other.extend(current.into_iter().skip(1));
                current = other;
            }
        }
    }

    rings
}

/// Even-odd ray cast.
pub fn ring_contains(ring: &[GeoCoord], point: GeoCoord) -> bool {
    let mut inside = false;
    let mut j = ring.len().wrapping_sub(1);
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.lat > point.lat) != (b.lat > point.lat)
            && point.lon < (b.lon - a.lon) * (point.lat - a.lat) / (b.lat - a.lat) + a.lon
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Build polygons from multipolygon member fragments.
///
/// Inner rings are attached to the first exterior that contains them; orphans are dropped.
pub fn build_multipolygon(outer: Vec<Vec<GeoCoord>>, inner: Vec<Vec<GeoCoord>>) -> Vec<Polygon> {
    let mut polygons: Vec<Polygon> = assemble_rings(outer).into_iter().map(Polygon::new).collect();

    for hole in assemble_rings(inner) {
        let probe = hole[0];
        if let Some(owner) = polygons
            .iter_mut()
            .find(|p| ring_contains(&p.exterior, probe))
        {
            owner.holes.push(hole);
        }
    }

    polygons
}
