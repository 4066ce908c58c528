use anyhow::{anyhow, Result};
use geo::{Area, BooleanOps, LineString, MultiPolygon};
use overpass::{GeoCoord, Polygon, RoadNetwork};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

use crate::app::config::OutputFormat;
use crate::app::styling::points_to_pixels;
use crate::app::theme::{Rgba, Theme};

/// Metres per degree of latitude used for the visible crop
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Poster paper size in inches (portrait)
pub const POSTER_WIDTH_IN: f64 = 12.0;
pub const POSTER_HEIGHT_IN: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width_px: u32,
    pub height_px: u32,
    pub dpi: u32,
}

impl Canvas {
    pub fn poster(dpi: u32) -> Self {
        Self {
            width_px: (POSTER_WIDTH_IN * dpi as f64).round() as u32,
            height_px: (POSTER_HEIGHT_IN * dpi as f64).round() as u32,
            dpi,
        }
    }

    pub fn aspect(&self) -> f64 {
        self.width_px as f64 / self.height_px as f64
    }
}

/// Visible map window around the centre point, in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PosterExtent {
    pub center: GeoCoord,
    pub half_lat: f64,
    pub half_lon: f64,
}

impl PosterExtent {
    /// `dist_m` north and south of the centre; east-west span narrowed to the canvas aspect
    pub fn new(center: GeoCoord, dist_m: f64, canvas: &Canvas) -> Self {
        let coslat = center.lat.to_radians().cos();
        let dist_degree = dist_m / METERS_PER_DEGREE;
        Self {
            center,
            half_lat: dist_degree,
            half_lon: dist_degree / coslat * canvas.aspect(),
        }
    }

    pub fn lat_range(&self) -> (f64, f64) {
        (self.center.lat - self.half_lat, self.center.lat + self.half_lat)
    }

    pub fn lon_range(&self) -> (f64, f64) {
        (self.center.lon - self.half_lon, self.center.lon + self.half_lon)
    }
}

/// Equirectangular projection of the extent onto the canvas, y pointing down
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    extent: PosterExtent,
    coslat: f64,
    scale: f64,
    width: f64,
    height: f64,
}

impl Projection {
    pub fn new(extent: PosterExtent, canvas: &Canvas) -> Self {
        Self {
            extent,
            coslat: extent.center.lat.to_radians().cos(),
            scale: canvas.height_px as f64 / (2.0 * extent.half_lat),
            width: canvas.width_px as f64,
            height: canvas.height_px as f64,
        }
    }

    pub fn project(&self, point: GeoCoord) -> (f64, f64) {
        let x = (point.lon - self.extent.center.lon) * self.coslat;
        let y = point.lat - self.extent.center.lat;
        (self.width / 2.0 + x * self.scale, self.height / 2.0 - y * self.scale)
    }

    fn project_all(&self, points: &[GeoCoord]) -> Vec<(f64, f64)> {
        points.iter().map(|p| self.project(*p)).collect()
    }
}

/// Everything that ends up on the poster
pub struct PosterLayers<'a> {
    pub land: &'a [Polygon],
    pub water: &'a [Polygon],
    pub roads: &'a RoadNetwork,
    pub road_colors: &'a [Rgba],
    pub road_widths_pt: &'a [f64],
}

/// Draw the poster and write it to `path`. `drawn` runs once every layer is
/// on the canvas, before the file is written.
pub fn render_poster(
    path: &Path,
    format: OutputFormat,
    canvas: &Canvas,
    extent: PosterExtent,
    theme: &Theme,
    layers: &PosterLayers,
    drawn: impl FnOnce(),
) -> Result<()> {
    let size = (canvas.width_px, canvas.height_px);
    match format {
        OutputFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_layers(&root, canvas, extent, theme, layers).map_err(|e| anyhow!("drawing PNG failed: {:?}", e))?;
            drawn();
            root.present().map_err(|e| anyhow!("writing {} failed: {:?}", path.display(), e))?;
        }
        OutputFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_layers(&root, canvas, extent, theme, layers).map_err(|e| anyhow!("drawing SVG failed: {:?}", e))?;
            drawn();
            root.present().map_err(|e| anyhow!("writing {} failed: {:?}", path.display(), e))?;
        }
    }
    Ok(())
}

fn draw_layers<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    canvas: &Canvas,
    extent: PosterExtent,
    theme: &Theme,
    layers: &PosterLayers,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let projection = Projection::new(extent, canvas);
    let land_color = theme.background().to_plotters();
    let water_color = theme.water().to_plotters();

    // Sea
    root.fill(&water_color)?;

    // Sea and inland water share a colour, so only land minus water is drawn
    let land = union_on_canvas(layers.land, &projection, canvas);
    let water = union_on_canvas(layers.water, &projection, canvas);
    let mut visible: Vec<geo::Polygon<f64>> = land.difference(&water).0;

    // A polygon nested in another's hole is smaller than its container
    visible.sort_by(|a, b| exterior_area(b).total_cmp(&exterior_area(a)));
    for polygon in &visible {
        fill_ring(root, polygon.exterior(), land_color)?;
        for hole in polygon.interiors() {
            fill_ring(root, hole, water_color)?;
        }
    }

    let mut drawn = 0usize;
    for (idx, edge) in layers.roads.edges.iter().enumerate() {
        if edge.geometry.len() < 2 {
            continue;
        }
        let (Some(color), Some(width)) = (layers.road_colors.get(idx), layers.road_widths_pt.get(idx)) else {
            break;
        };
        let points: Vec<(i32, i32)> = projection
            .project_all(&edge.geometry)
            .into_iter()
            .map(to_pixel)
            .collect();
        let style = ShapeStyle {
            color: color.to_plotters(),
            filled: false,
            stroke_width: points_to_pixels(*width, canvas.dpi),
        };
        root.draw(&PathElement::new(points, style))?;
        drawn += 1;
    }
    debug!("Drew {} land areas and {} roads", visible.len(), drawn);

    Ok(())
}

/// Project, clip and merge a layer into one region in canvas pixels
fn union_on_canvas(polygons: &[Polygon], projection: &Projection, canvas: &Canvas) -> MultiPolygon<f64> {
    polygons
        .iter()
        .filter_map(|polygon| {
            let exterior = clip_to_canvas(&projection.project_all(&polygon.exterior), canvas);
            if exterior.len() < 3 {
                return None;
            }
            let holes: Vec<LineString<f64>> = polygon
                .holes
                .iter()
                .map(|hole| clip_to_canvas(&projection.project_all(hole), canvas))
                .filter(|hole| hole.len() >= 3)
                .map(LineString::from)
                .collect();
            Some(geo::Polygon::new(LineString::from(exterior), holes))
        })
        .fold(MultiPolygon::new(Vec::new()), |merged, polygon| {
            merged.union(&MultiPolygon::new(vec![polygon]))
        })
}

fn exterior_area(polygon: &geo::Polygon<f64>) -> f64 {
    geo::Polygon::new(polygon.exterior().clone(), Vec::new()).unsigned_area()
}

fn fill_ring<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    ring: &LineString<f64>,
    color: RGBAColor,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let points: Vec<(i32, i32)> = ring.coords().map(|c| to_pixel((c.x, c.y))).collect();
    if points.len() < 3 {
        return Ok(());
    }
    root.draw(&plotters::element::Polygon::new(points, color.filled()))
}

fn to_pixel((x, y): (f64, f64)) -> (i32, i32) {
    (x.round() as i32, y.round() as i32)
}

/// Sutherland-Hodgman clip against the canvas rectangle plus a one-pixel margin.
///
/// Boundary polygons can span whole regions; clipping keeps the merge and
/// rasterization bounded.
pub fn clip_to_canvas(points: &[(f64, f64)], canvas: &Canvas) -> Vec<(f64, f64)> {
    let mut output: Vec<(f64, f64)> = points.to_vec();
    for boundary in [
        Boundary::Left(-1.0),
        Boundary::Right(canvas.width_px as f64 + 1.0),
        Boundary::Top(-1.0),
        Boundary::Bottom(canvas.height_px as f64 + 1.0),
    ] {
        let Some(&last) = output.last() else {
            break;
        };
        let input = std::mem::take(&mut output);
        let mut prev = last;
        for &current in &input {
            match (boundary.inside(current), boundary.inside(prev)) {
                (true, true) => output.push(current),
                (true, false) => {
                    output.push(boundary.intersect(prev, current));
                    output.push(current);
                }
                (false, true) => output.push(boundary.intersect(prev, current)),
                (false, false) => {}
            }
            prev = current;
        }
    }
    output
}

#[derive(Clone, Copy)]
enum Boundary {
    Left(f64),
    Right(f64),
    Top(f64),
    Bottom(f64),
}

impl Boundary {
    fn inside(&self, (x, y): (f64, f64)) -> bool {
        match *self {
            Boundary::Left(v) => x >= v,
            Boundary::Right(v) => x <= v,
            Boundary::Top(v) => y >= v,
            Boundary::Bottom(v) => y <= v,
        }
    }

    fn intersect(&self, a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
        match *self {
            Boundary::Left(v) | Boundary::Right(v) => {
                let t = (v - a.0) / (b.0 - a.0);
                (v, a.1 + t * (b.1 - a.1))
            }
            Boundary::Top(v) | Boundary::Bottom(v) => {
                let t = (v - a.1) / (b.1 - a.1);
                (a.0 + t * (b.0 - a.0), v)
            }
        }
    }
}
