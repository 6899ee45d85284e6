//! SVG overlay serializer.
//!
//! Converts an [`AnalysisSnapshot`] into an SVG document in pixel
//! coordinates, sized to the analyzed image so it can be laid over it.
//! The [`svg`] crate handles document construction, XML escaping, and
//! path data formatting.
//!
//! Layers, each a `<g>` with an `id`:
//!
//! - `core`: the core contour as a `<path>`.
//! - `margin`: the migration margin as a `<path>`.
//! - `radii`: halo and maximum-radius circles around the core center,
//!   with a `<line>` from the center to each marked point.
//! - `cells`: one `<ellipse>` per particle, rotated to its orientation.
//!
//! Empty layers are omitted. This is a pure function with no I/O -- it
//! returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Circle, Description, Ellipse, Group, Line, Path as SvgPath, Title};
use svg::node::{Text, Value};

use spheroscope_engine::{AnalysisSnapshot, Dimensions, Particle, Path, Point};

const CORE_COLOR: &str = "#e53935";
const MARGIN_COLOR: &str = "#1e88e5";
const HALO_COLOR: &str = "#fdd835";
const MAX_RADIUS_COLOR: &str = "#43a047";
const CELL_COLOR: &str = "#8e24aa";
const MANUAL_CELL_COLOR: &str = "#ff9800";

/// Metadata to embed in the SVG document.
///
/// When present, a `<title>` and/or `<desc>` element is emitted
/// immediately after the opening `<svg>` tag. Text values are
/// XML-escaped by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,
}

/// Build an SVG path `d` attribute string from a path.
///
/// Uses `M` for the first point and `L` for subsequent points.
/// Returns an empty string for paths with fewer than 2 points.
///
/// # Examples
///
/// ```
/// use spheroscope_engine::{Path, Point};
/// use spheroscope_export::build_path_data;
///
/// let path = Path::new(vec![
///     Point::new(10.0, 20.0),
///     Point::new(30.0, 40.0),
/// ]);
/// assert_eq!(build_path_data(&path), "M10,20 L30,40");
/// ```
#[must_use]
pub fn build_path_data(path: &Path) -> String {
    let points = path.points();
    let Some((first, rest)) = points.split_first() else {
        return String::new();
    };
    if rest.is_empty() {
        return String::new();
    }

    let mut data = Data::new().move_to((first.x, first.y));
    for p in rest {
        data = data.line_to((p.x, p.y));
    }
    String::from(Value::from(data))
}

fn polyline_layer(id: &str, path: &Path, color: &str) -> Option<Group> {
    let d = build_path_data(path);
    if d.is_empty() {
        return None;
    }
    let element = SvgPath::new()
        .set("d", d)
        .set("fill", "none")
        .set("stroke", color)
        .set("stroke-width", 1);
    Some(Group::new().set("id", id).add(element))
}

fn circle(center: Point, radius: f64, color: &str) -> Circle {
    Circle::new()
        .set("cx", center.x)
        .set("cy", center.y)
        .set("r", radius)
        .set("fill", "none")
        .set("stroke", color)
        .set("stroke-width", 1)
        .set("stroke-dasharray", "4 2")
}

fn radius_line(from: Point, to: Point, color: &str) -> Line {
    Line::new()
        .set("x1", from.x)
        .set("y1", from.y)
        .set("x2", to.x)
        .set("y2", to.y)
        .set("stroke", color)
        .set("stroke-width", 1)
}

fn radii_layer(snapshot: &AnalysisSnapshot) -> Option<Group> {
    let result = snapshot.last_result.as_ref()?;
    let center = result.center();
    let mut group = Group::new().set("id", "radii");
    let mut empty = true;

    if let Some(halo) = snapshot.halo_radius_data {
        group = group
            .add(circle(center, halo.radius, HALO_COLOR))
            .add(radius_line(
                center,
                center.offset_polar(halo.angle, halo.radius),
                HALO_COLOR,
            ));
        empty = false;
    }
    if let (Some(radius), Some(data)) = (result.max_radius, result.max_radius_data) {
        group = group
            .add(circle(center, radius, MAX_RADIUS_COLOR))
            .add(radius_line(center, data.point, MAX_RADIUS_COLOR));
        empty = false;
    }

    (!empty).then_some(group)
}

fn cell_ellipse(particle: &Particle) -> Ellipse {
    let e = &particle.ellipse;
    let color = if particle.is_manual {
        MANUAL_CELL_COLOR
    } else {
        CELL_COLOR
    };
    Ellipse::new()
        .set("cx", e.centroid.x)
        .set("cy", e.centroid.y)
        .set("rx", e.radius_x)
        .set("ry", e.radius_y)
        .set(
            "transform",
            format!(
                "rotate({} {} {})",
                e.angle.to_degrees(),
                e.centroid.x,
                e.centroid.y
            ),
        )
        .set("fill", "none")
        .set("stroke", color)
        .set("stroke-width", 1)
}

fn cells_layer(particles: &[Particle]) -> Option<Group> {
    if particles.is_empty() {
        return None;
    }
    Some(
        particles
            .iter()
            .fold(Group::new().set("id", "cells"), |group, particle| {
                group.add(cell_ellipse(particle))
            }),
    )
}

/// Serialize `snapshot` into an SVG overlay.
///
/// The document is `dimensions` pixels wide and high with a matching
/// `viewBox`, so overlay coordinates equal image coordinates.
///
/// # Examples
///
/// ```
/// use spheroscope_engine::{AnalysisSnapshot, Dimensions};
/// use spheroscope_export::{SvgMetadata, to_svg};
///
/// let svg = to_svg(
///     &AnalysisSnapshot::default(),
///     Dimensions { width: 64, height: 48 },
///     &SvgMetadata::default(),
/// );
/// assert!(svg.contains(r#"viewBox="0 0 64 48""#));
/// ```
#[must_use]
pub fn to_svg(
    snapshot: &AnalysisSnapshot,
    dimensions: Dimensions,
    metadata: &SvgMetadata<'_>,
) -> String {
    let w = dimensions.width;
    let h = dimensions.height;
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    let layers = [
        polyline_layer("core", &snapshot.manual_drawn_path, CORE_COLOR),
        polyline_layer("margin", &snapshot.migration_margin_path, MARGIN_COLOR),
        radii_layer(snapshot),
        cells_layer(&snapshot.particles),
    ];
    for layer in layers.into_iter().flatten() {
        doc = doc.add(layer);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
