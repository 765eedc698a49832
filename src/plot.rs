//! SVG diagrams of the structure and its solved response.
//!
//! Four diagrams are produced: the loaded structure, the support reactions,
//! the member axial forces and the displaced shape. They are diagnostic
//! sketches; only the annotation logic matters, not pixel fidelity.

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use petgraph::graph::NodeIndex;

use crate::config::PlotConfig;
use crate::errors::{AnalysisError, PlotError};
use crate::geometry::{Force, Point};
use crate::model::Model;
use crate::report::format_fixed;
use crate::truss::Support;

/// Length of load and reaction arrows, in pixels.
const ARROW_LENGTH: f64 = 45.0;
/// Height of support triangles, in pixels.
const SUPPORT_SIZE: f64 = 14.0;
/// Vertical spacing between stacked labels, in pixels.
const LINE_HEIGHT: f64 = 13.0;
/// Distance of member labels from the member axis, in pixels.
const LABEL_OFFSET: f64 = 10.0;

const MEMBER_COLOUR: &str = "#333333";
const LOAD_COLOUR: &str = "#2ca02c";
const REACTION_COLOUR: &str = "#9467bd";
const TENSION_COLOUR: &str = "#1f77b4";
const COMPRESSION_COLOUR: &str = "#d62728";
const NEUTRAL_COLOUR: &str = "#999999";

/// The diagrams written by [`render_all`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diagram {
    /// Members, supports and applied loads.
    Structure,
    /// Structure plus support reactions.
    Reactions,
    /// Members coloured and labelled by axial force.
    AxialForces,
    /// Undeformed and scaled displaced shape.
    Displacement,
}

impl Diagram {
    /// Every diagram, in the order they are written.
    pub const ALL: [Diagram; 4] = [
        Diagram::Structure,
        Diagram::Reactions,
        Diagram::AxialForces,
        Diagram::Displacement,
    ];

    /// File name of the diagram inside the output directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Diagram::Structure => "structure.svg",
            Diagram::Reactions => "reactions.svg",
            Diagram::AxialForces => "axial_forces.svg",
            Diagram::Displacement => "displacement.svg",
        }
    }

    /// Title drawn at the top of the diagram.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Diagram::Structure => "Structure",
            Diagram::Reactions => "Reaction forces",
            Diagram::AxialForces => "Axial forces",
            Diagram::Displacement => "Displacement",
        }
    }
}

/// Affine map from model coordinates to pixels, Y pointing up in the model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Canvas {
    scale: f64,
    origin: Point,
    width: f64,
    height: f64,
    margin: f64,
}

impl Canvas {
    /// Fit the box `min`..`max` into the configured image, keeping the aspect ratio.
    ///
    /// Degenerate boxes (a single point or a line) are padded so the drawing
    /// still has a sensible size.
    #[must_use]
    pub fn fit(min: Point, max: Point, config: &PlotConfig) -> Self {
        let span = (max.x - min.x).max(max.y - min.y);
        let span = if span > 0.0 { span } else { 1.0 };
        let pad = |low: f64, high: f64| {
            if high - low < span * 1.0e-6 {
                (low - span / 2.0, high + span / 2.0)
            } else {
                (low, high)
            }
        };
        let (min_x, max_x) = pad(min.x, max.x);
        let (min_y, max_y) = pad(min.y, max.y);

        let usable_width = (config.width - 2.0 * config.margin).max(1.0);
        let usable_height = (config.height - 2.0 * config.margin).max(1.0);
        let scale = (usable_width / (max_x - min_x)).min(usable_height / (max_y - min_y));

        // Centre the drawing in the usable area.
        let extra_x = usable_width / scale - (max_x - min_x);
        let extra_y = usable_height / scale - (max_y - min_y);
        Self {
            scale,
            origin: Point::new(min_x - extra_x / 2.0, min_y - extra_y / 2.0),
            width: config.width,
            height: config.height,
            margin: config.margin,
        }
    }

    /// Pixel coordinates of a model point.
    #[must_use]
    pub fn to_pixel(&self, point: Point) -> (f64, f64) {
        (
            self.margin + (point.x - self.origin.x) * self.scale,
            self.height - self.margin - (point.y - self.origin.y) * self.scale,
        )
    }
}

/// Keeps labels from being drawn on top of each other.
#[derive(Debug, Default)]
struct LabelPlacer {
    placed: Vec<(f64, f64)>,
}

impl LabelPlacer {
    /// Return a free anchor at or below `(x, y)`.
    fn place(&mut self, x: f64, mut y: f64) -> (f64, f64) {
        while self
            .placed
            .iter()
            .any(|&(px, py)| (px - x).abs() < 30.0 && (py - y).abs() < LINE_HEIGHT)
        {
            y += LINE_HEIGHT;
        }
        self.placed.push((x, y));
        (x, y)
    }
}

/// Minimal SVG document builder.
struct Svg {
    body: String,
    width: f64,
    height: f64,
}

impl Svg {
    /// Empty document of the given pixel size.
    fn new(width: f64, height: f64) -> Self {
        Self {
            body: String::new(),
            width,
            height,
        }
    }

    /// Straight stroke between two pixel positions.
    fn line(&mut self, from: (f64, f64), to: (f64, f64), colour: &str, width: f64, dashed: bool) {
        let dash = if dashed { r#" stroke-dasharray="6 4""# } else { "" };
        writeln!(
            self.body,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{colour}" stroke-width="{width}"{dash}/>"#,
            from.0, from.1, to.0, to.1
        )
        .expect("writing to string cannot fail");
    }

    /// Filled circle outlined in the member colour.
    fn circle(&mut self, centre: (f64, f64), radius: f64, fill: &str) {
        writeln!(
            self.body,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{radius}" fill="{fill}" stroke="{MEMBER_COLOUR}"/>"#,
            centre.0, centre.1
        )
        .expect("writing to string cannot fail");
    }

    /// Closed filled polygon through `points`.
    fn polygon(&mut self, points: &[(f64, f64)], fill: &str) {
        let points: Vec<String> = points
            .iter()
            .map(|(x, y)| format!("{x:.2},{y:.2}"))
            .collect();
        writeln!(
            self.body,
            r#"<polygon points="{}" fill="{fill}" stroke="{MEMBER_COLOUR}"/>"#,
            points.join(" ")
        )
        .expect("writing to string cannot fail");
    }

    /// Escaped text label anchored at `at`.
    fn text(&mut self, at: (f64, f64), content: &str, colour: &str, anchor: &str) {
        writeln!(
            self.body,
            r#"<text x="{:.2}" y="{:.2}" fill="{colour}" font-family="sans-serif" font-size="11" text-anchor="{anchor}">{}</text>"#,
            at.0,
            at.1,
            escape(content)
        )
        .expect("writing to string cannot fail");
    }

    /// Arrow whose head touches `tip`, drawn along the pixel direction `(dx, dy)`.
    fn arrow(&mut self, tip: (f64, f64), direction: (f64, f64), colour: &str) {
        let tail = (
            tip.0 - direction.0 * ARROW_LENGTH,
            tip.1 - direction.1 * ARROW_LENGTH,
        );
        self.line(tail, tip, colour, 2.0, false);
        let (nx, ny) = (-direction.1, direction.0);
        let back = (tip.0 - direction.0 * 9.0, tip.1 - direction.1 * 9.0);
        self.polygon(
            &[
                tip,
                (back.0 + nx * 4.0, back.1 + ny * 4.0),
                (back.0 - nx * 4.0, back.1 - ny * 4.0),
            ],
            colour,
        );
    }

    /// Wrap the body in the `<svg>` root with a white background and title.
    fn finish(self, title: &str) -> String {
        let mut document = String::new();
        writeln!(
            document,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{0}" height="{1}" viewBox="0 0 {0} {1}">"#,
            self.width, self.height
        )
        .expect("writing to string cannot fail");
        writeln!(
            document,
            r#"<rect width="100%" height="100%" fill="white"/>"#
        )
        .expect("writing to string cannot fail");
        writeln!(
            document,
            r#"<text x="{:.2}" y="24" font-family="sans-serif" font-size="16" text-anchor="middle">{}</text>"#,
            self.width / 2.0,
            escape(title)
        )
        .expect("writing to string cannot fail");
        document.push_str(&self.body);
        document.push_str("</svg>\n");
        document
    }
}

/// Escape text for use inside SVG markup.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Unit direction in pixel space of a model-space force, or `None` for zero.
fn pixel_direction(force: Force) -> Option<(f64, f64)> {
    let magnitude = force.magnitude();
    (magnitude > 0.0).then(|| (force.x / magnitude, -force.y / magnitude))
}

/// Format a force as `(Fx, Fy)` with one decimal.
fn force_label(force: Force) -> String {
    format!("({}, {})", format_fixed(force.x), format_fixed(force.y))
}

/// Render one diagram to an SVG document.
///
/// # Errors
///
/// Returns [`AnalysisError::NotEvaluated`] for result diagrams of an unsolved model.
pub fn render_diagram(
    model: &Model,
    diagram: Diagram,
    config: &PlotConfig,
) -> Result<String, AnalysisError> {
    if diagram != Diagram::Structure {
        model.truss().ensure_evaluated()?;
    }
    let truss = model.truss();
    let (min, max) = truss
        .bounding_box()
        .unwrap_or((Point::new(0.0, 0.0), Point::new(0.0, 0.0)));
    let canvas = Canvas::fit(min, max, config);
    let mut svg = Svg::new(config.width, config.height);
    let mut labels = LabelPlacer::default();

    match diagram {
        Diagram::Structure | Diagram::Reactions => draw_members(model, &canvas, &mut svg, None),
        Diagram::AxialForces => draw_members(model, &canvas, &mut svg, Some(&mut labels)),
        Diagram::Displacement => {
            draw_displaced(model, &canvas, &mut svg, &mut labels, config, (min, max));
        }
    }
    draw_supports(model, &canvas, &mut svg);
    draw_joints(model, &canvas, &mut svg, &mut labels);

    match diagram {
        Diagram::Structure => draw_loads(model, &canvas, &mut svg, &mut labels),
        Diagram::Reactions => draw_reactions(model, &canvas, &mut svg, &mut labels),
        Diagram::AxialForces | Diagram::Displacement => {}
    }
    Ok(svg.finish(diagram.title()))
}

/// Write every diagram into `dir`, creating it when needed.
///
/// # Errors
///
/// Returns [`PlotError::Io`] when the directory or a file cannot be written and
/// [`PlotError::Analysis`] when the model has not been solved.
pub fn render_all(
    model: &Model,
    dir: &Path,
    config: &PlotConfig,
) -> Result<Vec<PathBuf>, PlotError> {
    model.truss().ensure_evaluated()?;
    fs::create_dir_all(dir).map_err(|source| PlotError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut written = Vec::with_capacity(Diagram::ALL.len());
    for diagram in Diagram::ALL {
        let path = dir.join(diagram.file_name());
        let document = render_diagram(model, diagram, config)?;
        fs::write(&path, document).map_err(|source| PlotError::Io {
            path: path.clone(),
            source,
        })?;
        info!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Pixel position of a joint.
fn joint_pixel(model: &Model, canvas: &Canvas, joint: NodeIndex) -> Option<(f64, f64)> {
    model.truss().joint_position(joint).map(|p| canvas.to_pixel(p))
}

/// Draw every member; with `labels`, colour by axial force sign and annotate `N`.
fn draw_members(
    model: &Model,
    canvas: &Canvas,
    svg: &mut Svg,
    mut labels: Option<&mut LabelPlacer>,
) {
    let truss = model.truss();
    for member in model.members() {
        let Some((start, end)) = truss.member_endpoints(member.index) else {
            continue;
        };
        let (Some(a), Some(b)) = (
            joint_pixel(model, canvas, start),
            joint_pixel(model, canvas, end),
        ) else {
            continue;
        };
        let Some(placer) = labels.as_deref_mut() else {
            svg.line(a, b, MEMBER_COLOUR, 2.5, false);
            continue;
        };

        let axial_force = truss.member_axial_force(member.index).unwrap_or(0.0);
        let text = format_fixed(axial_force);
        let colour = if text == "0.0" {
            NEUTRAL_COLOUR
        } else if axial_force > 0.0 {
            TENSION_COLOUR
        } else {
            COMPRESSION_COLOUR
        };
        svg.line(a, b, colour, 3.0, false);

        // Offset perpendicular to the member, on the upper side.
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let length = dx.hypot(dy).max(f64::EPSILON);
        let (mut nx, mut ny) = (-dy / length, dx / length);
        if ny > 0.0 {
            nx = -nx;
            ny = -ny;
        }
        let anchor = placer.place(
            (a.0 + b.0) / 2.0 + nx * LABEL_OFFSET,
            (a.1 + b.1) / 2.0 + ny * LABEL_OFFSET,
        );
        svg.text(anchor, &format!("N={text}"), colour, "middle");
    }
}

/// Draw the undeformed shape dashed and the scaled displaced shape solid.
fn draw_displaced(
    model: &Model,
    canvas: &Canvas,
    svg: &mut Svg,
    labels: &mut LabelPlacer,
    config: &PlotConfig,
    (min, max): (Point, Point),
) {
    let truss = model.truss();
    let largest = truss
        .joints()
        .filter_map(|joint| truss.joint_displacement(joint))
        .map(|d| d.magnitude())
        .fold(0.0, f64::max);
    let extent = (max.x - min.x).max(max.y - min.y);
    let factor = if largest > 0.0 && extent > 0.0 {
        config.displacement_scale_fraction * extent / largest
    } else {
        0.0
    };
    let displaced = |joint: NodeIndex| -> Option<(f64, f64)> {
        let position = truss.joint_position(joint)?;
        let d = truss.joint_displacement(joint)?;
        Some(canvas.to_pixel(Point::new(
            position.x + d.x * factor,
            position.y + d.y * factor,
        )))
    };

    for member in model.members() {
        let Some((start, end)) = truss.member_endpoints(member.index) else {
            continue;
        };
        if let (Some(a), Some(b)) = (
            joint_pixel(model, canvas, start),
            joint_pixel(model, canvas, end),
        ) {
            svg.line(a, b, NEUTRAL_COLOUR, 1.5, true);
        }
        if let (Some(a), Some(b)) = (displaced(start), displaced(end)) {
            svg.line(a, b, TENSION_COLOUR, 2.5, false);
        }
    }

    for joint in truss.joints() {
        let (Some(at), Some(d), Some(support)) = (
            displaced(joint),
            truss.joint_displacement(joint),
            truss.joint_support(joint),
        ) else {
            continue;
        };
        svg.circle(at, 3.0, TENSION_COLOUR);
        if support.is_free() {
            let anchor = labels.place(at.0 + 8.0, at.1 + 16.0);
            svg.text(
                anchor,
                &format!("({:.3e}, {:.3e})", d.x, d.y),
                TENSION_COLOUR,
                "start",
            );
        }
    }
}

/// Draw support glyphs: a triangle for pins, a triangle and bar for rollers.
fn draw_supports(model: &Model, canvas: &Canvas, svg: &mut Svg) {
    let truss = model.truss();
    for joint in truss.joints() {
        let (Some(support), Some(at)) = (
            truss.joint_support(joint),
            joint_pixel(model, canvas, joint),
        ) else {
            continue;
        };
        // Direction from the joint towards the ground, in pixels.
        let (gx, gy) = match support {
            Support::Free => continue,
            Support::Pinned | Support::RollerY => (0.0, 1.0),
            Support::RollerX => (-1.0, 0.0),
        };
        let (px, py) = (-gy, gx);
        let base = (at.0 + gx * SUPPORT_SIZE, at.1 + gy * SUPPORT_SIZE);
        let half = SUPPORT_SIZE * 0.7;
        svg.polygon(
            &[
                at,
                (base.0 + px * half, base.1 + py * half),
                (base.0 - px * half, base.1 - py * half),
            ],
            "#dddddd",
        );
        if support != Support::Pinned {
            let bar = (base.0 + gx * 4.0, base.1 + gy * 4.0);
            svg.line(
                (bar.0 + px * half, bar.1 + py * half),
                (bar.0 - px * half, bar.1 - py * half),
                MEMBER_COLOUR,
                2.0,
                false,
            );
        }
    }
}

/// Draw joints with their input labels.
fn draw_joints(model: &Model, canvas: &Canvas, svg: &mut Svg, labels: &mut LabelPlacer) {
    for joint in model.truss().joints() {
        let Some(at) = joint_pixel(model, canvas, joint) else {
            continue;
        };
        svg.circle(at, 4.0, "white");
        if let Some(label) = model.joint_label(joint) {
            let anchor = labels.place(at.0 - 8.0, at.1 - 8.0);
            svg.text(anchor, label, MEMBER_COLOUR, "end");
        }
    }
}

/// Draw applied loads as arrows pointing at their joint.
fn draw_loads(model: &Model, canvas: &Canvas, svg: &mut Svg, labels: &mut LabelPlacer) {
    let truss = model.truss();
    for joint in truss.joints() {
        let (Some(load), Some(at)) = (truss.joint_load(joint), joint_pixel(model, canvas, joint))
        else {
            continue;
        };
        let Some(direction) = pixel_direction(load) else {
            continue;
        };
        svg.arrow(at, direction, LOAD_COLOUR);
        let tail = (
            at.0 - direction.0 * (ARROW_LENGTH + 6.0),
            at.1 - direction.1 * (ARROW_LENGTH + 6.0),
        );
        let anchor = labels.place(tail.0, tail.1);
        svg.text(anchor, &force_label(load), LOAD_COLOUR, "middle");
    }
}

/// Draw reactions at supports, one arrow per restrained component.
fn draw_reactions(model: &Model, canvas: &Canvas, svg: &mut Svg, labels: &mut LabelPlacer) {
    let truss = model.truss();
    for &vertex in model.supported_vertices() {
        let Some(joint) = model.joint(vertex) else {
            continue;
        };
        let (Some(reaction), Some(at)) = (
            truss.joint_reaction(joint),
            joint_pixel(model, canvas, joint),
        ) else {
            continue;
        };
        // Start below the support glyph so arrows do not cover it.
        let tip = (at.0, at.1 + SUPPORT_SIZE + 6.0);
        for component in [Force::new(reaction.x, 0.0), Force::new(0.0, reaction.y)] {
            if format_fixed(component.magnitude()) == "0.0" {
                continue;
            }
            if let Some(direction) = pixel_direction(component) {
                svg.arrow(tip, direction, REACTION_COLOUR);
            }
        }
        let anchor = labels.place(at.0 + 10.0, tip.1 + 18.0);
        svg.text(anchor, &force_label(reaction), REACTION_COLOUR, "start");
    }
}
