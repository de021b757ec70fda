//! # Shapes
//!
//! Procedural borders and fills described by a small inline grammar:
//!
//! ```text
//! #name;thickness;width;height[;shape args...]#
//! ```
//!
//! `width` and `height` override the element size, `-` keeps it. Thickness 0
//! fills the shape, anything else strokes its outline with that pen width.
//! Each shape reads its own trailing arguments, numbered from
//! [`BASE_ARG_INDEX`]. A shape whose arguments don't parse draws nothing.

use crate::error::ShapeError;
use crate::model::{PointF, RectF};
use crate::render::GraphicsSurface;
use crate::style::Color;

/// Bezier control distance for a quarter circle of radius 1.
const KAPPA: f64 = 0.5522847498;

const DELIMITER: char = '#';
const NO_OVERRIDE: &str = "-";

/// Index of the first shape-specific argument.
pub const BASE_ARG_INDEX: usize = 4;

/// Upper bound for polygon sides and grid cells per axis.
pub const MAX_COUNT: usize = 1024;

#[derive(Debug, Clone, Copy)]
enum RoundedRectArg {
    Radius,
}

#[derive(Debug, Clone, Copy)]
enum PolygonArg {
    Sides,
}

#[derive(Debug, Clone, Copy)]
enum GridArg {
    Columns,
    Rows,
}

/// A parsed `#...#` shape reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDescriptor {
    pub name: String,
    pub thickness: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Arguments after the header, at positions `BASE_ARG_INDEX..`.
    pub args: Vec<String>,
}

impl ShapeDescriptor {
    /// Parse a descriptor, or `None` if it isn't one.
    pub fn parse(value: &str) -> Option<Self> {
        Self::try_parse(value).ok()
    }

    pub fn try_parse(value: &str) -> Result<Self, ShapeError> {
        let inner = value
            .trim()
            .strip_prefix(DELIMITER)
            .and_then(|v| v.strip_suffix(DELIMITER))
            .ok_or(ShapeError::Malformed)?;
        let fields: Vec<&str> = inner.split(';').map(str::trim).collect();

        let name = fields[0].to_lowercase();
        if name.is_empty() {
            return Err(ShapeError::Malformed);
        }
        let thickness = match fields.get(1) {
            Some(v) => parse_number(v, 1)?,
            None => return Err(ShapeError::MissingArgument { index: 1 }),
        };
        Ok(Self {
            name,
            thickness: thickness.max(0.0),
            width: parse_override(fields.get(2).copied(), 2)?,
            height: parse_override(fields.get(3).copied(), 3)?,
            args: fields
                .iter()
                .skip(BASE_ARG_INDEX)
                .map(|s| s.to_string())
                .collect(),
        })
    }

    /// Numeric shape argument at `offset` past the header.
    fn number(&self, offset: usize) -> Result<f64, ShapeError> {
        let index = BASE_ARG_INDEX + offset;
        match self.args.get(offset) {
            Some(v) if !v.is_empty() => parse_number(v, index),
            _ => Err(ShapeError::MissingArgument { index }),
        }
    }

    /// Whole-number shape argument at `offset`, between `min` and
    /// [`MAX_COUNT`].
    fn count(&self, offset: usize, min: usize) -> Result<usize, ShapeError> {
        let value = self.number(offset)?;
        if !value.is_finite() || value < min as f64 || value > MAX_COUNT as f64 {
            return Err(ShapeError::InvalidNumber {
                index: BASE_ARG_INDEX + offset,
                value: self.args[offset].clone(),
            });
        }
        Ok(value as usize)
    }

    /// The rectangle the shape occupies inside `rect`: size overrides
    /// applied, then inset by half the pen so strokes stay inside.
    pub fn target(&self, rect: RectF) -> RectF {
        let sized = RectF::new(
            rect.x,
            rect.y,
            self.width.unwrap_or(rect.width),
            self.height.unwrap_or(rect.height),
        );
        if self.thickness > 0.0 {
            sized.inset(self.thickness / 2.0)
        } else {
            sized
        }
    }

    pub fn is_filled(&self) -> bool {
        self.thickness == 0.0
    }
}

fn parse_number(value: &str, index: usize) -> Result<f64, ShapeError> {
    value.parse::<f64>().map_err(|_| ShapeError::InvalidNumber {
        index,
        value: value.to_string(),
    })
}

fn parse_override(value: Option<&str>, index: usize) -> Result<Option<f64>, ShapeError> {
    match value {
        None | Some("") | Some(NO_OVERRIDE) => Ok(None),
        Some(v) => parse_number(v, index).map(Some),
    }
}

/// A path-building operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathOp {
    MoveTo(PointF),
    LineTo(PointF),
    CurveTo(PointF, PointF, PointF),
    Close,
}

/// An outline made of one or more subpaths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapePath {
    pub ops: Vec<PathOp>,
}

impl ShapePath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.ops.push(PathOp::MoveTo(PointF::new(x, y)));
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.ops.push(PathOp::LineTo(PointF::new(x, y)));
    }

    pub fn curve_to(&mut self, c1: (f64, f64), c2: (f64, f64), end: (f64, f64)) {
        self.ops.push(PathOp::CurveTo(
            PointF::new(c1.0, c1.1),
            PointF::new(c2.0, c2.1),
            PointF::new(end.0, end.1),
        ));
    }

    pub fn close(&mut self) {
        self.ops.push(PathOp::Close);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// A copy with every point moved by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> ShapePath {
        let shift = |p: PointF| PointF::new(p.x + dx, p.y + dy);
        ShapePath {
            ops: self
                .ops
                .iter()
                .map(|op| match *op {
                    PathOp::MoveTo(p) => PathOp::MoveTo(shift(p)),
                    PathOp::LineTo(p) => PathOp::LineTo(shift(p)),
                    PathOp::CurveTo(a, b, c) => PathOp::CurveTo(shift(a), shift(b), shift(c)),
                    PathOp::Close => PathOp::Close,
                })
                .collect(),
        }
    }

    fn rect(&mut self, r: RectF) {
        self.move_to(r.x, r.y);
        self.line_to(r.right(), r.y);
        self.line_to(r.right(), r.bottom());
        self.line_to(r.x, r.bottom());
        self.close();
    }
}

type ShapeBuilder = fn(&ShapeDescriptor, RectF) -> Result<ShapePath, ShapeError>;

/// Every shape name the interpreter knows.
const SHAPES: &[(&str, ShapeBuilder)] = &[
    ("rect", rect),
    ("ellipse", ellipse),
    ("roundedrect", rounded_rect),
    ("triangle", triangle),
    ("polygon", polygon),
    ("grid", grid),
];

pub fn is_known_shape(name: &str) -> bool {
    SHAPES.iter().any(|(key, _)| key.eq_ignore_ascii_case(name))
}

/// Build the outline of `descriptor` inside `rect`.
pub fn draw_shape(descriptor: &ShapeDescriptor, rect: RectF) -> Result<ShapePath, ShapeError> {
    let builder = SHAPES
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(&descriptor.name))
        .map(|(_, builder)| *builder)
        .ok_or_else(|| ShapeError::UnknownShape(descriptor.name.clone()))?;
    builder(descriptor, descriptor.target(rect))
}

/// Parse and draw a shape descriptor. Returns `false` when nothing was drawn.
pub fn render_shape(value: &str, rect: RectF, color: Color, surface: &mut dyn GraphicsSurface) -> bool {
    let result = ShapeDescriptor::try_parse(value)
        .and_then(|descriptor| draw_shape(&descriptor, rect).map(|path| (descriptor, path)));
    match result {
        Ok((descriptor, path)) => {
            if descriptor.is_filled() {
                surface.fill_path(&path, color);
            } else {
                surface.stroke_path(&path, color, descriptor.thickness);
            }
            true
        }
        Err(e) => {
            log::debug!("Skipping shape '{}': {}", value, e);
            false
        }
    }
}

fn rect(_: &ShapeDescriptor, r: RectF) -> Result<ShapePath, ShapeError> {
    let mut path = ShapePath::new();
    path.rect(r);
    Ok(path)
}

fn ellipse(_: &ShapeDescriptor, r: RectF) -> Result<ShapePath, ShapeError> {
    let (rx, ry) = (r.width / 2.0, r.height / 2.0);
    let (cx, cy) = (r.x + rx, r.y + ry);
    let (kx, ky) = (rx * KAPPA, ry * KAPPA);

    let mut path = ShapePath::new();
    path.move_to(cx + rx, cy);
    path.curve_to((cx + rx, cy + ky), (cx + kx, cy + ry), (cx, cy + ry));
    path.curve_to((cx - kx, cy + ry), (cx - rx, cy + ky), (cx - rx, cy));
    path.curve_to((cx - rx, cy - ky), (cx - kx, cy - ry), (cx, cy - ry));
    path.curve_to((cx + kx, cy - ry), (cx + rx, cy - ky), (cx + rx, cy));
    path.close();
    Ok(path)
}

fn rounded_rect(d: &ShapeDescriptor, r: RectF) -> Result<ShapePath, ShapeError> {
    let radius = d
        .number(RoundedRectArg::Radius as usize)?
        .max(0.0)
        .min(r.width / 2.0)
        .min(r.height / 2.0);
    if radius == 0.0 {
        return rect(d, r);
    }
    let k = radius * KAPPA;
    let (x, y, right, bottom) = (r.x, r.y, r.right(), r.bottom());

    let mut path = ShapePath::new();
    path.move_to(x + radius, y);
    path.line_to(right - radius, y);
    path.curve_to((right - radius + k, y), (right, y + radius - k), (right, y + radius));
    path.line_to(right, bottom - radius);
    path.curve_to(
        (right, bottom - radius + k),
        (right - radius + k, bottom),
        (right - radius, bottom),
    );
    path.line_to(x + radius, bottom);
    path.curve_to((x + radius - k, bottom), (x, bottom - radius + k), (x, bottom - radius));
    path.line_to(x, y + radius);
    path.curve_to((x, y + radius - k), (x + radius - k, y), (x + radius, y));
    path.close();
    Ok(path)
}

fn triangle(_: &ShapeDescriptor, r: RectF) -> Result<ShapePath, ShapeError> {
    let mut path = ShapePath::new();
    path.move_to(r.x + r.width / 2.0, r.y);
    path.line_to(r.right(), r.bottom());
    path.line_to(r.x, r.bottom());
    path.close();
    Ok(path)
}

/// Regular polygon inscribed in the rectangle, first vertex at the top.
fn polygon(d: &ShapeDescriptor, r: RectF) -> Result<ShapePath, ShapeError> {
    let sides = d.count(PolygonArg::Sides as usize, 3)?;
    let (rx, ry) = (r.width / 2.0, r.height / 2.0);
    let (cx, cy) = (r.x + rx, r.y + ry);

    let mut path = ShapePath::new();
    for i in 0..sides {
        let angle = -std::f64::consts::FRAC_PI_2 + i as f64 * std::f64::consts::TAU / sides as f64;
        let (px, py) = (cx + rx * angle.cos(), cy + ry * angle.sin());
        if i == 0 {
            path.move_to(px, py);
        } else {
            path.line_to(px, py);
        }
    }
    path.close();
    Ok(path)
}

/// Outer border plus evenly spaced interior column and row lines.
fn grid(d: &ShapeDescriptor, r: RectF) -> Result<ShapePath, ShapeError> {
    let columns = d.count(GridArg::Columns as usize, 1)?;
    let rows = d.count(GridArg::Rows as usize, 1)?;

    let mut path = ShapePath::new();
    path.rect(r);
    let column_width = r.width / columns as f64;
    for c in 1..columns {
        let x = r.x + c as f64 * column_width;
        path.move_to(x, r.y);
        path.line_to(x, r.bottom());
    }
    let row_height = r.height / rows as f64;
    for row in 1..rows {
        let y = r.y + row as f64 * row_height;
        path.move_to(r.x, y);
        path.line_to(r.right(), y);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{CommandRecorder, DrawCommand};

    fn rect() -> RectF {
        RectF::new(0.0, 0.0, 100.0, 50.0)
    }

    #[test]
    fn parse_header() {
        let d = ShapeDescriptor::parse("#RoundedRect;2;-;40;8#").unwrap();
        assert_eq!(d.name, "roundedrect");
        assert_eq!(d.thickness, 2.0);
        assert_eq!(d.width, None);
        assert_eq!(d.height, Some(40.0));
        assert_eq!(d.args, vec!["8".to_string()]);
    }

    #[test]
    fn parse_rejects_missing_delimiters() {
        assert!(ShapeDescriptor::parse("rect;0;-;-").is_none());
        assert!(ShapeDescriptor::parse("#;0#").is_none());
        assert_eq!(
            ShapeDescriptor::try_parse("#rect;thick#"),
            Err(ShapeError::InvalidNumber {
                index: 1,
                value: "thick".to_string()
            })
        );
    }

    #[test]
    fn overrides_and_stroke_inset() {
        let d = ShapeDescriptor::parse("#rect;4;60;-#").unwrap();
        assert_eq!(d.target(rect()), RectF::new(2.0, 2.0, 56.0, 46.0));
        let filled = ShapeDescriptor::parse("#rect;0;-;-#").unwrap();
        assert_eq!(filled.target(rect()), rect());
    }

    #[test]
    fn missing_shape_argument() {
        let d = ShapeDescriptor::parse("#polygon;0;-;-#").unwrap();
        assert_eq!(
            draw_shape(&d, rect()),
            Err(ShapeError::MissingArgument { index: BASE_ARG_INDEX })
        );
    }

    #[test]
    fn bad_shape_argument() {
        let d = ShapeDescriptor::parse("#grid;1;-;-;3;many#").unwrap();
        assert_eq!(
            draw_shape(&d, rect()),
            Err(ShapeError::InvalidNumber {
                index: BASE_ARG_INDEX + 1,
                value: "many".to_string()
            })
        );
    }

    #[test]
    fn oversized_counts_are_rejected() {
        let d = ShapeDescriptor::parse("#grid;0;-;-;2000000;1#").unwrap();
        assert_eq!(
            draw_shape(&d, rect()),
            Err(ShapeError::InvalidNumber {
                index: BASE_ARG_INDEX,
                value: "2000000".to_string()
            })
        );
        let d = ShapeDescriptor::parse("#polygon;0;-;-;1e12#").unwrap();
        assert!(matches!(draw_shape(&d, rect()), Err(ShapeError::InvalidNumber { .. })));

        let d = ShapeDescriptor::parse(&format!("#grid;0;-;-;{};1#", MAX_COUNT)).unwrap();
        assert!(draw_shape(&d, rect()).is_ok());

        let mut recorder = CommandRecorder::new();
        assert!(!render_shape("#grid;1;-;-;1;5000#", rect(), Color::BLACK, &mut recorder));
        assert!(recorder.commands.is_empty());
    }

    #[test]
    fn polygon_has_one_vertex_per_side() {
        let d = ShapeDescriptor::parse("#polygon;0;-;-;6#").unwrap();
        let path = draw_shape(&d, rect()).unwrap();
        let vertices = path
            .ops
            .iter()
            .filter(|op| matches!(op, PathOp::MoveTo(_) | PathOp::LineTo(_)))
            .count();
        assert_eq!(vertices, 6);
        let PathOp::MoveTo(top) = path.ops[0] else {
            panic!("polygon must start with a move");
        };
        assert!((top.x - 50.0).abs() < 1e-9 && top.y.abs() < 1e-9);
    }

    #[test]
    fn grid_interior_lines() {
        let d = ShapeDescriptor::parse("#grid;0;-;-;3;2#").unwrap();
        let path = draw_shape(&d, rect()).unwrap();
        // Border (5 ops) + 2 column lines + 1 row line, 2 ops each.
        assert_eq!(path.ops.len(), 5 + 2 * 2 + 2);
    }

    #[test]
    fn rounded_rect_radius_is_clamped() {
        let d = ShapeDescriptor::parse("#roundedrect;0;-;-;500#").unwrap();
        let path = draw_shape(&d, rect()).unwrap();
        // Radius clamps to half the height.
        assert_eq!(path.ops[0], PathOp::MoveTo(PointF::new(25.0, 0.0)));
    }

    #[test]
    fn unknown_shape_draws_nothing() {
        let mut recorder = CommandRecorder::new();
        assert!(!render_shape("#star;0;-;-#", rect(), Color::BLACK, &mut recorder));
        assert!(recorder.commands.is_empty());
        assert!(!is_known_shape("star"));
    }

    #[test]
    fn thickness_selects_fill_or_stroke() {
        let mut recorder = CommandRecorder::new();
        assert!(render_shape("#ellipse;0;-;-#", rect(), Color::BLACK, &mut recorder));
        assert!(render_shape("#triangle;3;-;-#", rect(), Color::BLACK, &mut recorder));
        assert!(matches!(recorder.commands[0], DrawCommand::FillPath { .. }));
        assert!(matches!(
            recorder.commands[1],
            DrawCommand::StrokePath { width, .. } if width == 3.0
        ));
    }
}
