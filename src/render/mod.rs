//! # Render Model
//!
//! Turns positioned markup tokens into drawing calls on a [`GraphicsSurface`].
//!
//! The core never rasterizes anything. It issues fills, lines, text runs and
//! images against an abstract surface with a translate stack, and the host
//! (a bitmap canvas, a PDF page, a test recorder) does the pixels.
//!
//! Tokens are drawn in three passes, back to front:
//!
//! ```text
//!   Background  - run background colours, <bgimg> art
//!   Image       - inline <img> tokens
//!   Text        - text runs, underline and strikeout
//! ```

use crate::font::{FontSpec, TextMeasurer};
use crate::image_loader::ImageSource;
use crate::layout::align::align;
use crate::layout::{LayoutEngine, TextLayout};
use crate::markup::{tokenize_with_issues, MarkupKind, MarkupToken};
use crate::model::{PointF, RectF, TextElement};
use crate::shape::ShapePath;
use crate::style::Color;

/// Underline position as a fraction of the run height.
const UNDERLINE_POSITION: f64 = 0.9;
/// Strikeout position as a fraction of the run height.
const STRIKEOUT_POSITION: f64 = 0.55;

/// A linear gradient between two absolute points.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub start: Color,
    pub end: Color,
    pub from: PointF,
    pub to: PointF,
}

/// The drawing operations the core needs from a 2D graphics backend.
///
/// Coordinates are relative to the current transform. `push_transform` saves
/// it, `translate` offsets it and `pop_transform` restores the last save.
pub trait GraphicsSurface {
    fn fill_rect(&mut self, rect: RectF, color: Color);
    fn fill_rect_gradient(&mut self, rect: RectF, gradient: &Gradient);
    /// Draw `text` with its top-left corner at `origin`.
    fn draw_text(&mut self, text: &str, font: &FontSpec, color: Color, origin: PointF);
    fn draw_image(&mut self, source: &str, rect: RectF);
    fn draw_line(&mut self, from: PointF, to: PointF, color: Color, width: f64);
    fn fill_path(&mut self, path: &ShapePath, color: Color);
    fn stroke_path(&mut self, path: &ShapePath, color: Color, width: f64);
    fn push_transform(&mut self);
    fn translate(&mut self, dx: f64, dy: f64);
    fn pop_transform(&mut self);
}

/// One recorded drawing call, in absolute coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect {
        rect: RectF,
        color: Color,
    },
    FillGradient {
        rect: RectF,
        gradient: Gradient,
    },
    Text {
        text: String,
        font: FontSpec,
        color: Color,
        origin: PointF,
    },
    Image {
        source: String,
        rect: RectF,
    },
    Line {
        from: PointF,
        to: PointF,
        color: Color,
        width: f64,
    },
    FillPath {
        path: ShapePath,
        color: Color,
    },
    StrokePath {
        path: ShapePath,
        color: Color,
        width: f64,
    },
}

/// A surface that records every call with the translate stack applied.
///
/// Useful for hosts that replay commands onto their own canvas, and for
/// checking what a render would have drawn.
#[derive(Debug, Default)]
pub struct CommandRecorder {
    pub commands: Vec<DrawCommand>,
    offset: PointF,
    stack: Vec<PointF>,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn point(&self, p: PointF) -> PointF {
        PointF::new(p.x + self.offset.x, p.y + self.offset.y)
    }

    fn rect(&self, r: RectF) -> RectF {
        RectF::new(r.x + self.offset.x, r.y + self.offset.y, r.width, r.height)
    }

    /// Text runs recorded so far, in drawing order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl GraphicsSurface for CommandRecorder {
    fn fill_rect(&mut self, rect: RectF, color: Color) {
        let rect = self.rect(rect);
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn fill_rect_gradient(&mut self, rect: RectF, gradient: &Gradient) {
        let rect = self.rect(rect);
        let gradient = Gradient {
            from: self.point(gradient.from),
            to: self.point(gradient.to),
            ..gradient.clone()
        };
        self.commands.push(DrawCommand::FillGradient { rect, gradient });
    }

    fn draw_text(&mut self, text: &str, font: &FontSpec, color: Color, origin: PointF) {
        let origin = self.point(origin);
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            font: font.clone(),
            color,
            origin,
        });
    }

    fn draw_image(&mut self, source: &str, rect: RectF) {
        let rect = self.rect(rect);
        self.commands.push(DrawCommand::Image {
            source: source.to_string(),
            rect,
        });
    }

    fn draw_line(&mut self, from: PointF, to: PointF, color: Color, width: f64) {
        let (from, to) = (self.point(from), self.point(to));
        self.commands.push(DrawCommand::Line {
            from,
            to,
            color,
            width,
        });
    }

    fn fill_path(&mut self, path: &ShapePath, color: Color) {
        let path = path.translated(self.offset.x, self.offset.y);
        self.commands.push(DrawCommand::FillPath { path, color });
    }

    fn stroke_path(&mut self, path: &ShapePath, color: Color, width: f64) {
        let path = path.translated(self.offset.x, self.offset.y);
        self.commands.push(DrawCommand::StrokePath { path, color, width });
    }

    fn push_transform(&mut self) {
        self.stack.push(self.offset);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.offset.x += dx;
        self.offset.y += dy;
    }

    fn pop_transform(&mut self) {
        if let Some(offset) = self.stack.pop() {
            self.offset = offset;
        }
    }
}

/// Compositing order of token drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderType {
    Background,
    Image,
    Text,
}

impl RenderType {
    pub const ALL: [RenderType; 3] = [RenderType::Background, RenderType::Image, RenderType::Text];
}

/// Draw one token's share of a render pass.
pub fn render_token(token: &MarkupToken, pass: RenderType, surface: &mut dyn GraphicsSurface) {
    let rect = token.target;
    match pass {
        RenderType::Background => match &token.kind {
            MarkupKind::Text(_) | MarkupKind::Space { .. } | MarkupKind::Image(_) => {
                if let Some(color) = token.style.background {
                    if rect.width > 0.0 {
                        surface.fill_rect(rect, color);
                    }
                }
            }
            MarkupKind::BackgroundImage(image) => surface.draw_image(&image.source, rect),
            _ => {}
        },
        RenderType::Image => {
            if let MarkupKind::Image(image) = &token.kind {
                if rect.width > 0.0 && rect.height > 0.0 {
                    surface.draw_image(&image.source, rect);
                }
            }
        }
        RenderType::Text => match &token.kind {
            MarkupKind::Text(text) => {
                let style = &token.style;
                surface.draw_text(text, &style.font, style.color, PointF::new(rect.x, rect.y));
                draw_decorations(token, surface);
            }
            // Spaces carry decorations so underlines run unbroken between words.
            MarkupKind::Space { .. } if rect.width > 0.0 => draw_decorations(token, surface),
            _ => {}
        },
    }
}

fn draw_decorations(token: &MarkupToken, surface: &mut dyn GraphicsSurface) {
    let font = &token.style.font;
    let rect = token.target;
    let width = (font.size / 14.0).max(0.5);
    let mut line_at = |fraction: f64| {
        let y = rect.y + rect.height * fraction;
        surface.draw_line(
            PointF::new(rect.x, y),
            PointF::new(rect.right(), y),
            token.style.color,
            width,
        );
    };
    if font.flags.underline {
        line_at(UNDERLINE_POSITION);
    }
    if font.flags.strikeout {
        line_at(STRIKEOUT_POSITION);
    }
}

/// Draw laid-out tokens of `element`, all passes, in element-local space.
pub fn render_tokens(tokens: &[MarkupToken], element: &TextElement, surface: &mut dyn GraphicsSurface) {
    surface.push_transform();
    surface.translate(element.x, element.y);
    for pass in RenderType::ALL {
        for token in tokens {
            render_token(token, pass, surface);
        }
    }
    surface.pop_transform();
}

/// Parse `start;end;x1;y1;x2;y2` into a gradient across `rect`. The points
/// are fractions of the rectangle. Returns `None` if any part is missing or
/// unparsable.
pub fn parse_gradient(value: &str, rect: RectF) -> Option<Gradient> {
    let parts: Vec<&str> = value.split(';').map(str::trim).collect();
    if parts.len() < 6 {
        return None;
    }
    let start = Color::parse(parts[0])?;
    let end = Color::parse(parts[1])?;
    let mut coords = [0.0; 4];
    for (slot, part) in coords.iter_mut().zip(&parts[2..6]) {
        *slot = part.parse::<f64>().ok()?;
    }
    Some(Gradient {
        start,
        end,
        from: PointF::new(rect.x + coords[0] * rect.width, rect.y + coords[1] * rect.height),
        to: PointF::new(rect.x + coords[2] * rect.width, rect.y + coords[3] * rect.height),
    })
}

/// Fill the element's background. Returns whether anything was drawn.
pub fn render_background(element: &TextElement, surface: &mut dyn GraphicsSurface) -> bool {
    let Some(background) = element.style.background.as_deref() else {
        return false;
    };
    let bounds = element.bounds();
    if background.contains(';') {
        match parse_gradient(background, bounds) {
            Some(gradient) => {
                surface.fill_rect_gradient(bounds, &gradient);
                true
            }
            None => {
                log::debug!("Skipping unparsable gradient '{}'", background);
                false
            }
        }
    } else {
        match Color::parse(background) {
            Some(color) => {
                surface.fill_rect(bounds, color);
                true
            }
            None => {
                log::debug!("Skipping unknown background colour '{}'", background);
                false
            }
        }
    }
}

/// Tokenize, lay out, align and draw formatted text into `element`.
///
/// Returns the layout so callers can inspect line geometry and surface the
/// non-fatal issues collected along the way.
pub fn render_formatted_text(
    raw: &str,
    element: &TextElement,
    measurer: &dyn TextMeasurer,
    images: &dyn ImageSource,
    surface: &mut dyn GraphicsSurface,
) -> TextLayout {
    render_background(element, surface);

    let (mut tokens, tokenizer_issues) = tokenize_with_issues(raw);
    let mut layout = LayoutEngine::new(measurer, images).layout(&mut tokens, element);
    align(element, &mut tokens, &layout);
    render_tokens(&tokens, element, surface);

    if !tokenizer_issues.is_empty() {
        let mut issues = tokenizer_issues;
        issues.append(&mut layout.issues);
        layout.issues = issues;
    }
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::MonospaceMetrics;
    use crate::style::ElementStyle;
    use std::collections::HashMap;

    fn element() -> TextElement {
        TextElement {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 50.0,
            style: ElementStyle {
                font_size: 10.0,
                ..Default::default()
            },
        }
    }

    fn render(raw: &str, element: &TextElement) -> (CommandRecorder, TextLayout) {
        let metrics = MonospaceMetrics::default();
        let images: HashMap<String, (u32, u32)> = HashMap::new();
        let mut recorder = CommandRecorder::new();
        let layout = render_formatted_text(raw, element, &metrics, &images, &mut recorder);
        (recorder, layout)
    }

    #[test]
    fn text_is_drawn_in_absolute_coordinates() {
        let (recorder, _) = render("ab cd", &element());
        assert_eq!(recorder.texts(), vec!["ab", "cd"]);
        let origins: Vec<PointF> = recorder
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { origin, .. } => Some(*origin),
                _ => None,
            })
            .collect();
        assert_eq!(origins[0], PointF::new(10.0, 20.0));
        assert_eq!(origins[1], PointF::new(28.0, 20.0));
    }

    #[test]
    fn transform_stack_is_balanced() {
        let mut recorder = CommandRecorder::new();
        recorder.push_transform();
        recorder.translate(5.0, 5.0);
        recorder.push_transform();
        recorder.translate(1.0, 1.0);
        recorder.pop_transform();
        recorder.fill_rect(RectF::new(0.0, 0.0, 1.0, 1.0), Color::BLACK);
        recorder.pop_transform();
        recorder.fill_rect(RectF::new(0.0, 0.0, 1.0, 1.0), Color::BLACK);
        let xs: Vec<f64> = recorder
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillRect { rect, .. } => Some(rect.x),
                _ => None,
            })
            .collect();
        assert_eq!(xs, vec![5.0, 0.0]);
    }

    #[test]
    fn background_pass_draws_before_text() {
        let (recorder, _) = render("<bgc=#ffff00>hi</bgc>", &element());
        let first_fill = recorder
            .commands
            .iter()
            .position(|c| matches!(c, DrawCommand::FillRect { .. }));
        let first_text = recorder
            .commands
            .iter()
            .position(|c| matches!(c, DrawCommand::Text { .. }));
        assert!(first_fill.unwrap() < first_text.unwrap());
    }

    #[test]
    fn underline_spans_spaces() {
        let (recorder, _) = render("<u>a b</u>", &element());
        let lines = recorder
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { .. }))
            .count();
        // "a", the space and "b"
        assert_eq!(lines, 3);
    }

    #[test]
    fn images_draw_in_image_pass() {
        let metrics = MonospaceMetrics::default();
        let images: HashMap<String, (u32, u32)> = HashMap::new();
        let mut recorder = CommandRecorder::new();
        render_formatted_text("<img=gem.png;8;8>x", &element(), &metrics, &images, &mut recorder);
        assert!(matches!(recorder.commands[0], DrawCommand::Image { .. }));
        assert!(matches!(recorder.commands[1], DrawCommand::Text { .. }));
    }

    #[test]
    fn gradient_points_are_relative_to_rect() {
        let g = parse_gradient("#000000;#ffffff;0;0;1;0.5", RectF::new(10.0, 10.0, 100.0, 40.0)).unwrap();
        assert_eq!(g.from, PointF::new(10.0, 10.0));
        assert_eq!(g.to, PointF::new(110.0, 30.0));
        assert_eq!(g.end, Color::WHITE);
    }

    #[test]
    fn short_or_bad_gradient_is_skipped() {
        assert!(parse_gradient("#000000;#ffffff;0;0;1", RectF::default()).is_none());
        assert!(parse_gradient("#000000;#ffffff;0;0;1;x", RectF::default()).is_none());

        let mut el = element();
        el.style.background = Some("#000000;#ffffff;0".to_string());
        let mut recorder = CommandRecorder::new();
        assert!(!render_background(&el, &mut recorder));
        assert!(recorder.commands.is_empty());
    }

    #[test]
    fn solid_background_fills_bounds() {
        let mut el = element();
        el.style.background = Some("#ff0000".to_string());
        let mut recorder = CommandRecorder::new();
        assert!(render_background(&el, &mut recorder));
        assert_eq!(
            recorder.commands[0],
            DrawCommand::FillRect {
                rect: RectF::new(10.0, 20.0, 100.0, 50.0),
                color: Color::rgb(1.0, 0.0, 0.0),
            }
        );
    }

    #[test]
    fn tokenizer_issues_are_reported() {
        let (_, layout) = render("a\nb", &element());
        assert_eq!(layout.issues.len(), 1);
    }
}
