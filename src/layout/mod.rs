//! # Formatted Text Layout
//!
//! Positions a token sequence inside a text element in one forward pass.
//!
//! The cursor walks the tokens top to bottom, keeping a pen position, the
//! current run style and the margins of the current line. Text-bearing
//! tokens get a rectangle and a line number; style tokens only change the
//! cursor. Wrapping happens at token granularity: a run that would cross the
//! right margin moves to the next line whole, so words are never split.
//!
//! Alignment is a separate pass ([`align`]) that shifts the positions
//! assigned here once every line is known.

pub mod align;
pub mod margins;

use crate::font::{FontSpec, TextMeasurer};
use crate::image_loader::ImageSource;
use crate::markup::{ImageRef, MarginDirective, MarginSide, MarkupKind, MarkupToken, RunStyle};
use crate::model::{RectF, SizeF, TextElement};
use crate::style::{Color, FontStyleFlag, HorizontalAlign};

use margins::{MarginRange, MarginTable};

/// Overflow tolerance for floating point widths.
const EPSILON: f64 = 0.001;

/// Geometry of one laid-out line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineMetrics {
    pub number: usize,
    pub top: f64,
    pub height: f64,
    /// Usable left edge (margin) of the line.
    pub left: f64,
    /// Usable right edge (margin) of the line.
    pub right: f64,
    /// Where the first run starts: the left edge plus any indent.
    pub start_x: f64,
}

/// Result of laying out one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLayout {
    /// Lines in order; `lines[n].number == n`.
    pub lines: Vec<LineMetrics>,
    /// Distance from the top of the element to the bottom of the last line.
    pub content_height: f64,
    /// Non-fatal problems found while laying out.
    pub issues: Vec<String>,
}

impl TextLayout {
    pub fn line(&self, number: usize) -> Option<&LineMetrics> {
        self.lines.get(number)
    }
}

/// Run style state that inline tags change and closes restore.
#[derive(Debug, Clone, PartialEq)]
struct StyleState {
    family: String,
    size: f64,
    flags: crate::style::FontFlags,
    color: Color,
    background: Option<Color>,
    x_offset: f64,
    y_offset: f64,
    line_space: f64,
    alignment: HorizontalAlign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineBreak {
    /// The next run didn't fit.
    Wrap,
    /// An explicit `\n`.
    Newline,
    /// The margins left no usable width on the line.
    Margin,
}

/// Pen position and per-line bookkeeping for one element.
struct LayoutCursor<'m> {
    measurer: &'m dyn TextMeasurer,
    width: f64,
    x: f64,
    y: f64,
    line_number: usize,
    /// Tallest thing placed on the current line so far.
    line_height: f64,
    line_has_content: bool,
    line_start_x: f64,
    left: f64,
    right: f64,
    margins: MarginTable,
    indent: f64,
    next_line_indent: f64,
    fixed_line_height: Option<f64>,
    style: StyleState,
    font: FontSpec,
    font_height: f64,
    space_width: f64,
    lines: Vec<LineMetrics>,
    issues: Vec<String>,
}

impl<'m> LayoutCursor<'m> {
    fn new(measurer: &'m dyn TextMeasurer, element: &TextElement) -> Self {
        let base = &element.style;
        let style = StyleState {
            family: base.font_family.clone(),
            size: base.font_size,
            flags: base.font_flags,
            color: base.color,
            background: None,
            x_offset: 0.0,
            y_offset: 0.0,
            line_space: 0.0,
            alignment: base.horizontal_align,
        };
        let mut cursor = Self {
            measurer,
            width: element.width,
            x: 0.0,
            y: 0.0,
            line_number: 0,
            line_height: 0.0,
            line_has_content: false,
            line_start_x: 0.0,
            left: 0.0,
            right: element.width,
            margins: MarginTable::default(),
            indent: base.first_line_indent,
            next_line_indent: base.next_line_indent,
            fixed_line_height: base.line_height,
            style,
            font: base.font(),
            font_height: 0.0,
            space_width: 0.0,
            lines: Vec::new(),
            issues: Vec::new(),
        };
        cursor.refresh_font();
        cursor.resolve_margins(false);
        cursor.start_line();
        cursor
    }

    fn refresh_font(&mut self) {
        self.font = self
            .measurer
            .load_font(&self.style.family, self.style.size, self.style.flags);
        let metrics = self.measurer.measure(" ", &self.font);
        self.space_width = metrics.width;
        self.font_height = metrics.height;
    }

    fn run_style(&self) -> RunStyle {
        RunStyle {
            font: self.font.clone(),
            color: self.style.color,
            background: self.style.background,
            x_offset: self.style.x_offset,
        }
    }

    fn warn(&mut self, issue: String) {
        log::warn!("{}", issue);
        self.issues.push(issue);
    }

    fn start_line(&mut self) {
        self.x = self.left + self.indent;
        self.line_start_x = self.x;
    }

    fn current_line_height(&self) -> f64 {
        if self.line_height > 0.0 {
            self.line_height
        } else {
            self.font_height
        }
    }

    fn finish_line(&mut self) {
        self.lines.push(LineMetrics {
            number: self.line_number,
            top: self.y,
            height: self.current_line_height(),
            left: self.left,
            right: self.right,
            start_x: self.line_start_x,
        });
    }

    fn break_line(&mut self, reason: LineBreak) {
        self.finish_line();
        let advance = self
            .fixed_line_height
            .unwrap_or_else(|| self.current_line_height());
        self.y += advance + self.style.line_space;
        self.line_number += 1;
        self.line_height = 0.0;
        self.line_has_content = false;
        self.indent = self.next_line_indent;
        self.resolve_margins(reason == LineBreak::Margin);
        self.start_line();
    }

    /// Recompute the margins for the current line. A line with no usable
    /// width wraps once; if the wrap lands on another such line the layout
    /// proceeds with the bad geometry and records a warning.
    fn resolve_margins(&mut self, after_reflow: bool) {
        let (left, right) = self.margins.resolve(self.y, self.font_height, self.width);
        self.left = left;
        self.right = right;
        if left > right {
            if after_reflow {
                self.warn(format!(
                    "Margins leave no usable width at y={:.2} (left {:.2} > right {:.2})",
                    self.y, left, right
                ));
            } else {
                self.break_line(LineBreak::Margin);
            }
        }
    }

    fn fits(&self, width: f64) -> bool {
        self.x + width <= self.right + EPSILON
    }

    /// Place an advancing run of `size`, wrapping first if it doesn't fit.
    fn place_run(&mut self, size: SizeF) -> RectF {
        if self.line_has_content && !self.fits(size.width) {
            self.break_line(LineBreak::Wrap);
        }
        let rect = RectF::new(
            self.x + self.style.x_offset,
            self.y + self.style.y_offset,
            size.width,
            size.height,
        );
        self.x += size.width;
        self.line_height = self.line_height.max(size.height);
        self.line_has_content = true;
        rect
    }

    fn place_space(&mut self, trimmable: bool, count: f64) -> RectF {
        let width = self.space_width * count;
        if trimmable && (!self.line_has_content || !self.fits(width)) {
            // A trimmable space never starts a line and never causes a wrap
            // on its own; it collapses to nothing and the next run wraps.
            return RectF::new(self.x, self.y + self.style.y_offset, 0.0, self.font_height);
        }
        self.place_run(SizeF::new(width, self.font_height))
    }

    fn marker_rect(&self) -> RectF {
        RectF::new(self.x, self.y, 0.0, self.font_height)
    }

    fn add_margin(&mut self, directive: MarginDirective) {
        let range = MarginRange {
            top: self.y,
            bottom: self.y + directive.height.unwrap_or(self.font_height),
            inset: directive.inset,
        };
        let (ranges, side) = match directive.side {
            MarginSide::Left => (&mut self.margins.left, "left"),
            MarginSide::Right => (&mut self.margins.right, "right"),
        };
        if ranges.insert(range) {
            self.warn(format!(
                "Duplicate {} margin range [{:.2}, {:.2}) replaced",
                side, range.top, range.bottom
            ));
        }
        let line_before = self.line_number;
        self.resolve_margins(false);
        if self.line_number == line_before {
            if self.line_has_content {
                self.x = self.x.max(self.left);
            } else {
                self.start_line();
            }
        }
    }
}

/// Lays out formatted text tokens inside an element.
pub struct LayoutEngine<'a> {
    measurer: &'a dyn TextMeasurer,
    images: &'a dyn ImageSource,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(measurer: &'a dyn TextMeasurer, images: &'a dyn ImageSource) -> Self {
        Self { measurer, images }
    }

    /// Assign every token a rectangle, line number, alignment and run style.
    ///
    /// All per-token fields are overwritten, so laying out the same tokens
    /// again gives the same result.
    pub fn layout(&self, tokens: &mut [MarkupToken], element: &TextElement) -> TextLayout {
        let mut cursor = LayoutCursor::new(self.measurer, element);
        // State captured by each opening token, for its close to restore.
        let mut saved: Vec<Option<StyleState>> = vec![None; tokens.len()];

        for i in 0..tokens.len() {
            let line_before = cursor.line_number;
            let mut line = None;

            let target = match &tokens[i].kind {
                MarkupKind::Text(text) => {
                    let size = self.measurer.measure(text, &cursor.font);
                    cursor.place_run(size)
                }
                MarkupKind::Space { trimmable, count } => cursor.place_space(*trimmable, *count),
                MarkupKind::Image(image) => {
                    let size = self.image_size(image, &mut cursor);
                    let rect = cursor.place_run(size);
                    RectF::new(rect.x + image.x_offset, rect.y + image.y_offset, rect.width, rect.height)
                }
                MarkupKind::BackgroundImage(image) => {
                    let size = self.image_size(image, &mut cursor);
                    RectF::new(
                        cursor.x + image.x_offset,
                        cursor.y + image.y_offset,
                        size.width,
                        size.height,
                    )
                }
                MarkupKind::Newline => {
                    let rect = cursor.marker_rect();
                    cursor.break_line(LineBreak::Newline);
                    line = Some(line_before);
                    rect
                }
                MarkupKind::Margin(directive) => {
                    let directive = *directive;
                    cursor.add_margin(directive);
                    cursor.marker_rect()
                }
                MarkupKind::Close { opener } => {
                    let opener = *opener;
                    if let Some(previous) = saved.get_mut(opener).and_then(Option::take) {
                        restore(&mut cursor, &tokens[opener].kind, previous);
                    }
                    cursor.marker_rect()
                }
                kind => {
                    saved[i] = Some(cursor.style.clone());
                    apply_style(&mut cursor, kind);
                    cursor.marker_rect()
                }
            };

            let alignment = cursor.style.alignment;
            let style = cursor.run_style();
            let token = &mut tokens[i];
            token.target = target;
            token.line_number = line.unwrap_or(cursor.line_number);
            token.alignment = alignment;
            token.style = style;
        }

        cursor.finish_line();
        let content_height = cursor
            .lines
            .last()
            .map_or(0.0, |l| l.top + l.height);

        TextLayout {
            lines: cursor.lines,
            content_height,
            issues: cursor.issues,
        }
    }

    /// Size of an inline image in element units. Missing dimensions are
    /// completed from the image's aspect ratio; an unknown image without
    /// explicit size collapses to nothing.
    fn image_size(&self, image: &ImageRef, cursor: &mut LayoutCursor<'_>) -> SizeF {
        let dims = match (image.width, image.height) {
            (Some(w), Some(h)) => return SizeF::new(w, h),
            _ => self.images.dimensions(&image.source),
        };
        let Some((px_w, px_h)) = dims.filter(|(w, h)| *w > 0 && *h > 0) else {
            cursor.warn(format!("Image '{}' has no known size", image.source));
            return SizeF::new(
                image.width.or(image.height).unwrap_or(0.0),
                image.height.or(image.width).unwrap_or(0.0),
            );
        };
        let aspect = px_h as f64 / px_w as f64;
        match (image.width, image.height) {
            (Some(w), None) => SizeF::new(w, w * aspect),
            (None, Some(h)) => SizeF::new(h / aspect, h),
            _ => SizeF::new(px_w as f64, px_h as f64),
        }
    }
}

fn apply_style(cursor: &mut LayoutCursor<'_>, kind: &MarkupKind) {
    let style = &mut cursor.style;
    let mut font_changed = false;
    match kind {
        MarkupKind::FontStyle(flag) => {
            style.flags.set(*flag, true);
            font_changed = matches!(flag, FontStyleFlag::Bold | FontStyleFlag::Italic);
        }
        MarkupKind::FontFamily(family) => {
            style.family = family.clone();
            font_changed = true;
        }
        MarkupKind::FontSize(size) => {
            style.size = *size;
            font_changed = true;
        }
        MarkupKind::FontColor(color) => style.color = *color,
        MarkupKind::BackgroundColor(color) => style.background = Some(*color),
        MarkupKind::XOffset(v) => style.x_offset = *v,
        MarkupKind::YOffset(v) => style.y_offset = *v,
        MarkupKind::LineSpace(v) => style.line_space = *v,
        MarkupKind::Align(a) => style.alignment = *a,
        _ => {}
    }
    // Underline/strikeout don't change metrics but the run's font carries them.
    if font_changed || matches!(kind, MarkupKind::FontStyle(_)) {
        cursor.refresh_font();
    }
}

/// Undo the effect of `opener` using the state captured before it applied.
fn restore(cursor: &mut LayoutCursor<'_>, opener: &MarkupKind, previous: StyleState) {
    let style = &mut cursor.style;
    match opener {
        MarkupKind::Push => *style = previous,
        MarkupKind::FontStyle(flag) => style.flags.set(*flag, previous.flags.get(*flag)),
        MarkupKind::FontFamily(_) => style.family = previous.family,
        MarkupKind::FontSize(_) => style.size = previous.size,
        MarkupKind::FontColor(_) => style.color = previous.color,
        MarkupKind::BackgroundColor(_) => style.background = previous.background,
        MarkupKind::XOffset(_) => style.x_offset = previous.x_offset,
        MarkupKind::YOffset(_) => style.y_offset = previous.y_offset,
        MarkupKind::LineSpace(_) => style.line_space = previous.line_space,
        MarkupKind::Align(_) => style.alignment = previous.alignment,
        _ => return,
    }
    cursor.refresh_font();
}
