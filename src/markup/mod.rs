//! # Markup Tokens
//!
//! Formatted text is plain text with inline tags (`<b>`, `<fc=#ff0000>`,
//! `<img=gem.png;12;12>`) and the `\n` escape. The tokenizer turns it into a
//! flat sequence of [`MarkupToken`]s in document order. Layout then writes a
//! position, line number and resolved run style into each token, alignment
//! adjusts the positions, and the render pass reads them. Tokens are rebuilt
//! for every render; nothing positional outlives one pass.

mod tokenizer;

pub use tokenizer::{tokenize, tokenize_with_issues};

use crate::font::FontSpec;
use crate::model::RectF;
use crate::style::{Color, FontStyleFlag, HorizontalAlign};

/// Every tag name the tokenizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagName {
    Bold,
    Italic,
    Underline,
    Strikeout,
    Font,
    FontSize,
    FontColor,
    BackgroundColor,
    BackgroundImage,
    Image,
    Spacing,
    XOffset,
    YOffset,
    LineSpace,
    AlignLeft,
    AlignCenter,
    AlignRight,
    MarginLeft,
    MarginRight,
    Push,
    Break,
}

/// Tag spellings, matched case-insensitively.
const TAG_TABLE: &[(&str, TagName)] = &[
    ("b", TagName::Bold),
    ("i", TagName::Italic),
    ("u", TagName::Underline),
    ("s", TagName::Strikeout),
    ("font", TagName::Font),
    ("fs", TagName::FontSize),
    ("fc", TagName::FontColor),
    ("color", TagName::FontColor),
    ("bgc", TagName::BackgroundColor),
    ("bgimg", TagName::BackgroundImage),
    ("img", TagName::Image),
    ("spc", TagName::Spacing),
    ("xo", TagName::XOffset),
    ("yo", TagName::YOffset),
    ("ls", TagName::LineSpace),
    ("al", TagName::AlignLeft),
    ("ac", TagName::AlignCenter),
    ("ar", TagName::AlignRight),
    ("ml", TagName::MarginLeft),
    ("mr", TagName::MarginRight),
    ("push", TagName::Push),
    ("br", TagName::Break),
];

impl TagName {
    pub fn lookup(name: &str) -> Option<TagName> {
        TAG_TABLE
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, tag)| *tag)
    }
}

/// An image reference from `<img=...>` or `<bgimg=...>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub source: String,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub x_offset: f64,
    pub y_offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginSide {
    Left,
    Right,
}

/// A `<ml=inset;height>` / `<mr=inset;height>` directive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginDirective {
    pub side: MarginSide,
    pub inset: f64,
    /// Vertical extent of the margin. `None` means one line of the current font.
    pub height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupKind {
    Text(String),
    /// Inter-word space. Trimmable spaces vanish at the start of a line;
    /// explicit `<spc=n>` spacing is kept and spans `count` space widths.
    Space { trimmable: bool, count: f64 },
    Newline,
    Image(ImageRef),
    BackgroundColor(Color),
    BackgroundImage(ImageRef),
    FontStyle(FontStyleFlag),
    FontFamily(String),
    FontSize(f64),
    FontColor(Color),
    XOffset(f64),
    YOffset(f64),
    LineSpace(f64),
    Align(HorizontalAlign),
    Margin(MarginDirective),
    /// Closes the still-open token at index `opener`.
    Close { opener: usize },
    /// Captures all style state; its close restores it.
    Push,
}

impl MarkupKind {
    /// The tag a close has to name to end this token, if it can be closed.
    pub fn opened_by(&self) -> Option<TagName> {
        match self {
            MarkupKind::FontStyle(FontStyleFlag::Bold) => Some(TagName::Bold),
            MarkupKind::FontStyle(FontStyleFlag::Italic) => Some(TagName::Italic),
            MarkupKind::FontStyle(FontStyleFlag::Underline) => Some(TagName::Underline),
            MarkupKind::FontStyle(FontStyleFlag::Strikeout) => Some(TagName::Strikeout),
            MarkupKind::FontFamily(_) => Some(TagName::Font),
            MarkupKind::FontSize(_) => Some(TagName::FontSize),
            MarkupKind::FontColor(_) => Some(TagName::FontColor),
            MarkupKind::BackgroundColor(_) => Some(TagName::BackgroundColor),
            MarkupKind::XOffset(_) => Some(TagName::XOffset),
            MarkupKind::YOffset(_) => Some(TagName::YOffset),
            MarkupKind::LineSpace(_) => Some(TagName::LineSpace),
            MarkupKind::Align(HorizontalAlign::Left) => Some(TagName::AlignLeft),
            MarkupKind::Align(HorizontalAlign::Center) => Some(TagName::AlignCenter),
            MarkupKind::Align(HorizontalAlign::Right) => Some(TagName::AlignRight),
            MarkupKind::Push => Some(TagName::Push),
            _ => None,
        }
    }
}

/// Font, colour and background in effect when a token was placed.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStyle {
    pub font: FontSpec,
    pub color: Color,
    pub background: Option<Color>,
    /// `<xo>` shift added to the pen position when the token was placed.
    pub x_offset: f64,
}

impl Default for RunStyle {
    fn default() -> Self {
        Self {
            font: FontSpec::new("Helvetica", 12.0),
            color: Color::BLACK,
            background: None,
            x_offset: 0.0,
        }
    }
}

/// One lexical unit of formatted text plus its layout results.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupToken {
    pub kind: MarkupKind,
    /// Visual line the token was placed on.
    pub line_number: usize,
    /// Position and size in element-local coordinates.
    pub target: RectF,
    /// Horizontal alignment in effect for this token.
    pub alignment: HorizontalAlign,
    pub style: RunStyle,
}

impl MarkupToken {
    pub fn new(kind: MarkupKind) -> Self {
        Self {
            kind,
            line_number: 0,
            target: RectF::default(),
            alignment: HorizontalAlign::Left,
            style: RunStyle::default(),
        }
    }

    /// Whether the alignment pass moves this token.
    pub fn aligns(&self) -> bool {
        matches!(
            self.kind,
            MarkupKind::Text(_)
                | MarkupKind::Space { .. }
                | MarkupKind::Image(_)
                | MarkupKind::BackgroundImage(_)
        )
    }

    pub fn is_space(&self) -> bool {
        matches!(self.kind, MarkupKind::Space { .. })
    }

    pub fn is_newline(&self) -> bool {
        matches!(self.kind, MarkupKind::Newline)
    }

    /// Horizontal distance between the token and the pen position it was
    /// placed at: the run's `<xo>` plus an inline image's own offset.
    pub fn placement_offset(&self) -> f64 {
        match &self.kind {
            MarkupKind::Image(image) => self.style.x_offset + image.x_offset,
            _ => self.style.x_offset,
        }
    }

    /// Text carried by the token, if any.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            MarkupKind::Text(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(TagName::lookup("B"), Some(TagName::Bold));
        assert_eq!(TagName::lookup("Color"), Some(TagName::FontColor));
        assert_eq!(TagName::lookup("FC"), Some(TagName::FontColor));
        assert_eq!(TagName::lookup("blink"), None);
    }

    #[test]
    fn only_style_tokens_close() {
        assert_eq!(MarkupKind::Push.opened_by(), Some(TagName::Push));
        assert_eq!(MarkupKind::FontColor(Color::WHITE).opened_by(), Some(TagName::FontColor));
        assert_eq!(MarkupKind::Newline.opened_by(), None);
        assert_eq!(MarkupKind::Text("x".into()).opened_by(), None);
    }

    #[test]
    fn aligning_kinds() {
        assert!(MarkupToken::new(MarkupKind::Text("a".into())).aligns());
        assert!(MarkupToken::new(MarkupKind::Space {
            trimmable: true,
            count: 1.0
        })
        .aligns());
        assert!(!MarkupToken::new(MarkupKind::Newline).aligns());
        assert!(!MarkupToken::new(MarkupKind::FontSize(10.0)).aligns());
    }
}
