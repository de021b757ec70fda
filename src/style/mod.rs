//! # Element Style
//!
//! The style attributes a text element brings to layout: base font, colour,
//! alignment, justification, paragraph indents and line spacing. Inline
//! markup can override most of these per run; this is the state every run
//! starts from.

use serde::{Deserialize, Serialize};

use crate::font::FontSpec;

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse a colour as written in markup arguments and style strings.
    ///
    /// Accepts `RRGGBB` or `RRGGBBAA` hex with an optional `#` or `0x`
    /// prefix, plus a handful of names. Returns `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.to_ascii_lowercase().as_str() {
            "black" => return Some(Color::BLACK),
            "white" => return Some(Color::WHITE),
            "transparent" => return Some(Color::TRANSPARENT),
            "red" => return Some(Color::rgb(1.0, 0.0, 0.0)),
            "green" => return Some(Color::rgb(0.0, 0.5, 0.0)),
            "blue" => return Some(Color::rgb(0.0, 0.0, 1.0)),
            _ => {}
        }

        let hex = value
            .strip_prefix('#')
            .or_else(|| value.strip_prefix("0x"))
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| -> Option<f64> {
            u8::from_str_radix(hex.get(i..i + 2)?, 16)
                .ok()
                .map(|v| v as f64 / 255.0)
        };
        match hex.len() {
            6 => Some(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Color {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: channel(6)?,
            }),
            _ => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Bold/italic/underline/strikeout toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontFlags {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikeout: bool,
}

/// One of the four inline font style toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyleFlag {
    Bold,
    Italic,
    Underline,
    Strikeout,
}

impl FontFlags {
    pub fn get(&self, flag: FontStyleFlag) -> bool {
        match flag {
            FontStyleFlag::Bold => self.bold,
            FontStyleFlag::Italic => self.italic,
            FontStyleFlag::Underline => self.underline,
            FontStyleFlag::Strikeout => self.strikeout,
        }
    }

    pub fn set(&mut self, flag: FontStyleFlag, on: bool) {
        match flag {
            FontStyleFlag::Bold => self.bold = on,
            FontStyleFlag::Italic => self.italic = on,
            FontStyleFlag::Underline => self.underline = on,
            FontStyleFlag::Strikeout => self.strikeout = on,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Where the laid-out block sits vertically inside the element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

impl VerticalAlign {
    /// Offset that places a block of `block_height` inside `element_height`.
    pub fn offset(&self, block_height: f64, element_height: f64) -> f64 {
        match self {
            VerticalAlign::Top => 0.0,
            VerticalAlign::Middle => (element_height - block_height) / 2.0,
            VerticalAlign::Bottom => element_height - block_height,
        }
    }
}

/// Style attributes of a formatted text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementStyle {
    pub font_family: String,
    /// Font size in points.
    pub font_size: f64,
    pub font_flags: FontFlags,
    pub color: Color,
    pub horizontal_align: HorizontalAlign,
    pub vertical_align: VerticalAlign,
    /// Stretch every non-final line of a paragraph to the element width.
    pub justified: bool,
    /// Fixed line height. `None` uses the tallest run on each line.
    pub line_height: Option<f64>,
    /// Indent of the element's first line.
    pub first_line_indent: f64,
    /// Indent applied to every line after a break.
    pub next_line_indent: f64,
    /// Background fill: a colour or a gradient string.
    pub background: Option<String>,
}

impl Default for ElementStyle {
    fn default() -> Self {
        ElementStyle {
            font_family: "Helvetica".to_string(),
            font_size: 12.0,
            font_flags: FontFlags::default(),
            color: Color::BLACK,
            horizontal_align: HorizontalAlign::Left,
            vertical_align: VerticalAlign::Top,
            justified: false,
            line_height: None,
            first_line_indent: 0.0,
            next_line_indent: 0.0,
            background: None,
        }
    }
}

impl ElementStyle {
    /// The element's base font.
    pub fn font(&self) -> FontSpec {
        FontSpec {
            family: self.font_family.clone(),
            size: self.font_size,
            flags: self.font_flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_variants() {
        assert_eq!(Color::parse("#FF0000"), Some(Color::rgb(1.0, 0.0, 0.0)));
        assert_eq!(Color::parse("0x00FF00"), Some(Color::rgb(0.0, 1.0, 0.0)));
        assert_eq!(Color::parse("0000ff"), Some(Color::rgb(0.0, 0.0, 1.0)));
        let c = Color::parse("FFFFFF00").unwrap();
        assert_eq!(c.a, 0.0);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("purple-ish"), None);
        assert_eq!(Color::parse(""), None);
    }

    #[test]
    fn vertical_offsets() {
        assert_eq!(VerticalAlign::Top.offset(20.0, 100.0), 0.0);
        assert_eq!(VerticalAlign::Middle.offset(20.0, 100.0), 40.0);
        assert_eq!(VerticalAlign::Bottom.offset(20.0, 100.0), 80.0);
    }

    #[test]
    fn element_style_from_partial_json() {
        let style: ElementStyle =
            serde_json::from_str(r#"{ "fontSize": 9, "justified": true }"#).unwrap();
        assert_eq!(style.font_size, 9.0);
        assert!(style.justified);
        assert_eq!(style.font_family, "Helvetica");
    }

    #[test]
    fn flags_toggle() {
        let mut flags = FontFlags::default();
        flags.set(FontStyleFlag::Underline, true);
        assert!(flags.get(FontStyleFlag::Underline));
        assert!(!flags.get(FontStyleFlag::Bold));
    }
}
