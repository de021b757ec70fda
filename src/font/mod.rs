//! # Font Metrics
//!
//! Layout never rasterizes text; it only asks how big a run is. That
//! question is the [`TextMeasurer`] capability. [`FontContext`] answers it
//! from registered TrueType/OpenType faces (parsed with ttf-parser) and falls
//! back to approximate sans-serif metrics for families it doesn't know.
//! [`MonospaceMetrics`] gives exact, predictable numbers for headless use.

use std::collections::HashMap;

use crate::model::SizeF;
use crate::style::FontFlags;

/// A resolved font: family, size in points and style toggles.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
    pub flags: FontFlags,
}

impl FontSpec {
    pub fn new(family: &str, size: f64) -> Self {
        Self {
            family: family.to_string(),
            size,
            flags: FontFlags::default(),
        }
    }
}

/// Text measurement capability queried by the layout engine.
pub trait TextMeasurer {
    /// Width and line height of `text` set in `font`.
    fn measure(&self, text: &str, font: &FontSpec) -> SizeF;

    /// Resolve a font request to the font that will actually be used.
    fn load_font(&self, family: &str, size: f64, flags: FontFlags) -> FontSpec {
        FontSpec {
            family: family.to_string(),
            size,
            flags,
        }
    }
}

/// Fixed advance per character, fixed line height per point of size.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMetrics {
    /// Advance of one character as a fraction of the font size.
    pub advance: f64,
    /// Line height as a fraction of the font size.
    pub line_height: f64,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self {
            advance: 0.6,
            line_height: 1.2,
        }
    }
}

impl TextMeasurer for MonospaceMetrics {
    fn measure(&self, text: &str, font: &FontSpec) -> SizeF {
        SizeF::new(
            text.chars().count() as f64 * self.advance * font.size,
            self.line_height * font.size,
        )
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct FaceMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
}

impl FaceMetrics {
    /// Parse metrics from font data. Returns `None` if the data isn't a font.
    pub fn from_font_data(data: &[u8]) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, 0).ok()?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut default_advance = 0u16;

        // Basic Multilingual Plane only; cards rarely need more.
        for code in 32u32..=0xFFFF {
            if let Some(ch) = char::from_u32(code) {
                if let Some(glyph_id) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    advance_widths.insert(ch, advance);
                    if ch == ' ' {
                        default_advance = advance;
                    }
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Some(FaceMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            line_gap: face.line_gap(),
        })
    }

    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    pub fn line_height(&self, font_size: f64) -> f64 {
        let units = self.ascender as f64 - self.descender as f64 + self.line_gap as f64;
        units / self.units_per_em as f64 * font_size
    }
}

/// Approximate advance of a character in a Helvetica-like face, in ems.
fn fallback_advance(ch: char, bold: bool) -> f64 {
    let base = match ch {
        ' ' => 0.278,
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '!' | '\'' | '|' => 0.24,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' => 0.333,
        'm' | 'M' | 'W' => 0.833,
        'w' => 0.722,
        '0'..='9' => 0.556,
        c if c.is_ascii_uppercase() => 0.667,
        _ => 0.556,
    };
    if bold {
        base * 1.06
    } else {
        base
    }
}

const FALLBACK_LINE_HEIGHT: f64 = 1.15;

/// Font registry and measurer used by the layout pipeline.
#[derive(Default)]
pub struct FontContext {
    faces: HashMap<FontKey, FaceMetrics>,
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            faces: HashMap::new(),
        }
    }

    /// Register a font face. Returns `false` if the data could not be parsed.
    pub fn register(&mut self, family: &str, bold: bool, italic: bool, data: &[u8]) -> bool {
        match FaceMetrics::from_font_data(data) {
            Some(metrics) => {
                log::debug!("Registered font '{}' (bold={}, italic={})", family, bold, italic);
                self.faces.insert(
                    FontKey {
                        family: family.to_lowercase(),
                        bold,
                        italic,
                    },
                    metrics,
                );
                true
            }
            None => {
                log::warn!("Font data for '{}' could not be parsed", family);
                false
            }
        }
    }

    /// Look up a registered face, trying the regular variant of the family
    /// when the exact style isn't registered.
    fn face(&self, family: &str, flags: FontFlags) -> Option<&FaceMetrics> {
        let family = family.to_lowercase();
        self.faces
            .get(&FontKey {
                family: family.clone(),
                bold: flags.bold,
                italic: flags.italic,
            })
            .or_else(|| {
                self.faces.get(&FontKey {
                    family,
                    bold: false,
                    italic: false,
                })
            })
    }

    pub fn is_registered(&self, family: &str) -> bool {
        let family = family.to_lowercase();
        self.faces.keys().any(|k| k.family == family)
    }
}

impl TextMeasurer for FontContext {
    fn measure(&self, text: &str, font: &FontSpec) -> SizeF {
        match self.face(&font.family, font.flags) {
            Some(face) => SizeF::new(
                text.chars().map(|ch| face.char_width(ch, font.size)).sum(),
                face.line_height(font.size),
            ),
            None => SizeF::new(
                text.chars()
                    .map(|ch| fallback_advance(ch, font.flags.bold) * font.size)
                    .sum(),
                FALLBACK_LINE_HEIGHT * font.size,
            ),
        }
    }

    fn load_font(&self, family: &str, size: f64, flags: FontFlags) -> FontSpec {
        let family = if family.trim().is_empty() {
            "Helvetica"
        } else {
            family.trim()
        };
        FontSpec {
            family: family.to_string(),
            size: if size > 0.0 { size } else { 12.0 },
            flags,
        }
    }
}
