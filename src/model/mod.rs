//! # Core Model
//!
//! Geometry shared by every stage, the text element being laid out, and the
//! physical page settings the exporter packs cards onto.

use serde::{Deserialize, Serialize};

use crate::style::ElementStyle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeF {
    pub width: f64,
    pub height: f64,
}

impl SizeF {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle, top-left origin, y growing downwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RectF {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RectF {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Shrink by `amount` on every side.
    pub fn inset(&self, amount: f64) -> RectF {
        RectF {
            x: self.x + amount,
            y: self.y + amount,
            width: self.width - 2.0 * amount,
            height: self.height - 2.0 * amount,
        }
    }
}

/// Edge values (top, right, bottom, left) used for page margins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }

    /// The same margins seen from a page turned 90 degrees.
    pub fn transposed(&self) -> Self {
        Self {
            top: self.left,
            right: self.bottom,
            bottom: self.right,
            left: self.top,
        }
    }
}

/// A formatted text element: a box on a card plus its base style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextElement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub style: ElementStyle,
}

impl TextElement {
    pub fn new(width: f64, height: f64, style: ElementStyle) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            style,
        }
    }

    pub fn bounds(&self) -> RectF {
        RectF::new(self.x, self.y, self.width, self.height)
    }
}

/// Physical unit the page settings are expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasureUnit {
    #[default]
    Inch,
    Millimeter,
    Centimeter,
    Point,
}

impl MeasureUnit {
    /// How many of this unit make up one inch.
    pub fn per_inch(&self) -> f64 {
        match self {
            MeasureUnit::Inch => 1.0,
            MeasureUnit::Millimeter => 25.4,
            MeasureUnit::Centimeter => 2.54,
            MeasureUnit::Point => 72.0,
        }
    }

    /// Convert a value in this unit to PDF points (1/72 inch).
    pub fn to_points(&self, value: f64) -> f64 {
        value * 72.0 / self.per_inch()
    }
}

/// Page size, margins and inter-card spacing for an export job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSettings {
    pub width: f64,
    pub height: f64,
    pub unit: MeasureUnit,
    pub margin: Edges,
    /// Gap left between neighbouring cards, horizontally and vertically.
    pub buffer: f64,
}

impl Default for PageSettings {
    fn default() -> Self {
        // US Letter with quarter-inch margins.
        Self {
            width: 8.5,
            height: 11.0,
            unit: MeasureUnit::Inch,
            margin: Edges::uniform(0.25),
            buffer: 0.0,
        }
    }
}

impl PageSettings {
    /// Width and height left for cards once margins are removed.
    pub fn printable_area(&self) -> SizeF {
        SizeF::new(
            self.width - self.margin.horizontal(),
            self.height - self.margin.vertical(),
        )
    }

    /// Page size in PDF points.
    pub fn size_in_points(&self) -> SizeF {
        SizeF::new(self.unit.to_points(self.width), self.unit.to_points(self.height))
    }
}
