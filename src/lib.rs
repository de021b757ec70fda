//! # CardMaker
//!
//! Formatted-text layout and print-sheet packing for trading-card layouts.
//!
//! Two independent pipelines live here. The text pipeline turns a markup
//! string such as `"<b>Fireball</b> deals <fc=#c00000>3</fc> damage"` into
//! drawing calls inside a card element. The export pipeline takes finished
//! card bitmaps and tiles them into rows and pages of a PDF.
//!
//! ## Architecture
//!
//! ```text
//! raw markup
//!       ↓
//!   [markup]        - tokenize tags, escapes and spaces
//!       ↓
//!   [layout]        - place tokens, wrap lines, dynamic margins
//!       ↓
//!   [layout::align] - vertical offset, per-run alignment, justification
//!       ↓
//!   [render]        - background / image / text passes on a GraphicsSurface
//!
//! card bitmaps (CardRenderer)
//!       ↓
//!   [export]        - row policies, page breaks, page-back ordering
//!       ↓
//!   [pdf]           - image XObjects, serialize to PDF bytes
//! ```
//!
//! Text measurement is a capability ([`font::TextMeasurer`]) rather than a
//! rasterizer, and drawing goes through [`render::GraphicsSurface`], so the
//! core never touches pixels itself.

pub mod error;
pub mod export;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod markup;
pub mod model;
pub mod pdf;
pub mod render;
pub mod shape;
pub mod style;

pub use error::{CardError, ShapeError};
pub use export::{
    CardRenderer, Deck, ExportConfig, ExportSummary, LayoutSpec, LogReporter, NullReporter,
    PdfExporter, ProgressReporter, RowExporter,
};
pub use font::{FontContext, FontSpec, MonospaceMetrics, TextMeasurer};
pub use image_loader::{FileImageSource, ImageSource};
pub use layout::{LayoutEngine, TextLayout};
pub use markup::{tokenize, MarkupKind, MarkupToken};
pub use model::{PageSettings, RectF, TextElement};
pub use pdf::{PageSink, PdfDocument};
pub use render::{render_formatted_text, CommandRecorder, GraphicsSurface};
pub use shape::{render_shape, ShapeDescriptor};
pub use style::{Color, ElementStyle};

/// Parse a text element from JSON, e.g. a card template's rules box.
pub fn text_element_from_json(json: &str) -> Result<TextElement, CardError> {
    Ok(serde_json::from_str(json)?)
}
