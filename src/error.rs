//! Structured error types for the CardMaker core.
//!
//! Content-level problems (bad markup, unparsable shape arguments) never show
//! up here: they degrade locally. What does show up are the structural
//! failures of an export job and configuration parse errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The unified error type returned by the public export and config APIs.
#[derive(Debug, Error)]
pub enum CardError {
    /// Export settings JSON failed to parse.
    #[error("Failed to parse settings: {source}{}", hint_suffix(.hint))]
    Config {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// A layout's printed size does not fit the printable page area.
    #[error(
        "Layout '{layout}' is {item_width:.2}x{item_height:.2} but the printable page area is only {area_width:.2}x{area_height:.2}"
    )]
    LayoutTooLarge {
        layout: String,
        item_width: f64,
        item_height: f64,
        area_width: f64,
        area_height: f64,
    },

    /// A new page was requested while the current page was still empty.
    #[error("Export made no progress on layout '{layout}' at card {card}")]
    NoProgress { layout: String, card: usize },

    /// The progress reporter asked the job to stop.
    #[error("Export cancelled")]
    Cancelled,

    /// The external card renderer failed to produce a bitmap.
    #[error("Failed to render card {card} of layout '{layout}': {message}")]
    Render {
        layout: String,
        card: usize,
        message: String,
    },

    /// The destination file is read-only or held open by another program.
    #[error("Cannot write {}: the file is read-only or open in another program", .path.display())]
    DestinationLocked { path: PathBuf },

    /// Any other failure writing the output file.
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for CardError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the settings schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        CardError::Config { source: e, hint }
    }
}

/// Why a shape descriptor could not be drawn.
///
/// Callers treat every variant the same way: the shape draws nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("Unknown shape '{0}'")]
    UnknownShape(String),
    #[error("Shape descriptor is not of the form #name;thickness;width;height[;args]#")]
    Malformed,
    #[error("Missing shape argument at position {index}")]
    MissingArgument { index: usize },
    #[error("Shape argument {index} is not a number: '{value}'")]
    InvalidNumber { index: usize, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_carries_hint() {
        let err: CardError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to parse settings"));
        assert!(msg.contains("Hint: Check for trailing commas"));
    }

    #[test]
    fn too_large_message_names_layout() {
        let err = CardError::LayoutTooLarge {
            layout: "poker".to_string(),
            item_width: 9.0,
            item_height: 3.5,
            area_width: 8.0,
            area_height: 10.0,
        };
        assert!(err.to_string().contains("'poker'"));
        assert!(err.to_string().contains("9.00x3.50"));
    }
}
