//! # Markup Image Sources
//!
//! Inline `<img>` and `<bgimg>` tags only need the pixel size of the image
//! at layout time; the graphics surface does the actual drawing. Sources
//! are file paths, `data:image/...;base64,` URIs, or raw base64.

use std::cell::RefCell;
use std::collections::HashMap;

/// Supplies pixel dimensions for image references in markup.
pub trait ImageSource {
    fn dimensions(&self, source: &str) -> Option<(u32, u32)>;
}

impl ImageSource for HashMap<String, (u32, u32)> {
    fn dimensions(&self, source: &str) -> Option<(u32, u32)> {
        self.get(source).copied()
    }
}

/// Reads image headers from disk or inline data, caching by source string.
#[derive(Default)]
pub struct FileImageSource {
    cache: RefCell<HashMap<String, Option<(u32, u32)>>>,
}

impl FileImageSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImageSource for FileImageSource {
    fn dimensions(&self, source: &str) -> Option<(u32, u32)> {
        if let Some(dims) = self.cache.borrow().get(source) {
            return *dims;
        }
        let dims = match load_image_dimensions(source) {
            Ok(dims) => Some(dims),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        };
        self.cache.borrow_mut().insert(source.to_string(), dims);
        dims
    }
}

/// Pixel dimensions of the image at `src`.
pub fn load_image_dimensions(src: &str) -> Result<(u32, u32), String> {
    if let Some(bytes) = inline_bytes(src)? {
        let img = image::load_from_memory(&bytes)
            .map_err(|e| format!("Failed to decode inline image: {}", e))?;
        return Ok((img.width(), img.height()));
    }
    image::image_dimensions(src).map_err(|e| format!("Failed to read image '{}': {}", src, e))
}

/// Decode inline image data. `Ok(None)` means `src` should be read as a path.
fn inline_bytes(src: &str) -> Result<Option<Vec<u8>>, String> {
    if src.starts_with("data:image/") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| "Invalid data URI: missing comma".to_string())?;
        return base64_decode(&src[comma_pos + 1..]).map(Some);
    }

    // Only explicit path shapes are treated as files; anything else that
    // decodes as base64 is inline data.
    let looks_like_path = src.starts_with('/')
        || src.starts_with("./")
        || src.starts_with("../")
        || src.contains('\\')
        || src.rsplit_once('.').is_some_and(|(_, ext)| ext.len() <= 4);
    if looks_like_path {
        return Ok(None);
    }
    Ok(base64_decode(src).ok())
}

fn base64_decode(input: &str) -> Result<Vec<u8>, String> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| format!("Base64 decode error: {}", e))
}
