//! # PDF Card Sheets
//!
//! The page sink the exporter packs card bitmaps into, and a small PDF
//! writer implementing it.
//!
//! Every card becomes one FlateDecode RGB image XObject placed with a `cm`
//! matrix, which also carries the card's rotation. There is no text or
//! vector content: cards arrive already rendered.
//!
//! ```text
//! %PDF-1.7
//! 1 0 obj  Catalog
//! 2 0 obj  Pages
//! 3.. obj  image XObjects, then content stream + page per page
//! xref / trailer / %%EOF
//! ```

use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;
use std::path::Path;

use image::RgbImage;
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::error::CardError;

/// US Letter in points, used if an image arrives before any page.
const FALLBACK_PAGE: (f64, f64) = (612.0, 792.0);

/// Windows sharing and lock violations.
const ERROR_SHARING_VIOLATION: i32 = 32;
const ERROR_LOCK_VIOLATION: i32 = 33;

/// Where to put a card on the page, in points from the top-left corner.
/// `width` and `height` are the printed box, after rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Clockwise rotation in degrees; multiples of 90.
    pub rotation: i32,
}

/// Document sink driven by the packing engine.
pub trait PageSink {
    /// Start a new page; later images go onto it.
    fn add_page(&mut self, width_pt: f64, height_pt: f64);
    /// Draw a card bitmap on the current page.
    fn draw_image(&mut self, image: &RgbImage, placement: ImagePlacement);
    fn page_count(&self) -> usize;
}

struct PdfPage {
    width: f64,
    height: f64,
    content: String,
    /// Indices into `PdfDocument::images` drawn on this page.
    images: Vec<usize>,
}

struct EncodedImage {
    width_px: u32,
    height_px: u32,
    data: Vec<u8>,
}

struct PdfObject {
    data: Vec<u8>,
}

/// An in-memory PDF document made of placed card images.
#[derive(Default)]
pub struct PdfDocument {
    pages: Vec<PdfPage>,
    images: Vec<EncodedImage>,
}

impl PdfDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Number of images placed across all pages.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Serialize the document to PDF bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        // 0 = placeholder (PDF objects are 1-indexed), 1 = Catalog, 2 = Pages
        let mut objects: Vec<PdfObject> = (0..3).map(|_| PdfObject { data: vec![] }).collect();

        let mut image_ids = Vec::with_capacity(self.images.len());
        for image in &self.images {
            image_ids.push(objects.len());
            let mut data: Vec<u8> = Vec::new();
            let _ = write!(
                data,
                "<< /Type /XObject /Subtype /Image \
                 /Width {} /Height {} \
                 /ColorSpace /DeviceRGB \
                 /BitsPerComponent 8 \
                 /Filter /FlateDecode \
                 /Length {} >>\nstream\n",
                image.width_px,
                image.height_px,
                image.data.len()
            );
            data.extend_from_slice(&image.data);
            data.extend_from_slice(b"\nendstream");
            objects.push(PdfObject { data });
        }

        let mut page_ids = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let compressed = compress_to_vec_zlib(page.content.as_bytes(), 6);
            let content_id = objects.len();
            let mut data: Vec<u8> = Vec::new();
            let _ = write!(
                data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            data.extend_from_slice(&compressed);
            data.extend_from_slice(b"\nendstream");
            objects.push(PdfObject { data });

            let xobjects: String = page
                .images
                .iter()
                .map(|&idx| format!("/Im{} {} 0 R", idx, image_ids[idx]))
                .collect::<Vec<_>>()
                .join(" ");
            let page_id = objects.len();
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << /XObject << {} >> >> >>",
                page.width, page.height, content_id, xobjects
            );
            objects.push(PdfObject {
                data: page_dict.into_bytes(),
            });
            page_ids.push(page_id);
        }

        objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        let kids: String = page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_ids.len()
        )
        .into_bytes();

        serialize(&objects)
    }

    /// Write the document to `path`.
    pub fn save(&self, path: &Path) -> Result<(), CardError> {
        let bytes = self.to_bytes();
        std::fs::write(path, bytes).map_err(|e| write_error(path, e))?;
        log::info!("Wrote {} page(s) to {}", self.pages.len(), path.display());
        Ok(())
    }
}

impl PageSink for PdfDocument {
    fn add_page(&mut self, width_pt: f64, height_pt: f64) {
        self.pages.push(PdfPage {
            width: width_pt,
            height: height_pt,
            content: String::new(),
            images: Vec::new(),
        });
    }

    fn draw_image(&mut self, image: &RgbImage, placement: ImagePlacement) {
        if self.pages.is_empty() {
            log::warn!("Image drawn before any page was added; starting a Letter page");
            self.add_page(FALLBACK_PAGE.0, FALLBACK_PAGE.1);
        }
        let index = self.images.len();
        self.images.push(EncodedImage {
            width_px: image.width(),
            height_px: image.height(),
            data: compress_to_vec_zlib(image.as_raw(), 6),
        });

        let Some(page) = self.pages.last_mut() else {
            return;
        };
        let [a, b, c, d, e, f] = image_matrix(placement, page.height);
        let _ = write!(
            page.content,
            "q\n{:.4} {:.4} {:.4} {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
            a, b, c, d, e, f, index
        );
        page.images.push(index);
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// The `cm` matrix mapping the image unit square onto the placement box.
/// The box is given top-down; PDF space is bottom-up.
fn image_matrix(p: ImagePlacement, page_height: f64) -> [f64; 6] {
    let (x, y, w, h) = (p.x, page_height - p.y - p.height, p.width, p.height);
    match p.rotation.rem_euclid(360) {
        90 => [0.0, -h, w, 0.0, x, y + h],
        180 => [-w, 0.0, 0.0, -h, x + w, y + h],
        270 => [0.0, h, -w, 0.0, x + w, y],
        0 => [w, 0.0, 0.0, h, x, y],
        other => {
            log::warn!("Unsupported rotation {} degrees; drawing upright", other);
            [w, 0.0, 0.0, h, x, y]
        }
    }
}

fn write_error(path: &Path, e: std::io::Error) -> CardError {
    let locked = e.kind() == std::io::ErrorKind::PermissionDenied
        || matches!(
            e.raw_os_error(),
            Some(ERROR_SHARING_VIOLATION) | Some(ERROR_LOCK_VIOLATION)
        );
    if locked {
        CardError::DestinationLocked {
            path: path.to_path_buf(),
        }
    } else {
        CardError::Write {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

/// Serialize all objects into the final PDF byte stream.
fn serialize(objects: &[PdfObject]) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = vec![0; objects.len()];

    output.extend_from_slice(b"%PDF-1.7\n");
    output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

    for (i, obj) in objects.iter().enumerate().skip(1) {
        offsets[i] = output.len();
        let header = format!("{} 0 obj\n", i);
        output.extend_from_slice(header.as_bytes());
        output.extend_from_slice(&obj.data);
        output.extend_from_slice(b"\nendobj\n\n");
    }

    let xref_offset = output.len();
    let mut table = String::new();
    let _ = write!(table, "xref\n0 {}\n", objects.len());
    table.push_str("0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        let _ = write!(table, "{:010} 00000 n \n", offset);
    }
    let _ = write!(
        table,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len(),
        xref_offset
    );
    output.extend_from_slice(table.as_bytes());
    output
}
