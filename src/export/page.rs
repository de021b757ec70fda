//! Page geometry: printed card sizes and orientation choice.

use crate::error::CardError;
use crate::model::{PageSettings, SizeF};

use super::LayoutSpec;

const EPSILON: f64 = 0.0001;
const DEFAULT_DPI: f64 = 300.0;

/// Printed size of one card of `layout`, in the page's unit.
///
/// The bitmap is `width_px x height_px` at the layout's dpi; a quarter-turn
/// rotation swaps the printed width and height. Fails if the card can't fit
/// the printable area, which aborts the whole export.
pub fn item_size(layout: &LayoutSpec, page: &PageSettings) -> Result<SizeF, CardError> {
    let dpi = if layout.dpi > 0.0 {
        layout.dpi
    } else {
        log::warn!(
            "Layout '{}' has dpi {}; using {}",
            layout.name,
            layout.dpi,
            DEFAULT_DPI
        );
        DEFAULT_DPI
    };
    let per_inch = page.unit.per_inch();
    let width = layout.width_px as f64 * per_inch / dpi;
    let height = layout.height_px as f64 * per_inch / dpi;
    let size = if is_quarter_turn(layout.rotation) {
        SizeF::new(height, width)
    } else {
        SizeF::new(width, height)
    };

    let area = page.printable_area();
    if size.width > area.width + EPSILON || size.height > area.height + EPSILON {
        return Err(CardError::LayoutTooLarge {
            layout: layout.name.clone(),
            item_width: size.width,
            item_height: size.height,
            area_width: area.width,
            area_height: area.height,
        });
    }
    Ok(size)
}

/// Whether `rotation` (degrees) turns the card on its side.
pub fn is_quarter_turn(rotation: i32) -> bool {
    rotation.rem_euclid(180) == 90
}

/// Pick portrait or landscape for printing `item`-sized cards, whichever
/// tiles more whole cards. Returns `(landscape, page)` where `page` has its
/// dimensions and margins turned to match.
pub fn select_orientation(page: &PageSettings, item: SizeF) -> (bool, PageSettings) {
    let portrait = tile_count(page, item);
    let turned = PageSettings {
        width: page.height,
        height: page.width,
        margin: page.margin.transposed(),
        ..page.clone()
    };
    let landscape = tile_count(&turned, item);
    if landscape > portrait {
        (true, turned)
    } else {
        (false, page.clone())
    }
}

fn tile_count(page: &PageSettings, item: SizeF) -> u64 {
    let total_width = item.width + page.buffer;
    let total_height = item.height + page.buffer;
    if total_width <= 0.0 || total_height <= 0.0 {
        return 0;
    }
    let area = page.printable_area();
    let across = (area.width / total_width).floor().max(0.0);
    let down = (area.height / total_height).floor().max(0.0);
    (across * down) as u64
}
