//! Row placement policies and the packing cursor they drive.
//!
//! All values are in the page's measure unit, top-left origin.

use serde::{Deserialize, Serialize};

use crate::model::{Edges, SizeF};

const EPSILON: f64 = 0.0001;

/// Horizontal placement policy for the cards of one layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowExporter {
    #[default]
    Left,
    Center,
    Right,
}

impl RowExporter {
    /// Centered rows hold exactly one layout, so every new layout starts a row.
    pub fn is_forced_to_new_row(&self) -> bool {
        matches!(self, RowExporter::Center)
    }

    /// Position the cursor at the start of a fresh row that will hold at
    /// most `remaining` more cards.
    pub fn setup_new_row_x(&self, state: &mut RowPackingState, remaining: usize) {
        state.x = match self {
            RowExporter::Left => state.margin_x,
            RowExporter::Center => {
                let row_width = state.row_width(state.items_per_row(remaining));
                state.margin_x + (state.usable_width() - row_width) / 2.0
            }
            RowExporter::Right => {
                let row_width = state.row_width(state.items_per_row(remaining));
                state.margin_end_x - row_width
            }
        };
    }
}

/// The draw cursor threaded through one export job.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPackingState {
    pub x: f64,
    pub y: f64,
    pub item_width: f64,
    pub item_height: f64,
    pub buffer: f64,
    pub margin_x: f64,
    pub margin_end_x: f64,
    pub margin_y: f64,
    pub margin_end_y: f64,
    /// How far the next row starts below the current one: the tallest
    /// item plus buffer placed on this row so far.
    pub next_row_y_adjust: f64,
}

impl RowPackingState {
    pub fn new(page_width: f64, page_height: f64, margin: Edges, buffer: f64) -> Self {
        Self {
            x: margin.left,
            y: margin.top,
            item_width: 0.0,
            item_height: 0.0,
            buffer,
            margin_x: margin.left,
            margin_end_x: page_width - margin.right,
            margin_y: margin.top,
            margin_end_y: page_height - margin.bottom,
            next_row_y_adjust: 0.0,
        }
    }

    pub fn set_item_size(&mut self, size: SizeF) {
        self.item_width = size.width;
        self.item_height = size.height;
    }

    pub fn usable_width(&self) -> f64 {
        self.margin_end_x - self.margin_x
    }

    /// Cards of the current size that fit in a row, capped at `remaining`.
    pub fn items_per_row(&self, remaining: usize) -> usize {
        if remaining == 0 || self.item_width <= 0.0 {
            return 0;
        }
        let usable = self.usable_width();
        let with_buffer = ((usable + self.buffer) / (self.item_width + self.buffer) + EPSILON).floor();
        let bare = (usable / self.item_width + EPSILON).floor();
        (with_buffer.min(bare).max(0.0) as usize).min(remaining)
    }

    /// Width of `count` cards with buffers between them.
    pub fn row_width(&self, count: usize) -> f64 {
        if count == 0 {
            return 0.0;
        }
        count as f64 * self.item_width + (count - 1) as f64 * self.buffer
    }

    pub fn move_to_next_column(&mut self) {
        self.x += self.item_width + self.buffer;
    }

    pub fn is_row_full(&self) -> bool {
        self.x + self.item_width > self.margin_end_x + EPSILON
    }

    /// Whether a card of the current size fits between the cursor and the
    /// bottom margin.
    pub fn fits_vertically(&self) -> bool {
        self.y + self.item_height <= self.margin_end_y + EPSILON
    }

    /// Record that a card of the current size was placed on this row.
    pub fn note_item(&mut self) {
        self.next_row_y_adjust = self.next_row_y_adjust.max(self.item_height + self.buffer);
    }

    /// Move down one row. X is left for the row exporter to set.
    pub fn advance_row(&mut self) {
        self.y += self.next_row_y_adjust.max(self.item_height + self.buffer);
        self.next_row_y_adjust = 0.0;
    }

    /// Reset the cursor to the top of a fresh page.
    pub fn reset_page(&mut self) {
        self.x = self.margin_x;
        self.y = self.margin_y;
        self.next_row_y_adjust = 0.0;
    }
}

/// Iteration order of a layout's cards. For page backs each row-sized chunk
/// is reversed so duplex prints line up with their fronts.
pub fn card_order(count: usize, reverse_rows: bool, per_row: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..count).collect();
    if reverse_rows && per_row > 1 {
        for chunk in order.chunks_mut(per_row) {
            chunk.reverse();
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(usable: f64, buffer: f64) -> RowPackingState {
        let mut s = RowPackingState::new(usable + 20.0, 1000.0, Edges::uniform(10.0), buffer);
        s.set_item_size(SizeF::new(100.0, 150.0));
        s
    }

    #[test]
    fn capacity_honours_buffer_and_remaining() {
        let s = state(320.0, 10.0);
        assert_eq!(s.items_per_row(5), 3);
        assert_eq!(s.items_per_row(2), 2);
        assert_eq!(s.items_per_row(0), 0);

        // 300 fits three bare cards but only two once buffers are added.
        let s = state(300.0, 10.0);
        assert_eq!(s.items_per_row(5), 2);
    }

    #[test]
    fn capacity_never_exceeds_bare_fit() {
        let s = state(250.0, 0.0);
        assert_eq!(s.items_per_row(10), 2);
        let mut s = state(250.0, -40.0);
        s.buffer = -40.0;
        assert!(s.items_per_row(10) <= 2);
    }

    #[test]
    fn zero_width_items_fit_nothing() {
        let mut s = state(320.0, 10.0);
        s.item_width = 0.0;
        assert_eq!(s.items_per_row(3), 0);
    }

    #[test]
    fn row_start_per_policy() {
        let mut s = state(420.0, 10.0);
        RowExporter::Left.setup_new_row_x(&mut s, 5);
        assert_eq!(s.x, 10.0);
        RowExporter::Center.setup_new_row_x(&mut s, 5);
        // (420 - 320) / 2 past the margin
        assert_eq!(s.x, 60.0);
        RowExporter::Right.setup_new_row_x(&mut s, 2);
        assert_eq!(s.x, 430.0 - 210.0);
    }

    #[test]
    fn row_fills_then_advances() {
        let mut s = state(320.0, 10.0);
        RowExporter::Left.setup_new_row_x(&mut s, 5);
        for _ in 0..3 {
            assert!(!s.is_row_full());
            s.note_item();
            s.move_to_next_column();
        }
        assert!(s.is_row_full());
        s.advance_row();
        assert_eq!(s.y, 10.0 + 160.0);
        assert_eq!(s.next_row_y_adjust, 0.0);
    }

    #[test]
    fn tallest_item_sets_row_advance() {
        let mut s = state(320.0, 10.0);
        s.set_item_size(SizeF::new(100.0, 200.0));
        s.note_item();
        s.set_item_size(SizeF::new(100.0, 150.0));
        s.note_item();
        s.advance_row();
        assert_eq!(s.y, 10.0 + 210.0);
    }

    #[test]
    fn only_center_forces_rows() {
        assert!(RowExporter::Center.is_forced_to_new_row());
        assert!(!RowExporter::Left.is_forced_to_new_row());
        assert!(!RowExporter::Right.is_forced_to_new_row());
    }

    #[test]
    fn back_order_reverses_each_row() {
        assert_eq!(card_order(5, false, 3), vec![0, 1, 2, 3, 4]);
        assert_eq!(card_order(5, true, 3), vec![2, 1, 0, 4, 3]);
        assert_eq!(card_order(0, true, 3), Vec::<usize>::new());
    }
}
