//! # Card Sheet Export
//!
//! Packs rendered card bitmaps into rows and pages of a PDF.
//!
//! The exporter walks the requested layouts in order. Each layout has a
//! printed card size (from its pixel size and dpi) and a row policy
//! ([`RowExporter`]). One [`RowPackingState`] cursor is threaded through the
//! whole job: cards advance it column by column, a full row moves it down by
//! the tallest card on that row, and a row that would cross the bottom
//! margin starts a new page.
//!
//! Between layouts:
//!
//! ```text
//!   layouts_on_new_page, or row policy changed   -> new page
//!   centered, row full, or row already nested    -> new row
//!   otherwise                                    -> continue on the row (nest)
//! ```
//!
//! Only one layout can nest onto another's row; a third starts a new row.

pub mod page;
pub mod progress;
pub mod row;

pub use page::{is_quarter_turn, item_size, select_orientation};
pub use progress::{LogReporter, NullReporter, ProgressReporter};
pub use row::{card_order, RowExporter, RowPackingState};

use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::CardError;
use crate::model::PageSettings;
use crate::pdf::{ImagePlacement, PageSink, PdfDocument};

/// A card layout as the exporter sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutSpec {
    pub name: String,
    pub width_px: u32,
    pub height_px: u32,
    pub dpi: f64,
    /// Clockwise degrees the card is turned on the page.
    pub rotation: i32,
    /// Cards are the backs of another layout's pages.
    pub page_back: bool,
    /// Row policy for this layout. `None` derives it from the export settings.
    pub alignment: Option<RowExporter>,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            width_px: 0,
            height_px: 0,
            dpi: 300.0,
            rotation: 0,
            page_back: false,
            alignment: None,
        }
    }
}

/// Settings for one export job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    pub page: PageSettings,
    /// Start every layout on a fresh page.
    pub layouts_on_new_page: bool,
    /// Center rows horizontally; page backs are also mirrored per row.
    pub auto_horizontal_center: bool,
    /// Layouts to export, in order. `None` exports every deck.
    pub layout_indices: Option<Vec<usize>>,
}

impl ExportConfig {
    /// Parse export settings from JSON.
    pub fn from_json(json: &str) -> Result<Self, CardError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A data source bound to one layout.
pub trait Deck {
    fn layout(&self) -> &LayoutSpec;
    /// Number of data rows that produce a card.
    fn valid_line_count(&self) -> usize;
}

/// Renders one card of a deck to a bitmap.
///
/// Implementations that render in parallel should give each worker its own
/// scratch buffer; the exporter only needs the finished image.
pub trait CardRenderer {
    fn render_card(&mut self, layout_index: usize, line: usize) -> Result<RgbImage, String>;
}

/// What an export produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub pages: usize,
    pub cards: usize,
}

/// Page-level bookkeeping for one job.
struct PackingJob<'a> {
    page: &'a PageSettings,
    state: RowPackingState,
    sink: &'a mut dyn PageSink,
    page_items: usize,
    pages: usize,
    /// The current row already holds a second layout.
    nested: bool,
}

impl<'a> PackingJob<'a> {
    fn new(page: &'a PageSettings, sink: &'a mut dyn PageSink) -> Self {
        Self {
            page,
            state: RowPackingState::new(page.width, page.height, page.margin, page.buffer),
            sink,
            page_items: 0,
            pages: 0,
            nested: false,
        }
    }

    fn new_page(&mut self, exporter: RowExporter, remaining: usize) {
        let size = self.page.size_in_points();
        self.sink.add_page(size.width, size.height);
        self.pages += 1;
        self.page_items = 0;
        self.nested = false;
        self.state.reset_page();
        exporter.setup_new_row_x(&mut self.state, remaining);
        log::info!("Started page {}", self.pages);
    }

    fn new_row(&mut self, exporter: RowExporter, remaining: usize) {
        self.state.advance_row();
        exporter.setup_new_row_x(&mut self.state, remaining);
        self.nested = false;
    }

    fn draw(&mut self, image: &RgbImage, rotation: i32) {
        let unit = self.page.unit;
        let placement = ImagePlacement {
            x: unit.to_points(self.state.x),
            y: unit.to_points(self.state.y),
            width: unit.to_points(self.state.item_width),
            height: unit.to_points(self.state.item_height),
            rotation,
        };
        self.sink.draw_image(image, placement);
        self.state.note_item();
        self.state.move_to_next_column();
        self.page_items += 1;
    }
}

/// Drives card rendering and packing for a whole export job.
pub struct PdfExporter {
    config: ExportConfig,
}

impl PdfExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Row policy for `layout`: its own override, else centered when
    /// auto-centering, right-aligned for page backs, left otherwise.
    pub fn row_exporter(&self, layout: &LayoutSpec) -> RowExporter {
        match layout.alignment {
            Some(alignment) => alignment,
            None if self.config.auto_horizontal_center => RowExporter::Center,
            None if layout.page_back => RowExporter::Right,
            None => RowExporter::Left,
        }
    }

    /// Render every card of the selected decks and pack them into `sink`.
    ///
    /// Stops with an error, leaving the sink as it was at that point, when a
    /// layout is too large for the page, the cursor stops advancing, a card
    /// fails to render, or the reporter cancels.
    pub fn export(
        &self,
        decks: &[&dyn Deck],
        renderer: &mut dyn CardRenderer,
        sink: &mut dyn PageSink,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<ExportSummary, CardError> {
        let indices: Vec<usize> = match &self.config.layout_indices {
            Some(indices) => indices.clone(),
            None => (0..decks.len()).collect(),
        };
        log::info!("Starting PDF export of {} layout(s)", indices.len());

        let mut job = PackingJob::new(&self.config.page, sink);
        let mut previous: Option<RowExporter> = None;
        let mut cards = 0;

        for layout_index in indices {
            let Some(deck) = decks.get(layout_index) else {
                let issue = format!("Layout index {} is out of range; skipped", layout_index);
                log::warn!("{}", issue);
                reporter.add_issue(&issue);
                continue;
            };
            let layout = deck.layout();
            let count = deck.valid_line_count();
            if count == 0 {
                log::debug!("Skipping layout '{}': no data rows", layout.name);
                continue;
            }

            let size = item_size(layout, &self.config.page).inspect_err(|e| log::error!("{}", e))?;
            let exporter = self.row_exporter(layout);
            job.state.set_item_size(size);

            match previous {
                None => job.new_page(exporter, count),
                Some(prev) if self.config.layouts_on_new_page || prev != exporter => {
                    job.new_page(exporter, count)
                }
                Some(_) if exporter.is_forced_to_new_row() || job.state.is_row_full() || job.nested => {
                    job.new_row(exporter, count)
                }
                Some(_) => {
                    log::debug!("Layout '{}' continues on the current row", layout.name);
                    job.nested = true;
                }
            }

            reporter.reset(&layout.name, count);
            let reverse = layout.page_back && self.config.auto_horizontal_center;
            let order = card_order(count, reverse, job.state.items_per_row(count));

            for (n, &line) in order.iter().enumerate() {
                if reporter.is_cancelled() {
                    log::warn!("Export cancelled at layout '{}' card {}", layout.name, line);
                    return Err(CardError::Cancelled);
                }

                let remaining = count - n;
                if job.state.is_row_full() {
                    job.new_row(exporter, remaining);
                }
                if !job.state.fits_vertically() {
                    if job.page_items == 0 {
                        let err = CardError::NoProgress {
                            layout: layout.name.clone(),
                            card: line,
                        };
                        log::error!("{}", err);
                        return Err(err);
                    }
                    job.new_page(exporter, remaining);
                }

                let image = renderer.render_card(layout_index, line).map_err(|message| {
                    let err = CardError::Render {
                        layout: layout.name.clone(),
                        card: line,
                        message,
                    };
                    log::error!("{}", err);
                    err
                })?;
                job.draw(&image, layout.rotation);
                cards += 1;
                reporter.step();
            }

            reporter.layout_done(&layout.name);
            previous = Some(exporter);
        }

        log::info!("Export finished: {} card(s) on {} page(s)", cards, job.pages);
        Ok(ExportSummary {
            pages: job.pages,
            cards,
        })
    }

    /// Export into a new PDF document and save it to `path`. Nothing is
    /// written unless the whole job succeeds.
    pub fn export_to_file(
        &self,
        decks: &[&dyn Deck],
        renderer: &mut dyn CardRenderer,
        path: &Path,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<ExportSummary, CardError> {
        let mut document = PdfDocument::new();
        let summary = self.export(decks, renderer, &mut document, reporter)?;
        document.save(path).inspect_err(|e| reporter.add_issue(&e.to_string()))?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edges, MeasureUnit};

    struct TestDeck {
        layout: LayoutSpec,
        lines: usize,
    }

    impl Deck for TestDeck {
        fn layout(&self) -> &LayoutSpec {
            &self.layout
        }
        fn valid_line_count(&self) -> usize {
            self.lines
        }
    }

    fn deck(name: &str, width: u32, height: u32, lines: usize) -> TestDeck {
        TestDeck {
            layout: LayoutSpec {
                name: name.to_string(),
                width_px: width,
                height_px: height,
                // One pixel per point.
                dpi: 72.0,
                ..Default::default()
            },
            lines,
        }
    }

    #[derive(Default)]
    struct Renderer {
        calls: Vec<(usize, usize)>,
        fail_on: Option<usize>,
    }

    impl CardRenderer for Renderer {
        fn render_card(&mut self, layout_index: usize, line: usize) -> Result<RgbImage, String> {
            if self.fail_on == Some(line) {
                return Err("template missing".to_string());
            }
            self.calls.push((layout_index, line));
            Ok(RgbImage::new(2, 2))
        }
    }

    #[derive(Default)]
    struct Sink {
        pages: usize,
        placed: Vec<(usize, ImagePlacement)>,
    }

    impl PageSink for Sink {
        fn add_page(&mut self, _width_pt: f64, _height_pt: f64) {
            self.pages += 1;
        }
        fn draw_image(&mut self, _image: &RgbImage, placement: ImagePlacement) {
            self.placed.push((self.pages, placement));
        }
        fn page_count(&self) -> usize {
            self.pages
        }
    }

    fn config(width: f64, height: f64) -> ExportConfig {
        ExportConfig {
            page: PageSettings {
                width,
                height,
                unit: MeasureUnit::Point,
                margin: Edges::uniform(10.0),
                buffer: 10.0,
            },
            ..Default::default()
        }
    }

    fn run(config: ExportConfig, decks: &[&dyn Deck]) -> (Result<ExportSummary, CardError>, Sink, Renderer) {
        let mut sink = Sink::default();
        let mut renderer = Renderer::default();
        let result = PdfExporter::new(config).export(decks, &mut renderer, &mut sink, &mut NullReporter);
        (result, sink, renderer)
    }

    fn xy(sink: &Sink) -> Vec<(f64, f64)> {
        sink.placed.iter().map(|(_, p)| (p.x, p.y)).collect()
    }

    #[test]
    fn centered_rows_recenter_the_remainder() {
        let mut cfg = config(440.0, 1000.0);
        cfg.auto_horizontal_center = true;
        let cards = deck("poker", 100, 150, 5);
        let (result, sink, _) = run(cfg, &[&cards]);
        assert_eq!(result.unwrap(), ExportSummary { pages: 1, cards: 5 });
        assert_eq!(
            xy(&sink),
            vec![
                (60.0, 10.0),
                (170.0, 10.0),
                (280.0, 10.0),
                (115.0, 170.0),
                (225.0, 170.0)
            ]
        );
    }

    #[test]
    fn page_break_resets_to_top_margin() {
        // Rows at 10 and 170; a third at 330 would end at 480 > 390.
        let cards = deck("poker", 100, 150, 9);
        let (result, sink, _) = run(config(440.0, 400.0), &[&cards]);
        assert_eq!(result.unwrap().pages, 2);
        assert_eq!(sink.placed.iter().filter(|(page, _)| *page == 1).count(), 6);
        let (page, p) = sink.placed[6];
        assert_eq!(page, 2);
        assert_eq!((p.x, p.y), (10.0, 10.0));
    }

    #[test]
    fn second_layout_nests_once() {
        let a = deck("a", 100, 150, 2);
        let b = deck("b", 100, 200, 1);
        let c = deck("c", 100, 150, 1);
        let (result, sink, _) = run(config(440.0, 1000.0), &[&a, &b, &c]);
        result.unwrap();
        assert_eq!(
            xy(&sink),
            vec![(10.0, 10.0), (120.0, 10.0), (230.0, 10.0), (10.0, 220.0)]
        );
    }

    #[test]
    fn layouts_on_new_page() {
        let a = deck("a", 100, 150, 1);
        let b = deck("b", 100, 150, 1);
        let mut cfg = config(440.0, 1000.0);
        cfg.layouts_on_new_page = true;
        let (result, sink, _) = run(cfg, &[&a, &b]);
        assert_eq!(result.unwrap().pages, 2);
        assert_eq!(sink.placed[1].1.y, 10.0);
    }

    #[test]
    fn policy_change_starts_page() {
        let a = deck("a", 100, 150, 1);
        let mut b = deck("b", 100, 150, 1);
        b.layout.alignment = Some(RowExporter::Right);
        let (result, sink, _) = run(config(440.0, 1000.0), &[&a, &b]);
        assert_eq!(result.unwrap().pages, 2);
        assert_eq!(sink.placed[1].1.x, 330.0);
    }

    #[test]
    fn empty_decks_and_bad_indices_are_skipped() {
        let empty = deck("empty", 100, 150, 0);
        let cards = deck("poker", 100, 150, 2);
        let mut cfg = config(440.0, 1000.0);
        cfg.layout_indices = Some(vec![0, 7, 1]);
        let (result, _, renderer) = run(cfg, &[&empty, &cards]);
        assert_eq!(result.unwrap(), ExportSummary { pages: 1, cards: 2 });
        assert_eq!(renderer.calls, vec![(1, 0), (1, 1)]);
    }

    #[test]
    fn nothing_to_export_creates_no_page() {
        let empty = deck("empty", 100, 150, 0);
        let (result, sink, _) = run(config(440.0, 1000.0), &[&empty]);
        assert_eq!(result.unwrap(), ExportSummary::default());
        assert_eq!(sink.pages, 0);
    }

    #[test]
    fn oversized_layout_aborts_job() {
        let ok = deck("ok", 100, 150, 1);
        let huge = deck("huge", 1000, 150, 1);
        let (result, _, _) = run(config(440.0, 1000.0), &[&ok, &huge]);
        assert!(matches!(result, Err(CardError::LayoutTooLarge { ref layout, .. }) if layout == "huge"));
    }

    #[test]
    fn page_backs_reverse_within_rows() {
        let mut backs = deck("backs", 100, 150, 5);
        backs.layout.page_back = true;
        let mut cfg = config(440.0, 1000.0);
        cfg.auto_horizontal_center = true;
        let (_, _, renderer) = run(cfg, &[&backs]);
        let lines: Vec<usize> = renderer.calls.iter().map(|(_, line)| *line).collect();
        assert_eq!(lines, vec![2, 1, 0, 4, 3]);
    }

    #[test]
    fn page_backs_default_to_right_rows() {
        let exporter = PdfExporter::new(ExportConfig::default());
        let mut layout = LayoutSpec::default();
        assert_eq!(exporter.row_exporter(&layout), RowExporter::Left);
        layout.page_back = true;
        assert_eq!(exporter.row_exporter(&layout), RowExporter::Right);
    }

    #[test]
    fn render_failure_names_the_card() {
        let cards = deck("poker", 100, 150, 3);
        let mut sink = Sink::default();
        let mut renderer = Renderer {
            fail_on: Some(1),
            ..Default::default()
        };
        let err = PdfExporter::new(config(440.0, 1000.0))
            .export(&[&cards], &mut renderer, &mut sink, &mut NullReporter)
            .unwrap_err();
        assert!(matches!(err, CardError::Render { card: 1, .. }));
        assert_eq!(sink.placed.len(), 1);
    }

    struct CancelAfter {
        steps: usize,
        limit: usize,
    }

    impl ProgressReporter for CancelAfter {
        fn step(&mut self) {
            self.steps += 1;
        }
        fn is_cancelled(&self) -> bool {
            self.steps >= self.limit
        }
    }

    #[test]
    fn cancellation_stops_before_next_draw() {
        let cards = deck("poker", 100, 150, 5);
        let mut sink = Sink::default();
        let mut reporter = CancelAfter { steps: 0, limit: 2 };
        let result = PdfExporter::new(config(440.0, 1000.0)).export(
            &[&cards],
            &mut Renderer::default(),
            &mut sink,
            &mut reporter,
        );
        assert!(matches!(result, Err(CardError::Cancelled)));
        assert_eq!(sink.placed.len(), 2);
    }

    #[test]
    fn config_from_json() {
        let cfg = ExportConfig::from_json(
            r#"{"page": {"width": 210, "height": 297, "unit": "Millimeter", "buffer": 2},
                "layoutsOnNewPage": true, "layoutIndices": [1, 0]}"#,
        )
        .unwrap();
        assert_eq!(cfg.page.unit, MeasureUnit::Millimeter);
        assert_eq!(cfg.page.buffer, 2.0);
        assert!(cfg.layouts_on_new_page);
        assert!(!cfg.auto_horizontal_center);
        assert_eq!(cfg.layout_indices, Some(vec![1, 0]));
        // Unspecified margins keep their defaults.
        assert_eq!(cfg.page.margin, Edges::uniform(0.25));

        assert!(matches!(
            ExportConfig::from_json("{\"page\": 3}"),
            Err(CardError::Config { .. })
        ));
    }

    #[derive(Default)]
    struct Issues(Vec<String>);

    impl ProgressReporter for Issues {
        fn add_issue(&mut self, issue: &str) {
            self.0.push(issue.to_string());
        }
    }

    #[test]
    fn export_to_file_reports_write_failure() {
        let path = std::env::temp_dir()
            .join("cardmaker-export-missing")
            .join("nested")
            .join("sheet.pdf");
        let d = deck("poker", 100, 150, 2);
        let mut issues = Issues::default();
        let err = PdfExporter::new(config(440.0, 1000.0))
            .export_to_file(&[&d], &mut Renderer::default(), &path, &mut issues)
            .unwrap_err();
        assert!(matches!(err, CardError::Write { .. }));
        assert!(!path.exists());
        assert_eq!(issues.0.len(), 1);
    }

    #[test]
    fn export_to_file_writes_pdf() {
        let path = std::env::temp_dir().join("cardmaker-export-sheet.pdf");
        let d = deck("poker", 100, 150, 2);
        let summary = PdfExporter::new(config(440.0, 1000.0))
            .export_to_file(&[&d], &mut Renderer::default(), &path, &mut NullReporter)
            .unwrap();
        assert_eq!(summary, ExportSummary { pages: 1, cards: 2 });
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let _ = std::fs::remove_file(&path);
    }
}
