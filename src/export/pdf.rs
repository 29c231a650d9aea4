use chrono::Utc;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use super::ExportTable;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 6.0;
const BODY_SIZE: f32 = 8.0;
const HEADING_SIZE: f32 = 16.0;
const FOOTER_Y: f32 = 8.0;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Writes pages top to bottom, starting a new page (with the table header
/// repeated) when the cursor reaches the bottom margin.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    fonts: &'a Fonts,
    layer: PdfLayerReference,
    cursor: f32,
    page_number: usize,
}

impl<'a> PageWriter<'a> {
    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.fonts.bold } else { &self.fonts.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.cursor), font);
    }

    fn advance(&mut self, lines: f32) {
        self.cursor -= LINE_HEIGHT * lines;
    }

    fn has_room(&self) -> bool {
        self.cursor - LINE_HEIGHT > MARGIN + FOOTER_Y
    }

    fn footer(&self) {
        let label = format!("Page {}", self.page_number);
        self.layer
            .use_text(label, BODY_SIZE, Mm(PAGE_WIDTH / 2.0 - 6.0), Mm(FOOTER_Y), &self.fonts.regular);
    }

    fn new_page(&mut self) {
        self.footer();
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = PAGE_HEIGHT - MARGIN;
        self.page_number += 1;
    }

    fn row(&mut self, cells: &[String], offsets: &[f32], widths: &[usize], bold: bool) {
        for ((cell, x), width) in cells.iter().zip(offsets).zip(widths) {
            self.text(&truncate(cell, *width), BODY_SIZE, *x, bold);
        }
        self.advance(1.0);
    }
}

/// A4 portrait report: header, summary table, then the detail table.
pub fn render(table: &ExportTable) -> Result<Vec<u8>, printpdf::Error> {
    let (doc, page, layer) = PdfDocument::new(&table.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
    };

    let mut writer = PageWriter {
        doc: &doc,
        fonts: &fonts,
        layer: doc.get_page(page).get_layer(layer),
        cursor: PAGE_HEIGHT - MARGIN,
        page_number: 1,
    };

    writer.text(&table.title, HEADING_SIZE, MARGIN, true);
    writer.advance(1.5);
    let generated = format!("Generated {}", Utc::now().format("%Y-%m-%d %H:%M UTC"));
    writer.text(&generated, BODY_SIZE, MARGIN, false);
    writer.advance(2.0);

    for (label, value) in &table.summary {
        if !writer.has_room() {
            writer.new_page();
        }
        writer.text(label, BODY_SIZE + 1.0, MARGIN, true);
        writer.text(&value.to_string(), BODY_SIZE + 1.0, MARGIN + 50.0, false);
        writer.advance(1.0);
    }
    writer.advance(1.0);

    let (offsets, widths) = layout(table);
    writer.row(&table.columns, &offsets, &widths, true);
    for record in &table.rows {
        if !writer.has_room() {
            writer.new_page();
            writer.row(&table.columns, &offsets, &widths, true);
        }
        let cells: Vec<String> = record.iter().map(|v| v.to_string()).collect();
        writer.row(&cells, &offsets, &widths, false);
    }
    if table.rows.is_empty() {
        writer.text("No records for this period.", BODY_SIZE, MARGIN, false);
    }
    writer.footer();

    doc.save_to_bytes()
}

/// Column x-offsets in mm and per-column character budgets, sharing the
/// printable width in proportion to each column's longest value.
fn layout(table: &ExportTable) -> (Vec<f32>, Vec<usize>) {
    let count = table.columns.len().max(1);
    let lengths: Vec<usize> = (0..count)
        .map(|col| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|v| v.to_string().chars().count())
                .chain(table.columns.get(col).map(|c| c.chars().count()))
                .max()
                .unwrap_or(4)
                .clamp(4, 30)
        })
        .collect();

    let total: usize = lengths.iter().sum();
    let printable = PAGE_WIDTH - 2.0 * MARGIN;
    // Helvetica at 8pt averages roughly 1.6mm per character
    let chars_per_mm = 1.0 / 1.6;

    let mut offsets = Vec::with_capacity(count);
    let mut widths = Vec::with_capacity(count);
    let mut x = MARGIN;
    for len in lengths {
        let share = printable * len as f32 / total as f32;
        offsets.push(x);
        widths.push(((share * chars_per_mm) as usize).max(3));
        x += share;
    }
    (offsets, widths)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}~", kept)
    }
}
