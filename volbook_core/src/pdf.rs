//! # PDF Report Module
//!
//! Generates the measurement-book PDF report using Typst.
//!
//! ## Architecture
//!
//! - The Typst template is embedded as a string constant
//! - Data is injected via string formatting before compilation
//! - Output is raw PDF bytes (`Vec<u8>`)
//!
//! The report mirrors the paper measurement book: a header with the work
//! detail and type, one table row per measurement (raw field strings plus the
//! two computed volumes), and a grand total summed from un-rounded values.
//!
//! ## Example
//!
//! ```rust,no_run
//! use volbook_core::book::MeasurementBook;
//! use volbook_core::pdf::render_book_pdf;
//!
//! let mut book = MeasurementBook::new("Canal desilting\nSector 7", "Crate");
//! let id = book.add_row();
//! let row = book.row_mut(&id).unwrap();
//! row.length = "10".to_string();
//! row.height_readings = "5+5+5".to_string();
//! row.top_readings = "4+4+4".to_string();
//! row.bed_width = "6".to_string();
//! row.recompute();
//!
//! let pdf_bytes = render_book_pdf(&book).unwrap();
//! std::fs::write("measurement_book.pdf", pdf_bytes).unwrap();
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::syntax::{FileId, Source};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};
use typst_pdf::PdfOptions;

use crate::book::MeasurementBook;
use crate::engine::format_for_display;
use crate::errors::{BookError, BookResult};

// ============================================================================
// Typst World Implementation
// ============================================================================

/// Bundled fonts, decoded once per process.
static FONTS: Lazy<Vec<Font>> = Lazy::new(|| {
    let mut fonts = Vec::new();
    for font_bytes in typst_assets::fonts() {
        let buffer = Bytes::new(font_bytes.to_vec());
        for font in Font::iter(buffer) {
            fonts.push(font);
        }
    }
    fonts
});

/// A minimal Typst world for compiling documents without external files.
struct PdfWorld {
    /// The main source document
    main: Source,
    /// Font book
    book: LazyHash<FontBook>,
    /// Available fonts
    fonts: Vec<Font>,
    /// Library (standard functions)
    library: LazyHash<Library>,
}

impl PdfWorld {
    fn new(source: String) -> Self {
        let fonts = FONTS.clone();
        let book = FontBook::from_fonts(&fonts);

        PdfWorld {
            main: Source::detached(source),
            book: LazyHash::new(book),
            fonts,
            library: LazyHash::new(Library::default()),
        }
    }
}

impl World for PdfWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    fn main(&self) -> FileId {
        self.main.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main.id() {
            Ok(self.main.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        let now = Utc::now();
        Datetime::from_ymd(
            now.format("%Y").to_string().parse().ok()?,
            now.format("%m").to_string().parse().ok()?,
            now.format("%d").to_string().parse().ok()?,
        )
    }
}

// ============================================================================
// PDF Template
// ============================================================================

/// Typst template for the measurement book report
const BOOK_TEMPLATE: &str = r##"
#set page(
  paper: "us-letter",
  margin: (top: 1in, bottom: 1in, left: 0.75in, right: 0.75in),
  header: align(right)[
    #text(size: 9pt, fill: gray)[Volume Calculator]
  ],
  footer: context [
    #line(length: 100%, stroke: 0.5pt + gray)
    #v(4pt)
    #grid(
      columns: (1fr, 1fr, 1fr),
      align(left)[#text(size: 9pt)[Measurement Book]],
      align(center)[#text(size: 9pt)[Page #counter(page).display()]],
      align(right)[#text(size: 9pt)[{{DATE}}]],
    )
  ]
)

#set text(size: 10pt)

// Title Block
#align(center)[
  #block(width: 100%, fill: rgb("#f0f0f0"), inset: 12pt, radius: 4pt)[
    #text(size: 18pt, weight: "bold")[MEASUREMENT BOOK]
  ]
]

#v(12pt)

#table(
  columns: (auto, 1fr),
  stroke: none,
  row-gutter: 4pt,
{{HEADER_ROWS}}
)

#v(8pt)
#line(length: 100%, stroke: 0.5pt)
#v(8pt)

#table(
  columns: (auto, 1fr, 1.2fr, 1.2fr, 1fr, auto, auto),
  inset: 6pt,
  stroke: 0.5pt,
  align: (center, left, left, left, left, right, right),
  table.header(
    [*S.No*], [*Length*], [*Height*], [*Top*], [*Bed*],
    [*Vol (ft#super[3])*], [*Vol (m#super[3])*],
  ),
{{TABLE_ROWS}}
)

#v(12pt)

#text(size: 12pt, weight: "bold")[
  Grand Total: {{TOTAL_FT3}} ft#super[3] #h(16pt) {{TOTAL_M3}} m#super[3]
]

#v(24pt)
#line(length: 100%, stroke: 0.5pt)
#v(8pt)

#text(size: 9pt, fill: gray)[
  Generated by Volbook \
  Measurements should be verified against the site record.
]
"##;

// ============================================================================
// PDF Rendering Functions
// ============================================================================

/// Render a measurement book to PDF.
///
/// # Returns
///
/// * `Ok(Vec<u8>)` - PDF file as bytes
/// * `Err(BookError::EmptyBook)` - The book has no rows to export
/// * `Err(BookError::ReportFailed)` - Template compilation or rendering failed
pub fn render_book_pdf(book: &MeasurementBook) -> BookResult<Vec<u8>> {
    if book.rows.is_empty() {
        return Err(BookError::EmptyBook);
    }

    let totals = book.grand_totals();

    let source = BOOK_TEMPLATE
        .replace("{{DATE}}", &Utc::now().format("%Y-%m-%d").to_string())
        .replace("{{HEADER_ROWS}}", &build_header_rows(book))
        .replace("{{TABLE_ROWS}}", &build_table_rows(book))
        .replace(
            "{{TOTAL_FT3}}",
            &format!("{:.2}", format_for_display(totals.ft3.value(), 2)),
        )
        .replace(
            "{{TOTAL_M3}}",
            &format!("{:.2}", format_for_display(totals.m3.value(), 2)),
        );

    // Compile the Typst document
    let world = PdfWorld::new(source);

    let warned = typst::compile(&world);

    let document = warned.output.map_err(|errors| {
        let error_msgs: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
        BookError::report_failed(format!(
            "Typst compilation failed: {}",
            error_msgs.join("; ")
        ))
    })?;

    // Render to PDF
    let pdf_bytes = typst_pdf::pdf(&document, &PdfOptions::default()).map_err(|errors| {
        let error_msgs: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
        BookError::report_failed(format!("PDF rendering failed: {}", error_msgs.join("; ")))
    })?;

    Ok(pdf_bytes)
}

/// Render a book and write it to `dir`, returning the written path.
///
/// This is the save-to-file delivery every export path ends in.
pub fn export_book_pdf(book: &MeasurementBook, dir: &Path) -> BookResult<PathBuf> {
    let pdf_bytes = render_book_pdf(book)?;
    let path = dir.join(report_file_name(book));
    std::fs::write(&path, pdf_bytes)
        .map_err(|e| BookError::file_error("write report", path.display().to_string(), e.to_string()))?;
    Ok(path)
}

/// Build the report file name from the book's work detail.
///
/// `Volume_Calculation_<sanitized>.pdf`, where `<sanitized>` is the first
/// non-blank line of the work detail (fallback "Report") with
/// non-alphanumerics replaced by `_`, truncated to 30 characters.
pub fn report_file_name(book: &MeasurementBook) -> String {
    let first_line = book
        .meta
        .work_info
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("Report");

    let sanitized: String = first_line
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(30)
        .collect();

    format!("Volume_Calculation_{}.pdf", sanitized)
}

/// Build the work detail / work type header rows
fn build_header_rows(book: &MeasurementBook) -> String {
    let mut rows = Vec::new();

    let mut detail_lines = book.meta.work_info.lines().filter(|l| !l.trim().is_empty());
    if let Some(first) = detail_lines.next() {
        let mut detail = escape_typst(first);
        for line in detail_lines {
            detail.push_str(" \\ ");
            detail.push_str(&escape_typst(line));
        }
        rows.push(format!("  [Work Detail:], [{}],", detail));
    }

    if !book.meta.work_type.is_empty() {
        rows.push(format!(
            "  [Work Type:], [{}],",
            escape_typst(&book.meta.work_type)
        ));
    }

    rows.push(format!(
        "  [Date:], [{}],",
        Utc::now().format("%Y-%m-%d")
    ));

    rows.join("\n")
}

/// Build the measurement table rows
fn build_table_rows(book: &MeasurementBook) -> String {
    book.rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            format!(
                "  [{}], [{}], [{}], [{}], [{}], [{:.2}], [{:.2}],",
                i + 1,
                escape_typst(&row.length),
                escape_typst(&row.height_readings),
                escape_typst(&row.top_readings),
                escape_typst(&row.bed_width),
                row.vol_ft3,
                row.vol_m3
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape special Typst characters in user-provided text
fn escape_typst(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '*' => "\\*".to_string(),
            '_' => "\\_".to_string(),
            '#' => "\\#".to_string(),
            '$' => "\\$".to_string(),
            '@' => "\\@".to_string(),
            '<' => "\\<".to_string(),
            '>' => "\\>".to_string(),
            '[' => "\\[".to_string(),
            ']' => "\\]".to_string(),
            '\\' => "\\\\".to_string(),
            '`' => "\\`".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated_book() -> MeasurementBook {
        let mut book = MeasurementBook::new("Canal desilting\nSector 7", "Crate");
        let id = book.add_row();
        let row = book.row_mut(&id).unwrap();
        row.length = "10".to_string();
        row.height_readings = "5+5+5".to_string();
        row.top_readings = "4+4+4".to_string();
        row.bed_width = "6".to_string();
        row.recompute();
        book
    }

    #[test]
    fn test_empty_book_refuses_export() {
        let book = MeasurementBook::default();
        assert_eq!(render_book_pdf(&book), Err(BookError::EmptyBook));
    }

    #[test]
    fn test_report_file_name_sanitization() {
        let book = MeasurementBook::new("Canal desilting, phase 2\nSector 7", "Crate");
        assert_eq!(
            report_file_name(&book),
            "Volume_Calculation_Canal_desilting__phase_2.pdf"
        );
    }

    #[test]
    fn test_report_file_name_fallback() {
        let book = MeasurementBook::default();
        assert_eq!(report_file_name(&book), "Volume_Calculation_Report.pdf");
    }

    #[test]
    fn test_report_file_name_truncates() {
        let book = MeasurementBook::new("x".repeat(80), "");
        let name = report_file_name(&book);
        assert_eq!(name.len(), "Volume_Calculation_.pdf".len() + 30);
    }

    #[test]
    fn test_table_rows_escape_user_text() {
        let mut book = populated_book();
        book.rows[0].length = "5 [approx]".to_string();
        let rows = build_table_rows(&book);
        assert!(rows.contains("\\[approx\\]"));
    }

    #[test]
    fn test_pdf_generation() {
        let book = populated_book();
        let pdf = render_book_pdf(&book);

        // Should succeed
        assert!(pdf.is_ok(), "PDF generation failed: {:?}", pdf.err());

        let pdf_bytes = pdf.unwrap();
        // PDF should start with %PDF
        assert!(pdf_bytes.starts_with(b"%PDF"), "Output is not a valid PDF");
        // Should be a reasonable size (at least 1KB)
        assert!(pdf_bytes.len() > 1000, "PDF seems too small");
    }
}
