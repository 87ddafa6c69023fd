//! services/api/src/adapters/pdf.rs
//!
//! Renders completed research reports as Letter-sized PDFs using `printpdf`'s
//! builtin Helvetica family. The report is first flattened into styled text
//! blocks (a light reading of the markdown the model writes), then flowed onto
//! pages with word wrapping. Every section and the source list start on a new
//! page; each page gets a footer with its number.
//!
//! The document id and dates come from the report, so the same report always
//! renders to the same bytes.

use libre_research_core::domain::ResearchReport;
use libre_research_core::ports::{PortError, PortResult, ReportRenderingService};
use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, OffsetDateTime, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use regex::Regex;
use std::sync::LazyLock;
use tracing::error;

const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;
const MARGIN_MM: f32 = 21.6;
const FOOTER_Y_MM: f32 = 9.0;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;
const MAX_URL_CHARS: usize = 80;
const MAX_SNIPPET_CHARS: usize = 300;

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").expect("link pattern is valid"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s").expect("numbered list pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Title,
    Heading1,
    Heading2,
    Heading3,
    Body,
    Quote,
    Caption,
}

#[derive(Clone, Copy)]
enum Face {
    Regular,
    Bold,
    Oblique,
}

impl Style {
    /// (face, size in points, space before in mm)
    fn metrics(self) -> (Face, f32, f32) {
        match self {
            Style::Title => (Face::Bold, 20.0, 4.0),
            Style::Heading1 => (Face::Bold, 16.0, 5.0),
            Style::Heading2 => (Face::Bold, 13.0, 4.0),
            Style::Heading3 => (Face::Bold, 12.0, 3.0),
            Style::Body => (Face::Regular, 11.0, 2.0),
            Style::Quote => (Face::Oblique, 11.0, 2.0),
            Style::Caption => (Face::Oblique, 9.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Block {
    text: String,
    style: Style,
    indent_mm: f32,
    page_break: bool,
}

impl Block {
    fn new(style: Style, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style,
            indent_mm: 0.0,
            page_break: false,
        }
    }

    fn indented(mut self, indent_mm: f32) -> Self {
        self.indent_mm = indent_mm;
        self
    }

    fn on_new_page(mut self) -> Self {
        self.page_break = true;
        self
    }
}

/// Renders reports to PDF bytes.
#[derive(Clone, Default)]
pub struct PdfReportRenderer;

impl PdfReportRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl ReportRenderingService for PdfReportRenderer {
    fn render_report(&self, report: &ResearchReport) -> PortResult<Vec<u8>> {
        let blocks = report_blocks(report);
        let stamp = pdf_date(report.created_at)?;
        let mut writer = PageWriter::new(&sanitize(&report.topic), &report.id.simple().to_string(), stamp)
            .map_err(pdf_error)?;
        for block in &blocks {
            writer.write_block(block);
        }
        writer.finish().map_err(pdf_error)
    }
}

fn pdf_date(at: DateTime<Utc>) -> PortResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(at.timestamp())
        .map_err(|e| PortError::Unexpected(format!("Report date cannot be written to a PDF: {}", e)))
}

fn pdf_error(e: printpdf::Error) -> PortError {
    error!("Failed to render PDF: {:?}", e);
    PortError::Unexpected(format!("Failed to generate PDF: {}", e))
}

//=========================================================================================
// Report -> Blocks
//=========================================================================================

fn report_blocks(report: &ResearchReport) -> Vec<Block> {
    let mut blocks = vec![
        Block::new(Style::Title, sanitize(&report.topic)),
        Block::new(
            Style::Caption,
            format!("Researched on {}", report.created_at.format("%B %d, %Y")),
        ),
    ];

    match report.summary.as_deref() {
        Some(summary) if !summary.trim().is_empty() => blocks.extend(markdown_blocks(summary)),
        _ => blocks.push(Block::new(Style::Body, "No summary available")),
    }

    for section in &report.sections {
        let title = if section.title.trim().is_empty() {
            "Untitled Section"
        } else {
            section.title.as_str()
        };
        blocks.push(Block::new(Style::Heading1, sanitize(title)).on_new_page());
        if section.content.trim().is_empty() {
            blocks.push(Block::new(Style::Body, "No content available"));
        } else {
            blocks.extend(markdown_blocks(&section.content));
        }
    }

    blocks.push(Block::new(Style::Heading1, "Sources").on_new_page());
    if report.sources.is_empty() {
        blocks.push(Block::new(Style::Body, "No sources available"));
    }
    for (i, source) in report.sources.iter().enumerate() {
        let title = if source.title.trim().is_empty() {
            format!("Source {}", i + 1)
        } else {
            sanitize(&source.title)
        };
        blocks.push(Block::new(Style::Heading2, format!("{}. {}", i + 1, title)));

        let url = source
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .map(|u| truncate(&sanitize(u), MAX_URL_CHARS))
            .unwrap_or_else(|| "No URL provided".to_string());
        blocks.push(Block::new(Style::Caption, format!("URL: {}", url)));

        if let Some(snippet) = source.snippet.as_deref().filter(|s| !s.trim().is_empty()) {
            let snippet = truncate(&inline(snippet), MAX_SNIPPET_CHARS);
            blocks.push(Block::new(Style::Body, format!("Description: {}", snippet)));
        }
    }

    blocks
}

/// Splits markdown into paragraphs and maps the constructs the model uses
/// (headings, bullet and numbered lists, quotes, tables) onto block styles.
fn markdown_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();

    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if let Some(rest) = para.strip_prefix("### ") {
            blocks.push(Block::new(Style::Heading3, inline(rest)));
        } else if let Some(rest) = para.strip_prefix("## ") {
            blocks.push(Block::new(Style::Heading2, inline(rest)));
        } else if let Some(rest) = para.strip_prefix("# ") {
            blocks.push(Block::new(Style::Heading1, inline(rest)));
        } else if para.starts_with('>') {
            let quote = para
                .lines()
                .map(|l| l.trim_start_matches('>').trim())
                .collect::<Vec<_>>()
                .join(" ");
            blocks.push(Block::new(Style::Quote, inline(&quote)).indented(10.0));
        } else if para.contains('|') && para.contains("---") {
            for row in para.lines().map(str::trim).filter(|r| !is_table_rule(r)) {
                let cells: Vec<&str> = row
                    .trim_matches('|')
                    .split('|')
                    .map(str::trim)
                    .collect();
                blocks.push(Block::new(Style::Body, inline(&cells.join("  |  "))));
            }
        } else if is_list_item(para) {
            for line in para.lines().map(str::trim).filter(|l| !l.is_empty()) {
                match line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
                    Some(item) => {
                        blocks.push(Block::new(Style::Body, format!("- {}", inline(item))).indented(6.0))
                    }
                    None if NUMBERED.is_match(line) => {
                        blocks.push(Block::new(Style::Body, inline(line)).indented(6.0))
                    }
                    None => blocks.push(Block::new(Style::Body, inline(line))),
                }
            }
        } else {
            let joined = para.lines().map(str::trim).collect::<Vec<_>>().join(" ");
            blocks.push(Block::new(Style::Body, inline(&joined)));
        }
    }

    blocks
}

fn is_list_item(para: &str) -> bool {
    para.starts_with("- ") || para.starts_with("* ") || NUMBERED.is_match(para)
}

fn is_table_rule(row: &str) -> bool {
    !row.is_empty() && row.chars().all(|c| matches!(c, '|' | '-' | ':' | '+' | ' '))
}

/// Drops inline markdown markers and spells links out as `text (url)`.
fn inline(text: &str) -> String {
    let linked = LINK.replace_all(text, "$1 ($2)");
    let stripped = linked.replace("**", "").replace("__", "").replace('`', "");
    sanitize(&stripped)
}

/// Builtin PDF fonts only cover Latin-1; fold common typography to ASCII and
/// replace anything else with `?`.
fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2022}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\t' | '\n' | '\r' => out.push(' '),
            c if c.is_ascii_control() => {}
            c if c.is_ascii() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Greedy word wrap; words longer than a line are split.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        if current.is_empty() {
            current = word;
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(&word);
        } else {
            lines.push(std::mem::replace(&mut current, word));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

//=========================================================================================
// Blocks -> Pages
//=========================================================================================

struct PageWriter {
    doc: PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
    pages: Vec<PdfLayerReference>,
    /// Baseline of the next line, measured from the bottom edge.
    cursor_mm: f32,
    page_has_content: bool,
}

impl PageWriter {
    fn new(title: &str, document_id: &str, stamp: OffsetDateTime) -> Result<Self, printpdf::Error> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let doc = doc
            .with_document_id(document_id.to_string())
            .with_creation_date(stamp)
            .with_mod_date(stamp)
            .with_metadata_date(stamp);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let oblique = doc.add_builtin_font(BuiltinFont::HelveticaOblique)?;
        let first = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            regular,
            bold,
            oblique,
            pages: vec![first],
            cursor_mm: PAGE_HEIGHT_MM - MARGIN_MM,
            page_has_content: false,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        self.pages.push(self.doc.get_page(page).get_layer(layer));
        self.cursor_mm = PAGE_HEIGHT_MM - MARGIN_MM;
        self.page_has_content = false;
    }

    fn font(&self, face: Face) -> &IndirectFontRef {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Oblique => &self.oblique,
        }
    }

    fn write_block(&mut self, block: &Block) {
        if block.page_break && self.page_has_content {
            self.new_page();
        }

        let (face, size_pt, space_before_mm) = block.style.metrics();
        let line_height_mm = size_pt * 1.4 * PT_TO_MM;
        let usable_mm = PAGE_WIDTH_MM - 2.0 * MARGIN_MM - block.indent_mm;
        let max_chars = (usable_mm / (size_pt * AVG_GLYPH_EM * PT_TO_MM)) as usize;

        if self.page_has_content {
            self.cursor_mm -= space_before_mm;
        }
        for line in wrap(&block.text, max_chars) {
            if self.cursor_mm - line_height_mm < MARGIN_MM {
                self.new_page();
            }
            self.cursor_mm -= line_height_mm;
            let layer = &self.pages[self.pages.len() - 1];
            layer.use_text(
                line,
                size_pt,
                Mm(MARGIN_MM + block.indent_mm),
                Mm(self.cursor_mm),
                self.font(face),
            );
            self.page_has_content = true;
        }
    }

    fn finish(self) -> Result<Vec<u8>, printpdf::Error> {
        let total = self.pages.len();
        for (i, layer) in self.pages.iter().enumerate() {
            layer.use_text(
                "Generated by LibreResearch",
                8.0,
                Mm(MARGIN_MM),
                Mm(FOOTER_Y_MM),
                &self.oblique,
            );
            layer.use_text(
                format!("Page {} of {}", i + 1, total),
                8.0,
                Mm(PAGE_WIDTH_MM - MARGIN_MM - 25.0),
                Mm(FOOTER_Y_MM),
                &self.regular,
            );
        }
        self.doc.save_to_bytes()
    }
}
