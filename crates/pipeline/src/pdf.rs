//! PDF rendering for report artifacts
//!
//! Renders the markdown report into a plain-text PDF with lopdf. The PDF
//! is a readable print artifact; the markdown file remains the canonical
//! report content.

use entrust_common::errors::{AppError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const LINE_HEIGHT: i64 = 14;
const BODY_FONT_SIZE: i64 = 10;
const HEADING_FONT_SIZE: i64 = 14;
const MAX_LINE_CHARS: usize = 92;

struct Line {
    text: String,
    heading: bool,
}

/// Render markdown content as a paginated PDF document
pub fn render_pdf(markdown: &str) -> Result<Vec<u8>> {
    let lines = layout_lines(markdown);
    let lines_per_page = ((PAGE_HEIGHT - 2 * MARGIN) / LINE_HEIGHT) as usize;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });

    let mut page_ids: Vec<Object> = Vec::new();
    for page_lines in lines.chunks(lines_per_page.max(1)) {
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("TL", vec![LINE_HEIGHT.into()]),
            Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()]),
        ];
        for line in page_lines {
            let (font, size) = if line.heading {
                ("F2", HEADING_FONT_SIZE)
            } else {
                ("F1", BODY_FONT_SIZE)
            };
            ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
            ops.push(Operation::new(
                "Tj",
                vec![Object::string_literal(line.text.as_str())],
            ));
            ops.push(Operation::new("T*", vec![]));
        }
        ops.push(Operation::new("ET", vec![]));

        let content = Content { operations: ops };
        let encoded = content.encode().map_err(|e| AppError::Internal {
            message: format!("PDF content encoding failed: {}", e),
        })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id.into());
    }

    let page_count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => page_count,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id, "F2" => bold_font_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(|e| AppError::Internal {
        message: format!("PDF serialization failed: {}", e),
    })?;
    Ok(buffer)
}

/// Flatten markdown into wrapped print lines, stripping inline markers
fn layout_lines(markdown: &str) -> Vec<Line> {
    let mut lines = Vec::new();

    for raw in markdown.lines() {
        let trimmed = raw.trim_end();
        if trimmed.trim().is_empty() {
            lines.push(Line {
                text: String::new(),
                heading: false,
            });
            continue;
        }

        let heading = trimmed.starts_with('#');
        let text = strip_inline_markup(trimmed);
        for wrapped in wrap(&text, MAX_LINE_CHARS) {
            lines.push(Line {
                text: wrapped,
                heading,
            });
        }
    }

    // Trailing blank lines only waste pages
    while lines.last().is_some_and(|l| l.text.is_empty()) {
        lines.pop();
    }
    lines
}

fn strip_inline_markup(line: &str) -> String {
    let line = line.trim_start_matches('#').trim_start();
    let line = line.replace("**", "").replace('`', "");
    let line = line.strip_prefix("> ").unwrap_or(&line).to_string();
    // Type1 Helvetica is latin-1 only
    line.chars()
        .map(|c| if c.is_ascii() || (c as u32) < 256 { c } else { '?' })
        .collect()
}

fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > max_chars {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        out.push(current);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_produces_valid_pdf_header() {
        let pdf = render_pdf("# Title\n\nSome body text.").unwrap();
        assert!(pdf.starts_with(b"%PDF-1.5"));
        assert!(pdf.len() > 100);
    }

    #[test]
    fn test_long_report_paginates() {
        let body = "A line of report body text that carries some length.\n".repeat(300);
        let markdown = format!("# Title\n\n{}", body);
        let pdf = render_pdf(&markdown).unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn test_wrap_respects_limit() {
        let text = "word ".repeat(50);
        for line in wrap(&text, 20) {
            assert!(line.len() <= 20);
        }
    }

    #[test]
    fn test_markup_stripped() {
        assert_eq!(strip_inline_markup("## **Bold** `code`"), "Bold code");
        assert_eq!(strip_inline_markup("> quoted"), "quoted");
    }

    #[test]
    fn test_non_latin_replaced() {
        assert_eq!(strip_inline_markup("data 品質"), "data ??");
    }
}
