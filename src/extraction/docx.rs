use super::ooxml::OoxmlPackage;
use super::{ExtractionError, Extractor, Format};
use docx_rs::{
    DocumentChild, InsertChild, MoveToChild, Paragraph, ParagraphChild, Run, RunChild,
    StructuredDataTag, StructuredDataTagChild, Table, TableCellContent, TableChild, TableRowChild,
};

const MAIN_DOCUMENT_PART: &str = "word/document.xml";

/// Word document extraction via `docx-rs`.
///
/// Paragraphs become lines; table rows become lines with cells joined by ` | `.
/// Tracked insertions, moved-in runs and content controls count as document text;
/// tracked deletions do not.
pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let package = OoxmlPackage::open(bytes, Format::Docx)?;
        if !package.has_part(MAIN_DOCUMENT_PART) {
            return Err(ExtractionError::unsupported(
                Format::Docx,
                format!("package has no {MAIN_DOCUMENT_PART} part"),
            ));
        }

        let document = docx_rs::read_docx(bytes)
            .map_err(|error| ExtractionError::corrupt(Format::Docx, error))?;

        let lines = document_lines(&document.document.children);
        let text = lines.join("\n");
        tracing::debug!(
            lines = lines.len(),
            chars = text.chars().count(),
            "DOCX extracted"
        );
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "docx"
    }
}

fn document_lines(children: &[DocumentChild]) -> Vec<String> {
    let mut lines = Vec::new();
    for child in children {
        match child {
            DocumentChild::Paragraph(paragraph) => lines.push(paragraph_text(paragraph)),
            DocumentChild::Table(table) => push_table_rows(table, &mut lines),
            DocumentChild::StructuredDataTag(tag) => push_tag_lines(tag, &mut lines),
            _ => {}
        }
    }
    lines
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    push_paragraph_children(&paragraph.children, &mut text);
    text
}

fn push_paragraph_children(children: &[ParagraphChild], output: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run(run, output),
            ParagraphChild::Hyperlink(link) => push_paragraph_children(&link.children, output),
            ParagraphChild::Insert(insert) => {
                for child in &insert.children {
                    if let InsertChild::Run(run) = child {
                        push_run(run, output);
                    }
                }
            }
            ParagraphChild::MoveTo(move_to) => {
                for child in &move_to.children {
                    if let MoveToChild::Run(run) = child {
                        push_run(run, output);
                    }
                }
            }
            ParagraphChild::StructuredDataTag(tag) => {
                let mut lines = Vec::new();
                push_tag_lines(tag, &mut lines);
                output.push_str(&lines.join("\n"));
            }
            _ => {}
        }
    }
}

fn push_run(run: &Run, output: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(text) => output.push_str(&text.text),
            RunChild::Tab(_) => output.push('\t'),
            RunChild::Break(_) => output.push('\n'),
            _ => {}
        }
    }
}

/// Runs directly inside a content control share one line until a block child interrupts them.
fn push_tag_lines(tag: &StructuredDataTag, lines: &mut Vec<String>) {
    let mut inline = String::new();
    for child in &tag.children {
        if let StructuredDataTagChild::Run(run) = child {
            push_run(run, &mut inline);
            continue;
        }
        if !inline.is_empty() {
            lines.push(std::mem::take(&mut inline));
        }
        match child {
            StructuredDataTagChild::Paragraph(paragraph) => lines.push(paragraph_text(paragraph)),
            StructuredDataTagChild::Table(table) => push_table_rows(table, lines),
            StructuredDataTagChild::StructuredDataTag(nested) => push_tag_lines(nested, lines),
            _ => {}
        }
    }
    if !inline.is_empty() {
        lines.push(inline);
    }
}

fn push_table_rows(table: &Table, lines: &mut Vec<String>) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row;
        let mut cells = Vec::new();
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell;
            let mut cell_text = Vec::new();
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(paragraph) => {
                        cell_text.push(paragraph_text(paragraph))
                    }
                    TableCellContent::Table(nested) => push_table_rows(nested, &mut cell_text),
                    TableCellContent::StructuredDataTag(tag) => push_tag_lines(tag, &mut cell_text),
                    _ => {}
                }
            }
            cells.push(cell_text.join(" "));
        }
        lines.push(cells.join(" | "));
    }
}
