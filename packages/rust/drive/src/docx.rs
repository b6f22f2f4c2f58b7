//! Plain-text extraction from `.docx` bytes.
//!
//! Emits one line per top-level paragraph, empty paragraphs included, so the
//! first line of the output is the first paragraph of the document.

use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild};

use drivedocs_shared::{DriveDocsError, Result};

/// Decode a `.docx` file into newline-separated paragraph text.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| DriveDocsError::parse(format!("failed to parse DOCX: {e}")))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(p) => Some(paragraph_text(p)),
            _ => None,
        })
        .collect();

    Ok(paragraphs.join("\n"))
}

fn paragraph_text(p: &Paragraph) -> String {
    let mut text = String::new();
    for child in &p.children {
        push_child_text(child, &mut text);
    }
    text
}

fn push_child_text(child: &ParagraphChild, text: &mut String) {
    match child {
        ParagraphChild::Run(r) => {
            for run_child in &r.children {
                match run_child {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
        // Link text counts; the URL line is often a hyperlink.
        ParagraphChild::Hyperlink(h) => {
            for inner in &h.children {
                push_child_text(inner, text);
            }
        }
        _ => {}
    }
}
