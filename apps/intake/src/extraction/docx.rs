use docx_rs::{DocumentChild, ParagraphChild, RunChild};

use super::{DocumentFormat, ExtractionError};

/// Extracts top-level body paragraphs in document order, joined by `\n`.
///
/// Tables are skipped, and so are paragraphs inside drawings such as text
/// boxes. Hyperlinked runs count as paragraph text.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| ExtractionError::malformed(DocumentFormat::Docx, e))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(p) => {
                let mut text = String::new();
                push_paragraph_text(&p.children, &mut text);
                Some(text)
            }
            // Tables are skipped
            _ => None,
        })
        .collect();

    tracing::debug!(paragraphs = paragraphs.len(), "Extracted DOCX text");
    Ok(paragraphs.join("\n"))
}

fn push_paragraph_text(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for child in &run.children {
                    match child {
                        RunChild::Text(t) => out.push_str(&t.text),
                        RunChild::Tab(_) => out.push('\t'),
                        RunChild::Break(_) => out.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_paragraph_text(&link.children, out),
            _ => {}
        }
    }
}
