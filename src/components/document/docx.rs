use crate::error::{extraction_error, AppResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// Part of the package holding the main document body
const DOCUMENT_PART: &str = "word/document.xml";

/// Extract the text of every body paragraph of a DOCX file, in document
/// order, with no separator between paragraphs.
pub fn extract_docx_text(path: &Path) -> AppResult<String> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| extraction_error(&format!("Failed to open DOCX as ZIP: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| extraction_error(&format!("Missing {DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)?;

    Ok(body_paragraphs(&xml)?.concat())
}

/// Collect the text of each `w:p` that sits directly under `w:body`.
///
/// Paragraphs inside tables or text boxes are skipped. Tabs and breaks
/// inside a run become `\t` and `\n`.
fn body_paragraphs(xml: &str) -> AppResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut paragraph_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"w:p" => {
                        paragraph_depth += 1;
                        let in_body = stack.last().map(Vec::as_slice) == Some(&b"w:body"[..]);
                        if paragraph_depth == 1 && in_body {
                            current = Some(String::new());
                        }
                    }
                    b"w:t" => in_text = true,
                    _ => {}
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                // w:tab also appears as a tab stop inside w:pPr, only runs count
                let in_run = stack.last().map(Vec::as_slice) == Some(&b"w:r"[..]);
                if paragraph_depth == 1 && in_run {
                    if let Some(text) = current.as_mut() {
                        match e.name().as_ref() {
                            b"w:tab" => text.push('\t'),
                            b"w:br" | b"w:cr" => text.push('\n'),
                            _ => {}
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if in_text && paragraph_depth == 1 {
                    if let Some(text) = current.as_mut() {
                        let unescaped = e.unescape().map_err(|e| {
                            extraction_error(&format!("Bad text in {DOCUMENT_PART}: {e}"))
                        })?;
                        text.push_str(&unescaped);
                    }
                }
            }
            Ok(Event::End(e)) => {
                stack.pop();
                match e.name().as_ref() {
                    b"w:t" => in_text = false,
                    b"w:p" => {
                        if paragraph_depth == 1 {
                            if let Some(text) = current.take() {
                                paragraphs.push(text);
                            }
                        }
                        paragraph_depth = paragraph_depth.saturating_sub(1);
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(extraction_error(&format!(
                    "Malformed {} at position {}: {}",
                    DOCUMENT_PART,
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn document_xml(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>{body}<w:sectPr/></w:body></w:document>"#
        )
    }

    const CONTENT_TYPES: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#;

    fn write_docx(path: &Path, body: &str) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(CONTENT_TYPES).unwrap();
        zip.start_file(DOCUMENT_PART, options).unwrap();
        zip.write_all(document_xml(body).as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_paragraphs_concatenated_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("invite.docx");
        write_docx(
            &path,
            concat!(
                r#"<w:p><w:r><w:t>Let's meet on</w:t></w:r></w:p>"#,
                r#"<w:p><w:r><w:t xml:space="preserve"> 2025-03-14 </w:t></w:r>"#,
                r#"<w:r><w:t>15:00</w:t></w:r></w:p>"#,
            ),
        );

        let text = extract_docx_text(&path).unwrap();
        assert_eq!(text, "Let's meet on 2025-03-14 15:00");
    }

    #[test]
    fn test_paragraph_boundaries_are_lost() {
        let xml = document_xml(
            "<w:p><w:r><w:t>first</w:t></w:r></w:p>\
             <w:p/>\
             <w:p><w:r><w:t>second</w:t></w:r></w:p>",
        );
        let paragraphs = body_paragraphs(&xml).unwrap();
        assert_eq!(paragraphs, vec!["first".to_string(), "second".to_string()]);
        assert_eq!(paragraphs.concat(), "firstsecond");
    }

    #[test]
    fn test_tables_are_not_body_paragraphs() {
        let xml = document_xml(
            "<w:p><w:r><w:t>before</w:t></w:r></w:p>\
             <w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
             <w:p><w:r><w:t>after</w:t></w:r></w:p>",
        );
        assert_eq!(body_paragraphs(&xml).unwrap().concat(), "beforeafter");
    }

    #[test]
    fn test_tabs_breaks_and_entities() {
        let xml = document_xml(
            "<w:p><w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"720\"/></w:tabs></w:pPr>\
             <w:r><w:t>A &amp; B</w:t><w:tab/><w:t>C</w:t><w:br/><w:t>D</w:t></w:r></w:p>",
        );
        assert_eq!(body_paragraphs(&xml).unwrap().concat(), "A & B\tC\nD");
    }

    #[test]
    fn test_invalid_zip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.docx");
        std::fs::write(&path, b"This is not a ZIP file").unwrap();

        let err = extract_docx_text(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to open DOCX as ZIP"));
    }
}
