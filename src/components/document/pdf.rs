use crate::error::{extraction_error, AppResult};
use lopdf::Document;
use std::path::Path;
use tracing::debug;

/// Extract text from every page of a PDF, in page order, with no separator
/// between pages.
///
/// Only "digital-native" PDFs with a text layer produce anything; scanned
/// pages come back empty.
pub fn extract_pdf_text(path: &Path) -> AppResult<String> {
    let doc = Document::load(path)
        .map_err(|e| extraction_error(&format!("Failed to open PDF {}: {}", path.display(), e)))?;

    let pages = doc.get_pages();
    debug!("PDF {} has {} pages", path.display(), pages.len());

    let mut text = String::new();
    for page_number in pages.keys() {
        let page_text = doc.extract_text(&[*page_number]).map_err(|e| {
            extraction_error(&format!("Failed to read text of page {}: {}", page_number, e))
        })?;
        // lopdf ends every text object with a line break
        text.push_str(page_text.trim_end_matches(['\r', '\n']));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Build a PDF with one line of Courier text per page
    fn write_pdf(path: &Path, pages: &[&str]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids = Vec::new();
        for line in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn test_single_page_text() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("invite.pdf");
        write_pdf(&path, &["Meeting Jan 5 2025 10:00"]);

        let text = extract_pdf_text(&path).unwrap();
        assert!(text.contains("Meeting Jan 5 2025 10:00"), "got {:?}", text);
    }

    #[test]
    fn test_pages_joined_without_separator() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("split.pdf");
        write_pdf(&path, &["Meeting Jan 5", " 2025 10:00"]);

        let text = extract_pdf_text(&path).unwrap();
        assert!(text.contains("Meeting Jan 5 2025 10:00"), "got {:?}", text);
    }

    #[test]
    fn test_not_a_pdf() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("fake.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let result = extract_pdf_text(&path);
        assert!(matches!(result, Err(crate::error::Error::Extraction(_))));
    }
}
