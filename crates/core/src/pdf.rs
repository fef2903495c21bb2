//! PDF text extraction.

use lopdf::Document;

/// Extracts the text layer of every page, in page order.
///
/// Each text object ends in a line break, so pages come out one per line; the break after the
/// last page is dropped.
///
/// A page whose content cannot be decoded contributes nothing; only a document that cannot be
/// parsed at all is an error. Scanned pages without a text layer yield no text (no OCR).
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, lopdf::Error> {
    let document = Document::load_mem(bytes)?;

    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => tracing::debug!("skipping page {}: {}", page_number, e),
        }
    }

    let end = text.trim_end_matches(['\n', '\r']).len();
    text.truncate(end);
    Ok(text)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Builds a PDF with one page per entry; an empty entry produces a page with no text.
    pub(crate) fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
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
        for page_text in pages {
            let operations = if page_text.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*page_text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn extracts_pages_in_order() {
        let bytes = pdf_with_pages(&["Appendix", "removed"]);
        assert_eq!(extract_pdf_text(&bytes).unwrap(), "Appendix\nremoved");
    }

    #[test]
    fn single_page_has_no_trailing_line_break() {
        let bytes = pdf_with_pages(&["Wound closed"]);
        assert_eq!(extract_pdf_text(&bytes).unwrap(), "Wound closed");
    }

    #[test]
    fn page_without_text_layer_yields_no_text() {
        let bytes = pdf_with_pages(&[""]);
        let text = extract_pdf_text(&bytes).unwrap();
        assert!(text.trim().is_empty());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(extract_pdf_text(b"definitely not a pdf").is_err());
    }
}
