//! PDF outline with one entry per proposal section, written with `lopdf`.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use thiserror::Error;

use crate::composer::CompositionReport;
use crate::layout::ProposalSection;

#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("cannot parse composed PDF: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("PDF catalog entry is missing")]
    MissingCatalog,
    #[error("PDF catalog entry is not a dictionary")]
    InvalidCatalog,
    #[error("section '{}' starts on page {page}, which the PDF does not have", section.title())]
    MissingPage {
        section: ProposalSection,
        page: usize,
    },
}

struct OutlineItem {
    id: ObjectId,
    page: ObjectId,
    title: &'static str,
}

/// Adds an outline pointing every section of `report` at its first page.
///
/// Documents without recorded sections are returned unchanged.
pub fn apply_section_bookmarks(
    pdf_bytes: &[u8],
    report: &CompositionReport,
) -> Result<Vec<u8>, BookmarkError> {
    if report.section_pages.is_empty() {
        return Ok(pdf_bytes.to_vec());
    }

    let mut document = Document::load_mem(pdf_bytes)?;
    let pages = document.get_pages();
    let items = outline_items(&mut document, report, &pages)?;

    let outlines_id = document.new_object_id();
    for (index, item) in items.iter().enumerate() {
        let mut entry = Dictionary::new();
        entry.set("Title", text_string(item.title));
        entry.set("Parent", Object::Reference(outlines_id));
        entry.set(
            "Dest",
            Object::Array(vec![Object::Reference(item.page), Object::Name(b"Fit".to_vec())]),
        );
        if let Some(previous) = index.checked_sub(1).and_then(|i| items.get(i)) {
            entry.set("Prev", Object::Reference(previous.id));
        }
        if let Some(next) = items.get(index + 1) {
            entry.set("Next", Object::Reference(next.id));
        }
        document.objects.insert(item.id, Object::Dictionary(entry));
    }

    let mut outlines = Dictionary::new();
    outlines.set("Type", Object::Name(b"Outlines".to_vec()));
    outlines.set("Count", Object::Integer(items.len() as i64));
    if let (Some(first), Some(last)) = (items.first(), items.last()) {
        outlines.set("First", Object::Reference(first.id));
        outlines.set("Last", Object::Reference(last.id));
    }
    document
        .objects
        .insert(outlines_id, Object::Dictionary(outlines));

    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| BookmarkError::MissingCatalog)?;
    document
        .objects
        .get_mut(&catalog_id)
        .ok_or(BookmarkError::MissingCatalog)?
        .as_dict_mut()
        .map_err(|_| BookmarkError::InvalidCatalog)?
        .set("Outlines", Object::Reference(outlines_id));

    let mut buffer = Vec::new();
    document
        .save_to(&mut buffer)
        .map_err(|err| BookmarkError::Parse(err.into()))?;
    Ok(buffer)
}

/// PDF text string in UTF-16BE with a byte order mark, so accented titles
/// are not read as PDFDocEncoding.
fn text_string(text: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn outline_items(
    document: &mut Document,
    report: &CompositionReport,
    pages: &BTreeMap<u32, ObjectId>,
) -> Result<Vec<OutlineItem>, BookmarkError> {
    report
        .section_pages
        .iter()
        .map(|&(section, page)| {
            let object = u32::try_from(page)
                .ok()
                .and_then(|number| pages.get(&number))
                .copied()
                .ok_or(BookmarkError::MissingPage { section, page })?;
            Ok(OutlineItem {
                id: document.new_object_id(),
                page: object,
                title: section.title(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PageTemplate;

    #[test]
    fn empty_reports_leave_the_document_alone() {
        let report = CompositionReport {
            pages: vec![PageTemplate::Cover],
            section_pages: Vec::new(),
        };
        let bytes = b"not even a pdf".to_vec();
        assert_eq!(apply_section_bookmarks(&bytes, &report).unwrap(), bytes);
    }

    #[test]
    fn unparsable_documents_are_rejected() {
        let report = CompositionReport {
            pages: vec![PageTemplate::Cover],
            section_pages: vec![(ProposalSection::Cover, 1)],
        };
        assert!(matches!(
            apply_section_bookmarks(b"not a pdf", &report),
            Err(BookmarkError::Parse(_))
        ));
    }

    #[test]
    fn titles_are_utf16_with_a_byte_order_mark() {
        let Object::String(bytes, StringFormat::Hexadecimal) = text_string("Custo x benefício")
        else {
            panic!("expected a hexadecimal string");
        };
        assert_eq!(&bytes[..4], &[0xFE, 0xFF, 0x00, b'C']);
        assert_eq!(bytes.len(), 2 + 2 * "Custo x benefício".chars().count());
        assert!(bytes.windows(2).any(|pair| pair == [0x00, 0xED]));

        let units: Vec<u16> = bytes[2..]
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(String::from_utf16(&units).unwrap(), "Custo x benefício");
    }
}
