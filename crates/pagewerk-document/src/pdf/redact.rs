// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Burning redaction rectangles into page content.
//
// The page's existing content streams are bracketed by `q` / `Q` so whatever
// graphics state they leave behind is discarded, then one extra stream fills
// every rectangle with a solid opaque colour. This covers the region visually;
// text operators underneath are left in place.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pagewerk_core::error::{PagewerkError, Result};
use tracing::debug;

use crate::geometry::PdfRect;

/// Draw `rects` over the page `page_id` in `color` (RGB, 0.0..=1.0).
///
/// An empty `rects` leaves the page untouched.
pub(crate) fn burn_in(
    document: &mut Document,
    page_id: ObjectId,
    rects: &[PdfRect],
    color: [f32; 3],
) -> Result<()> {
    if rects.is_empty() {
        return Ok(());
    }

    let existing = existing_contents(document, page_id)?;

    let opening = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let fill = fill_operations(rects, color);
    let encoded = fill
        .encode()
        .map_err(|err| PagewerkError::PdfError(format!("failed to encode redaction: {}", err)))?;
    let closing = document.add_object(Stream::new(Dictionary::new(), encoded));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(opening));
    contents.extend(existing);
    contents.push(Object::Reference(closing));

    let page = document.get_dictionary_mut(page_id).map_err(|err| {
        PagewerkError::PdfError(format!("page {:?} is not a dictionary: {}", page_id, err))
    })?;
    page.set("Contents", Object::Array(contents));

    debug!(?page_id, rects = rects.len(), "Redactions burned in");
    Ok(())
}

/// `Q q r g b rg (x y w h re f)+ Q`: close the wrapped content, then fill.
fn fill_operations(rects: &[PdfRect], color: [f32; 3]) -> Content {
    let mut operations = Vec::with_capacity(rects.len() * 2 + 4);
    operations.push(Operation::new("Q", vec![]));
    operations.push(Operation::new("q", vec![]));
    operations.push(Operation::new(
        "rg",
        color.iter().map(|c| Object::Real(c.clamp(0.0, 1.0))).collect(),
    ));
    for rect in rects {
        operations.push(Operation::new(
            "re",
            [rect.x, rect.y, rect.w, rect.h]
                .iter()
                .map(|v| Object::Real(*v as f32))
                .collect(),
        ));
        operations.push(Operation::new("f", vec![]));
    }
    operations.push(Operation::new("Q", vec![]));
    Content { operations }
}

/// The page's current content streams as a list of references.
fn existing_contents(document: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = document.get_dictionary(page_id).map_err(|err| {
        PagewerkError::PdfError(format!("page {:?} is not a dictionary: {}", page_id, err))
    })?;
    let contents = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match document.get_object(*id) {
            // An indirect array of streams.
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        Ok(other) => vec![other.clone()],
        Err(_) => Vec::new(),
    };
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::sample_pdf;

    fn operators(document: &Document, page_id: ObjectId) -> Vec<String> {
        let bytes = document.get_page_content(page_id).unwrap();
        Content::decode(&bytes)
            .unwrap()
            .operations
            .into_iter()
            .map(|op| op.operator)
            .collect()
    }

    #[test]
    fn no_rects_means_no_drawing() {
        let mut doc = Document::load_mem(&sample_pdf(&[792.0])).unwrap();
        let page_id = doc.get_pages()[&1];
        let objects_before = doc.objects.len();

        burn_in(&mut doc, page_id, &[], [0.0, 0.0, 0.0]).unwrap();
        assert_eq!(doc.objects.len(), objects_before);
        assert!(matches!(
            doc.get_dictionary(page_id).unwrap().get(b"Contents"),
            Ok(Object::Reference(_))
        ));
    }

    #[test]
    fn original_content_is_wrapped_and_fill_appended() {
        let mut doc = Document::load_mem(&sample_pdf(&[200.0])).unwrap();
        let page_id = doc.get_pages()[&1];
        let rect = PdfRect { x: 10.0, y: 170.0, w: 50.0, h: 20.0 };

        burn_in(&mut doc, page_id, &[rect], [0.0, 0.0, 0.0]).unwrap();

        let ops = operators(&doc, page_id);
        assert_eq!(ops.first().map(String::as_str), Some("q"));
        assert!(ops.iter().any(|op| op == "Tj"), "original text survives");
        assert_eq!(
            &ops[ops.len() - 6..],
            &["Q", "q", "rg", "re", "f", "Q"].map(String::from)
        );
    }

    #[test]
    fn rectangle_operands_are_in_pdf_space() {
        let mut doc = Document::load_mem(&sample_pdf(&[200.0])).unwrap();
        let page_id = doc.get_pages()[&1];
        let rect = PdfRect { x: 10.0, y: 170.0, w: 50.0, h: 20.0 };
        burn_in(&mut doc, page_id, &[rect], [0.0, 0.0, 0.0]).unwrap();

        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let re = content
            .operations
            .iter()
            .find(|op| op.operator == "re")
            .unwrap();
        let operands: Vec<f32> = re.operands.iter().map(|o| o.as_float().unwrap()).collect();
        assert_eq!(operands, vec![10.0, 170.0, 50.0, 20.0]);
    }
}
