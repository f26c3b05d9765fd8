// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic PDFs built in memory with lopdf.
//
// Each page is 300 points wide with its own height and a content stream that
// prints "Page N" in Helvetica, so copied pages can be told apart.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

/// A PDF with one page per entry in `heights`, each with its own MediaBox.
pub fn sample_pdf(heights: &[f64]) -> Vec<u8> {
    build(heights.len(), |page_no| Some(heights[page_no - 1]), None)
}

/// A PDF of `pages` pages whose MediaBox is set only on the root /Pages node.
pub fn sample_pdf_with_inherited_box(pages: usize, height: f64) -> Vec<u8> {
    build(pages, |_| None, Some(height))
}

/// The text-drawing operators of page `page_no` as they appear in its stream.
pub fn page_marker(page_no: usize) -> String {
    format!("Page {page_no}")
}

fn build(
    page_count: usize,
    own_height: impl Fn(usize) -> Option<f64>,
    inherited_height: Option<f64>,
) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    // Shared by every page, so a copy should carry it exactly once.
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::with_capacity(page_count);
    for page_no in 1..=page_count {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![20.into(), 20.into()]),
                Operation::new("Tj", vec![Object::string_literal(page_marker(page_no))]),
                Operation::new("ET", vec![]),
            ],
        };
        let encoded = content.encode().unwrap_or_default();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        };
        if let Some(height) = own_height(page_no) {
            page.set("MediaBox", media_box(height));
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let mut pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
    };
    if let Some(height) = inherited_height {
        pages.set("MediaBox", media_box(height));
    }
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    let _ = doc.save_to(&mut bytes);
    bytes
}

fn media_box(height: f64) -> Object {
    Object::Array(vec![
        0.into(),
        0.into(),
        300.into(),
        Object::Real(height as f32),
    ])
}

/// Id of the shared resources dictionary in a document produced here.
pub fn resources_of(doc: &Document, page_id: ObjectId) -> Option<ObjectId> {
    doc.get_dictionary(page_id)
        .ok()?
        .get(b"Resources")
        .ok()?
        .as_reference()
        .ok()
}
