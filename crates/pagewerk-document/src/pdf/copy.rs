// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page copying between lopdf documents.
//
// A page and everything it transitively references is deep-copied into the
// target. Copies are memoised per source object, so resources shared between
// pages land in the target once and reference cycles terminate.

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use pagewerk_core::error::{PagewerkError, Result};
use tracing::{debug, warn};

use crate::pdf::reader::inherited_attribute;

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Copies pages of one source document into one target document.
pub(crate) struct PageCopier<'a> {
    source: &'a Document,
    /// Source object id to its id in the target.
    copied: HashMap<ObjectId, ObjectId>,
    /// Source page objects that will appear in the target.
    exported_pages: HashSet<ObjectId>,
}

impl<'a> PageCopier<'a> {
    /// `exported_pages` lists every source page that will be copied; references
    /// to any other page object become `null`.
    pub fn new(source: &'a Document, exported_pages: impl IntoIterator<Item = ObjectId>) -> Self {
        Self {
            source,
            copied: HashMap::new(),
            exported_pages: exported_pages.into_iter().collect(),
        }
    }

    /// Copy the page `page_id` into `target` under the pages node `parent`,
    /// returning the new page's id. Does not touch the parent's /Kids.
    pub fn copy_page(
        &mut self,
        target: &mut Document,
        page_id: ObjectId,
        parent: ObjectId,
    ) -> Result<ObjectId> {
        let new_id = self.copy_reference(target, page_id)?;

        let mut inherited = Vec::new();
        for key in INHERITABLE {
            let own = self
                .source
                .get_dictionary(page_id)
                .map(|page| page.has(key))
                .unwrap_or(false);
            if own {
                continue;
            }
            if let Some(value) = inherited_attribute(self.source, page_id, key) {
                inherited.push((key, self.copy_object(target, value)?));
            }
        }

        let page = target.get_dictionary_mut(new_id).map_err(|err| {
            PagewerkError::PdfError(format!("copied page {:?} is not a dictionary: {}", page_id, err))
        })?;
        for (key, value) in inherited {
            page.set(key, value);
        }
        page.set("Parent", Object::Reference(parent));

        debug!(?page_id, ?new_id, objects = self.copied.len(), "Page copied");
        Ok(new_id)
    }

    /// Copy the indirect object `id`, reusing an earlier copy when there is one.
    fn copy_reference(&mut self, target: &mut Document, id: ObjectId) -> Result<ObjectId> {
        if let Some(existing) = self.copied.get(&id) {
            return Ok(*existing);
        }
        let object = self.source.get_object(id).map_err(|err| {
            PagewerkError::PdfError(format!("cannot read object {:?}: {}", id, err))
        })?;

        // Reserve the id first so references back to this object resolve to it.
        let new_id = target.new_object_id();
        self.copied.insert(id, new_id);
        let copy = self.copy_object(target, object)?;
        target.objects.insert(new_id, copy);
        Ok(new_id)
    }

    fn copy_object(&mut self, target: &mut Document, object: &Object) -> Result<Object> {
        match object {
            Object::Dictionary(dict) => Ok(Object::Dictionary(self.copy_dictionary(target, dict)?)),
            Object::Array(items) => {
                let mut copy = Vec::with_capacity(items.len());
                for item in items {
                    copy.push(self.copy_object(target, item)?);
                }
                Ok(Object::Array(copy))
            }
            Object::Reference(id) => {
                let referenced = match self.source.get_object(*id) {
                    Ok(referenced) => referenced,
                    Err(err) => {
                        warn!(ref_id = ?id, %err, "Cannot resolve reference, using null");
                        return Ok(Object::Null);
                    }
                };
                if is_page(referenced) && !self.exported_pages.contains(id) {
                    debug!(ref_id = ?id, "Dropping reference to a page outside this document");
                    return Ok(Object::Null);
                }
                Ok(Object::Reference(self.copy_reference(target, *id)?))
            }
            Object::Stream(stream) => {
                let dict = self.copy_dictionary(target, &stream.dict)?;
                Ok(Object::Stream(Stream::new(dict, stream.content.clone())))
            }
            other => Ok(other.clone()),
        }
    }

    /// Copy every entry. Page tree nodes lose /Parent, which the caller
    /// patches; annotations and form fields keep theirs.
    fn copy_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Result<Dictionary> {
        let skip_parent = is_page_tree_node(dict);
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            if skip_parent && key == b"Parent" {
                continue;
            }
            copy.set(key.clone(), self.copy_object(target, value)?);
        }
        Ok(copy)
    }
}

fn type_name(dict: &Dictionary) -> Option<&[u8]> {
    dict.get(b"Type").and_then(Object::as_name).ok()
}

fn is_page(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => type_name(dict) == Some(b"Page".as_slice()),
        _ => false,
    }
}

/// `/Page` or `/Pages`.
fn is_page_tree_node(dict: &Dictionary) -> bool {
    matches!(type_name(dict), Some(b"Page") | Some(b"Pages"))
}

/// An empty document with a catalog and an empty pages node.
///
/// Returns the document and the id reserved for the pages node, which the
/// caller fills in with [`finish_page_tree`] once every page is copied.
pub(crate) fn empty_document(version: &str) -> (Document, ObjectId) {
    let mut document = Document::with_version(version);
    let pages_id = document.new_object_id();
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);
    (document, pages_id)
}

/// Write the pages node listing `kids` in order.
pub(crate) fn finish_page_tree(document: &mut Document, pages_id: ObjectId, kids: &[ObjectId]) {
    let kids_array: Vec<Object> = kids.iter().map(|id| Object::Reference(*id)).collect();
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids_array,
            "Count" => kids.len() as i64,
        }),
    );
}
