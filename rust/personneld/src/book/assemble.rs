use crate::catalog::Section;
use crate::uploads::UploadStore;
use anyhow::Context;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;
use thiserror::Error;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

#[derive(Debug, Error)]
pub enum BookError {
    #[error("no PDF content to combine")]
    NoContent,
    #[error("upload store unavailable: {0}")]
    StorageUnavailable(String),
    #[error("failed to write combined document: {0}")]
    Output(String),
}

impl BookError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoContent => "no_content",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::Output(_) => "io_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssembledBook {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Stored filenames that made it into the book, in book order.
    pub included: Vec<String>,
    /// PDF files that could not be read.
    pub skipped: Vec<String>,
}

/// Combines an optional cover with every readable PDF the person uploaded,
/// walking `sections` in order and each section's files by upload time.
/// Non-PDF uploads are ignored and unreadable PDFs are skipped.
pub fn assemble(
    store: &UploadStore,
    identifier: &str,
    sections: &[Section],
    cover: Option<&[u8]>,
) -> Result<AssembledBook, BookError> {
    let mut documents = Vec::new();
    let mut included = Vec::new();
    let mut skipped = Vec::new();

    if let Some(bytes) = cover {
        match Document::load_mem(bytes) {
            Ok(doc) if !doc.get_pages().is_empty() => {
                documents.push(doc);
                included.push("cover".to_string());
            }
            Ok(_) => tracing::warn!(identifier, "cover page has no pages; skipped"),
            Err(e) => tracing::warn!(identifier, error = %e, "cover page unreadable; skipped"),
        }
    }

    for section in sections {
        let files = store
            .list_section(identifier, *section)
            .map_err(|e| BookError::StorageUnavailable(format!("{e:#}")))?;
        for file in files.into_iter().filter(|f| f.is_pdf()) {
            match Document::load(&file.path) {
                Ok(doc) if !doc.get_pages().is_empty() => {
                    documents.push(doc);
                    included.push(file.filename);
                }
                Ok(_) => {
                    tracing::warn!(identifier, file = %file.path.display(), "pdf has no pages; skipped");
                    skipped.push(file.filename);
                }
                Err(e) => {
                    tracing::warn!(identifier, file = %file.path.display(), error = %e, "pdf unreadable; skipped");
                    skipped.push(file.filename);
                }
            }
        }
    }

    if documents.is_empty() {
        return Err(BookError::NoContent);
    }
    let page_count = documents.iter().map(|d| d.get_pages().len()).sum();
    let bytes = merge_documents(documents).map_err(|e| BookError::Output(format!("{e:#}")))?;
    tracing::info!(identifier, parts = included.len(), pages = page_count, skipped = skipped.len(), "book assembled");
    Ok(AssembledBook {
        bytes,
        page_count,
        included,
        skipped,
    })
}

/// Concatenates the pages of `documents`, in order, into one PDF. Catalogs,
/// page-tree nodes and outlines of the inputs are dropped and replaced by a
/// single flat page tree.
pub fn merge_documents(documents: Vec<Document>) -> anyhow::Result<Vec<u8>> {
    let mut merged = Document::with_version("1.5");
    let mut next_id = 1u32;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();

    for mut doc in documents {
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for page_id in &page_ids {
            let mut page = doc
                .get_dictionary(*page_id)
                .context("page object is not a dictionary")?
                .clone();
            for key in INHERITABLE {
                if page.has(key) {
                    continue;
                }
                if let Some(value) = inherited_attribute(&doc, &page, key) {
                    page.set(key.to_vec(), value);
                }
            }
            pages.push((*page_id, page));
        }

        let page_set: HashSet<ObjectId> = page_ids.into_iter().collect();
        for (id, object) in doc.objects {
            if page_set.contains(&id) || is_structural(&object) {
                continue;
            }
            merged.objects.insert(id, object);
        }
    }

    let pages_id: ObjectId = (next_id, 0);
    let catalog_id: ObjectId = (next_id + 1, 0);
    let count = pages.len() as i64;
    let mut kids = Vec::with_capacity(pages.len());
    for (id, mut page) in pages {
        page.set("Parent", pages_id);
        merged.objects.insert(id, Object::Dictionary(page));
        kids.push(Object::Reference(id));
    }
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    merged.objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        }),
    );
    merged.trailer.set("Root", catalog_id);
    merged.max_id = catalog_id.0;

    let mut out = Vec::new();
    merged
        .save_to(&mut out)
        .context("failed to serialize combined document")?;
    Ok(out)
}

fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(id) = parent {
        // Guards against cyclic Parent links in damaged files.
        if depth > 64 {
            return None;
        }
        let node = doc.get_dictionary(id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }
    None
}

fn is_structural(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(d) => d,
        Object::Stream(s) => &s.dict,
        _ => return false,
    };
    matches!(
        dict.get(b"Type").and_then(Object::as_name),
        Ok(b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" | b"ObjStm" | b"XRef")
    )
}
