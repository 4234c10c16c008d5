//! PDF backend abstraction.
//!
//! The unlocker never touches the PDF format itself. It needs four things
//! from a backend: parse bytes into a document that knows whether it is
//! encrypted, decrypt it with a password, walk its pages in order, and write
//! those pages into a fresh unencrypted document. [`PdfBackend`] captures
//! that contract; [`LopdfBackend`] implements it on top of `lopdf`.

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use thiserror::Error;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Upper bound on page-tree depth when resolving inherited attributes.
/// Guards against `Parent` cycles in damaged files.
const MAX_TREE_DEPTH: usize = 64;

/// Failures reported by a PDF backend.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    #[error("incorrect password")]
    InvalidPassword,

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("failed to rebuild document: {0}")]
    Rebuild(String),
}

/// The capabilities the unlocker needs from a PDF library.
pub trait PdfBackend {
    /// A parsed document.
    type Document;

    /// Parse a complete PDF file.
    fn parse(&self, bytes: Vec<u8>) -> Result<Self::Document, PdfError>;

    /// Whether the document still needs a password before its content can be read.
    fn is_encrypted(&self, doc: &Self::Document) -> bool;

    /// Decrypt the document in place with `password`.
    fn decrypt(&self, doc: &mut Self::Document, password: &str) -> Result<(), PdfError>;

    /// Number of pages.
    fn page_count(&self, doc: &Self::Document) -> usize;

    /// Copy every page, in order, into a fresh unencrypted document and
    /// serialize it.
    fn rebuild(&self, doc: &Self::Document) -> Result<Vec<u8>, PdfError>;
}

/// A document parsed by [`LopdfBackend`].
///
/// The source bytes are kept because `lopdf` decrypts while parsing, so a
/// password can only be applied by parsing again.
#[derive(Debug)]
pub struct LopdfDocument {
    bytes: Vec<u8>,
    inner: Document,
}

/// [`PdfBackend`] backed by the `lopdf` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfBackend;

impl PdfBackend for LopdfBackend {
    type Document = LopdfDocument;

    fn parse(&self, bytes: Vec<u8>) -> Result<Self::Document, PdfError> {
        // Files protected by an empty user password come back already decrypted.
        let inner = Document::load_mem(&bytes).map_err(|e| PdfError::Parse(e.to_string()))?;
        Ok(LopdfDocument { bytes, inner })
    }

    fn is_encrypted(&self, doc: &Self::Document) -> bool {
        doc.inner.is_encrypted()
    }

    fn decrypt(&self, doc: &mut Self::Document, password: &str) -> Result<(), PdfError> {
        let inner =
            Document::load_mem_with_password(&doc.bytes, password).map_err(|e| match e {
                lopdf::Error::InvalidPassword => PdfError::InvalidPassword,
                other => PdfError::Decrypt(other.to_string()),
            })?;
        if inner.is_encrypted() {
            return Err(PdfError::Decrypt("document is still encrypted".to_string()));
        }
        doc.inner = inner;
        Ok(())
    }

    fn page_count(&self, doc: &Self::Document) -> usize {
        doc.inner.get_pages().len()
    }

    fn rebuild(&self, doc: &Self::Document) -> Result<Vec<u8>, PdfError> {
        let mut output = copy_pages(&doc.inner)?;
        let mut buf = Vec::new();
        output
            .save_to(&mut buf)
            .map_err(|e| PdfError::Rebuild(e.to_string()))?;
        Ok(buf)
    }
}

/// Build a new document holding the pages of `source`, in order, under a
/// single flat page tree.
fn copy_pages(source: &Document) -> Result<Document, PdfError> {
    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();

    let mut output = Document::with_version(source.version.clone());
    output.objects = source.objects.clone();
    output.max_id = source.max_id;

    let pages_id = output.new_object_id();
    for &page_id in &page_ids {
        let mut page = source
            .get_dictionary(page_id)
            .map_err(|e| PdfError::Rebuild(format!("page {page_id:?}: {e}")))?
            .clone();
        for key in INHERITABLE_ATTRIBUTES {
            if page.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(source, &page, key) {
                page.set(key, value);
            }
        }
        page.set("Parent", pages_id);
        output.objects.insert(page_id, Object::Dictionary(page));
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    output.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );

    let catalog_id = output.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    output.trailer.set("Root", catalog_id);

    // Drops the old catalog, page tree and encryption dictionary.
    output.prune_objects();
    output.renumber_objects();

    Ok(output)
}

/// Look `key` up on the ancestors of `page`, nearest first.
fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}
