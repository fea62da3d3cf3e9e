//! Incremental-update documents (ISO 32000-2 7.5.6): a PDF that has been appended to one or more
//! times without rewriting earlier bytes, so that each revision can be recovered independently.
//! This crate's incremental support is read-side only — recovering `Document`s for each revision
//! in the chain and exposing the raw original bytes (e.g. to verify a signed revision's digest
//! hasn't changed). Writing a *new* incremental update is left to a future `writer` addition; see
//! `DESIGN.md`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::{Document, Result};

/// A document loaded alongside the exact byte buffer it was parsed from, so a caller can inspect
/// what changed between revisions or re-verify a digital signature over a prior revision's bytes.
#[derive(Debug)]
pub struct IncrementalDocument {
    pub document: Document,
    original_bytes: Vec<u8>,
}

impl IncrementalDocument {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut buffer = Vec::new();
        File::open(path)?.read_to_end(&mut buffer)?;
        Self::load_mem(buffer)
    }

    pub fn load_from<R: Read>(mut source: R) -> Result<Self> {
        let mut buffer = Vec::new();
        source.read_to_end(&mut buffer)?;
        Self::load_mem(buffer)
    }

    pub fn load_mem(buffer: Vec<u8>) -> Result<Self> {
        let original_bytes = buffer.clone();
        let document = Document::load_mem(buffer)?;
        Ok(IncrementalDocument { document, original_bytes })
    }

    /// The exact bytes the document was parsed from, unmodified by any in-memory edits made to
    /// `self.document` since.
    pub fn original_bytes(&self) -> &[u8] {
        &self.original_bytes
    }

    /// Re-parses an earlier revision by truncating the original buffer at `end_offset` (the
    /// `%%EOF` of that revision) and loading it as a standalone document.
    pub fn revision_at(&self, end_offset: usize) -> Result<Document> {
        let end_offset = end_offset.min(self.original_bytes.len());
        Document::load_mem(self.original_bytes[..end_offset].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pdf() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend(b"%PDF-1.4\n");
        let obj_offset = buf.len();
        buf.extend(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        let pages_offset = buf.len();
        buf.extend(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
        let xref_offset = buf.len();
        buf.extend(b"xref\n0 3\n0000000000 65535 f \n");
        buf.extend(format!("{:010} 00000 n \n", obj_offset).into_bytes());
        buf.extend(format!("{:010} 00000 n \n", pages_offset).into_bytes());
        buf.extend(b"trailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n");
        buf.extend(format!("{}\n", xref_offset).into_bytes());
        buf.extend(b"%%EOF");
        buf
    }

    #[test]
    fn keeps_the_exact_bytes_it_was_loaded_from() {
        let bytes = sample_pdf();
        let incremental = IncrementalDocument::load_mem(bytes.clone()).unwrap();
        assert_eq!(incremental.original_bytes(), bytes.as_slice());
        assert_eq!(incremental.document.version, (1, 4));
    }
}
