//! Object-level reader and writer for PDF 1.x/2.0 files: parses a document down to its indirect
//! objects and cross-reference table, lets a caller walk/mutate that object graph directly, and
//! serializes it back out — either as a byte-identical-shape classic `xref` table or as a modern
//! cross-reference stream with object-stream packing. Encryption (RC4, AES-128/256, the standard
//! security handler's password algorithms) and a minimal page/content-stream layer for text
//! extraction and base-14-font page construction sit on top of that core.
//!
//! This is not a layout/rendering engine: fonts, glyphs, color management, and page composition
//! beyond what's needed to build a simple text page are out of scope (see each module's
//! Non-goals, and `DESIGN.md`).

mod content;
mod creator;
#[cfg(feature = "chrono")]
mod datetime;
mod destinations;
mod document;
mod encodings;
pub mod encryption;
mod error;
mod filters;
mod incremental;
mod lexer;
mod object;
mod parser;
mod pool;
mod reader;
mod stream;
mod writer;
mod xref;

pub use content::{Content, Operation};
pub use creator::Base14Font;
pub use destinations::Destination;
pub use document::{Document, PdfAFlavor};
pub use encodings::{bytes_to_string, string_to_bytes, PdfDocEncoding, PDF_DOC_ENCODING};
pub use encryption::{
    Aes128CryptFilter, Aes256CryptFilter, CryptFilter, DecryptionError, EncryptionState, EncryptionVersion,
    IdentityCryptFilter, PasswordAlgorithm, Permissions, Rc4CryptFilter,
};
pub use error::{Error, ParseError, Result, XrefError};
pub use incremental::IncrementalDocument;
pub use object::{Array, Dictionary, Object, ObjectId, StringFormat};
pub use pool::StringPool;
pub use stream::Stream;
pub use writer::{ObjectStream, ObjectStreamBuilder, ObjectStreamConfig, SaveOptions, SaveOptionsBuilder};
pub use xref::{XrefEntry, XrefTable};
