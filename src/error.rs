use std::num::TryFromIntError;

use crate::encryption::DecryptionError;
use crate::ObjectId;

pub type Result<T> = std::result::Result<T, Error>;

/// Finer-grained reasons a value failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("file does not start with a recognizable %PDF- header")]
    InvalidFileHeader,
    #[error("dictionary or array nesting exceeds the depth cap")]
    TooDeep,
    #[error("a literal string or name exceeded the maximum token length")]
    TokenTooLong,
    #[error("xref table or stream is malformed")]
    InvalidXref,
    #[error("stream dictionary is missing a usable /Length")]
    InvalidStreamLength,
    #[error("unexpected token while parsing an object")]
    UnexpectedToken,
    #[error("indirect object header does not match the expected object id")]
    ObjectIdMismatch,
}

/// Finer-grained reasons the xref/trailer engine failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XrefError {
    #[error("could not locate startxref/%%EOF near the end of the file")]
    Start,
    #[error("a /Prev offset points outside the file")]
    PrevStart,
    #[error("a /XRefStm offset points outside the file")]
    StreamStart,
    #[error("/Prev chain exceeds the maximum depth and was not followed further")]
    ChainTooDeep,
    #[error("xref stream /W widths are invalid")]
    InvalidWidths,
    #[error("the documented xref section is unreadable and the fallback object scan found no catalog")]
    RecoveryFailed,
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("xref error: {0}")]
    Xref(#[from] XrefError),

    #[error("malformed PDF data: {0}")]
    Data(String),

    #[error("invalid stream: {0}")]
    InvalidStream(String),

    #[error("API used out of sequence: {0}")]
    State(String),

    #[error("filter error: {0}")]
    Filter(String),

    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    #[error("document is not encrypted")]
    NotEncrypted,

    #[error("unsupported security handler {0:?}")]
    UnsupportedSecurityHandler(Vec<u8>),

    #[error("PDF/A and encryption cannot both be enabled on the same document")]
    Policy,

    #[error("object {}.{} was not found", .0.0, .0.1)]
    ObjectNotFound(ObjectId),

    #[error("no xref entry for object {}.{}", .0.0, .0.1)]
    MissingXrefEntry,

    #[error("dictionary is missing required key {0:?}")]
    DictKey(String),

    #[error("byte offset {0} is outside the document buffer")]
    InvalidOffset(usize),

    #[error("reference cycle detected while resolving {}.{}", .0.0, .0.1)]
    ReferenceCycle(ObjectId),

    #[error("value out of representable range: {0}")]
    Overflow(String),

    #[error("numeric conversion failed: {0}")]
    NumericCast(String),

    #[error("type mismatch: expected {0}")]
    Type(&'static str),

    #[error("feature not implemented: {0}")]
    Unimplemented(&'static str),
}

impl From<TryFromIntError> for Error {
    fn from(e: TryFromIntError) -> Self {
        Error::NumericCast(e.to_string())
    }
}
