//! Entry points that turn a file path, a `Read`, or an in-memory buffer into a [`Document`]
//! (spec §4.11), mirroring the teacher's `load`/`load_with_password`/`load_mem` naming.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::document::Document;
use crate::object::Object;
use crate::{Error, ObjectId, ParseError, Result};

/// Parses one indirect object at `offset` without a [`Document`] to dereference through — used
/// only while the xref/trailer chain is still being assembled, so `/Length` must be a direct
/// integer here (cross-reference streams are required to use one; see ISO 32000-2 7.5.8.2).
pub(super) fn parse_indirect_object(buffer: &[u8], offset: usize) -> Result<(ObjectId, Object)> {
    if offset > buffer.len() {
        return Err(Error::InvalidOffset(offset));
    }
    let input = &buffer[offset..];
    let (rest, id) =
        crate::parser::indirect_object_header(input).map_err(|_| Error::Parse(ParseError::UnexpectedToken))?;
    let (rest, value) = crate::parser::object_value(rest).map_err(|_| Error::Parse(ParseError::UnexpectedToken))?;

    let object = match (&value, crate::parser::stream_keyword(rest)) {
        (Object::Dictionary(dict), Ok((after_stream, ()))) => {
            let length = dict.get(b"Length")?.as_i64()?;
            if length < 0 {
                return Err(Error::InvalidStream("negative /Length".to_string()));
            }
            let length = length as usize;
            if length > after_stream.len() {
                return Err(Error::InvalidStream("stream extends past end of file".to_string()));
            }
            Object::Stream(crate::parser::make_stream(dict.clone(), after_stream[..length].to_vec()))
        }
        _ => value,
    };
    Ok((id, object))
}

impl Document {
    /// Reads and parses the PDF at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Document> {
        let mut buffer = Vec::new();
        File::open(path)?.read_to_end(&mut buffer)?;
        Self::load_mem(buffer)
    }

    /// Reads and parses the PDF at `path`, authenticating `password` against its `/Encrypt`
    /// dictionary before returning.
    pub fn load_with_password<P: AsRef<Path>>(path: P, password: impl AsRef<[u8]>) -> Result<Document> {
        let mut document = Self::load(path)?;
        if document.is_encrypted() {
            document.decrypt(password)?;
        }
        Ok(document)
    }

    /// Parses an already-read-out PDF buffer.
    pub fn load_mem(buffer: Vec<u8>) -> Result<Document> {
        super::read_document(buffer)
    }

    /// Parses an already-read-out PDF buffer, authenticating `password` against its `/Encrypt`
    /// dictionary before returning.
    pub fn load_mem_with_password(buffer: Vec<u8>, password: impl AsRef<[u8]>) -> Result<Document> {
        let mut document = Self::load_mem(buffer)?;
        if document.is_encrypted() {
            document.decrypt(password)?;
        }
        Ok(document)
    }

    /// Reads a PDF to completion from any [`Read`] implementor.
    pub fn load_from<R: Read>(mut source: R) -> Result<Document> {
        let mut buffer = Vec::new();
        source.read_to_end(&mut buffer)?;
        Self::load_mem(buffer)
    }
}
