//! The document façade (spec §4.11): owns the source buffer, the cross-reference table, and a
//! lazily-populated object cache. Unlike the teacher, which eagerly preloads every object from
//! `reference_table` into a `BTreeMap` right after parsing the xref (optionally in parallel via
//! rayon), objects here are parsed from `buffer` on first access and cached — most callers only
//! ever touch the catalog/page tree, not every indirect object in the file.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use log::warn;

use crate::encryption::{self, CryptFilter, EncryptionState};
use crate::encryption::{Aes128CryptFilter, Aes256CryptFilter, IdentityCryptFilter, Rc4CryptFilter};
use crate::xref::{XrefEntry, XrefTable};
use crate::{dictionary, Dictionary, Error, Object, ObjectId, Result, Stream};

/// A flavor tag set by [`Document::set_pdfa_flavor`]. Only used to gate encryption (spec §4.11);
/// this crate does not validate PDF/A conformance beyond remembering that the tag was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfAFlavor {
    PdfA1B,
    PdfA2B,
    PdfA3B,
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    pub version: (u8, u8),
    pub trailer: Dictionary,
    pub(crate) xref: XrefTable,
    pub(crate) buffer: Vec<u8>,
    pub(crate) objects: RefCell<BTreeMap<ObjectId, Object>>,
    pub(crate) encryption_state: Option<EncryptionState>,
    pub(crate) pdfa_flavor: Option<PdfAFlavor>,
}

impl Document {
    pub fn new() -> Self {
        Document {
            version: (1, 7),
            trailer: Dictionary::new(),
            xref: XrefTable::new(),
            buffer: Vec::new(),
            objects: RefCell::new(BTreeMap::new()),
            encryption_state: None,
            pdfa_flavor: None,
        }
    }

    /// The highest object number currently known to the document, used to allocate the next one.
    pub fn max_object_id(&self) -> u32 {
        self.xref.max_object_number.max(self.objects.borrow().keys().map(|id| id.0).max().unwrap_or(0))
    }

    /// Reserves a fresh object id and stores `object` under it, returning the id (spec §4.11,
    /// used by the writer and by `creator` to build new pages/fonts/content streams).
    pub fn add_object<O: Into<Object>>(&mut self, object: O) -> ObjectId {
        let id = (self.max_object_id() + 1, 0);
        self.objects.borrow_mut().insert(id, object.into());
        self.xref.max_object_number = self.xref.max_object_number.max(id.0);
        id
    }

    pub fn set_object<O: Into<Object>>(&mut self, id: ObjectId, object: O) {
        self.objects.borrow_mut().insert(id, object.into());
        self.xref.max_object_number = self.xref.max_object_number.max(id.0);
    }

    /// Returns a clone of the object at `id`, parsing and caching it from `buffer` on first
    /// access.
    pub fn get_object(&self, id: ObjectId) -> Result<Object> {
        if let Some(obj) = self.objects.borrow().get(&id) {
            return Ok(obj.clone());
        }

        let obj = self.load_object(id, &mut HashSet::new())?;
        self.objects.borrow_mut().insert(id, obj.clone());
        Ok(obj)
    }

    fn load_object(&self, id: ObjectId, already_seen: &mut HashSet<ObjectId>) -> Result<Object> {
        if !already_seen.insert(id) {
            return Err(Error::ReferenceCycle(id));
        }

        match self.xref.get(id.0) {
            Some(XrefEntry::Normal { offset, .. }) => self.parse_object_at(offset as usize, id),
            Some(XrefEntry::Compressed { stream_number, index }) => {
                self.load_compressed_object(id, stream_number, index, already_seen)
            }
            _ => Err(Error::MissingXrefEntry),
        }
    }

    fn parse_object_at(&self, offset: usize, expected_id: ObjectId) -> Result<Object> {
        if offset > self.buffer.len() {
            return Err(Error::InvalidOffset(offset));
        }
        let input = &self.buffer[offset..];
        let (rest, id) =
            crate::parser::indirect_object_header(input).map_err(|_| Error::Parse(crate::ParseError::UnexpectedToken))?;
        if id != expected_id {
            return Err(Error::Parse(crate::ParseError::ObjectIdMismatch));
        }

        let (rest, value) =
            crate::parser::object_value(rest).map_err(|_| Error::Parse(crate::ParseError::UnexpectedToken))?;

        let mut object = match (&value, crate::parser::stream_keyword(rest)) {
            (Object::Dictionary(dict), Ok((after_stream, ()))) => {
                let length = self.resolve_stream_length(dict)?;
                if length > after_stream.len() {
                    return Err(Error::InvalidStream("stream extends past end of file".to_string()));
                }
                let content = after_stream[..length].to_vec();
                Object::Stream(crate::parser::make_stream(dict.clone(), content))
            }
            _ => value,
        };

        if let Some(state) = &self.encryption_state {
            let encrypt_ref = self.trailer.get(b"Encrypt").ok().and_then(|o| o.as_reference().ok());
            if encrypt_ref != Some(expected_id) {
                encryption::decrypt_object(state, expected_id, &mut object)?;
            }
        }

        Ok(object)
    }

    fn resolve_stream_length(&self, dict: &Dictionary) -> Result<usize> {
        let length_obj = dict.get(b"Length")?;
        let length = match length_obj {
            Object::Reference(id) => {
                let id = *id;
                self.get_object(id)?.as_i64()?
            }
            other => other.as_i64()?,
        };
        if length < 0 {
            return Err(Error::InvalidStream("negative /Length".to_string()));
        }
        Ok(length as usize)
    }

    fn load_compressed_object(
        &self,
        id: ObjectId,
        stream_number: u32,
        index: u32,
        already_seen: &mut HashSet<ObjectId>,
    ) -> Result<Object> {
        let container_id = (stream_number, 0);
        let container = self.load_object(container_id, already_seen)?;
        let stream = container.as_stream()?;
        let decoded = stream.decompressed_content()?;

        let n = stream.dict.get(b"N")?.as_i64()? as usize;
        let first = stream.dict.get(b"First")?.as_i64()? as usize;

        let header_text = std::str::from_utf8(&decoded[..first.min(decoded.len())])
            .map_err(|_| Error::InvalidStream("object stream header is not UTF-8".to_string()))?;
        let mut numbers = header_text.split_ascii_whitespace();
        let mut offsets = Vec::with_capacity(n);
        for _ in 0..n {
            let num: u32 = numbers.next().and_then(|s| s.parse().ok()).ok_or(Error::MissingXrefEntry)?;
            let off: usize = numbers.next().and_then(|s| s.parse().ok()).ok_or(Error::MissingXrefEntry)?;
            offsets.push((num, off));
        }

        let (_, offset) = *offsets.get(index as usize).ok_or(Error::MissingXrefEntry)?;
        let start = first + offset;
        if start > decoded.len() {
            return Err(Error::InvalidOffset(start));
        }
        crate::parser::parse_object(&decoded[start..])
    }

    /// Resolves `obj` through as many [`Object::Reference`] hops as necessary, returning the
    /// final id (the input id if `obj` was not a reference) and the resolved value.
    pub fn dereference<'o>(&self, obj: &'o Object) -> Result<(Option<ObjectId>, Object)> {
        let mut current = obj.clone();
        let mut seen = HashSet::new();
        loop {
            match current {
                Object::Reference(id) => {
                    if !seen.insert(id) {
                        return Err(Error::ReferenceCycle(id));
                    }
                    current = self.get_object(id)?;
                }
                other => return Ok((seen.iter().next().copied(), other)),
            }
        }
    }

    /// Copies `id` (and everything it transitively references) from `source` into `self`,
    /// returning the id it was assigned in `self`. Used when merging documents.
    pub fn clone_object(&mut self, source: &Document, id: ObjectId) -> Result<ObjectId> {
        let mut remap = BTreeMap::new();
        self.clone_object_inner(source, id, &mut remap)
    }

    fn clone_object_inner(
        &mut self,
        source: &Document,
        id: ObjectId,
        remap: &mut BTreeMap<ObjectId, ObjectId>,
    ) -> Result<ObjectId> {
        if let Some(new_id) = remap.get(&id) {
            return Ok(*new_id);
        }
        let new_id = (self.max_object_id() + 1, 0);
        remap.insert(id, new_id);
        self.xref.max_object_number = self.xref.max_object_number.max(new_id.0);

        let mut obj = source.get_object(id)?;
        self.remap_references(source, &mut obj, remap)?;
        self.objects.borrow_mut().insert(new_id, obj);
        Ok(new_id)
    }

    fn remap_references(
        &mut self,
        source: &Document,
        obj: &mut Object,
        remap: &mut BTreeMap<ObjectId, ObjectId>,
    ) -> Result<()> {
        match obj {
            Object::Reference(id) => {
                *id = self.clone_object_inner(source, *id, remap)?;
            }
            Object::Array(items) => {
                for item in items {
                    self.remap_references(source, item, remap)?;
                }
            }
            Object::Dictionary(dict) => {
                for (_, value) in dict.iter_mut() {
                    self.remap_references(source, value, remap)?;
                }
            }
            Object::Stream(stream) => {
                for (_, value) in stream.dict.iter_mut() {
                    self.remap_references(source, value, remap)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Takes `id` out of `source` into `self` without remapping references, for when `source` is
    /// being consumed wholesale and ids are known not to collide (e.g. incremental update merges).
    pub fn take_object(&mut self, source: &Document, id: ObjectId) -> Result<ObjectId> {
        let obj = source.get_object(id)?;
        self.objects.borrow_mut().insert(id, obj);
        self.xref.max_object_number = self.xref.max_object_number.max(id.0);
        Ok(id)
    }

    pub fn is_encrypted(&self) -> bool {
        self.trailer.get(b"Encrypt").is_ok()
    }

    /// Returns the document's `/Encrypt` dictionary, dereferencing it if the trailer stores it as
    /// an indirect reference.
    pub fn get_encrypted(&self) -> Result<Dictionary> {
        let obj = self.trailer.get(b"Encrypt")?;
        let (_, resolved) = self.dereference(obj)?;
        resolved.as_dict().cloned()
    }

    /// Builds the `{name -> CryptFilter}` map described by `/Encrypt`'s `/CF` entry (spec §4.10).
    pub fn get_crypt_filters(&self) -> BTreeMap<Vec<u8>, Arc<dyn CryptFilter>> {
        let mut out = BTreeMap::new();
        let Ok(encrypted) = self.get_encrypted() else { return out };
        let Ok(cf) = encrypted.get(b"CF").and_then(Object::as_dict) else { return out };
        for (name, filter_obj) in cf.iter() {
            let Ok(filter_dict) = filter_obj.as_dict() else { continue };
            let cfm = filter_dict.get(b"CFM").and_then(Object::as_name).unwrap_or(b"Identity");
            let filter: Arc<dyn CryptFilter> = match cfm {
                b"V2" => Arc::new(Rc4CryptFilter),
                b"AESV2" => Arc::new(Aes128CryptFilter),
                b"AESV3" => Arc::new(Aes256CryptFilter),
                _ => Arc::new(IdentityCryptFilter),
            };
            out.insert(name.clone(), filter);
        }
        out
    }

    /// Forces every object reachable through the xref table into the cache, used before
    /// `encrypt`/`decrypt` need to mutate every object in place, and before the writer serializes
    /// the whole document.
    pub(crate) fn load_all_objects(&self) -> Result<()> {
        let ids: Vec<ObjectId> = self
            .xref
            .iter()
            .filter_map(|(num, entry)| match entry {
                XrefEntry::Normal { generation, .. } => Some((num, generation)),
                _ => None,
            })
            .collect();
        for id in ids {
            if !self.objects.borrow().contains_key(&id) {
                let _ = self.get_object(id);
            }
        }
        Ok(())
    }

    /// Encrypts every object in the document under `state` and installs the `/Encrypt` dictionary
    /// plus a file `/ID` if one is not already present (spec §4.10/§4.11).
    pub fn encrypt(&mut self, state: &EncryptionState) -> Result<()> {
        if self.pdfa_flavor.is_some() {
            return Err(Error::Policy);
        }
        self.load_all_objects()?;

        if !self.trailer.has(b"ID") {
            let mut id = [0u8; 16];
            rand::RngCore::fill_bytes(&mut rand::rng(), &mut id);
            let id_obj = Object::Array(vec![Object::string_literal(id.to_vec()), Object::string_literal(id.to_vec())]);
            self.trailer.set("ID", id_obj);
        }

        let encrypt_dict = state.encode()?;
        let encrypt_id = self.add_object(Object::Dictionary(encrypt_dict));

        let mut objects = self.objects.borrow_mut();
        for (id, obj) in objects.iter_mut() {
            if *id == encrypt_id {
                continue;
            }
            encryption::encrypt_object(state, *id, obj)?;
        }
        drop(objects);

        self.trailer.set("Encrypt", Object::Reference(encrypt_id));
        self.encryption_state = Some(state.clone());
        Ok(())
    }

    /// Authenticates `password` against the document's `/Encrypt` dictionary and decrypts every
    /// object in place.
    pub fn decrypt<P: AsRef<[u8]>>(&mut self, password: P) -> Result<()> {
        let state = EncryptionState::decode(self, password)?;
        self.load_all_objects()?;

        let mut objects = self.objects.borrow_mut();
        for (id, obj) in objects.iter_mut() {
            encryption::decrypt_object(&state, *id, obj)?;
        }
        drop(objects);

        self.trailer.remove(b"Encrypt");
        self.encryption_state = None;
        Ok(())
    }

    /// Tags the document as a PDF/A flavor, refusing if it is (or becomes) encrypted — the two
    /// are mutually exclusive (spec §4.11).
    pub fn set_pdfa_flavor(&mut self, flavor: PdfAFlavor) -> Result<()> {
        if self.is_encrypted() {
            return Err(Error::Policy);
        }
        self.pdfa_flavor = Some(flavor);
        Ok(())
    }

    pub fn pdfa_flavor(&self) -> Option<PdfAFlavor> {
        self.pdfa_flavor
    }

    /// The catalog dictionary (`/Root` in the trailer).
    pub fn catalog(&self) -> Result<Dictionary> {
        let root = self.trailer.get(b"Root")?;
        let (_, resolved) = self.dereference(root)?;
        resolved.as_dict().cloned()
    }

    /// Every page object id, in document order, walking the `/Pages` tree.
    pub fn get_pages(&self) -> Result<Vec<ObjectId>> {
        let catalog = self.catalog()?;
        let root_ref = catalog.get(b"Pages")?.as_reference()?;
        let mut pages = Vec::new();
        let mut stack = vec![root_ref];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let node = self.get_object(id)?;
            let dict = node.as_dict()?;
            match dict.get_type() {
                Ok(b"Pages") => {
                    let kids = dict.get(b"Kids")?.as_array()?;
                    for kid in kids.iter().rev() {
                        stack.push(kid.as_reference()?);
                    }
                }
                _ => pages.push(id),
            }
        }
        Ok(pages)
    }

    pub fn get_page_contents(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let page = self.get_object(page_id)?;
        let dict = page.as_dict()?;
        let contents = dict.get(b"Contents")?;
        let mut out = Vec::new();
        match contents {
            Object::Reference(id) => {
                let stream = self.get_object(*id)?;
                out.extend(stream.as_stream()?.decompressed_content()?);
            }
            Object::Array(refs) => {
                for r in refs {
                    let id = r.as_reference()?;
                    let stream = self.get_object(id)?;
                    out.extend(stream.as_stream()?.decompressed_content()?);
                    out.push(b'\n');
                }
            }
            _ => return Err(Error::Type("stream or array of streams")),
        }
        Ok(out)
    }

    /// Extracts the literal text operands of every `Tj`/`TJ` operator on `page_id`, concatenated
    /// with no layout awareness (spec §1 Non-goal: no layout-aware extraction).
    pub fn extract_text(&self, page_id: ObjectId) -> Result<String> {
        let raw = self.get_page_contents(page_id)?;
        let content = crate::content::Content::decode(&raw)?;
        let mut out = String::new();
        for op in &content.operations {
            match op.operator.as_str() {
                "Tj" => {
                    if let Some(Object::String(s, _)) = op.operands.first() {
                        out.push_str(&String::from_utf8_lossy(s));
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = op.operands.first() {
                        for item in items {
                            if let Object::String(s, _) = item {
                                out.push_str(&String::from_utf8_lossy(s));
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(out)
    }

    /// Replaces every literal occurrence of `from` with `to` inside the `Tj`/`TJ` text-showing
    /// operators of `page_id`'s content stream, re-encoding and writing the stream back.
    pub fn replace_text(&mut self, page_id: ObjectId, from: &str, to: &str) -> Result<()> {
        let raw = self.get_page_contents(page_id)?;
        let mut content = crate::content::Content::decode(&raw)?;
        for op in &mut content.operations {
            match op.operator.as_str() {
                "Tj" => {
                    if let Some(Object::String(s, _)) = op.operands.first_mut() {
                        let replaced = String::from_utf8_lossy(s).replace(from, to);
                        *s = replaced.into_bytes();
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = op.operands.first_mut() {
                        for item in items {
                            if let Object::String(s, _) = item {
                                let replaced = String::from_utf8_lossy(s).replace(from, to);
                                *s = replaced.into_bytes();
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        let new_bytes = content.encode();

        let page = self.get_object(page_id)?;
        let dict = page.as_dict()?;
        let contents = dict.get(b"Contents")?;
        match contents {
            Object::Reference(id) => {
                let id = *id;
                let mut stream_obj = self.get_object(id)?;
                let stream = stream_obj.as_stream_mut()?;
                stream.set_plain_content(new_bytes);
                self.set_object(id, stream_obj);
            }
            Object::Array(refs) => {
                let first_id = refs.first().ok_or(Error::Type("non-empty contents array"))?.as_reference()?;
                let mut stream_obj = self.get_object(first_id)?;
                let stream = stream_obj.as_stream_mut()?;
                stream.set_plain_content(new_bytes);
                self.set_object(first_id, stream_obj);
                for r in &refs.clone()[1..] {
                    let id = r.as_reference()?;
                    let mut empty = self.get_object(id)?;
                    empty.as_stream_mut()?.set_plain_content(Vec::new());
                    self.set_object(id, empty);
                }
            }
            _ => return Err(Error::Type("stream or array of streams")),
        }
        Ok(())
    }
}

/// Builds an empty, minimal single-page document (an empty `/Pages` tree with one blank page and
/// a catalog), used as the document-construction starting point for `creator::tests`.
pub(crate) fn minimal_document() -> Document {
    let mut doc = Document::new();
    let pages_id = (2, 0);
    let page_id = (3, 0);

    let page = dictionary! {
        "Type" => Object::name("Page"),
        "Parent" => Object::Reference(pages_id),
        "Resources" => Object::Dictionary(Dictionary::new()),
        "MediaBox" => Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
    };
    doc.set_object(page_id, Object::Dictionary(page));

    let pages = dictionary! {
        "Type" => Object::name("Pages"),
        "Kids" => Object::Array(vec![Object::Reference(page_id)]),
        "Count" => Object::Integer(1),
    };
    doc.set_object(pages_id, Object::Dictionary(pages));

    let catalog = dictionary! {
        "Type" => Object::name("Catalog"),
        "Pages" => Object::Reference(pages_id),
    };
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.trailer.set("Size", Object::Integer(doc.max_object_id() as i64 + 1));

    doc
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
