//! Serializes a [`Document`] back to PDF bytes (spec §4.7 write side, ISO 32000-2 7.5): either a
//! classic `xref` table plus `trailer` keyword, or a single cross-reference stream, optionally
//! with ordinary objects packed into [`ObjectStreamBuilder`] containers. The write-side mirror of
//! `reader::read_document` and `reader::xref_stream::decode`.

mod object_stream;

pub use object_stream::{ObjectStream, ObjectStreamBuilder, ObjectStreamConfig};

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::document::Document;
use crate::object::{Object, ObjectId};
use crate::{Dictionary, Error, Result, Stream, StringFormat};

/// Controls the shape of bytes `Document::save*` produces. The default matches what the teacher's
/// `bench_save_standard` exercises: a classic xref table, nothing packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    use_xref_streams: bool,
    use_object_streams: bool,
    object_stream_config: ObjectStreamConfig,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions {
            use_xref_streams: false,
            use_object_streams: false,
            object_stream_config: ObjectStreamConfig::default(),
        }
    }
}

impl SaveOptions {
    pub fn builder() -> SaveOptionsBuilder {
        SaveOptionsBuilder::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptionsBuilder {
    options: SaveOptions,
}

impl SaveOptionsBuilder {
    pub fn use_xref_streams(mut self, yes: bool) -> Self {
        self.options.use_xref_streams = yes;
        self
    }

    /// Object streams can only be indexed by a cross-reference *stream* (a classic `xref` table
    /// has no entry type for them), so turning this on implies `use_xref_streams(true)` too.
    pub fn use_object_streams(mut self, yes: bool) -> Self {
        self.options.use_object_streams = yes;
        self
    }

    pub fn object_stream_config(mut self, config: ObjectStreamConfig) -> Self {
        self.options.object_stream_config = config;
        self
    }

    pub fn build(self) -> SaveOptions {
        let mut options = self.options;
        if options.use_object_streams {
            options.use_xref_streams = true;
        }
        options
    }
}

impl Document {
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        self.save_to(&mut file)
    }

    pub fn save_to<W: Write>(&mut self, target: &mut W) -> Result<()> {
        self.save_with_options(target, SaveOptions::default())
    }

    pub fn save_with_options<W: Write>(&mut self, target: &mut W, options: SaveOptions) -> Result<()> {
        write_document(self, target, options)
    }
}

/// An object's final disposition in the file being written.
enum ResolvedEntry {
    Free,
    Normal { offset: u64, generation: u16 },
    Compressed { container: u32, index: u32 },
}

fn write_document<W: Write>(document: &mut Document, target: &mut W, options: SaveOptions) -> Result<()> {
    document.load_all_objects()?;

    let mut objects: Vec<(ObjectId, Object)> =
        document.objects.borrow().iter().map(|(id, obj)| (*id, obj.clone())).collect();
    objects.sort_by_key(|(id, _)| *id);

    let encrypt_id = document.trailer.get(b"Encrypt").ok().and_then(|o| o.as_reference().ok());
    let mut next_object_number = document.max_object_id() + 1;

    let mut direct: Vec<(ObjectId, Object)> = Vec::new();
    let mut containers: Vec<(ObjectId, Stream)> = Vec::new();
    let mut compressed_of: BTreeMap<u32, (u32, u32)> = BTreeMap::new();

    let mut builder = ObjectStreamBuilder::new(options.object_stream_config);
    for (id, object) in objects {
        let packable = options.use_object_streams
            && id.1 == 0
            && !matches!(object, Object::Stream(_))
            && Some(id) != encrypt_id;
        if !packable {
            direct.push((id, object));
            continue;
        }
        if builder.is_full() {
            flush_object_stream(
                &mut builder,
                options.object_stream_config,
                &mut next_object_number,
                &mut containers,
                &mut compressed_of,
            )?;
        }
        builder.push(id, object)?;
    }
    flush_object_stream(
        &mut builder,
        options.object_stream_config,
        &mut next_object_number,
        &mut containers,
        &mut compressed_of,
    )?;

    let mut out = CountingWriter::new(target);
    write!(out, "%PDF-{}.{}\n", document.version.0, document.version.1)?;
    out.write_all(b"%\xE2\xE3\xCF\xD3\n")?;

    let mut normal_entries: BTreeMap<u32, (u64, u16)> = BTreeMap::new();
    for (id, object) in &direct {
        let offset = out.count();
        write_indirect_object(&mut out, *id, object)?;
        normal_entries.insert(id.0, (offset, id.1));
    }
    for (id, stream) in &containers {
        let offset = out.count();
        write_indirect_object(&mut out, *id, &Object::Stream(stream.clone()))?;
        normal_entries.insert(id.0, (offset, id.1));
    }

    let highest = normal_entries.keys().next_back().copied().unwrap_or(0).max(
        compressed_of.keys().next_back().copied().unwrap_or(0),
    );

    // A full save rewrites the whole file in one pass, so any `/Prev`/`/XRefStm` carried over
    // from an incremental-update chain the document was originally loaded from no longer names a
    // valid offset into these freshly written bytes.
    let mut base_trailer = document.trailer.clone();
    base_trailer.remove(b"Prev");
    base_trailer.remove(b"XRefStm");

    if options.use_xref_streams {
        let xref_id = next_object_number;
        next_object_number += 1;
        let size = highest.max(xref_id) + 1;

        let mut entries = BTreeMap::new();
        entries.insert(0u32, ResolvedEntry::Free);
        for (num, (offset, generation)) in &normal_entries {
            entries.insert(*num, ResolvedEntry::Normal { offset: *offset, generation: *generation });
        }
        for (num, (container, index)) in &compressed_of {
            entries.insert(*num, ResolvedEntry::Compressed { container: *container, index: *index });
        }

        // The cross-reference stream lists its own offset too, so compute it before building the
        // entry table rather than after, and insert a self-entry ahead of the generic free fill.
        let xref_offset = out.count();
        entries.insert(xref_id, ResolvedEntry::Normal { offset: xref_offset, generation: 0 });
        for num in 1..size {
            entries.entry(num).or_insert(ResolvedEntry::Free);
        }

        write_xref_stream(&mut out, &base_trailer, xref_id, size, &entries)?;
        write!(out, "startxref\n{xref_offset}\n%%EOF")?;
    } else {
        let size = highest + 1;
        let xref_offset = out.count();
        write_classic_xref(&mut out, &normal_entries, size)?;

        let mut trailer = base_trailer;
        trailer.set("Size", Object::Integer(size as i64));
        out.write_all(b"trailer\n")?;
        write_value(&Object::Dictionary(trailer), &mut out)?;
        write!(out, "\nstartxref\n{xref_offset}\n%%EOF")?;
    }

    Ok(())
}

fn flush_object_stream(
    builder: &mut ObjectStreamBuilder,
    config: ObjectStreamConfig,
    next_object_number: &mut u32,
    containers: &mut Vec<(ObjectId, Stream)>,
    compressed_of: &mut BTreeMap<u32, (u32, u32)>,
) -> Result<()> {
    if builder.is_empty() {
        return Ok(());
    }
    let taken = std::mem::replace(builder, ObjectStreamBuilder::new(config));
    let (stream, order) = taken.build()?;

    let container_id = (*next_object_number, 0);
    *next_object_number += 1;
    for (index, id) in order.iter().enumerate() {
        compressed_of.insert(id.0, (container_id.0, index as u32));
    }
    containers.push((container_id, stream));
    Ok(())
}

fn write_indirect_object<W: Write>(out: &mut W, id: ObjectId, object: &Object) -> Result<()> {
    write!(out, "{} {} obj\n", id.0, id.1)?;
    match object {
        Object::Stream(stream) => {
            let mut dict = stream.dict.clone();
            dict.set("Length", Object::Integer(stream.content.len() as i64));
            write_value(&Object::Dictionary(dict), out)?;
            out.write_all(b"\nstream\n")?;
            out.write_all(&stream.content)?;
            out.write_all(b"\nendstream")?;
        }
        other => write_value(other, out)?,
    }
    out.write_all(b"\nendobj\n")?;
    Ok(())
}

/// Serializes a PDF value, including [`Object::Reference`] (`"N G R"`), which
/// `content::write_object` deliberately rejects since references can't appear as content-stream
/// operands. A bare [`Object::Stream`] is only valid as the direct value of an indirect object;
/// see [`write_indirect_object`].
pub(crate) fn write_value<W: Write>(object: &Object, out: &mut W) -> Result<()> {
    match object {
        Object::Null => out.write_all(b"null")?,
        Object::Boolean(b) => out.write_all(if *b { b"true" } else { b"false" })?,
        Object::Integer(i) => write!(out, "{i}")?,
        Object::Real(f) => write!(out, "{f}")?,
        Object::Name(n) => {
            out.write_all(b"/")?;
            out.write_all(n)?;
        }
        Object::String(s, StringFormat::Literal) => {
            out.write_all(b"(")?;
            for &b in s {
                if b == b'(' || b == b')' || b == b'\\' {
                    out.write_all(b"\\")?;
                }
                out.write_all(&[b])?;
            }
            out.write_all(b")")?;
        }
        Object::String(s, StringFormat::Hexadecimal) => {
            out.write_all(b"<")?;
            for &b in s {
                write!(out, "{b:02X}")?;
            }
            out.write_all(b">")?;
        }
        Object::Array(items) => {
            out.write_all(b"[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_all(b" ")?;
                }
                write_value(item, out)?;
            }
            out.write_all(b"]")?;
        }
        Object::Dictionary(dict) => {
            out.write_all(b"<<")?;
            for (key, value) in dict.iter() {
                out.write_all(b"/")?;
                out.write_all(key)?;
                out.write_all(b" ")?;
                write_value(value, out)?;
            }
            out.write_all(b">>")?;
        }
        Object::Reference(id) => write!(out, "{} {} R", id.0, id.1)?,
        Object::Stream(_) => {
            return Err(Error::Unimplemented("a stream can only be written as a top-level indirect object"))
        }
    }
    Ok(())
}

fn write_classic_xref<W: Write>(out: &mut W, normal_entries: &BTreeMap<u32, (u64, u16)>, size: u32) -> Result<()> {
    // Every object number in 0..size needs an entry, "f" for gaps, so the table's /Size stays
    // accurate and readers don't trip over a missing subsection.
    let numbers: Vec<u32> = (0..size).collect();

    out.write_all(b"xref\n")?;
    let mut i = 0;
    while i < numbers.len() {
        let start = numbers[i];
        let mut j = i;
        while j + 1 < numbers.len() && numbers[j + 1] == numbers[j] + 1 {
            j += 1;
        }
        write!(out, "{} {}\n", start, j - i + 1)?;
        for &num in &numbers[i..=j] {
            // Each entry must be exactly 20 bytes: 10-digit offset, SP, 5-digit generation, SP,
            // keyword, then the 2-byte eol `\r\n` (ISO 32000-2 7.5.4).
            match normal_entries.get(&num) {
                Some((offset, generation)) => write!(out, "{offset:010} {generation:05} n\r\n")?,
                None => write!(out, "{:010} {:05} f\r\n", 0, 65535)?,
            }
        }
        i = j + 1;
    }
    Ok(())
}

fn write_xref_stream<W: Write>(
    out: &mut W,
    base_trailer: &Dictionary,
    xref_id: u32,
    size: u32,
    entries: &BTreeMap<u32, ResolvedEntry>,
) -> Result<()> {
    let mut content = Vec::with_capacity(entries.len() * 7);
    for entry in entries.values() {
        match entry {
            ResolvedEntry::Free => {
                content.push(0);
                content.extend_from_slice(&0u32.to_be_bytes());
                content.extend_from_slice(&65535u16.to_be_bytes());
            }
            ResolvedEntry::Normal { offset, generation } => {
                content.push(1);
                content.extend_from_slice(&(*offset as u32).to_be_bytes());
                content.extend_from_slice(&generation.to_be_bytes());
            }
            ResolvedEntry::Compressed { container, index } => {
                content.push(2);
                content.extend_from_slice(&container.to_be_bytes());
                content.extend_from_slice(&(*index as u16).to_be_bytes());
            }
        }
    }

    let compressed = crate::filters::encode_flate(&content)?;

    let mut dict = base_trailer.clone();
    dict.set("Type", Object::name("XRef"));
    dict.set("Size", Object::Integer(size as i64));
    dict.set("W", Object::Array(vec![1.into(), 4.into(), 2.into()]));
    dict.set("Filter", Object::name("FlateDecode"));

    let stream = Stream::new(dict, compressed);
    write_indirect_object(out, (xref_id, 0), &Object::Stream(stream))?;
    Ok(())
}

struct CountingWriter<'w, W: Write> {
    inner: &'w mut W,
    count: u64,
}

impl<'w, W: Write> CountingWriter<'w, W> {
    fn new(inner: &'w mut W) -> Self {
        CountingWriter { inner, count: 0 }
    }

    fn count(&self) -> u64 {
        self.count
    }
}

impl<'w, W: Write> Write for CountingWriter<'w, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creator;

    #[test]
    fn classic_save_round_trips_through_load_mem() {
        let mut doc = creator::tests::create_document();
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();

        let loaded = Document::load_mem(buffer).unwrap();
        let pages = loaded.get_pages().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(loaded.extract_text(pages[0]).unwrap(), "Hello");
    }

    #[test]
    fn xref_stream_save_round_trips_through_load_mem() {
        let mut doc = creator::tests::create_document();
        let options = SaveOptions::builder().use_xref_streams(true).build();
        let mut buffer = Vec::new();
        doc.save_with_options(&mut buffer, options).unwrap();

        let loaded = Document::load_mem(buffer).unwrap();
        let pages = loaded.get_pages().unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn object_stream_save_packs_non_stream_objects() {
        let mut doc = creator::tests::create_document();
        let options = SaveOptions::builder().use_object_streams(true).build();
        let mut buffer = Vec::new();
        doc.save_with_options(&mut buffer, options).unwrap();

        let loaded = Document::load_mem(buffer).unwrap();
        let catalog = loaded.catalog().unwrap();
        assert!(catalog.has_type(b"Catalog"));
        let pages = loaded.get_pages().unwrap();
        assert_eq!(loaded.extract_text(pages[0]).unwrap(), "Hello");
    }
}
