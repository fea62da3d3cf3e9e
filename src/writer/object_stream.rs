//! Object-stream packing (spec §4.6, ISO 32000-2 7.5.7): bundles several non-stream indirect
//! objects into one compressed container, amortizing per-object overhead. Mirrors the teacher's
//! object-stream handling on the read side; this is the write-side counterpart the teacher's
//! `benches/object_stream.rs` exercises.

use crate::{filters, Dictionary, Error, Object, ObjectId, Result, Stream};

/// Packing policy for [`ObjectStreamBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectStreamConfig {
    /// Caps how many objects one container holds before the writer must start a new one — real
    /// readers have no hard limit, but capping keeps a single container (and therefore the
    /// amount that must be re-inflated to reach any one object in it) bounded.
    pub max_objects_per_stream: usize,
    /// Whether the container itself is `/Filter /FlateDecode`-compressed.
    pub compress: bool,
}

impl Default for ObjectStreamConfig {
    fn default() -> Self {
        ObjectStreamConfig { max_objects_per_stream: 200, compress: true }
    }
}

/// Accumulates objects for one container stream, flushing into a [`Stream`] once full or on
/// explicit [`ObjectStreamBuilder::build`].
#[derive(Debug, Default)]
pub struct ObjectStreamBuilder {
    config: ObjectStreamConfig,
    pending: Vec<(ObjectId, Object)>,
}

impl ObjectStreamBuilder {
    pub fn new(config: ObjectStreamConfig) -> Self {
        ObjectStreamBuilder { config, pending: Vec::new() }
    }

    /// Queues `object` under `id`. Streams and objects with a non-zero generation cannot live in
    /// an object stream (ISO 32000-2 7.5.7); callers should write those as normal indirect
    /// objects instead.
    pub fn push(&mut self, id: ObjectId, object: Object) -> Result<()> {
        if matches!(object, Object::Stream(_)) {
            return Err(Error::Unimplemented("streams cannot be packed into an object stream"));
        }
        if id.1 != 0 {
            return Err(Error::Unimplemented("only generation 0 objects can be packed into an object stream"));
        }
        self.pending.push((id, object));
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.config.max_objects_per_stream
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Builds the container stream: a header of `num offset` pairs (one per packed object,
    /// offset relative to `/First`) followed by the objects' serialized values back to back.
    pub fn build(self) -> Result<(Stream, Vec<ObjectId>)> {
        let order: Vec<ObjectId> = self.pending.iter().map(|(id, _)| *id).collect();
        let mut bodies = Vec::new();
        let mut header = String::new();
        let mut offset = 0usize;
        for (id, object) in &self.pending {
            let mut body = Vec::new();
            super::write_value(object, &mut body)?;
            body.push(b'\n');
            header.push_str(&format!("{} {} ", id.0, offset));
            offset += body.len();
            bodies.push(body);
        }

        let mut content = header.into_bytes();
        let first = content.len();
        for body in bodies {
            content.extend(body);
        }

        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("ObjStm"));
        dict.set("N", Object::Integer(self.pending.len() as i64));
        dict.set("First", Object::Integer(first as i64));

        let final_content = if self.config.compress {
            dict.set("Filter", Object::name("FlateDecode"));
            filters::encode_flate(&content)?
        } else {
            content
        };
        dict.set("Length", Object::Integer(final_content.len() as i64));

        Ok((Stream::new(dict, final_content), order))
    }
}

/// A decoded object-stream container: every `(id, object)` pair it holds, in on-disk order.
/// Provided for parity with the teacher's read-side `ObjectStream`; `Document::get_object`
/// decodes compressed objects one at a time instead of eagerly through this type, since eager
/// whole-container decode would defeat the point of lazy loading for large containers.
#[derive(Debug, Clone, Default)]
pub struct ObjectStream {
    pub objects: Vec<(ObjectId, Object)>,
}

impl ObjectStream {
    pub fn decode(stream: &Stream) -> Result<Self> {
        let decoded = stream.decompressed_content()?;
        let n = stream.dict.get(b"N")?.as_i64()? as usize;
        let first = stream.dict.get(b"First")?.as_i64()? as usize;

        let header_text = std::str::from_utf8(&decoded[..first.min(decoded.len())])
            .map_err(|_| Error::InvalidStream("object stream header is not UTF-8".to_string()))?;
        let mut numbers = header_text.split_ascii_whitespace();
        let mut objects = Vec::with_capacity(n);
        for _ in 0..n {
            let num: u32 = numbers.next().and_then(|s| s.parse().ok()).ok_or(Error::MissingXrefEntry)?;
            let off: usize = numbers.next().and_then(|s| s.parse().ok()).ok_or(Error::MissingXrefEntry)?;
            let start = first + off;
            if start > decoded.len() {
                return Err(Error::InvalidOffset(start));
            }
            let object = crate::parser::parse_object(&decoded[start..])?;
            objects.push(((num, 0), object));
        }
        Ok(ObjectStream { objects })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_and_decodes_three_objects() {
        let mut builder = ObjectStreamBuilder::new(ObjectStreamConfig { compress: false, ..Default::default() });
        builder.push((1, 0), Object::Integer(42)).unwrap();
        builder.push((2, 0), Object::name("Catalog")).unwrap();
        builder.push((3, 0), Object::Array(vec![1.into(), 2.into()])).unwrap();
        let (stream, order) = builder.build().unwrap();
        assert_eq!(order, vec![(1, 0), (2, 0), (3, 0)]);

        let decoded = ObjectStream::decode(&stream).unwrap();
        assert_eq!(decoded.objects.len(), 3);
        assert_eq!(decoded.objects[0], ((1, 0), Object::Integer(42)));
        assert_eq!(decoded.objects[1].1, Object::name("Catalog"));
    }

    #[test]
    fn rejects_packing_a_stream() {
        let mut builder = ObjectStreamBuilder::new(ObjectStreamConfig::default());
        let inner = Stream::new(Dictionary::new(), vec![1, 2, 3]);
        assert!(builder.push((1, 0), Object::Stream(inner)).is_err());
    }
}
