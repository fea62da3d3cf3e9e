mod dictionary;

pub use dictionary::Dictionary;

use crate::{Error, Result, Stream};

/// Object number and generation number, e.g. `12 0` in `12 0 obj`.
pub type ObjectId = (u32, u16);

/// Dynamic, ordered sequence of [`Object`]s. Grows like any `Vec`; the spec's "steps of at
/// least 4" growth policy is `Vec`'s own amortized-doubling growth, which already does at
/// least as well.
pub type Array = Vec<Object>;

/// Whether a string was written with `(`...`)` literal syntax or `<`...`>` hex syntax. Both
/// decode to the same byte sequence; the format is kept only so the writer can round-trip the
/// original representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFormat {
    Literal,
    Hexadecimal,
}

/// A PDF value: the tagged union described in spec.md §3. All variants share a single type and
/// a single destructor (Rust's ordinary drop glue) rather than per-kind heap classes, matching
/// the "polymorphism over value kinds" design note.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(Vec<u8>),
    String(Vec<u8>, StringFormat),
    Array(Array),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
}

impl Object {
    pub fn string_literal<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::String(s.into(), StringFormat::Literal)
    }

    pub fn name<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::Name(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Object::Boolean(b) => Ok(*b),
            _ => Err(Error::Type("boolean")),
        }
    }

    /// Numbers are stored as either `Integer(i64)` or `Real(f64)`; most callers don't care which,
    /// so both coerce to `i64` (truncating) and `f64` here.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(i) => Ok(*i),
            Object::Real(f) => Ok(*f as i64),
            Object::Reference((num, _)) => Ok(*num as i64),
            _ => Err(Error::Type("integer")),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(f) => Ok(*f),
            _ => Err(Error::Type("number")),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(n) => Ok(n),
            _ => Err(Error::Type("name")),
        }
    }

    pub fn as_name_str(&self) -> Result<&str> {
        self.as_name()
            .and_then(|n| std::str::from_utf8(n).map_err(|_| Error::Type("utf8 name")))
    }

    /// Raw bytes of a literal or hex string, regardless of which syntax it was written with.
    pub fn as_str(&self) -> Result<&[u8]> {
        match self {
            Object::String(s, _) => Ok(s),
            _ => Err(Error::Type("string")),
        }
    }

    pub fn as_str_mut(&mut self) -> Result<&mut Vec<u8>> {
        match self {
            Object::String(s, _) => Ok(s),
            _ => Err(Error::Type("string")),
        }
    }

    pub fn as_array(&self) -> Result<&Array> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(Error::Type("array")),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Array> {
        match self {
            Object::Array(a) => Ok(a),
            _ => Err(Error::Type("array")),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&s.dict),
            _ => Err(Error::Type("dictionary")),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&mut s.dict),
            _ => Err(Error::Type("dictionary")),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::Type("stream")),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            _ => Err(Error::Type("stream")),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            _ => Err(Error::Type("reference")),
        }
    }

    /// The value of `/Type` on a dictionary or stream-dictionary object, if present.
    pub fn type_name(&self) -> Result<&[u8]> {
        self.as_dict()?.get_type()
    }

    pub fn has_type(&self, name: &[u8]) -> bool {
        self.type_name().map(|t| t == name).unwrap_or(false)
    }

    /// Reads a 4-number `[llx lly urx ury]` rectangle array.
    pub fn as_rectangle(&self) -> Result<[f64; 4]> {
        let arr = self.as_array()?;
        if arr.len() != 4 {
            return Err(Error::Data("rectangle array must have exactly 4 elements".into()));
        }
        let mut out = [0.0; 4];
        for (slot, value) in out.iter_mut().zip(arr.iter()) {
            *slot = value.as_f64()?;
        }
        Ok(out)
    }

    pub fn rectangle(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Object::Array(vec![
            Object::Real(llx),
            Object::Real(lly),
            Object::Real(urx),
            Object::Real(ury),
        ])
    }
}

macro_rules! object_from {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Object {
            fn from(value: $ty) -> Self {
                Object::$variant(value.into())
            }
        }
    };
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::Boolean(value)
    }
}
object_from!(i64, Integer);
object_from!(i32, Integer);
object_from!(u32, Integer);
object_from!(f64, Real);
object_from!(f32, Real);
object_from!(Dictionary, Dictionary);
object_from!(Array, Array);
object_from!(Stream, Stream);
object_from!(ObjectId, Reference);

impl From<&str> for Object {
    fn from(value: &str) -> Self {
        Object::string_literal(value)
    }
}

impl From<String> for Object {
    fn from(value: String) -> Self {
        Object::string_literal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_coerce_between_integer_and_real() {
        assert_eq!(Object::Integer(5).as_f64().unwrap(), 5.0);
        assert_eq!(Object::Real(5.9).as_i64().unwrap(), 5);
    }

    #[test]
    fn rectangle_round_trips() {
        let rect = Object::rectangle(0.0, 0.0, 612.0, 792.0);
        assert_eq!(rect.as_rectangle().unwrap(), [0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn wrong_variant_is_a_type_error() {
        assert!(Object::Null.as_i64().is_err());
        assert!(matches!(Object::Null.as_i64(), Err(Error::Type("integer"))));
    }
}
