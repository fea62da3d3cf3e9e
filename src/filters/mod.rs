//! Stream filter pipeline (spec §4.8). `/Filter` may be a single name or an array of names,
//! applied left to right on encode and walked in the same order on decode since every filter in
//! this pipeline is invertible per-stage; `/DecodeParms` (or `/DP`) parallels `/Filter` the same
//! way, one entry per filter, `Object::Null` or a missing entry meaning "no parameters".

mod ascii;
mod flate;
mod lzw;
mod passthrough;
mod predictor;

use crate::{Dictionary, Object, Result};

/// A single named filter and its (already-resolved) parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    FlateDecode,
    LzwDecode,
    Ascii85Decode,
    AsciiHexDecode,
    RunLengthDecode,
    DctDecode,
    Jbig2Decode,
    JpxDecode,
    CcittFaxDecode,
}

impl Filter {
    fn from_name(name: &[u8]) -> Option<Self> {
        Some(match name {
            b"FlateDecode" | b"Fl" => Filter::FlateDecode,
            b"LZWDecode" | b"LZW" => Filter::LzwDecode,
            b"ASCII85Decode" | b"A85" => Filter::Ascii85Decode,
            b"ASCIIHexDecode" | b"AHx" => Filter::AsciiHexDecode,
            b"RunLengthDecode" | b"RL" => Filter::RunLengthDecode,
            b"DCTDecode" | b"DCT" => Filter::DctDecode,
            b"JBIG2Decode" => Filter::Jbig2Decode,
            b"JPXDecode" => Filter::JpxDecode,
            b"CCITTFaxDecode" | b"CCF" => Filter::CcittFaxDecode,
            _ => return None,
        })
    }

    /// Whether this filter is invertible in this crate (image/fax codecs are passed through
    /// untouched — see spec §4.8's non-goal on image codec decoding).
    fn is_decodable(self) -> bool {
        !matches!(
            self,
            Filter::DctDecode | Filter::Jbig2Decode | Filter::JpxDecode | Filter::CcittFaxDecode
        )
    }
}

/// The names in `/Filter`, normalized to a `Vec` regardless of whether the dictionary wrote a
/// single name or an array. Exposed so the encryption module can check for an overriding
/// `/Crypt` filter without duplicating the name/array normalization.
pub fn stream_filter_names(dict: &Dictionary) -> Result<Vec<Vec<u8>>> {
    filter_names(dict)
}

fn filter_names(dict: &Dictionary) -> Result<Vec<Vec<u8>>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => Ok(vec![name.clone()]),
        Ok(Object::Array(names)) => names.iter().map(|o| o.as_name().map(|n| n.to_vec())).collect(),
        Ok(_) => Err(crate::Error::Filter("/Filter must be a name or array of names".into())),
        Err(_) => Ok(Vec::new()),
    }
}

fn decode_parms(dict: &Dictionary, count: usize) -> Result<Vec<Option<Dictionary>>> {
    let key: &[u8] = if dict.has(b"DecodeParms") { b"DecodeParms" } else { b"DP" };
    let parms = match dict.get(key) {
        Ok(Object::Dictionary(d)) => vec![Some(d.clone())],
        Ok(Object::Array(arr)) => arr
            .iter()
            .map(|o| match o {
                Object::Dictionary(d) => Some(d.clone()),
                _ => None,
            })
            .collect(),
        Ok(Object::Null) | Err(_) => Vec::new(),
        Ok(_) => return Err(crate::Error::Filter("/DecodeParms must be a dictionary or array".into())),
    };
    let mut out = parms;
    out.resize(count, None);
    Ok(out)
}

/// Applies every filter named in `dict`'s `/Filter` chain to `raw`, in order, stopping (without
/// error) at the first non-decodable image/fax filter so later passthrough bytes are returned
/// as-is — callers that need the raw compressed image data already have it via [`raw`] directly.
pub fn decode(dict: &Dictionary, raw: &[u8]) -> Result<Vec<u8>> {
    let names = filter_names(dict)?;
    let parms = decode_parms(dict, names.len())?;
    let mut data = raw.to_vec();
    for (name, parm) in names.iter().zip(parms.iter()) {
        let Some(filter) = Filter::from_name(name) else {
            return Err(crate::Error::Filter(format!(
                "unsupported filter /{}",
                String::from_utf8_lossy(name)
            )));
        };
        if !filter.is_decodable() {
            break;
        }
        data = apply_decode(filter, &data, parm.as_ref())?;
    }
    Ok(data)
}

fn apply_decode(filter: Filter, data: &[u8], parms: Option<&Dictionary>) -> Result<Vec<u8>> {
    match filter {
        Filter::FlateDecode => predictor::undo(parms, &flate::decode(data)?),
        Filter::LzwDecode => predictor::undo(parms, &lzw::decode(data, parms)?),
        Filter::Ascii85Decode => ascii::decode_85(data),
        Filter::AsciiHexDecode => ascii::decode_hex(data),
        Filter::RunLengthDecode => ascii::decode_run_length(data),
        Filter::DctDecode | Filter::Jbig2Decode | Filter::JpxDecode | Filter::CcittFaxDecode => {
            passthrough::identity(data)
        }
    }
}

/// Encodes `raw` with `filter`, used by the writer's stream-compression path and by
/// `ObjectStreamBuilder`. Only `FlateDecode` is supported for encoding (the teacher's writer
/// only ever compresses with Flate; LZW/ASCII encoders aren't exercised by anything this crate
/// writes).
pub fn encode_flate(raw: &[u8]) -> Result<Vec<u8>> {
    flate::encode(raw)
}
