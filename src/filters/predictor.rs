//! PNG and TIFF predictors layered on top of `/FlateDecode` and `/LZWDecode` (spec §4.8). The
//! predictor is selected by `/DecodeParms /Predictor`: 1 means "none" (the common case and the
//! default when `/DecodeParms` is absent), 2 means TIFF-style horizontal differencing, and
//! 10-15 mean PNG-style per-row filtering (the specific value 10-15 only matters on *encode*;
//! on decode every row carries its own filter-type tag byte).

use crate::{Dictionary, Error, Result};

struct Params {
    predictor: i64,
    colors: i64,
    bits_per_component: i64,
    columns: i64,
}

impl Params {
    fn from_dict(dict: Option<&Dictionary>) -> Result<Self> {
        let get = |key: &[u8], default: i64| -> Result<i64> {
            match dict.and_then(|d| d.get(key).ok()) {
                Some(obj) => obj.as_i64(),
                None => Ok(default),
            }
        };
        Ok(Params {
            predictor: get(b"Predictor", 1)?,
            colors: get(b"Colors", 1)?,
            bits_per_component: get(b"BitsPerComponent", 8)?,
            columns: get(b"Columns", 1)?,
        })
    }

    fn bytes_per_pixel(&self) -> usize {
        (((self.colors * self.bits_per_component) as usize) + 7) / 8
    }

    fn row_bytes(&self) -> usize {
        (((self.colors * self.bits_per_component * self.columns) as usize) + 7) / 8
    }
}

pub fn undo(parms: Option<&Dictionary>, data: &[u8]) -> Result<Vec<u8>> {
    let params = Params::from_dict(parms)?;
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => Ok(undo_tiff(&params, data)),
        10..=15 => undo_png(&params, data),
        other => Err(Error::Filter(format!("unsupported /Predictor {other}"))),
    }
}

fn undo_tiff(params: &Params, data: &[u8]) -> Vec<u8> {
    let bpp = params.bytes_per_pixel();
    let row_len = params.row_bytes();
    let mut out = data.to_vec();
    if bpp == 0 || row_len == 0 {
        return out;
    }
    for row in out.chunks_mut(row_len) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
    out
}

fn undo_png(params: &Params, data: &[u8]) -> Result<Vec<u8>> {
    let bpp = params.bytes_per_pixel().max(1);
    let row_len = params.row_bytes();
    let stride = row_len + 1;
    if stride == 0 || data.len() % stride != 0 {
        return Err(Error::Filter("PNG predictor data is not a whole number of rows".into()));
    }
    let row_count = data.len() / stride;
    let mut out = vec![0u8; row_count * row_len];
    let mut prev_row: Vec<u8> = vec![0u8; row_len];

    for r in 0..row_count {
        let src = &data[r * stride..(r + 1) * stride];
        let tag = src[0];
        let encoded = &src[1..];
        let dst_start = r * row_len;
        let dst = &mut out[dst_start..dst_start + row_len];

        for i in 0..row_len {
            let a = if i >= bpp { dst[i - bpp] } else { 0 };
            let b = prev_row[i];
            let c = if i >= bpp { prev_row[i - bpp] } else { 0 };
            let raw = match tag {
                0 => encoded[i],
                1 => encoded[i].wrapping_add(a),
                2 => encoded[i].wrapping_add(b),
                3 => encoded[i].wrapping_add(((a as u16 + b as u16) / 2) as u8),
                4 => encoded[i].wrapping_add(paeth(a, b, c)),
                other => return Err(Error::Filter(format!("unknown PNG filter type {other}"))),
            };
            dst[i] = raw;
        }
        prev_row.copy_from_slice(dst);
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (a, b, c) = (a as i32, b as i32, c as i32);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;

    #[test]
    fn no_predictor_is_identity() {
        assert_eq!(undo(None, b"abc").unwrap(), b"abc");
    }

    #[test]
    fn png_sub_filter_reconstructs_row() {
        let parms = dictionary! { "Predictor" => 12, "Colors" => 1, "BitsPerComponent" => 8, "Columns" => 3 };
        let encoded = [1u8, 10, 5, 5];
        let decoded = undo_png(&Params::from_dict(Some(&parms)).unwrap(), &encoded).unwrap();
        assert_eq!(decoded, vec![10, 15, 20]);
    }

    #[test]
    fn tiff_predictor_reconstructs_row() {
        let parms = dictionary! { "Predictor" => 2, "Colors" => 1, "BitsPerComponent" => 8, "Columns" => 3 };
        let encoded = vec![10u8, 5, 5];
        let decoded = undo(Some(&parms), &encoded).unwrap();
        assert_eq!(decoded, vec![10, 15, 20]);
    }
}
