use crate::{Error, Result};

/// `/ASCIIHexDecode`: two hex digits per byte, whitespace ignored, terminated by `>` (if present;
/// a missing terminator just means the caller already gave us exactly the filtered bytes).
pub fn decode_hex(data: &[u8]) -> Result<Vec<u8>> {
    let mut digits = Vec::with_capacity(data.len());
    for &b in data {
        match b {
            b'>' => break,
            b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F' => digits.push(b),
            _ if (b as char).is_ascii_whitespace() => continue,
            other => return Err(Error::Filter(format!("ASCIIHexDecode: invalid byte {other:#x}"))),
        }
    }
    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = hex_value(pair[0])?;
            let lo = hex_value(pair[1])?;
            Ok(hi << 4 | lo)
        })
        .collect()
}

fn hex_value(b: u8) -> Result<u8> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        other => Err(Error::Filter(format!("ASCIIHexDecode: invalid byte {other:#x}"))),
    }
}

/// `/ASCII85Decode`: groups of 5 base-85 characters (`!`-`u`) decode to 4 bytes; `z` stands alone
/// for a zero group; `~>` terminates the stream.
pub fn decode_85(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut group_len = 0;

    for b in data.iter().copied() {
        if b.is_ascii_whitespace() {
            continue;
        }
        if b == b'~' {
            break;
        }
        if b == b'z' && group_len == 0 {
            out.extend_from_slice(&[0, 0, 0, 0]);
            continue;
        }
        if !(b'!'..=b'u').contains(&b) {
            return Err(Error::Filter(format!("ASCII85Decode: invalid byte {b:#x}")));
        }
        group[group_len] = b - b'!';
        group_len += 1;
        if group_len == 5 {
            out.extend_from_slice(&decode_85_group(&group));
            group_len = 0;
        }
    }

    if group_len > 0 {
        for slot in group.iter_mut().skip(group_len) {
            *slot = 84;
        }
        let decoded = decode_85_group(&group);
        out.extend_from_slice(&decoded[..group_len - 1]);
    }
    Ok(out)
}

fn decode_85_group(group: &[u8; 5]) -> [u8; 4] {
    let value = group.iter().fold(0u32, |acc, &d| acc.wrapping_mul(85).wrapping_add(d as u32));
    value.to_be_bytes()
}

/// `/RunLengthDecode`: length byte `0..=127` means copy the following `n+1` literal bytes;
/// `129..=255` means repeat the single following byte `257-n` times; `128` ends the stream.
pub fn decode_run_length(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let length = data[i];
        i += 1;
        match length {
            0..=127 => {
                let n = length as usize + 1;
                let end = i + n;
                if end > data.len() {
                    return Err(Error::Filter("RunLengthDecode: truncated literal run".into()));
                }
                out.extend_from_slice(&data[i..end]);
                i = end;
            }
            128 => break,
            129..=255 => {
                if i >= data.len() {
                    return Err(Error::Filter("RunLengthDecode: truncated repeat run".into()));
                }
                let count = 257 - length as usize;
                out.extend(std::iter::repeat(data[i]).take(count));
                i += 1;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_decodes_known_value() {
        assert_eq!(decode_hex(b"48656C6C6F>").unwrap(), b"Hello");
    }

    #[test]
    fn hex_ignores_whitespace_and_pads_odd_length() {
        assert_eq!(decode_hex(b"4 8 6\n5>").unwrap(), vec![0x48, 0x65]);
    }

    #[test]
    fn ascii85_decodes_known_value() {
        assert_eq!(decode_85(b"87cURD_*#4DfTZ)+T~>").unwrap(), b"Hello, World!");
    }

    #[test]
    fn ascii85_z_shorthand_decodes_to_four_zero_bytes() {
        assert_eq!(decode_85(b"z~>").unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn run_length_literal_run() {
        assert_eq!(decode_run_length(&[2, b'a', b'b', b'c']).unwrap(), b"abc");
    }

    #[test]
    fn run_length_repeat_run_matches_spec_formula() {
        // length 254 -> count = 257 - 254 = 3
        assert_eq!(decode_run_length(&[254, b'x', 128]).unwrap(), b"xxx");
    }
}
