//! Cross-reference stream decoding (spec §4.7, ISO 32000-2 7.5.8): a stream object whose decoded
//! content is a flat binary table, `/W` giving the byte width of each of the three fields per
//! record and `/Index` giving which object numbers the records cover (`[0 Size]` if absent).

use crate::error::XrefError;
use crate::xref::XrefEntry;
use crate::{Dictionary, Error, Object, Result};

pub(super) fn decode(dict: &Dictionary, content: &[u8]) -> Result<Vec<(u32, XrefEntry)>> {
    let widths = dict.get(b"W")?.as_array()?;
    if widths.len() != 3 {
        return Err(Error::Xref(XrefError::InvalidWidths));
    }
    let w: Vec<usize> = widths
        .iter()
        .map(|o| o.as_i64().map(|n| n.max(0) as usize))
        .collect::<Result<_>>()
        .map_err(|_| Error::Xref(XrefError::InvalidWidths))?;
    let record_len = w[0] + w[1] + w[2];
    if record_len == 0 {
        return Err(Error::Xref(XrefError::InvalidWidths));
    }

    let index: Vec<(u32, u32)> = match dict.get(b"Index").and_then(Object::as_array) {
        Ok(pairs) => pairs
            .chunks(2)
            .filter_map(|pair| {
                let start = pair.first()?.as_i64().ok()?;
                let count = pair.get(1)?.as_i64().ok()?;
                Some((start.max(0) as u32, count.max(0) as u32))
            })
            .collect(),
        Err(_) => {
            let size = dict.get(b"Size").and_then(Object::as_i64).unwrap_or(0).max(0) as u32;
            vec![(0, size)]
        }
    };

    let mut entries = Vec::new();
    let mut cursor = 0usize;
    for (start, count) in index {
        for i in 0..count {
            if cursor + record_len > content.len() {
                return Err(Error::Xref(XrefError::InvalidWidths));
            }
            let record = &content[cursor..cursor + record_len];
            cursor += record_len;

            let field_type = if w[0] == 0 { 1 } else { be_int(&record[..w[0]]) };
            let field2 = be_int(&record[w[0]..w[0] + w[1]]);
            let field3 = be_int(&record[w[0] + w[1]..record_len]);

            let object_number = start + i;
            let entry = match field_type {
                0 => XrefEntry::Free { generation: field3 as u16 },
                1 => XrefEntry::Normal { offset: field2, generation: field3 as u16 },
                2 => XrefEntry::Compressed { stream_number: field2 as u32, index: field3 as u32 },
                _ => continue,
            };
            entries.push((object_number, entry));
        }
    }
    Ok(entries)
}

fn be_int(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;

    #[test]
    fn decodes_a_minimal_three_entry_table() {
        let dict = dictionary! {
            "W" => Object::Array(vec![1.into(), 2.into(), 1.into()]),
            "Size" => Object::Integer(3),
        };
        let content: Vec<u8> = vec![
            0, 0, 0, 0xff, // free, next free 0, generation 255
            1, 0, 10, 0, // normal, offset 10, generation 0
            2, 0, 5, 2, // compressed, container 5, index 2
        ];
        let entries = decode(&dict, &content).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1], (1, XrefEntry::Normal { offset: 10, generation: 0 }));
        assert_eq!(entries[2], (2, XrefEntry::Compressed { stream_number: 5, index: 2 }));
    }

    #[test]
    fn honors_explicit_index_pairs() {
        let dict = dictionary! {
            "W" => Object::Array(vec![1.into(), 2.into(), 1.into()]),
            "Index" => Object::Array(vec![7.into(), 1.into()]),
        };
        let content: Vec<u8> = vec![1, 0, 200, 0];
        let entries = decode(&dict, &content).unwrap();
        assert_eq!(entries, vec![(7, XrefEntry::Normal { offset: 200, generation: 0 })]);
    }
}
