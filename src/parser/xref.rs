//! Classic `xref` table and `trailer` grammar (spec §4.5). Cross-reference *streams* are just
//! regular stream objects whose content is a binary table (spec §4.7 hybrid files); those are
//! decoded in `reader::load` once the stream's own bytes are available, not here.

use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1, multispace0, multispace1};
use nom::combinator::map_res;
use nom::IResult;

use super::dictionary_value;
use crate::{Dictionary, XrefEntry};

fn uint(input: &[u8]) -> IResult<&[u8], u64> {
    map_res(digit1, |s: &[u8]| std::str::from_utf8(s).unwrap().parse::<u64>())(input)
}

struct SubsectionHeader {
    start: u32,
    count: u32,
}

fn subsection_header(input: &[u8]) -> IResult<&[u8], SubsectionHeader> {
    let (input, _) = multispace0(input)?;
    let (input, start) = uint(input)?;
    let (input, _) = multispace1(input)?;
    let (input, count) = uint(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, SubsectionHeader { start: start as u32, count: count as u32 }))
}

/// Each entry is a fixed 20-byte record: 10-digit offset, space, 5-digit generation, space, `n`
/// or `f`, then a 2-byte EOL. Real-world files are inconsistent about the exact EOL pair, so the
/// parser accepts any whitespace run there rather than the literal 2 bytes the spec names.
fn entry(input: &[u8]) -> IResult<&[u8], (u64, u16, bool)> {
    let (input, _) = multispace0(input)?;
    let (input, offset) = uint(input)?;
    let (input, _) = multispace1(input)?;
    let (input, generation) = uint(input)?;
    let (input, _) = multispace1(input)?;
    let (input, kind) = nom::branch::alt((char('n'), char('f')))(input)?;
    Ok((input, (offset, generation as u16, kind == 'n')))
}

/// Parses one `xref` keyword section (one or more subsections) into `(object_number, entry)`
/// pairs.
pub fn xref_section(input: &[u8]) -> IResult<&[u8], Vec<(u32, XrefEntry)>> {
    parse_subsections(input)
}

fn parse_subsections(mut input: &[u8]) -> IResult<&[u8], Vec<(u32, XrefEntry)>> {
    let (rest, _) = tag("xref")(input)?;
    input = rest;
    let mut entries = Vec::new();
    loop {
        let before = input;
        match subsection_header(input) {
            Ok((rest, header)) => {
                let mut cursor = rest;
                let mut parsed = Vec::with_capacity(header.count as usize);
                for _ in 0..header.count {
                    let (rest, (offset, generation, is_normal)) = entry(cursor)?;
                    cursor = rest;
                    parsed.push((offset, generation, is_normal));
                }
                input = cursor;
                for (i, (offset, generation, is_normal)) in parsed.into_iter().enumerate() {
                    let object_number = header.start + i as u32;
                    let xref_entry = if is_normal {
                        XrefEntry::Normal { offset, generation }
                    } else {
                        XrefEntry::Free { generation }
                    };
                    entries.push((object_number, xref_entry));
                }
            }
            Err(_) => {
                input = before;
                break;
            }
        }
    }
    Ok((input, entries))
}

pub fn trailer(input: &[u8]) -> IResult<&[u8], Dictionary> {
    let (input, _) = multispace0(input)?;
    let (input, _) = tag("trailer")(input)?;
    dictionary_value(input)
}

/// The byte offset following a `startxref` keyword.
pub fn startxref_value(input: &[u8]) -> IResult<&[u8], u64> {
    let (input, _) = multispace0(input)?;
    uint(input)
}
