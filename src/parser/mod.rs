//! Document-level object grammar (spec §4.3/§4.4): headers, the four scalar kinds, names,
//! strings, arrays, dictionaries, streams, and indirect object definitions. Built with `nom`,
//! matching the teacher's actual parser stack (`nom`/`nom_locate` in its `Cargo.toml`) rather
//! than a hand-rolled recursive-descent reader.

pub mod xref;

use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, take_while, take_while1};
use nom::character::complete::{char, digit1, multispace0};
use nom::combinator::{map, map_res, opt, recognize, value};
use nom::multi::many0;
use nom::sequence::{delimited, pair, tuple};
use nom::IResult;

use crate::{Dictionary, Error, Object, ObjectId, ParseError, Result, Stream, StringFormat};

const MAX_NESTING_DEPTH: usize = 32;

fn is_pdf_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(b: u8) -> bool {
    !is_pdf_whitespace(b) && !is_delimiter(b)
}

fn ws(input: &[u8]) -> IResult<&[u8], ()> {
    let mut i = input;
    loop {
        let (rest, _) = multispace0(i)?;
        i = rest;
        if i.first() == Some(&b'%') {
            let (rest, _) = is_not("\r\n")(i)?;
            i = rest;
            continue;
        }
        break;
    }
    Ok((i, ()))
}

fn lex<'a, O>(
    mut inner: impl FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], O> {
    move |input: &'a [u8]| {
        let (input, _) = ws(input)?;
        inner(input)
    }
}

pub fn header(input: &[u8]) -> IResult<&[u8], (u8, u8)> {
    let (input, _) = tag("%PDF-")(input)?;
    let (input, major) = digit1(input)?;
    let (input, _) = char('.')(input)?;
    let (input, minor) = digit1(input)?;
    let major = major[0] - b'0';
    let minor = minor[0] - b'0';
    Ok((input, (major, minor)))
}

fn integer(input: &[u8]) -> IResult<&[u8], i64> {
    map_res(
        recognize(pair(opt(alt((char('+'), char('-')))), digit1)),
        |s: &[u8]| std::str::from_utf8(s).unwrap().parse::<i64>(),
    )(input)
}

fn real(input: &[u8]) -> IResult<&[u8], f64> {
    map_res(
        recognize(tuple((
            opt(alt((char('+'), char('-')))),
            alt((recognize(pair(digit1, opt(pair(char('.'), digit1)))), recognize(pair(char('.'), digit1)))),
        ))),
        |s: &[u8]| std::str::from_utf8(s).unwrap().parse::<f64>(),
    )(input)
}

fn number(input: &[u8]) -> IResult<&[u8], Object> {
    alt((
        map(real, Object::Real),
        map(integer, Object::Integer),
    ))(input)
}

fn boolean(input: &[u8]) -> IResult<&[u8], Object> {
    alt((value(Object::Boolean(true), tag("true")), value(Object::Boolean(false), tag("false"))))(input)
}

fn null(input: &[u8]) -> IResult<&[u8], Object> {
    value(Object::Null, tag("null"))(input)
}

fn name(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, _) = char('/')(input)?;
    let (input, raw) = take_while(is_regular)(input)?;
    Ok((input, Object::Name(decode_name_escapes(raw))))
}

fn decode_name_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() && raw[i + 1].is_ascii_hexdigit() && raw[i + 2].is_ascii_hexdigit() {
            let hi = (raw[i + 1] as char).to_digit(16).unwrap() as u8;
            let lo = (raw[i + 2] as char).to_digit(16).unwrap() as u8;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    out
}

fn literal_string(input: &[u8]) -> IResult<&[u8], Object> {
    let (mut input, _) = char('(')(input)?;
    let mut out = Vec::new();
    let mut depth = 1;
    loop {
        let Some(&b) = input.first() else {
            break;
        };
        match b {
            b'(' => {
                depth += 1;
                out.push(b);
                input = &input[1..];
            }
            b')' => {
                depth -= 1;
                input = &input[1..];
                if depth == 0 {
                    break;
                }
                out.push(b);
            }
            b'\\' => {
                input = &input[1..];
                let Some(&esc) = input.first() else { break };
                match esc {
                    b'n' => {
                        out.push(b'\n');
                        input = &input[1..];
                    }
                    b'r' => {
                        out.push(b'\r');
                        input = &input[1..];
                    }
                    b't' => {
                        out.push(b'\t');
                        input = &input[1..];
                    }
                    b'b' => {
                        out.push(0x08);
                        input = &input[1..];
                    }
                    b'f' => {
                        out.push(0x0C);
                        input = &input[1..];
                    }
                    b'(' | b')' | b'\\' => {
                        out.push(esc);
                        input = &input[1..];
                    }
                    b'\n' => {
                        input = &input[1..];
                    }
                    b'\r' => {
                        input = &input[1..];
                        if input.first() == Some(&b'\n') {
                            input = &input[1..];
                        }
                    }
                    b'0'..=b'7' => {
                        let mut value = 0u32;
                        let mut consumed = 0;
                        while consumed < 3 && matches!(input.first(), Some(b'0'..=b'7')) {
                            value = value * 8 + (input[0] - b'0') as u32;
                            input = &input[1..];
                            consumed += 1;
                        }
                        out.push(value as u8);
                    }
                    other => {
                        out.push(other);
                        input = &input[1..];
                    }
                }
            }
            _ => {
                out.push(b);
                input = &input[1..];
            }
        }
    }
    Ok((input, Object::String(out, StringFormat::Literal)))
}

fn hex_digit_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

fn hex_string(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, raw) = delimited(char('<'), take_while(|b| b != b'>'), char('>'))(input)?;
    let digits: Vec<u8> = raw.iter().copied().filter(|b| !is_pdf_whitespace(*b)).collect();
    let mut bytes = Vec::with_capacity(digits.len().div_ceil(2));
    for chunk in digits.chunks(2) {
        let hi = hex_digit_value(chunk[0]);
        let lo = if chunk.len() == 2 { hex_digit_value(chunk[1]) } else { 0 };
        bytes.push((hi << 4) | lo);
    }
    Ok((input, Object::String(bytes, StringFormat::Hexadecimal)))
}

fn string(input: &[u8]) -> IResult<&[u8], Object> {
    alt((literal_string, hex_string))(input)
}

fn array(depth: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], Object> {
    move |input: &[u8]| {
        if depth >= MAX_NESTING_DEPTH {
            return Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::TooLarge)));
        }
        let (input, _) = lex(char('['))(input)?;
        let (input, items) = many0(lex(move |i| object(i, depth + 1)))(input)?;
        let (input, _) = lex(char(']'))(input)?;
        Ok((input, Object::Array(items)))
    }
}

fn dict_pairs(depth: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], Vec<(Vec<u8>, Object)>> {
    move |input: &[u8]| {
        many0(pair(
            lex(move |i| name(i).map(|(r, o)| (r, o))),
            lex(move |i| object(i, depth + 1)),
        ))(input)
        .map(|(rest, pairs)| {
            (
                rest,
                pairs
                    .into_iter()
                    .map(|(key_obj, value)| match key_obj {
                        Object::Name(n) => (n, value),
                        _ => unreachable!("name() only ever returns Object::Name"),
                    })
                    .collect(),
            )
        })
    }
}

fn dictionary(depth: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], Dictionary> {
    move |input: &[u8]| {
        if depth >= MAX_NESTING_DEPTH {
            return Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::TooLarge)));
        }
        let (input, _) = lex(tag("<<"))(input)?;
        let (input, pairs) = dict_pairs(depth)(input)?;
        let (input, _) = lex(tag(">>"))(input)?;
        Ok((input, pairs.into_iter().collect()))
    }
}

fn reference(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, num) = lex(digit1)(input)?;
    let (input, gen) = lex(digit1)(input)?;
    let (input, _) = lex(char('R'))(input)?;
    let num: u32 = std::str::from_utf8(num).unwrap().parse().map_err(|_| {
        nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
    })?;
    let gen: u16 = std::str::from_utf8(gen).unwrap().parse().map_err(|_| {
        nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
    })?;
    Ok((input, Object::Reference((num, gen))))
}

fn keyword_literal(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_regular)(input)
}

/// Parses one value, trying the indirect-reference form (`n g R`) before falling back to a bare
/// number, since both start with a digit.
fn object(input: &[u8], depth: usize) -> IResult<&[u8], Object> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::TooLarge)));
    }
    lex(alt((
        map(dictionary(depth), Object::Dictionary),
        array(depth),
        string,
        name,
        null,
        boolean,
        reference,
        number,
    )))(input)
}

/// Parses a single top-level value (public entry point for callers outside `n g obj` context,
/// e.g. decoding a `/DecodeParms` fragment or a trailer value already isolated by the caller).
pub fn parse_object(input: &[u8]) -> Result<Object> {
    object(input, 0)
        .map(|(_, obj)| obj)
        .map_err(|_| Error::Parse(ParseError::UnexpectedToken))
}

/// Parses `n g obj ... endobj`, returning the object id and value. A `stream` keyword
/// immediately after the dictionary is handled by the caller (`reader`), which knows `/Length`
/// may itself be an indirect reference and needs the xref table to resolve it before knowing how
/// many bytes to take.
pub fn indirect_object_header(input: &[u8]) -> IResult<&[u8], ObjectId> {
    let (input, num) = lex(digit1)(input)?;
    let (input, gen) = lex(digit1)(input)?;
    let (input, _) = lex(tag("obj"))(input)?;
    let num: u32 = std::str::from_utf8(num).unwrap().parse().unwrap_or(0);
    let gen: u16 = std::str::from_utf8(gen).unwrap().parse().unwrap_or(0);
    Ok((input, (num, gen)))
}

pub fn object_value(input: &[u8]) -> IResult<&[u8], Object> {
    object(input, 0)
}

pub fn dictionary_value(input: &[u8]) -> IResult<&[u8], Dictionary> {
    lex(dictionary(0))(input)
}

/// Matches the `stream` keyword that follows a stream dictionary, then the mandatory EOL before
/// raw bytes begin (spec §4.9: `stream` must be followed by CRLF or a lone LF, never a lone CR).
pub fn stream_keyword(input: &[u8]) -> IResult<&[u8], ()> {
    let (input, _) = lex(tag("stream"))(input)?;
    let (input, _) = alt((tag("\r\n"), tag("\n")))(input)?;
    Ok((input, ()))
}

pub fn endstream_endobj(input: &[u8]) -> IResult<&[u8], ()> {
    let (input, _) = lex(tag("endstream"))(input)?;
    let (input, _) = lex(tag("endobj"))(input)?;
    Ok((input, ()))
}

/// Builds a [`Stream`] from an already-parsed dictionary and the raw bytes between `stream` and
/// `endstream`.
pub fn make_stream(dict: Dictionary, content: Vec<u8>) -> Stream {
    Stream::new(dict, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_reads_version() {
        assert_eq!(header(b"%PDF-1.7\n").unwrap().1, (1, 7));
    }

    #[test]
    fn parses_scalars() {
        assert_eq!(parse_object(b"123").unwrap(), Object::Integer(123));
        assert_eq!(parse_object(b"-1.5").unwrap(), Object::Real(-1.5));
        assert_eq!(parse_object(b"true").unwrap(), Object::Boolean(true));
        assert_eq!(parse_object(b"null").unwrap(), Object::Null);
        assert_eq!(parse_object(b"/Type").unwrap(), Object::Name(b"Type".to_vec()));
    }

    #[test]
    fn parses_reference_before_bare_number() {
        assert_eq!(parse_object(b"12 0 R").unwrap(), Object::Reference((12, 0)));
        assert_eq!(parse_object(b"12").unwrap(), Object::Integer(12));
    }

    #[test]
    fn parses_nested_array_and_dictionary() {
        let obj = parse_object(b"<< /Kids [1 0 R 2 0 R] /Count 2 >>").unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get(b"Count").unwrap().as_i64().unwrap(), 2);
        let kids = dict.get(b"Kids").unwrap().as_array().unwrap();
        assert_eq!(kids.len(), 2);
        assert_eq!(kids[0], Object::Reference((1, 0)));
    }

    #[test]
    fn literal_string_with_escapes() {
        let obj = parse_object(b"(Hello\\nWorld)").unwrap();
        assert_eq!(obj.as_str().unwrap(), b"Hello\nWorld");
    }

    #[test]
    fn hex_string_decodes() {
        let obj = parse_object(b"<48656C6C6F>").unwrap();
        assert_eq!(obj.as_str().unwrap(), b"Hello");
    }

    #[test]
    fn indirect_object_header_reads_object_id() {
        let (_, id) = indirect_object_header(b"12 0 obj").unwrap();
        assert_eq!(id, (12, 0));
    }

    #[test]
    fn rejects_nesting_beyond_depth_cap() {
        let deep = "[".repeat(40) + &"]".repeat(40);
        assert!(parse_object(deep.as_bytes()).is_err());
    }
}
