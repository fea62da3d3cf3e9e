//! Content-stream tokenizer: turns decoded page content bytes into a sequence of operators and
//! operands (spec §1's "raw string tokens from content streams"). This is read-side decode plus
//! the minimal re-encode `replace_text` needs; it is not a drawing/composition API.

use crate::lexer::{Lexer, Token};
use crate::{Error, Object, ParseError, Result, StringFormat};

/// One content-stream operation: zero or more operands followed by an operator keyword, e.g.
/// `(Hello) Tj` or `1 0 0 1 72 712 cm`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: String,
    pub operands: Vec<Object>,
}

impl Operation {
    pub fn new(operator: impl Into<String>, operands: Vec<Object>) -> Self {
        Operation { operator: operator.into(), operands }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content {
    pub operations: Vec<Operation>,
}

impl Content {
    /// Parses a fully-decoded content stream (predictor/flate already undone) into operations.
    /// Inline images (`BI`...`ID`...`EI`) are not specially handled; their binary payload is not
    /// part of this spec's scope, so the `ID`...`EI` span is skipped as opaque bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut lexer = Lexer::new(data);
        let mut operations = Vec::new();
        let mut operands = Vec::new();

        while let Some(token) = lexer.next_token()? {
            match token {
                Token::Number(bytes) => operands.push(parse_number(&bytes)?),
                Token::Name(bytes) => operands.push(Object::Name(bytes)),
                Token::LiteralString(bytes) => operands.push(Object::String(bytes, StringFormat::Literal)),
                Token::HexString(bytes) => operands.push(Object::String(bytes, StringFormat::Hexadecimal)),
                Token::ArrayStart => operands.push(read_array(&mut lexer)?),
                Token::DictStart => operands.push(read_dict(&mut lexer)?),
                Token::ArrayEnd | Token::DictEnd => {
                    return Err(Error::Parse(ParseError::UnexpectedToken));
                }
                Token::Keyword(bytes) => {
                    let operator = String::from_utf8_lossy(&bytes).into_owned();
                    if operator == "BI" {
                        skip_inline_image(&mut lexer)?;
                        operands.clear();
                        continue;
                    }
                    operations.push(Operation::new(operator, std::mem::take(&mut operands)));
                }
            }
        }
        Ok(Content { operations })
    }

    /// Serializes operations back to content-stream bytes, one operation per line, matching the
    /// layout real-world writers emit (operands, then the operator keyword).
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for op in &self.operations {
            for operand in &op.operands {
                write_object(operand, &mut out)?;
                out.push(b' ');
            }
            out.extend_from_slice(op.operator.as_bytes());
            out.push(b'\n');
        }
        Ok(out)
    }
}

fn parse_number(bytes: &[u8]) -> Result<Object> {
    let text = std::str::from_utf8(bytes).map_err(|_| Error::Parse(ParseError::UnexpectedToken))?;
    if text.contains('.') {
        text.parse::<f64>()
            .map(Object::Real)
            .map_err(|_| Error::Parse(ParseError::UnexpectedToken))
    } else {
        text.parse::<i64>()
            .map(Object::Integer)
            .or_else(|_| text.parse::<f64>().map(Object::Real))
            .map_err(|_| Error::Parse(ParseError::UnexpectedToken))
    }
}

fn read_array(lexer: &mut Lexer) -> Result<Object> {
    let mut items = Vec::new();
    loop {
        match lexer.next_token()?.ok_or(Error::Parse(ParseError::UnexpectedToken))? {
            Token::ArrayEnd => break,
            Token::Number(bytes) => items.push(parse_number(&bytes)?),
            Token::Name(bytes) => items.push(Object::Name(bytes)),
            Token::LiteralString(bytes) => items.push(Object::String(bytes, StringFormat::Literal)),
            Token::HexString(bytes) => items.push(Object::String(bytes, StringFormat::Hexadecimal)),
            Token::ArrayStart => items.push(read_array(lexer)?),
            Token::DictStart => items.push(read_dict(lexer)?),
            Token::Keyword(_) | Token::DictEnd => return Err(Error::Parse(ParseError::UnexpectedToken)),
        }
    }
    Ok(Object::Array(items))
}

fn read_dict(lexer: &mut Lexer) -> Result<Object> {
    let mut dict = crate::Dictionary::new();
    loop {
        let key = match lexer.next_token()?.ok_or(Error::Parse(ParseError::UnexpectedToken))? {
            Token::DictEnd => break,
            Token::Name(bytes) => bytes,
            _ => return Err(Error::Parse(ParseError::UnexpectedToken)),
        };
        let value = match lexer.next_token()?.ok_or(Error::Parse(ParseError::UnexpectedToken))? {
            Token::Number(bytes) => parse_number(&bytes)?,
            Token::Name(bytes) => Object::Name(bytes),
            Token::LiteralString(bytes) => Object::String(bytes, StringFormat::Literal),
            Token::HexString(bytes) => Object::String(bytes, StringFormat::Hexadecimal),
            Token::ArrayStart => read_array(lexer)?,
            Token::DictStart => read_dict(lexer)?,
            Token::Keyword(_) | Token::ArrayEnd | Token::DictEnd => {
                return Err(Error::Parse(ParseError::UnexpectedToken))
            }
        };
        dict.set(key, value);
    }
    Ok(Object::Dictionary(dict))
}

fn skip_inline_image(lexer: &mut Lexer) -> Result<()> {
    // Consume dictionary-style key/value tokens until `ID`, then scan raw bytes until `EI`.
    loop {
        match lexer.next_token()? {
            Some(Token::Keyword(kw)) if kw == b"ID" => break,
            Some(_) => continue,
            None => return Ok(()),
        }
    }
    loop {
        match lexer.next_token()? {
            Some(Token::Keyword(kw)) if kw == b"EI" => break,
            Some(_) => continue,
            None => break,
        }
    }
    Ok(())
}

fn write_object(object: &Object, out: &mut Vec<u8>) -> Result<()> {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(f) => out.extend_from_slice(format!("{f}").as_bytes()),
        Object::Name(n) => {
            out.push(b'/');
            out.extend_from_slice(n);
        }
        Object::String(s, StringFormat::Literal) => {
            out.push(b'(');
            for &b in s {
                if b == b'(' || b == b')' || b == b'\\' {
                    out.push(b'\\');
                }
                out.push(b);
            }
            out.push(b')');
        }
        Object::String(s, StringFormat::Hexadecimal) => {
            out.push(b'<');
            for &b in s {
                out.extend_from_slice(format!("{b:02X}").as_bytes());
            }
            out.push(b'>');
        }
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object(item, out)?;
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => {
            out.extend_from_slice(b"<<");
            for (key, value) in dict.iter() {
                out.push(b'/');
                out.extend_from_slice(key);
                out.push(b' ');
                write_object(value, out)?;
            }
            out.extend_from_slice(b">>");
        }
        Object::Stream(_) | Object::Reference(_) => {
            return Err(Error::Unimplemented("streams/references cannot appear as content-stream operands"))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hello_pdf_text_show() {
        let content = Content::decode(b"BT /F1 24 Tf (Hello, PDF!) Tj ET").unwrap();
        assert_eq!(
            content.operations,
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(24)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(b"Hello, PDF!".to_vec(), StringFormat::Literal)]
                ),
                Operation::new("ET", vec![]),
            ]
        );
    }

    #[test]
    fn encode_then_decode_round_trips_operations() {
        let content = Content {
            operations: vec![
                Operation::new("cm", vec![Object::Real(1.0), Object::Real(0.0), Object::Real(0.0)]),
                Operation::new("Tj", vec![Object::String(b"text".to_vec(), StringFormat::Literal)]),
            ],
        };
        let bytes = content.encode().unwrap();
        let decoded = Content::decode(&bytes).unwrap();
        assert_eq!(decoded, content);
    }

    #[test]
    fn inline_image_payload_is_skipped() {
        let content = Content::decode(b"q BI /W 1 /H 1 ID \x00\x01\x02 EI Q").unwrap();
        assert_eq!(content.operations, vec![Operation::new("q", vec![]), Operation::new("Q", vec![])]);
    }
}
