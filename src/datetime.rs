//! PDF date strings (ISO 32000-2 7.9.4): `D:YYYYMMDDHHmmSSOHH'mm'`, the format `/CreationDate`
//! and `/ModDate` literal strings use. Gated behind the `chrono` feature, mirroring the teacher's
//! `Object::as_datetime`/`impl From<DateTime<...>> for Object`.

use chrono::{Datelike, FixedOffset, TimeZone, Timelike};

use crate::{Object, StringFormat};

impl Object {
    /// Parses this object as a PDF date string, if it's a string and matches the format.
    pub fn as_datetime(&self) -> Option<chrono::DateTime<FixedOffset>> {
        let bytes = self.as_str().ok()?;
        parse(bytes)
    }
}

impl From<chrono::DateTime<FixedOffset>> for Object {
    fn from(value: chrono::DateTime<FixedOffset>) -> Self {
        Object::String(format(value).into_bytes(), StringFormat::Literal)
    }
}

fn parse(bytes: &[u8]) -> Option<chrono::DateTime<FixedOffset>> {
    let text = std::str::from_utf8(bytes).ok()?;
    let text = text.strip_prefix("D:").unwrap_or(text);
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    let year: i32 = digits.get(0..4)?.parse().ok()?;
    let month: u32 = digits.get(4..6).unwrap_or("01").parse().ok()?;
    let day: u32 = digits.get(6..8).unwrap_or("01").parse().ok()?;
    let hour: u32 = digits.get(8..10).unwrap_or("00").parse().ok()?;
    let minute: u32 = digits.get(10..12).unwrap_or("00").parse().ok()?;
    let second: u32 = digits.get(12..14).unwrap_or("00").parse().ok()?;

    let rest = &text[digits.len()..];
    let offset = parse_offset(rest).unwrap_or(FixedOffset::east_opt(0)?);
    offset.with_ymd_and_hms(year, month, day, hour, minute, second).single()
}

fn parse_offset(rest: &str) -> Option<FixedOffset> {
    let mut chars = rest.chars();
    match chars.next()? {
        'Z' => FixedOffset::east_opt(0),
        sign @ ('+' | '-') => {
            let tail: String = chars.collect();
            let hh: i32 = tail.get(0..2)?.parse().ok()?;
            let mm: i32 = tail.get(3..5).unwrap_or("00").parse().ok()?;
            let seconds = (hh * 3600 + mm * 60) * if sign == '-' { -1 } else { 1 };
            FixedOffset::east_opt(seconds)
        }
        _ => None,
    }
}

fn format(value: chrono::DateTime<FixedOffset>) -> String {
    let offset_minutes = value.offset().local_minus_utc() / 60;
    let sign = if offset_minutes < 0 { '-' } else { '+' };
    let hh = offset_minutes.abs() / 60;
    let mm = offset_minutes.abs() % 60;
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{sign}{:02}'{:02}'",
        value.year(),
        value.month(),
        value.day(),
        value.hour(),
        value.minute(),
        value.second(),
        hh,
        mm
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_utc_offset_date() {
        let date = Object::string_literal("D:20230615120000Z".as_bytes().to_vec());
        let parsed = date.as_datetime().unwrap();
        assert_eq!(parsed.year(), 2023);
        assert_eq!(parsed.month(), 6);
        assert_eq!(parsed.day(), 15);
        assert_eq!(parsed.offset().local_minus_utc(), 0);
    }

    #[test]
    fn parses_a_signed_offset_date() {
        let date = Object::string_literal("D:20230615120000-05'00'".as_bytes().to_vec());
        let parsed = date.as_datetime().unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn round_trips_through_from_and_as_datetime() {
        let original = FixedOffset::east_opt(3600).unwrap().with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let object: Object = original.into();
        let parsed = object.as_datetime().unwrap();
        assert_eq!(parsed, original);
    }
}
