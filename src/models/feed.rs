// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! The central bank daily rate document (`ValCurs`).
//!
//! The feed is served in whatever charset its XML declaration names
//! (historically `windows-1251`), so bytes are decoded here before any
//! markup is interpreted.

use chrono::NaiveDate;
use encoding_rs::{Encoding, UTF_8};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use thiserror::Error;

const ROOT_ELEMENT: &str = "ValCurs";
const SNAPSHOT_DATE_FORMAT: &str = "%d.%m.%Y";
// Only the prolog is searched for the declared encoding.
const DECLARATION_SCAN_LIMIT: usize = 1024;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("feed body is empty")]
    Empty,

    #[error("unsupported document encoding '{label}'")]
    Decode { label: String },

    #[error("feed is not valid {encoding}")]
    Undecodable { encoding: &'static str },

    #[error("malformed feed markup: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unexpected feed shape: {0}")]
    Malformed(#[from] quick_xml::DeError),

    #[error("expected <ValCurs> root element, found <{found}>")]
    UnexpectedRoot { found: String },

    #[error("invalid snapshot date '{value}'")]
    Date { value: String },
}

/// One parsed feed response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeedSnapshot {
    #[serde(rename = "@Date", default)]
    pub date: String,
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "Valute", default)]
    pub entries: Vec<FeedEntry>,
}

/// A currency line, kept as the raw strings the feed carries.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeedEntry {
    #[serde(rename = "@ID", default)]
    pub id: String,
    #[serde(rename = "NumCode", default)]
    pub num_code: String,
    #[serde(rename = "CharCode", default)]
    pub char_code: String,
    #[serde(rename = "Nominal", default)]
    pub nominal: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: String,
    /// Rate of a single unit; only newer feeds carry it.
    #[serde(rename = "VunitRate", default)]
    pub vunit_rate: Option<String>,
}

impl FeedSnapshot {
    /// The date the rates apply to.
    pub fn date(&self) -> Result<NaiveDate, ParseError> {
        NaiveDate::parse_from_str(self.date.trim(), SNAPSHOT_DATE_FORMAT).map_err(|_| {
            ParseError::Date {
                value: self.date.clone(),
            }
        })
    }
}

/// Decodes and parses a raw feed body.
pub fn parse_feed(body: &[u8]) -> Result<FeedSnapshot, ParseError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::Empty);
    }

    let encoding = detect_encoding(body)?;
    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        return Err(ParseError::Undecodable {
            encoding: used.name(),
        });
    }

    check_root(&text)?;
    Ok(quick_xml::de::from_str(&text)?)
}

/// BOM first, then the declaration's `encoding` label, then UTF-8.
fn detect_encoding(body: &[u8]) -> Result<&'static Encoding, ParseError> {
    if let Some((encoding, _)) = Encoding::for_bom(body) {
        return Ok(encoding);
    }

    match declared_encoding(body) {
        Some(label) => Encoding::for_label(label).ok_or_else(|| {
            ParseError::Decode {
                label: String::from_utf8_lossy(label).into_owned(),
            }
        }),
        None => Ok(UTF_8),
    }
}

fn declared_encoding(body: &[u8]) -> Option<&[u8]> {
    let head = &body[..body.len().min(DECLARATION_SCAN_LIMIT)];
    let start = find(head, b"<?xml")?;
    let end = start + find(&head[start..], b"?>")?;
    let decl = &head[start..end];

    let after_key = find(decl, b"encoding")? + b"encoding".len();
    let rest = trim_ascii_start(&decl[after_key..]);
    let rest = trim_ascii_start(rest.strip_prefix(b"=")?);
    let quote = *rest.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let value = &rest[1..];
    let close = value.iter().position(|&b| b == quote)?;
    Some(&value[..close])
}

fn check_root(text: &str) -> Result<(), ParseError> {
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                if name.as_ref() == ROOT_ELEMENT.as_bytes() {
                    return Ok(());
                }
                return Err(ParseError::UnexpectedRoot {
                    found: String::from_utf8_lossy(name.as_ref()).into_owned(),
                });
            }
            Event::Eof => return Err(ParseError::Empty),
            _ => {}
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn trim_ascii_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|b| b.is_ascii_whitespace())
        .count();
    &bytes[skip..]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="windows-1251"?>
<ValCurs Date="18.10.2026" name="Foreign Currency Market">
    <Valute ID="R01235">
        <NumCode>840</NumCode>
        <CharCode>USD</CharCode>
        <Nominal>1</Nominal>
        <Name>Доллар США</Name>
        <Value>81,4395</Value>
        <VunitRate>81,4395</VunitRate>
    </Valute>
    <Valute ID="R01239">
        <NumCode>978</NumCode>
        <CharCode>EUR</CharCode>
        <Nominal>1</Nominal>
        <Name>Евро</Name>
        <Value>94,7215</Value>
    </Valute>
    <Valute ID="R01375">
        <NumCode>156</NumCode>
        <CharCode>CNY</CharCode>
        <Nominal>10</Nominal>
        <Name>Китайский юань</Name>
        <Value>113,8290</Value>
    </Valute>
</ValCurs>"#;

    /// Encodes a feed the way the upstream serves it.
    pub(crate) fn windows_1251(text: &str) -> Vec<u8> {
        let (bytes, _, had_errors) = encoding_rs::WINDOWS_1251.encode(text);
        assert!(!had_errors);
        bytes.into_owned()
    }

    #[test]
    fn test_parse_windows_1251_feed() {
        let body = windows_1251(SAMPLE_FEED);
        // Sanity check that the body is not valid UTF-8.
        assert!(std::str::from_utf8(&body).is_err());

        let snapshot = parse_feed(&body).unwrap();
        assert_eq!(snapshot.date, "18.10.2026");
        assert_eq!(snapshot.name, "Foreign Currency Market");
        assert_eq!(snapshot.entries.len(), 3);

        let usd = &snapshot.entries[0];
        assert_eq!(usd.id, "R01235");
        assert_eq!(usd.num_code, "840");
        assert_eq!(usd.char_code, "USD");
        assert_eq!(usd.nominal, "1");
        assert_eq!(usd.name, "Доллар США");
        assert_eq!(usd.value, "81,4395");
        assert_eq!(usd.vunit_rate.as_deref(), Some("81,4395"));

        // Document order is preserved.
        let codes: Vec<&str> = snapshot
            .entries
            .iter()
            .map(|e| e.char_code.as_str())
            .collect();
        assert_eq!(codes, vec!["USD", "EUR", "CNY"]);
        assert_eq!(snapshot.entries[1].vunit_rate, None);
        assert_eq!(snapshot.entries[2].name, "Китайский юань");
    }

    #[test]
    fn test_parse_utf8_without_declaration() {
        let body = r#"<ValCurs Date="01.02.2026" name="x"><Valute ID="R1"><CharCode>EUR</CharCode><Name>Евро</Name><Value>99,1</Value></Valute></ValCurs>"#;
        let snapshot = parse_feed(body.as_bytes()).unwrap();
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].name, "Евро");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?><ValCurs Date="01.02.2026"><Valute><CharCode>EUR</CharCode></Valute></ValCurs>"#;
        let snapshot = parse_feed(body.as_bytes()).unwrap();
        let entry = &snapshot.entries[0];
        assert_eq!(entry.char_code, "EUR");
        assert_eq!(entry.value, "");
        assert_eq!(entry.name, "");
        assert_eq!(entry.id, "");
        assert_eq!(snapshot.name, "");
    }

    #[test]
    fn test_no_entries() {
        let snapshot = parse_feed(br#"<ValCurs Date="01.02.2026" name="x"/>"#).unwrap();
        assert!(snapshot.entries.is_empty());
    }

    #[test]
    fn test_snapshot_date() {
        let snapshot = parse_feed(&windows_1251(SAMPLE_FEED)).unwrap();
        assert_eq!(
            snapshot.date().unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
        );

        let bad = FeedSnapshot {
            date: "2026-10-18".to_string(),
            ..FeedSnapshot::default()
        };
        assert!(matches!(bad.date(), Err(ParseError::Date { .. })));
    }

    #[test]
    fn test_rejects_empty_body() {
        assert!(matches!(parse_feed(b""), Err(ParseError::Empty)));
        assert!(matches!(parse_feed(b"  \n"), Err(ParseError::Empty)));
    }

    #[test]
    fn test_rejects_wrong_root() {
        let body = b"<html><body>Access denied</body></html>";
        match parse_feed(body) {
            Err(ParseError::UnexpectedRoot { found }) => assert_eq!(found, "html"),
            other => panic!("expected UnexpectedRoot, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_malformed_markup() {
        let body = br#"<ValCurs Date="01.02.2026"><Valute><CharCode>EUR</Valute></ValCurs>"#;
        assert!(parse_feed(body).is_err());
    }

    #[test]
    fn test_rejects_unknown_encoding() {
        let body = br#"<?xml version="1.0" encoding="x-klingon"?><ValCurs/>"#;
        match parse_feed(body) {
            Err(ParseError::Decode { label }) => assert_eq!(label, "x-klingon"),
            other => panic!("expected Decode, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_undecodable_bytes() {
        let mut body = br#"<?xml version="1.0" encoding="UTF-8"?><ValCurs Date="01.02.2026"><Valute><CharCode>EUR</CharCode><Name>Eu"#.to_vec();
        body.push(0xFF);
        body.extend_from_slice(b"ro</Name><Value>99,1</Value></Valute></ValCurs>");

        match parse_feed(&body) {
            Err(ParseError::Undecodable { encoding }) => assert_eq!(encoding, "UTF-8"),
            other => panic!("expected Undecodable, got {other:?}"),
        }
    }

    #[test]
    fn test_declared_encoding_variants() {
        assert_eq!(
            declared_encoding(br#"<?xml version="1.0" encoding = 'koi8-r' ?><a/>"#),
            Some(&b"koi8-r"[..])
        );
        assert_eq!(declared_encoding(br#"<?xml version="1.0"?><a/>"#), None);
        assert_eq!(declared_encoding(b"<a/>"), None);
    }
}
