//! Font metrics and text decoding for text-layer extraction
//!
//! Only what the text layer needs: character codes, advance widths and a
//! Unicode mapping. Simple fonts use one byte per code and fall back to
//! Latin-1 when they carry no `/ToUnicode` CMap; Type0 fonts use two bytes.

use crate::document::{numbers, object_to_f64, resolve, resolve_dict, stream_content};
use lopdf::{Dictionary, Document, Object};
use std::collections::HashMap;

/// Advance used for glyphs without metrics, in thousandths of an em.
pub const DEFAULT_GLYPH_WIDTH: f64 = 500.0;

/// Upper bound on codes expanded from a single `bfrange` entry.
const MAX_RANGE_LEN: u32 = 0x1_0000;

#[derive(Debug, Clone)]
pub struct Font {
    two_byte: bool,
    widths: HashMap<u32, f64>,
    default_width: f64,
    to_unicode: Option<HashMap<u32, String>>,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            two_byte: false,
            widths: HashMap::new(),
            default_width: DEFAULT_GLYPH_WIDTH,
            to_unicode: None,
        }
    }
}

impl Font {
    pub fn from_dict(doc: &Document, dict: &Dictionary) -> Font {
        let is_type0 = matches!(dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Type0");
        let to_unicode = dict
            .get(b"ToUnicode")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_stream().ok())
            .and_then(|stream| stream_content(stream).ok())
            .map(|bytes| parse_to_unicode(&bytes));

        let (widths, default_width) = if is_type0 {
            cid_widths(doc, dict)
        } else {
            simple_widths(doc, dict)
        };

        Font {
            two_byte: is_type0,
            widths,
            default_width,
            to_unicode,
        }
    }

    /// Split a shown string into character codes.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| match pair {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [single] => u32::from(*single),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|b| u32::from(*b)).collect()
        }
    }

    pub fn decode(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|map| map.get(&code)) {
            return text.clone();
        }
        if self.two_byte {
            // Identity-encoded CIDs without a CMap carry no recoverable text
            return String::new();
        }
        char::from_u32(code).map(String::from).unwrap_or_default()
    }

    /// Advance width in thousandths of an em.
    pub fn width(&self, code: u32) -> f64 {
        self.widths.get(&code).copied().unwrap_or(self.default_width)
    }

    /// Word spacing (`Tw`) applies only to single-byte code 32.
    pub fn is_word_space(&self, code: u32) -> bool {
        !self.two_byte && code == 32
    }
}

fn simple_widths(doc: &Document, dict: &Dictionary) -> (HashMap<u32, f64>, f64) {
    let mut widths = HashMap::new();

    let first_char = dict
        .get(b"FirstChar")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(object_to_f64)
        .unwrap_or(0.0) as u32;

    if let Some(array) = dict
        .get(b"Widths")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok())
    {
        for (offset, width) in array.iter().enumerate() {
            let Some(code) = u32::try_from(offset)
                .ok()
                .and_then(|offset| first_char.checked_add(offset))
            else {
                break;
            };
            if let Some(width) = resolve(doc, width).and_then(object_to_f64) {
                widths.insert(code, width);
            }
        }
    }

    let missing_width = dict
        .get(b"FontDescriptor")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .and_then(|descriptor| descriptor.get(b"MissingWidth").ok())
        .and_then(|obj| resolve(doc, obj))
        .and_then(object_to_f64)
        .filter(|w| *w > 0.0)
        .unwrap_or(DEFAULT_GLYPH_WIDTH);

    (widths, missing_width)
}

/// Widths of a Type0 font from its descendant's `/W` and `/DW`.
fn cid_widths(doc: &Document, dict: &Dictionary) -> (HashMap<u32, f64>, f64) {
    let mut widths = HashMap::new();

    let Some(descendant) = dict
        .get(b"DescendantFonts")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok())
        .and_then(|fonts| fonts.first())
        .and_then(|obj| resolve_dict(doc, obj))
    else {
        return (widths, 1000.0);
    };

    let default_width = descendant
        .get(b"DW")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(object_to_f64)
        .unwrap_or(1000.0);

    let Some(w) = descendant
        .get(b"W")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok())
    else {
        return (widths, default_width);
    };

    // Entries are either `c [w1 w2 ...]` or `c_first c_last w`
    let mut i = 0;
    while i < w.len() {
        let Some(first) = resolve(doc, &w[i]).and_then(object_to_f64) else {
            break;
        };
        let first = first as u32;
        match w.get(i + 1).and_then(|obj| resolve(doc, obj)) {
            Some(Object::Array(run)) => {
                for (offset, width) in numbers(doc, run).unwrap_or_default().into_iter().enumerate() {
                    let Some(code) = u32::try_from(offset)
                        .ok()
                        .and_then(|offset| first.checked_add(offset))
                    else {
                        break;
                    };
                    widths.insert(code, width);
                }
                i += 2;
            }
            Some(last) => {
                let last = object_to_f64(last).unwrap_or(0.0) as u32;
                let width = w
                    .get(i + 2)
                    .and_then(|obj| resolve(doc, obj))
                    .and_then(object_to_f64)
                    .unwrap_or(default_width);
                for code in first..=last.min(first.saturating_add(MAX_RANGE_LEN)) {
                    widths.insert(code, width);
                }
                i += 3;
            }
            None => break,
        }
    }

    (widths, default_width)
}

#[derive(Debug, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Word(String),
}

fn tokenize_cmap(data: &[u8]) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < data.len() {
        match data[i] {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => {
                tokens.push(CMapToken::Word("<<".to_string()));
                i += 2;
            }
            b'>' if data.get(i + 1) == Some(&b'>') => {
                tokens.push(CMapToken::Word(">>".to_string()));
                i += 2;
            }
            b'<' => {
                let start = i + 1;
                let end = data[start..]
                    .iter()
                    .position(|b| *b == b'>')
                    .map_or(data.len(), |p| start + p);
                tokens.push(CMapToken::Hex(decode_hex(&data[start..end])));
                i = end + 1;
            }
            b'[' => {
                tokens.push(CMapToken::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(CMapToken::ArrayEnd);
                i += 1;
            }
            b'(' => {
                // Literal strings only occur in the CMap header
                let mut depth = 0;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !matches!(data[i], b'<' | b'>' | b'[' | b']' | b'(' | b'%')
                {
                    i += 1;
                }
                if i == start {
                    // Stray '>' or ')'
                    i += 1;
                    continue;
                }
                tokens.push(CMapToken::Word(
                    String::from_utf8_lossy(&data[start..i]).into_owned(),
                ));
            }
        }
    }

    tokens
}

fn decode_hex(digits: &[u8]) -> Vec<u8> {
    let nibbles: Vec<u8> = digits
        .iter()
        .filter_map(|d| (*d as char).to_digit(16).map(|v| v as u8))
        .collect();
    nibbles
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => hi << 4 | lo,
            [hi] => hi << 4,
            _ => 0,
        })
        .collect()
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| acc << 8 | u32::from(*b))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from(*hi) << 8 | u16::from(*lo),
            [single] => u16::from(*single),
            _ => 0,
        })
        .collect()
}

fn utf16_text(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

/// Parse the `bfchar` and `bfrange` sections of a ToUnicode CMap.
pub fn parse_to_unicode(data: &[u8]) -> HashMap<u32, String> {
    #[derive(PartialEq)]
    enum Section {
        None,
        Char,
        Range,
    }

    let tokens = tokenize_cmap(data);
    let mut map = HashMap::new();
    let mut section = Section::None;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            CMapToken::Word(word) => {
                section = match word.as_str() {
                    "beginbfchar" => Section::Char,
                    "beginbfrange" => Section::Range,
                    "endbfchar" | "endbfrange" => Section::None,
                    _ => section,
                };
                i += 1;
            }
            CMapToken::Hex(src) if section == Section::Char => {
                if let Some(CMapToken::Hex(dst)) = tokens.get(i + 1) {
                    map.insert(code_of(src), utf16_text(dst));
                }
                i += 2;
            }
            CMapToken::Hex(lo) if section == Section::Range => {
                let (Some(CMapToken::Hex(hi)), Some(dst)) = (tokens.get(i + 1), tokens.get(i + 2))
                else {
                    break;
                };
                let lo = code_of(lo);
                let hi = code_of(hi).min(lo.saturating_add(MAX_RANGE_LEN));
                match dst {
                    CMapToken::Hex(base) => {
                        let units = utf16_units(base);
                        for (offset, code) in (lo..=hi).enumerate() {
                            let mut units = units.clone();
                            if let Some(last) = units.last_mut() {
                                *last = last.wrapping_add(offset as u16);
                            }
                            map.insert(code, String::from_utf16_lossy(&units));
                        }
                        i += 3;
                    }
                    CMapToken::ArrayStart => {
                        let mut j = i + 3;
                        let mut code = Some(lo);
                        while let Some(CMapToken::Hex(text)) = tokens.get(j) {
                            if let Some(current) = code.filter(|c| *c <= hi) {
                                map.insert(current, utf16_text(text));
                            }
                            code = code.and_then(|c| c.checked_add(1));
                            j += 1;
                        }
                        // Skip the closing bracket
                        i = j + 1;
                    }
                    _ => i += 3,
                }
            }
            _ => i += 1,
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::to_unicode_cmap;
    use lopdf::dictionary;

    #[test]
    fn test_parse_bfchar() {
        let cmap = to_unicode_cmap(&[(0x0001, 'H'), (0x0002, 'i')]);
        let map = parse_to_unicode(cmap.as_bytes());
        assert_eq!(map.get(&1).map(String::as_str), Some("H"));
        assert_eq!(map.get(&2).map(String::as_str), Some("i"));
    }

    #[test]
    fn test_parse_bfrange_with_base_destination() {
        let cmap = b"2 beginbfrange\n<0010> <0012> <0061>\n<20> <21> <0041>\nendbfrange";
        let map = parse_to_unicode(cmap);
        assert_eq!(map.get(&0x10).map(String::as_str), Some("a"));
        assert_eq!(map.get(&0x12).map(String::as_str), Some("c"));
        assert_eq!(map.get(&0x21).map(String::as_str), Some("B"));
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn test_parse_bfrange_with_array_destination() {
        let cmap = b"1 beginbfrange\n<05> <07> [<0066> <0069> <006C>]\nendbfrange";
        let map = parse_to_unicode(cmap);
        assert_eq!(map.get(&5).map(String::as_str), Some("f"));
        assert_eq!(map.get(&6).map(String::as_str), Some("i"));
        assert_eq!(map.get(&7).map(String::as_str), Some("l"));
    }

    #[test]
    fn test_parse_ligature_destination() {
        let cmap = b"1 beginbfchar <0003> <00660069> endbfchar";
        let map = parse_to_unicode(cmap);
        assert_eq!(map.get(&3).map(String::as_str), Some("fi"));
    }

    #[test]
    fn test_header_dictionaries_are_ignored() {
        let cmap = b"/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
                     1 beginbfchar <0041> <0058> endbfchar";
        let map = parse_to_unicode(cmap);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&0x41).map(String::as_str), Some("X"));
    }

    #[test]
    fn test_simple_font_falls_back_to_latin1() {
        let font = Font::default();
        assert_eq!(font.codes(b"Ab"), vec![0x41, 0x62]);
        assert_eq!(font.decode(0x41), "A");
        assert_eq!(font.decode(0xE9), "\u{e9}");
        assert_eq!(font.width(0x41), DEFAULT_GLYPH_WIDTH);
        assert!(font.is_word_space(32));
    }

    #[test]
    fn test_two_byte_codes() {
        let font = Font {
            two_byte: true,
            ..Font::default()
        };
        assert_eq!(font.codes(&[0x00, 0x01, 0x12, 0x34]), vec![0x0001, 0x1234]);
        assert_eq!(font.decode(0x0001), "");
        assert!(!font.is_word_space(32));
    }

    #[test]
    fn test_simple_widths_from_first_char() {
        let doc = Document::with_version("1.5");
        let dict = lopdf::dictionary! {
            "Subtype" => "Type1",
            "FirstChar" => 65,
            "Widths" => vec![Object::Integer(600), Object::Integer(700)],
        };
        let font = Font::from_dict(&doc, &dict);
        assert_eq!(font.width(65), 600.0);
        assert_eq!(font.width(66), 700.0);
        assert_eq!(font.width(67), DEFAULT_GLYPH_WIDTH);
    }

    #[test]
    fn test_cid_widths_both_forms() {
        let mut doc = Document::with_version("1.5");
        let descendant = doc.add_object(lopdf::dictionary! {
            "Subtype" => "CIDFontType2",
            "DW" => 900,
            "W" => vec![
                Object::Integer(1),
                Object::Array(vec![Object::Integer(250), Object::Integer(260)]),
                Object::Integer(10),
                Object::Integer(12),
                Object::Integer(333),
            ],
        });
        let dict = lopdf::dictionary! {
            "Subtype" => "Type0",
            "DescendantFonts" => vec![Object::Reference(descendant)],
        };
        let font = Font::from_dict(&doc, &dict);
        assert_eq!(font.width(1), 250.0);
        assert_eq!(font.width(2), 260.0);
        assert_eq!(font.width(11), 333.0);
        assert_eq!(font.width(50), 900.0);
    }

    #[test]
    fn test_widths_past_last_code_are_dropped() {
        let doc = Document::with_version("1.5");
        let dict = lopdf::dictionary! {
            "Subtype" => "TrueType",
            "FirstChar" => 4294967295i64,
            "Widths" => vec![Object::Integer(600), Object::Integer(700)],
        };
        let font = Font::from_dict(&doc, &dict);
        assert_eq!(font.width(u32::MAX), 600.0);
        assert_eq!(font.width(0), DEFAULT_GLYPH_WIDTH);
    }

    #[test]
    fn test_cid_width_run_at_last_code() {
        let mut doc = Document::with_version("1.5");
        let descendant = doc.add_object(lopdf::dictionary! {
            "Subtype" => "CIDFontType2",
            "DW" => 1000,
            "W" => vec![
                Object::Integer(4294967295),
                Object::Array(vec![Object::Integer(250), Object::Integer(260)]),
            ],
        });
        let dict = lopdf::dictionary! {
            "Subtype" => "Type0",
            "DescendantFonts" => vec![Object::Reference(descendant)],
        };
        let font = Font::from_dict(&doc, &dict);
        assert_eq!(font.width(u32::MAX), 250.0);
        assert_eq!(font.width(0), 1000.0);
    }

    #[test]
    fn test_bfrange_array_at_last_code() {
        let cmap = b"1 beginbfrange\n<FFFFFFFF> <FFFFFFFF> [<0041> <0042>]\nendbfrange";
        let map = parse_to_unicode(cmap);
        assert_eq!(map.get(&u32::MAX).map(String::as_str), Some("A"));
        assert_eq!(map.len(), 1);
    }
}
