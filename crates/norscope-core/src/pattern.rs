//! Program pattern generation
//!
//! A program request describes its data as an ordered list of segments.
//! Each segment has a payload (UTF-8 text, a hex byte list, or a single fill
//! byte) and a declared size; the payload is tiled to exactly that size and
//! segments are concatenated in order. The result is truncated or padded with
//! erased bytes (0xFF) to the size of the target region.
//!
//! Generation is bit-exact: identical segment lists always produce identical
//! bytes.

use core::fmt;
use core::str::FromStr;

use crate::error::{Error, Result};

/// Value of an erased byte
pub const ERASED: u8 = 0xFF;

/// Payload of a pattern segment, validated when constructed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentData {
    /// UTF-8 encoded text
    Text(String),
    /// Parsed hex byte list
    Hex(Vec<u8>),
    /// A single repeated byte
    Fill(u8),
}

/// One segment of a program pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSegment {
    /// Payload to tile
    pub data: SegmentData,
    /// Number of bytes this segment spans
    pub size: usize,
}

impl PatternSegment {
    /// Text segment
    pub fn text(value: impl Into<String>, size: usize) -> Self {
        Self {
            data: SegmentData::Text(value.into()),
            size,
        }
    }

    /// Hex segment; fails if any token is not a single byte
    pub fn hex(value: &str, size: usize) -> Result<Self> {
        Ok(Self {
            data: SegmentData::Hex(parse_hex_stream(value)?),
            size,
        })
    }

    /// Fill segment
    pub fn fill(value: u8, size: usize) -> Self {
        Self {
            data: SegmentData::Fill(value),
            size,
        }
    }

    /// Build a segment from a kind name and its textual value
    pub fn parse(kind: &str, value: &str, size: usize) -> Result<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::text(value, size)),
            "hex" => Self::hex(value, size),
            "fill" => Ok(Self::fill(parse_fill_value(value)?, size)),
            _ => Err(Error::UnknownSegmentKind),
        }
    }

    /// Kind name of this segment
    pub fn kind(&self) -> &'static str {
        match self.data {
            SegmentData::Text(_) => "text",
            SegmentData::Hex(_) => "hex",
            SegmentData::Fill(_) => "fill",
        }
    }

    /// Untiled payload bytes
    pub fn payload(&self) -> &[u8] {
        match &self.data {
            SegmentData::Text(s) => s.as_bytes(),
            SegmentData::Hex(bytes) => bytes,
            SegmentData::Fill(b) => core::slice::from_ref(b),
        }
    }

    /// Append at most `limit` of this segment's tiled bytes to `out`
    fn extend_into(&self, out: &mut Vec<u8>, limit: usize) {
        let len = self.size.min(limit);
        let payload = self.payload();
        if payload.is_empty() {
            out.resize(out.len() + len, ERASED);
            return;
        }
        out.extend(payload.iter().copied().cycle().take(len));
    }
}

/// Parses `kind:size:value`, e.g. `text:0x100:Hello` or `fill:64:0xAA`
///
/// The value is everything after the second colon, so text may itself
/// contain colons.
impl FromStr for PatternSegment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');
        let kind = parts.next().ok_or(Error::InvalidSegmentSpec)?;
        let size = parts.next().ok_or(Error::InvalidSegmentSpec)?;
        let value = parts.next().unwrap_or("");
        let size = parse_size(size).ok_or(Error::InvalidSegmentSpec)?;
        Self::parse(kind, value, size)
    }
}

impl fmt::Display for PatternSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            SegmentData::Text(s) => write!(f, "text:0x{:X}:{}", self.size, s),
            SegmentData::Hex(bytes) => {
                write!(f, "hex:0x{:X}:", self.size)?;
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{:02X}", b)?;
                }
                Ok(())
            }
            SegmentData::Fill(b) => write!(f, "fill:0x{:X}:0x{:02X}", self.size, b),
        }
    }
}

fn parse_size(s: &str) -> Option<usize> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

/// Parse a whitespace/comma separated list of hex bytes
///
/// Each token may carry a `0x` prefix and must fit in one byte. An empty
/// list is valid and yields no bytes.
pub fn parse_hex_stream(text: &str) -> Result<Vec<u8>> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|tok| !tok.is_empty())
        .enumerate()
        .map(|(index, tok)| {
            let digits = tok
                .strip_prefix("0x")
                .or_else(|| tok.strip_prefix("0X"))
                .unwrap_or(tok);
            if digits.is_empty() || digits.len() > 2 {
                return Err(Error::InvalidHexToken { index });
            }
            u8::from_str_radix(digits, 16).map_err(|_| Error::InvalidHexToken { index })
        })
        .collect()
}

/// Parse a fill byte given in decimal or with a 0x/0b/0o prefix
///
/// An empty value is treated as zero. Decimal literals may not carry
/// leading zeros unless the value is zero itself (`010` is rejected).
pub fn parse_fill_value(text: &str) -> Result<u8> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0);
    }
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let lower = body.to_ascii_lowercase();
    let (radix, digits) = if let Some(d) = lower.strip_prefix("0x") {
        (16, d)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (2, d)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (8, d)
    } else {
        (10, lower.as_str())
    };
    let digits: String = digits.chars().filter(|&c| c != '_').collect();
    if radix == 10 && digits.starts_with('0') && digits.bytes().any(|b| b != b'0') {
        return Err(Error::InvalidFillValue);
    }
    let value = i64::from_str_radix(&digits, radix).map_err(|_| Error::InvalidFillValue)?;
    let value = if negative { -value } else { value };
    u8::try_from(value).map_err(|_| Error::InvalidFillValue)
}

/// Build exactly `target_size` bytes from `segments`
///
/// Segments with zero size are skipped. Output past `target_size` is
/// truncated; a short pattern is padded with erased bytes.
pub fn build_pattern(segments: &[PatternSegment], target_size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(target_size);
    for segment in segments.iter().filter(|s| s.size > 0) {
        if out.len() >= target_size {
            break;
        }
        let remaining = target_size - out.len();
        segment.extend_into(&mut out, remaining);
    }
    out.resize(target_size, ERASED);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_pattern() {
        let seg = PatternSegment::parse("fill", "0xAA", 4).unwrap();
        assert_eq!(build_pattern(&[seg], 4), vec![0xAA; 4]);
    }

    #[test]
    fn test_empty_segments_are_erased() {
        assert_eq!(build_pattern(&[], 4), vec![0xFF; 4]);
    }

    #[test]
    fn test_text_tiles_and_truncates() {
        let seg = PatternSegment::text("Da", 5);
        assert_eq!(build_pattern(&[seg], 8), b"DaDaD\xFF\xFF\xFF".to_vec());

        let seg = PatternSegment::text("Data", 16);
        assert_eq!(build_pattern(&[seg], 6), b"DataDa".to_vec());
    }

    #[test]
    fn test_segments_concatenate() {
        let segs = [
            PatternSegment::text("AB", 3),
            PatternSegment::hex("CC AA", 3).unwrap(),
            PatternSegment::fill(0x00, 2),
        ];
        assert_eq!(
            build_pattern(&segs, 8),
            vec![b'A', b'B', b'A', 0xCC, 0xAA, 0xCC, 0x00, 0x00]
        );
    }

    #[test]
    fn test_empty_payload_spans_erased() {
        let segs = [PatternSegment::text("", 3), PatternSegment::fill(0x11, 1)];
        assert_eq!(build_pattern(&segs, 4), vec![0xFF, 0xFF, 0xFF, 0x11]);
    }

    #[test]
    fn test_zero_size_segment_skipped() {
        let segs = [PatternSegment::fill(0x00, 0), PatternSegment::fill(0x22, 2)];
        assert_eq!(build_pattern(&segs, 2), vec![0x22, 0x22]);
    }

    #[test]
    fn test_fill_value_bases() {
        assert_eq!(parse_fill_value("170").unwrap(), 170);
        assert_eq!(parse_fill_value("0xAA").unwrap(), 0xAA);
        assert_eq!(parse_fill_value("0b1010").unwrap(), 10);
        assert_eq!(parse_fill_value("0o12").unwrap(), 10);
        assert_eq!(parse_fill_value("").unwrap(), 0);
        assert_eq!(parse_fill_value("256"), Err(Error::InvalidFillValue));
        assert_eq!(parse_fill_value("-1"), Err(Error::InvalidFillValue));
        assert_eq!(parse_fill_value("zz"), Err(Error::InvalidFillValue));
    }

    #[test]
    fn test_fill_value_leading_zeros() {
        assert_eq!(parse_fill_value("010"), Err(Error::InvalidFillValue));
        assert_eq!(parse_fill_value("0255"), Err(Error::InvalidFillValue));
        assert_eq!(parse_fill_value("0").unwrap(), 0);
        assert_eq!(parse_fill_value("00").unwrap(), 0);
        assert_eq!(parse_fill_value("100").unwrap(), 100);
        assert_eq!(parse_fill_value("0x0A").unwrap(), 10);
        assert_eq!(
            "fill:4:010".parse::<PatternSegment>(),
            Err(Error::InvalidFillValue)
        );
    }

    #[test]
    fn test_hex_stream() {
        assert_eq!(parse_hex_stream("CC AA").unwrap(), vec![0xCC, 0xAA]);
        assert_eq!(parse_hex_stream("0x01,0x2, ff").unwrap(), vec![1, 2, 0xFF]);
        assert_eq!(parse_hex_stream("").unwrap(), Vec::<u8>::new());
        assert_eq!(
            parse_hex_stream("AA 100"),
            Err(Error::InvalidHexToken { index: 1 })
        );
        assert_eq!(
            parse_hex_stream("0x"),
            Err(Error::InvalidHexToken { index: 0 })
        );
        assert_eq!(
            parse_hex_stream("GG"),
            Err(Error::InvalidHexToken { index: 0 })
        );
    }

    #[test]
    fn test_unknown_kind() {
        assert_eq!(
            PatternSegment::parse("random", "x", 4),
            Err(Error::UnknownSegmentKind)
        );
    }

    #[test]
    fn test_segment_spec_parsing() {
        let seg: PatternSegment = "text:0x10:a:b".parse().unwrap();
        assert_eq!(seg, PatternSegment::text("a:b", 16));
        let seg: PatternSegment = "fill:4:0x0F".parse().unwrap();
        assert_eq!(seg, PatternSegment::fill(0x0F, 4));
        assert_eq!(
            "fill".parse::<PatternSegment>(),
            Err(Error::InvalidSegmentSpec)
        );
        assert_eq!(
            "fill:big:1".parse::<PatternSegment>(),
            Err(Error::InvalidSegmentSpec)
        );
        assert_eq!(
            "fill:4:300".parse::<PatternSegment>(),
            Err(Error::InvalidFillValue)
        );
    }

    #[test]
    fn test_display_reparses() {
        let seg = PatternSegment::hex("CC AA", 0x100).unwrap();
        let text = seg.to_string();
        assert_eq!(text, "hex:0x100:CC AA");
        assert_eq!(text.parse::<PatternSegment>().unwrap(), seg);
    }

    #[test]
    fn test_deterministic() {
        let segs = [
            PatternSegment::text("Data Recovery via Advanced Failure Analysis Techniques", 0x8000),
            PatternSegment::fill(0xFF, 0x8000),
        ];
        assert_eq!(build_pattern(&segs, 0x10000), build_pattern(&segs, 0x10000));
    }
}
