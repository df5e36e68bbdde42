//! Datagram framing.
//!
//! A single UDP datagram may carry several NMEA sentences. UDP keeps
//! datagram boundaries, so framing is a pure function of one buffer and no
//! state is carried between datagrams.
//!
//! Two independent passes run over the same text:
//! 1. Standard frames: `$` or `!`, any characters except CR/LF/`$`, then `*`
//!    and two hex digits.
//! 2. Legacy frames: whole lines with the fixed TSS1 layout
//!    `:AABBBB ±HHHHx±RRRR ±PPPP`.

use regex::Regex;
use std::sync::OnceLock;

/// A candidate frame extracted from a datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `$`/`!` framed sentence with a trailing `*HH` checksum
    Standard(String),
    /// Colon-framed TSS1 motion line
    Legacy(String),
}

impl Frame {
    pub fn as_str(&self) -> &str {
        match self {
            Frame::Standard(s) | Frame::Legacy(s) => s,
        }
    }
}

fn standard_frame_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[$!][^\r\n$]*?\*[0-9A-Fa-f]{2}").expect("standard frame pattern is valid")
    })
}

fn legacy_frame_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^:[0-9]{2}[0-9]{4} [+\-][0-9]{4}x[+\-][0-9]{4} [+\-][0-9]{4}$")
            .expect("legacy frame pattern is valid")
    })
}

/// Decode a datagram as single-byte text.
///
/// Every byte maps to the code point of the same value, so the byte values
/// survive for checksum computation.
pub fn decode_text(buffer: &[u8]) -> String {
    buffer.iter().map(|&b| b as char).collect()
}

/// Extract every candidate frame from one datagram, standard frames first.
pub fn extract_frames(buffer: &[u8]) -> Vec<Frame> {
    if buffer.is_empty() {
        return Vec::new();
    }
    let text = decode_text(buffer);

    let mut frames: Vec<Frame> = standard_frame_regex()
        .find_iter(&text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(|s| Frame::Standard(s.to_string()))
        .collect();

    frames.extend(
        text.split(|c: char| c == '\r' || c == '\n')
            .map(str::trim)
            .filter(|line| line.starts_with(':') && legacy_frame_regex().is_match(line))
            .map(|line| Frame::Legacy(line.to_string())),
    );

    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_sentence() {
        let frames = extract_frames(b"$GPHDT,123.4,T*31\r\n");
        assert_eq!(frames, vec![Frame::Standard("$GPHDT,123.4,T*31".to_string())]);
    }

    #[test]
    fn test_two_sentences_in_order() {
        let frames = extract_frames(b"$GPHDT,123.4,T*31\r\n$GPZDA,123519.00,01,02,2024,,*6A\r\n");
        let texts: Vec<&str> = frames.iter().map(Frame::as_str).collect();
        assert_eq!(texts, vec!["$GPHDT,123.4,T*31", "$GPZDA,123519.00,01,02,2024,,*6A"]);
    }

    #[test]
    fn test_concatenated_without_line_breaks() {
        let frames = extract_frames(b"$A,1*00$B,2*11");
        let texts: Vec<&str> = frames.iter().map(Frame::as_str).collect();
        assert_eq!(texts, vec!["$A,1*00", "$B,2*11"]);
    }

    #[test]
    fn test_no_star_yields_nothing() {
        assert!(extract_frames(b"$GPHDT,123.4,T\r\n").is_empty());
        assert!(extract_frames(b"").is_empty());
    }

    #[test]
    fn test_dollar_restarts_frame() {
        // A '$' inside a frame starts a new candidate; the truncated one is lost.
        let frames = extract_frames(b"$GPHDT,12$GPHDT,123.4,T*31");
        assert_eq!(frames, vec![Frame::Standard("$GPHDT,123.4,T*31".to_string())]);
    }

    #[test]
    fn test_ais_bang_frame() {
        let frames = extract_frames(b"!AIVDM,1,1,,A,13aEOK?P00PD2wVMdLDRhgvL289?,0*26\r\n");
        assert_eq!(frames.len(), 1);
        assert!(frames[0].as_str().starts_with("!AIVDM"));
    }

    #[test]
    fn test_legacy_frame() {
        let frames = extract_frames(b":001234 +0012x-0150 +0200\r\n");
        assert_eq!(frames, vec![Frame::Legacy(":001234 +0012x-0150 +0200".to_string())]);
    }

    #[test]
    fn test_legacy_layout_is_strict() {
        assert!(extract_frames(b":001234 +0012x-0150 +020\r\n").is_empty());
        assert!(extract_frames(b":001234 0012x-0150 +0200\r\n").is_empty());
        assert!(extract_frames(b"x:001234 +0012x-0150 +0200\r\n").is_empty());
    }

    #[test]
    fn test_mixed_datagram() {
        let frames = extract_frames(b":001234 +0012x-0150 +0200\r\n$GPHDT,123.4,T*31\r\n");
        assert_eq!(
            frames,
            vec![
                Frame::Standard("$GPHDT,123.4,T*31".to_string()),
                Frame::Legacy(":001234 +0012x-0150 +0200".to_string()),
            ]
        );
    }

    #[test]
    fn test_high_bytes_survive_decoding() {
        let text = decode_text(&[b'$', 0xB0, b'*']);
        let bytes: Vec<u32> = text.chars().map(|c| c as u32).collect();
        assert_eq!(bytes, vec![0x24, 0xB0, 0x2A]);
    }
}
