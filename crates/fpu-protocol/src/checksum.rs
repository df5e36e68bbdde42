//! NMEA 0183 checksum validation.
//!
//! The checksum is the XOR of every character strictly between the leading
//! `$`/`!` and the `*`, written as two hex digits after the `*`.

/// Result of validating one standard frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumResult {
    /// Whether the transmitted checksum matched.
    pub valid: bool,
    /// Two-character talker code (e.g. "GP"), when the payload is long enough.
    pub talker: Option<String>,
    /// Up to three-character sentence type (e.g. "GGA").
    pub sentence_type: Option<String>,
}

/// XOR of the byte value of every character in `payload`.
pub fn compute_checksum(payload: &str) -> u8 {
    payload.chars().fold(0u8, |acc, c| acc ^ (c as u32 as u8))
}

/// Canonical uppercase hex form of a checksum.
pub fn format_checksum(checksum: u8) -> String {
    format!("{checksum:02X}")
}

/// Validate a `$`/`!` frame and extract talker and sentence type.
///
/// The hex digits are compared case-insensitively. Talker and type are only
/// reported when the payload is longer than five characters.
pub fn validate_checksum(frame: &str) -> ChecksumResult {
    let invalid = ChecksumResult {
        valid: false,
        talker: None,
        sentence_type: None,
    };

    let Some(star) = frame.rfind('*') else {
        return invalid;
    };
    if star == 0 || star + 3 > frame.len() {
        return invalid;
    }
    let (Some(payload), Some(transmitted)) = (frame.get(1..star), frame.get(star + 1..star + 3))
    else {
        return invalid;
    };

    let computed = format_checksum(compute_checksum(payload));
    let valid = transmitted.eq_ignore_ascii_case(&computed);

    let (talker, sentence_type) = if payload.chars().count() > 5 {
        (
            Some(payload.chars().take(2).collect()),
            Some(payload.chars().skip(2).take(3).collect()),
        )
    } else {
        (None, None)
    };

    ChecksumResult {
        valid,
        talker,
        sentence_type,
    }
}
