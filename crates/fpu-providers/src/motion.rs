//! TSS1: textual heave/roll/pitch.
//!
//! Used for TSS1 sentences that did not arrive as a legacy colon frame.
//! Only roll and pitch are taken; heave comes from the legacy path.

use crate::ParseError;
use fpu_core::FpuUpdate;
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn motion_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^:(?P<aa>[0-9]{2})(?P<seq>[0-9]{4})\s(?P<heave_sign>[+\-])(?P<heave>[0-9]{4})x(?P<roll_sign>[+\-])(?P<roll>[0-9]{4})\s(?P<pitch_sign>[+\-])(?P<pitch>[0-9]{4})\.?\r?\n?$",
        )
        .expect("motion pattern is valid")
    })
}

fn hundredths(caps: &Captures<'_>, sign: &str, digits: &str) -> Result<f64, ParseError> {
    let text = caps.name(digits).map(|m| m.as_str()).ok_or(ParseError::NoMatch)?;
    let raw: u32 = text.parse().map_err(|_| ParseError::InvalidNumber {
        field: "motion",
        value: text.to_string(),
    })?;
    let value = raw as f64 / 100.0;
    match caps.name(sign).map(|m| m.as_str()) {
        Some("-") => Ok(-value),
        _ => Ok(value),
    }
}

/// Parse a TSS1 motion string into roll and pitch in degrees.
pub fn parse_motion(raw: &str) -> Result<FpuUpdate, ParseError> {
    let caps = motion_regex().captures(raw).ok_or(ParseError::NoMatch)?;
    Ok(FpuUpdate::Attitude {
        roll_deg: hundredths(&caps, "roll_sign", "roll")?,
        pitch_deg: hundredths(&caps, "pitch_sign", "pitch")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_and_pitch() {
        let update = parse_motion(":001234 +0012x-0150 +0200").unwrap();
        assert_eq!(
            update,
            FpuUpdate::Attitude {
                roll_deg: -1.5,
                pitch_deg: 2.0
            }
        );
    }

    #[test]
    fn test_trailing_terminators() {
        assert!(parse_motion(":001234 +0012x-0150 +0200.\r\n").is_ok());
        assert!(parse_motion(":001234 +0012x-0150 +0200\n").is_ok());
    }

    #[test]
    fn test_no_match() {
        assert_eq!(parse_motion("$PTSS1,1,2*00"), Err(ParseError::NoMatch));
        assert_eq!(parse_motion(":001234 +12x-0150 +0200"), Err(ParseError::NoMatch));
    }
}
