//! Colon-framed TSS1 motion frames.
//!
//! Layout: `:AABBBB ±HHHHx±RRRR ±PPPP`
//! - `AA` sensor address, `BBBB` sequence
//! - heave in centimeters, roll and pitch in hundredths of a degree
//!
//! These frames carry no checksum and are always treated as valid.

use fpu_core::MotionSample;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Talker code reported for legacy frames.
pub const LEGACY_TALKER: &str = "P";
/// Sentence type reported for legacy frames.
pub const LEGACY_TYPE: &str = "TSS1";

fn legacy_motion_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^:([0-9]{2})([0-9]{4}) ([+\-])([0-9]{4})x([+\-])([0-9]{4}) ([+\-])([0-9]{4})$",
        )
        .expect("legacy motion pattern is valid")
    })
}

fn signed(caps: &Captures<'_>, sign: usize, digits: usize) -> Option<i32> {
    let magnitude: i32 = caps.get(digits)?.as_str().parse().ok()?;
    match caps.get(sign)?.as_str() {
        "-" => Some(-magnitude),
        _ => Some(magnitude),
    }
}

/// Decode a legacy frame, or `None` if it does not match the layout.
pub fn parse_legacy_motion(frame: &str) -> Option<MotionSample> {
    let caps = legacy_motion_regex().captures(frame)?;

    let address = caps.get(1)?.as_str().parse().ok()?;
    let sequence = caps.get(2)?.as_str().parse().ok()?;
    let heave_cm = signed(&caps, 3, 4)?;
    let roll = signed(&caps, 5, 6)?;
    let pitch = signed(&caps, 7, 8)?;

    Some(MotionSample {
        address,
        sequence,
        heave_m: heave_cm as f64 / 100.0,
        roll_deg: roll as f64 / 100.0,
        pitch_deg: pitch as f64 / 100.0,
    })
}
