//! HDT: true heading.

use crate::fields::{parse_f64, split_fields};
use crate::ParseError;
use fpu_core::FpuUpdate;

/// Parse `$xxHDT,<heading>,T*HH` into a heading in `[0, 360)`.
pub fn parse_heading(raw: &str) -> Result<FpuUpdate, ParseError> {
    let fields = split_fields(raw, 2)?;
    let heading = parse_f64("heading", fields[1])?;
    Ok(FpuUpdate::Heading(normalize_heading(heading)))
}

/// Wrap any finite angle into `[0, 360)`.
pub fn normalize_heading(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
