//! # fpu-providers
//!
//! Parsers that turn accepted NMEA sentences into state updates for an FPU:
//! - `HDT` true heading
//! - `GGA` position fix, projected to UTM
//! - `ZDA` UTC time and local zone
//! - `TSS1` heave, roll and pitch
//!
//! Every parser is pure. It returns an [`FpuUpdate`] or a [`ParseError`]
//! and never touches device state, so a failed parse cannot leave a record
//! half written.

mod error;
mod fields;
pub mod fix;
pub mod heading;
pub mod motion;
pub mod time;
pub mod utm;

pub use error::ParseError;
pub use fix::parse_fix;
pub use heading::parse_heading;
pub use motion::parse_motion;
pub use time::parse_time;
pub use crate::utm::{from_utm, to_utm};

use fpu_core::{FpuUpdate, Sentence};

/// Sentence types with a parser.
pub const SUPPORTED_TYPES: [&str; 4] = ["HDT", "GGA", "ZDA", "TSS1"];

/// Route a sentence to its parser by type.
///
/// Returns `Ok(None)` for types without a parser. Legacy TSS1 frames that
/// were already decoded at the link become a full motion update.
pub fn parse_sentence(sentence: &Sentence) -> Result<Option<FpuUpdate>, ParseError> {
    let update = match sentence.kind() {
        Some("HDT") => parse_heading(&sentence.raw)?,
        Some("GGA") => parse_fix(&sentence.raw)?,
        Some("ZDA") => parse_time(&sentence.raw)?,
        Some("TSS1") => match sentence.motion {
            Some(sample) => FpuUpdate::Motion(sample),
            None => parse_motion(&sentence.raw)?,
        },
        _ => return Ok(None),
    };
    Ok(Some(update))
}
