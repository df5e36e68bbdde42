//! # fpu-protocol
//!
//! Turns raw UDP datagrams into [`fpu_core::Sentence`] values.
//!
//! - `framing` extracts candidate frames from a datagram
//! - `checksum` validates standard `$`/`!` frames
//! - `legacy` decodes the colon-framed TSS1 motion frame
//! - `codec` combines the three into the per-datagram accept step

pub mod checksum;
pub mod codec;
pub mod framing;
pub mod legacy;

pub use checksum::{validate_checksum, ChecksumResult};
pub use codec::decode_datagram;
pub use framing::{extract_frames, Frame};
pub use legacy::parse_legacy_motion;
