//! Datagram to sentence decoding.
//!
//! This is the accept step run by a device link for every datagram:
//! frame, validate, and build the [`Sentence`] values to enqueue.

use chrono::{DateTime, Utc};
use fpu_core::Sentence;

use crate::checksum::validate_checksum;
use crate::framing::{extract_frames, Frame};
use crate::legacy::{parse_legacy_motion, LEGACY_TALKER, LEGACY_TYPE};

/// Decode one datagram into the sentences a device should emit.
///
/// Standard frames with a bad checksum are dropped unless `emit_invalid` is
/// set, in which case they are surfaced with `checksum_valid == false`.
/// Legacy frames that fail to decode are dropped.
pub fn decode_datagram(
    device: &str,
    buffer: &[u8],
    emit_invalid: bool,
    received: DateTime<Utc>,
) -> Vec<Sentence> {
    extract_frames(buffer)
        .into_iter()
        .filter_map(|frame| match frame {
            Frame::Standard(raw) => {
                let checksum = validate_checksum(&raw);
                if !checksum.valid && !emit_invalid {
                    return None;
                }
                Some(Sentence {
                    device: device.to_string(),
                    timestamp: received,
                    raw,
                    checksum_valid: checksum.valid,
                    talker: checksum.talker,
                    sentence_type: checksum.sentence_type,
                    motion: None,
                })
            }
            Frame::Legacy(raw) => {
                let motion = parse_legacy_motion(&raw)?;
                Some(Sentence {
                    device: device.to_string(),
                    timestamp: received,
                    raw,
                    checksum_valid: true,
                    talker: Some(LEGACY_TALKER.to_string()),
                    sentence_type: Some(LEGACY_TYPE.to_string()),
                    motion: Some(motion),
                })
            }
        })
        .collect()
}
