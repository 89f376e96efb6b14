//! Wire format for inter-partition event transport.
//!
//! Frames are a tag byte followed by little-endian u64 fields:
//!
//! ```text
//! tag 0 (Phold):    send_time:u64  payload_len:u64  payload bytes
//! tag 1 (Init):     sender:u64
//! tag 2 (Complete): send_count:u64  recv_count:u64
//! ```
//!
//! The codec is hand-rolled rather than serde-derived because the layout
//! is an external contract, not an implementation detail.

use crate::core::time::SimTime;
use crate::error::SimError;
use crate::events::types::SimEvent;

/// Encode an event into its wire frame.
pub fn encode(event: &SimEvent) -> Vec<u8> {
    match event {
        SimEvent::Phold { send_time, payload } => {
            let mut frame = Vec::with_capacity(1 + 16 + payload.len());
            frame.push(0);
            frame.extend_from_slice(&send_time.as_nanos().to_le_bytes());
            frame.extend_from_slice(&(payload.len() as u64).to_le_bytes());
            frame.extend_from_slice(payload);
            frame
        }
        SimEvent::Init { sender } => {
            let mut frame = Vec::with_capacity(9);
            frame.push(1);
            frame.extend_from_slice(&sender.to_le_bytes());
            frame
        }
        SimEvent::Complete {
            send_total,
            recv_total,
        } => {
            let mut frame = Vec::with_capacity(17);
            frame.push(2);
            frame.extend_from_slice(&send_total.to_le_bytes());
            frame.extend_from_slice(&recv_total.to_le_bytes());
            frame
        }
    }
}

/// Decode a wire frame back into an event.
///
/// Rejects unknown tags, short frames, and trailing garbage.
pub fn decode(frame: &[u8]) -> Result<SimEvent, SimError> {
    let (&tag, body) = frame
        .split_first()
        .ok_or_else(|| SimError::MalformedFrame("empty frame".to_string()))?;

    match tag {
        0 => {
            let send_time = read_u64(body, 0)?;
            let payload_len = read_u64(body, 8)? as usize;
            let payload = body
                .get(16..)
                .filter(|rest| rest.len() == payload_len)
                .ok_or_else(|| {
                    SimError::MalformedFrame(format!(
                        "payload length {} does not match frame size {}",
                        payload_len,
                        body.len().saturating_sub(16)
                    ))
                })?;
            Ok(SimEvent::Phold {
                send_time: SimTime::from_nanos(send_time),
                payload: payload.to_vec(),
            })
        }
        1 => {
            expect_len(body, 8)?;
            Ok(SimEvent::Init {
                sender: read_u64(body, 0)?,
            })
        }
        2 => {
            expect_len(body, 16)?;
            Ok(SimEvent::Complete {
                send_total: read_u64(body, 0)?,
                recv_total: read_u64(body, 8)?,
            })
        }
        other => Err(SimError::MalformedFrame(format!("unknown tag {}", other))),
    }
}

fn read_u64(body: &[u8], offset: usize) -> Result<u64, SimError> {
    let bytes = body
        .get(offset..offset + 8)
        .ok_or_else(|| SimError::MalformedFrame(format!("truncated field at offset {}", offset)))?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(buf))
}

fn expect_len(body: &[u8], len: usize) -> Result<(), SimError> {
    if body.len() != len {
        return Err(SimError::MalformedFrame(format!(
            "expected {} body bytes, got {}",
            len,
            body.len()
        )));
    }
    Ok(())
}
