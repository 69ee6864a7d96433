//! QP payloads shipped to the coprocessor and the reply it sends back.
//!
//! All scalars are little-endian `i16` milli-units (see [`codec`](crate::codec)).
//!
//! ```text
//! Attitude  [φ θ | T p q r]                 12 bytes
//! Position  [x y z ẋ ẏ ż | T φ θ ψ]         20 bytes
//! Reply     [T a b c | iters:u16]           10 bytes
//! ```

use crate::codec;
use crate::config::SafetyFilter;
use crate::frame::MAX_PAYLOAD_LEN;
use crate::state::{ControlVector, Vec3};

pub const ATTITUDE_PAYLOAD_LEN: usize = 12;
pub const POSITION_PAYLOAD_LEN: usize = 20;
pub const REPLY_PAYLOAD_LEN: usize = 10;

pub type CompressedPayload = heapless::Vec<u8, MAX_PAYLOAD_LEN>;

/// Snapshot of the states the barrier constraints depend on, plus the
/// nominal command to project.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QpData {
    /// `u` holds `[T p q r]`, angles in rad
    Attitude { phi: f32, theta: f32, u: ControlVector },
    /// `u` holds `[T φ θ ψ]`
    Position {
        position: Vec3,
        velocity: Vec3,
        u: ControlVector,
    },
}

impl QpData {
    pub fn compressed_len(&self) -> usize {
        match self {
            Self::Attitude { .. } => ATTITUDE_PAYLOAD_LEN,
            Self::Position { .. } => POSITION_PAYLOAD_LEN,
        }
    }

    pub fn nominal(&self) -> ControlVector {
        match *self {
            Self::Attitude { u, .. } | Self::Position { u, .. } => u,
        }
    }

    /// Quantize to the wire layout.
    pub fn compress(&self) -> CompressedPayload {
        let mut raw = [0u8; MAX_PAYLOAD_LEN];
        let len = self.compressed_len();

        match *self {
            Self::Attitude { phi, theta, u } => {
                codec::put(&mut raw, 0, phi);
                codec::put(&mut raw, 2, theta);
                put_control(&mut raw, 4, u);
            }
            Self::Position { position, velocity, u } => {
                codec::put(&mut raw, 0, position.x);
                codec::put(&mut raw, 2, position.y);
                codec::put(&mut raw, 4, position.z);
                codec::put(&mut raw, 6, velocity.x);
                codec::put(&mut raw, 8, velocity.y);
                codec::put(&mut raw, 10, velocity.z);
                put_control(&mut raw, 12, u);
            }
        }

        let mut out = CompressedPayload::new();
        // len <= MAX_PAYLOAD_LEN, cannot overflow
        let _ = out.extend_from_slice(&raw[..len]);
        out
    }

    /// Coprocessor side: rebuild the QP data from a payload.
    pub fn decompress(filter: SafetyFilter, raw: &[u8]) -> Option<Self> {
        match filter {
            SafetyFilter::Attitude if raw.len() >= ATTITUDE_PAYLOAD_LEN => Some(Self::Attitude {
                phi: codec::get(raw, 0),
                theta: codec::get(raw, 2),
                u: get_control(raw, 4),
            }),
            SafetyFilter::Position if raw.len() >= POSITION_PAYLOAD_LEN => Some(Self::Position {
                position: Vec3::new(codec::get(raw, 0), codec::get(raw, 2), codec::get(raw, 4)),
                velocity: Vec3::new(codec::get(raw, 6), codec::get(raw, 8), codec::get(raw, 10)),
                u: get_control(raw, 12),
            }),
            _ => None,
        }
    }
}

/// Safety-filtered command returned by the coprocessor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SafeReply {
    pub u: ControlVector,
    /// Solver iterations spent on this solution (0 when not reported)
    pub iterations: u16,
}

impl SafeReply {
    pub fn from_bytes(raw: &[u8; REPLY_PAYLOAD_LEN]) -> Self {
        Self {
            u: get_control(raw, 0),
            iterations: u16::from_le_bytes([raw[8], raw[9]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; REPLY_PAYLOAD_LEN] {
        let mut raw = [0u8; REPLY_PAYLOAD_LEN];
        put_control(&mut raw, 0, self.u);
        raw[8..10].copy_from_slice(&self.iterations.to_le_bytes());
        raw
    }
}

fn put_control(raw: &mut [u8], offset: usize, u: ControlVector) {
    for (i, v) in u.to_array().into_iter().enumerate() {
        codec::put(raw, offset + 2 * i, v);
    }
}

fn get_control(raw: &[u8], offset: usize) -> ControlVector {
    ControlVector::new(
        codec::get(raw, offset),
        codec::get(raw, offset + 2),
        codec::get(raw, offset + 4),
        codec::get(raw, offset + 6),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attitude_layout() {
        let qp = QpData::Attitude {
            phi: 0.1,
            theta: -0.2,
            u: ControlVector::new(9.81, 1.0, -1.0, 0.5),
        };
        let raw = qp.compress();

        assert_eq!(raw.len(), ATTITUDE_PAYLOAD_LEN);
        assert_eq!(&raw[0..2], &100i16.to_le_bytes());
        assert_eq!(&raw[2..4], &(-200i16).to_le_bytes());
        assert_eq!(&raw[4..6], &9810i16.to_le_bytes());
        assert_eq!(&raw[6..8], &1000i16.to_le_bytes());
        assert_eq!(&raw[8..10], &(-1000i16).to_le_bytes());
        assert_eq!(&raw[10..12], &500i16.to_le_bytes());
    }

    #[test]
    fn position_layout() {
        let qp = QpData::Position {
            position: Vec3::new(1.0, 2.0, 3.0),
            velocity: Vec3::new(-0.5, 0.25, 0.0),
            u: ControlVector::new(10.0, 0.0, 0.125, -0.125),
        };
        let raw = qp.compress();

        assert_eq!(raw.len(), POSITION_PAYLOAD_LEN);
        let words: heapless::Vec<i16, 10> = raw
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(
            words.as_slice(),
            &[1000, 2000, 3000, -500, 250, 0, 10000, 0, 125, -125]
        );
    }

    #[test]
    fn coprocessor_sees_what_was_sent() {
        let qp = QpData::Position {
            position: Vec3::new(0.5, -0.25, 1.0),
            velocity: Vec3::ZERO,
            u: ControlVector::new(9.5, 0.0, 0.0, 0.0),
        };
        let raw = qp.compress();
        assert_eq!(QpData::decompress(SafetyFilter::Position, &raw), Some(qp));
        assert_eq!(QpData::decompress(SafetyFilter::Attitude, &raw[..4]), None);
        assert_eq!(QpData::decompress(SafetyFilter::Disabled, &raw), None);
    }

    #[test]
    fn reply_layout() {
        let reply = SafeReply {
            u: ControlVector::new(9.0, -0.5, 0.25, 0.0),
            iterations: 42,
        };
        let raw = reply.to_bytes();
        assert_eq!(&raw[0..2], &9000i16.to_le_bytes());
        assert_eq!(&raw[8..10], &[42, 0]);
        assert_eq!(SafeReply::from_bytes(&raw), reply);
    }
}
