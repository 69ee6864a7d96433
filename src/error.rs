//! Error types.
//!
//! None of these abort the control loop. Link errors degrade to a local
//! default (no frame sent, resync, fail-safe vector); control errors only
//! come out of the tuning and configuration surface.

use core::fmt;

/// Framing errors on the safety-filter link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload does not fit in the frame's data region
    Oversize { len: usize, max: usize },
    /// Header byte is neither the valid nor the stop marker
    BadHeader(u8),
    /// Coprocessor sent the stop marker
    Stop,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oversize { len, max } => {
                write!(f, "payload of {} bytes exceeds frame capacity {}", len, max)
            }
            Self::BadHeader(byte) => write!(f, "unrecognized frame header {:#04x}", byte),
            Self::Stop => f.write_str("stop frame"),
        }
    }
}

/// Errors from the controller's tuning and configuration entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// Gain matrix element out of range
    GainIndex { row: usize, col: usize },
    /// Mode parameter does not name a control law
    UnknownMode(u8),
    /// Rate is zero, above the main loop rate, or does not divide it
    InvalidRate(u32),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GainIndex { row, col } => write!(f, "gain index ({}, {}) out of range", row, col),
            Self::UnknownMode(mode) => write!(f, "unknown control mode {}", mode),
            Self::InvalidRate(hz) => write!(f, "invalid rate {} Hz", hz),
        }
    }
}
