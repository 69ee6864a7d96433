//! Fixed-size frames exchanged with the safety-filter coprocessor.
//!
//! ```text
//! [Header] [Data ........................ zero padded]
//!    1      MAX_PAYLOAD_LEN
//! ```
//!
//! Header `'V'` marks a healthy frame, `'X'` a deliberate stop. Anything
//! else means the receive window slipped and the link must resync.

use crate::error::FrameError;

/// Healthy packet marker (0x56).
pub const HEADER_VALID: u8 = b'V';
/// Stop marker (0x58).
pub const HEADER_STOP: u8 = b'X';

/// Data region size: the larger of the two compressed QP payloads.
pub const MAX_PAYLOAD_LEN: usize = 20;
/// Total frame size on the wire.
pub const FRAME_LEN: usize = MAX_PAYLOAD_LEN + 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    raw: [u8; FRAME_LEN],
}

impl Default for Frame {
    fn default() -> Self {
        Self::empty()
    }
}

impl Frame {
    pub const fn empty() -> Self {
        Self { raw: [0u8; FRAME_LEN] }
    }

    pub const fn from_bytes(raw: [u8; FRAME_LEN]) -> Self {
        Self { raw }
    }

    /// Stop frame: tells the peer to halt.
    pub fn stop() -> Self {
        let mut frame = Self::empty();
        frame.raw[0] = HEADER_STOP;
        frame
    }

    pub fn header(&self) -> u8 {
        self.raw[0]
    }

    pub fn data(&self) -> &[u8] {
        &self.raw[1..]
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.raw
    }

    /// Receive buffer for the transport.
    pub fn as_bytes_mut(&mut self) -> &mut [u8; FRAME_LEN] {
        &mut self.raw
    }

    pub fn clear(&mut self) {
        self.raw = [0u8; FRAME_LEN];
    }

    /// Write the valid header and `payload`, zero-padding the tail.
    ///
    /// An oversize payload is rejected and the frame is left untouched.
    pub fn pack(&mut self, payload: &[u8]) -> Result<(), FrameError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::Oversize {
                len: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }

        self.raw[0] = HEADER_VALID;
        let (data, tail) = self.raw[1..].split_at_mut(payload.len());
        data.copy_from_slice(payload);
        tail.fill(0);
        Ok(())
    }

    /// Copy `out.len()` bytes from the start of the data region.
    ///
    /// The frame is cleared on every call, valid or not, so a later partial
    /// receive can never be mistaken for fresh data.
    pub fn unpack(&mut self, out: &mut [u8]) -> Result<(), FrameError> {
        let result = match self.raw[0] {
            HEADER_VALID if out.len() <= MAX_PAYLOAD_LEN => {
                out.copy_from_slice(&self.raw[1..1 + out.len()]);
                Ok(())
            }
            HEADER_VALID => Err(FrameError::Oversize {
                len: out.len(),
                max: MAX_PAYLOAD_LEN,
            }),
            HEADER_STOP => Err(FrameError::Stop),
            other => Err(FrameError::BadHeader(other)),
        };

        self.clear();
        result
    }
}
