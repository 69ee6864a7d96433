//! Safety-filter channel: ready/busy handshake with the QP coprocessor.
//!
//! One request is in flight at a time. [`SafetyFilterChannel::send`] only
//! ships a frame when the coprocessor is ready; otherwise it counts a missed
//! cycle and, after `missed_cycle_limit` consecutive misses, forces the
//! fail-safe vector and the ready state so a dead coprocessor cannot stall
//! the loop.
//!
//! Inbound frames arrive from the transport's receive path through a
//! capacity-1 [`FrameInbox`]. The control task drains it with
//! [`SafetyFilterChannel::poll_inbound`] before each send, which makes the
//! hand-off from the receive interrupt explicit.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};

use crate::error::FrameError;
use crate::frame::{Frame, FRAME_LEN};
use crate::payload::{QpData, SafeReply, REPLY_PAYLOAD_LEN};
use crate::state::ControlVector;

/// SPSC hand-off of complete inbound frames.
pub type FrameInbox = Channel<CriticalSectionRawMutex, Frame, 1>;
pub type FrameSender<'a> = Sender<'a, CriticalSectionRawMutex, Frame, 1>;
pub type FrameReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, Frame, 1>;

/// Byte transport to the coprocessor.
pub trait Transport {
    /// Queue one complete frame for transmission.
    fn send(&mut self, frame: &Frame);

    /// Drop any partial frame and re-arm the receive window at the start of
    /// a frame boundary, expecting `expected_len` bytes.
    fn resync(&mut self, expected_len: usize);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Coprocessor accepts a new frame
    Ready,
    /// Awaiting the reply to the last frame
    Busy,
}

/// Link counters for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    pub frames_sent: u32,
    pub replies: u32,
    pub bad_frames: u32,
    pub stop_frames: u32,
    pub failsafes: u32,
    pub last_iterations: u16,
}

pub struct SafetyFilterChannel<'a, T: Transport> {
    transport: T,
    inbox: FrameReceiver<'a>,
    state: LinkState,
    missed_cycles: u16,
    missed_cycle_limit: u16,
    /// Reply to a request issued before the last reset; consumed, not used
    discard_reply: bool,
    safe: SafeReply,
    tx: Frame,
    stats: LinkStats,
}

impl<'a, T: Transport> SafetyFilterChannel<'a, T> {
    pub fn new(transport: T, inbox: FrameReceiver<'a>, missed_cycle_limit: u16) -> Self {
        Self {
            transport,
            inbox,
            state: LinkState::Ready,
            missed_cycles: 0,
            missed_cycle_limit: missed_cycle_limit.max(1),
            discard_reply: false,
            safe: SafeReply::default(),
            tx: Frame::empty(),
            stats: LinkStats::default(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn missed_cycles(&self) -> u16 {
        self.missed_cycles
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Most recent safety-filtered control vector.
    pub fn safe_u(&self) -> ControlVector {
        self.safe.u
    }

    /// Ship `qp` if the coprocessor is ready, otherwise count a missed cycle.
    pub fn send(&mut self, qp: &QpData) {
        match self.state {
            LinkState::Ready => {
                let payload = qp.compress();
                if let Err(e) = self.tx.pack(&payload) {
                    log_warn!("safety filter: {}", e);
                    return;
                }
                self.transport.send(&self.tx);
                self.tx.clear();

                self.state = LinkState::Busy;
                self.missed_cycles = 0;
                self.stats.frames_sent = self.stats.frames_sent.wrapping_add(1);
            }
            LinkState::Busy => {
                self.missed_cycles = self.missed_cycles.saturating_add(1);
                if self.missed_cycles >= self.missed_cycle_limit {
                    log_warn!(
                        "safety filter: {} missed cycles, forcing stop",
                        self.missed_cycles
                    );
                    self.force_stop();
                    self.state = LinkState::Ready;
                }
            }
        }
    }

    /// Handle one complete inbound frame. The frame is cleared.
    pub fn on_frame_received(&mut self, frame: &mut Frame) {
        let mut raw = [0u8; REPLY_PAYLOAD_LEN];
        match frame.unpack(&mut raw) {
            Ok(()) => {
                self.stats.replies = self.stats.replies.wrapping_add(1);
                if self.discard_reply {
                    self.discard_reply = false;
                    log_debug!("safety filter: discarding stale reply");
                } else {
                    self.safe = SafeReply::from_bytes(&raw);
                    self.stats.last_iterations = self.safe.iterations;
                }
                self.missed_cycles = 0;
            }
            Err(FrameError::Stop) => {
                log_warn!("safety filter: coprocessor sent stop");
                self.stats.stop_frames = self.stats.stop_frames.wrapping_add(1);
                self.force_stop();
                self.discard_reply = false;
            }
            Err(e) => {
                log_debug!("safety filter: {}, resyncing", e);
                self.stats.bad_frames = self.stats.bad_frames.wrapping_add(1);
                self.transport.resync(FRAME_LEN);
                self.discard_reply = false;
            }
        }
        // Optimistic: a stale vector beats a stalled loop
        self.state = LinkState::Ready;
    }

    /// Drain frames handed over by the receive path.
    pub fn poll_inbound(&mut self) {
        while let Ok(mut frame) = self.inbox.try_receive() {
            self.on_frame_received(&mut frame);
        }
    }

    /// One cycle: absorb replies, offer `qp`, return the filtered command.
    pub fn exchange(&mut self, qp: &QpData) -> ControlVector {
        self.poll_inbound();
        self.send(qp);
        self.safe_u()
    }

    /// Forget the filtered command, e.g. after a control-law switch. A reply
    /// still in flight is consumed without being used.
    pub fn reset(&mut self) {
        self.safe = SafeReply::default();
        self.discard_reply = self.state == LinkState::Busy;
    }

    fn force_stop(&mut self) {
        self.safe.u = ControlVector::ZERO;
        self.stats.failsafes = self.stats.failsafes.wrapping_add(1);
    }
}
