#![cfg_attr(not(test), no_std)]

//! LQR flight core with an offloaded CBF-QP safety filter.
//!
//! The control cascade ([`controller`]) runs a dual-mode state-feedback law
//! ([`lqr`]) and ships the nominal command to a coprocessor over a framed,
//! fixed-point link ([`channel`], [`frame`], [`codec`]). The coprocessor
//! answers with a safety-filtered command. Everything here is `no_std`,
//! allocation-free and host-testable; the STM32 wiring lives in the
//! `firmware` binary.

#[macro_use]
mod log;

pub mod attitude;
pub mod channel;
pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod frame;
pub mod lqr;
pub mod payload;
pub mod pid;
pub mod rate;
pub mod state;
pub mod thrust;

pub use attitude::{AttitudeControl, PidAttitudeController};
pub use channel::{FrameInbox, LinkState, SafetyFilterChannel, Transport};
pub use config::{ControllerConfig, SafetyFilter};
pub use controller::LqrController;
pub use error::{ControlError, FrameError};
pub use lqr::LqrMode;
pub use state::{ActuatorCommand, ControlVector, SensorData, Setpoint, StateEstimate};
