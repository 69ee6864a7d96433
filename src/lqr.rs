//! State-feedback (LQR) control laws.
//!
//! - **Full state** (D9): `err = [x y z φ θ ψ ẋ ẏ ż]`, output `[T p q r]`
//! - **Reduced** (D6): `err = [x y z ẋ ẏ ż]`, output `[T φ θ ψ]`, which the
//!   cascade turns into rates with the attitude PID
//!
//! Both apply negative feedback around the setpoint's nominal command:
//! `u = u_ref − K·err`.

use core::f32::consts::PI;

use crate::config::SafetyFilter;
use crate::error::ControlError;
use crate::state::{Attitude, ControlVector, Setpoint, StateEstimate, TrackingError};

pub const DEG2RAD: f32 = PI / 180.0;
pub const RAD2DEG: f32 = 180.0 / PI;

/// 4×N feedback gain.
pub type GainMatrix<const N: usize> = [[f32; N]; 4];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LqrMode {
    /// D9: attitude + position feedback producing body rates
    #[default]
    FullState,
    /// D6: position-only feedback producing an attitude command
    Reduced,
}

impl TryFrom<u8> for LqrMode {
    type Error = ControlError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::FullState),
            1 => Ok(Self::Reduced),
            other => Err(ControlError::UnknownMode(other)),
        }
    }
}

impl From<LqrMode> for u8 {
    fn from(mode: LqrMode) -> Self {
        match mode {
            LqrMode::FullState => 0,
            LqrMode::Reduced => 1,
        }
    }
}

/// Selects the matrix a tuning write targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GainSelect {
    FullState,
    Reduced,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gains {
    pub full: GainMatrix<9>,
    pub reduced: GainMatrix<6>,
}

impl Gains {
    /// Default linearization gains. The reduced law uses a stiffer position
    /// tuning when the position barrier is active.
    pub fn for_filter(filter: SafetyFilter) -> Self {
        // rho = 1, Murray method
        let mut full = [[0.0f32; 9]; 4];
        full[0][2] = 4.0;
        full[0][8] = 3.4641;
        full[1][1] = -3.4907;
        full[1][3] = 7.8518;
        full[1][7] = -2.9384;
        full[2][0] = 3.4907;
        full[2][4] = 7.8518;
        full[2][6] = 2.9384;
        full[3][5] = 2.0;

        let mut reduced = [[0.0f32; 6]; 4];
        if filter == SafetyFilter::Position {
            // Q = [20 20 100 1 1 1], R = [0.1 20 20 40]
            reduced[0][2] = 31.6228;
            reduced[0][5] = 8.5584;
            reduced[1][1] = -1.0;
            reduced[1][4] = -0.5039;
            reduced[2][0] = 1.0;
            reduced[2][3] = 0.5039;
        } else {
            // rho = 0.5, Murray method
            reduced[0][2] = 5.6569;
            reduced[0][5] = 4.3947;
            reduced[1][1] = -2.4683;
            reduced[1][4] = -1.4235;
            reduced[2][0] = 2.4683;
            reduced[2][3] = 1.4235;
        }

        Self { full, reduced }
    }

    /// Overwrite one gain element.
    pub fn set(
        &mut self,
        which: GainSelect,
        row: usize,
        col: usize,
        value: f32,
    ) -> Result<(), ControlError> {
        let slot = match which {
            GainSelect::FullState => self.full.get_mut(row).and_then(|r| r.get_mut(col)),
            GainSelect::Reduced => self.reduced.get_mut(row).and_then(|r| r.get_mut(col)),
        };
        let slot = slot.ok_or(ControlError::GainIndex { row, col })?;
        *slot = value;
        Ok(())
    }
}

impl Default for Gains {
    fn default() -> Self {
        Self::for_filter(SafetyFilter::Disabled)
    }
}

/// `u_ref − K·err`
pub fn feedback<const N: usize>(
    k: &GainMatrix<N>,
    err: &[f32; N],
    nominal: ControlVector,
) -> ControlVector {
    let mut u = nominal.to_array();
    for (out, row) in u.iter_mut().zip(k.iter()) {
        let delta: f32 = row.iter().zip(err.iter()).map(|(k, e)| k * e).sum();
        *out -= delta;
    }
    ControlVector::from_array(u)
}

/// Error for the full-state law. The estimator reports attitude in degrees
/// with pitch inverted; the setpoint is in radians.
pub fn full_state_error(setpoint: &Setpoint, state: &StateEstimate) -> TrackingError {
    let mut err = reduced_error(setpoint, state);
    err.attitude = Attitude::new(
        state.attitude.roll * DEG2RAD - setpoint.attitude.roll,
        -state.attitude.pitch * DEG2RAD - setpoint.attitude.pitch,
        state.attitude.yaw * DEG2RAD - setpoint.attitude.yaw,
    );
    err
}

/// Error for the reduced law (attitude left at zero).
pub fn reduced_error(setpoint: &Setpoint, state: &StateEstimate) -> TrackingError {
    let p = state.position;
    let v = state.velocity;
    let sp = setpoint.position;
    let sv = setpoint.velocity;
    TrackingError {
        position: crate::state::Vec3::new(p.x - sp.x, p.y - sp.y, p.z - sp.z),
        attitude: Attitude::ZERO,
        velocity: crate::state::Vec3::new(v.x - sv.x, v.y - sv.y, v.z - sv.z),
    }
}

/// Full-state law: returns the error and `[T p q r]`.
pub fn full_state(
    gains: &Gains,
    setpoint: &Setpoint,
    state: &StateEstimate,
) -> (TrackingError, ControlVector) {
    let err = full_state_error(setpoint, state);
    let nominal = ControlVector::new(
        setpoint.thrust,
        setpoint.attitude_rate.roll,
        setpoint.attitude_rate.pitch,
        setpoint.attitude_rate.yaw,
    );
    (err, feedback(&gains.full, &err.full_state(), nominal))
}

/// Reduced law: returns the error and `[T φ θ ψ]`.
pub fn reduced(
    gains: &Gains,
    setpoint: &Setpoint,
    state: &StateEstimate,
) -> (TrackingError, ControlVector) {
    let err = reduced_error(setpoint, state);
    let nominal = ControlVector::new(
        setpoint.thrust,
        setpoint.attitude.roll,
        setpoint.attitude.pitch,
        setpoint.attitude.yaw,
    );
    (err, feedback(&gains.reduced, &err.reduced(), nominal))
}
