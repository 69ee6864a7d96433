//! Controller configuration.
//!
//! Defaults reproduce the tuned values the vehicle flies with; everything is
//! plain data so a parameter layer can overwrite fields before
//! [`LqrController::new`](crate::LqrController::new).

use crate::error::ControlError;
use crate::lqr::LqrMode;
use crate::rate::{MAIN_LOOP_RATE_HZ, RATE_100_HZ, RATE_500_HZ};
use crate::state::ControlVector;

/// Standard gravity [m/s²]
pub const GRAVITY: f32 = 9.81;
/// Crazyflie 2.x take-off mass [kg]
pub const DEFAULT_MASS_KG: f32 = 0.032;
/// Consecutive busy cycles tolerated before the fail-safe vector is forced
pub const MISSED_CYCLE_LIMIT: u16 = 200;
/// Summed position error [m] below which a zero-altitude setpoint lands
pub const LANDING_THRESHOLD_M: f32 = 0.075;

/// Which barrier the coprocessor enforces, if any.
///
/// The attitude barrier filters the full-state (rate) command, the position
/// barrier filters the reduced (angle) command. A filter that does not match
/// the active law is skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyFilter {
    #[default]
    Disabled,
    /// Limits roll and pitch `[φ θ]`
    Attitude,
    /// Limits position `[x y z]`
    Position,
}

impl SafetyFilter {
    pub fn applies_to(self, mode: LqrMode) -> bool {
        matches!(
            (self, mode),
            (Self::Attitude, LqrMode::FullState) | (Self::Position, LqrMode::Reduced)
        )
    }
}

/// Output saturation applied at the attitude rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SaturationLimits {
    /// [m/s²]
    pub thrust_min: f32,
    /// [m/s²]
    pub thrust_max: f32,
    /// Symmetric body-rate limit [rad/s]
    pub rate_max: f32,
}

impl Default for SaturationLimits {
    fn default() -> Self {
        Self {
            thrust_min: 0.0,
            thrust_max: 18.0,
            rate_max: 3.5, // ~200 deg/s
        }
    }
}

impl SaturationLimits {
    /// Clamp thrust to `[thrust_min, thrust_max]` and each rate to `±rate_max`.
    pub fn apply(&self, u: ControlVector) -> ControlVector {
        ControlVector::new(
            u.thrust.clamp(self.thrust_min, self.thrust_max),
            u.roll.clamp(-self.rate_max, self.rate_max),
            u.pitch.clamp(-self.rate_max, self.rate_max),
            u.yaw.clamp(-self.rate_max, self.rate_max),
        )
    }
}

/// Integral-only altitude trim added on top of the LQR thrust.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AltitudeTrimConfig {
    pub rate_hz: u32,
    pub ki: f32,
    /// [m]
    pub integral_limit: f32,
    /// [m/s²]
    pub output_limit: f32,
    /// Derivative low-pass cutoff [Hz]
    pub lpf_cutoff_hz: f32,
}

impl Default for AltitudeTrimConfig {
    fn default() -> Self {
        Self {
            rate_hz: RATE_100_HZ,
            ki: 1.0,
            integral_limit: 0.5,
            output_limit: 0.5,
            lpf_cutoff_hz: 20.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerConfig {
    pub mode: LqrMode,
    pub full_state_rate_hz: u32,
    pub reduced_rate_hz: u32,
    pub attitude_rate_hz: u32,
    pub safety_filter: SafetyFilter,
    pub missed_cycle_limit: u16,
    pub limits: SaturationLimits,
    pub landing_threshold_m: f32,
    /// `None` disables the altitude integral
    pub altitude_trim: Option<AltitudeTrimConfig>,
    pub mass_kg: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            mode: LqrMode::FullState,
            full_state_rate_hz: RATE_100_HZ,
            reduced_rate_hz: RATE_100_HZ,
            attitude_rate_hz: RATE_500_HZ,
            safety_filter: SafetyFilter::Disabled,
            missed_cycle_limit: MISSED_CYCLE_LIMIT,
            limits: SaturationLimits::default(),
            landing_threshold_m: LANDING_THRESHOLD_M,
            altitude_trim: None,
            mass_kg: DEFAULT_MASS_KG,
        }
    }
}

impl ControllerConfig {
    /// Check every rate divides the main loop.
    pub fn validate(&self) -> Result<(), ControlError> {
        check_rate(self.full_state_rate_hz)?;
        check_rate(self.reduced_rate_hz)?;
        check_rate(self.attitude_rate_hz)?;
        if let Some(trim) = &self.altitude_trim {
            check_rate(trim.rate_hz)?;
        }
        Ok(())
    }

    /// Attitude update period [s]
    pub fn attitude_dt(&self) -> f32 {
        1.0 / self.attitude_rate_hz as f32
    }
}

fn check_rate(rate_hz: u32) -> Result<(), ControlError> {
    if rate_hz == 0 || rate_hz > MAIN_LOOP_RATE_HZ || MAIN_LOOP_RATE_HZ % rate_hz != 0 {
        return Err(ControlError::InvalidRate(rate_hz));
    }
    Ok(())
}
