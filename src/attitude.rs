//! Attitude and body-rate PID cascade.
//!
//! The LQR laws either command body rates directly or an attitude that this
//! cascade turns into rates first. Either way the rate loop produces the
//! roll/pitch/yaw actuator terms handed to power distribution.

use crate::pid::Pid;
use crate::state::{Attitude, Vec3};

/// Attitude and rate stabilization used under the LQR laws.
pub trait AttitudeControl {
    /// Attitude error [deg] to desired body rates [deg/s].
    fn correct_attitude(&mut self, measured: Attitude, desired: Attitude) -> Attitude;

    /// Gyro [deg/s] against desired rates [deg/s]; updates the actuator output.
    fn correct_rate(&mut self, gyro: Vec3, desired: Attitude);

    /// Roll, pitch, yaw actuator terms from the last rate update.
    fn actuator_output(&self) -> (i16, i16, i16);

    fn reset_all(&mut self);

    /// Self test: `true` when the controller is usable.
    fn test(&self) -> bool;
}

const RATE_LPF_CUTOFF_HZ: f32 = 30.0;

/// Crazyflie-class attitude/rate PID pair per axis.
pub struct PidAttitudeController {
    roll: Pid,
    pitch: Pid,
    yaw: Pid,
    roll_rate: Pid,
    pitch_rate: Pid,
    yaw_rate: Pid,
    output: (i16, i16, i16),
}

impl PidAttitudeController {
    /// `dt` is the attitude update period [s].
    pub fn new(dt: f32) -> Self {
        Self {
            roll: Pid::new(6.0, 3.0, 0.0, dt).with_integral_limit(20.0),
            pitch: Pid::new(6.0, 3.0, 0.0, dt).with_integral_limit(20.0),
            yaw: Pid::new(6.0, 1.0, 0.35, dt).with_integral_limit(360.0),
            roll_rate: Pid::new(250.0, 500.0, 2.5, dt)
                .with_integral_limit(33.3)
                .with_derivative_lpf(RATE_LPF_CUTOFF_HZ),
            pitch_rate: Pid::new(250.0, 500.0, 2.5, dt)
                .with_integral_limit(33.3)
                .with_derivative_lpf(RATE_LPF_CUTOFF_HZ),
            yaw_rate: Pid::new(120.0, 16.7, 0.0, dt)
                .with_integral_limit(166.7)
                .with_derivative_lpf(RATE_LPF_CUTOFF_HZ),
            output: (0, 0, 0),
        }
    }

    fn pids(&self) -> [&Pid; 6] {
        [
            &self.roll,
            &self.pitch,
            &self.yaw,
            &self.roll_rate,
            &self.pitch_rate,
            &self.yaw_rate,
        ]
    }
}

impl AttitudeControl for PidAttitudeController {
    fn correct_attitude(&mut self, measured: Attitude, desired: Attitude) -> Attitude {
        Attitude::new(
            self.roll.update(measured.roll, desired.roll),
            self.pitch.update(measured.pitch, desired.pitch),
            self.yaw.update_error(wrap_degrees(desired.yaw - measured.yaw)),
        )
    }

    fn correct_rate(&mut self, gyro: Vec3, desired: Attitude) {
        self.output = (
            saturate_i16(self.roll_rate.update(gyro.x, desired.roll)),
            saturate_i16(self.pitch_rate.update(gyro.y, desired.pitch)),
            saturate_i16(self.yaw_rate.update(gyro.z, desired.yaw)),
        );
    }

    fn actuator_output(&self) -> (i16, i16, i16) {
        self.output
    }

    fn reset_all(&mut self) {
        self.roll.reset();
        self.pitch.reset();
        self.yaw.reset();
        self.roll_rate.reset();
        self.pitch_rate.reset();
        self.yaw_rate.reset();
    }

    fn test(&self) -> bool {
        self.pids().iter().all(|pid| pid.is_valid())
    }
}

/// Wrap to (-180, 180].
fn wrap_degrees(mut angle: f32) -> f32 {
    while angle > 180.0 {
        angle -= 360.0;
    }
    while angle <= -180.0 {
        angle += 360.0;
    }
    angle
}

fn saturate_i16(value: f32) -> i16 {
    value.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 500.0;

    #[test]
    fn level_and_still_is_zero_output() {
        let mut ctrl = PidAttitudeController::new(DT);
        let rates = ctrl.correct_attitude(Attitude::ZERO, Attitude::ZERO);
        assert_eq!(rates, Attitude::ZERO);

        ctrl.correct_rate(Vec3::ZERO, Attitude::ZERO);
        assert_eq!(ctrl.actuator_output(), (0, 0, 0));
        assert!(ctrl.test());
    }

    #[test]
    fn roll_error_commands_roll_rate() {
        let mut ctrl = PidAttitudeController::new(DT);
        let rates = ctrl.correct_attitude(Attitude::ZERO, Attitude::new(10.0, 0.0, 0.0));
        // kp·e + ki·e·dt
        assert!((rates.roll - (60.0 + 3.0 * 10.0 * DT)).abs() < 1e-3);
        assert_eq!(rates.pitch, 0.0);
    }

    #[test]
    fn yaw_error_takes_the_short_way_round() {
        let mut ctrl = PidAttitudeController::new(DT);
        let rates = ctrl.correct_attitude(
            Attitude::new(0.0, 0.0, 170.0),
            Attitude::new(0.0, 0.0, -170.0),
        );
        // +20° the short way, not -340°
        assert!(rates.yaw > 0.0);
    }

    #[test]
    fn rate_output_saturates_to_i16() {
        let mut ctrl = PidAttitudeController::new(DT);
        ctrl.correct_rate(Vec3::ZERO, Attitude::new(1000.0, -1000.0, 0.0));
        let (roll, pitch, yaw) = ctrl.actuator_output();
        assert_eq!(roll, i16::MAX);
        assert_eq!(pitch, i16::MIN);
        assert_eq!(yaw, 0);
    }

    #[test]
    fn reset_all_forgets_integrals() {
        let mut ctrl = PidAttitudeController::new(DT);
        for _ in 0..100 {
            ctrl.correct_attitude(Attitude::ZERO, Attitude::new(5.0, 5.0, 5.0));
        }
        ctrl.reset_all();
        let rates = ctrl.correct_attitude(Attitude::ZERO, Attitude::ZERO);
        assert_eq!(rates, Attitude::ZERO);
    }

    #[test]
    fn wraps_degrees() {
        assert_eq!(wrap_degrees(190.0), -170.0);
        assert_eq!(wrap_degrees(-190.0), 170.0);
        assert_eq!(wrap_degrees(180.0), 180.0);
        assert_eq!(wrap_degrees(-180.0), 180.0);
    }
}
