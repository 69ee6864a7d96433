//! The LQR control cascade.
//!
//! Called once per main-loop tick. Each stage is rate-gated against the tick:
//!
//! 1. `flying` follows the setpoint altitude
//! 2. the selected LQR law (optionally through the safety filter)
//! 3. reduced law only: attitude PID turns the angle command into rates
//! 4. optional altitude integral trim
//! 5. saturation and conversion to actuator units
//! 6. landing detection
//! 7. body-rate PID
//! 8. output, with all PIDs reset while the motors are off

use crate::attitude::AttitudeControl;
use crate::channel::{FrameReceiver, LinkStats, SafetyFilterChannel, Transport};
use crate::config::ControllerConfig;
use crate::error::ControlError;
use crate::lqr::{self, GainSelect, Gains, LqrMode, DEG2RAD, RAD2DEG};
use crate::payload::QpData;
use crate::pid::AltitudeTrim;
use crate::rate::rate_do_execute;
use crate::state::{
    ActuatorCommand, Attitude, ControlVector, SensorData, Setpoint, StateEstimate, TrackingError,
};
use crate::thrust::ThrustModel;

/// Values recorded on the last attitude tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Diagnostics {
    /// `[T p q r]` before saturation
    pub nominal: ControlVector,
    /// `[T p q r]` after saturation
    pub saturated: ControlVector,
    /// Last altitude trim contribution [m/s²]
    pub altitude_trim: f32,
    pub actuator_thrust: u16,
}

pub struct LqrController<'a, A: AttitudeControl, T: Transport> {
    config: ControllerConfig,
    mode: LqrMode,
    gains: Gains,
    attitude: A,
    link: SafetyFilterChannel<'a, T>,
    altitude_trim: Option<AltitudeTrim>,
    thrust_model: ThrustModel,
    /// `[T p q r]` before trim and saturation
    u: ControlVector,
    /// `[T φ θ ψ]` from the reduced law
    u_reduced: ControlVector,
    /// Last saturated `[T p q r]`
    command: ControlVector,
    /// Latest altitude trim [m/s²], applied once on top of the law thrust
    trim: f32,
    /// Run the law on the next step regardless of its rate
    law_pending: bool,
    error: TrackingError,
    /// [deg/s]
    rate_desired: Attitude,
    actuator_thrust: u16,
    flying: bool,
    diagnostics: Diagnostics,
}

impl<'a, A: AttitudeControl, T: Transport> LqrController<'a, A, T> {
    pub fn new(
        config: ControllerConfig,
        attitude: A,
        transport: T,
        inbox: FrameReceiver<'a>,
    ) -> Result<Self, ControlError> {
        config.validate()?;

        let mut controller = Self {
            config,
            mode: config.mode,
            gains: Gains::for_filter(config.safety_filter),
            attitude,
            link: SafetyFilterChannel::new(transport, inbox, config.missed_cycle_limit),
            altitude_trim: config.altitude_trim.as_ref().map(AltitudeTrim::new),
            thrust_model: ThrustModel::new(config.mass_kg),
            u: ControlVector::ZERO,
            u_reduced: ControlVector::ZERO,
            command: ControlVector::ZERO,
            trim: 0.0,
            law_pending: false,
            error: TrackingError::ZERO,
            rate_desired: Attitude::ZERO,
            actuator_thrust: 0,
            flying: false,
            diagnostics: Diagnostics::default(),
        };
        controller.init();
        Ok(controller)
    }

    /// Reset all control state and reload the default gains.
    pub fn init(&mut self) {
        self.mode = self.config.mode;
        self.gains = Gains::for_filter(self.config.safety_filter);
        self.u = ControlVector::ZERO;
        self.u_reduced = ControlVector::ZERO;
        self.command = ControlVector::ZERO;
        self.error = TrackingError::ZERO;
        self.law_pending = false;
        self.rate_desired = Attitude::ZERO;
        self.actuator_thrust = 0;
        self.flying = false;
        self.diagnostics = Diagnostics::default();
        self.link.reset();
        self.reset_pids();

        log_info!(
            "lqr: init, mode {}, safety filter {}",
            u8::from(self.mode),
            self.config.safety_filter.applies_to(self.mode)
        );
    }

    pub fn test(&self) -> bool {
        self.attitude.test()
    }

    pub fn mode(&self) -> LqrMode {
        self.mode
    }

    /// Switch control law.
    ///
    /// The reduced command, the tracking error, the filtered command and all
    /// PID state are dropped, and the new law runs on the next step whatever
    /// the tick. The last command keeps the motors running until then.
    pub fn set_mode(&mut self, mode: LqrMode) {
        if mode == self.mode {
            return;
        }
        log_info!("lqr: mode {} -> {}", u8::from(self.mode), u8::from(mode));
        self.mode = mode;
        self.u_reduced = ControlVector::ZERO;
        self.error = TrackingError::ZERO;
        self.link.reset();
        self.reset_pids();
        self.law_pending = true;
    }

    pub fn set_gain(
        &mut self,
        which: GainSelect,
        row: usize,
        col: usize,
        value: f32,
    ) -> Result<(), ControlError> {
        self.gains.set(which, row, col, value)
    }

    pub fn gains(&self) -> &Gains {
        &self.gains
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn is_flying(&self) -> bool {
        self.flying
    }

    /// Last saturated `[T p q r]`.
    pub fn control(&self) -> ControlVector {
        self.command
    }

    pub fn tracking_error(&self) -> TrackingError {
        self.error
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    pub fn link(&self) -> &SafetyFilterChannel<'a, T> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut SafetyFilterChannel<'a, T> {
        &mut self.link
    }

    pub fn link_stats(&self) -> LinkStats {
        self.link.stats()
    }

    pub fn step(
        &mut self,
        setpoint: &Setpoint,
        sensors: &SensorData,
        state: &StateEstimate,
        tick: u32,
    ) -> ActuatorCommand {
        self.flying = setpoint.position.z > 0.0;

        let law_rate_hz = match self.mode {
            LqrMode::FullState => self.config.full_state_rate_hz,
            LqrMode::Reduced => self.config.reduced_rate_hz,
        };
        let law_tick = self.law_pending || rate_do_execute(law_rate_hz, tick);
        if law_tick {
            self.law_pending = false;
            match self.mode {
                LqrMode::FullState => {
                    let (error, u) = lqr::full_state(&self.gains, setpoint, state);
                    self.error = error;
                    self.u = self.apply_safety_filter(u, state);
                }
                LqrMode::Reduced => {
                    let (error, u) = lqr::reduced(&self.gains, setpoint, state);
                    self.error = error;
                    self.u_reduced = self.apply_safety_filter(u, state);
                }
            }
        }

        let attitude_tick = rate_do_execute(self.config.attitude_rate_hz, tick);

        if self.mode == LqrMode::Reduced && attitude_tick {
            let measured = Attitude::new(
                state.attitude.roll,
                -state.attitude.pitch,
                state.attitude.yaw,
            );
            let desired = Attitude::new(
                self.u_reduced.roll * RAD2DEG,
                self.u_reduced.pitch * RAD2DEG,
                self.u_reduced.yaw * RAD2DEG,
            );
            let rates = self.attitude.correct_attitude(measured, desired);
            self.u = ControlVector::new(
                self.u_reduced.thrust,
                rates.roll * DEG2RAD,
                rates.pitch * DEG2RAD,
                rates.yaw * DEG2RAD,
            );
        }

        if let Some(trim) = &mut self.altitude_trim {
            if let Some(correction) = trim.update(tick, setpoint.position.z, state.position.z) {
                self.trim = correction;
            }
        }

        if attitude_tick {
            let mut nominal = self.u;
            nominal.thrust += self.trim;
            self.command = self.config.limits.apply(nominal);

            self.diagnostics.nominal = nominal;
            self.diagnostics.saturated = self.command;
            self.diagnostics.altitude_trim = self.trim;

            self.actuator_thrust = self.thrust_model.to_actuator(self.command.thrust);
            self.rate_desired = Attitude::new(
                self.command.roll * RAD2DEG,
                self.command.pitch * RAD2DEG,
                self.command.yaw * RAD2DEG,
            );
        }

        if self.error.position_magnitude() < self.config.landing_threshold_m
            && setpoint.position.z == 0.0
        {
            self.flying = false;
        }
        if !self.flying {
            self.actuator_thrust = 0;
        }
        self.diagnostics.actuator_thrust = self.actuator_thrust;

        if attitude_tick {
            self.attitude.correct_rate(sensors.gyro, self.rate_desired);
        }

        if self.actuator_thrust == 0 {
            self.reset_pids();
            ActuatorCommand::default()
        } else {
            let (roll, pitch, yaw) = self.attitude.actuator_output();
            ActuatorCommand {
                roll,
                pitch,
                yaw,
                thrust: self.actuator_thrust,
            }
        }
    }

    fn apply_safety_filter(&mut self, u: ControlVector, state: &StateEstimate) -> ControlVector {
        if !self.config.safety_filter.applies_to(self.mode) {
            return u;
        }

        let qp = match self.mode {
            LqrMode::FullState => QpData::Attitude {
                phi: state.attitude.roll * DEG2RAD,
                theta: -state.attitude.pitch * DEG2RAD,
                u,
            },
            LqrMode::Reduced => QpData::Position {
                position: state.position,
                velocity: state.velocity,
                u,
            },
        };
        self.link.exchange(&qp)
    }

    fn reset_pids(&mut self) {
        self.attitude.reset_all();
        if let Some(trim) = &mut self.altitude_trim {
            trim.reset();
        }
        self.trim = 0.0;
    }
}
