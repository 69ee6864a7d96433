use crate::config::AltitudeTrimConfig;
use crate::filter::BiquadFilter;
use crate::rate::rate_do_execute;

/// Fixed-step PID with clamped integral and output.
///
/// A zero `output_limit` disables output clamping.
#[derive(Clone, Copy, Debug)]
pub struct Pid {
    kp: f32,
    ki: f32,
    kd: f32,
    dt: f32,
    integral: f32,
    integral_limit: f32,
    output_limit: f32,
    prev_error: f32,
    d_lpf: Option<BiquadFilter>,
}

impl Pid {
    pub fn new(kp: f32, ki: f32, kd: f32, dt: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            dt,
            integral: 0.0,
            integral_limit: f32::MAX,
            output_limit: 0.0,
            prev_error: 0.0,
            d_lpf: None,
        }
    }

    pub fn with_integral_limit(mut self, limit: f32) -> Self {
        self.integral_limit = limit.abs();
        self
    }

    pub fn with_output_limit(mut self, limit: f32) -> Self {
        self.output_limit = limit.abs();
        self
    }

    /// Low-pass the derivative term at `cutoff_hz`.
    pub fn with_derivative_lpf(mut self, cutoff_hz: f32) -> Self {
        self.d_lpf = Some(BiquadFilter::butterworth(cutoff_hz, 1.0 / self.dt));
        self
    }

    /// Finite gains and a positive step.
    pub fn is_valid(&self) -> bool {
        self.dt > 0.0 && self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
        if let Some(lpf) = &mut self.d_lpf {
            lpf.reset();
        }
    }

    pub fn update(&mut self, measured: f32, desired: f32) -> f32 {
        self.update_error(desired - measured)
    }

    /// Step on a precomputed error, e.g. one wrapped to ±180°.
    pub fn update_error(&mut self, error: f32) -> f32 {
        self.integral += error * self.dt;
        self.integral = self
            .integral
            .clamp(-self.integral_limit, self.integral_limit);

        let mut derivative = (error - self.prev_error) / self.dt;
        if let Some(lpf) = &mut self.d_lpf {
            derivative = lpf.filter(derivative);
        }
        self.prev_error = error;

        let output = self.kp * error + self.ki * self.integral + self.kd * derivative;
        if self.output_limit > 0.0 {
            output.clamp(-self.output_limit, self.output_limit)
        } else {
            output
        }
    }
}

/// Integral-only altitude correction on top of the LQR thrust.
#[derive(Clone, Copy, Debug)]
pub struct AltitudeTrim {
    rate_hz: u32,
    pid: Pid,
}

impl AltitudeTrim {
    pub fn new(config: &AltitudeTrimConfig) -> Self {
        let dt = 1.0 / config.rate_hz.max(1) as f32;
        Self {
            rate_hz: config.rate_hz,
            pid: Pid::new(0.0, config.ki, 0.0, dt)
                .with_integral_limit(config.integral_limit)
                .with_output_limit(config.output_limit)
                .with_derivative_lpf(config.lpf_cutoff_hz),
        }
    }

    /// Thrust correction [m/s²] on this tick, if the trim runs on it.
    pub fn update(&mut self, tick: u32, desired_z: f32, measured_z: f32) -> Option<f32> {
        rate_do_execute(self.rate_hz, tick).then(|| self.pid.update(measured_z, desired_z))
    }

    pub fn reset(&mut self) {
        self.pid.reset();
    }
}
