#[cfg_attr(test, allow(unused_imports))]
use micromath::F32Ext;

/// Second-order low-pass (Direct Form 2 Transposed), used on PID
/// derivative terms.
#[derive(Clone, Copy, Debug)]
pub struct BiquadFilter {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
    initialized: bool,
}

impl BiquadFilter {
    pub fn new_lpf(cutoff_freq: f32, sample_rate: f32, q: f32) -> Self {
        let omega = 2.0 * core::f32::consts::PI * cutoff_freq / sample_rate;
        let sn = omega.sin();
        let cs = omega.cos();
        let alpha = sn / (2.0 * q);

        let a0 = 1.0 + alpha;
        let b0 = (1.0 - cs) / 2.0;

        Self {
            b0: b0 / a0,
            b1: (1.0 - cs) / a0,
            b2: b0 / a0,
            a1: -2.0 * cs / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
            initialized: false,
        }
    }

    /// Butterworth Q.
    pub fn butterworth(cutoff_freq: f32, sample_rate: f32) -> Self {
        Self::new_lpf(cutoff_freq, sample_rate, core::f32::consts::FRAC_1_SQRT_2)
    }

    pub fn filter(&mut self, input: f32) -> f32 {
        if !self.initialized {
            // Steady state for a constant input at unity DC gain
            self.z1 = input * (1.0 - self.b0);
            self.z2 = input * (self.b2 - self.a2);
            self.initialized = true;
        }

        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;

        output
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
        self.initialized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_input_passes_unchanged() {
        let mut lpf = BiquadFilter::butterworth(20.0, 500.0);
        for _ in 0..50 {
            assert!((lpf.filter(3.0) - 3.0).abs() < 1e-4);
        }
    }

    #[test]
    fn attenuates_above_cutoff() {
        let mut lpf = BiquadFilter::butterworth(10.0, 500.0);
        let mut peak = 0.0f32;
        for i in 0..1000 {
            // 125 Hz alternating +1/-1/... at 500 Hz sampling
            let x = if (i / 2) % 2 == 0 { 1.0 } else { -1.0 };
            let y = lpf.filter(x);
            if i > 500 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 0.1, "peak {}", peak);
    }

    #[test]
    fn reset_forgets_history() {
        let mut lpf = BiquadFilter::butterworth(20.0, 500.0);
        lpf.filter(5.0);
        lpf.filter(5.0);
        lpf.reset();
        assert!((lpf.filter(-1.0) + 1.0).abs() < 1e-4);
    }
}
