//! Normalized thrust to motor command, from a static thrust-stand fit.

#[cfg_attr(test, allow(unused_imports))]
use micromath::F32Ext;

use crate::config::GRAVITY;

// thrust[g] = A·rpm² + B·rpm + C, per vehicle
const A: f32 = 109e-9;
const B: f32 = 210.6e-6;
const C: f32 = 0.154;
// rpm = D·cmd + E
const D: f32 = 0.2685;
const E: f32 = 4070.3;
const CMD_OFFSET: f32 = -9000.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThrustModel {
    mass_kg: f32,
}

impl ThrustModel {
    pub fn new(mass_kg: f32) -> Self {
        Self { mass_kg }
    }

    /// Normalized thrust [m/s²] to a 16-bit motor command.
    pub fn to_actuator(&self, thrust: f32) -> u16 {
        let grams = self.mass_kg * 1000.0 * thrust / GRAVITY;

        let discriminant = (B * B - 4.0 * A * (C - grams)).max(0.0);
        let rpm = (B + discriminant.sqrt()) / (2.0 * A);
        let cmd = (rpm - E) / D + CMD_OFFSET;

        if cmd.is_nan() {
            return 0;
        }
        cmd.clamp(0.0, u16::MAX as f32) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MASS_KG;

    #[test]
    fn hover_thrust() {
        let model = ThrustModel::new(DEFAULT_MASS_KG);
        let cmd = model.to_actuator(GRAVITY);
        assert!((43_100..43_300).contains(&cmd), "cmd {}", cmd);
    }

    #[test]
    fn clamps_both_ends() {
        let model = ThrustModel::new(DEFAULT_MASS_KG);
        assert_eq!(model.to_actuator(0.0), 0);
        assert_eq!(model.to_actuator(-5.0), 0);
        assert_eq!(model.to_actuator(18.0), u16::MAX);
        assert_eq!(model.to_actuator(f32::NAN), 0);
    }

    #[test]
    fn monotonic_in_thrust() {
        let model = ThrustModel::new(DEFAULT_MASS_KG);
        let mut last = 0;
        for i in 0..=160 {
            let cmd = model.to_actuator(i as f32 * 0.1);
            assert!(cmd >= last);
            last = cmd;
        }
    }
}
