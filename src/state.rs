//! Shared data types passed between the estimator, the commander and the
//! control loop.
//!
//! All types are `Copy` to minimise overhead when sent through channels.

#[cfg_attr(test, allow(unused_imports))]
use micromath::F32Ext;

// ── Vectors ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Roll / pitch / yaw triple. Units depend on where it is used.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Attitude {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl Attitude {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }
}

// ── Inputs ────────────────────────────────────────────────────────────────────

/// Reference the controller tracks.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Setpoint {
    /// Position [m]
    pub position: Vec3,
    /// Velocity [m/s]
    pub velocity: Vec3,
    /// Nominal attitude [rad]
    pub attitude: Attitude,
    /// Nominal body rates [rad/s]
    pub attitude_rate: Attitude,
    /// Nominal normalized thrust [m/s²]
    pub thrust: f32,
}

impl Setpoint {
    /// Hover at `altitude_m` above the origin.
    pub fn hover(altitude_m: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, altitude_m),
            thrust: crate::config::GRAVITY,
            ..Self::default()
        }
    }
}

/// Estimator output.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StateEstimate {
    /// Position [m]
    pub position: Vec3,
    /// Velocity [m/s]
    pub velocity: Vec3,
    /// Attitude [deg], pitch in the estimator's (inverted) convention
    pub attitude: Attitude,
}

/// Raw-ish sensor data the rate loop needs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SensorData {
    /// Body rates [deg/s]
    pub gyro: Vec3,
}

// ── Control ───────────────────────────────────────────────────────────────────

/// Four-element control vector `u`.
///
/// `roll`, `pitch`, `yaw` are body rates [rad/s] for the full-state law and
/// attitude angles [rad] for the reduced law. `thrust` is normalized [m/s²].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlVector {
    pub thrust: f32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl ControlVector {
    /// Fail-safe vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(thrust: f32, roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { thrust, roll, pitch, yaw }
    }

    pub const fn from_array(u: [f32; 4]) -> Self {
        Self::new(u[0], u[1], u[2], u[3])
    }

    pub const fn to_array(self) -> [f32; 4] {
        [self.thrust, self.roll, self.pitch, self.yaw]
    }
}

/// Difference between the estimate and the setpoint, recomputed on every
/// control-law tick. Attitude is in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackingError {
    pub position: Vec3,
    pub attitude: Attitude,
    pub velocity: Vec3,
}

impl TrackingError {
    pub const ZERO: Self = Self {
        position: Vec3::ZERO,
        attitude: Attitude::ZERO,
        velocity: Vec3::ZERO,
    };

    /// `[x y z φ θ ψ ẋ ẏ ż]`
    pub fn full_state(&self) -> [f32; 9] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.attitude.roll,
            self.attitude.pitch,
            self.attitude.yaw,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
        ]
    }

    /// `[x y z ẋ ẏ ż]`
    pub fn reduced(&self) -> [f32; 6] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
        ]
    }

    /// Summed absolute position error [m], used for landing detection.
    pub fn position_magnitude(&self) -> f32 {
        self.position.x.abs() + self.position.y.abs() + self.position.z.abs()
    }
}

/// Output handed to power distribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorCommand {
    pub roll: i16,
    pub pitch: i16,
    pub yaw: i16,
    /// Collective in actuator units (0 = motors off)
    pub thrust: u16,
}
