//! Closed loop against an in-process coprocessor that answers over the
//! frame inbox, the way the UART receive task does on hardware.

use lqr_cbf_flight::channel::FrameSender;
use lqr_cbf_flight::frame::{Frame, MAX_PAYLOAD_LEN};
use lqr_cbf_flight::payload::{QpData, SafeReply};
use lqr_cbf_flight::state::Vec3;
use lqr_cbf_flight::{
    ControllerConfig, FrameInbox, LqrController, LqrMode, PidAttitudeController, SafetyFilter,
    SensorData, Setpoint, StateEstimate, Transport,
};

/// Caps thrust at `thrust_cap` and answers every request immediately.
struct ThrustBarrier<'a> {
    filter: SafetyFilter,
    thrust_cap: f32,
    replies: FrameSender<'a>,
    requests: u16,
    corrupt_first: bool,
    resyncs: usize,
}

impl<'a> ThrustBarrier<'a> {
    fn new(filter: SafetyFilter, replies: FrameSender<'a>) -> Self {
        Self {
            filter,
            thrust_cap: 10.0,
            replies,
            requests: 0,
            corrupt_first: false,
            resyncs: 0,
        }
    }
}

impl Transport for ThrustBarrier<'_> {
    fn send(&mut self, frame: &Frame) {
        let mut request = *frame;
        let mut raw = [0u8; MAX_PAYLOAD_LEN];
        request.unpack(&mut raw).unwrap();
        let qp = QpData::decompress(self.filter, &raw).unwrap();
        self.requests += 1;

        let mut u = qp.nominal();
        u.thrust = u.thrust.min(self.thrust_cap);

        let mut reply = Frame::empty();
        reply
            .pack(&SafeReply { u, iterations: self.requests }.to_bytes())
            .unwrap();
        if self.corrupt_first && self.requests == 1 {
            reply.as_bytes_mut()[0] = 0x00;
        }
        self.replies.try_send(reply).unwrap();
    }

    fn resync(&mut self, _expected_len: usize) {
        self.resyncs += 1;
    }
}

/// Never answers.
#[derive(Default)]
struct Silent {
    requests: usize,
}

impl Transport for Silent {
    fn send(&mut self, _frame: &Frame) {
        self.requests += 1;
    }

    fn resync(&mut self, _expected_len: usize) {}
}

fn below(altitude: f32) -> StateEstimate {
    StateEstimate {
        position: Vec3::new(0.0, 0.0, altitude),
        ..Default::default()
    }
}

#[test]
fn position_barrier_caps_climb_thrust() {
    let inbox = FrameInbox::new();
    let config = ControllerConfig {
        mode: LqrMode::Reduced,
        safety_filter: SafetyFilter::Position,
        ..Default::default()
    };
    let mut ctrl = LqrController::new(
        config,
        PidAttitudeController::new(config.attitude_dt()),
        ThrustBarrier::new(SafetyFilter::Position, inbox.sender()),
        inbox.receiver(),
    )
    .unwrap();

    let sp = Setpoint::hover(1.0);
    let sensors = SensorData::default();
    for tick in 0..20 {
        ctrl.step(&sp, &sensors, &below(0.5), tick);
    }
    let last = ctrl.step(&sp, &sensors, &below(0.5), 20);

    // Nominal climb thrust is well above the cap
    assert!(ctrl.diagnostics().nominal.thrust <= 10.0 + 1e-3);
    assert!((ctrl.control().thrust - 10.0).abs() < 1e-3);
    assert!(last.thrust > 0);
    let stats = ctrl.link_stats();
    assert_eq!(stats.frames_sent, 3);
    assert_eq!(stats.replies, 2);
    assert_eq!(stats.last_iterations, 2);
}

#[test]
fn silent_coprocessor_falls_back_to_failsafe() {
    let inbox = FrameInbox::new();
    let config = ControllerConfig {
        safety_filter: SafetyFilter::Attitude,
        ..Default::default()
    };
    let mut ctrl = LqrController::new(
        config,
        PidAttitudeController::new(config.attitude_dt()),
        Silent::default(),
        inbox.receiver(),
    )
    .unwrap();

    let sp = Setpoint::hover(1.0);
    let sensors = SensorData::default();

    // One request, then 200 busy law ticks at 100 Hz
    for tick in 0..=2000 {
        let cmd = ctrl.step(&sp, &sensors, &below(1.0), tick);
        assert_eq!(cmd.thrust, 0);
    }
    assert_eq!(ctrl.link_stats().failsafes, 1);
    assert_eq!(ctrl.link().transport().requests, 1);

    // Link re-armed: the next law tick sends again
    ctrl.step(&sp, &sensors, &below(1.0), 2010);
    assert_eq!(ctrl.link().transport().requests, 2);
}

#[test]
fn corrupt_reply_resyncs_then_recovers() {
    let inbox = FrameInbox::new();
    let config = ControllerConfig {
        safety_filter: SafetyFilter::Attitude,
        ..Default::default()
    };
    let mut coprocessor = ThrustBarrier::new(SafetyFilter::Attitude, inbox.sender());
    coprocessor.corrupt_first = true;
    let mut ctrl = LqrController::new(
        config,
        PidAttitudeController::new(config.attitude_dt()),
        coprocessor,
        inbox.receiver(),
    )
    .unwrap();

    let sp = Setpoint::hover(1.0);
    let sensors = SensorData::default();
    for tick in (0..=20).step_by(10) {
        ctrl.step(&sp, &sensors, &below(1.0), tick);
    }

    assert_eq!(ctrl.link().transport().resyncs, 1);
    assert_eq!(ctrl.link_stats().bad_frames, 1);
    // Hover thrust is under the cap and passes through unchanged
    assert!((ctrl.control().thrust - 9.81).abs() < 1e-3);
}

#[test]
fn mode_parameter_switches_law_at_runtime() {
    let inbox = FrameInbox::new();
    let config = ControllerConfig::default();
    let mut ctrl = LqrController::new(
        config,
        PidAttitudeController::new(config.attitude_dt()),
        Silent::default(),
        inbox.receiver(),
    )
    .unwrap();

    assert_eq!(ctrl.mode(), LqrMode::FullState);
    ctrl.set_mode(LqrMode::try_from(1u8).unwrap());
    assert_eq!(ctrl.mode(), LqrMode::Reduced);
    assert!(LqrMode::try_from(2u8).is_err());

    let cmd = ctrl.step(&Setpoint::hover(1.0), &SensorData::default(), &below(0.9), 0);
    assert!(cmd.thrust > 0);
    assert_eq!(ctrl.link().transport().requests, 0);
}
