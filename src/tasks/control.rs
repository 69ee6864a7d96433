use embassy_executor::task;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_time::{Duration, Ticker};

use lqr_cbf_flight::rate::MAIN_LOOP_RATE_HZ;
use lqr_cbf_flight::{
    log_info, log_warn, ActuatorCommand, LqrController, PidAttitudeController, SensorData,
    Setpoint, StateEstimate,
};

use super::coproc::UartLink;

pub type FlightController = LqrController<'static, PidAttitudeController, UartLink>;

/// Control task at the main-loop rate.
/// Takes the latest setpoint, estimate and gyro sample from the estimator and
/// commander, runs one controller step and publishes the actuator command for
/// power distribution.
#[task]
pub async fn control_task(
    mut controller: FlightController,
    setpoint_rx: Receiver<'static, CriticalSectionRawMutex, Setpoint, 1>,
    estimate_rx: Receiver<'static, CriticalSectionRawMutex, StateEstimate, 1>,
    sensor_rx: Receiver<'static, CriticalSectionRawMutex, SensorData, 1>,
    actuator_tx: Sender<'static, CriticalSectionRawMutex, ActuatorCommand, 1>,
) {
    if !controller.test() {
        log_warn!("control: attitude controller self test failed");
    }

    let mut setpoint = Setpoint::default();
    let mut estimate = StateEstimate::default();
    let mut sensors = SensorData::default();

    let mut ticker = Ticker::every(Duration::from_hz(MAIN_LOOP_RATE_HZ as u64));
    let mut tick: u32 = 0;

    loop {
        ticker.next().await;

        // Refresh from channels (non-blocking)
        if let Ok(s) = setpoint_rx.try_receive() { setpoint = s; }
        if let Ok(e) = estimate_rx.try_receive() { estimate = e; }
        if let Ok(d) = sensor_rx.try_receive()   { sensors = d; }

        let cmd = controller.step(&setpoint, &sensors, &estimate, tick);
        let _ = actuator_tx.try_send(cmd);

        if tick % MAIN_LOOP_RATE_HZ == 0 {
            let stats = controller.link_stats();
            log_info!(
                "control: flying={} thrust={} link tx={} rx={} bad={} stop={} failsafe={} iters={}",
                controller.is_flying(),
                cmd.thrust,
                stats.frames_sent,
                stats.replies,
                stats.bad_frames,
                stats.stop_frames,
                stats.failsafes,
                stats.last_iterations
            );
        }

        tick = tick.wrapping_add(1);
    }
}
