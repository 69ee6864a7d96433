#![no_std]
#![no_main]

mod board;
mod tasks;

use embassy_executor::Spawner;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::usart::Uart;
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

use lqr_cbf_flight::{
    log_info, ActuatorCommand, ControllerConfig, FrameInbox, LqrController, PidAttitudeController,
    SafetyFilter, SensorData, Setpoint, StateEstimate,
};

use crate::board::{COPROC_BOOT_DELAY, COPROC_RESET_PULSE};
use crate::tasks::control::control_task;
use crate::tasks::coproc::{coproc_rx_task, coproc_tx_task, OutboundFrames, ResyncSignal, UartLink};

// ── Coprocessor link ──────────────────────────────────────────────────────────
static INBOX: FrameInbox = FrameInbox::new();
static OUTBOUND: OutboundFrames = OutboundFrames::new();
static RESYNC: ResyncSignal = ResyncSignal::new();

// ── Inter-task channels ───────────────────────────────────────────────────────
//  Cap=1: the control loop only ever wants the latest value.
//  Producers are the estimator and commander; power distribution consumes.
static SETPOINT_CHAN: Channel<CriticalSectionRawMutex, Setpoint,        1> = Channel::new();
static ESTIMATE_CHAN: Channel<CriticalSectionRawMutex, StateEstimate,   1> = Channel::new();
static SENSOR_CHAN:   Channel<CriticalSectionRawMutex, SensorData,      1> = Channel::new();
static ACTUATOR_CHAN: Channel<CriticalSectionRawMutex, ActuatorCommand, 1> = Channel::new();

// ── Interrupt bindings ────────────────────────────────────────────────────────
bind_interrupts!(struct Irqs {
    USART3 => embassy_stm32::usart::InterruptHandler<peripherals::USART3>;
});

// ── Main ──────────────────────────────────────────────────────────────────────
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // 1. Board init (168 MHz PLL)
    let mut p = board::init();

    // 2. Coprocessor USART3 (TX=PB10, RX=PB11)
    let uart = Uart::new(
        p.USART3, p.PB11, p.PB10,
        Irqs,
        p.DMA1_CH3, p.DMA1_CH1,
        board::coproc_uart_config(),
    ).unwrap();
    let (uart_tx, uart_rx) = uart.split();

    // 3. Heartbeat LED (PC13)
    let mut led = Output::new(p.PC13, Level::High, Speed::Low);

    // 4. Coprocessor reset pulse (PB5) so it boots into a clean frame stream
    Timer::after(COPROC_BOOT_DELAY).await;
    {
        let _reset = Output::new(&mut p.PB5, Level::Low, Speed::Low);
        Timer::after(COPROC_RESET_PULSE).await;
    }
    let _reset_release = Input::new(p.PB5, Pull::Up);

    // 5. Controller
    let config = ControllerConfig {
        safety_filter: SafetyFilter::Attitude,
        ..Default::default()
    };
    let controller = LqrController::new(
        config,
        PidAttitudeController::new(config.attitude_dt()),
        UartLink::new(OUTBOUND.sender(), &RESYNC),
        INBOX.receiver(),
    ).unwrap();
    log_info!("main: controller ready");

    // 6. Spawn all tasks
    spawner.spawn(coproc_rx_task(uart_rx, INBOX.sender(), &RESYNC)).unwrap();
    spawner.spawn(coproc_tx_task(uart_tx, OUTBOUND.receiver())).unwrap();
    spawner.spawn(control_task(
        controller,
        SETPOINT_CHAN.receiver(),
        ESTIMATE_CHAN.receiver(),
        SENSOR_CHAN.receiver(),
        ACTUATOR_CHAN.sender(),
    )).unwrap();

    // 7. Main task: LED heartbeat @ 1 Hz
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(500)).await;
    }
}
