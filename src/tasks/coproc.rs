use embassy_executor::task;
use embassy_futures::select::{select, Either};
use embassy_stm32::peripherals::{DMA1_CH1, DMA1_CH3, USART3};
use embassy_stm32::usart::{UartRx, UartTx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};

use lqr_cbf_flight::channel::FrameSender;
use lqr_cbf_flight::frame::{Frame, FRAME_LEN};
use lqr_cbf_flight::{log_debug, log_warn, Transport};

pub type CoprocTx = UartTx<'static, USART3, DMA1_CH3>;
pub type CoprocRx = UartRx<'static, USART3, DMA1_CH1>;
pub type OutboundFrames = Channel<CriticalSectionRawMutex, Frame, 1>;
pub type ResyncSignal = Signal<CriticalSectionRawMutex, usize>;

/// Line silence after which the coprocessor is assumed to sit between frames
const IDLE_TIMEOUT: Duration = Duration::from_millis(2);

/// Control-loop side of the USART3 link: frames go to the TX task, resync
/// requests to the RX task. Neither call blocks.
pub struct UartLink {
    outbound: Sender<'static, CriticalSectionRawMutex, Frame, 1>,
    resync: &'static ResyncSignal,
}

impl UartLink {
    pub fn new(
        outbound: Sender<'static, CriticalSectionRawMutex, Frame, 1>,
        resync: &'static ResyncSignal,
    ) -> Self {
        Self { outbound, resync }
    }
}

impl Transport for UartLink {
    fn send(&mut self, frame: &Frame) {
        // A dropped frame shows up as missed cycles on the channel
        if self.outbound.try_send(*frame).is_err() {
            log_warn!("coproc: tx queue full, frame dropped");
        }
    }

    fn resync(&mut self, expected_len: usize) {
        self.resync.signal(expected_len);
    }
}

/// Coprocessor TX task: writes each queued frame with DMA.
#[task]
pub async fn coproc_tx_task(
    mut tx: CoprocTx,
    outbound: Receiver<'static, CriticalSectionRawMutex, Frame, 1>,
) {
    loop {
        let frame = outbound.receive().await;
        if tx.write(frame.as_bytes()).await.is_err() {
            log_warn!("coproc: uart write failed");
        }
    }
}

/// Coprocessor RX task: reads whole frames into the inbox. A resync request
/// aborts the read in progress and re-arms on the next frame boundary.
#[task]
pub async fn coproc_rx_task(
    mut rx: CoprocRx,
    inbox: FrameSender<'static>,
    resync: &'static ResyncSignal,
) {
    let mut frame = Frame::empty();

    loop {
        let event = select(rx.read(frame.as_bytes_mut()), resync.wait()).await;
        match event {
            Either::First(Ok(())) => {
                if inbox.try_send(frame).is_err() {
                    log_debug!("coproc: inbox full, frame dropped");
                }
            }
            Either::First(Err(_)) => {
                log_warn!("coproc: uart read error, resyncing");
                realign(&mut rx, FRAME_LEN).await;
            }
            Either::Second(expected_len) => {
                realign(&mut rx, expected_len).await;
            }
        }
        frame.clear();
    }
}

/// Swallow the rest of a broken frame, returning once the line goes idle.
async fn realign(rx: &mut CoprocRx, expected_len: usize) {
    let mut scratch = [0u8; FRAME_LEN];
    let window = &mut scratch[..expected_len.clamp(1, FRAME_LEN)];
    let window_len = window.len();

    loop {
        match select(rx.read_until_idle(window), Timer::after(IDLE_TIMEOUT)).await {
            // Buffer filled before idle: still inside a burst
            Either::First(Ok(n)) if n == window_len => continue,
            _ => break,
        }
    }
    log_debug!("coproc: realigned");
}
