//! Board constants and bring-up for the STM32F405 controller.
//!
//! Clock tree: 8 MHz HSE / 4 × 168 / 2 = 168 MHz SYSCLK, APB1 at 42 MHz
//! (USART3 to the coprocessor), APB2 at 84 MHz. Nothing here needs the
//! 48 MHz PLLQ tap, so it stays off.

use embassy_stm32::rcc::{
    AHBPrescaler, APBPrescaler, Hse, HseMode, Pll, PllMul, PllPDiv, PllPreDiv, PllSource, Sysclk,
};
use embassy_stm32::time::Hertz;
use embassy_stm32::usart::Config as UsartConfig;
use embassy_stm32::{Config, Peripherals};
use embassy_time::Duration;

use lqr_cbf_flight::log_info;

pub const HSE_HZ: u32 = 8_000_000;
pub const SYSCLK_HZ: u32 = 168_000_000;

/// Coprocessor UART line rate
pub const COPROC_BAUD: u32 = 115_200;
/// Let the coprocessor power up before pulling its reset line
pub const COPROC_BOOT_DELAY: Duration = Duration::from_millis(1000);
pub const COPROC_RESET_PULSE: Duration = Duration::from_millis(10);

fn clock_config() -> Config {
    let mut config = Config::default();
    let rcc = &mut config.rcc;

    rcc.hse = Some(Hse {
        freq: Hertz(HSE_HZ),
        mode: HseMode::Oscillator,
    });
    rcc.pll_src = PllSource::HSE;
    // 2 MHz VCO input
    rcc.pll = Some(Pll {
        prediv: PllPreDiv::DIV4,
        mul: PllMul::MUL168,
        divp: Some(PllPDiv::DIV2),
        divq: None,
        divr: None,
    });
    rcc.sys = Sysclk::PLL1_P;
    rcc.ahb_pre = AHBPrescaler::DIV1;
    rcc.apb1_pre = APBPrescaler::DIV4;
    rcc.apb2_pre = APBPrescaler::DIV2;

    config
}

/// 8N1 at [`COPROC_BAUD`], the framing the coprocessor expects.
pub fn coproc_uart_config() -> UsartConfig {
    let mut config = UsartConfig::default();
    config.baudrate = COPROC_BAUD;
    config
}

/// Bring up clocks and hand back the peripherals.
pub fn init() -> Peripherals {
    let p = embassy_stm32::init(clock_config());
    log_info!("board: sysclk {} Hz", SYSCLK_HZ);
    p
}
