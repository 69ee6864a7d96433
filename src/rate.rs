//! Rate division against the main-loop tick.

/// Rate at which the control step is invoked.
pub const MAIN_LOOP_RATE_HZ: u32 = 1000;

pub const RATE_500_HZ: u32 = 500;
pub const RATE_250_HZ: u32 = 250;
pub const RATE_100_HZ: u32 = 100;
pub const RATE_50_HZ: u32 = 50;

/// True on the ticks where a stage running at `rate_hz` should execute.
///
/// A zero rate never executes; rates at or above the main loop run on
/// every tick.
#[inline]
pub fn rate_do_execute(rate_hz: u32, tick: u32) -> bool {
    if rate_hz == 0 {
        return false;
    }
    let divider = (MAIN_LOOP_RATE_HZ / rate_hz).max(1);
    tick % divider == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executes_once_per_period() {
        let runs = (0..1000).filter(|&t| rate_do_execute(RATE_100_HZ, t)).count();
        assert_eq!(runs, 100);
        assert!(rate_do_execute(RATE_100_HZ, 0));
        assert!(!rate_do_execute(RATE_100_HZ, 5));
        assert!(rate_do_execute(RATE_100_HZ, 10));
    }

    #[test]
    fn main_rate_runs_every_tick() {
        assert!((0..50).all(|t| rate_do_execute(MAIN_LOOP_RATE_HZ, t)));
        assert!((0..50).all(|t| rate_do_execute(4000, t)));
    }

    #[test]
    fn zero_rate_never_runs() {
        assert!((0..50).all(|t| !rate_do_execute(0, t)));
    }
}
