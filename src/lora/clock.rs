//! Time source for the LoRaWAN engine
//!
//! RX windows and duty cycle are timed against this clock, so tests can run
//! the engine against a simulated one.

use crate::time::Ticks;
use core::future::Future;

pub trait Clock {
    /// Current radio time
    fn now(&self) -> Ticks;

    /// Sleep for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32) -> impl Future<Output = ()>;
}

/// Clock backed by the embassy time driver
#[cfg(feature = "embedded")]
pub struct EmbassyClock;

#[cfg(feature = "embedded")]
impl Clock for EmbassyClock {
    fn now(&self) -> Ticks {
        Ticks::from_micros(embassy_time::Instant::now().as_micros())
    }

    async fn delay_ms(&mut self, ms: u32) {
        embassy_time::Timer::after_millis(ms as u64).await;
    }
}

#[cfg(test)]
pub mod mock {
    //! Simulated clock: delays return immediately and move time forward

    use super::*;

    #[derive(Default)]
    pub struct MockClock {
        pub now: Ticks,
        /// Sum of all requested delays
        pub slept_ms: u64,
    }

    impl MockClock {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> Ticks {
            self.now
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.slept_ms += ms as u64;
            self.now = self.now + Ticks::from_millis(ms as u64);
        }
    }
}
