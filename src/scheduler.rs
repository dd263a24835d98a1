//! Transmission scheduler
//!
//! Gates send attempts on the engine's operating state and owns the single
//! "next send" timer. The timer is only armed from the transmit-complete
//! path, so at most one uplink is ever in flight or waiting.

use crate::radio::{EngineError, RadioEngine};
use crate::status::{StatusDisplay, StatusPanel};
use crate::time::Ticks;
use embedded_hal::digital::OutputPin;
use log::{info, warn};

/// Result of one `attempt_send`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Uplink handed to the engine with this display sequence number
    Queued { sequence: u32 },
    /// A transmit/receive cycle was already pending; nothing was done
    Busy,
    /// The engine refused the uplink
    Rejected(EngineError),
}

/// The one outstanding timer request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSend {
    pub due: Ticks,
}

pub struct TxScheduler {
    payload: &'static [u8],
    port: u8,
    request_ack: bool,
    /// Display-only transmit counter
    counter: u32,
    pending: Option<PendingSend>,
}

impl TxScheduler {
    pub fn new(payload: &'static [u8], port: u8, request_ack: bool) -> Self {
        Self {
            payload,
            port,
            request_ack,
            counter: 0,
            pending: None,
        }
    }

    /// Queue the payload unless a cycle is already pending.
    ///
    /// Never arms a timer: the next attempt only happens after the engine
    /// reports transmit complete.
    pub fn attempt_send<E, D, L>(
        &mut self,
        engine: &mut E,
        status: &mut StatusPanel<D, L>,
    ) -> SendOutcome
    where
        E: RadioEngine,
        D: StatusDisplay,
        L: OutputPin,
    {
        if engine.op_state().is_pending() {
            info!("OP_TXRXPEND, radio busy, not sending");
            return SendOutcome::Busy;
        }

        let sequence = self.counter;
        status.show_sending(sequence);
        self.counter = self.counter.wrapping_add(1);

        match engine.enqueue_transmission(self.port, self.payload, self.request_ack) {
            Ok(()) => {
                info!("Packet queued");
                SendOutcome::Queued { sequence }
            }
            Err(error) => {
                // No cycle started, so no transmit-complete will clear the LED
                status.sending_done();
                warn!("Packet not queued: {:?}", error);
                SendOutcome::Rejected(error)
            }
        }
    }

    /// Arm the next attempt `after_secs` seconds from `now`.
    ///
    /// The delay is a lower bound; the engine may hold the uplink longer for
    /// duty cycle. Returns the due time.
    pub fn arm_next(&mut self, now: Ticks, after_secs: u32) -> Ticks {
        let due = now + Ticks::from_secs(after_secs);
        if let Some(previous) = self.pending.replace(PendingSend { due }) {
            warn!("Replacing pending send due at {}", previous.due);
        }
        due
    }

    /// Consume the pending request once it is due
    pub fn take_due(&mut self, now: Ticks) -> Option<PendingSend> {
        match self.pending {
            Some(pending) if pending.due <= now => self.pending.take(),
            _ => None,
        }
    }

    pub fn pending(&self) -> Option<&PendingSend> {
        self.pending.as_ref()
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::app::{PAYLOAD, PORT};
    use crate::radio::engine::mock::MockEngine;
    use crate::radio::OpState;
    use crate::status::traits::mock::{MockDisplay, MockLed};
    use crate::testing;

    fn setup() -> (TxScheduler, MockEngine, StatusPanel<MockDisplay, MockLed>) {
        (
            TxScheduler::new(PAYLOAD, PORT, false),
            MockEngine::new(),
            StatusPanel::new(MockDisplay::new(), MockLed::default()),
        )
    }

    #[test]
    fn test_send_when_idle() {
        let (mut scheduler, mut engine, mut status) = setup();

        let outcome = scheduler.attempt_send(&mut engine, &mut status);

        assert_eq!(outcome, SendOutcome::Queued { sequence: 0 });
        assert_eq!(scheduler.counter(), 1);
        let history = engine.get_tx_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].port, 1);
        assert_eq!(history[0].payload.as_slice(), b"Hello, world!");
        assert!(!history[0].request_ack);
        assert!(status.led().lit);
        assert_eq!(status.display().visible_text(), ["Sending packet: ", "0"]);
    }

    #[test]
    fn test_busy_skip() {
        let (mut scheduler, mut engine, mut status) = setup();
        engine.op_state = OpState::TxRxPending;

        let logs = testing::capture(|| {
            assert_eq!(
                scheduler.attempt_send(&mut engine, &mut status),
                SendOutcome::Busy
            );
        });

        assert!(engine.get_tx_history().is_empty());
        assert_eq!(scheduler.counter(), 0);
        assert!(scheduler.pending().is_none());
        assert!(!status.led().lit);
        assert!(status.display().ops().is_empty());
        assert!(logs.iter().any(|line| line.contains("busy")));
    }

    #[test]
    fn test_counter_counts_only_admitted_sends() {
        let (mut scheduler, mut engine, mut status) = setup();

        for expected in 0..5u32 {
            assert_eq!(
                scheduler.attempt_send(&mut engine, &mut status),
                SendOutcome::Queued { sequence: expected }
            );
            // Still pending: skipped
            assert_eq!(
                scheduler.attempt_send(&mut engine, &mut status),
                SendOutcome::Busy
            );
            assert_eq!(scheduler.counter(), expected + 1);
            engine.op_state = OpState::Idle;
        }
        assert_eq!(engine.get_tx_history().len(), 5);
    }

    #[test]
    fn test_rejected_enqueue_clears_led() {
        let (mut scheduler, mut engine, mut status) = setup();
        engine.set_next_enqueue_error(EngineError::NoChannel);

        let outcome = scheduler.attempt_send(&mut engine, &mut status);

        assert_eq!(outcome, SendOutcome::Rejected(EngineError::NoChannel));
        assert!(!status.led().lit);
        assert!(scheduler.pending().is_none());
    }

    #[test]
    fn test_arm_and_fire() {
        let (mut scheduler, _, _) = setup();
        let now = Ticks::from_secs(3);

        let due = scheduler.arm_next(now, 10);

        assert_eq!(due, Ticks::from_secs(13));
        assert_eq!(scheduler.take_due(Ticks::from_secs(12)), None);
        assert_eq!(
            scheduler.take_due(Ticks::from_secs(13)),
            Some(PendingSend { due })
        );
        assert_eq!(scheduler.take_due(Ticks::from_secs(100)), None);
    }

    #[test]
    fn test_rearming_replaces_pending() {
        let (mut scheduler, _, _) = setup();

        scheduler.arm_next(Ticks::ZERO, 10);
        let logs = testing::capture(|| {
            scheduler.arm_next(Ticks::from_secs(1), 10);
        });

        assert_eq!(
            scheduler.pending(),
            Some(&PendingSend {
                due: Ticks::from_secs(11)
            })
        );
        assert!(logs.iter().any(|line| line.contains("Replacing")));
        assert!(scheduler.take_due(Ticks::from_secs(11)).is_some());
        assert!(scheduler.pending().is_none());
    }
}
