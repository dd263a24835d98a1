//! Link event handler
//!
//! Single dispatch point for every lifecycle event the radio engine raises.
//! Stateless between calls: the only state that survives an event is the
//! scheduler's pending send, and only transmit-complete touches it.

use crate::radio::LinkEvent;
use crate::scheduler::TxScheduler;
use crate::status::{StatusDisplay, StatusPanel};
use crate::time::Ticks;
use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

/// What handling an event did beyond logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Logged,
    /// The next send was armed for `due`
    Rearmed { due: Ticks },
}

pub struct LinkEventHandler {
    tx_interval_secs: u32,
}

impl LinkEventHandler {
    pub fn new(tx_interval_secs: u32) -> Self {
        Self { tx_interval_secs }
    }

    /// React to one event observed at radio time `now`
    pub fn handle<D, L>(
        &self,
        event: LinkEvent,
        now: Ticks,
        scheduler: &mut TxScheduler,
        status: &mut StatusPanel<D, L>,
    ) -> Reaction
    where
        D: StatusDisplay,
        L: OutputPin,
    {
        match event {
            // Beacon tracking is unused on a single-channel class A node
            LinkEvent::ScanTimeout
            | LinkEvent::BeaconFound
            | LinkEvent::BeaconMissed
            | LinkEvent::BeaconTracked
            | LinkEvent::ScanFound => {
                info!("{}: {}", now, event.name());
                Reaction::Logged
            }

            // The session is provisioned, joins never matter here
            LinkEvent::Joining
            | LinkEvent::Joined
            | LinkEvent::Rfu1
            | LinkEvent::JoinFailed
            | LinkEvent::RejoinFailed => {
                info!("{}: {}", now, event.name());
                Reaction::Logged
            }

            LinkEvent::TxStart => {
                info!("{}: {}", now, event.name());
                Reaction::Logged
            }

            LinkEvent::TxComplete(result) => {
                status.sending_done();

                info!("{}: EV_TXCOMPLETE (includes waiting for RX windows)", now);
                if result.acked {
                    info!("Received ack");
                } else {
                    info!("No ack received");
                }
                if result.downlink_len > 0 {
                    info!("Received {} bytes of payload", result.downlink_len);
                } else {
                    info!("No downlink payload");
                }

                let due = scheduler.arm_next(now, self.tx_interval_secs);
                debug!("Next send at {}", due);
                Reaction::Rearmed { due }
            }

            LinkEvent::RxComplete { len } => {
                info!("{}: {}", now, event.name());
                if len > 0 {
                    info!("Received {} bytes", len);
                }
                Reaction::Logged
            }

            // No re-join is attempted, joining is disabled
            LinkEvent::LinkDead | LinkEvent::LinkAlive => {
                info!("{}: {}", now, event.name());
                Reaction::Logged
            }

            LinkEvent::LostTsync | LinkEvent::Reset => {
                info!("{}: {}", now, event.name());
                Reaction::Logged
            }

            LinkEvent::Unknown(code) => {
                warn!("{}: Unknown event: {}", now, code);
                Reaction::Logged
            }
        }
    }
}
