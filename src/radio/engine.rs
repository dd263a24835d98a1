//! Radio engine trait
//!
//! The engine owns everything timing-critical about the link: channel plan,
//! duty cycle, frame counters, RX windows. The node only configures it once,
//! asks it to queue uplinks and pumps it through [`RadioEngine::run_pending_work`].

use crate::lora::traits::LoraError;
use crate::radio::event::LinkEvent;
use crate::region::{ChannelError, DataRate};
use crate::session::Session;
use crate::time::Ticks;
use core::future::Future;

/// Whether a transmit/receive cycle is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    Idle,
    /// An uplink is queued or its RX windows are still open
    TxRxPending,
}

impl OpState {
    pub fn is_pending(self) -> bool {
        self == OpState::TxRxPending
    }
}

/// Errors reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// A transmit/receive cycle is already pending
    Busy,
    /// `initialize` has not completed
    NotInitialised,
    /// No session has been set
    NoSession,
    /// Every channel is disabled
    NoChannel,
    /// Channel index outside the plan
    InvalidChannel(u8),
    /// Application port outside 1-223
    InvalidPort(u8),
    PayloadTooLarge,
    /// Underlying radio failure
    Radio(LoraError),
}

impl From<LoraError> for EngineError {
    fn from(error: LoraError) -> Self {
        EngineError::Radio(error)
    }
}

impl From<ChannelError> for EngineError {
    fn from(error: ChannelError) -> Self {
        match error {
            ChannelError::OutOfRange(index) => EngineError::InvalidChannel(index),
        }
    }
}

/// Event-driven LoRaWAN MAC/PHY engine
///
/// Configuration calls are synchronous; only bring-up and the run-loop step
/// await the radio.
pub trait RadioEngine {
    /// Bring up the radio hardware
    fn initialize(&mut self) -> impl Future<Output = Result<(), EngineError>>;

    /// Discard the session and any pending uplink, re-enable all channels
    fn reset_session(&mut self);

    /// Install a statically provisioned session (no join)
    fn set_session(&mut self, session: Session);

    fn disable_channel(&mut self, index: u8) -> Result<(), EngineError>;

    fn enable_channel(&mut self, index: u8) -> Result<(), EngineError>;

    /// Data rate of the RX2 window
    fn set_downlink_data_rate(&mut self, rate: DataRate);

    fn set_uplink_data_rate_and_power(&mut self, rate: DataRate, power_dbm: i8);

    /// Piggyback LinkCheckReq on uplinks and report link loss
    fn set_link_check_mode(&mut self, enabled: bool);

    fn op_state(&self) -> OpState;

    /// Queue an uplink for the next legal transmit slot. Never blocks.
    fn enqueue_transmission(
        &mut self,
        port: u8,
        payload: &[u8],
        request_ack: bool,
    ) -> Result<(), EngineError>;

    /// Monotonic radio clock
    fn current_time(&self) -> Ticks;

    /// Do one unit of pending radio work, yielding at most one lifecycle event
    fn run_pending_work(&mut self) -> impl Future<Output = Option<LinkEvent>>;
}
