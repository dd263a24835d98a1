//! Node bootstrap and run-loop
//!
//! Owns the radio engine, the scheduler, the event handler and the status
//! panel. Each `run_once` step runs one unit of engine work, hands any
//! resulting event to the handler, then fires the scheduler's timer if due.

use crate::config::{app, channels, radio};
use crate::link::LinkEventHandler;
use crate::radio::{EngineError, RadioEngine};
use crate::scheduler::{SendOutcome, TxScheduler};
use crate::session::Session;
use crate::status::{StatusDisplay, StatusPanel};
use embedded_hal::digital::OutputPin;
use log::{debug, info};

pub struct Node<E, D, L> {
    engine: E,
    scheduler: TxScheduler,
    handler: LinkEventHandler,
    status: StatusPanel<D, L>,
}

impl<E, D, L> Node<E, D, L>
where
    E: RadioEngine,
    D: StatusDisplay,
    L: OutputPin,
{
    pub fn new(engine: E, status: StatusPanel<D, L>) -> Self {
        Self {
            engine,
            scheduler: TxScheduler::new(app::PAYLOAD, app::PORT, app::REQUEST_ACK),
            handler: LinkEventHandler::new(app::TX_INTERVAL_SECS),
            status,
        }
    }

    /// Provision the session, pin the node to one channel and start the
    /// first send.
    pub async fn bootstrap(&mut self) -> Result<SendOutcome, EngineError> {
        self.engine.initialize().await?;
        self.engine.reset_session();
        self.engine.set_session(Session::provisioned());

        for index in 0..channels::COUNT {
            self.engine.disable_channel(index)?;
        }
        self.engine.enable_channel(channels::ENABLED)?;

        self.engine.set_link_check_mode(app::LINK_CHECK);
        self.engine.set_downlink_data_rate(radio::RX2_DATA_RATE);
        self.engine
            .set_uplink_data_rate_and_power(radio::UPLINK_DATA_RATE, radio::TX_POWER_DBM);
        info!("LMIC setup done!");
        debug!(
            "Channel {}, uplink {:?} at {} dBm",
            channels::ENABLED,
            radio::UPLINK_DATA_RATE,
            radio::TX_POWER_DBM
        );

        Ok(self
            .scheduler
            .attempt_send(&mut self.engine, &mut self.status))
    }

    /// One step of the run-loop
    pub async fn run_once(&mut self) {
        if let Some(event) = self.engine.run_pending_work().await {
            let now = self.engine.current_time();
            self.handler
                .handle(event, now, &mut self.scheduler, &mut self.status);
        }

        let now = self.engine.current_time();
        if self.scheduler.take_due(now).is_some() {
            self.scheduler
                .attempt_send(&mut self.engine, &mut self.status);
        }
    }

    pub async fn run(&mut self) -> ! {
        loop {
            self.run_once().await;
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn scheduler(&self) -> &TxScheduler {
        &self.scheduler
    }

    pub fn status(&self) -> &StatusPanel<D, L> {
        &self.status
    }

    /// Boot screens are drawn before `bootstrap`
    pub fn status_mut(&mut self) -> &mut StatusPanel<D, L> {
        &mut self.status
    }
}
