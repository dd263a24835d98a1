//! LoRaWAN class A engine over a raw LoRa radio
//!
//! Implements [`RadioEngine`] for an ABP session:
//!
//! ```text
//! Idle --enqueue--> Queued --(duty cycle clear) TxStart--> Transmitting
//!   ^                                                           |
//!   +------------- TxComplete (uplink, RX1, RX2) <--------------+
//! ```
//!
//! Each `run_pending_work` call performs one step and yields at most one
//! event. Follow-up events (link dead/alive) are queued and handed out on the
//! next calls.

use crate::config::radio::{
    DUTY_CYCLE_PERCENT, IDLE_POLL_MS, LINK_DEAD_AFTER, RECEIVE_DELAY1_MS, RECEIVE_DELAY2_MS,
    RX2_DATA_RATE, RX_WINDOW_MS, TX_POWER_DBM, UPLINK_DATA_RATE,
};
use crate::lora::clock::Clock;
use crate::lora::traits::{LoraConfig, LoraError, LoraRadio};
use crate::mac::{airtime_us, decode_downlink, encode_uplink, Downlink, FrameBuf, Modulation, Uplink};
use crate::radio::{EngineError, LinkEvent, OpState, RadioEngine, TxResult};
use crate::region::{ChannelPlan, DataRate, RX2_FREQUENCY_HZ};
use crate::session::Session;
use crate::time::Ticks;
use heapless::Deque;
use log::{debug, info, warn};

/// LinkCheckAns MAC command identifier
const LINK_CHECK_ANS: u8 = 0x02;

/// Highest application port; 224-255 are reserved
const MAX_APP_PORT: u8 = 223;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Waiting for the duty cycle to allow the uplink
    Queued,
    /// TxStart reported, the next step sends and listens
    Transmitting,
}

struct PendingUplink {
    frame: FrameBuf,
    channel: u8,
}

pub struct LoraWanEngine<R, C> {
    radio: R,
    clock: C,
    initialised: bool,
    session: Option<Session>,
    plan: ChannelPlan,
    uplink_rate: DataRate,
    tx_power_dbm: i8,
    rx2_rate: DataRate,
    link_check: bool,
    fcnt_up: u32,
    /// Counter of the last accepted downlink
    fcnt_down: Option<u32>,
    uplinks_since_downlink: u32,
    link_dead: bool,
    phase: Phase,
    pending: Option<PendingUplink>,
    next_tx_allowed: Ticks,
    events: Deque<LinkEvent, 4>,
}

impl<R, C> LoraWanEngine<R, C>
where
    R: LoraRadio,
    C: Clock,
{
    pub fn new(radio: R, clock: C) -> Self {
        Self {
            radio,
            clock,
            initialised: false,
            session: None,
            plan: ChannelPlan::all_enabled(),
            uplink_rate: UPLINK_DATA_RATE,
            tx_power_dbm: TX_POWER_DBM,
            rx2_rate: RX2_DATA_RATE,
            link_check: false,
            fcnt_up: 0,
            fcnt_down: None,
            uplinks_since_downlink: 0,
            link_dead: false,
            phase: Phase::Idle,
            pending: None,
            next_tx_allowed: Ticks::ZERO,
            events: Deque::new(),
        }
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn channel_plan(&self) -> &ChannelPlan {
        &self.plan
    }

    /// Frame counter of the next uplink
    pub fn fcnt_up(&self) -> u32 {
        self.fcnt_up
    }

    fn push_event(&mut self, event: LinkEvent) {
        if self.events.push_back(event).is_err() {
            warn!("Event queue full, dropping {}", event.name());
        }
    }

    /// Send the queued uplink, then listen in RX1 and RX2
    async fn transmit_and_listen(&mut self) -> TxResult {
        let Some(uplink) = self.pending.take() else {
            return TxResult::default();
        };
        let Some(frequency_hz) = ChannelPlan::uplink_frequency_hz(uplink.channel) else {
            return TxResult::default();
        };

        let config = LoraConfig::uplink(frequency_hz, self.uplink_rate, self.tx_power_dbm);
        if let Err(error) = self.send(&config, &uplink.frame).await {
            // The cycle still completes so the node keeps its schedule
            warn!("Uplink failed: {:?}", error);
            return TxResult::default();
        }

        let tx_end = self.clock.now();
        let airtime = airtime_us(uplink.frame.len(), &Modulation::for_data_rate(self.uplink_rate));
        let off_time = airtime * (100 - DUTY_CYCLE_PERCENT as u64) / DUTY_CYCLE_PERCENT as u64;
        self.next_tx_allowed = tx_end + Ticks::from_micros(off_time);
        debug!(
            "Uplink sent on {} Hz, airtime {} us, next allowed at {}",
            frequency_hz, airtime, self.next_tx_allowed
        );

        let downlink = self.listen(tx_end, uplink.channel).await;
        self.track_link(downlink.is_some());

        match downlink {
            Some(downlink) => TxResult {
                acked: downlink.ack,
                downlink_len: match downlink.port {
                    Some(port) if port > 0 => downlink.payload.len(),
                    _ => 0,
                },
            },
            None => TxResult::default(),
        }
    }

    async fn send(&mut self, config: &LoraConfig, frame: &[u8]) -> Result<(), LoraError> {
        self.radio.configure(config).await?;
        self.radio.transmit(frame).await?;
        self.radio.set_standby().await
    }

    async fn listen(&mut self, tx_end: Ticks, channel: u8) -> Option<Downlink> {
        let rx1 = LoraConfig::downlink(
            ChannelPlan::rx1_frequency_hz(channel),
            self.uplink_rate.rx1_downlink(),
        );
        if let Some(downlink) = self.receive_window(tx_end, RECEIVE_DELAY1_MS, &rx1).await {
            return Some(downlink);
        }

        let rx2 = LoraConfig::downlink(RX2_FREQUENCY_HZ, self.rx2_rate);
        self.receive_window(tx_end, RECEIVE_DELAY2_MS, &rx2).await
    }

    async fn receive_window(
        &mut self,
        tx_end: Ticks,
        delay_ms: u32,
        config: &LoraConfig,
    ) -> Option<Downlink> {
        let opens = tx_end + Ticks::from_millis(delay_ms as u64);
        let now = self.clock.now();
        if opens > now {
            self.clock
                .delay_ms(opens.saturating_since(now).as_millis() as u32)
                .await;
        }

        if let Err(error) = self.radio.configure(config).await {
            warn!("RX window setup failed: {:?}", error);
            return None;
        }

        let packet = match self.radio.receive(RX_WINDOW_MS).await {
            Ok(packet) => packet,
            Err(LoraError::Timeout) => return None,
            Err(error) => {
                debug!("RX window error: {:?}", error);
                return None;
            }
        };
        let _ = self.radio.set_standby().await;

        let session = self.session.as_ref()?;
        match decode_downlink(session, &packet.data, self.fcnt_down) {
            Ok(downlink) => {
                self.fcnt_down = Some(downlink.fcnt);
                debug!(
                    "Downlink fcnt {} (RSSI: {}, SNR: {})",
                    downlink.fcnt, packet.rssi, packet.snr
                );
                if let [LINK_CHECK_ANS, margin, gateways, ..] = downlink.fopts.as_slice() {
                    info!("Link check: margin {} dB, {} gateways", margin, gateways);
                }
                Some(downlink)
            }
            Err(error) => {
                debug!("Ignoring frame: {:?}", error);
                None
            }
        }
    }

    /// Link check bookkeeping after each cycle
    fn track_link(&mut self, got_downlink: bool) {
        if !self.link_check {
            return;
        }

        if got_downlink {
            self.uplinks_since_downlink = 0;
            if self.link_dead {
                self.link_dead = false;
                self.push_event(LinkEvent::LinkAlive);
            }
        } else {
            self.uplinks_since_downlink = self.uplinks_since_downlink.saturating_add(1);
            if !self.link_dead && self.uplinks_since_downlink >= LINK_DEAD_AFTER {
                self.link_dead = true;
                self.push_event(LinkEvent::LinkDead);
            }
        }
    }
}

impl<R, C> RadioEngine for LoraWanEngine<R, C>
where
    R: LoraRadio,
    C: Clock,
{
    async fn initialize(&mut self) -> Result<(), EngineError> {
        self.radio.init().await?;
        self.radio.set_standby().await?;
        self.initialised = true;
        Ok(())
    }

    fn reset_session(&mut self) {
        self.session = None;
        self.plan = ChannelPlan::all_enabled();
        self.fcnt_up = 0;
        self.fcnt_down = None;
        self.uplinks_since_downlink = 0;
        self.link_dead = false;
        self.phase = Phase::Idle;
        self.pending = None;
        self.events.clear();
    }

    fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    fn disable_channel(&mut self, index: u8) -> Result<(), EngineError> {
        Ok(self.plan.disable(index)?)
    }

    fn enable_channel(&mut self, index: u8) -> Result<(), EngineError> {
        Ok(self.plan.enable(index)?)
    }

    fn set_downlink_data_rate(&mut self, rate: DataRate) {
        self.rx2_rate = rate;
    }

    fn set_uplink_data_rate_and_power(&mut self, rate: DataRate, power_dbm: i8) {
        self.uplink_rate = rate;
        self.tx_power_dbm = power_dbm;
    }

    fn set_link_check_mode(&mut self, enabled: bool) {
        self.link_check = enabled;
        self.uplinks_since_downlink = 0;
        self.link_dead = false;
    }

    fn op_state(&self) -> OpState {
        match self.phase {
            Phase::Idle => OpState::Idle,
            Phase::Queued | Phase::Transmitting => OpState::TxRxPending,
        }
    }

    fn enqueue_transmission(
        &mut self,
        port: u8,
        payload: &[u8],
        request_ack: bool,
    ) -> Result<(), EngineError> {
        if !self.initialised {
            return Err(EngineError::NotInitialised);
        }
        if self.phase != Phase::Idle {
            return Err(EngineError::Busy);
        }
        if port == 0 || port > MAX_APP_PORT {
            return Err(EngineError::InvalidPort(port));
        }
        let session = self.session.as_ref().ok_or(EngineError::NoSession)?;
        let channel = self.plan.select(self.fcnt_up).ok_or(EngineError::NoChannel)?;

        let frame = encode_uplink(
            session,
            &Uplink {
                fcnt: self.fcnt_up,
                port,
                payload,
                confirmed: request_ack,
                link_check: self.link_check,
            },
        )
        .map_err(|_| EngineError::PayloadTooLarge)?;

        debug!("Uplink fcnt {} queued on channel {}", self.fcnt_up, channel);
        self.fcnt_up = self.fcnt_up.wrapping_add(1);
        self.pending = Some(PendingUplink { frame, channel });
        self.phase = Phase::Queued;
        Ok(())
    }

    fn current_time(&self) -> Ticks {
        self.clock.now()
    }

    async fn run_pending_work(&mut self) -> Option<LinkEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }

        match self.phase {
            Phase::Idle => {
                self.clock.delay_ms(IDLE_POLL_MS).await;
                None
            }
            Phase::Queued => {
                let now = self.clock.now();
                if now < self.next_tx_allowed {
                    // Round up so the wait always reaches the allowed time
                    let wait_ms = self.next_tx_allowed.saturating_since(now).as_millis() + 1;
                    debug!("Duty cycle: holding uplink for {} ms", wait_ms);
                    self.clock.delay_ms(wait_ms as u32).await;
                    return None;
                }
                self.phase = Phase::Transmitting;
                Some(LinkEvent::TxStart)
            }
            Phase::Transmitting => {
                let result = self.transmit_and_listen().await;
                self.phase = Phase::Idle;
                Some(LinkEvent::TxComplete(result))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::app::{PAYLOAD, PORT};
    use crate::lora::clock::mock::MockClock;
    use crate::lora::traits::mock::MockLoraRadio;
    use crate::mac::frame::encode_downlink;
    use futures::executor::block_on;

    type TestEngine = LoraWanEngine<MockLoraRadio, MockClock>;

    fn single_channel_engine() -> TestEngine {
        let mut engine = LoraWanEngine::new(MockLoraRadio::new(), MockClock::new());
        block_on(engine.initialize()).unwrap();
        engine.set_session(Session::provisioned());
        for channel in 0..72 {
            engine.disable_channel(channel).unwrap();
        }
        engine.enable_channel(16).unwrap();
        engine
    }

    /// Drive the engine until it reports transmit complete
    fn run_cycle(engine: &mut TestEngine) -> TxResult {
        block_on(async {
            for _ in 0..1000 {
                if let Some(LinkEvent::TxComplete(result)) = engine.run_pending_work().await {
                    return result;
                }
            }
            panic!("no TxComplete");
        })
    }

    #[test]
    fn test_enqueue_preconditions() {
        let mut engine = LoraWanEngine::new(MockLoraRadio::new(), MockClock::new());
        assert_eq!(
            engine.enqueue_transmission(PORT, PAYLOAD, false),
            Err(EngineError::NotInitialised)
        );

        block_on(engine.initialize()).unwrap();
        assert!(engine.radio().is_initialised());
        assert_eq!(
            engine.enqueue_transmission(PORT, PAYLOAD, false),
            Err(EngineError::NoSession)
        );

        engine.set_session(Session::provisioned());
        assert_eq!(
            engine.enqueue_transmission(0, PAYLOAD, false),
            Err(EngineError::InvalidPort(0))
        );

        for channel in 0..72 {
            engine.disable_channel(channel).unwrap();
        }
        assert_eq!(
            engine.enqueue_transmission(PORT, PAYLOAD, false),
            Err(EngineError::NoChannel)
        );
        assert_eq!(engine.disable_channel(72), Err(EngineError::InvalidChannel(72)));
        assert_eq!(engine.op_state(), OpState::Idle);
    }

    #[test]
    fn test_full_cycle_without_downlink() {
        let mut engine = single_channel_engine();

        engine.enqueue_transmission(PORT, PAYLOAD, false).unwrap();
        assert_eq!(engine.op_state(), OpState::TxRxPending);
        assert_eq!(
            engine.enqueue_transmission(PORT, PAYLOAD, false),
            Err(EngineError::Busy)
        );

        assert_eq!(block_on(engine.run_pending_work()), Some(LinkEvent::TxStart));
        assert_eq!(engine.op_state(), OpState::TxRxPending);
        assert_eq!(
            block_on(engine.run_pending_work()),
            Some(LinkEvent::TxComplete(TxResult::default()))
        );
        assert_eq!(engine.op_state(), OpState::Idle);

        let history = engine.radio().get_tx_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].len(), 8 + 1 + PAYLOAD.len() + 4);

        let configs = engine.radio().get_config_history();
        assert_eq!(configs.len(), 3);
        assert_eq!(configs[0].frequency_hz, 905_500_000);
        assert!(!configs[0].invert_iq);
        assert_eq!(configs[1].frequency_hz, 923_300_000);
        assert_eq!(configs[1].bandwidth_khz, 500);
        assert!(configs[1].invert_iq);
        assert_eq!(configs[2].frequency_hz, RX2_FREQUENCY_HZ);
        assert_eq!(configs[2].spreading_factor, 9);

        // RX2 opens two seconds after the uplink
        assert!(engine.clock().slept_ms >= RECEIVE_DELAY2_MS as u64 - 1);
    }

    #[test]
    fn test_downlink_with_ack_in_rx1() {
        let mut engine = single_channel_engine();
        let session = Session::provisioned();
        let frame = encode_downlink(&session, true, 1, 5, &[1, 2, 3, 4]);
        engine.radio.queue_rx_packet(&frame);

        engine.enqueue_transmission(PORT, PAYLOAD, true).unwrap();
        let result = run_cycle(&mut engine);

        assert_eq!(
            result,
            TxResult {
                acked: true,
                downlink_len: 4
            }
        );
        // RX2 not opened
        assert_eq!(engine.radio().get_config_history().len(), 2);
        // Confirmed uplink
        assert_eq!(engine.radio().get_tx_history()[0][0], 0x80);
    }

    #[test]
    fn test_downlink_in_rx2() {
        let mut engine = single_channel_engine();
        let frame = encode_downlink(&Session::provisioned(), false, 1, 1, &[]);
        engine.radio.queue_rx_timeout();
        engine.radio.queue_rx_packet(&frame);

        engine.enqueue_transmission(PORT, PAYLOAD, false).unwrap();
        let result = run_cycle(&mut engine);

        assert_eq!(result, TxResult::default());
        assert_eq!(engine.radio().get_config_history().len(), 3);
    }

    #[test]
    fn test_foreign_downlink_ignored() {
        let mut engine = single_channel_engine();
        let other = Session {
            dev_addr: 0x2600_0001,
            ..Session::provisioned()
        };
        engine.radio.queue_rx_packet(&encode_downlink(&other, true, 1, 1, &[9]));

        engine.enqueue_transmission(PORT, PAYLOAD, false).unwrap();
        assert_eq!(run_cycle(&mut engine), TxResult::default());
    }

    #[test]
    fn test_replayed_downlink_ignored() {
        let mut engine = single_channel_engine();
        let frame = encode_downlink(&Session::provisioned(), true, 7, 1, &[9]);

        engine.radio.queue_rx_packet(&frame);
        engine.enqueue_transmission(PORT, PAYLOAD, true).unwrap();
        assert!(run_cycle(&mut engine).acked);
        assert_eq!(engine.fcnt_down, Some(7));

        // Same frame captured and sent again
        engine.radio.queue_rx_packet(&frame);
        engine.enqueue_transmission(PORT, PAYLOAD, true).unwrap();
        assert_eq!(run_cycle(&mut engine), TxResult::default());
        assert_eq!(engine.fcnt_down, Some(7));
    }

    #[test]
    fn test_failed_transmit_still_completes() {
        let mut engine = single_channel_engine();
        engine.radio.set_next_tx_error(LoraError::TransmitFailed);

        engine.enqueue_transmission(PORT, PAYLOAD, false).unwrap();
        assert_eq!(run_cycle(&mut engine), TxResult::default());
        assert_eq!(engine.op_state(), OpState::Idle);
        assert!(engine.radio().get_tx_history().is_empty());
    }

    #[test]
    fn test_duty_cycle_holds_next_uplink() {
        let mut engine = single_channel_engine();

        engine.enqueue_transmission(PORT, PAYLOAD, false).unwrap();
        run_cycle(&mut engine);
        let allowed = engine.next_tx_allowed;
        assert!(allowed > engine.clock().now());

        engine.enqueue_transmission(PORT, PAYLOAD, false).unwrap();
        assert_eq!(block_on(engine.run_pending_work()), None);
        assert!(engine.clock().now() >= allowed);
        assert_eq!(block_on(engine.run_pending_work()), Some(LinkEvent::TxStart));
    }

    #[test]
    fn test_frame_counter_advances() {
        let mut engine = single_channel_engine();

        for expected in 0..3u32 {
            assert_eq!(engine.fcnt_up(), expected);
            engine.enqueue_transmission(PORT, PAYLOAD, false).unwrap();
            run_cycle(&mut engine);
        }

        let history = engine.radio().get_tx_history();
        assert_eq!(&history[2][6..8], &[2, 0]);
    }

    #[test]
    fn test_link_check_reports_dead_then_alive() {
        let mut engine = single_channel_engine();
        engine.set_link_check_mode(true);

        engine.enqueue_transmission(PORT, PAYLOAD, false).unwrap();
        run_cycle(&mut engine);
        // LinkCheckReq rides in FOpts
        assert_eq!(engine.radio().get_tx_history()[0][5] & 0x0F, 1);

        for _ in 1..LINK_DEAD_AFTER {
            engine.enqueue_transmission(PORT, PAYLOAD, false).unwrap();
            run_cycle(&mut engine);
        }
        assert_eq!(block_on(engine.run_pending_work()), Some(LinkEvent::LinkDead));

        let fcnt = engine.fcnt_down.map_or(0, |last| last + 1);
        engine
            .radio
            .queue_rx_packet(&encode_downlink(&Session::provisioned(), false, fcnt, 1, &[]));
        engine.enqueue_transmission(PORT, PAYLOAD, false).unwrap();
        run_cycle(&mut engine);
        assert_eq!(block_on(engine.run_pending_work()), Some(LinkEvent::LinkAlive));
    }

    #[test]
    fn test_reset_session_clears_state() {
        let mut engine = single_channel_engine();
        engine.enqueue_transmission(PORT, PAYLOAD, false).unwrap();

        engine.reset_session();

        assert_eq!(engine.op_state(), OpState::Idle);
        assert_eq!(engine.fcnt_up(), 0);
        assert_eq!(engine.channel_plan().enabled_count(), 72);
        assert_eq!(
            engine.enqueue_transmission(PORT, PAYLOAD, false),
            Err(EngineError::NoSession)
        );
    }
}
