//! LoRa radio trait for abstraction and testability
//!
//! This trait defines the PHY operations the LoRaWAN engine needs, allowing
//! the SX1262 driver to be swapped with a mock for testing.

use crate::config::protocol::MAX_LORA_PAYLOAD;
use crate::config::radio::{CODING_RATE, PREAMBLE_SYMBOLS};
use crate::region::DataRate;
use core::future::Future;
use heapless::Vec;

/// Errors that can occur during LoRa operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoraError {
    /// Operation timed out
    Timeout,
    /// CRC error in received packet
    CrcError,
    /// Transmission failed
    TransmitFailed,
    /// Reception failed
    ReceiveFailed,
    /// Invalid configuration
    InvalidConfig,
    /// Radio busy timeout
    BusyTimeout,
    /// SPI communication error
    SpiError,
    /// Radio not initialised
    NotInitialised,
}

/// Configuration for LoRa modulation and packet format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoraConfig {
    /// Centre frequency in Hz
    pub frequency_hz: u32,
    /// Spreading factor (7-12)
    pub spreading_factor: u8,
    /// Bandwidth in kHz (125 or 500 for US915)
    pub bandwidth_khz: u32,
    /// Coding rate denominator (5-8 for 4/5 to 4/8)
    pub coding_rate: u8,
    /// Transmit power in dBm
    pub tx_power_dbm: i8,
    pub preamble_symbols: u16,
    /// Downlinks are sent with inverted IQ
    pub invert_iq: bool,
    /// LoRaWAN public network sync word rather than the private one
    pub public_network: bool,
}

impl LoraConfig {
    /// Uplink settings: normal IQ
    pub fn uplink(frequency_hz: u32, rate: DataRate, tx_power_dbm: i8) -> Self {
        Self {
            frequency_hz,
            spreading_factor: rate.spreading_factor(),
            bandwidth_khz: rate.bandwidth_khz(),
            coding_rate: CODING_RATE,
            tx_power_dbm,
            preamble_symbols: PREAMBLE_SYMBOLS,
            invert_iq: false,
            public_network: true,
        }
    }

    /// Receive window settings: inverted IQ
    pub fn downlink(frequency_hz: u32, rate: DataRate) -> Self {
        Self {
            invert_iq: true,
            ..Self::uplink(frequency_hz, rate, 0)
        }
    }
}

impl Default for LoraConfig {
    fn default() -> Self {
        use crate::config::{channels, radio};
        use crate::region::ChannelPlan;

        Self::uplink(
            ChannelPlan::uplink_frequency_hz(channels::ENABLED).unwrap_or(905_500_000),
            radio::UPLINK_DATA_RATE,
            radio::TX_POWER_DBM,
        )
    }
}

/// Received packet with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxPacket {
    /// Received data
    pub data: Vec<u8, MAX_LORA_PAYLOAD>,
    /// Received Signal Strength Indicator in dBm
    pub rssi: i16,
    /// Signal-to-Noise Ratio in dB
    pub snr: i8,
}

/// Abstract LoRa radio interface for testability
pub trait LoraRadio {
    /// Initialise the radio hardware
    fn init(&mut self) -> impl Future<Output = Result<(), LoraError>>;

    /// Transmit data over LoRa
    ///
    /// Returns once the packet has left the antenna or an error occurs.
    fn transmit(&mut self, data: &[u8]) -> impl Future<Output = Result<(), LoraError>>;

    /// Receive data with timeout
    ///
    /// Listens for one packet until it is received or the timeout expires.
    fn receive(&mut self, timeout_ms: u32) -> impl Future<Output = Result<RxPacket, LoraError>>;

    /// Configure the radio parameters
    fn configure(&mut self, config: &LoraConfig) -> impl Future<Output = Result<(), LoraError>>;

    /// Set the radio to standby mode
    fn set_standby(&mut self) -> impl Future<Output = Result<(), LoraError>>;
}
