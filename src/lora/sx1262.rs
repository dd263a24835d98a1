//! SX1262 opcodes, registers and parameter encodings
//!
//! Pure functions turning a [`LoraConfig`] into command arguments, so the
//! byte layouts are checked on the host. The SPI side lives in the driver.

use crate::lora::traits::{LoraConfig, LoraError};
use crate::mac::Modulation;

pub mod cmd {
    pub const SET_STANDBY: u8 = 0x80;
    pub const SET_TX: u8 = 0x83;
    pub const SET_RX: u8 = 0x82;
    pub const SET_RF_FREQUENCY: u8 = 0x86;
    pub const SET_PACKET_TYPE: u8 = 0x8A;
    pub const SET_MODULATION_PARAMS: u8 = 0x8B;
    pub const SET_PACKET_PARAMS: u8 = 0x8C;
    pub const SET_TX_PARAMS: u8 = 0x8E;
    pub const SET_BUFFER_BASE_ADDRESS: u8 = 0x8F;
    pub const SET_PA_CONFIG: u8 = 0x95;
    pub const SET_DIO3_AS_TCXO_CTRL: u8 = 0x97;
    pub const SET_DIO2_AS_RF_SWITCH_CTRL: u8 = 0x9D;
    pub const SET_DIO_IRQ_PARAMS: u8 = 0x08;
    pub const CLEAR_IRQ_STATUS: u8 = 0x02;
    pub const GET_IRQ_STATUS: u8 = 0x12;
    pub const GET_RX_BUFFER_STATUS: u8 = 0x13;
    pub const GET_PACKET_STATUS: u8 = 0x14;
    pub const WRITE_REGISTER: u8 = 0x0D;
    pub const READ_REGISTER: u8 = 0x1D;
    pub const WRITE_BUFFER: u8 = 0x0E;
    pub const READ_BUFFER: u8 = 0x1E;
}

pub mod reg {
    pub const IQ_POLARITY: u16 = 0x0736;
    pub const LORA_SYNC_WORD: u16 = 0x0740;
    pub const OCP_CONFIGURATION: u16 = 0x08E7;
}

pub mod irq {
    pub const TX_DONE: u16 = 0x0001;
    pub const RX_DONE: u16 = 0x0002;
    pub const CRC_ERR: u16 = 0x0040;
    pub const TIMEOUT: u16 = 0x0200;
    pub const ALL: u16 = 0xFFFF;
}

pub const STANDBY_RC: u8 = 0x00;
pub const PACKET_TYPE_LORA: u8 = 0x01;

/// High-power PA: duty cycle 4, hpMax 7, SX1262, paLut 1
pub const PA_CONFIG: [u8; 4] = [0x04, 0x07, 0x00, 0x01];

/// Ramp time 200 us
const RAMP_200US: u8 = 0x04;

/// Sync words as stored in the two sync word registers
const SYNC_WORD_PUBLIC: u16 = 0x3444;
const SYNC_WORD_PRIVATE: u16 = 0x1424;

/// Bit 2 of the IQ polarity register must be cleared for inverted IQ
const IQ_POLARITY_BIT: u8 = 0x04;

/// RX timeout steps of 15.625 us per millisecond
const RX_STEPS_PER_MS: u32 = 64;
const MAX_RX_TIMEOUT: u32 = 0x00FF_FFFF;

/// SetRfFrequency argument: freq * 2^25 / 32 MHz
pub fn frequency_word(frequency_hz: u32) -> [u8; 4] {
    let word = ((frequency_hz as u64) << 25) / 32_000_000;
    (word as u32).to_be_bytes()
}

pub fn modulation(config: &LoraConfig) -> Modulation {
    Modulation {
        spreading_factor: config.spreading_factor,
        bandwidth_hz: config.bandwidth_khz * 1000,
        coding_rate: config.coding_rate,
        preamble_symbols: config.preamble_symbols,
    }
}

/// SetModulationParams arguments: SF, BW code, CR code, LDRO
pub fn modulation_params(config: &LoraConfig) -> Result<[u8; 4], LoraError> {
    let bandwidth = match config.bandwidth_khz {
        125 => 0x04,
        250 => 0x05,
        500 => 0x06,
        _ => return Err(LoraError::InvalidConfig),
    };
    if !(5..=8).contains(&config.coding_rate) || !(5..=12).contains(&config.spreading_factor) {
        return Err(LoraError::InvalidConfig);
    }
    let ldro = modulation(config).low_data_rate_optimize() as u8;

    Ok([config.spreading_factor, bandwidth, config.coding_rate - 4, ldro])
}

/// SetPacketParams arguments: preamble, explicit header, length, CRC, IQ
///
/// Uplinks carry a payload CRC, downlinks use inverted IQ and no CRC.
pub fn packet_params(config: &LoraConfig, payload_len: u8) -> [u8; 6] {
    let [preamble_hi, preamble_lo] = config.preamble_symbols.to_be_bytes();
    let (crc, invert) = if config.invert_iq { (0x00, 0x01) } else { (0x01, 0x00) };
    [preamble_hi, preamble_lo, 0x00, payload_len, crc, invert]
}

/// SetTxParams arguments, power as two's complement dBm
pub fn tx_params(power_dbm: i8) -> [u8; 2] {
    [power_dbm.clamp(-9, 22) as u8, RAMP_200US]
}

/// OCP register value in 2.5 mA steps
pub fn current_limit(current_ma: u16) -> u8 {
    ((current_ma as u32 * 2) / 5).min(63) as u8
}

pub fn sync_word(public_network: bool) -> [u8; 2] {
    if public_network {
        SYNC_WORD_PUBLIC.to_be_bytes()
    } else {
        SYNC_WORD_PRIVATE.to_be_bytes()
    }
}

pub fn iq_polarity(current: u8, invert_iq: bool) -> u8 {
    if invert_iq {
        current & !IQ_POLARITY_BIT
    } else {
        current | IQ_POLARITY_BIT
    }
}

/// SetRx argument, zero keeps the receiver in continuous mode
pub fn rx_timeout(timeout_ms: u32) -> [u8; 3] {
    let steps = timeout_ms.saturating_mul(RX_STEPS_PER_MS).min(MAX_RX_TIMEOUT);
    let [_, hi, mid, lo] = steps.to_be_bytes();
    [hi, mid, lo]
}

/// DIO1 raises every enabled interrupt, DIO2 and DIO3 stay unmapped
pub fn irq_params(mask: u16) -> [u8; 8] {
    let [hi, lo] = mask.to_be_bytes();
    [hi, lo, hi, lo, 0, 0, 0, 0]
}

/// SetDIO3AsTcxoCtrl arguments: voltage, then startup delay in 15.625 us steps
pub fn tcxo_params(voltage_code: u8, startup_ms: u32) -> [u8; 4] {
    let [_, hi, mid, lo] = startup_ms.saturating_mul(RX_STEPS_PER_MS).to_be_bytes();
    [voltage_code, hi, mid, lo]
}

/// GetPacketStatus response to (RSSI dBm, SNR dB)
pub fn packet_status(rssi_raw: u8, snr_raw: u8) -> (i16, i8) {
    (-(rssi_raw as i16) / 2, (snr_raw as i8) / 4)
}

/// Upper bound for sending `len` bytes: time on air plus a second
pub fn tx_timeout_ms(config: &LoraConfig, len: usize) -> u32 {
    (crate::mac::airtime_us(len, &modulation(config)) / 1000) as u32 + 1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::DataRate;

    #[test]
    fn test_frequency_word() {
        // 905.5 MHz, channel 16 uplink
        assert_eq!(frequency_word(905_500_000), [0x38, 0x98, 0x00, 0x00]);
        assert_eq!(frequency_word(923_300_000), [0x39, 0xB4, 0xCC, 0xCC]);
    }

    #[test]
    fn test_modulation_params_for_lorawan_rates() {
        let uplink = LoraConfig::uplink(905_500_000, DataRate::Dr3, 14);
        assert_eq!(modulation_params(&uplink), Ok([7, 0x04, 0x01, 0x00]));

        let rx2 = LoraConfig::downlink(923_300_000, DataRate::Dr8);
        assert_eq!(modulation_params(&rx2), Ok([12, 0x06, 0x01, 0x00]));

        // SF11 at 125 kHz has 16.4 ms symbols
        let slow = LoraConfig {
            spreading_factor: 11,
            ..LoraConfig::uplink(902_300_000, DataRate::Dr0, 14)
        };
        assert_eq!(modulation_params(&slow).map(|p| p[3]), Ok(0x01));
    }

    #[test]
    fn test_modulation_params_rejects_unknown_bandwidth() {
        let config = LoraConfig {
            bandwidth_khz: 62,
            ..LoraConfig::default()
        };
        assert_eq!(modulation_params(&config), Err(LoraError::InvalidConfig));
    }

    #[test]
    fn test_packet_params_follow_direction() {
        let uplink = LoraConfig::uplink(905_500_000, DataRate::Dr3, 14);
        assert_eq!(packet_params(&uplink, 26), [0x00, 0x08, 0x00, 26, 0x01, 0x00]);

        let downlink = LoraConfig::downlink(923_300_000, DataRate::Dr13);
        assert_eq!(packet_params(&downlink, 255), [0x00, 0x08, 0x00, 255, 0x00, 0x01]);
    }

    #[test]
    fn test_iq_polarity_bit() {
        assert_eq!(iq_polarity(0x0D, true), 0x09);
        assert_eq!(iq_polarity(0x09, false), 0x0D);
    }

    #[test]
    fn test_power_and_timeouts() {
        assert_eq!(tx_params(14), [14, 0x04]);
        assert_eq!(tx_params(-3), [0xFD, 0x04]);
        assert_eq!(tx_params(30), [22, 0x04]);
        assert_eq!(current_limit(140), 56);
        assert_eq!(rx_timeout(500), [0x00, 0x7D, 0x00]);
        assert_eq!(rx_timeout(u32::MAX), [0xFF, 0xFF, 0xFF]);
        assert_eq!(tcxo_params(0x02, 5), [0x02, 0x00, 0x01, 0x40]);
        assert_eq!(sync_word(true), [0x34, 0x44]);
        assert_eq!(packet_status(180, 0xF8), (-90, -2));
    }
}
