//! LoRa time-on-air calculation.
//!
//! Integer version of the formula from the Semtech SX1262 datasheet
//! (section 6.1.4), with explicit header and CRC always on as used for
//! LoRaWAN uplinks.

use crate::config::radio::{CODING_RATE, PREAMBLE_SYMBOLS};
use crate::region::DataRate;

/// LoRa modulation parameters for airtime calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modulation {
    /// Spreading factor (7-12)
    pub spreading_factor: u8,
    pub bandwidth_hz: u32,
    /// Coding rate denominator (5-8 for 4/5 to 4/8)
    pub coding_rate: u8,
    pub preamble_symbols: u16,
}

impl Modulation {
    pub fn for_data_rate(rate: DataRate) -> Self {
        Self {
            spreading_factor: rate.spreading_factor(),
            bandwidth_hz: rate.bandwidth_khz() * 1000,
            coding_rate: CODING_RATE,
            preamble_symbols: PREAMBLE_SYMBOLS,
        }
    }

    /// Symbol duration in microseconds: 2^SF / BW
    pub fn symbol_duration_us(&self) -> u64 {
        if self.bandwidth_hz == 0 {
            return 0;
        }
        (1u64 << self.spreading_factor) * 1_000_000 / self.bandwidth_hz as u64
    }

    /// Required when the symbol time exceeds 16 ms (SF11/SF12 at 125 kHz).
    pub fn low_data_rate_optimize(&self) -> bool {
        self.symbol_duration_us() > 16_000
    }
}

/// Airtime of a packet with `payload_bytes` of PHY payload, in microseconds.
pub fn airtime_us(payload_bytes: usize, modulation: &Modulation) -> u64 {
    let t_sym = modulation.symbol_duration_us();
    let sf = modulation.spreading_factor as i64;
    let de = if modulation.low_data_rate_optimize() { 1 } else { 0 };

    // (preamble + 4.25) symbols
    let preamble_us = (modulation.preamble_symbols as u64 * 4 + 17) * t_sym / 4;

    // 8*PL - 4*SF + 28 + 16*CRC, explicit header
    let numerator = 8 * payload_bytes as i64 - 4 * sf + 28 + 16;
    let denominator = 4 * (sf - 2 * de);
    let blocks = if numerator > 0 && denominator > 0 {
        (numerator + denominator - 1) / denominator
    } else {
        0
    };
    let payload_symbols = 8 + blocks as u64 * modulation.coding_rate as u64;

    preamble_us + payload_symbols * t_sym
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sf7_hello_world_uplink() {
        // 13-byte payload + 13 bytes of LoRaWAN overhead
        let modulation = Modulation::for_data_rate(DataRate::Dr3);
        assert_eq!(modulation.symbol_duration_us(), 1024);
        assert_eq!(airtime_us(26, &modulation), 61_696);
    }

    #[test]
    fn test_low_data_rate_optimize() {
        let sf12 = Modulation {
            spreading_factor: 12,
            bandwidth_hz: 125_000,
            coding_rate: 5,
            preamble_symbols: 8,
        };
        assert!(sf12.low_data_rate_optimize());
        assert_eq!(airtime_us(13, &sf12), 1_155_072);
        assert!(!Modulation::for_data_rate(DataRate::Dr8).low_data_rate_optimize());
    }

    #[test]
    fn test_longer_payload_takes_longer() {
        let modulation = Modulation::for_data_rate(DataRate::Dr1);
        assert!(airtime_us(50, &modulation) > airtime_us(10, &modulation));
    }
}
