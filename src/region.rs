//! US915 region parameters: data rates and the 72-entry channel plan
//!
//! Channels 0-63 are 125 kHz uplink channels starting at 902.3 MHz in
//! 200 kHz steps, channels 64-71 are 500 kHz channels starting at 903.0 MHz
//! in 1.6 MHz steps. Downlinks use the eight 500 kHz channels starting at
//! 923.3 MHz in 600 kHz steps.

use crate::config::channels::COUNT;

/// RX2 frequency
pub const RX2_FREQUENCY_HZ: u32 = 923_300_000;

/// Data rates defined for US915
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRate {
    /// SF10 / 125 kHz
    Dr0 = 0,
    /// SF9 / 125 kHz
    Dr1 = 1,
    /// SF8 / 125 kHz
    Dr2 = 2,
    /// SF7 / 125 kHz
    Dr3 = 3,
    /// SF8 / 500 kHz
    Dr4 = 4,
    /// SF12 / 500 kHz
    Dr8 = 8,
    /// SF11 / 500 kHz
    Dr9 = 9,
    /// SF10 / 500 kHz
    Dr10 = 10,
    /// SF9 / 500 kHz
    Dr11 = 11,
    /// SF8 / 500 kHz
    Dr12 = 12,
    /// SF7 / 500 kHz
    Dr13 = 13,
}

impl DataRate {
    pub fn spreading_factor(self) -> u8 {
        match self {
            Self::Dr0 => 10,
            Self::Dr1 => 9,
            Self::Dr2 => 8,
            Self::Dr3 => 7,
            Self::Dr4 => 8,
            Self::Dr8 => 12,
            Self::Dr9 => 11,
            Self::Dr10 => 10,
            Self::Dr11 => 9,
            Self::Dr12 => 8,
            Self::Dr13 => 7,
        }
    }

    pub fn bandwidth_khz(self) -> u32 {
        match self {
            Self::Dr0 | Self::Dr1 | Self::Dr2 | Self::Dr3 => 125,
            _ => 500,
        }
    }

    /// Data rate used in RX1 for an uplink sent at this rate (RX1DROffset 0)
    pub fn rx1_downlink(self) -> DataRate {
        match self {
            Self::Dr0 => Self::Dr10,
            Self::Dr1 => Self::Dr11,
            Self::Dr2 => Self::Dr12,
            Self::Dr3 | Self::Dr4 => Self::Dr13,
            other => other,
        }
    }
}

/// Channel index outside the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    OutOfRange(u8),
}

/// Enabled/disabled state of every channel in the plan
///
/// Stored as a bitmask, so repeated or reordered enable/disable calls are
/// idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPlan {
    mask: u128,
}

impl ChannelPlan {
    /// All channels enabled, the state after a MAC reset
    pub fn all_enabled() -> Self {
        Self {
            mask: (1u128 << COUNT) - 1,
        }
    }

    pub fn none_enabled() -> Self {
        Self { mask: 0 }
    }

    fn check(index: u8) -> Result<u128, ChannelError> {
        if index < COUNT {
            Ok(1u128 << index)
        } else {
            Err(ChannelError::OutOfRange(index))
        }
    }

    pub fn disable(&mut self, index: u8) -> Result<(), ChannelError> {
        self.mask &= !Self::check(index)?;
        Ok(())
    }

    pub fn enable(&mut self, index: u8) -> Result<(), ChannelError> {
        self.mask |= Self::check(index)?;
        Ok(())
    }

    pub fn is_enabled(&self, index: u8) -> bool {
        Self::check(index).map(|bit| self.mask & bit != 0).unwrap_or(false)
    }

    pub fn enabled_count(&self) -> u32 {
        self.mask.count_ones()
    }

    /// Enabled channels in ascending order
    pub fn enabled(&self) -> impl Iterator<Item = u8> + '_ {
        (0..COUNT).filter(move |&index| self.is_enabled(index))
    }

    /// Pick the channel for the `n`th uplink, rotating over enabled channels
    pub fn select(&self, n: u32) -> Option<u8> {
        let count = self.enabled_count();
        if count == 0 {
            return None;
        }
        self.enabled().nth((n % count) as usize)
    }

    /// Uplink centre frequency of a channel
    pub fn uplink_frequency_hz(index: u8) -> Option<u32> {
        match index {
            0..=63 => Some(902_300_000 + 200_000 * index as u32),
            64..=71 => Some(903_000_000 + 1_600_000 * (index as u32 - 64)),
            _ => None,
        }
    }

    /// RX1 downlink frequency paired with an uplink channel
    pub fn rx1_frequency_hz(index: u8) -> u32 {
        923_300_000 + 600_000 * (index as u32 % 8)
    }
}

impl Default for ChannelPlan {
    fn default() -> Self {
        Self::all_enabled()
    }
}
