//! LoRaWAN 1.0 MAC helpers: ABP frame codec and time-on-air

pub mod airtime;
pub mod frame;

pub use airtime::{airtime_us, Modulation};
pub use frame::{decode_downlink, encode_uplink, Downlink, FrameBuf, FrameError, Uplink};
