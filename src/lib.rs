#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod debug;
pub mod link;
pub mod lora;
pub mod mac;
pub mod node;
pub mod radio;
pub mod region;
pub mod scheduler;
pub mod session;
pub mod status;
pub mod time;

#[cfg(test)]
mod testing;
