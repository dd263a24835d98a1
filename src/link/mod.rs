pub mod handler;

pub use handler::{LinkEventHandler, Reaction};
