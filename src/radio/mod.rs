pub mod engine;
pub mod event;

pub use engine::{EngineError, OpState, RadioEngine};
pub use event::{LinkEvent, TxResult};
