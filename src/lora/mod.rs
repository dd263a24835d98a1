pub mod clock;
#[cfg(feature = "embedded")]
pub mod driver;
pub mod engine;
pub mod sx1262;
pub mod traits;

pub use clock::Clock;
#[cfg(feature = "embedded")]
pub use clock::EmbassyClock;
#[cfg(feature = "embedded")]
pub use driver::Sx1262Driver;
pub use engine::LoraWanEngine;
pub use traits::{LoraConfig, LoraError, LoraRadio, RxPacket};
