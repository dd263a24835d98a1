pub mod logo;
#[cfg(any(feature = "embedded", test))]
pub mod oled;
pub mod panel;
pub mod traits;

pub use panel::StatusPanel;
pub use traits::{Font, StatusDisplay, TextAlign};
