//! Local status output: OLED screens plus the "sending" LED

use super::logo::{LOGO_BITS, LOGO_HEIGHT, LOGO_WIDTH};
use super::traits::{Font, StatusDisplay, TextAlign};
use core::fmt::Write;
use embedded_hal::digital::OutputPin;
use heapless::String;

/// x position of the packet number on the sending screen
const COUNTER_X: i32 = 90;

/// Display and LED driven together by the scheduler and the event handler
pub struct StatusPanel<D, L> {
    display: D,
    led: L,
}

impl<D, L> StatusPanel<D, L>
where
    D: StatusDisplay,
    L: OutputPin,
{
    pub fn new(display: D, led: L) -> Self {
        Self { display, led }
    }

    /// Centred boot logo
    pub fn show_logo(&mut self) {
        let x = (self.display.width().saturating_sub(LOGO_WIDTH) / 2) as i32;
        let y = (self.display.height().saturating_sub(LOGO_HEIGHT) / 2) as i32;

        self.display.clear();
        self.display
            .draw_bitmap(x, y, LOGO_WIDTH, LOGO_HEIGHT, &LOGO_BITS);
        self.display.flush();
    }

    /// Which function this device is running
    pub fn show_banner(&mut self) {
        let center_x = (self.display.width() / 2) as i32;
        let center_y = (self.display.height() / 2) as i32;

        self.display.clear();
        self.display.set_font(Font::Large);
        self.display.set_text_alignment(TextAlign::Center);
        self.display.draw_text(center_x, 0, "LoRa");
        self.display
            .draw_text(center_x, center_y, "Node (transmitter)");
        self.display.flush();
    }

    /// LED on, show the number of the packet being queued
    pub fn show_sending(&mut self, sequence: u32) {
        let _ = self.led.set_high();

        let mut number: String<10> = String::new();
        let _ = write!(number, "{}", sequence);

        self.display.clear();
        self.display.set_font(Font::Small);
        self.display.set_text_alignment(TextAlign::Left);
        self.display.draw_text(0, 0, "Sending packet: ");
        self.display.draw_text(COUNTER_X, 0, &number);
        self.display.flush();
    }

    /// LED off once the transmit cycle is over
    pub fn sending_done(&mut self) {
        let _ = self.led.set_low();
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn led(&self) -> &L {
        &self.led
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::traits::mock::{DisplayOp, MockDisplay, MockLed};

    fn panel() -> StatusPanel<MockDisplay, MockLed> {
        StatusPanel::new(MockDisplay::new(), MockLed::default())
    }

    #[test]
    fn test_show_sending() {
        let mut panel = panel();
        panel.show_sending(7);

        assert!(panel.led().lit);
        assert_eq!(panel.display().visible_text(), ["Sending packet: ", "7"]);
        assert!(panel.display().ops().contains(&DisplayOp::SetAlign(TextAlign::Left)));
        assert_eq!(panel.display().ops().last(), Some(&DisplayOp::Flush));
    }

    #[test]
    fn test_sending_done_turns_led_off() {
        let mut panel = panel();
        panel.show_sending(0);
        panel.sending_done();
        assert!(!panel.led().lit);
    }

    #[test]
    fn test_logo_is_centred() {
        let mut panel = panel();
        panel.show_logo();

        assert!(panel.display().ops().contains(&DisplayOp::Bitmap {
            x: 48,
            y: 22,
            width: LOGO_WIDTH,
            height: LOGO_HEIGHT,
        }));
    }

    #[test]
    fn test_banner() {
        let mut panel = panel();
        panel.show_banner();

        assert_eq!(panel.display().visible_text(), ["LoRa", "Node (transmitter)"]);
        assert!(panel.display().ops().contains(&DisplayOp::SetFont(Font::Large)));
    }
}
