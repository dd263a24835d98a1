//! SSD1306 OLED backend for the status display
//!
//! Draws into the ssd1306 buffered graphics mode with embedded-graphics and
//! pushes the buffer on `flush`.

use crate::config::oled::{HEIGHT, WIDTH};
use crate::status::traits::{Font, StatusDisplay, TextAlign};
use embedded_graphics::image::{Image, ImageRaw};
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_7X14};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use log::warn;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::Ssd1306;

/// The panel did not accept its init sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OledInitError;

type Panel<DI> = Ssd1306<DI, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

pub struct OledDisplay<DI> {
    display: Panel<DI>,
    font: &'static MonoFont<'static>,
    alignment: Alignment,
}

/// Large must keep the longest banner line within the 128 px panel
fn mono_font(font: Font) -> &'static MonoFont<'static> {
    match font {
        Font::Small => &FONT_6X10,
        Font::Large => &FONT_7X14,
    }
}

/// Text anchored at its top edge, `x` is the alignment point
fn layout_text<'a>(
    font: &'static MonoFont<'static>,
    alignment: Alignment,
    x: i32,
    y: i32,
    text: &'a str,
) -> Text<'a, MonoTextStyle<'static, BinaryColor>> {
    let character_style = MonoTextStyle::new(font, BinaryColor::On);
    let text_style = TextStyleBuilder::new()
        .alignment(alignment)
        .baseline(Baseline::Top)
        .build();
    Text::with_text_style(text, Point::new(x, y), character_style, text_style)
}

impl<DI> OledDisplay<DI>
where
    DI: WriteOnlyDataCommand,
{
    /// Initialise the panel. The board mounts it upside down.
    pub fn new(interface: DI) -> Result<Self, OledInitError> {
        let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate180)
            .into_buffered_graphics_mode();
        display.init().map_err(|_| OledInitError)?;

        Ok(Self {
            display,
            font: &FONT_6X10,
            alignment: Alignment::Left,
        })
    }
}

impl<DI> StatusDisplay for OledDisplay<DI>
where
    DI: WriteOnlyDataCommand,
{
    fn clear(&mut self) {
        self.display.clear_buffer();
    }

    fn set_font(&mut self, font: Font) {
        self.font = mono_font(font);
    }

    fn set_text_alignment(&mut self, align: TextAlign) {
        self.alignment = match align {
            TextAlign::Left => Alignment::Left,
            TextAlign::Center => Alignment::Center,
            TextAlign::Right => Alignment::Right,
        };
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        // Drawing into the RAM buffer cannot fail
        let _ = layout_text(self.font, self.alignment, x, y, text).draw(&mut self.display);
    }

    fn draw_bitmap(&mut self, x: i32, y: i32, width: u32, _height: u32, bits: &[u8]) {
        let raw = ImageRaw::<BinaryColor>::new(bits, width);
        let _ = Image::new(&raw, Point::new(x, y)).draw(&mut self.display);
    }

    fn flush(&mut self) {
        if let Err(error) = self.display.flush() {
            warn!("OLED flush failed: {:?}", error);
        }
    }

    fn width(&self) -> u32 {
        WIDTH
    }

    fn height(&self) -> u32 {
        HEIGHT
    }
}
