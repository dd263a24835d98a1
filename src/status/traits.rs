//! Status display trait for abstraction and testability
//!
//! The node only ever draws a handful of text lines and a logo, so the
//! display is modelled as a stateful framebuffer with a current font and
//! alignment. Calls only touch the buffer until `flush`.

/// Text size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    /// Status lines (about 10 px high)
    Small,
    /// Splash text (about 16 px high)
    Large,
}

/// Horizontal anchoring of text relative to its x coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Framebuffer-style display
pub trait StatusDisplay {
    /// Blank the framebuffer
    fn clear(&mut self);

    fn set_font(&mut self, font: Font);

    fn set_text_alignment(&mut self, align: TextAlign);

    /// Draw text with its top edge at `y`
    fn draw_text(&mut self, x: i32, y: i32, text: &str);

    /// Draw a 1-bit bitmap (row-major, MSB first, rows padded to bytes)
    fn draw_bitmap(&mut self, x: i32, y: i32, width: u32, height: u32, bits: &[u8]);

    /// Push the framebuffer to the panel
    fn flush(&mut self);

    fn width(&self) -> u32;

    fn height(&self) -> u32;
}
