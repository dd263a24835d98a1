//! Boot logo: a small antenna mast.
//!
//! Row-major, most significant bit first, each row padded to a whole byte.

pub const LOGO_WIDTH: u32 = 32;
pub const LOGO_HEIGHT: u32 = 20;

pub const LOGO_BITS: [u8; (LOGO_WIDTH / 8 * LOGO_HEIGHT) as usize] = [
    0x00, 0x00, 0x00, 0x00,
    0x00, 0x07, 0xE0, 0x00,
    0x00, 0x38, 0x1C, 0x00,
    0x00, 0xC3, 0xC3, 0x00,
    0x01, 0x0C, 0x30, 0x80,
    0x02, 0x31, 0x8C, 0x40,
    0x00, 0x44, 0x22, 0x00,
    0x00, 0x09, 0x90, 0x00,
    0x00, 0x01, 0x80, 0x00,
    0x00, 0x03, 0xC0, 0x00,
    0x00, 0x02, 0x40, 0x00,
    0x00, 0x04, 0x20, 0x00,
    0x00, 0x04, 0x20, 0x00,
    0x00, 0x08, 0x10, 0x00,
    0x00, 0x08, 0x10, 0x00,
    0x00, 0x10, 0x08, 0x00,
    0x00, 0x10, 0x08, 0x00,
    0x00, 0x20, 0x04, 0x00,
    0x00, 0x3F, 0xFC, 0x00,
    0x00, 0x00, 0x00, 0x00,
];
