//! Fixed NTSC master palette used to turn 6-bit colour indices into RGB.

use crate::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// 24-bit colour as produced by the composite decoder.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

const fn c(r: u8, g: u8, b: u8) -> Rgb {
    Rgb::new(r, g, b)
}

#[rustfmt::skip]
pub const NTSC_PALETTE: [Rgb; 64] = [
    // 0x00
    c(84, 84, 84),    c(0, 30, 116),    c(8, 16, 144),    c(48, 0, 136),
    c(68, 0, 100),    c(92, 0, 48),     c(84, 4, 0),      c(60, 24, 0),
    c(32, 42, 0),     c(8, 58, 0),      c(0, 64, 0),      c(0, 60, 0),
    c(0, 50, 60),     c(0, 0, 0),       c(0, 0, 0),       c(0, 0, 0),
    // 0x10
    c(152, 150, 152), c(8, 76, 196),    c(48, 50, 236),   c(92, 30, 228),
    c(136, 20, 176),  c(160, 20, 100),  c(152, 34, 32),   c(120, 60, 0),
    c(84, 90, 0),     c(40, 114, 0),    c(8, 124, 0),     c(0, 118, 40),
    c(0, 102, 120),   c(0, 0, 0),       c(0, 0, 0),       c(0, 0, 0),
    // 0x20
    c(236, 238, 236), c(76, 154, 236),  c(120, 124, 236), c(176, 98, 236),
    c(228, 84, 236),  c(236, 88, 180),  c(236, 106, 100), c(212, 136, 32),
    c(160, 170, 0),   c(116, 196, 0),   c(76, 208, 32),   c(56, 204, 108),
    c(56, 180, 204),  c(60, 60, 60),    c(0, 0, 0),       c(0, 0, 0),
    // 0x30
    c(236, 238, 236), c(168, 204, 236), c(188, 188, 236), c(212, 178, 236),
    c(236, 174, 236), c(236, 174, 212), c(236, 180, 176), c(228, 196, 144),
    c(204, 210, 120), c(180, 222, 120), c(168, 226, 144), c(152, 226, 180),
    c(160, 214, 228), c(160, 162, 160), c(0, 0, 0),       c(0, 0, 0),
];

/// Looks up an index, wrapping anything above 63.
#[inline]
pub fn colour(index: u8) -> Rgb {
    NTSC_PALETTE[(index % 64) as usize]
}

/// Expands palette indices into packed RGBA bytes with opaque alpha.
pub fn to_rgba(indices: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(indices.len() * 4);
    for &index in indices {
        let Rgb { r, g, b } = colour(index);
        rgba.extend_from_slice(&[r, g, b, 0xFF]);
    }
    rgba
}

/// Size in bytes of a full frame converted by [`to_rgba`].
pub const FRAME_RGBA_LEN: usize = SCREEN_WIDTH * SCREEN_HEIGHT * 4;
