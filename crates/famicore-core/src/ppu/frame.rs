use super::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Colour index painted before the first frame and in hidden borders.
pub(crate) const BLACK: u8 = 0x0F;

/// 256x240 grid of 6-bit palette indices, row-major.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FrameBuffer {
    pixels: Box<[u8]>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: vec![BLACK; SCREEN_WIDTH * SCREEN_HEIGHT].into_boxed_slice(),
        }
    }

    /// Horizontal colour bands shown while no cartridge is inserted.
    pub fn power_off_pattern() -> Self {
        let mut frame = Self::new();
        for (y, row) in frame.pixels.chunks_exact_mut(SCREEN_WIDTH).enumerate() {
            row.fill((y / 22) as u8 + 0x31);
        }
        frame
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub(crate) fn set(&mut self, x: usize, y: usize, colour: u8) {
        if x < SCREEN_WIDTH && y < SCREEN_HEIGHT {
            self.pixels[y * SCREEN_WIDTH + x] = colour;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        (x < SCREEN_WIDTH && y < SCREEN_HEIGHT).then(|| self.pixels[y * SCREEN_WIDTH + x])
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

impl core::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &SCREEN_WIDTH)
            .field("height", &SCREEN_HEIGHT)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_off_bands_step_every_22_rows() {
        let frame = FrameBuffer::power_off_pattern();
        assert_eq!(frame.get(0, 0), Some(0x31));
        assert_eq!(frame.get(255, 21), Some(0x31));
        assert_eq!(frame.get(0, 22), Some(0x32));
        assert_eq!(frame.get(0, 239), Some(0x31 + 10));
        assert_eq!(frame.get(256, 0), None);
    }
}
