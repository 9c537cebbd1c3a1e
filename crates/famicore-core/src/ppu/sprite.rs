use bitflags::bitflags;

bitflags! {
    /// Attribute bits stored in sprite byte 2.
    ///
    /// Bit layout:
    /// ```text
    /// 7 6 5 4 3 2 1 0
    /// V H P . . . p p
    /// ```
    /// - `V`: Vertical flip
    /// - `H`: Horizontal flip
    /// - `P`: Priority (behind background when set)
    /// - `p`: Sprite palette select (0..=3)
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct SpriteAttributes: u8 {
        const PALETTE = 0b0000_0011;

        /// When set, sprite is drawn behind the background.
        const PRIORITY_BEHIND_BACKGROUND = 0b0010_0000;

        const FLIP_HORIZONTAL = 0b0100_0000;

        const FLIP_VERTICAL = 0b1000_0000;
    }
}

impl SpriteAttributes {
    pub(crate) fn palette(self) -> u8 {
        self.bits() & Self::PALETTE.bits()
    }
}

/// Sprites evaluated for one scanline.
pub(crate) const SPRITES_PER_LINE: usize = 8;
pub(crate) const BYTES_PER_SPRITE: usize = 4;

/// One entry of the per-line sprite buffer together with its output shifters.
///
/// The NES encodes each OAM sprite as four consecutive bytes:
/// - byte 0: Y position (top row minus one)
/// - byte 1: tile index
/// - byte 2: attribute bits (see [`SpriteAttributes`])
/// - byte 3: X position
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SpriteSlot {
    pub(crate) y: u8,
    pub(crate) tile: u8,
    pub(crate) attributes: SpriteAttributes,
    /// Counts down to zero before the sprite starts shifting out.
    pub(crate) x: u8,
    pub(crate) pattern_lo: u8,
    pub(crate) pattern_hi: u8,
}

impl SpriteSlot {
    pub(crate) fn from_oam(entry: &[u8]) -> Self {
        Self {
            y: entry[0],
            tile: entry[1],
            attributes: SpriteAttributes::from_bits_retain(entry[2]),
            x: entry[3],
            pattern_lo: 0,
            pattern_hi: 0,
        }
    }

    /// Two-bit colour of the pixel currently at the front of the shifters.
    pub(crate) fn pixel(&self) -> u8 {
        ((self.pattern_hi >> 6) & 0b10) | (self.pattern_lo >> 7)
    }

    /// Advances one dot: counts X down, then shifts the pattern out.
    pub(crate) fn tick(&mut self) {
        if self.x > 0 {
            self.x -= 1;
        } else {
            self.pattern_lo <<= 1;
            self.pattern_hi <<= 1;
        }
    }

    pub(crate) fn clear_pattern(&mut self) {
        self.pattern_lo = 0;
        self.pattern_hi = 0;
    }
}
