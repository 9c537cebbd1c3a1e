use bitflags::bitflags;

use crate::memory::ppu as ppu_mem;

bitflags! {
    /// PPU control register (`$2000`).
    ///
    /// Bit layout:
    /// ```text
    /// 7 6 5 4 3 2 1 0
    /// N M S B s I n n
    /// ```
    /// - `n n`: base nametable select
    /// - `I`: VRAM increment (0=+1, 1=+32)
    /// - `s`: sprite pattern table (8x8)
    /// - `B`: background pattern table
    /// - `S`: sprite size (0=8x8, 1=8x16)
    /// - `M`: master/slave select (unused)
    /// - `N`: generate NMI at VBlank start
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct Control: u8 {
        const NAMETABLE = 0b0000_0011;
        const INCREMENT_32 = 0b0000_0100;
        const SPRITE_TABLE = 0b0000_1000;
        const BACKGROUND_TABLE = 0b0001_0000;
        const SPRITE_SIZE_16 = 0b0010_0000;
        const MASTER_SLAVE = 0b0100_0000;
        const GENERATE_NMI = 0b1000_0000;
    }
}

impl Control {
    /// Returns the nametable select bits (0..3).
    pub(crate) fn nametable_index(self) -> u8 {
        self.bits() & 0b11
    }

    /// Returns the VRAM increment amount (1 or 32) based on bit 2.
    pub(crate) fn vram_increment(self) -> u16 {
        if self.contains(Control::INCREMENT_32) {
            32
        } else {
            1
        }
    }

    /// Pattern table used by 8x8 sprites.
    pub(crate) fn sprite_pattern_table(self) -> u16 {
        if self.contains(Control::SPRITE_TABLE) {
            ppu_mem::PATTERN_TABLE_1
        } else {
            0
        }
    }

    pub(crate) fn background_pattern_table(self) -> u16 {
        if self.contains(Control::BACKGROUND_TABLE) {
            ppu_mem::PATTERN_TABLE_1
        } else {
            0
        }
    }

    /// Sprite height in scanlines (8 or 16).
    pub(crate) fn sprite_height(self) -> i16 {
        if self.contains(Control::SPRITE_SIZE_16) {
            16
        } else {
            8
        }
    }

    pub(crate) fn nmi_enabled(self) -> bool {
        self.contains(Control::GENERATE_NMI)
    }
}
