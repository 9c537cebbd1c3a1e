use bitflags::bitflags;

// Layout (bits 0-14):
//  14 13 12 11 10 9 8 7 6 5 4 3 2 1 0
//  [fine_y][nt][coarse_y   ][coarse_x   ]
//  yyy     NN   YYYYY         XXXXX
bitflags! {
    /// Bit masks for the 15-bit VRAM address (`v`/`t` registers).
    pub(crate) struct VramAddrMask: u16 {
        const COARSE_X = 0x001F;
        const COARSE_Y = 0x03E0;
        const NAMETABLE_X = 0x0400;
        const NAMETABLE_Y = 0x0800;
        const FINE_Y = 0x7000;
        const ALL = 0x7FFF;
    }
}

const COARSE_Y_SHIFT: u16 = 5;
const NAMETABLE_SHIFT: u16 = 10;
const FINE_Y_SHIFT: u16 = 12;

/// 15-bit VRAM address used by the PPU internal `v`/`t` registers.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub(crate) struct VramAddr(u16);

impl VramAddr {
    #[inline]
    pub(crate) fn coarse_x(self) -> u8 {
        (self.0 & VramAddrMask::COARSE_X.bits()) as u8
    }

    #[inline]
    pub(crate) fn set_coarse_x(&mut self, cx: u8) {
        self.0 = (self.0 & !VramAddrMask::COARSE_X.bits()) | u16::from(cx & 0b1_1111);
    }

    #[inline]
    pub(crate) fn coarse_y(self) -> u8 {
        ((self.0 & VramAddrMask::COARSE_Y.bits()) >> COARSE_Y_SHIFT) as u8
    }

    #[inline]
    pub(crate) fn set_coarse_y(&mut self, cy: u8) {
        self.0 = (self.0 & !VramAddrMask::COARSE_Y.bits())
            | (u16::from(cy & 0b1_1111) << COARSE_Y_SHIFT);
    }

    /// Both nametable select bits (0..3).
    #[inline]
    pub(crate) fn set_nametable(&mut self, nt: u8) {
        let mask = VramAddrMask::NAMETABLE_X.bits() | VramAddrMask::NAMETABLE_Y.bits();
        self.0 = (self.0 & !mask) | (u16::from(nt & 0b11) << NAMETABLE_SHIFT);
    }

    #[inline]
    pub(crate) fn fine_y(self) -> u8 {
        ((self.0 & VramAddrMask::FINE_Y.bits()) >> FINE_Y_SHIFT) as u8
    }

    #[inline]
    pub(crate) fn set_fine_y(&mut self, fy: u8) {
        self.0 = (self.0 & !VramAddrMask::FINE_Y.bits()) | (u16::from(fy & 0b111) << FINE_Y_SHIFT);
    }

    #[inline]
    pub(crate) fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub(crate) fn set_raw(&mut self, v: u16) {
        self.0 = v & VramAddrMask::ALL.bits();
    }

    /// Moves to the next tile column, wrapping into the horizontal neighbour.
    pub(crate) fn increment_x(&mut self) {
        if self.coarse_x() == 31 {
            self.set_coarse_x(0);
            self.0 ^= VramAddrMask::NAMETABLE_X.bits();
        } else {
            self.0 += 1;
        }
    }

    /// Moves to the next pixel row, wrapping the 30-row nametable into the
    /// vertical neighbour. Rows 30 and 31 (attribute space) wrap without toggling.
    pub(crate) fn increment_y(&mut self) {
        let fine_y = self.fine_y();
        if fine_y < 7 {
            self.set_fine_y(fine_y + 1);
            return;
        }
        self.set_fine_y(0);
        match self.coarse_y() {
            29 => {
                self.set_coarse_y(0);
                self.0 ^= VramAddrMask::NAMETABLE_Y.bits();
            }
            31 => self.set_coarse_y(0),
            cy => self.set_coarse_y(cy + 1),
        }
    }

    /// Copies the horizontal scroll bits (coarse X and nametable X) from `t`.
    pub(crate) fn copy_x(&mut self, t: VramAddr) {
        let mask = VramAddrMask::COARSE_X.bits() | VramAddrMask::NAMETABLE_X.bits();
        self.0 = (self.0 & !mask) | (t.0 & mask);
    }

    /// Copies the vertical scroll bits (fine Y, coarse Y and nametable Y) from `t`.
    pub(crate) fn copy_y(&mut self, t: VramAddr) {
        let mask = VramAddrMask::FINE_Y.bits()
            | VramAddrMask::COARSE_Y.bits()
            | VramAddrMask::NAMETABLE_Y.bits();
        self.0 = (self.0 & !mask) | (t.0 & mask);
    }

    pub(crate) fn increment(&mut self, step: u16) {
        self.0 = (self.0 + step) & VramAddrMask::ALL.bits();
    }
}

impl core::fmt::Debug for VramAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VramAddr")
            .field("raw", &format_args!("{:#06X}", self.0))
            .field("fine_y", &self.fine_y())
            .field("coarse_y", &self.coarse_y())
            .field("coarse_x", &self.coarse_x())
            .finish()
    }
}
