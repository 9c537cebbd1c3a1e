use super::VramAddr;

/// Internal VRAM register block matching the NESDev `v/t/x/w` terminology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct VramRegisters {
    /// Current VRAM address (`v`).
    pub(crate) v: VramAddr,
    /// Temporary VRAM address (`t`).
    pub(crate) t: VramAddr,
    /// Fine X scroll component (`x`, 0..7).
    pub(crate) x: u8,
    /// Write toggle (`w`) shared by `$2005` and `$2006`.
    pub(crate) w: bool,
}

impl VramRegisters {
    /// `$2005`: X scroll on the first write, Y scroll on the second.
    pub(crate) fn write_scroll(&mut self, value: u8) {
        if !self.w {
            self.t.set_coarse_x(value >> 3);
            self.x = value & 0b111;
        } else {
            self.t.set_coarse_y(value >> 3);
            self.t.set_fine_y(value & 0b111);
        }
        self.w = !self.w;
    }

    /// `$2006`: high six bits then low byte; the second write commits `t` into `v`.
    pub(crate) fn write_addr(&mut self, value: u8) {
        if !self.w {
            let hi = u16::from(value & 0b0011_1111) << 8;
            self.t.set_raw(hi | (self.t.raw() & 0x00FF));
        } else {
            self.t.set_raw((self.t.raw() & 0x7F00) | u16::from(value));
            self.v = self.t;
        }
        self.w = !self.w;
    }

    pub(crate) fn reset_latch(&mut self) {
        self.w = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_pair_commits_on_second_write() {
        let mut regs = VramRegisters::default();
        regs.write_addr(0x21);
        assert_eq!(regs.v.raw(), 0);
        regs.write_addr(0x08);
        assert_eq!(regs.v.raw(), 0x2108);
        assert!(!regs.w);
    }

    #[test]
    fn scroll_and_address_share_the_toggle() {
        let mut regs = VramRegisters::default();
        regs.write_scroll(0x7D);
        assert!(regs.w);
        assert_eq!(regs.t.coarse_x(), 0x0F);
        assert_eq!(regs.x, 5);

        regs.write_addr(0x00);
        assert!(!regs.w);
        assert_eq!(regs.v.raw(), regs.t.raw());
    }
}
