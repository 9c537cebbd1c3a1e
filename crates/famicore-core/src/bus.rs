use std::fmt::Debug;

use crate::memory;

pub mod cpu;
#[cfg(test)]
pub mod mock;

pub use cpu::CpuBus;

/// Expose the CPU stack page start address for stack helpers.
pub(crate) const STACK_ADDR: u16 = memory::cpu::STACK_PAGE_START;

/// CPU-side view of the address space.
///
/// Reads may carry side effects (PPU status latch, controller shift, APU IRQ
/// acknowledge). Unmapped addresses read as `0` and ignore writes; neither
/// direction can fail.
pub trait Bus: Debug {
    fn read(&mut self, addr: u16) -> u8;

    fn write(&mut self, addr: u16, data: u8);

    /// Little-endian word read; the high byte comes from `addr + 1`.
    fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr);
        let hi = self.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }
}

impl<T: Bus + ?Sized> Bus for &mut T {
    fn read(&mut self, addr: u16) -> u8 {
        (**self).read(addr)
    }

    fn write(&mut self, addr: u16, data: u8) {
        (**self).write(addr, data)
    }
}
