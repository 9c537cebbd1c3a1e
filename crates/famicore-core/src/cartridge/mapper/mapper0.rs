//! Mapper 0 (NROM) implementation.
//!
//! NROM is the simplest NES board, used by early titles like *Super Mario Bros.*,
//! *Donkey Kong*, and *Excitebike*. It provides no banking capabilities, meaning
//! the CPU sees the entire PRG ROM and the PPU sees the entire CHR ROM/RAM directly.
//!
//! # Memory Layout
//!
//! - **PRG ROM**: 16 KiB or 32 KiB mapped at `$8000-$FFFF`.
//!   - **NROM-128 (16 KiB)**: Mirrored at `$8000-$BFFF` and `$C000-$FFFF`.
//!   - **NROM-256 (32 KiB)**: Occupies the full `$8000-$FFFF` range.
//! - **CHR**: 8 KiB of ROM or RAM mapped at `$0000-$1FFF` (PPU).
//!
//! # Reference
//! - [NROM on NESdev Wiki](https://www.nesdev.org/wiki/NROM)

use std::borrow::Cow;

use crate::{
    cartridge::mapper::{CartridgeMemory, Mapper},
    error::Result,
    memory::cpu as cpu_mem,
    state::{Savestate, StateReader, StateWriter},
};

/// Mapper 0 (NROM) state.
#[derive(Debug, Clone)]
pub struct Mapper0 {
    /// `true` for NROM-256.
    full_window: bool,
}

impl Mapper0 {
    pub fn new(prg_chunks: usize) -> Self {
        Self {
            full_window: prg_chunks > 1,
        }
    }
}

impl Mapper for Mapper0 {
    fn mapper_id(&self) -> u16 {
        0
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("NROM")
    }

    fn cpu_read(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        if addr < cpu_mem::PRG_ROM_START {
            return None;
        }
        let mask = if self.full_window { 0x7FFF } else { 0x3FFF };
        Some(mem.prg(usize::from(addr & mask)))
    }

    fn cpu_write(&mut self, _mem: &mut CartridgeMemory, _addr: u16, _data: u8) -> bool {
        false
    }
}

impl Savestate for Mapper0 {
    fn save(&self, w: &mut StateWriter) {
        w.bool(self.full_window);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.full_window = r.bool()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mapper::test_support::banked_memory;

    #[test]
    fn nrom_128_mirrors_upper_half() {
        let mut mem = banked_memory(1, 1);
        mem.prg[0x0123] = 0x42;
        let mapper = Mapper0::new(1);
        assert_eq!(mapper.cpu_read(&mem, 0x8123), Some(0x42));
        assert_eq!(mapper.cpu_read(&mem, 0xC123), Some(0x42));
        assert_eq!(mapper.cpu_read(&mem, 0x6000), None);
    }

    #[test]
    fn nrom_256_maps_both_chunks() {
        let mem = banked_memory(2, 1);
        let mapper = Mapper0::new(2);
        assert_eq!(mapper.cpu_read(&mem, 0x8000), Some(0));
        assert_eq!(mapper.cpu_read(&mem, 0xC000), Some(1));
    }

    #[test]
    fn chr_writes_land_in_chr() {
        let mut mem = banked_memory(1, 1);
        let mut mapper = Mapper0::new(1);
        assert!(mapper.ppu_write(&mut mem, 0x0010, 0x77));
        assert_eq!(mapper.ppu_read(&mem, 0x0010), Some(0x77));
        assert_eq!(mapper.ppu_read(&mem, 0x2000), None);
    }
}
