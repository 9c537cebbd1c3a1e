use std::borrow::Cow;

use tracing::debug;

use crate::{
    cartridge::mapper::{CartridgeMemory, Mapper, read_chr_8k},
    error::Result,
    memory::cpu as cpu_mem,
    state::{Savestate, StateReader, StateWriter},
};

// Mapper 3 – CNROM 8 KiB CHR banking.
//
// | Area | Address range     | Behaviour                                  | IRQ/Audio |
// |------|-------------------|--------------------------------------------|-----------|
// | CPU  | `$8000-$FFFF`     | 16/32 KiB PRG-ROM, NROM layout; bank latch | None      |
// | PPU  | `$0000-$1FFF`     | 8 KiB switchable CHR-ROM bank (2 bits)     | None      |
// | PPU  | `$2000-$3EFF`     | Mirroring from iNES header                 | None      |

#[derive(Debug, Clone)]
pub struct Mapper3 {
    full_window: bool,
    chr_bank: u8,
}

impl Mapper3 {
    pub fn new(prg_chunks: usize) -> Self {
        Self {
            full_window: prg_chunks > 1,
            chr_bank: 0,
        }
    }
}

impl Mapper for Mapper3 {
    fn mapper_id(&self) -> u16 {
        3
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("CNROM")
    }

    fn cpu_read(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        if addr < cpu_mem::PRG_ROM_START {
            return None;
        }
        let mask = if self.full_window { 0x7FFF } else { 0x3FFF };
        Some(mem.prg(usize::from(addr & mask)))
    }

    fn cpu_write(&mut self, _mem: &mut CartridgeMemory, addr: u16, data: u8) -> bool {
        if addr >= cpu_mem::PRG_ROM_START {
            self.chr_bank = data & 0b11;
            debug!(bank = self.chr_bank, "cnrom chr bank");
        }
        false
    }

    fn ppu_read(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        read_chr_8k(mem, usize::from(self.chr_bank), addr)
    }

    fn ppu_write(&mut self, _mem: &mut CartridgeMemory, _addr: u16, _data: u8) -> bool {
        false
    }

    fn reset(&mut self) {
        self.chr_bank = 0;
    }
}

impl Savestate for Mapper3 {
    fn save(&self, w: &mut StateWriter) {
        w.bool(self.full_window);
        w.u8(self.chr_bank);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.full_window = r.bool()?;
        self.chr_bank = r.u8()? & 0b11;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mapper::test_support::banked_memory;

    #[test]
    fn selects_chr_bank() {
        let mut mem = banked_memory(2, 4);
        let mut mapper = Mapper3::new(2);
        assert_eq!(mapper.ppu_read(&mem, 0x0000), Some(0x80));
        mapper.cpu_write(&mut mem, 0x8000, 0x03);
        assert_eq!(mapper.ppu_read(&mem, 0x1FFF), Some(0x83));
    }

    #[test]
    fn missing_chr_bank_is_unclaimed() {
        let mut mem = banked_memory(1, 1);
        let mut mapper = Mapper3::new(1);
        mapper.cpu_write(&mut mem, 0x8000, 0x02);
        assert_eq!(mapper.ppu_read(&mem, 0x0000), None);
    }
}
