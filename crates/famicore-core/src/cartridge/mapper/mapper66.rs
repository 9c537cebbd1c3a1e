use std::borrow::Cow;

use tracing::debug;

use crate::{
    cartridge::mapper::{CartridgeMemory, Mapper, read_chr_8k, read_prg_32k},
    error::Result,
    memory::cpu as cpu_mem,
    state::{Savestate, StateReader, StateWriter},
};

// Mapper 66 – GxROM / MxROM 32 KiB PRG + 8 KiB CHR banking.
//
// | Area | Address range     | Behaviour                                        | IRQ/Audio |
// |------|-------------------|--------------------------------------------------|-----------|
// | CPU  | `$8000-$FFFF`     | 32 KiB PRG bank (bits 4-5); write selects banks  | None      |
// | PPU  | `$0000-$1FFF`     | 8 KiB CHR-ROM bank (bits 0-1)                    | None      |
// | PPU  | `$2000-$3EFF`     | Mirroring from iNES header                       | None      |

#[derive(Debug, Clone, Default)]
pub struct Mapper66 {
    prg_bank: u8,
    chr_bank: u8,
}

impl Mapper66 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared `PPPP CCCC`-style latch decode also used by mapper 140.
    pub(super) fn latch(&mut self, data: u8) {
        self.prg_bank = (data >> 4) & 0b11;
        self.chr_bank = data & 0b11;
        debug!(prg = self.prg_bank, chr = self.chr_bank, "gxrom select");
    }

    pub(super) fn read_prg(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        (addr >= cpu_mem::PRG_ROM_START).then(|| read_prg_32k(mem, usize::from(self.prg_bank), addr))
    }

    pub(super) fn read_chr(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        read_chr_8k(mem, usize::from(self.chr_bank), addr)
    }

    pub(super) fn set_prg_bank(&mut self, bank: u8) {
        self.prg_bank = bank;
        self.chr_bank = 0;
    }
}

impl Mapper for Mapper66 {
    fn mapper_id(&self) -> u16 {
        66
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("GxROM")
    }

    fn cpu_read(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        self.read_prg(mem, addr)
    }

    fn cpu_write(&mut self, _mem: &mut CartridgeMemory, addr: u16, data: u8) -> bool {
        if addr >= cpu_mem::PRG_ROM_START {
            self.latch(data);
        }
        false
    }

    fn ppu_read(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        self.read_chr(mem, addr)
    }

    fn ppu_write(&mut self, _mem: &mut CartridgeMemory, _addr: u16, _data: u8) -> bool {
        false
    }

    fn reset(&mut self) {
        self.set_prg_bank(0);
    }
}

impl Savestate for Mapper66 {
    fn save(&self, w: &mut StateWriter) {
        w.u8(self.prg_bank);
        w.u8(self.chr_bank);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.prg_bank = r.u8()?;
        self.chr_bank = r.u8()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mapper::test_support::banked_memory;

    #[test]
    fn latch_selects_prg_and_chr() {
        let mut mem = banked_memory(8, 4);
        let mut mapper = Mapper66::new();
        assert_eq!(mapper.cpu_read(&mem, 0x8000), Some(0));

        mapper.cpu_write(&mut mem, 0x8000, 0x21);
        assert_eq!(mapper.cpu_read(&mem, 0x8000), Some(4));
        assert_eq!(mapper.cpu_read(&mem, 0xC000), Some(5));
        assert_eq!(mapper.ppu_read(&mem, 0x0000), Some(0x81));
    }

    #[test]
    fn work_ram_window_is_ignored() {
        let mut mem = banked_memory(8, 4);
        let mut mapper = Mapper66::new();
        mapper.cpu_write(&mut mem, 0x6000, 0x33);
        assert_eq!(mapper.cpu_read(&mem, 0x8000), Some(0));
        assert!(!mapper.ppu_write(&mut mem, 0x0000, 0));
    }
}
