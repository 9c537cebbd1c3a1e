use std::borrow::Cow;

use tracing::debug;

use crate::{
    cartridge::{
        header::Mirroring,
        mapper::{CartridgeMemory, Mapper, read_prg_32k},
    },
    error::Result,
    memory::cpu as cpu_mem,
    state::{Savestate, StateReader, StateWriter},
};

// Mapper 7 – AxROM 32 KiB PRG banking with one-screen mirroring.
//
// | Area | Address range     | Behaviour                                        | IRQ/Audio |
// |------|-------------------|--------------------------------------------------|-----------|
// | CPU  | `$8000-$FFFF`     | 32 KiB switchable PRG-ROM bank (bits 0-3)        | None      |
// | PPU  | `$0000-$1FFF`     | 8 KiB CHR RAM                                    | None      |
// | PPU  | `$2000-$3EFF`     | One-screen mirroring selected by bit 4           | None      |

const MIRROR_SELECT: u8 = 0b1_0000;

#[derive(Debug, Clone)]
pub struct Mapper7 {
    initial_bank: u8,
    prg_bank: u8,
    mirroring: Mirroring,
}

impl Mapper7 {
    pub fn new(prg_chunks: usize) -> Self {
        let initial_bank = (prg_chunks / 2).saturating_sub(1) as u8;
        Self {
            initial_bank,
            prg_bank: initial_bank,
            mirroring: Mirroring::OneScreenLo,
        }
    }
}

impl Mapper for Mapper7 {
    fn mapper_id(&self) -> u16 {
        7
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("AxROM")
    }

    fn cpu_read(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        (addr >= cpu_mem::PRG_ROM_START).then(|| read_prg_32k(mem, usize::from(self.prg_bank), addr))
    }

    fn cpu_write(&mut self, _mem: &mut CartridgeMemory, addr: u16, data: u8) -> bool {
        if addr >= cpu_mem::PRG_ROM_START {
            self.prg_bank = data & 0x0F;
            self.mirroring = if data & MIRROR_SELECT != 0 {
                Mirroring::OneScreenHi
            } else {
                Mirroring::OneScreenLo
            };
            debug!(bank = self.prg_bank, mirroring = ?self.mirroring, "axrom select");
        }
        false
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn reset(&mut self) {
        self.prg_bank = self.initial_bank;
        self.mirroring = Mirroring::OneScreenLo;
    }
}

impl Savestate for Mapper7 {
    fn save(&self, w: &mut StateWriter) {
        w.u8(self.prg_bank);
        w.u8(self.mirroring.to_u8());
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.prg_bank = r.u8()? & 0x0F;
        self.mirroring = Mirroring::from_u8(r.u8()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mapper::test_support::banked_memory;

    #[test]
    fn boots_into_last_bank() {
        let mem = banked_memory(8, 1);
        let mapper = Mapper7::new(8);
        assert_eq!(mapper.cpu_read(&mem, 0x8000), Some(6));
        assert_eq!(mapper.cpu_read(&mem, 0xFFFF), Some(7));
    }

    #[test]
    fn write_selects_bank_and_screen() {
        let mut mem = banked_memory(8, 1);
        let mut mapper = Mapper7::new(8);
        mapper.cpu_write(&mut mem, 0x8000, 0x11);
        assert_eq!(mapper.cpu_read(&mem, 0x8000), Some(2));
        assert_eq!(mapper.mirroring(), Mirroring::OneScreenHi);

        mapper.reset();
        assert_eq!(mapper.cpu_read(&mem, 0x8000), Some(6));
        assert_eq!(mapper.mirroring(), Mirroring::OneScreenLo);
    }
}
