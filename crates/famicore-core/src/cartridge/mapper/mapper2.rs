use std::borrow::Cow;

use tracing::debug;

use crate::{
    cartridge::mapper::{CartridgeMemory, Mapper},
    error::Result,
    memory::cpu as cpu_mem,
    state::{Savestate, StateReader, StateWriter},
};

// Mapper 2 – UxROM simple 16 KiB PRG banking.
//
// | Area | Address range     | Behaviour                                  | IRQ/Audio |
// |------|-------------------|--------------------------------------------|-----------|
// | CPU  | `$8000-$BFFF`     | 16 KiB switchable PRG-ROM bank             | None      |
// | CPU  | `$C000-$FFFF`     | 16 KiB fixed PRG-ROM bank (last)           | None      |
// | PPU  | `$0000-$1FFF`     | CHR ROM/RAM (no mapper-side CHR banking)   | None      |
// | PPU  | `$2000-$3EFF`     | Mirroring from iNES header (no registers)  | None      |

const PRG_BANK_SIZE: usize = 16 * 1024;

/// CPU `$C000`: boundary between the switchable 16 KiB window (`$8000-$BFFF`)
/// and the fixed 16 KiB window mapped to the last PRG bank.
const UXROM_FIXED_WINDOW_START: u16 = 0xC000;

#[derive(Debug, Clone)]
pub struct Mapper2 {
    selected_bank: usize,
    bank_count: usize,
}

impl Mapper2 {
    pub fn new(prg_chunks: usize) -> Self {
        Self {
            selected_bank: 0,
            bank_count: prg_chunks.max(1),
        }
    }

    fn fixed_bank(&self) -> usize {
        self.bank_count - 1
    }
}

impl Mapper for Mapper2 {
    fn mapper_id(&self) -> u16 {
        2
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("UxROM")
    }

    fn cpu_read(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        if addr < cpu_mem::PRG_ROM_START {
            return None;
        }
        let bank = if addr < UXROM_FIXED_WINDOW_START {
            self.selected_bank
        } else {
            self.fixed_bank()
        };
        Some(mem.prg(bank * PRG_BANK_SIZE + usize::from(addr & 0x3FFF)))
    }

    fn cpu_write(&mut self, _mem: &mut CartridgeMemory, addr: u16, data: u8) -> bool {
        if addr >= cpu_mem::PRG_ROM_START {
            self.selected_bank = usize::from(data) % self.bank_count;
            debug!(bank = self.selected_bank, "uxrom prg bank");
        }
        false
    }

    fn reset(&mut self) {
        self.selected_bank = 0;
    }
}

impl Savestate for Mapper2 {
    fn save(&self, w: &mut StateWriter) {
        w.u8(self.selected_bank as u8);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.selected_bank = usize::from(r.u8()?) % self.bank_count;
        Ok(())
    }
}
