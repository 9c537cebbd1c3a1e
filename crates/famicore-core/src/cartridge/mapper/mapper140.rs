use std::borrow::Cow;

use crate::{
    cartridge::mapper::{CartridgeMemory, Mapper, Mapper66},
    error::Result,
    memory::cpu as cpu_mem,
    state::{Savestate, StateReader, StateWriter},
};

// Mapper 140 – Jaleco JF-11/JF-14, GxROM banking with the latch at `$6000`.
//
// | Area | Address range     | Behaviour                                        | IRQ/Audio |
// |------|-------------------|--------------------------------------------------|-----------|
// | CPU  | `$6000-$7FFF`     | Bank latch: PRG bits 4-5, CHR bits 0-1           | None      |
// | CPU  | `$8000-$FFFF`     | 32 KiB PRG-ROM bank                              | None      |
// | PPU  | `$0000-$1FFF`     | 8 KiB CHR-ROM bank                               | None      |

#[derive(Debug, Clone)]
pub struct Mapper140 {
    banks: Mapper66,
    initial_bank: u8,
}

impl Mapper140 {
    pub fn new(prg_chunks: usize) -> Self {
        let mut mapper = Self {
            banks: Mapper66::new(),
            initial_bank: (prg_chunks / 2).saturating_sub(1) as u8,
        };
        mapper.reset();
        mapper
    }
}

impl Mapper for Mapper140 {
    fn mapper_id(&self) -> u16 {
        140
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("Jaleco JF-11")
    }

    fn cpu_read(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        self.banks.read_prg(mem, addr)
    }

    fn cpu_write(&mut self, _mem: &mut CartridgeMemory, addr: u16, data: u8) -> bool {
        if (cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END).contains(&addr) {
            self.banks.latch(data);
        }
        false
    }

    fn ppu_read(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        self.banks.read_chr(mem, addr)
    }

    fn ppu_write(&mut self, _mem: &mut CartridgeMemory, _addr: u16, _data: u8) -> bool {
        false
    }

    fn reset(&mut self) {
        self.banks.set_prg_bank(self.initial_bank);
    }
}

impl Savestate for Mapper140 {
    fn save(&self, w: &mut StateWriter) {
        self.banks.save(w);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.banks.load(r)
    }
}
