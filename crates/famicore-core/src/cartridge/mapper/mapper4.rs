use std::borrow::Cow;

use tracing::{debug, trace};

use crate::{
    cartridge::{
        header::Mirroring,
        mapper::{CartridgeMemory, Mapper},
    },
    error::Result,
    memory::cpu as cpu_mem,
    state::{Savestate, StateReader, StateWriter},
};

// Mapper 4 – MMC3 (TxROM) 8 KiB PRG / 1-2 KiB CHR banking with scanline IRQ.
//
// | Area | Address range     | Behaviour                                           | IRQ/Audio       |
// |------|-------------------|-----------------------------------------------------|-----------------|
// | CPU  | `$6000-$7FFF`     | 8 KiB battery-backed work RAM                       | None            |
// | CPU  | `$8000-$9FFF`     | Bank select (even) / bank data (odd)                | None            |
// | CPU  | `$A000-$BFFF`     | Mirroring (even)                                    | None            |
// | CPU  | `$C000-$DFFF`     | IRQ latch (even) / IRQ reload (odd)                 | Scanline IRQ    |
// | CPU  | `$E000-$FFFF`     | IRQ disable + acknowledge (even) / IRQ enable (odd) | Scanline IRQ    |
// | CPU  | `$8000-$FFFF`     | Four 8 KiB PRG windows, two switchable              | None            |
// | PPU  | `$0000-$1FFF`     | Two 2 KiB + four 1 KiB CHR windows, swappable halves| None            |

const PRG_BANK_SIZE_8K: usize = 8 * 1024;
const CHR_BANK_SIZE_1K: usize = 1024;
const SRAM_SIZE: usize = 8 * 1024;

const BANK_SELECT_REGISTER: u8 = 0b0000_0111;
const BANK_SELECT_PRG_MODE: u8 = 0b0100_0000;
const BANK_SELECT_CHR_INVERT: u8 = 0b1000_0000;

#[derive(Debug, Clone)]
pub struct Mapper4 {
    /// Index of the last 8 KiB PRG bank.
    last_bank: usize,

    bank_select: u8,
    /// R0-R7 bank data registers.
    bank_regs: [u8; 8],
    mirroring: Mirroring,

    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_enabled: bool,
    irq_pending: bool,
}

impl Mapper4 {
    pub fn new(prg_chunks: usize) -> Self {
        let mut mapper = Self {
            last_bank: (prg_chunks * 2).max(2) - 1,
            bank_select: 0,
            bank_regs: [0; 8],
            mirroring: Mirroring::Hardwired,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
            irq_pending: false,
        };
        mapper.reset();
        mapper
    }

    fn prg_offset(&self, addr: u16) -> usize {
        let swap = self.bank_select & BANK_SELECT_PRG_MODE != 0;
        let second_last = self.last_bank - 1;
        let bank = match addr {
            0x8000..=0x9FFF if swap => second_last,
            0x8000..=0x9FFF => usize::from(self.bank_regs[6]),
            0xA000..=0xBFFF => usize::from(self.bank_regs[7]),
            0xC000..=0xDFFF if swap => usize::from(self.bank_regs[6]),
            0xC000..=0xDFFF => second_last,
            _ => self.last_bank,
        };
        (bank % (self.last_bank + 1)) * PRG_BANK_SIZE_8K + usize::from(addr & 0x1FFF)
    }

    /// Bank numbers wrap at the size of CHR ROM/RAM.
    fn chr_offset(&self, mem: &CartridgeMemory, addr: u16) -> usize {
        let banks = (mem.chr.len() / CHR_BANK_SIZE_1K).max(1);
        // Inverting swaps the 2 KiB and 1 KiB halves of the pattern space.
        let addr = if self.bank_select & BANK_SELECT_CHR_INVERT != 0 {
            addr ^ 0x1000
        } else {
            addr
        };
        if addr < 0x1000 {
            let reg = usize::from(addr >= 0x0800);
            let bank = usize::from(self.bank_regs[reg]) % banks;
            bank * CHR_BANK_SIZE_1K + usize::from(addr & 0x07FF)
        } else {
            let reg = usize::from((addr - 0x1000) / 0x0400) + 2;
            let bank = usize::from(self.bank_regs[reg]) % banks;
            bank * CHR_BANK_SIZE_1K + usize::from(addr & 0x03FF)
        }
    }

    fn write_register(&mut self, addr: u16, data: u8) {
        let even = addr & 1 == 0;
        match (addr, even) {
            (0x8000..=0x9FFF, true) => self.bank_select = data,
            (0x8000..=0x9FFF, false) => {
                let reg = usize::from(self.bank_select & BANK_SELECT_REGISTER);
                self.bank_regs[reg] = match reg {
                    0 | 1 => data & 0xFE,
                    6 | 7 => data & 0x3F,
                    _ => data,
                };
                debug!(reg, bank = self.bank_regs[reg], "mmc3 bank data");
            }
            (0xA000..=0xBFFF, true) => {
                self.mirroring = if data & 1 != 0 {
                    Mirroring::Horizontal
                } else {
                    Mirroring::Vertical
                };
            }
            // PRG-RAM protect is not modelled.
            (0xA000..=0xBFFF, false) => {}
            (0xC000..=0xDFFF, true) => self.irq_latch = data,
            (0xC000..=0xDFFF, false) => self.irq_reload = true,
            (_, true) => {
                self.irq_enabled = false;
                self.irq_pending = false;
            }
            (_, false) => self.irq_enabled = true,
        }
    }
}

impl Mapper for Mapper4 {
    fn mapper_id(&self) -> u16 {
        4
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("MMC3")
    }

    fn cpu_read(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => {
                Some(mem.sram(usize::from(addr - cpu_mem::PRG_RAM_START)))
            }
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => Some(mem.prg(self.prg_offset(addr))),
            _ => None,
        }
    }

    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, data: u8) -> bool {
        match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => {
                mem.set_sram(usize::from(addr - cpu_mem::PRG_RAM_START), data);
                true
            }
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => {
                self.write_register(addr, data);
                false
            }
            _ => false,
        }
    }

    fn ppu_read(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        (addr < 0x2000).then(|| mem.chr(self.chr_offset(mem, addr)))
    }

    fn ppu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, data: u8) -> bool {
        if addr >= 0x2000 {
            return false;
        }
        let offset = self.chr_offset(mem, addr);
        mem.set_chr(offset, data);
        true
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    fn clear_irq(&mut self) {
        self.irq_pending = false;
    }

    fn count_scanline(&mut self) {
        if self.irq_reload || self.irq_counter == 0 {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            trace!("mmc3 irq");
            self.irq_pending = true;
        }
    }

    fn reset(&mut self) {
        self.bank_select = 0;
        self.bank_regs = [0; 8];
        self.mirroring = Mirroring::Hardwired;
        self.irq_latch = 0;
        self.irq_counter = 0;
        self.irq_reload = false;
        self.irq_enabled = false;
        self.irq_pending = false;
    }

    fn sram_size(&self) -> usize {
        SRAM_SIZE
    }
}

impl Savestate for Mapper4 {
    fn save(&self, w: &mut StateWriter) {
        w.u8(self.bank_select);
        w.bytes(&self.bank_regs);
        w.u8(self.mirroring.to_u8());
        w.u8(self.irq_latch);
        w.u8(self.irq_counter);
        w.bool(self.irq_reload);
        w.bool(self.irq_enabled);
        w.bool(self.irq_pending);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.bank_select = r.u8()?;
        r.bytes_into(&mut self.bank_regs)?;
        self.mirroring = Mirroring::from_u8(r.u8()?)?;
        self.irq_latch = r.u8()?;
        self.irq_counter = r.u8()?;
        self.irq_reload = r.bool()?;
        self.irq_enabled = r.bool()?;
        self.irq_pending = r.bool()?;
        Ok(())
    }
}
