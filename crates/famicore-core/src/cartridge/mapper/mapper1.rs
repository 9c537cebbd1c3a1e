use std::borrow::Cow;

use tracing::debug;

use crate::{
    cartridge::{
        header::Mirroring,
        mapper::{CartridgeMemory, Mapper},
    },
    error::Result,
    memory::cpu as cpu_mem,
    state::{Savestate, StateReader, StateWriter},
};

// Mapper 1 – MMC1 (SxROM) serial-loaded banking.
//
// | Area | Address range     | Behaviour                                        | IRQ/Audio |
// |------|-------------------|--------------------------------------------------|-----------|
// | CPU  | `$6000-$7FFF`     | 8 KiB battery-backed work RAM                    | None      |
// | CPU  | `$8000-$FFFF`     | 32 KiB or 16 KiB+16 KiB PRG banking (5-bit load) | None      |
// | PPU  | `$0000-$1FFF`     | 8 KiB or 4 KiB+4 KiB CHR banking                 | None      |
// | PPU  | `$2000-$3EFF`     | One-screen / vertical / horizontal via control   | None      |

const PRG_BANK_SIZE_16K: usize = 16 * 1024;
const CHR_BANK_SIZE_4K: usize = 4 * 1024;
const SRAM_SIZE: usize = 8 * 1024;

/// Shift register value after a reset; the marker bit reaches bit 0 after four writes.
const SHIFT_RESET: u8 = 0b1_0000;

#[derive(Debug, Clone)]
pub struct Mapper1 {
    prg_bank_count: usize,

    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,

    shift_reg: u8,
}

impl Mapper1 {
    pub fn new(prg_chunks: usize) -> Self {
        let mut mapper = Self {
            prg_bank_count: prg_chunks.max(1),
            control: 0,
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,
            shift_reg: SHIFT_RESET,
        };
        mapper.reset();
        mapper
    }

    fn prg_mode(&self) -> u8 {
        (self.control >> 2) & 0b11
    }

    fn chr_4k_mode(&self) -> bool {
        self.control & 0b1_0000 != 0
    }

    fn prg_offset(&self, addr: u16) -> usize {
        let bank = usize::from(self.prg_bank & 0x0F);
        let (bank, offset) = match self.prg_mode() {
            0 | 1 => (bank & !1, usize::from(addr & 0x7FFF)),
            2 if addr < 0xC000 => (0, usize::from(addr & 0x3FFF)),
            2 => (bank, usize::from(addr & 0x3FFF)),
            _ if addr >= 0xC000 => (self.prg_bank_count - 1, usize::from(addr & 0x3FFF)),
            _ => (bank, usize::from(addr & 0x3FFF)),
        };
        bank * PRG_BANK_SIZE_16K + offset
    }

    fn chr_offset(&self, addr: u16) -> usize {
        if self.chr_4k_mode() {
            let bank = if addr < 0x1000 {
                self.chr_bank0
            } else {
                self.chr_bank1
            };
            usize::from(bank) * CHR_BANK_SIZE_4K + usize::from(addr & 0x0FFF)
        } else {
            usize::from(self.chr_bank0 & !1) * CHR_BANK_SIZE_4K + usize::from(addr & 0x1FFF)
        }
    }

    fn write_register(&mut self, addr: u16, value: u8) {
        match (addr - cpu_mem::PRG_ROM_START) / 0x2000 {
            0 => {
                self.control = value;
                debug!(mirroring = ?self.mirroring(), prg_mode = self.prg_mode(), "mmc1 control");
            }
            1 => self.chr_bank0 = value,
            2 => self.chr_bank1 = value,
            _ => self.prg_bank = value,
        }
    }
}

impl Mapper for Mapper1 {
    fn mapper_id(&self) -> u16 {
        1
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("MMC1")
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
                if data & 0x80 != 0 {
                    self.reset();
                } else {
                    let filled = self.shift_reg & 1 != 0;
                    self.shift_reg = ((self.shift_reg >> 1) | ((data & 1) << 4)) & 0b1_1111;
                    if filled {
                        self.write_register(addr, self.shift_reg);
                        self.shift_reg = SHIFT_RESET;
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn ppu_read(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        (addr < 0x2000).then(|| mem.chr(self.chr_offset(addr)))
    }

    fn ppu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, data: u8) -> bool {
        if addr >= 0x2000 {
            return false;
        }
        mem.set_chr(self.chr_offset(addr), data);
        true
    }

    fn mirroring(&self) -> Mirroring {
        match self.control & 0b11 {
            0 => Mirroring::OneScreenLo,
            1 => Mirroring::OneScreenHi,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }

    /// Clears the shift register and restores PRG mode 3 (fixed high bank).
    fn reset(&mut self) {
        self.shift_reg = SHIFT_RESET;
        self.control |= 0b1100;
    }

    fn sram_size(&self) -> usize {
        SRAM_SIZE
    }
}

impl Savestate for Mapper1 {
    fn save(&self, w: &mut StateWriter) {
        w.u8(self.shift_reg);
        w.u8(self.chr_bank0);
        w.u8(self.chr_bank1);
        w.u8(self.prg_bank);
        w.u8(self.control);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.shift_reg = r.u8()? & 0b1_1111;
        self.chr_bank0 = r.u8()?;
        self.chr_bank1 = r.u8()?;
        self.prg_bank = r.u8()?;
        self.control = r.u8()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mapper::test_support::banked_memory;

    fn serial_write(mapper: &mut Mapper1, mem: &mut CartridgeMemory, addr: u16, value: u8) {
        for bit in 0..5 {
            mapper.cpu_write(mem, addr, (value >> bit) & 1);
        }
    }

    #[test]
    fn power_on_fixes_last_bank_high() {
        let mem = banked_memory(8, 1);
        let mapper = Mapper1::new(8);
        assert_eq!(mapper.cpu_read(&mem, 0x8000), Some(0));
        assert_eq!(mapper.cpu_read(&mem, 0xC000), Some(7));
    }

    #[test]
    fn five_writes_load_prg_bank() {
        let mut mem = banked_memory(8, 1);
        let mut mapper = Mapper1::new(8);
        serial_write(&mut mapper, &mut mem, 0xE000, 0x05);
        assert_eq!(mapper.cpu_read(&mem, 0x8000), Some(5));
        assert_eq!(mapper.cpu_read(&mem, 0xC000), Some(7));
    }

    #[test]
    fn reset_bit_discards_partial_load() {
        let mut mem = banked_memory(8, 1);
        let mut mapper = Mapper1::new(8);
        mapper.cpu_write(&mut mem, 0xE000, 1);
        mapper.cpu_write(&mut mem, 0xE000, 1);
        mapper.cpu_write(&mut mem, 0xE000, 0x80);
        assert_eq!(mapper.shift_reg, SHIFT_RESET);
    }

    #[test]
    fn control_selects_mirroring() {
        let mut mem = banked_memory(2, 1);
        let mut mapper = Mapper1::new(2);
        serial_write(&mut mapper, &mut mem, 0x8000, 0b0_1110);
        assert_eq!(mapper.mirroring(), Mirroring::Vertical);
        serial_write(&mut mapper, &mut mem, 0x8000, 0b0_1101);
        assert_eq!(mapper.mirroring(), Mirroring::OneScreenHi);
    }

    #[test]
    fn chr_4k_banks_switch_independently() {
        let mut mem = banked_memory(2, 4);
        let mut mapper = Mapper1::new(2);
        serial_write(&mut mapper, &mut mem, 0x8000, 0b1_1100);
        serial_write(&mut mapper, &mut mem, 0xA000, 3);
        serial_write(&mut mapper, &mut mem, 0xC000, 4);
        // 4 KiB bank 3 is the upper half of 8 KiB bank 1.
        assert_eq!(mapper.ppu_read(&mem, 0x0000), Some(0x81));
        assert_eq!(mapper.ppu_read(&mem, 0x1000), Some(0x82));
    }

    #[test]
    fn work_ram_is_claimed() {
        let mut mem = banked_memory(2, 1);
        mem.sram = vec![0; SRAM_SIZE];
        let mut mapper = Mapper1::new(2);
        assert!(mapper.cpu_write(&mut mem, 0x6001, 0x5A));
        assert_eq!(mapper.cpu_read(&mem, 0x6001), Some(0x5A));
    }
}
