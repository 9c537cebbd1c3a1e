#![allow(dead_code)]

use anyhow::{Context, Result};
use famicore_core::Nes;

pub const PRG_CHUNK: usize = 0x4000;
pub const CHR_CHUNK: usize = 0x2000;

/// PRG offset of the shared interrupt handler (`$B000` in a 16 KiB image).
pub const HANDLER_OFFSET: usize = 0x3000;

/// Builds an iNES image in memory.
#[derive(Debug, Clone)]
pub struct RomBuilder {
    mapper: u8,
    flags6: u8,
    prg: Vec<u8>,
    chr: Vec<u8>,
}

impl RomBuilder {
    /// A 16 KiB NROM board with 8 KiB of blank CHR ROM. Every vector points at
    /// `$8000` until [`RomBuilder::program`] and friends say otherwise.
    pub fn nrom() -> Self {
        Self::with_sizes(0, 1, 1)
    }

    pub fn with_sizes(mapper: u8, prg_chunks: usize, chr_chunks: usize) -> Self {
        let mut builder = Self {
            mapper,
            flags6: 0,
            prg: vec![0xEA; prg_chunks * PRG_CHUNK],
            chr: vec![0; chr_chunks * CHR_CHUNK],
        };
        builder.vectors(0x8000, 0x8000, 0x8000);
        builder
    }

    pub fn flags6(mut self, flags6: u8) -> Self {
        self.flags6 = flags6;
        self
    }

    /// Places `code` at `$8000` (the start of the first PRG bank).
    pub fn program(self, code: &[u8]) -> Self {
        self.code_at(0x8000, code)
    }

    /// Places `code` at a CPU address inside the last PRG bank window.
    pub fn code_at(mut self, addr: u16, code: &[u8]) -> Self {
        let offset = self.prg_offset(addr);
        self.prg[offset..offset + code.len()].copy_from_slice(code);
        self
    }

    /// Installs `handler` at `$B000` and points NMI and IRQ at it.
    pub fn interrupt_handler(mut self, handler: &[u8]) -> Self {
        self.prg[HANDLER_OFFSET..HANDLER_OFFSET + handler.len()].copy_from_slice(handler);
        self.vectors(0xB000, 0x8000, 0xB000);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut rom = vec![
            b'N',
            b'E',
            b'S',
            0x1A,
            (self.prg.len() / PRG_CHUNK) as u8,
            (self.chr.len() / CHR_CHUNK) as u8,
            (self.mapper << 4) | self.flags6,
            self.mapper & 0xF0,
        ];
        rom.resize(16, 0);
        rom.extend_from_slice(&self.prg);
        rom.extend_from_slice(&self.chr);
        rom
    }

    fn vectors(&mut self, nmi: u16, reset: u16, irq: u16) {
        let end = self.prg.len();
        self.prg[end - 6..end - 4].copy_from_slice(&nmi.to_le_bytes());
        self.prg[end - 4..end - 2].copy_from_slice(&reset.to_le_bytes());
        self.prg[end - 2..].copy_from_slice(&irq.to_le_bytes());
    }

    /// `$8000-$BFFF` maps to the first chunk; `$C000-$FFFF` to the last one.
    fn prg_offset(&self, addr: u16) -> usize {
        let addr = usize::from(addr);
        if addr < 0xC000 {
            addr - 0x8000
        } else {
            self.prg.len() - PRG_CHUNK + (addr - 0xC000)
        }
    }
}

/// Powers on a console with the image inserted.
pub fn boot(rom: &[u8]) -> Result<Nes> {
    let mut nes = Nes::new();
    nes.load_rom(rom, None).context("loading test image")?;
    Ok(nes)
}

/// Master ticks from the current position until the next instruction begins.
pub fn ticks_to_next_instruction(nes: &mut Nes) -> u64 {
    let mut ticks = 0;
    loop {
        nes.clock();
        ticks += 1;
        if nes.cpu().instruction_complete() {
            break;
        }
    }
    loop {
        nes.clock();
        ticks += 1;
        if !nes.cpu().instruction_complete() {
            return ticks;
        }
    }
}

/// Master ticks until the PPU begins the next frame.
pub fn ticks_to_next_frame(nes: &mut Nes) -> u64 {
    let mut ticks = 1;
    while !nes.clock().frame_complete {
        ticks += 1;
    }
    ticks
}
