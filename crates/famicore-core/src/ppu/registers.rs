//! CPU-visible PPU register state and internal VRAM address latches.
//!
//! This module mirrors the `$2000-$2007` register set and the internal
//! `v/t/x/w` VRAM latches described on NESDev. The concrete bit layouts live
//! in submodules.

mod control;
mod mask;
mod status;
mod vram_addr;
mod vram_registers;

pub(crate) use control::Control;
pub(crate) use mask::Mask;
pub(crate) use status::Status;
pub(crate) use vram_addr::VramAddr;
pub(crate) use vram_registers::VramRegisters;

use crate::{
    error::Result,
    memory::ppu::OAM_RAM_SIZE,
    state::{Savestate, StateReader, StateWriter},
};

/// Aggregates the state of all CPU visible PPU registers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Registers {
    pub(crate) control: Control,
    pub(crate) mask: Mask,
    pub(crate) status: Status,
    /// Current OAM pointer driven by `$2003`/`$2004`.
    pub(crate) oam_addr: u8,
    /// Primary sprite memory: 64 entries of `y, tile, attributes, x`.
    pub(crate) oam: [u8; OAM_RAM_SIZE],
    pub(crate) vram: VramRegisters,
    /// Delayed `$2007` read buffer.
    pub(crate) vram_buffer: u8,
    /// Last value driven onto the register bus; unreadable bits echo it.
    pub(crate) open_bus: u8,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    pub(crate) fn new() -> Self {
        Self {
            control: Control::default(),
            mask: Mask::default(),
            status: Status::default(),
            oam_addr: 0,
            oam: [0; OAM_RAM_SIZE],
            vram: VramRegisters::default(),
            vram_buffer: 0,
            open_bus: 0,
        }
    }

    /// Reset button: clears control, mask and the shared write toggle.
    /// OAM, status and the VRAM address survive.
    pub(crate) fn reset(&mut self) {
        self.control = Control::empty();
        self.mask = Mask::empty();
        self.oam_addr = 0;
        self.vram.reset_latch();
    }

    /// Updates control, also syncing the nametable bits into `t`.
    pub(crate) fn write_control(&mut self, value: u8) {
        self.control = Control::from_bits_retain(value);
        self.vram.t.set_nametable(self.control.nametable_index());
    }

    /// `$2002` read: status bits over open bus; clears vblank and the write toggle.
    pub(crate) fn read_status(&mut self) -> u8 {
        let value = (self.open_bus & 0x1F) | self.status.bits();
        self.status.remove(Status::VERTICAL_BLANK);
        self.vram.reset_latch();
        value
    }

    pub(crate) fn write_oam_data(&mut self, value: u8) {
        self.oam[usize::from(self.oam_addr)] = value;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }
}

impl Savestate for Registers {
    fn save(&self, w: &mut StateWriter) {
        w.u8(self.control.bits());
        w.u8(self.mask.bits());
        w.u8(self.status.bits());
        w.u16(self.vram.v.raw());
        w.u16(self.vram.t.raw());
        w.u8(self.vram.x);
        w.bool(self.vram.w);
        w.u8(self.vram_buffer);
        w.u8(self.open_bus);
        w.u8(self.oam_addr);
        w.bytes(&self.oam);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.control = Control::from_bits_retain(r.u8()?);
        self.mask = Mask::from_bits_retain(r.u8()?);
        self.status = Status::from_bits_truncate(r.u8()?);
        self.vram.v.set_raw(r.u16()?);
        self.vram.t.set_raw(r.u16()?);
        self.vram.x = r.u8()? & 0b111;
        self.vram.w = r.bool()?;
        self.vram_buffer = r.u8()?;
        self.open_bus = r.u8()?;
        self.oam_addr = r.u8()?;
        r.bytes_into(&mut self.oam)?;
        Ok(())
    }
}
