//! Cycle-level NES emulation core.
//!
//! [`Nes`] owns every chip of the console and advances them in lockstep from
//! a single master clock: the PPU and APU tick on every call to
//! [`Nes::clock`], the CPU (or the sprite DMA engine standing in for it) on
//! every third. Hosts feed controller state in and pull palette-indexed
//! frames and signed 16-bit audio out.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    apu::Apu,
    bus::{
        CpuBus,
        cpu::{OamDma, Ram},
    },
    cpu::Cpu,
    memory::{apu as apu_mem, cpu as cpu_mem},
    ppu::{Ppu, PpuBus},
    state::{Savestate, StateReader, StateWriter},
};

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod config;
pub mod controller;
pub mod cpu;
pub mod error;
pub mod memory;
pub mod palette;
pub mod ppu;
pub mod state;

pub use cartridge::{
    Cartridge, Mapper, Provider, load_cartridge, load_cartridge_from_file,
    load_cartridge_with_provider,
};
pub use config::{Config, MixingMode, VideoOptions};
pub use controller::{Button, Buttons, Controller};
pub use error::{Error, Result};
pub use ppu::FrameBuffer;

/// Leading bytes of every savestate produced by [`Nes::save_state`].
pub const STATE_MAGIC: &[u8; 4] = b"FMST";
/// Bumped whenever the savestate layout changes.
pub const STATE_VERSION: u32 = 1;

/// Master clock phases on which the CPU runs. The phase counter wraps at 6.
const CPU_PHASE_A: u8 = 3;
const CPU_PHASE_B: u8 = 6;

/// What happened during a single master clock tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClockResult {
    /// The PPU has just started a new frame.
    pub frame_complete: bool,
    /// The CPU ran a cycle (false on ticks without one and during DMA stalls).
    pub cpu_clocked: bool,
}

#[derive(Debug, Clone)]
pub struct Nes {
    config: Config,
    cpu: Cpu,
    ppu: Ppu,
    apu: Apu,
    ram: Ram,
    cartridge: Option<Cartridge>,
    provider: Option<Arc<dyn Provider>>,
    controllers: [Controller; 2],
    dma: OamDma,
    /// Last value written to bit 0 of `$4016`.
    strobe: u8,
    clock_phase: u8,
    power_off: FrameBuffer,
}

impl Default for Nes {
    fn default() -> Self {
        Self::new()
    }
}

impl Nes {
    /// An empty console with default options.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            cpu: Cpu::new(),
            ppu: Ppu::new(),
            apu: Apu::new(),
            ram: [0; cpu_mem::INTERNAL_RAM_SIZE],
            cartridge: None,
            provider: None,
            controllers: [Controller::new(); 2],
            dma: OamDma::default(),
            strobe: 0,
            clock_phase: 0,
            power_off: FrameBuffer::power_off_pattern(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Registers a source of boards the built-in registry does not cover.
    /// Consulted by [`Nes::load_rom`] and by savestate loads.
    pub fn set_provider(&mut self, provider: Option<Arc<dyn Provider>>) {
        self.provider = provider;
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn apu(&self) -> &Apu {
        &self.apu
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    /// Parses an iNES image and inserts it. Battery RAM from a previous
    /// session can be restored through `sram`.
    ///
    /// On error the console is left as it was.
    pub fn load_rom(&mut self, bytes: &[u8], sram: Option<&[u8]>) -> Result<()> {
        let mut cartridge = load_cartridge_with_provider(bytes, self.provider.as_deref())?;
        if let Some(sram) = sram {
            cartridge.set_sram(sram);
        }
        self.insert_cartridge(cartridge);
        Ok(())
    }

    /// Powers the console on with `cartridge` inserted. Work RAM is cleared
    /// and every chip starts from its power-up state.
    pub fn insert_cartridge(&mut self, mut cartridge: Cartridge) {
        info!(
            name = cartridge.name(),
            mapper = cartridge.mapper().mapper_id(),
            "cartridge inserted"
        );
        cartridge.reset();
        self.cartridge = Some(cartridge);
        self.power_cycle();

        let (cpu, mut bus) = self.split();
        cpu.power_on(&mut bus);
    }

    /// Removes the cartridge, returning it. The console stops clocking until
    /// another one is inserted.
    pub fn eject(&mut self) -> Option<Cartridge> {
        let cartridge = self.cartridge.take()?;
        info!(name = cartridge.name(), "cartridge ejected");
        self.power_cycle();
        Some(cartridge)
    }

    fn power_cycle(&mut self) {
        self.cpu = Cpu::new();
        self.ppu = Ppu::new();
        self.apu = Apu::new();
        self.apu.reset();
        self.ram.fill(0);
        self.dma = OamDma::default();
        self.strobe = 0;
        self.clock_phase = 0;
        for controller in &mut self.controllers {
            controller.set_shift_register(0);
        }
    }

    /// Presses the console reset button.
    pub fn reset(&mut self) {
        let Some(cartridge) = self.cartridge.as_mut() else {
            return;
        };
        cartridge.reset();
        {
            let (cpu, mut bus) = self.split();
            cpu.reset(&mut bus);
        }
        self.ppu.reset();
        self.apu.reset();
        info!("console reset");
    }

    /// Borrows the CPU alongside a bus over the rest of the machine.
    fn split(&mut self) -> (&mut Cpu, CpuBus<'_>) {
        let bus = CpuBus::new(
            &mut self.ram,
            &mut self.ppu,
            &mut self.apu,
            self.cartridge.as_mut(),
            &mut self.controllers,
            &mut self.dma,
            &mut self.strobe,
        );
        (&mut self.cpu, bus)
    }

    /// Advances the machine by one master clock tick (one PPU dot).
    /// Does nothing without a cartridge.
    pub fn clock(&mut self) -> ClockResult {
        if self.cartridge.is_none() {
            return ClockResult::default();
        }

        self.ppu.clock(
            &mut PpuBus::new(self.cartridge.as_mut()),
            &self.config.video,
        );
        self.apu.clock(&self.config);

        let mut cpu_clocked = false;
        if self.clock_phase == CPU_PHASE_A || self.clock_phase == CPU_PHASE_B {
            let odd_cycle = self.clock_phase == CPU_PHASE_A;
            if self.clock_phase == CPU_PHASE_B {
                self.clock_phase = 0;
            }
            let dma_active = self.dma.is_active();
            let (cpu, mut bus) = self.split();
            if dma_active {
                bus.clock_dma(odd_cycle);
            } else {
                cpu.clock(&mut bus);
                cpu_clocked = true;
            }
        }
        self.clock_phase += 1;

        if self.ppu.take_nmi() {
            self.cpu.request_nmi();
        }

        let mut irq = self.apu.irq_pending();
        if let Some(cartridge) = self.cartridge.as_mut()
            && cartridge.irq_pending()
        {
            cartridge.clear_irq();
            irq = true;
        }
        if irq {
            self.cpu.request_irq();
        }

        if self.strobe & 1 != 0 {
            for controller in &mut self.controllers {
                controller.latch();
            }
        }

        ClockResult {
            frame_complete: self.ppu.dot() == 1 && self.ppu.scanline() == 0,
            cpu_clocked,
        }
    }

    /// Runs until the current CPU instruction has finished and the next one
    /// has been fetched.
    pub fn clock_cpu_instruction(&mut self) {
        if self.cartridge.is_none() {
            return;
        }
        loop {
            self.clock();
            if self.cpu.instruction_complete() {
                break;
            }
        }
        loop {
            self.clock();
            if !self.cpu.instruction_complete() {
                break;
            }
        }
    }

    /// Runs until the PPU starts the next frame.
    pub fn clock_frame(&mut self) {
        if self.cartridge.is_none() {
            return;
        }
        while !self.clock().frame_complete {}
    }

    /// The last rendered frame as palette indices, or the power-off bands
    /// when no cartridge is inserted.
    pub fn screen_buffer(&self) -> &FrameBuffer {
        if self.cartridge.is_some() {
            self.ppu.frame()
        } else {
            &self.power_off
        }
    }

    /// [`Nes::screen_buffer`] converted to RGBA8 through the NTSC palette.
    pub fn frame_rgba(&self) -> Vec<u8> {
        palette::to_rgba(self.screen_buffer().pixels())
    }

    /// Drains the audio produced since the previous call.
    pub fn take_audio_samples(&mut self) -> Vec<i16> {
        self.apu.take_samples()
    }

    /// Sets every button of the pad on `port` (0 or 1). Other ports are ignored.
    pub fn set_controller(&mut self, port: usize, buttons: Buttons) {
        if let Some(controller) = self.controllers.get_mut(port) {
            controller.set_buttons(buttons);
        }
    }

    pub fn set_button(&mut self, port: usize, button: Button, pressed: bool) {
        if let Some(controller) = self.controllers.get_mut(port) {
            controller.set_button(button, pressed);
        }
    }

    pub fn controller(&self, port: usize) -> Option<&Controller> {
        self.controllers.get(port)
    }

    /// Battery RAM of the inserted cartridge (empty for boards without it).
    pub fn sram(&self) -> &[u8] {
        self.cartridge.as_ref().map_or(&[][..], Cartridge::sram)
    }

    pub fn cartridge_name(&self) -> Option<&str> {
        self.cartridge.as_ref().map(Cartridge::name)
    }

    /// Reads the CPU address space without triggering any register side
    /// effects (no status latch clear, no controller shift, no IRQ acknowledge).
    pub fn peek(&self, addr: u16) -> u8 {
        if let Some(value) = self.cartridge.as_ref().and_then(|cart| cart.cpu_read(addr)) {
            return value;
        }
        match addr {
            cpu_mem::INTERNAL_RAM_START..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram[usize::from(addr & cpu_mem::INTERNAL_RAM_MASK)]
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => self.ppu.peek(addr),
            apu_mem::STATUS => self.apu.peek_status(),
            cpu_mem::CONTROLLER_PORT_1 | cpu_mem::CONTROLLER_PORT_2 => {
                let port = usize::from(addr - cpu_mem::CONTROLLER_PORT_1);
                (self.controllers[port].shift_register() >> 7) | 0x40
            }
            _ => 0,
        }
    }

    /// Serializes the whole machine. Requires an inserted cartridge.
    pub fn save_state(&self) -> Result<Vec<u8>> {
        let cartridge = self.cartridge.as_ref().ok_or(Error::NoCartridge)?;

        let mut w = StateWriter::new();
        w.bytes(STATE_MAGIC);
        w.u32(STATE_VERSION);
        self.cpu.save(&mut w);
        cartridge.save(&mut w);
        self.ppu.save(&mut w);
        self.apu.save(&mut w);
        w.bytes(&self.ram);
        self.dma.save(&mut w);
        w.u8(self.strobe);
        for controller in &self.controllers {
            w.u8(controller.shift_register());
        }
        w.u8(self.clock_phase);
        Ok(w.into_bytes())
    }

    /// Restores a state produced by [`Nes::save_state`]. A rejected state
    /// leaves the running machine untouched.
    pub fn load_state(&mut self, data: &[u8]) -> Result<()> {
        match self.restore(data) {
            Ok(restored) => {
                *self = restored;
                info!(
                    name = self.cartridge_name().unwrap_or_default(),
                    "savestate loaded"
                );
                Ok(())
            }
            Err(err) => {
                warn!(%err, "savestate rejected, keeping current state");
                Err(err)
            }
        }
    }

    fn restore(&self, data: &[u8]) -> Result<Self> {
        let mut r = StateReader::new(data);
        let mut magic = [0u8; 4];
        r.bytes_into(&mut magic)?;
        if &magic != STATE_MAGIC {
            return Err(Error::StateInvalid("magic"));
        }
        if r.u32()? != STATE_VERSION {
            return Err(Error::StateInvalid("version"));
        }

        let mut next = self.clone();
        next.cpu.load(&mut r)?;
        next.cartridge = Some(Cartridge::restore(
            &mut r,
            self.cartridge.as_ref(),
            self.provider.as_deref(),
        )?);
        next.ppu.load(&mut r)?;
        next.apu.load(&mut r)?;
        r.bytes_into(&mut next.ram)?;
        next.dma.load(&mut r)?;
        next.strobe = r.u8()?;
        for controller in &mut next.controllers {
            controller.set_shift_register(r.u8()?);
        }
        next.clock_phase = r.u8()?;
        if next.clock_phase > CPU_PHASE_B {
            return Err(Error::StateInvalid("clock phase"));
        }
        r.finish()?;
        Ok(next)
    }
}
