use tracing::debug;

use crate::{
    apu::Apu,
    bus::Bus,
    cartridge::Cartridge,
    controller::Controller,
    error::Result,
    memory::{apu as apu_mem, cpu as cpu_mem, ppu as ppu_mem},
    ppu::{Ppu, PpuBus},
    state::{Savestate, StateReader, StateWriter},
};

/// Console work RAM (2 KiB, mirrored four times below `$2000`).
pub type Ram = [u8; cpu_mem::INTERNAL_RAM_SIZE];

/// Sprite DMA engine triggered by `$4014`.
///
/// After an alignment wait the engine alternates a read cycle and an OAM
/// write cycle until a full 256-byte page has been copied, stalling the CPU
/// for 513 or 514 cycles.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OamDma {
    page: u8,
    addr: u16,
    data: u8,
    ready: bool,
    active: bool,
}

impl OamDma {
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn start(&mut self, page: u8) {
        self.page = page;
        self.addr = u16::from(page) << 8;
        self.ready = false;
        self.active = true;
    }
}

impl Savestate for OamDma {
    fn save(&self, w: &mut StateWriter) {
        w.u8(self.page);
        w.u16(self.addr);
        w.u8(self.data);
        w.bool(self.ready);
        w.bool(self.active);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.page = r.u8()?;
        self.addr = r.u16()?;
        self.data = r.u8()?;
        self.ready = r.bool()?;
        self.active = r.bool()?;
        Ok(())
    }
}

/// CPU-visible bus that bridges the core to RAM, the PPU, the APU, and the
/// cartridge mapper space. It borrows the hardware from the owning console.
#[derive(Debug)]
pub struct CpuBus<'a> {
    ram: &'a mut Ram,
    ppu: &'a mut Ppu,
    apu: &'a mut Apu,
    cartridge: Option<&'a mut Cartridge>,
    controllers: &'a mut [Controller; 2],
    dma: &'a mut OamDma,
    strobe: &'a mut u8,
}

impl<'a> CpuBus<'a> {
    /// Creates a new bus by borrowing the attached hardware.
    pub(crate) fn new(
        ram: &'a mut Ram,
        ppu: &'a mut Ppu,
        apu: &'a mut Apu,
        cartridge: Option<&'a mut Cartridge>,
        controllers: &'a mut [Controller; 2],
        dma: &'a mut OamDma,
        strobe: &'a mut u8,
    ) -> Self {
        Self {
            ram,
            ppu,
            apu,
            cartridge,
            controllers,
            dma,
            strobe,
        }
    }

    /// Runs one DMA cycle in place of the CPU. `odd_cycle` is the CPU cycle parity.
    pub(crate) fn clock_dma(&mut self, odd_cycle: bool) {
        if !self.dma.ready {
            if odd_cycle {
                self.dma.ready = true;
            }
            return;
        }

        if odd_cycle {
            self.ppu.write_oam(self.dma.addr as u8, self.dma.data);
            self.dma.addr = self.dma.addr.wrapping_add(1);
            if self.dma.addr & 0xFF == 0 {
                self.dma.active = false;
                self.dma.ready = false;
            }
        } else {
            let addr = self.dma.addr;
            self.dma.data = self.read(addr);
        }
    }
}

impl Bus for CpuBus<'_> {
    fn read(&mut self, addr: u16) -> u8 {
        if let Some(value) = self.cartridge.as_deref().and_then(|cart| cart.cpu_read(addr)) {
            return value;
        }

        match addr {
            cpu_mem::INTERNAL_RAM_START..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram[usize::from(addr & cpu_mem::INTERNAL_RAM_MASK)]
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => {
                let mut ppu_bus = PpuBus::new(self.cartridge.as_deref_mut());
                self.ppu.cpu_read(addr, &mut ppu_bus)
            }
            apu_mem::STATUS => self.apu.cpu_read(addr),
            cpu_mem::CONTROLLER_PORT_1 | cpu_mem::CONTROLLER_PORT_2 => {
                let port = usize::from(addr - cpu_mem::CONTROLLER_PORT_1);
                self.controllers[port].read() | 0x40
            }
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        if let Some(cart) = self.cartridge.as_deref_mut()
            && cart.cpu_write(addr, data)
        {
            return;
        }

        match addr {
            cpu_mem::INTERNAL_RAM_START..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram[usize::from(addr & cpu_mem::INTERNAL_RAM_MASK)] = data;
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => {
                let mut ppu_bus = PpuBus::new(self.cartridge.as_deref_mut());
                self.ppu.cpu_write(addr, data, &mut ppu_bus);
            }
            ppu_mem::OAM_DMA => {
                debug!(page = data, "oam dma");
                self.dma.start(data);
            }
            cpu_mem::CONTROLLER_PORT_1 => *self.strobe = data & 1,
            cpu_mem::APU_REGISTER_BASE..=cpu_mem::APU_REGISTER_END
            | apu_mem::STATUS
            | apu_mem::FRAME_COUNTER => self.apu.cpu_write(addr, data),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Hardware {
        ram: Ram,
        ppu: Ppu,
        apu: Apu,
        controllers: [Controller; 2],
        dma: OamDma,
        strobe: u8,
    }

    impl Hardware {
        fn new() -> Self {
            Self {
                ram: [0; cpu_mem::INTERNAL_RAM_SIZE],
                ppu: Ppu::new(),
                apu: Apu::new(),
                controllers: [Controller::new(); 2],
                dma: OamDma::default(),
                strobe: 0,
            }
        }

        fn bus(&mut self) -> CpuBus<'_> {
            CpuBus::new(
                &mut self.ram,
                &mut self.ppu,
                &mut self.apu,
                None,
                &mut self.controllers,
                &mut self.dma,
                &mut self.strobe,
            )
        }
    }

    #[test]
    fn ram_is_mirrored_four_times() {
        let mut hw = Hardware::new();
        let mut bus = hw.bus();
        bus.write(0x0001, 0x5A);
        assert_eq!(bus.read(0x0801), 0x5A);
        assert_eq!(bus.read(0x1801), 0x5A);
        bus.write(0x1FFF, 0x11);
        assert_eq!(bus.read(0x07FF), 0x11);
    }

    #[test]
    fn ppu_registers_repeat_every_eight_bytes() {
        let mut hw = Hardware::new();
        let mut bus = hw.bus();
        bus.write(0x3FFB, 0x20);
        bus.write(0x2004, 0x99);
        bus.write(0x2003, 0x20);
        assert_eq!(bus.read(0x200C), 0x99);
    }

    #[test]
    fn controller_reads_carry_open_bus_bit() {
        let mut hw = Hardware::new();
        hw.controllers[1].set_buttons(crate::controller::Buttons::A);
        hw.controllers[1].latch();
        let mut bus = hw.bus();
        assert_eq!(bus.read(0x4017), 0x41);
        assert_eq!(bus.read(0x4017), 0x40);
    }

    #[test]
    fn strobe_write_keeps_low_bit() {
        let mut hw = Hardware::new();
        hw.bus().write(0x4016, 0xFF);
        assert_eq!(hw.strobe, 1);
    }

    #[test]
    fn unmapped_reads_are_zero() {
        let mut hw = Hardware::new();
        let mut bus = hw.bus();
        assert_eq!(bus.read(0x5000), 0);
        assert_eq!(bus.read(0x8000), 0);
    }

    #[test]
    fn dma_copies_a_page_into_oam() {
        let mut hw = Hardware::new();
        for i in 0..0x100 {
            hw.ram[0x200 + i] = i as u8;
        }
        let mut bus = hw.bus();
        bus.write(0x4014, 0x02);

        let mut cycles = 0;
        let mut odd = false;
        while bus.dma.is_active() {
            bus.clock_dma(odd);
            odd = !odd;
            cycles += 1;
        }
        assert!(cycles == 513 || cycles == 514, "{cycles}");
        drop(bus);
        assert_eq!(hw.ppu.oam()[0x00], 0x00);
        assert_eq!(hw.ppu.oam()[0xFF], 0xFF);
    }
}
