use crate::cartridge::{Cartridge, header::Mirroring};

/// Temporary view that lets the PPU reach the cartridge without storing a raw pointer.
///
/// The console creates one of these per PPU call, so lifetimes remain explicit and borrow-checked.
#[derive(Debug, Default)]
pub struct PpuBus<'a> {
    cartridge: Option<&'a mut Cartridge>,
}

impl<'a> PpuBus<'a> {
    pub fn new(cartridge: Option<&'a mut Cartridge>) -> Self {
        Self { cartridge }
    }

    /// `None` when no cartridge is inserted or the board leaves the address alone.
    pub fn read(&self, addr: u16) -> Option<u8> {
        self.cartridge.as_deref().and_then(|cart| cart.ppu_read(addr))
    }

    pub fn write(&mut self, addr: u16, value: u8) -> bool {
        self.cartridge
            .as_deref_mut()
            .is_some_and(|cart| cart.ppu_write(addr, value))
    }

    /// Effective nametable arrangement; horizontal with no cartridge.
    pub fn mirroring(&self) -> Mirroring {
        self.cartridge
            .as_deref()
            .map_or(Mirroring::Horizontal, Cartridge::mirroring)
    }

    /// Scanline tick for boards with a scanline counter.
    pub fn count_scanline(&mut self) {
        if let Some(cart) = self.cartridge.as_deref_mut() {
            cart.count_scanline();
        }
    }
}
