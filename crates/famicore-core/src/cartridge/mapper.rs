use std::{borrow::Cow, fmt::Debug};

use dyn_clone::DynClone;
use tracing::warn;

use crate::{
    cartridge::header::{Header, Mirroring},
    error::{Error, Result},
    state::Savestate,
};

pub mod mapper0;
pub mod mapper1;
pub mod mapper140;
pub mod mapper2;
pub mod mapper3;
pub mod mapper4;
pub mod mapper66;
pub mod mapper7;

pub use mapper0::Mapper0;
pub use mapper1::Mapper1;
pub use mapper2::Mapper2;
pub use mapper3::Mapper3;
pub use mapper4::Mapper4;
pub use mapper7::Mapper7;
pub use mapper66::Mapper66;
pub use mapper140::Mapper140;

/// Byte stores owned by the cartridge. Mappers translate addresses into
/// offsets here; out-of-range offsets read as `0` and drop writes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartridgeMemory {
    pub prg: Box<[u8]>,
    pub chr: Box<[u8]>,
    /// Battery-backed work RAM at `$6000-$7FFF`, sized by the mapper.
    pub sram: Vec<u8>,
}

impl CartridgeMemory {
    pub fn prg(&self, offset: usize) -> u8 {
        self.prg.get(offset).copied().unwrap_or(0)
    }

    pub fn chr(&self, offset: usize) -> u8 {
        self.chr.get(offset).copied().unwrap_or(0)
    }

    pub fn set_chr(&mut self, offset: usize, data: u8) {
        if let Some(slot) = self.chr.get_mut(offset) {
            *slot = data;
        }
    }

    pub fn sram(&self, offset: usize) -> u8 {
        self.sram.get(offset).copied().unwrap_or(0)
    }

    pub fn set_sram(&mut self, offset: usize, data: u8) {
        if let Some(slot) = self.sram.get_mut(offset) {
            *slot = data;
        }
    }
}

/// Cartridge board logic: address translation, bank switching, mirroring
/// control and the optional scanline IRQ.
///
/// Every access method returns whether the board claimed the address;
/// unclaimed accesses fall through to the console's own devices.
pub trait Mapper: DynClone + Debug + Send + Savestate {
    fn mapper_id(&self) -> u16;

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("Unknown")
    }

    fn cpu_read(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8>;

    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, data: u8) -> bool;

    /// Pattern table reads, unbanked by default.
    fn ppu_read(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        (addr < 0x2000).then(|| mem.chr(usize::from(addr)))
    }

    fn ppu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, data: u8) -> bool {
        if addr < 0x2000 {
            mem.set_chr(usize::from(addr), data);
            true
        } else {
            false
        }
    }

    fn mirroring(&self) -> Mirroring {
        Mirroring::Hardwired
    }

    fn irq_pending(&self) -> bool {
        false
    }

    fn clear_irq(&mut self) {}

    /// Called once per rendered scanline (dot 260) while rendering is on.
    fn count_scanline(&mut self) {}

    /// Console reset button.
    fn reset(&mut self) {}

    /// Work RAM the board exposes at `$6000-$7FFF`.
    fn sram_size(&self) -> usize {
        0
    }
}

dyn_clone::clone_trait_object!(Mapper);

/// Source of user-provided mappers when the core does not implement a board.
///
/// `Provider` is consulted only when the requested mapper ID is unknown to the
/// built-in registry. Returning `None` defers to the core's default
/// `UnsupportedMapper` error.
pub trait Provider: Debug + Send {
    fn get_mapper(&self, header: &Header) -> Option<Box<dyn Mapper>>;
}

/// Instantiates the board named by the header.
pub fn build_mapper(header: &Header, provider: Option<&dyn Provider>) -> Result<Box<dyn Mapper>> {
    let prg_chunks = usize::from(header.prg_chunks);
    let mapper: Box<dyn Mapper> = match header.mapper {
        0 => Box::new(Mapper0::new(prg_chunks)),
        1 => Box::new(Mapper1::new(prg_chunks)),
        2 => Box::new(Mapper2::new(prg_chunks)),
        3 => Box::new(Mapper3::new(prg_chunks)),
        4 => Box::new(Mapper4::new(prg_chunks)),
        7 => Box::new(Mapper7::new(prg_chunks)),
        66 => Box::new(Mapper66::new()),
        140 => Box::new(Mapper140::new(prg_chunks)),
        id => match provider.and_then(|p| p.get_mapper(header)) {
            Some(mapper) => mapper,
            None => {
                warn!(mapper = id, "unsupported mapper");
                return Err(Error::UnsupportedMapper(id));
            }
        },
    };
    Ok(mapper)
}

/// Read from a 32 KiB-banked PRG window (`$8000-$FFFF`).
pub(crate) fn read_prg_32k(mem: &CartridgeMemory, bank: usize, addr: u16) -> u8 {
    mem.prg(bank * 0x8000 + usize::from(addr & 0x7FFF))
}

/// Read through an 8 KiB-banked CHR window.
pub(crate) fn read_chr_8k(mem: &CartridgeMemory, bank: usize, addr: u16) -> Option<u8> {
    let offset = bank * 0x2000 + usize::from(addr & 0x1FFF);
    (addr < 0x2000 && offset < mem.chr.len()).then(|| mem.chr[offset])
}
