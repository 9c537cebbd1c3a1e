use std::{fs, path::Path};

use tracing::info;

use crate::{
    cartridge::header::{CHR_CHUNK_SIZE, CHR_RAM_CHUNKS, Header, Mirroring, NES_HEADER_LEN},
    error::{Error, Result},
    state::{StateReader, StateWriter},
};

pub const TRAINER_SIZE: usize = 512;

pub mod header;
pub mod mapper;
pub use mapper::{CartridgeMemory, Mapper, Provider};

/// An inserted game pak: ROM and RAM images plus the board logic that maps them.
#[derive(Debug, Clone)]
pub struct Cartridge {
    name: String,
    header: Header,
    memory: CartridgeMemory,
    mapper: Box<dyn Mapper>,
}

impl Cartridge {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn mapper(&self) -> &dyn Mapper {
        self.mapper.as_ref()
    }

    pub fn mapper_mut(&mut self) -> &mut dyn Mapper {
        self.mapper.as_mut()
    }

    pub fn memory(&self) -> &CartridgeMemory {
        &self.memory
    }

    /// `None` means the address is not claimed by the board.
    pub fn cpu_read(&self, addr: u16) -> Option<u8> {
        self.mapper.cpu_read(&self.memory, addr)
    }

    /// Returns `true` when the board consumed the write exclusively.
    pub fn cpu_write(&mut self, addr: u16, data: u8) -> bool {
        self.mapper.cpu_write(&mut self.memory, addr, data)
    }

    pub fn ppu_read(&self, addr: u16) -> Option<u8> {
        self.mapper.ppu_read(&self.memory, addr)
    }

    pub fn ppu_write(&mut self, addr: u16, data: u8) -> bool {
        self.mapper.ppu_write(&mut self.memory, addr, data)
    }

    /// Nametable arrangement with `Hardwired` resolved from the header.
    pub fn mirroring(&self) -> Mirroring {
        match self.mapper.mirroring() {
            Mirroring::Hardwired => self.header.mirroring,
            other => other,
        }
    }

    pub fn irq_pending(&self) -> bool {
        self.mapper.irq_pending()
    }

    pub fn clear_irq(&mut self) {
        self.mapper.clear_irq();
    }

    pub fn count_scanline(&mut self) {
        self.mapper.count_scanline();
    }

    pub fn reset(&mut self) {
        self.mapper.reset();
    }

    pub fn sram(&self) -> &[u8] {
        &self.memory.sram
    }

    /// Replaces work RAM, truncating or zero-filling to the board's size.
    pub fn set_sram(&mut self, data: &[u8]) {
        let mut sram = data.to_vec();
        sram.resize(self.mapper.sram_size(), 0);
        self.memory.sram = sram;
    }

    pub(crate) fn save(&self, w: &mut StateWriter) {
        w.string(&self.name);
        w.bytes(self.header.as_bytes());
        w.blob(&self.memory.prg);
        w.blob(&self.memory.chr);
        w.u16(self.mapper.mapper_id());
        self.mapper.save(w);
        w.blob(&self.memory.sram);
    }

    /// Rebuilds a cartridge from a savestate. The board of `previous` is reused
    /// when it was built from the same header, so provider-supplied boards survive.
    pub(crate) fn restore(
        r: &mut StateReader<'_>,
        previous: Option<&Cartridge>,
        provider: Option<&dyn Provider>,
    ) -> Result<Self> {
        let name = r.string()?;
        let mut raw = [0u8; NES_HEADER_LEN];
        r.bytes_into(&mut raw)?;
        let header = Header::parse(&raw)?;
        let prg = r.blob()?.into_boxed_slice();
        let chr = r.blob()?.into_boxed_slice();
        let mapper_id = r.u16()?;

        let mut mapper = match previous {
            Some(cart) if cart.header == header && cart.mapper.mapper_id() == mapper_id => {
                dyn_clone::clone_box(&*cart.mapper)
            }
            _ => mapper::build_mapper(&header, provider)?,
        };
        if mapper.mapper_id() != mapper_id {
            return Err(Error::StateInvalid("mapper id"));
        }
        mapper.load(r)?;
        let sram = r.blob()?;

        Ok(Self {
            name,
            header,
            memory: CartridgeMemory { prg, chr, sram },
            mapper,
        })
    }
}

/// Load a cartridge from an in-memory byte slice.
pub fn load_cartridge(bytes: &[u8]) -> Result<Cartridge> {
    load_cartridge_with_provider(bytes, None)
}

/// Load a cartridge, consulting `provider` for boards the core lacks.
pub fn load_cartridge_with_provider(
    bytes: &[u8],
    provider: Option<&dyn Provider>,
) -> Result<Cartridge> {
    let header_bytes = bytes.get(..NES_HEADER_LEN).ok_or(Error::TooShort {
        actual: bytes.len(),
    })?;
    let header = Header::parse(header_bytes)?;
    let (prg, chr) = slice_sections(bytes, &header)?;
    let mapper = mapper::build_mapper(&header, provider)?;

    let mut cartridge = Cartridge {
        name: String::new(),
        header,
        memory: CartridgeMemory {
            prg,
            chr,
            sram: Vec::new(),
        },
        mapper,
    };
    cartridge.set_sram(&[]);

    info!(
        mapper = header.mapper,
        board = %cartridge.mapper.name(),
        prg_kib = header.prg_rom_size() / 1024,
        chr_kib = header.chr_size() / 1024,
        chr_ram = header.has_chr_ram(),
        battery = header.battery_backed_ram,
        "cartridge loaded"
    );
    Ok(cartridge)
}

/// Load a cartridge directly from disk, naming it after the file stem.
pub fn load_cartridge_from_file<P>(path: P) -> Result<Cartridge>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let mut cartridge = load_cartridge(&bytes)?;
    if let Some(stem) = path.file_stem() {
        cartridge.set_name(stem.to_string_lossy());
    }
    Ok(cartridge)
}

fn slice_sections(bytes: &[u8], header: &Header) -> Result<(Box<[u8]>, Box<[u8]>)> {
    let mut cursor = NES_HEADER_LEN;
    if header.trainer_present {
        section(bytes, &mut cursor, TRAINER_SIZE, "trainer")?;
    }

    let prg_rom = section(bytes, &mut cursor, header.prg_rom_size(), "PRG ROM")?;
    let chr = if header.has_chr_ram() {
        vec![0; CHR_RAM_CHUNKS * CHR_CHUNK_SIZE]
    } else {
        section(bytes, &mut cursor, header.chr_rom_size(), "CHR ROM")?.to_vec()
    };

    Ok((prg_rom.into(), chr.into_boxed_slice()))
}

fn section<'a>(
    bytes: &'a [u8],
    cursor: &mut usize,
    len: usize,
    name: &'static str,
) -> Result<&'a [u8]> {
    let too_short = || Error::SectionTooShort {
        section: name,
        expected: len,
        actual: bytes.len().saturating_sub(*cursor),
    };

    let end = cursor.checked_add(len).ok_or_else(too_short)?;
    let slice = bytes.get(*cursor..end).ok_or_else(too_short)?;
    *cursor = end;
    Ok(slice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::cpu as cpu_mem;

    fn base_header(prg_banks: u8, chr_banks: u8, flags6: u8) -> [u8; NES_HEADER_LEN] {
        [
            b'N', b'E', b'S', 0x1A, prg_banks, chr_banks, flags6, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ]
    }

    #[test]
    fn loads_basic_nrom_cartridge() {
        let mut rom = base_header(1, 1, 0).to_vec();
        rom.extend(vec![0xAA; 16 * 1024]);
        rom.extend(vec![0x55; 8 * 1024]);

        let cartridge = load_cartridge(&rom).expect("parse cartridge");

        assert_eq!(cartridge.header().prg_rom_size(), 16 * 1024);
        assert_eq!(cartridge.header().chr_rom_size(), 8 * 1024);
        assert_eq!(cartridge.cpu_read(cpu_mem::PRG_ROM_START), Some(0xAA));
        assert_eq!(cartridge.ppu_read(0x0000), Some(0x55));
        assert_eq!(cartridge.mirroring(), Mirroring::Horizontal);
    }

    #[test]
    fn skips_trainer_block() {
        let mut rom = base_header(1, 0, 0b0000_0100).to_vec();
        rom.extend(vec![0xFE; TRAINER_SIZE]);
        rom.extend(vec![0xAA; 16 * 1024]);

        let cartridge = load_cartridge(&rom).expect("parse cartridge");

        assert!(cartridge.header().trainer_present);
        assert_eq!(cartridge.cpu_read(cpu_mem::PRG_ROM_START), Some(0xAA));
    }

    #[test]
    fn chr_ram_defaults_to_four_chunks() {
        let mut rom = base_header(1, 0, 0).to_vec();
        rom.extend(vec![0; 16 * 1024]);

        let mut cartridge = load_cartridge(&rom).expect("parse cartridge");
        assert_eq!(cartridge.memory().chr.len(), CHR_RAM_CHUNKS * CHR_CHUNK_SIZE);
        assert!(cartridge.ppu_write(0x1234, 0x99));
        assert_eq!(cartridge.ppu_read(0x1234), Some(0x99));
    }

    #[test]
    fn errors_when_prg_section_missing() {
        let mut rom = base_header(1, 0, 0).to_vec();
        rom.extend(vec![0xAA; 1024]);

        let err = load_cartridge(&rom).expect_err("should fail");
        assert!(matches!(
            err,
            Error::SectionTooShort {
                section: "PRG ROM",
                expected: 16384,
                actual: 1024,
            }
        ));
    }

    #[test]
    fn rejects_unknown_mapper() {
        let mut rom = base_header(1, 1, 0xF0).to_vec();
        rom.extend(vec![0; 24 * 1024]);
        let err = load_cartridge(&rom).expect_err("mapper 15 is not built in");
        assert!(matches!(err, Error::UnsupportedMapper(15)));
    }

    #[derive(Debug)]
    struct NromFallback;

    impl Provider for NromFallback {
        fn get_mapper(&self, header: &Header) -> Option<Box<dyn Mapper>> {
            Some(Box::new(mapper::Mapper0::new(usize::from(header.prg_chunks))))
        }
    }

    #[test]
    fn provider_supplies_missing_boards() {
        let mut rom = base_header(1, 1, 0xF0).to_vec();
        rom.extend(vec![0x11; 24 * 1024]);
        let cartridge =
            load_cartridge_with_provider(&rom, Some(&NromFallback)).expect("provider board");
        assert_eq!(cartridge.cpu_read(0x8000), Some(0x11));
    }

    #[test]
    fn sram_is_sized_by_the_board() {
        let mut rom = base_header(2, 1, 0x12).to_vec();
        rom.extend(vec![0; 40 * 1024]);
        let mut cartridge = load_cartridge(&rom).expect("mmc1 cartridge");
        assert_eq!(cartridge.sram().len(), 8 * 1024);

        cartridge.set_sram(&[1, 2, 3]);
        assert_eq!(cartridge.sram().len(), 8 * 1024);
        assert_eq!(cartridge.cpu_read(0x6002), Some(3));
    }

    #[test]
    fn state_restores_onto_fresh_board() {
        let mut rom = base_header(4, 0, 0x20).to_vec();
        rom.extend((0..4u8).flat_map(|i| vec![i; 16 * 1024]));
        let mut cartridge = load_cartridge(&rom).expect("uxrom cartridge");
        cartridge.set_name("bank test");
        cartridge.cpu_write(0x8000, 2);

        let mut w = StateWriter::new();
        cartridge.save(&mut w);
        let bytes = w.into_bytes();

        let mut r = StateReader::new(&bytes);
        let restored = Cartridge::restore(&mut r, None, None).expect("restore");
        r.finish().expect("fully consumed");
        assert_eq!(restored.name(), "bank test");
        assert_eq!(restored.cpu_read(0x8000), Some(2));
    }

    #[test]
    fn state_reuses_the_previous_board() {
        let mut rom = base_header(1, 1, 0xF0).to_vec();
        rom.extend(vec![0x11; 24 * 1024]);
        let cartridge =
            load_cartridge_with_provider(&rom, Some(&NromFallback)).expect("provider board");

        let mut w = StateWriter::new();
        cartridge.save(&mut w);
        let bytes = w.into_bytes();

        // Without a provider the board can only come from the running cartridge.
        let mut r = StateReader::new(&bytes);
        let restored = Cartridge::restore(&mut r, Some(&cartridge), None).expect("restore");
        r.finish().expect("fully consumed");
        assert_eq!(restored.mapper().mapper_id(), cartridge.mapper().mapper_id());
        assert_eq!(restored.cpu_read(0x8000), Some(0x11));

        let mut r = StateReader::new(&bytes);
        assert!(matches!(
            Cartridge::restore(&mut r, None, None),
            Err(Error::UnsupportedMapper(15))
        ));
    }
}
