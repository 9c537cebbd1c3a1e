//! iNES header parsing.
//!
//! The first 16 bytes of every `.nes` ROM describe how much PRG/CHR data
//! follows, which mapper board is required, and a few compatibility flags.
//! Only the original iNES layout is understood; NES 2.0 extensions are read as
//! plain iNES.

use bitflags::bitflags;

use crate::error::{Error, Result};

const NES_MAGIC: &[u8; 4] = b"NES\x1A";

/// Size of the fixed iNES header in bytes.
pub const NES_HEADER_LEN: usize = 16;
/// One PRG chunk (`header[4]` unit).
pub const PRG_CHUNK_SIZE: usize = 16 * 1024;
/// One CHR chunk (`header[5]` unit).
pub const CHR_CHUNK_SIZE: usize = 8 * 1024;
/// CHR-RAM chunks allocated when the header declares no CHR ROM.
pub const CHR_RAM_CHUNKS: usize = 4;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags6: u8 {
        const MIRRORING        = 0b0000_0001;
        const BATTERY          = 0b0000_0010;
        const TRAINER          = 0b0000_0100;
        const FOUR_SCREEN      = 0b0000_1000;
        const MAPPER_LOW_MASK  = 0b1111_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags7: u8 {
        const VS_UNISYSTEM     = 0b0000_0001;
        const PLAYCHOICE_10    = 0b0000_0010;
        const MAPPER_HIGH_MASK = 0b1111_0000;
    }
}

/// How the two physical nametables are arranged in the PPU's four-screen space.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mirroring {
    /// Defer to the header's solder pads.
    #[default]
    Hardwired,
    /// `$2000 = $2400`, `$2800 = $2C00`.
    Horizontal,
    /// `$2000 = $2800`, `$2400 = $2C00`.
    Vertical,
    /// Every nametable maps to the first physical table.
    OneScreenLo,
    /// Every nametable maps to the second physical table.
    OneScreenHi,
}

impl Mirroring {
    /// Physical table (0 or 1) backing a `$2000-$3EFF` address.
    pub fn table(self, addr: u16) -> usize {
        match self {
            Mirroring::Vertical => usize::from(addr & 0x0400 != 0),
            Mirroring::Horizontal | Mirroring::Hardwired => usize::from(addr & 0x0800 != 0),
            Mirroring::OneScreenLo => 0,
            Mirroring::OneScreenHi => 1,
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Mirroring::Hardwired => 0,
            Mirroring::Horizontal => 1,
            Mirroring::Vertical => 2,
            Mirroring::OneScreenLo => 3,
            Mirroring::OneScreenHi => 4,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Mirroring::Hardwired,
            1 => Mirroring::Horizontal,
            2 => Mirroring::Vertical,
            3 => Mirroring::OneScreenLo,
            4 => Mirroring::OneScreenHi,
            _ => return Err(Error::StateInvalid("mirroring")),
        })
    }
}

/// Parsed iNES header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    raw: [u8; NES_HEADER_LEN],
    /// Mapper ID (0 == NROM, 1 == MMC1, ...).
    pub mapper: u16,
    /// Solder-pad mirroring; never [`Mirroring::Hardwired`].
    pub mirroring: Mirroring,
    /// Battery bit indicates the cartridge keeps RAM contents when powered off.
    pub battery_backed_ram: bool,
    /// Whether the optional 512 byte trainer block sits between the header and PRG data.
    pub trainer_present: bool,
    /// Number of 16 KiB PRG chunks.
    pub prg_chunks: u8,
    /// Number of 8 KiB CHR ROM chunks. `0` means the board carries CHR RAM.
    pub chr_chunks: u8,
}

impl Header {
    /// Parse an iNES header from the given byte slice.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; NES_HEADER_LEN] = bytes
            .get(..NES_HEADER_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or(Error::TooShort {
                actual: bytes.len(),
            })?;

        if &raw[0..4] != NES_MAGIC {
            return Err(Error::InvalidMagic);
        }

        let flags6 = Flags6::from_bits_truncate(raw[6]);
        let flags7 = Flags7::from_bits_truncate(raw[7]);

        Ok(Self {
            raw,
            mapper: combine_mapper(&raw, flags6, flags7),
            mirroring: if flags6.contains(Flags6::MIRRORING) {
                Mirroring::Vertical
            } else {
                Mirroring::Horizontal
            },
            battery_backed_ram: flags6.contains(Flags6::BATTERY),
            trainer_present: flags6.contains(Flags6::TRAINER),
            prg_chunks: raw[4],
            chr_chunks: raw[5],
        })
    }

    /// The 16 header bytes as read from the file.
    pub fn as_bytes(&self) -> &[u8; NES_HEADER_LEN] {
        &self.raw
    }

    /// Amount of PRG ROM in bytes.
    pub fn prg_rom_size(&self) -> usize {
        usize::from(self.prg_chunks) * PRG_CHUNK_SIZE
    }

    /// Amount of CHR ROM in bytes (`0` for CHR RAM boards).
    pub fn chr_rom_size(&self) -> usize {
        usize::from(self.chr_chunks) * CHR_CHUNK_SIZE
    }

    /// Size of the CHR window the cartridge exposes, ROM or RAM.
    pub fn chr_size(&self) -> usize {
        if self.chr_chunks == 0 {
            CHR_RAM_CHUNKS * CHR_CHUNK_SIZE
        } else {
            self.chr_rom_size()
        }
    }

    pub fn has_chr_ram(&self) -> bool {
        self.chr_chunks == 0
    }
}

/// Old dumps often carry junk ("DiskDude!") in bytes 11-14; the upper mapper
/// nibble is only trusted when that area is clean.
fn combine_mapper(raw: &[u8; NES_HEADER_LEN], flags6: Flags6, flags7: Flags7) -> u16 {
    let lower = u16::from((flags6 & Flags6::MAPPER_LOW_MASK).bits() >> 4);
    if raw[11..=14].iter().all(|&b| b == 0) {
        lower | u16::from((flags7 & Flags7::MAPPER_HIGH_MASK).bits())
    } else {
        lower
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(prg: u8, chr: u8, flags6: u8, flags7: u8) -> [u8; NES_HEADER_LEN] {
        [
            b'N', b'E', b'S', 0x1A, prg, chr, flags6, flags7, 0, 0, 0, 0, 0, 0, 0, 0,
        ]
    }

    #[test]
    fn parses_valid_header() {
        let header = Header::parse(&header_bytes(2, 1, 0b0000_0001, 0)).expect("header parses");

        assert_eq!(header.prg_rom_size(), 2 * 16 * 1024);
        assert_eq!(header.chr_rom_size(), 8 * 1024);
        assert_eq!(header.mirroring, Mirroring::Vertical);
        assert!(!header.trainer_present);
        assert!(!header.has_chr_ram());
        assert_eq!(header.mapper, 0);
    }

    #[test]
    fn mapper_nibbles_span_flags() {
        let header = Header::parse(&header_bytes(1, 1, 0x40, 0x40)).expect("header parses");
        assert_eq!(header.mapper, 0x44);
    }

    #[test]
    fn dirty_padding_drops_upper_nibble() {
        let mut bytes = header_bytes(1, 1, 0x10, 0x40);
        bytes[11..15].copy_from_slice(b"Dude");
        let header = Header::parse(&bytes).expect("header parses");
        assert_eq!(header.mapper, 1);
    }

    #[test]
    fn chr_ram_defaults_to_four_chunks() {
        let header = Header::parse(&header_bytes(1, 0, 0x02, 0)).expect("header parses");
        assert!(header.has_chr_ram());
        assert!(header.battery_backed_ram);
        assert_eq!(header.chr_size(), 32 * 1024);
    }

    #[test]
    fn rejects_invalid_magic() {
        let mut bytes = [0u8; NES_HEADER_LEN];
        bytes[..4].copy_from_slice(b"NOPE");

        let err = Header::parse(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic));
    }

    #[test]
    fn rejects_short_header() {
        let err = Header::parse(b"NES\x1A").unwrap_err();
        assert!(matches!(err, Error::TooShort { actual: 4 }));
    }

    #[test]
    fn mirroring_tables() {
        assert_eq!(Mirroring::Vertical.table(0x2400), 1);
        assert_eq!(Mirroring::Vertical.table(0x2800), 0);
        assert_eq!(Mirroring::Horizontal.table(0x2400), 0);
        assert_eq!(Mirroring::Horizontal.table(0x2800), 1);
        assert_eq!(Mirroring::OneScreenHi.table(0x2000), 1);
    }
}
