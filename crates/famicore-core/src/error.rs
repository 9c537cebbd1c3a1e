use crate::cartridge::header::NES_HEADER_LEN;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Provided buffer is shorter than the 16-byte header.
    #[error("header expected {NES_HEADER_LEN} bytes, got {actual}")]
    TooShort { actual: usize },
    /// Magic number ("NES<EOF>") is missing.
    #[error("missing NES magic bytes")]
    InvalidMagic,
    /// A ROM section (PRG/CHR) is shorter than the header advertises.
    #[error("{section} section expected {expected} bytes, got {actual}")]
    SectionTooShort {
        section: &'static str,
        expected: usize,
        actual: usize,
    },
    /// No built-in board or provider knows this mapper number.
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u16),
    /// The savestate ended before every field was read.
    #[error("savestate truncated: needed {needed} bytes, {remaining} remaining")]
    StateTruncated { needed: usize, remaining: usize },
    /// A length prefix inside the savestate exceeds the sanity bound.
    #[error("savestate blob of {len} bytes exceeds the {max} byte limit")]
    StateBlobTooLarge { len: usize, max: usize },
    /// Bytes were left over once every component consumed its fields.
    #[error("savestate has {0} trailing bytes")]
    StateTrailingBytes(usize),
    /// A field decoded to a value outside its domain.
    #[error("invalid savestate: {0}")]
    StateInvalid(&'static str),
    /// The operation needs an inserted cartridge.
    #[error("no cartridge inserted")]
    NoCartridge,
    /// Wrapper for I/O errors raised while reading ROMs from disk.
    #[error("i/o error while reading cartridge: {0}")]
    Io(#[from] std::io::Error),
}
