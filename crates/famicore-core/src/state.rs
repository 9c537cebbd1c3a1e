//! Binary savestate stream.
//!
//! Every stateful component appends its fields to a [`StateWriter`] in a fixed
//! order and consumes them back from a [`StateReader`] in the same order. All
//! integers are little-endian; byte vectors and strings carry a `u32` length
//! prefix bounded by [`MAX_BLOB_LEN`].

use crate::error::{Error, Result};

/// Upper bound for any length-prefixed blob inside a savestate (512 MiB).
pub const MAX_BLOB_LEN: usize = 512 * 1024 * 1024;

/// Components that can append their state to a stream and restore it.
pub trait Savestate {
    fn save(&self, w: &mut StateWriter);

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()>;
}

/// Append-only savestate encoder.
#[derive(Debug, Default, Clone)]
pub struct StateWriter {
    buf: Vec<u8>,
}

impl StateWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn bool(&mut self, value: bool) {
        self.u8(u8::from(value));
    }

    pub fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn f64(&mut self, value: f64) {
        self.u64(value.to_bits());
    }

    /// Writes raw bytes without a length prefix.
    pub fn bytes(&mut self, value: &[u8]) {
        self.buf.extend_from_slice(value);
    }

    /// Writes a `u32` length prefix followed by the bytes.
    pub fn blob(&mut self, value: &[u8]) {
        self.u32(value.len() as u32);
        self.bytes(value);
    }

    pub fn string(&mut self, value: &str) {
        self.blob(value.as_bytes());
    }
}

/// Cursor over a savestate produced by [`StateWriter`].
#[derive(Debug, Clone)]
pub struct StateReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(Error::StateTruncated {
                needed: len,
                remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads a boolean; any byte other than 0 or 1 is rejected.
    pub fn bool(&mut self) -> Result<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::StateInvalid("boolean out of range")),
        }
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.u64()?))
    }

    /// Fills `out` with the next `out.len()` raw bytes.
    pub fn bytes_into(&mut self, out: &mut [u8]) -> Result<()> {
        out.copy_from_slice(self.take(out.len())?);
        Ok(())
    }

    /// Reads a length-prefixed byte vector.
    pub fn blob(&mut self) -> Result<Vec<u8>> {
        let len = self.u32()? as usize;
        if len > MAX_BLOB_LEN {
            return Err(Error::StateBlobTooLarge {
                len,
                max: MAX_BLOB_LEN,
            });
        }
        Ok(self.take(len)?.to_vec())
    }

    pub fn string(&mut self) -> Result<String> {
        String::from_utf8(self.blob()?).map_err(|_| Error::StateInvalid("string is not UTF-8"))
    }

    /// Fails when unread bytes remain.
    pub fn finish(self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            trailing => Err(Error::StateTrailingBytes(trailing)),
        }
    }
}
