//! Shared length counter used by pulse, triangle, and noise channels.

use crate::{
    error::Result,
    state::{Savestate, StateReader, StateWriter},
};

/// Length values selected by the upper five bits of `$4003/$4007/$400B/$400F`.
#[rustfmt::skip]
pub(super) const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20,  2, 40,  4, 80,  6, 160,  8, 60, 10, 14, 12, 26, 14,
    12,  16, 24, 18, 48, 20, 96, 22, 192, 24, 72, 26, 16, 28, 32, 30,
];

/// A zero counter silences the owning channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct LengthCounter {
    enabled: bool,
    halt: bool,
    counter: u8,
}

impl LengthCounter {
    /// `$4015` enable bit. Disabling forces the counter to zero.
    pub(super) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.counter = 0;
        }
    }

    pub(super) fn set_halt(&mut self, halt: bool) {
        self.halt = halt;
    }

    /// Loads from [`LENGTH_TABLE`]; ignored while the channel is disabled.
    pub(super) fn load_index(&mut self, index: u8) {
        if self.enabled {
            self.counter = LENGTH_TABLE[(index & 0x1F) as usize];
        }
    }

    /// Half-frame clock.
    pub(super) fn clock(&mut self) {
        if !self.halt && self.counter > 0 {
            self.counter -= 1;
        }
    }

    pub(super) fn value(&self) -> u8 {
        self.counter
    }

    pub(super) fn silenced(&self) -> bool {
        self.counter == 0
    }
}

impl Savestate for LengthCounter {
    fn save(&self, w: &mut StateWriter) {
        w.bool(self.enabled);
        w.bool(self.halt);
        w.u8(self.counter);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.enabled = r.bool()?;
        self.halt = r.bool()?;
        self.counter = r.u8()?;
        Ok(())
    }
}
