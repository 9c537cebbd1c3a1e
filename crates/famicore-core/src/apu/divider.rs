//! Free-running down-counter shared by every APU sub-unit.

use crate::{
    error::Result,
    state::{Savestate, StateReader, StateWriter},
};

/// Counts from `period` down to 0 inclusive, so a pulse is emitted every
/// `period + 1` input clocks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Divider {
    period: u16,
    counter: u16,
}

impl Divider {
    pub(super) fn period(&self) -> u16 {
        self.period
    }

    pub(super) fn counter(&self) -> u16 {
        self.counter
    }

    /// Changes the reload value without touching the running counter.
    pub(super) fn set_period(&mut self, period: u16) {
        self.period = period;
    }

    pub(super) fn reset(&mut self) {
        self.counter = self.period;
    }

    /// Returns `true` on the clock that wraps the counter back to `period`.
    pub(super) fn clock(&mut self) -> bool {
        if self.counter == 0 {
            self.reset();
            true
        } else {
            self.counter -= 1;
            false
        }
    }
}

impl Savestate for Divider {
    fn save(&self, w: &mut StateWriter) {
        w.u16(self.period);
        w.u16(self.counter);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.period = r.u16()?;
        self.counter = r.u16()?;
        Ok(())
    }
}
