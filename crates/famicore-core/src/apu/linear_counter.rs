//! Triangle-only linear counter, clocked on quarter frames.

use super::divider::Divider;
use crate::{
    error::Result,
    state::{Savestate, StateReader, StateWriter},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct LinearCounter {
    reload: bool,
    /// While clear, the reload flag is dropped after the next clock.
    control: bool,
    divider: Divider,
}

impl Default for LinearCounter {
    fn default() -> Self {
        Self {
            reload: true,
            control: true,
            divider: Divider::default(),
        }
    }
}

impl LinearCounter {
    pub(super) fn restart(&mut self) {
        self.reload = true;
    }

    /// `$4008`: CRRR RRRR.
    pub(super) fn configure(&mut self, control: bool, period: u8) {
        self.control = control;
        self.divider.set_period(u16::from(period & 0x7F));
    }

    pub(super) fn clock(&mut self) {
        if self.reload {
            self.divider.reset();
        } else if self.divider.counter() > 0 {
            self.divider.clock();
        }

        if !self.control {
            self.reload = false;
        }
    }

    pub(super) fn value(&self) -> u16 {
        self.divider.counter()
    }
}

impl Savestate for LinearCounter {
    fn save(&self, w: &mut StateWriter) {
        w.bool(self.reload);
        w.bool(self.control);
        self.divider.save(w);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.reload = r.bool()?;
        self.control = r.bool()?;
        self.divider.load(r)
    }
}
