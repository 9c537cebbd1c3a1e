//! Channel timer: a [`Divider`] with an 11-bit period and a minimum-period gate.

use super::divider::Divider;
use crate::{
    error::Result,
    state::{Savestate, StateReader, StateWriter},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct ApuTimer {
    divider: Divider,
    min_period: u16,
}

impl ApuTimer {
    pub(super) fn with_min_period(min_period: u16) -> Self {
        Self {
            min_period,
            ..Self::default()
        }
    }

    pub(super) fn period(&self) -> u16 {
        self.divider.period()
    }

    pub(super) fn set_period(&mut self, period: u16) {
        self.divider.set_period(period);
    }

    /// `$4002/$4006/$400A`: replaces the low 8 bits, keeps bits 8-10.
    pub(super) fn set_period_low8(&mut self, value: u8) {
        let period = (self.period() & 0x0700) | u16::from(value);
        self.set_period(period);
    }

    /// `$4003/$4007/$400B`: replaces bits 8-10 and restarts the counter.
    pub(super) fn set_period_high3(&mut self, value: u8) {
        let period = (u16::from(value & 0x07) << 8) | (self.period() & 0x00FF);
        self.set_period(period);
        self.divider.reset();
    }

    /// Returns `true` when the waveform generator should step.
    ///
    /// Periods below `min_period` never fire.
    pub(super) fn clock(&mut self) -> bool {
        if self.period() < self.min_period {
            return false;
        }
        self.divider.clock()
    }
}

impl Savestate for ApuTimer {
    fn save(&self, w: &mut StateWriter) {
        self.divider.save(w);
        w.u16(self.min_period);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.divider.load(r)?;
        self.min_period = r.u16()?;
        Ok(())
    }
}
