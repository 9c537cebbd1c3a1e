//! Pulse sweep unit: periodically retunes the owning channel's timer.

use super::{divider::Divider, timer::ApuTimer};
use crate::{
    error::Result,
    state::{Savestate, StateReader, StateWriter},
};

/// Highest timer period the sweep adder may produce before muting.
const MAX_TARGET_PERIOD: u16 = 0x07FF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum Negation {
    /// Pulse 1: the adder's carry-in is tied low, so negation is one's complement.
    OnesComplement,
    /// Pulse 2: regular two's complement subtraction.
    TwosComplement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Sweep {
    negation: Negation,
    enabled: bool,
    negate: bool,
    reload: bool,
    /// Set whenever the current or target period is out of range, even while disabled.
    silence: bool,
    shift: u8,
    divider: Divider,
    target_period: u16,
}

impl Sweep {
    pub(super) fn new(negation: Negation) -> Self {
        Self {
            negation,
            enabled: false,
            negate: false,
            reload: false,
            silence: false,
            shift: 0,
            divider: Divider::default(),
            target_period: 0,
        }
    }

    /// `$4001/$4005`: EPPP NSSS.
    pub(super) fn write(&mut self, value: u8, timer: &ApuTimer) {
        self.enabled = value & 0b1000_0000 != 0;
        self.divider.set_period(u16::from((value >> 4) & 0b0000_0111));
        self.negate = value & 0b0000_1000 != 0;
        self.shift = value & 0b0000_0111;
        self.compute_target(timer);
        self.reload = true;
    }

    pub(super) fn silenced(&self) -> bool {
        self.silence
    }

    /// Half-frame clock.
    pub(super) fn clock(&mut self, timer: &mut ApuTimer) {
        self.compute_target(timer);

        if self.reload {
            // A reload on the clock the divider would have expired still adjusts.
            if self.enabled && self.divider.clock() {
                self.adjust(timer);
            }
            self.divider.reset();
            self.reload = false;
        } else if self.divider.counter() > 0 {
            self.divider.clock();
        } else if self.enabled && self.divider.clock() {
            self.adjust(timer);
        }
    }

    /// Recomputes the target from the timer's current period.
    pub(super) fn compute_target(&mut self, timer: &ApuTimer) {
        let current = timer.period();
        let (target, overflow) = target_period(current, self.shift, self.negate, self.negation);
        self.target_period = target;
        self.silence = current < 8 || overflow || target > MAX_TARGET_PERIOD;
    }

    fn adjust(&self, timer: &mut ApuTimer) {
        if self.enabled && self.shift > 0 && !self.silence {
            timer.set_period(self.target_period);
        }
    }
}

/// Returns the sweep target and whether the subtraction underflowed.
fn target_period(current: u16, shift: u8, negate: bool, negation: Negation) -> (u16, bool) {
    let delta = current >> shift;
    if !negate {
        return (current + delta, false);
    }
    let delta = match negation {
        Negation::OnesComplement => delta + 1,
        Negation::TwosComplement => delta,
    };
    current.overflowing_sub(delta)
}

impl Savestate for Sweep {
    fn save(&self, w: &mut StateWriter) {
        w.bool(self.enabled);
        w.bool(self.negate);
        w.bool(self.reload);
        w.bool(self.silence);
        w.u8(self.shift);
        self.divider.save(w);
        w.u16(self.target_period);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.enabled = r.bool()?;
        self.negate = r.bool()?;
        self.reload = r.bool()?;
        self.silence = r.bool()?;
        self.shift = r.u8()? & 0x07;
        self.divider.load(r)?;
        self.target_period = r.u16()?;
        Ok(())
    }
}
