//! Triangle channel with its linear counter and 32-step sequencer.

use super::{length_counter::LengthCounter, linear_counter::LinearCounter, timer::ApuTimer};
use crate::{
    error::Result,
    state::{Savestate, StateReader, StateWriter},
};

#[rustfmt::skip]
const TRIANGLE_SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10,  9,  8,  7,  6,  5,  4,  3,  2,  1,  0,
     0,  1,  2,  3,  4,  5,  6,  7,  8,  9, 10, 11, 12, 13, 14, 15,
];

/// Ultrasonic periods are gated off instead of producing a mid-level DC pop.
const TRIANGLE_MIN_PERIOD: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Triangle {
    timer: ApuTimer,
    length: LengthCounter,
    linear: LinearCounter,
    step: u8,
}

impl Default for Triangle {
    fn default() -> Self {
        Self {
            timer: ApuTimer::with_min_period(TRIANGLE_MIN_PERIOD),
            length: LengthCounter::default(),
            linear: LinearCounter::default(),
            step: 0,
        }
    }
}

impl Triangle {
    pub(super) fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x4008 => {
                let control = value & 0b1000_0000 != 0;
                self.length.set_halt(control);
                self.linear.configure(control, value & 0x7F);
            }
            0x400A => self.timer.set_period_low8(value),
            0x400B => {
                self.timer.set_period_high3(value);
                self.linear.restart();
                self.length.load_index(value >> 3);
            }
            _ => {}
        }
    }

    pub(super) fn length_mut(&mut self) -> &mut LengthCounter {
        &mut self.length
    }

    pub(super) fn length(&self) -> &LengthCounter {
        &self.length
    }

    pub(super) fn clock_quarter_frame(&mut self) {
        self.linear.clock();
    }

    pub(super) fn clock_half_frame(&mut self) {
        self.length.clock();
    }

    pub(super) fn clock_timer(&mut self) {
        if self.timer.clock() && self.linear.value() > 0 && !self.length.silenced() {
            self.step = (self.step + 1) & 0x1F;
        }
    }

    /// Silent whenever either counter has run out.
    pub(super) fn value(&self) -> u8 {
        if self.linear.value() == 0 || self.length.silenced() {
            return 0;
        }
        TRIANGLE_SEQUENCE[self.step as usize]
    }
}

impl Savestate for Triangle {
    fn save(&self, w: &mut StateWriter) {
        self.timer.save(w);
        self.length.save(w);
        self.linear.save(w);
        w.u8(self.step);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.timer.load(r)?;
        self.length.load(r)?;
        self.linear.load(r)?;
        self.step = r.u8()? & 0x1F;
        Ok(())
    }
}
