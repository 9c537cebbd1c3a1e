//! Pulse channel state, including sweep and envelope units.

use super::{
    envelope::Envelope,
    length_counter::LengthCounter,
    sweep::{Negation, Sweep},
    timer::ApuTimer,
};
use crate::{
    error::Result,
    state::{Savestate, StateReader, StateWriter},
};

/// 8-step waveforms for the four duty settings (12.5%, 25%, 50%, 25% negated).
const PULSE_DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Pulse {
    timer: ApuTimer,
    length: LengthCounter,
    envelope: Envelope,
    sweep: Sweep,
    duty: u8,
    step: u8,
}

impl Pulse {
    pub(super) fn new(negation: Negation) -> Self {
        Self {
            timer: ApuTimer::default(),
            length: LengthCounter::default(),
            envelope: Envelope::default(),
            sweep: Sweep::new(negation),
            duty: 0,
            step: 0,
        }
    }

    /// Handles a write to one of the channel's four registers (`reg` is `addr & 3`).
    pub(super) fn write(&mut self, reg: u16, value: u8) {
        match reg & 0x03 {
            0 => {
                self.duty = value >> 6;
                let halt = value & 0b0010_0000 != 0;
                self.length.set_halt(halt);
                self.envelope.set_loop(halt);
                self.envelope
                    .set_constant_volume_mode(value & 0b0001_0000 != 0);
                self.envelope.set_constant_volume(value & 0b0000_1111);
            }
            1 => self.sweep.write(value, &self.timer),
            2 => self.timer.set_period_low8(value),
            _ => {
                self.timer.set_period_high3(value);
                self.length.load_index(value >> 3);
                self.envelope.restart();
                self.step = 0;
            }
        }
    }

    pub(super) fn length_mut(&mut self) -> &mut LengthCounter {
        &mut self.length
    }

    pub(super) fn length(&self) -> &LengthCounter {
        &self.length
    }

    pub(super) fn clock_quarter_frame(&mut self) {
        self.envelope.clock();
    }

    pub(super) fn clock_half_frame(&mut self) {
        self.length.clock();
        self.sweep.clock(&mut self.timer);
    }

    pub(super) fn clock_timer(&mut self) {
        if self.timer.clock() {
            self.step = (self.step + 1) & 0x07;
        }
    }

    pub(super) fn value(&self) -> u8 {
        if self.sweep.silenced() || self.length.silenced() {
            return 0;
        }
        self.envelope.volume() * PULSE_DUTY_TABLE[self.duty as usize][self.step as usize]
    }
}

impl Savestate for Pulse {
    fn save(&self, w: &mut StateWriter) {
        self.timer.save(w);
        self.length.save(w);
        self.envelope.save(w);
        self.sweep.save(w);
        w.u8(self.duty);
        w.u8(self.step);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.timer.load(r)?;
        self.length.load(r)?;
        self.envelope.load(r)?;
        self.sweep.load(r)?;
        self.duty = r.u8()? & 0x03;
        self.step = r.u8()? & 0x07;
        Ok(())
    }
}
