//! Noise channel driven by a 15-bit linear feedback shift register.

use super::{envelope::Envelope, length_counter::LengthCounter, timer::ApuTimer};
use crate::{
    error::Result,
    state::{Savestate, StateReader, StateWriter},
};

/// NTSC noise periods in CPU cycles, indexed by `$400E` bits 0-3.
const NOISE_PERIOD_TABLE: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Lfsr {
    register: u16,
    /// Short mode taps bit 6 instead of bit 1.
    mode: bool,
}

impl Default for Lfsr {
    fn default() -> Self {
        Self {
            register: 1,
            mode: false,
        }
    }
}

impl Lfsr {
    pub(super) fn clock(&mut self) {
        let tap = if self.mode { 6 } else { 1 };
        let feedback = (self.register & 1) ^ ((self.register >> tap) & 1);
        self.register = (self.register >> 1) | (feedback << 14);
    }

    pub(super) fn silenced(&self) -> bool {
        self.register & 1 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Noise {
    timer: ApuTimer,
    length: LengthCounter,
    envelope: Envelope,
    lfsr: Lfsr,
}

impl Default for Noise {
    fn default() -> Self {
        let mut envelope = Envelope::default();
        envelope.set_loop(true);
        Self {
            timer: ApuTimer::default(),
            length: LengthCounter::default(),
            envelope,
            lfsr: Lfsr::default(),
        }
    }
}

impl Noise {
    pub(super) fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x400C => {
                self.length.set_halt(value & 0b0010_0000 != 0);
                self.envelope
                    .set_constant_volume_mode(value & 0b0001_0000 != 0);
                self.envelope.set_constant_volume(value & 0b0000_1111);
            }
            0x400E => {
                self.lfsr.mode = value & 0b1000_0000 != 0;
                // The timer runs at half CPU rate and reloads from period - 1.
                let period = NOISE_PERIOD_TABLE[(value & 0x0F) as usize];
                self.timer.set_period(period / 2 - 1);
            }
            0x400F => {
                self.length.load_index(value >> 3);
                self.envelope.restart();
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
        self.envelope.clock();
    }

    pub(super) fn clock_half_frame(&mut self) {
        self.length.clock();
    }

    pub(super) fn clock_timer(&mut self) {
        if self.timer.clock() {
            self.lfsr.clock();
        }
    }

    pub(super) fn value(&self) -> u8 {
        if self.lfsr.silenced() || self.length.silenced() {
            return 0;
        }
        self.envelope.volume()
    }
}

impl Savestate for Noise {
    fn save(&self, w: &mut StateWriter) {
        self.timer.save(w);
        self.length.save(w);
        self.envelope.save(w);
        w.u16(self.lfsr.register);
        w.bool(self.lfsr.mode);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.timer.load(r)?;
        self.length.load(r)?;
        self.envelope.load(r)?;
        self.lfsr.register = r.u16()? & 0x7FFF;
        self.lfsr.mode = r.bool()?;
        Ok(())
    }
}
