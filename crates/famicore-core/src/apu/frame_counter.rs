//! Frame sequencer responsible for clocking envelopes, length counters, and
//! sweep units at quarter- and half-frame intervals.

use crate::{
    error::{Error, Result},
    state::{Savestate, StateReader, StateWriter},
};

/// Frame sequencer timing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameCounterMode {
    #[default]
    FourStep,
    FiveStep,
}

/// Indicates which frame units should be clocked after a frame counter tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct FrameTick {
    pub(super) quarter: bool,
    pub(super) half: bool,
}

impl FrameTick {
    const NONE: Self = Self {
        quarter: false,
        half: false,
    };
    const QUARTER: Self = Self {
        quarter: true,
        half: false,
    };
    const BOTH: Self = Self {
        quarter: true,
        half: true,
    };
}

/// NTSC sequencer state, counted in CPU cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct FrameCounter {
    cpu_cycles: u32,
    mode: FrameCounterMode,
    irq_inhibit: bool,
    irq_pending: bool,
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self {
            cpu_cycles: 0,
            mode: FrameCounterMode::FourStep,
            irq_inhibit: true,
            irq_pending: false,
        }
    }
}

impl FrameCounter {
    /// `$4017`: MI-- ----. Selecting five-step mode clocks every unit at once.
    pub(super) fn write(&mut self, value: u8) -> FrameTick {
        self.mode = if value & 0b1000_0000 != 0 {
            FrameCounterMode::FiveStep
        } else {
            FrameCounterMode::FourStep
        };
        self.cpu_cycles = 0;

        self.irq_inhibit = value & 0b0100_0000 != 0;
        if self.irq_inhibit {
            self.irq_pending = false;
        }

        match self.mode {
            FrameCounterMode::FiveStep => FrameTick::BOTH,
            FrameCounterMode::FourStep => FrameTick::NONE,
        }
    }

    /// Advances one CPU cycle.
    pub(super) fn clock(&mut self) -> FrameTick {
        let four_step = self.mode == FrameCounterMode::FourStep;
        let mut restart = false;

        let tick = match self.cpu_cycles {
            7457 | 22371 => FrameTick::QUARTER,
            14913 => FrameTick::BOTH,
            29828 if four_step => {
                self.raise_irq();
                FrameTick::NONE
            }
            29829 if four_step => {
                self.raise_irq();
                FrameTick::BOTH
            }
            29830 if four_step => {
                self.raise_irq();
                restart = true;
                FrameTick::NONE
            }
            37281 => FrameTick::BOTH,
            37282 => {
                restart = true;
                FrameTick::NONE
            }
            _ => FrameTick::NONE,
        };

        self.cpu_cycles = if restart { 0 } else { self.cpu_cycles + 1 };
        tick
    }

    fn raise_irq(&mut self) {
        if !self.irq_inhibit {
            self.irq_pending = true;
        }
    }

    pub(super) fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    pub(super) fn clear_irq(&mut self) {
        self.irq_pending = false;
    }

    pub(super) fn mode(&self) -> FrameCounterMode {
        self.mode
    }
}

impl Savestate for FrameCounter {
    fn save(&self, w: &mut StateWriter) {
        w.u32(self.cpu_cycles);
        w.u8(match self.mode {
            FrameCounterMode::FourStep => 4,
            FrameCounterMode::FiveStep => 5,
        });
        w.bool(self.irq_inhibit);
        w.bool(self.irq_pending);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.cpu_cycles = r.u32()?;
        self.mode = match r.u8()? {
            4 => FrameCounterMode::FourStep,
            5 => FrameCounterMode::FiveStep,
            _ => return Err(Error::StateInvalid("frame counter step count")),
        };
        self.irq_inhibit = r.bool()?;
        self.irq_pending = r.bool()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(counter: &mut FrameCounter, cycles: u32) -> (u32, u32) {
        let (mut quarters, mut halves) = (0, 0);
        for _ in 0..cycles {
            let tick = counter.clock();
            quarters += u32::from(tick.quarter);
            halves += u32::from(tick.half);
        }
        (quarters, halves)
    }

    #[test]
    fn four_step_sequence_raises_irq() {
        let mut counter = FrameCounter::default();
        counter.write(0x00);
        let ticks = run(&mut counter, 29831);
        assert_eq!(ticks, (4, 2));
        assert!(counter.irq_pending());
        // Sequence restarted.
        assert_eq!(counter.cpu_cycles, 0);
    }

    #[test]
    fn inhibit_suppresses_and_clears_irq() {
        let mut counter = FrameCounter::default();
        counter.write(0x00);
        run(&mut counter, 29831);
        assert!(counter.irq_pending());

        counter.write(0x40);
        assert!(!counter.irq_pending());
        run(&mut counter, 29831);
        assert!(!counter.irq_pending());
    }

    #[test]
    fn power_on_state_is_inhibited() {
        let mut counter = FrameCounter::default();
        run(&mut counter, 29831);
        assert!(!counter.irq_pending());
    }

    #[test]
    fn five_step_clocks_immediately_and_never_interrupts() {
        let mut counter = FrameCounter::default();
        let tick = counter.write(0x80);
        assert!(tick.quarter && tick.half);
        assert_eq!(counter.mode(), FrameCounterMode::FiveStep);

        let ticks = run(&mut counter, 37283);
        assert_eq!(ticks, (4, 2));
        assert!(!counter.irq_pending());
        assert_eq!(counter.cpu_cycles, 0);
    }
}
