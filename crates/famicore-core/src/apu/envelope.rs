//! Envelope unit shared by pulse and noise channels.

use super::divider::Divider;
use crate::{
    error::Result,
    state::{Savestate, StateReader, StateWriter},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Envelope {
    restart: bool,
    loop_flag: bool,
    decay_level: u8,
    constant_volume_mode: bool,
    /// Doubles as the divider reload value.
    constant_volume: u8,
    divider: Divider,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            restart: true,
            loop_flag: false,
            decay_level: 0,
            constant_volume_mode: false,
            constant_volume: 0,
            divider: Divider::default(),
        }
    }
}

impl Envelope {
    pub(super) fn restart(&mut self) {
        self.restart = true;
    }

    pub(super) fn set_loop(&mut self, loop_flag: bool) {
        self.loop_flag = loop_flag;
    }

    pub(super) fn set_constant_volume_mode(&mut self, enabled: bool) {
        self.constant_volume_mode = enabled;
    }

    pub(super) fn set_constant_volume(&mut self, volume: u8) {
        self.constant_volume = volume & 0x0F;
        self.divider.set_period(u16::from(self.constant_volume));
    }

    /// Quarter-frame clock.
    pub(super) fn clock(&mut self) {
        if self.restart {
            self.restart = false;
            self.decay_level = 15;
            self.divider.reset();
            return;
        }

        if self.divider.clock() {
            if self.decay_level > 0 {
                self.decay_level -= 1;
            } else if self.loop_flag {
                self.decay_level = 15;
            }
        }
    }

    pub(super) fn volume(&self) -> u8 {
        if self.constant_volume_mode {
            self.constant_volume
        } else {
            self.decay_level
        }
    }
}

impl Savestate for Envelope {
    fn save(&self, w: &mut StateWriter) {
        w.bool(self.restart);
        w.bool(self.loop_flag);
        w.u8(self.decay_level);
        w.bool(self.constant_volume_mode);
        w.u8(self.constant_volume);
        self.divider.save(w);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.restart = r.bool()?;
        self.loop_flag = r.bool()?;
        self.decay_level = r.u8()? & 0x0F;
        self.constant_volume_mode = r.bool()?;
        self.constant_volume = r.u8()? & 0x0F;
        self.divider.load(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_reloads_decay_level() {
        let mut env = Envelope::default();
        env.set_constant_volume(0);
        env.clock();
        assert_eq!(env.volume(), 15);
        env.clock();
        assert_eq!(env.volume(), 14);
    }

    #[test]
    fn decay_stops_at_zero_without_loop() {
        let mut env = Envelope::default();
        for _ in 0..40 {
            env.clock();
        }
        assert_eq!(env.volume(), 0);
    }

    #[test]
    fn loop_wraps_back_to_fifteen() {
        let mut env = Envelope::default();
        env.set_loop(true);
        for _ in 0..17 {
            env.clock();
        }
        assert_eq!(env.volume(), 15);
    }

    #[test]
    fn constant_mode_reports_fixed_volume() {
        let mut env = Envelope::default();
        env.set_constant_volume_mode(true);
        env.set_constant_volume(0x17);
        assert_eq!(env.volume(), 7);
    }
}
