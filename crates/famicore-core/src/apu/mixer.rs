//! Channel mixer modelling the APU's non-linear DAC.

use crate::config::MixingMode;

const PULSE_TABLE_LEN: usize = 31;
const TND_TABLE_LEN: usize = 203;

/// Amplitude of each channel after gating, in the 0-15 range.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct ChannelLevels {
    pub(super) pulse1: u8,
    pub(super) pulse2: u8,
    pub(super) triangle: u8,
    pub(super) noise: u8,
    pub(super) dmc: u8,
}

/// Lookup tables built once when the APU is constructed.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Mixer {
    pulse_table: [f32; PULSE_TABLE_LEN],
    tnd_table: [f32; TND_TABLE_LEN],
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mixer {
    pub(super) fn new() -> Self {
        let mut pulse_table = [0.0; PULSE_TABLE_LEN];
        for (i, entry) in pulse_table.iter_mut().enumerate().skip(1) {
            *entry = 95.52 / (8128.0 / i as f32 + 100.0);
        }
        let mut tnd_table = [0.0; TND_TABLE_LEN];
        for (i, entry) in tnd_table.iter_mut().enumerate().skip(1) {
            *entry = 163.67 / (24329.0 / i as f32 + 100.0);
        }
        Self {
            pulse_table,
            tnd_table,
        }
    }

    /// Mixes the channel levels into a signed 16-bit sample.
    ///
    /// All-silent input maps to `-i16::MAX`.
    pub(super) fn mix(&self, levels: ChannelLevels, mode: MixingMode) -> i16 {
        let ChannelLevels {
            pulse1,
            pulse2,
            triangle,
            noise,
            dmc,
        } = levels;
        let (pulse_out, tnd_out) = match mode {
            MixingMode::Lookup => {
                let pulse = (pulse1 as usize + pulse2 as usize).min(PULSE_TABLE_LEN - 1);
                let tnd = (3 * triangle as usize + 2 * noise as usize + dmc as usize)
                    .min(TND_TABLE_LEN - 1);
                (self.pulse_table[pulse], self.tnd_table[tnd])
            }
            MixingMode::Linear => (
                0.00752 * (f32::from(pulse1) + f32::from(pulse2)),
                0.00851 * f32::from(triangle)
                    + 0.00494 * f32::from(noise)
                    + 0.00335 * f32::from(dmc),
            ),
        };

        let sample = 2.0 * (pulse_out + tnd_out) - 1.0;
        ((sample * f32::from(i16::MAX)) as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_level() {
        let mixer = Mixer::new();
        let silent = ChannelLevels::default();
        assert_eq!(mixer.mix(silent, MixingMode::Lookup), -32767);
        assert_eq!(mixer.mix(silent, MixingMode::Linear), -32767);
    }

    #[test]
    fn louder_channels_raise_the_sample() {
        let mixer = Mixer::new();
        let quiet = ChannelLevels {
            pulse1: 2,
            ..ChannelLevels::default()
        };
        let loud = ChannelLevels {
            pulse1: 15,
            triangle: 15,
            ..ChannelLevels::default()
        };
        assert!(mixer.mix(loud, MixingMode::Lookup) > mixer.mix(quiet, MixingMode::Lookup));
    }

    #[test]
    fn table_endpoints() {
        let mixer = Mixer::new();
        assert_eq!(mixer.pulse_table[0], 0.0);
        assert!((mixer.pulse_table[30] - 95.52 / (8128.0 / 30.0 + 100.0)).abs() < 1e-6);
        assert!((mixer.tnd_table[202] - 163.67 / (24329.0 / 202.0 + 100.0)).abs() < 1e-6);
    }
}
