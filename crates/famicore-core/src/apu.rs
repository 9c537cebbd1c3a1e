//! Audio Processing Unit (APU).
//!
//! The NES APU exposes programmable sound generators (2x pulse, triangle,
//! noise) behind a small set of CPU-visible registers. Each hardware block
//! lives in its own submodule; this type owns them by value, routes register
//! writes, applies frame sequencer ticks and turns channel levels into
//! samples at the host's output rate.
//!
//! The DMC registers are decoded but the channel always outputs zero.

mod divider;
mod envelope;
mod frame_counter;
mod length_counter;
mod linear_counter;
mod mixer;
mod noise;
mod pulse;
mod sweep;
mod timer;
mod triangle;

use core::fmt;

use crate::{
    config::Config,
    error::Result,
    memory::{apu as apu_mem, ppu as ppu_mem},
    state::{Savestate, StateReader, StateWriter},
};

pub use frame_counter::FrameCounterMode;

use frame_counter::{FrameCounter, FrameTick};
use mixer::{ChannelLevels, Mixer};
use noise::Noise;
use pulse::Pulse;
use sweep::Negation;
use triangle::Triangle;

/// Master clocks per APU/CPU cycle.
const MASTER_CLOCKS_PER_CYCLE: u8 = 3;

/// Duration of one master tick in seconds: a frame is 341 x 262 dots (minus
/// the skipped half dot) at 60 frames per second.
const MASTER_TICK_SECONDS: f64 =
    1.0 / ((ppu_mem::DOTS_PER_SCANLINE as f64 * ppu_mem::SCANLINES_PER_FRAME as f64 - 0.5) * 60.0);

#[derive(Clone)]
pub struct Apu {
    pulse1: Pulse,
    pulse2: Pulse,
    triangle: Triangle,
    noise: Noise,
    frame_counter: FrameCounter,
    mixer: Mixer,
    /// Last value written to the `$4015` enable bits.
    enabled: u8,
    /// Pulse and noise timers only advance on every other CPU cycle.
    even_cycle: bool,
    clock_number: u8,
    /// Seconds accumulated since the last emitted sample.
    time: f64,
    samples: Vec<i16>,
}

impl fmt::Debug for Apu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Apu")
            .field("frame_counter", &self.frame_counter)
            .field("enabled", &self.enabled)
            .field("clock_number", &self.clock_number)
            .field("queued_samples", &self.samples.len())
            .finish()
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Apu {
    pub fn new() -> Self {
        Self {
            pulse1: Pulse::new(Negation::OnesComplement),
            pulse2: Pulse::new(Negation::TwosComplement),
            triangle: Triangle::default(),
            noise: Noise::default(),
            frame_counter: FrameCounter::default(),
            mixer: Mixer::new(),
            enabled: 0,
            even_cycle: true,
            clock_number: 0,
            time: 0.0,
            samples: Vec::new(),
        }
    }

    /// Console reset: silences every channel through the same writes a
    /// program would perform.
    pub fn reset(&mut self) {
        self.even_cycle = true;
        self.cpu_write(apu_mem::FRAME_COUNTER, 0x00);
        self.cpu_write(apu_mem::STATUS, 0x00);
        for addr in 0x4000..=0x400F {
            self.cpu_write(addr, 0x00);
        }
    }

    pub fn cpu_write(&mut self, addr: u16, value: u8) {
        let Some(reg) = apu_mem::Register::from_cpu_addr(addr) else {
            return;
        };

        use apu_mem::Register;
        match reg {
            Register::Pulse1Control
            | Register::Pulse1Sweep
            | Register::Pulse1TimerLow
            | Register::Pulse1TimerHigh => self.pulse1.write(addr, value),
            Register::Pulse2Control
            | Register::Pulse2Sweep
            | Register::Pulse2TimerLow
            | Register::Pulse2TimerHigh => self.pulse2.write(addr, value),
            Register::TriangleControl | Register::TriangleTimerLow | Register::TriangleTimerHigh => {
                self.triangle.write(addr, value)
            }
            Register::NoiseControl | Register::NoiseModeAndPeriod | Register::NoiseLength => {
                self.noise.write(addr, value)
            }
            Register::Dmc => {}
            Register::Status => self.write_status(value),
            Register::FrameCounter => {
                let tick = self.frame_counter.write(value);
                self.apply_frame_tick(tick);
            }
        }
    }

    /// Only `$4015` is readable. Reading it acknowledges the frame IRQ.
    pub fn cpu_read(&mut self, addr: u16) -> u8 {
        if addr != apu_mem::STATUS {
            return 0;
        }
        let value = self.peek_status();
        self.frame_counter.clear_irq();
        value
    }

    /// `$4015` contents without acknowledging the frame IRQ.
    pub fn peek_status(&self) -> u8 {
        let mut value = 0u8;
        value |= u8::from(!self.pulse1.length().silenced());
        value |= u8::from(!self.pulse2.length().silenced()) << 1;
        value |= u8::from(!self.triangle.length().silenced()) << 2;
        value |= u8::from(!self.noise.length().silenced()) << 3;
        value |= u8::from(self.frame_counter.irq_pending()) << 6;
        value
    }

    fn write_status(&mut self, value: u8) {
        self.enabled = value & 0x0F;
        self.pulse1.length_mut().set_enabled(value & 0b0000_0001 != 0);
        self.pulse2.length_mut().set_enabled(value & 0b0000_0010 != 0);
        self.triangle
            .length_mut()
            .set_enabled(value & 0b0000_0100 != 0);
        self.noise.length_mut().set_enabled(value & 0b0000_1000 != 0);
    }

    /// Frame interrupt line (level triggered).
    pub fn irq_pending(&self) -> bool {
        self.frame_counter.irq_pending()
    }

    pub fn frame_counter_mode(&self) -> FrameCounterMode {
        self.frame_counter.mode()
    }

    /// Advances one master tick. Channels move once every third tick and
    /// zero or more samples are queued depending on the output rate.
    pub fn clock(&mut self, config: &Config) {
        if self.clock_number == MASTER_CLOCKS_PER_CYCLE {
            self.clock_number = 0;
            let tick = self.frame_counter.clock();
            self.apply_frame_tick(tick);

            self.triangle.clock_timer();
            if self.even_cycle {
                self.pulse1.clock_timer();
                self.pulse2.clock_timer();
                self.noise.clock_timer();
            }
            self.even_cycle = !self.even_cycle;
        }
        self.clock_number += 1;

        if config.sample_rate == 0 {
            return;
        }
        let sample_period = 1.0 / f64::from(config.sample_rate);
        self.time += MASTER_TICK_SECONDS;
        while self.time >= sample_period {
            self.time -= sample_period;
            let sample = self.sample(config);
            self.samples.push(sample);
        }
    }

    fn apply_frame_tick(&mut self, tick: FrameTick) {
        if tick.quarter {
            self.pulse1.clock_quarter_frame();
            self.pulse2.clock_quarter_frame();
            self.triangle.clock_quarter_frame();
            self.noise.clock_quarter_frame();
        }
        if tick.half {
            self.pulse1.clock_half_frame();
            self.pulse2.clock_half_frame();
            self.triangle.clock_half_frame();
            self.noise.clock_half_frame();
        }
    }

    /// Mixes the current channel outputs into one sample.
    pub fn sample(&self, config: &Config) -> i16 {
        let scale = |level: u8, channel: usize| (f32::from(level) * config.channel_volumes[channel]) as u8;
        let levels = ChannelLevels {
            pulse1: scale(self.pulse1.value(), 0),
            pulse2: scale(self.pulse2.value(), 1),
            triangle: scale(self.triangle.value(), 2),
            noise: scale(self.noise.value(), 3),
            dmc: 0,
        };
        self.mixer.mix(levels, config.mixing)
    }

    /// Drains every sample produced since the previous call.
    pub fn take_samples(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.samples)
    }
}

impl Savestate for Apu {
    fn save(&self, w: &mut StateWriter) {
        w.u8(self.enabled);
        w.bool(self.even_cycle);
        w.f64(self.time);
        w.u8(self.clock_number);
        self.frame_counter.save(w);
        self.pulse1.save(w);
        self.pulse2.save(w);
        self.triangle.save(w);
        self.noise.save(w);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.enabled = r.u8()? & 0x0F;
        self.even_cycle = r.bool()?;
        self.time = r.f64()?;
        self.clock_number = r.u8()?;
        if self.clock_number > MASTER_CLOCKS_PER_CYCLE {
            return Err(crate::error::Error::StateInvalid("apu clock phase"));
        }
        self.frame_counter.load(r)?;
        self.pulse1.load(r)?;
        self.pulse2.load(r)?;
        self.triangle.load(r)?;
        self.noise.load(r)?;
        self.samples.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_cpu_cycles(apu: &mut Apu, config: &Config, cycles: usize) {
        for _ in 0..cycles * MASTER_CLOCKS_PER_CYCLE as usize {
            apu.clock(config);
        }
    }

    #[test]
    fn status_enables_channels_and_length_counters() {
        let mut apu = Apu::new();
        apu.cpu_write(apu_mem::STATUS, 0b0000_0001);
        apu.cpu_write(0x4003, 0b1111_1000);
        assert_eq!(apu.cpu_read(apu_mem::STATUS) & 0x01, 0x01);

        apu.cpu_write(apu_mem::STATUS, 0);
        assert_eq!(apu.cpu_read(apu_mem::STATUS) & 0x01, 0);
    }

    #[test]
    fn length_load_ignored_while_disabled() {
        let mut apu = Apu::new();
        apu.cpu_write(0x400F, 0b0000_1000);
        assert_eq!(apu.cpu_read(apu_mem::STATUS) & 0x08, 0);
    }

    #[test]
    fn frame_irq_flag_set_and_acknowledged_by_status_read() {
        let config = Config::default();
        let mut apu = Apu::new();
        apu.cpu_write(apu_mem::FRAME_COUNTER, 0);
        run_cpu_cycles(&mut apu, &config, 29_831);
        assert!(apu.irq_pending());

        let first = apu.cpu_read(apu_mem::STATUS);
        assert_eq!(first & 0b0100_0000, 0b0100_0000);
        assert!(!apu.irq_pending());
        let second = apu.cpu_read(apu_mem::STATUS);
        assert_eq!(second & 0b0100_0000, 0);
    }

    #[test]
    fn frame_counter_configuration() {
        let mut apu = Apu::new();
        apu.cpu_write(apu_mem::FRAME_COUNTER, 0b1000_0000);
        assert_eq!(apu.frame_counter_mode(), FrameCounterMode::FiveStep);
        apu.cpu_write(apu_mem::FRAME_COUNTER, 0);
        assert_eq!(apu.frame_counter_mode(), FrameCounterMode::FourStep);
    }

    #[test]
    fn silent_apu_outputs_negative_full_scale() {
        let config = Config::default();
        let apu = Apu::new();
        assert_eq!(apu.sample(&config), -32767);
    }

    #[test]
    fn sample_count_tracks_output_rate() {
        let config = Config::default();
        let mut apu = Apu::new();
        // One NTSC frame of master ticks.
        for _ in 0..341 * 262 {
            apu.clock(&config);
        }
        let produced = apu.take_samples().len();
        assert!((734..=736).contains(&produced), "got {produced}");
        assert!(apu.take_samples().is_empty());
    }

    #[test]
    fn zero_channel_volume_mutes_channel() {
        let mut config = Config::default();
        let mut apu = Apu::new();
        apu.cpu_write(apu_mem::STATUS, 0x01);
        apu.cpu_write(0x4000, 0b0011_1111);
        apu.cpu_write(0x4002, 0x80);
        apu.cpu_write(0x4003, 0x00);
        run_cpu_cycles(&mut apu, &config, 0x200);
        config.channel_volumes[0] = 0.0;
        assert_eq!(apu.sample(&config), -32767);
    }

    #[test]
    fn reset_silences_channels() {
        let mut apu = Apu::new();
        apu.cpu_write(apu_mem::STATUS, 0x0F);
        apu.cpu_write(0x4003, 0xF8);
        apu.reset();
        assert_eq!(apu.peek_status() & 0x0F, 0);
    }
}
