//! Host-tunable emulation options.
//!
//! None of these knobs change CPU or PPU timing; they only affect how the
//! produced audio and video are post-processed.

/// Output sample rate used when the host does not pick one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// How the four channel amplitudes are combined into one sample.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MixingMode {
    /// Non-linear lookup tables modelling the DAC resistor network.
    #[default]
    Lookup,
    /// Linear approximation of the same curves.
    Linear,
}

/// Master switches applied when pixels reach the frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VideoOptions {
    /// Draw the background layer (ANDed with PPUMASK).
    pub show_background: bool,
    /// Draw the sprite layer (ANDed with PPUMASK).
    pub show_sprites: bool,
    /// Strip hue from every output pixel.
    pub greyscale: bool,
    /// Paint the outer 8 pixel border black, hiding overscan garbage.
    pub hide_border: bool,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            show_background: true,
            show_sprites: true,
            greyscale: false,
            hide_border: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub sample_rate: u32,
    pub mixing: MixingMode,
    /// Per-channel gain for pulse 1, pulse 2, triangle and noise.
    pub channel_volumes: [f32; 4],
    pub video: VideoOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            mixing: MixingMode::default(),
            channel_volumes: [1.0; 4],
            video: VideoOptions::default(),
        }
    }
}
