//! Picture Processing Unit (PPU).
//!
//! The PPU advances one dot per [`Ppu::clock`] call across 341 dots by 262
//! scanlines. Scanlines 0-239 are visible, 240 is idle, 241-260 are vertical
//! blank and 261 is the pre-render line that primes the next frame.
//!
//! Background tiles are fetched on an 8-dot cadence (nametable, attribute,
//! pattern low, pattern high) into 16-bit shifters, while up to eight sprites
//! per line are evaluated at dot 257 and their patterns loaded at dot 340.
//! Each visible dot composites both layers into a 6-bit colour index.

pub mod frame;
pub mod pattern_bus;

mod registers;
mod sprite;

use core::fmt;

use tracing::trace;

use crate::{
    config::VideoOptions,
    error::Result,
    memory::ppu::{self as ppu_mem, Register as PpuRegister},
    state::{Savestate, StateReader, StateWriter},
};
pub use frame::FrameBuffer;
pub use pattern_bus::PpuBus;
use registers::{Mask, Registers, Status};
use sprite::{BYTES_PER_SPRITE, SPRITES_PER_LINE, SpriteAttributes, SpriteSlot};

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;

const VISIBLE_SCANLINES: u16 = 240;
const VBLANK_SCANLINE: u16 = 241;
const PRE_RENDER_SCANLINE: u16 = ppu_mem::SCANLINES_PER_FRAME - 1;
const LAST_DOT: u16 = ppu_mem::DOTS_PER_SCANLINE - 1;
/// Dot at which boards with a scanline counter see the sprite fetch A12 edge.
const SCANLINE_COUNTER_DOT: u16 = 260;
const PALETTE_RAM_SIZE: usize = 32;

/// Background fetch latches and the 16-bit shifters they feed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
struct Background {
    next_tile: u8,
    next_attribute: u8,
    next_pattern_lo: u8,
    next_pattern_hi: u8,
    pattern_lo: u16,
    pattern_hi: u16,
    attribute_lo: u16,
    attribute_hi: u16,
}

impl Background {
    /// Moves the fetched tile into the low byte of each shifter.
    fn load(&mut self) {
        let spread = |bit: bool| if bit { 0xFF } else { 0x00 };
        self.pattern_lo = (self.pattern_lo & 0xFF00) | u16::from(self.next_pattern_lo);
        self.pattern_hi = (self.pattern_hi & 0xFF00) | u16::from(self.next_pattern_hi);
        self.attribute_lo = (self.attribute_lo & 0xFF00) | spread(self.next_attribute & 1 != 0);
        self.attribute_hi = (self.attribute_hi & 0xFF00) | spread(self.next_attribute & 2 != 0);
    }

    fn shift(&mut self) {
        self.pattern_lo <<= 1;
        self.pattern_hi <<= 1;
        self.attribute_lo <<= 1;
        self.attribute_hi <<= 1;
    }

    /// Returns `(pixel, palette)` selected by the fine X scroll.
    fn pixel(&self, fine_x: u8) -> (u8, u8) {
        let mux: u16 = 0x8000 >> fine_x;
        let bit = |shifter: u16| u8::from(shifter & mux != 0);
        (
            (bit(self.pattern_hi) << 1) | bit(self.pattern_lo),
            (bit(self.attribute_hi) << 1) | bit(self.attribute_lo),
        )
    }
}

/// Picture processing unit with its video memory, OAM and frame buffer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ppu {
    registers: Registers,
    /// The console's 2 KiB of nametable RAM, arranged by the cartridge mirroring.
    nametables: [[u8; ppu_mem::NAMETABLE_SIZE]; 2],
    palettes: [u8; PALETTE_RAM_SIZE],
    /// Current dot (0..=340) within the active scanline.
    dot: u16,
    /// Current scanline (0..=261); 261 is pre-render.
    scanline: u16,
    odd_frame: bool,
    /// NMI raised but not yet collected by the console.
    nmi_pending: bool,
    background: Background,
    sprites: [SpriteSlot; SPRITES_PER_LINE],
    sprite_count: u8,
    /// OAM entry 0 is among the evaluated sprites for this line.
    sprite0_loaded: bool,
    frame: FrameBuffer,
}

impl fmt::Debug for Ppu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ppu")
            .field("registers", &self.registers)
            .field("dot", &self.dot)
            .field("scanline", &self.scanline)
            .field("odd_frame", &self.odd_frame)
            .field("sprite_count", &self.sprite_count)
            .finish_non_exhaustive()
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    /// Power-on state: cleared nametables, palette RAM at `$3F` and the beam
    /// parked on the last pre-render dot.
    pub fn new() -> Self {
        let mut ppu = Self {
            registers: Registers::new(),
            nametables: [[0; ppu_mem::NAMETABLE_SIZE]; 2],
            palettes: [0x3F; PALETTE_RAM_SIZE],
            dot: 0,
            scanline: 0,
            odd_frame: false,
            nmi_pending: false,
            background: Background::default(),
            sprites: [SpriteSlot::default(); SPRITES_PER_LINE],
            sprite_count: 0,
            sprite0_loaded: false,
            frame: FrameBuffer::new(),
        };
        ppu.reset();
        ppu
    }

    /// Reset button: control, mask and the write toggle are cleared and the
    /// beam returns to the end of the pre-render line.
    pub fn reset(&mut self) {
        self.registers.reset();
        self.odd_frame = false;
        self.scanline = PRE_RENDER_SCANLINE;
        self.dot = LAST_DOT;
    }

    pub fn dot(&self) -> u16 {
        self.dot
    }

    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    pub fn odd_frame(&self) -> bool {
        self.odd_frame
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Collects a pending NMI, clearing it.
    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_pending)
    }

    /// Direct OAM store used by sprite DMA.
    pub fn write_oam(&mut self, index: u8, data: u8) {
        self.registers.oam[usize::from(index)] = data;
    }

    pub fn oam(&self) -> &[u8] {
        &self.registers.oam
    }

    fn rendering_enabled(&self) -> bool {
        self.registers.mask.rendering_enabled()
    }

    /// Advances one dot.
    pub fn clock(&mut self, bus: &mut PpuBus<'_>, video: &VideoOptions) {
        let rendering = self.rendering_enabled();

        if self.scanline < VISIBLE_SCANLINES || self.scanline == PRE_RENDER_SCANLINE {
            self.render_dot(bus, rendering);
        }

        if self.scanline == VBLANK_SCANLINE && self.dot == 1 {
            self.registers.status.insert(Status::VERTICAL_BLANK);
            if self.registers.control.nmi_enabled() {
                self.nmi_pending = true;
            }
        }

        self.output_pixel(bus, video);

        self.dot += 1;
        if self.dot == SCANLINE_COUNTER_DOT
            && rendering
            && (self.scanline < VISIBLE_SCANLINES || self.scanline == PRE_RENDER_SCANLINE)
        {
            bus.count_scanline();
        }
        if self.dot > LAST_DOT {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline > PRE_RENDER_SCANLINE {
                self.scanline = 0;
                self.odd_frame = !self.odd_frame;
                // Odd frames drop the idle dot when rendering is on.
                if self.odd_frame && rendering {
                    self.dot = 1;
                }
            }
        }
    }

    fn render_dot(&mut self, bus: &PpuBus<'_>, rendering: bool) {
        let dot = self.dot;
        let pre_render = self.scanline == PRE_RENDER_SCANLINE;

        if pre_render && dot == 1 {
            self.registers.status = Status::empty();
            self.sprite0_loaded = false;
            self.sprites.iter_mut().for_each(SpriteSlot::clear_pattern);
        }

        if (2..=257).contains(&dot) || (321..=337).contains(&dot) {
            self.shift_pipelines();
            self.fetch_background(bus, rendering);
        }

        if dot == 256 && rendering {
            self.registers.vram.v.increment_y();
        }

        if dot == 257 {
            if rendering {
                let t = self.registers.vram.t;
                self.registers.vram.v.copy_x(t);
            }
            self.sprites.iter_mut().for_each(SpriteSlot::clear_pattern);
            self.evaluate_sprites(rendering);
        }

        if rendering && (257..=320).contains(&dot) {
            self.registers.oam_addr = 0;
        }

        if pre_render && rendering && (280..=304).contains(&dot) {
            let t = self.registers.vram.t;
            self.registers.vram.v.copy_y(t);
        }

        if dot == LAST_DOT {
            self.load_sprite_patterns(bus);
        }
    }

    fn shift_pipelines(&mut self) {
        let mask = self.registers.mask;
        if mask.background_enabled() {
            self.background.shift();
        }
        if mask.sprites_enabled() && self.dot < 258 {
            let count = usize::from(self.sprite_count);
            self.sprites[..count].iter_mut().for_each(SpriteSlot::tick);
        }
    }

    fn fetch_background(&mut self, bus: &PpuBus<'_>, rendering: bool) {
        let v = self.registers.vram.v;
        match (self.dot - 1) % 8 {
            0 => {
                self.background.load();
                self.background.next_tile = self.vram_read(bus, 0x2000 | (v.raw() & 0x0FFF));
            }
            2 => {
                let addr = ppu_mem::ATTRIBUTE_TABLE_BASE
                    | (v.raw() & 0x0C00)
                    | (u16::from(v.coarse_y() >> 2) << 3)
                    | u16::from(v.coarse_x() >> 2);
                let mut attribute = self.vram_read(bus, addr);
                if v.coarse_y() & 2 != 0 {
                    attribute >>= 4;
                }
                if v.coarse_x() & 2 != 0 {
                    attribute >>= 2;
                }
                self.background.next_attribute = attribute & 0b11;
            }
            4 => {
                let addr = self.background_pattern_addr(v.fine_y());
                self.background.next_pattern_lo = self.vram_read(bus, addr);
            }
            6 => {
                let addr = self.background_pattern_addr(v.fine_y()) + 8;
                self.background.next_pattern_hi = self.vram_read(bus, addr);
            }
            7 if rendering => self.registers.vram.v.increment_x(),
            _ => {}
        }
    }

    fn background_pattern_addr(&self, fine_y: u8) -> u16 {
        self.registers.control.background_pattern_table()
            + u16::from(self.background.next_tile) * 16
            + u16::from(fine_y)
    }

    /// Picks the first eight OAM entries that cover this scanline. A ninth
    /// match sets the overflow flag; the hardware's diagonal scan bug is not
    /// reproduced.
    fn evaluate_sprites(&mut self, rendering: bool) {
        self.sprite_count = 0;
        self.sprite0_loaded = false;
        if !rendering || self.scanline >= VISIBLE_SCANLINES {
            return;
        }

        let height = self.registers.control.sprite_height();
        let scanline = self.scanline as i16;
        for (index, entry) in self.registers.oam.chunks_exact(BYTES_PER_SPRITE).enumerate() {
            let row = scanline - i16::from(entry[0]);
            if !(0..height).contains(&row) {
                continue;
            }
            if usize::from(self.sprite_count) == SPRITES_PER_LINE {
                self.registers.status.insert(Status::SPRITE_OVERFLOW);
                break;
            }
            if index == 0 {
                self.sprite0_loaded = true;
            }
            self.sprites[usize::from(self.sprite_count)] = SpriteSlot::from_oam(entry);
            self.sprite_count += 1;
        }
    }

    fn load_sprite_patterns(&mut self, bus: &PpuBus<'_>) {
        let control = self.registers.control;
        for i in 0..usize::from(self.sprite_count) {
            let slot = self.sprites[i];
            let flip_v = slot.attributes.contains(SpriteAttributes::FLIP_VERTICAL);
            let mut row = self.scanline.wrapping_sub(u16::from(slot.y));

            let addr = if control.sprite_height() == 16 {
                if flip_v {
                    row = 15 - row;
                }
                let table = u16::from(slot.tile & 1) * ppu_mem::PATTERN_TABLE_1;
                let tile = u16::from(slot.tile & 0xFE) + u16::from(row >= 8);
                table + tile * 16 + (row & 7)
            } else {
                if flip_v {
                    row = 7 - row;
                }
                control.sprite_pattern_table() + u16::from(slot.tile) * 16 + row
            };

            let mut lo = self.vram_read(bus, addr);
            let mut hi = self.vram_read(bus, addr + 8);
            if slot.attributes.contains(SpriteAttributes::FLIP_HORIZONTAL) {
                lo = lo.reverse_bits();
                hi = hi.reverse_bits();
            }
            self.sprites[i].pattern_lo = lo;
            self.sprites[i].pattern_hi = hi;
        }
    }

    /// Composites the current dot into the frame buffer.
    fn output_pixel(&mut self, bus: &PpuBus<'_>, video: &VideoOptions) {
        if self.scanline >= VISIBLE_SCANLINES || !(1..=256).contains(&self.dot) {
            return;
        }
        let x = usize::from(self.dot - 1);
        let y = usize::from(self.scanline);
        let mask = self.registers.mask;

        let show_bg = mask.background_enabled()
            && (x >= 8 || mask.contains(Mask::SHOW_BACKGROUND_LEFT));
        let show_fg =
            mask.sprites_enabled() && (x >= 8 || mask.contains(Mask::SHOW_SPRITES_LEFT));

        let (mut bg_pixel, bg_palette) = if show_bg {
            self.background.pixel(self.registers.vram.x)
        } else {
            (0, 0)
        };

        let mut fg_pixel = 0;
        let mut fg_palette = 0;
        let mut fg_behind = false;
        let mut is_sprite0 = false;
        if show_fg {
            let count = usize::from(self.sprite_count);
            let front = self.sprites[..count]
                .iter()
                .enumerate()
                .find(|(_, slot)| slot.x == 0 && slot.pixel() != 0);
            if let Some((index, slot)) = front {
                fg_pixel = slot.pixel();
                fg_palette = slot.attributes.palette() + 4;
                fg_behind = slot
                    .attributes
                    .contains(SpriteAttributes::PRIORITY_BEHIND_BACKGROUND);
                is_sprite0 = index == 0 && self.sprite0_loaded;
            }
        }

        if is_sprite0 && bg_pixel != 0 && fg_pixel != 0 {
            if !self.registers.status.contains(Status::SPRITE_ZERO_HIT) {
                trace!(x, y, "sprite 0 hit");
            }
            self.registers.status.insert(Status::SPRITE_ZERO_HIT);
        }

        if !video.show_background {
            bg_pixel = 0;
        }
        if !video.show_sprites {
            fg_pixel = 0;
        }

        let (pixel, palette) = match (bg_pixel, fg_pixel) {
            (0, 0) => (0, 0),
            (0, _) => (fg_pixel, fg_palette),
            (_, 0) => (bg_pixel, bg_palette),
            _ if fg_behind => (bg_pixel, bg_palette),
            _ => (fg_pixel, fg_palette),
        };

        let mut colour = self.vram_read(
            bus,
            ppu_mem::PALETTE_BASE + u16::from(palette) * 4 + u16::from(pixel),
        );
        if video.hide_border && (x < 8 || y < 8 || x >= SCREEN_WIDTH - 8 || y >= SCREEN_HEIGHT - 8)
        {
            colour = frame::BLACK;
        }
        if video.greyscale {
            colour &= 0x30;
        }
        self.frame.set(x, y, colour);
    }

    fn palette_index(addr: u16) -> usize {
        let index = usize::from(addr & 0x1F);
        // $3F10/$3F14/$3F18/$3F1C alias the background entries.
        if index >= 0x10 && index & 3 == 0 {
            index - 0x10
        } else {
            index
        }
    }

    /// PPU address space read. The cartridge gets first claim.
    fn vram_read(&self, bus: &PpuBus<'_>, addr: u16) -> u8 {
        let addr = addr & ppu_mem::VRAM_MIRROR_MASK;
        if let Some(value) = bus.read(addr) {
            return value;
        }
        match addr {
            0..ppu_mem::PATTERN_TABLE_END => 0,
            ppu_mem::NAMETABLE_BASE..ppu_mem::PALETTE_BASE => {
                let table = bus.mirroring().table(addr);
                self.nametables[table][usize::from(addr) & (ppu_mem::NAMETABLE_SIZE - 1)]
            }
            _ => {
                let colour = self.palettes[Self::palette_index(addr)];
                if self.registers.mask.greyscale() {
                    colour & 0x30
                } else {
                    colour
                }
            }
        }
    }

    fn vram_write(&mut self, bus: &mut PpuBus<'_>, addr: u16, data: u8) {
        let addr = addr & ppu_mem::VRAM_MIRROR_MASK;
        if bus.write(addr, data) {
            return;
        }
        match addr {
            0..ppu_mem::PATTERN_TABLE_END => {}
            ppu_mem::NAMETABLE_BASE..ppu_mem::PALETTE_BASE => {
                let table = bus.mirroring().table(addr);
                self.nametables[table][usize::from(addr) & (ppu_mem::NAMETABLE_SIZE - 1)] = data;
            }
            _ => self.palettes[Self::palette_index(addr)] = data & 0x3F,
        }
    }

    /// CPU read of `$2000-$3FFF`. Write-only registers return the open bus latch.
    pub fn cpu_read(&mut self, addr: u16, bus: &mut PpuBus<'_>) -> u8 {
        let value = match PpuRegister::from_cpu_addr(addr) {
            PpuRegister::Status => self.registers.read_status(),
            PpuRegister::OamData => self.registers.oam[usize::from(self.registers.oam_addr)],
            PpuRegister::Data => self.read_data(bus),
            _ => self.registers.open_bus,
        };
        self.registers.open_bus = value;
        value
    }

    /// Side-effect free view of what a CPU read would return.
    pub fn peek(&self, addr: u16) -> u8 {
        match PpuRegister::from_cpu_addr(addr) {
            PpuRegister::Status => (self.registers.open_bus & 0x1F) | self.registers.status.bits(),
            PpuRegister::OamData => self.registers.oam[usize::from(self.registers.oam_addr)],
            PpuRegister::Data => self.registers.vram_buffer,
            _ => self.registers.open_bus,
        }
    }

    fn read_data(&mut self, bus: &PpuBus<'_>) -> u8 {
        let addr = self.registers.vram.v.raw() & ppu_mem::VRAM_MIRROR_MASK;
        let value = if addr >= ppu_mem::PALETTE_BASE {
            // Palette reads are immediate; the buffer picks up the nametable underneath.
            self.registers.vram_buffer = self.vram_read(bus, addr & 0x2FFF);
            self.vram_read(bus, addr)
        } else {
            let buffered = self.registers.vram_buffer;
            self.registers.vram_buffer = self.vram_read(bus, addr);
            buffered
        };
        let step = self.registers.control.vram_increment();
        self.registers.vram.v.increment(step);
        value
    }

    /// CPU write of `$2000-$3FFF`.
    pub fn cpu_write(&mut self, addr: u16, data: u8, bus: &mut PpuBus<'_>) {
        self.registers.open_bus = data;
        match PpuRegister::from_cpu_addr(addr) {
            PpuRegister::Control => {
                let was_enabled = self.registers.control.nmi_enabled();
                self.registers.write_control(data);
                // Enabling NMI inside vblank fires immediately.
                if !was_enabled
                    && self.registers.control.nmi_enabled()
                    && self.registers.status.contains(Status::VERTICAL_BLANK)
                {
                    self.nmi_pending = true;
                }
            }
            PpuRegister::Mask => self.registers.mask = Mask::from_bits_retain(data),
            PpuRegister::Status => {}
            PpuRegister::OamAddr => self.registers.oam_addr = data,
            PpuRegister::OamData => self.registers.write_oam_data(data),
            PpuRegister::Scroll => self.registers.vram.write_scroll(data),
            PpuRegister::Addr => self.registers.vram.write_addr(data),
            PpuRegister::Data => {
                let addr = self.registers.vram.v.raw();
                self.vram_write(bus, addr, data);
                let step = self.registers.control.vram_increment();
                self.registers.vram.v.increment(step);
            }
        }
    }
}

impl Savestate for Ppu {
    fn save(&self, w: &mut StateWriter) {
        for table in &self.nametables {
            w.bytes(table);
        }
        w.bytes(&self.palettes);
        w.u16(self.dot);
        w.u16(self.scanline);
        w.bool(self.odd_frame);
        w.bool(self.nmi_pending);

        let bg = &self.background;
        w.u8(bg.next_tile);
        w.u8(bg.next_attribute);
        w.u8(bg.next_pattern_lo);
        w.u8(bg.next_pattern_hi);
        w.u16(bg.pattern_lo);
        w.u16(bg.pattern_hi);
        w.u16(bg.attribute_lo);
        w.u16(bg.attribute_hi);

        self.registers.save(w);

        w.u8(self.sprite_count);
        for slot in &self.sprites {
            w.bytes(&[
                slot.y,
                slot.tile,
                slot.attributes.bits(),
                slot.x,
                slot.pattern_lo,
                slot.pattern_hi,
            ]);
        }
        w.bool(self.sprite0_loaded);
        w.bytes(self.frame.pixels());
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        for table in &mut self.nametables {
            r.bytes_into(table)?;
        }
        r.bytes_into(&mut self.palettes)?;
        self.dot = r.u16()?;
        self.scanline = r.u16()?;
        if self.dot > LAST_DOT || self.scanline > PRE_RENDER_SCANLINE {
            return Err(crate::error::Error::StateInvalid("ppu position"));
        }
        self.odd_frame = r.bool()?;
        self.nmi_pending = r.bool()?;

        let bg = &mut self.background;
        bg.next_tile = r.u8()?;
        bg.next_attribute = r.u8()? & 0b11;
        bg.next_pattern_lo = r.u8()?;
        bg.next_pattern_hi = r.u8()?;
        bg.pattern_lo = r.u16()?;
        bg.pattern_hi = r.u16()?;
        bg.attribute_lo = r.u16()?;
        bg.attribute_hi = r.u16()?;

        self.registers.load(r)?;

        let count = r.u8()?;
        if usize::from(count) > SPRITES_PER_LINE {
            return Err(crate::error::Error::StateInvalid("sprite count"));
        }
        self.sprite_count = count;
        for slot in &mut self.sprites {
            let mut raw = [0u8; 6];
            r.bytes_into(&mut raw)?;
            *slot = SpriteSlot {
                y: raw[0],
                tile: raw[1],
                attributes: SpriteAttributes::from_bits_retain(raw[2]),
                x: raw[3],
                pattern_lo: raw[4],
                pattern_hi: raw[5],
            };
        }
        self.sprite0_loaded = r.bool()?;
        r.bytes_into(self.frame.as_mut_slice())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::{Cartridge, load_cartridge};

    const FRAME_DOTS: u32 = 341 * 262;

    /// NROM with 8 KiB CHR RAM and vertical mirroring.
    fn chr_ram_cartridge() -> Cartridge {
        let mut rom = vec![b'N', b'E', b'S', 0x1A, 1, 0, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        rom.extend(vec![0; 16 * 1024]);
        load_cartridge(&rom).expect("valid image")
    }

    fn run(ppu: &mut Ppu, bus: &mut PpuBus<'_>, dots: u32) {
        let video = VideoOptions::default();
        for _ in 0..dots {
            ppu.clock(bus, &video);
        }
    }

    fn run_until(ppu: &mut Ppu, bus: &mut PpuBus<'_>, scanline: u16, dot: u16) {
        let video = VideoOptions::default();
        while !(ppu.scanline == scanline && ppu.dot == dot) {
            ppu.clock(bus, &video);
        }
    }

    fn set_addr(ppu: &mut Ppu, bus: &mut PpuBus<'_>, addr: u16) {
        ppu.cpu_write(0x2006, (addr >> 8) as u8, bus);
        ppu.cpu_write(0x2006, addr as u8, bus);
    }

    #[test]
    fn power_on_parks_on_pre_render() {
        let ppu = Ppu::new();
        assert_eq!((ppu.scanline(), ppu.dot()), (261, 340));
        assert_eq!(ppu.frame().get(0, 0), Some(frame::BLACK));
    }

    #[test]
    fn vblank_raises_nmi_when_enabled() {
        let mut ppu = Ppu::new();
        let mut bus = PpuBus::default();
        ppu.cpu_write(0x2000, 0x80, &mut bus);
        run_until(&mut ppu, &mut bus, 241, 2);
        assert!(ppu.take_nmi());
        assert!(!ppu.take_nmi());

        let status = ppu.cpu_read(0x2002, &mut bus);
        assert_eq!(status & 0x80, 0x80);
        assert_eq!(ppu.cpu_read(0x2002, &mut bus) & 0x80, 0);
    }

    #[test]
    fn vblank_without_nmi_enable_stays_quiet() {
        let mut ppu = Ppu::new();
        let mut bus = PpuBus::default();
        run_until(&mut ppu, &mut bus, 241, 2);
        assert!(!ppu.take_nmi());

        // Enabling NMI while vblank is still set fires at once.
        ppu.cpu_write(0x2000, 0x80, &mut bus);
        assert!(ppu.take_nmi());
    }

    #[test]
    fn pre_render_clears_status() {
        let mut ppu = Ppu::new();
        let mut bus = PpuBus::default();
        run_until(&mut ppu, &mut bus, 241, 2);
        run_until(&mut ppu, &mut bus, 261, 2);
        assert_eq!(ppu.peek(0x2002) & 0xE0, 0);
    }

    #[test]
    fn data_reads_are_buffered_below_palette() {
        let mut ppu = Ppu::new();
        let mut bus = PpuBus::default();
        set_addr(&mut ppu, &mut bus, 0x2400);
        ppu.cpu_write(0x2007, 0xAB, &mut bus);
        ppu.cpu_write(0x2007, 0xCD, &mut bus);

        set_addr(&mut ppu, &mut bus, 0x2400);
        let _ = ppu.cpu_read(0x2007, &mut bus);
        assert_eq!(ppu.cpu_read(0x2007, &mut bus), 0xAB);
        assert_eq!(ppu.cpu_read(0x2007, &mut bus), 0xCD);
    }

    #[test]
    fn palette_reads_are_immediate_and_mirrored() {
        let mut ppu = Ppu::new();
        let mut bus = PpuBus::default();
        set_addr(&mut ppu, &mut bus, 0x3F10);
        ppu.cpu_write(0x2007, 0x2C, &mut bus);

        set_addr(&mut ppu, &mut bus, 0x3F00);
        assert_eq!(ppu.cpu_read(0x2007, &mut bus), 0x2C);

        set_addr(&mut ppu, &mut bus, 0x3F11);
        ppu.cpu_write(0x2007, 0x01, &mut bus);
        assert_eq!(ppu.palettes[0x01], 0x3F);
        assert_eq!(ppu.palettes[0x11], 0x01);
    }

    #[test]
    fn increment_32_walks_columns() {
        let mut ppu = Ppu::new();
        let mut bus = PpuBus::default();
        ppu.cpu_write(0x2000, 0x04, &mut bus);
        set_addr(&mut ppu, &mut bus, 0x2000);
        ppu.cpu_write(0x2007, 1, &mut bus);
        ppu.cpu_write(0x2007, 2, &mut bus);
        assert_eq!(ppu.nametables[0][32], 2);
    }

    #[test]
    fn nametables_follow_cartridge_mirroring() {
        let mut cart = chr_ram_cartridge();
        let mut bus = PpuBus::new(Some(&mut cart));
        let mut ppu = Ppu::new();
        set_addr(&mut ppu, &mut bus, 0x2805);
        ppu.cpu_write(0x2007, 0x77, &mut bus);
        assert_eq!(ppu.nametables[0][5], 0x77);
    }

    #[test]
    fn frame_is_341_by_262_dots_when_idle() {
        let mut ppu = Ppu::new();
        let mut bus = PpuBus::default();
        run_until(&mut ppu, &mut bus, 0, 1);
        for _ in 0..3 {
            let mut dots = 0;
            loop {
                ppu.clock(&mut bus, &VideoOptions::default());
                dots += 1;
                if ppu.scanline == 0 && ppu.dot == 1 {
                    break;
                }
            }
            assert_eq!(dots, FRAME_DOTS);
        }
    }

    #[test]
    fn odd_frames_skip_a_dot_while_rendering() {
        let mut ppu = Ppu::new();
        let mut bus = PpuBus::default();
        ppu.cpu_write(0x2001, 0x08, &mut bus);
        run_until(&mut ppu, &mut bus, 0, 1);

        let mut lengths = Vec::new();
        for _ in 0..4 {
            let mut dots = 0;
            loop {
                ppu.clock(&mut bus, &VideoOptions::default());
                dots += 1;
                if ppu.scanline == 0 && ppu.dot == 1 {
                    break;
                }
            }
            lengths.push((dots, ppu.odd_frame()));
        }
        for (dots, odd) in lengths {
            let expected = if odd { FRAME_DOTS - 1 } else { FRAME_DOTS };
            assert_eq!(dots, expected);
        }
    }

    #[test]
    fn ninth_sprite_sets_overflow() {
        let mut ppu = Ppu::new();
        let mut bus = PpuBus::default();
        for i in 0..9 {
            ppu.write_oam(i * 4, 20);
        }
        for i in 9..64 {
            ppu.write_oam(i * 4, 0xF0);
        }
        ppu.cpu_write(0x2001, 0x10, &mut bus);
        run_until(&mut ppu, &mut bus, 21, 258);
        assert_eq!(ppu.sprite_count, 8);
        assert!(ppu.sprite0_loaded);
        assert_eq!(ppu.peek(0x2002) & 0x20, 0x20);
    }

    /// Solid tile 1 everywhere, colour 1 = $21, sprite 0 on top at (40, 31).
    fn solid_scene(ppu: &mut Ppu, bus: &mut PpuBus<'_>) {
        set_addr(ppu, bus, 0x0010);
        for _ in 0..8 {
            ppu.cpu_write(0x2007, 0xFF, bus);
        }
        set_addr(ppu, bus, 0x2000);
        for _ in 0..0x3C0 {
            ppu.cpu_write(0x2007, 0x01, bus);
        }
        set_addr(ppu, bus, 0x3F01);
        ppu.cpu_write(0x2007, 0x21, bus);
        set_addr(ppu, bus, 0x3F11);
        ppu.cpu_write(0x2007, 0x16, bus);
        set_addr(ppu, bus, 0x0000);

        for i in 0..64 {
            ppu.write_oam(i * 4, 0xF0);
        }
        ppu.write_oam(0, 30);
        ppu.write_oam(1, 1);
        ppu.write_oam(2, 0);
        ppu.write_oam(3, 40);
    }

    #[test]
    fn renders_background_and_sprite_zero_hit() {
        let mut cart = chr_ram_cartridge();
        let mut bus = PpuBus::new(Some(&mut cart));
        let mut ppu = Ppu::new();
        solid_scene(&mut ppu, &mut bus);
        ppu.cpu_write(0x2001, 0x1E, &mut bus);

        run_until(&mut ppu, &mut bus, 0, 1);
        run(&mut ppu, &mut bus, FRAME_DOTS);
        run_until(&mut ppu, &mut bus, 31, 50);

        assert_eq!(ppu.peek(0x2002) & 0x40, 0x40);
        assert_eq!(ppu.frame().get(100, 100), Some(0x21));
        assert_eq!(ppu.frame().get(40, 31), Some(0x16));
        assert_eq!(ppu.frame().get(39, 31), Some(0x21));
    }

    #[test]
    fn left_clip_hides_both_layers() {
        let mut cart = chr_ram_cartridge();
        let mut bus = PpuBus::new(Some(&mut cart));
        let mut ppu = Ppu::new();
        solid_scene(&mut ppu, &mut bus);
        ppu.write_oam(3, 0);
        ppu.cpu_write(0x2001, 0x18, &mut bus);

        run_until(&mut ppu, &mut bus, 0, 1);
        run(&mut ppu, &mut bus, FRAME_DOTS);

        assert_eq!(ppu.frame().get(3, 31), Some(0x3F));
        assert_eq!(ppu.frame().get(8, 31), Some(0x21));
        assert_eq!(ppu.peek(0x2002) & 0x40, 0);
    }

    #[test]
    fn state_round_trip_preserves_everything() {
        let mut ppu = Ppu::new();
        let mut bus = PpuBus::default();
        ppu.cpu_write(0x2000, 0x90, &mut bus);
        ppu.write_oam(7, 0x42);
        run(&mut ppu, &mut bus, 12_345);

        let mut w = StateWriter::new();
        ppu.save(&mut w);
        let bytes = w.into_bytes();

        let mut restored = Ppu::new();
        let mut r = StateReader::new(&bytes);
        restored.load(&mut r).expect("load");
        r.finish().expect("no trailing bytes");
        assert_eq!(restored, ppu);
    }
}
