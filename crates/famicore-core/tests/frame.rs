mod common;

use anyhow::Result;
use common::{RomBuilder, boot, ticks_to_next_frame};
use famicore_core::{Nes, palette, ppu::SCREEN_WIDTH};

const DOTS_PER_FRAME: u64 = 341 * 262;

/// Writes `$21` to the universal background colour, then turns on the
/// background layer (including the left column) and spins.
fn backdrop_rom() -> Vec<u8> {
    RomBuilder::nrom()
        .program(&[
            0xA9, 0x3F, // LDA #$3F
            0x8D, 0x06, 0x20, // STA $2006
            0xA9, 0x00, // LDA #$00
            0x8D, 0x06, 0x20, // STA $2006
            0xA9, 0x21, // LDA #$21
            0x8D, 0x07, 0x20, // STA $2007
            0xA9, 0x0A, // LDA #$0A
            0x8D, 0x01, 0x20, // STA $2001
            0x4C, 0x14, 0x80, // JMP $8014
        ])
        .build()
}

#[test]
fn frames_last_341_by_262_dots_with_rendering_off() -> Result<()> {
    let rom = RomBuilder::nrom().program(&[0x4C, 0x00, 0x80]).build();
    let mut nes = boot(&rom)?;

    nes.clock_frame();
    for _ in 0..4 {
        assert_eq!(ticks_to_next_frame(&mut nes), DOTS_PER_FRAME);
    }
    Ok(())
}

#[test]
fn odd_frames_drop_a_dot_while_rendering() -> Result<()> {
    let mut nes = boot(&backdrop_rom())?;
    for _ in 0..3 {
        nes.clock_frame();
    }

    let first = ticks_to_next_frame(&mut nes);
    let second = ticks_to_next_frame(&mut nes);
    assert_eq!(first + second, 2 * DOTS_PER_FRAME - 1);
    assert!(first == DOTS_PER_FRAME - 1 || second == DOTS_PER_FRAME - 1);
    Ok(())
}

#[test]
fn backdrop_colour_fills_the_screen() -> Result<()> {
    let mut nes = boot(&backdrop_rom())?;
    for _ in 0..3 {
        nes.clock_frame();
    }

    let screen = nes.screen_buffer();
    assert_eq!(screen.get(0, 0), Some(0x21));
    assert_eq!(screen.get(128, 120), Some(0x21));
    assert_eq!(screen.get(SCREEN_WIDTH - 1, 239), Some(0x21));

    let rgba = nes.frame_rgba();
    assert_eq!(rgba.len(), palette::FRAME_RGBA_LEN);
    let expected = palette::colour(0x21);
    assert_eq!(&rgba[..4], &[expected.r, expected.g, expected.b, 0xFF]);
    Ok(())
}

#[test]
fn hidden_border_paints_black() -> Result<()> {
    let mut nes = boot(&backdrop_rom())?;
    nes.config_mut().video.hide_border = true;
    for _ in 0..3 {
        nes.clock_frame();
    }

    let screen = nes.screen_buffer();
    assert_eq!(screen.get(3, 100), Some(0x0F));
    assert_eq!(screen.get(100, 3), Some(0x0F));
    assert_eq!(screen.get(100, 100), Some(0x21));
    Ok(())
}

#[test]
fn vblank_nmi_runs_once_per_frame() -> Result<()> {
    let rom = RomBuilder::nrom()
        .program(&[
            0xA9, 0x80, // LDA #$80
            0x8D, 0x00, 0x20, // STA $2000
            0x4C, 0x05, 0x80, // JMP $8005
        ])
        .interrupt_handler(&[
            0xE6, 0x10, // INC $10
            0x40, // RTI
        ])
        .build();
    let mut nes = boot(&rom)?;

    nes.clock_frame();
    let start = nes.peek(0x10);
    for _ in 0..5 {
        nes.clock_frame();
    }
    assert_eq!(nes.peek(0x10).wrapping_sub(start), 5);
    Ok(())
}

#[test]
fn ejected_console_stops_and_shows_bands() -> Result<()> {
    let mut nes = boot(&backdrop_rom())?;
    nes.clock_frame();
    let cartridge = nes.eject();
    assert!(cartridge.is_some());

    assert!(!nes.clock().frame_complete);
    nes.clock_frame();
    assert_eq!(nes.screen_buffer().get(0, 0), Some(0x31));
    assert_eq!(Nes::new().screen_buffer(), nes.screen_buffer());
    Ok(())
}
