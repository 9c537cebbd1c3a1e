//! Standard NES controller (joypad) model.
//!
//! Implements the 8-button pad read serially through `$4016/$4017`.

use bitflags::bitflags;

/// Individual pad buttons, numbered by their shift register bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Right = 0,
    Left = 1,
    Down = 2,
    Up = 3,
    Start = 4,
    Select = 5,
    B = 6,
    A = 7,
}

bitflags! {
    /// Snapshot of every button on one pad.
    ///
    /// Bit layout (shifted out MSB first):
    /// 7 6 5 4 3 2 1 0
    /// A B S T U D L R
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Buttons: u8 {
        const RIGHT  = 0b0000_0001;
        const LEFT   = 0b0000_0010;
        const DOWN   = 0b0000_0100;
        const UP     = 0b0000_1000;
        const START  = 0b0001_0000;
        const SELECT = 0b0010_0000;
        const B      = 0b0100_0000;
        const A      = 0b1000_0000;
    }
}

impl From<Button> for Buttons {
    fn from(button: Button) -> Self {
        Buttons::from_bits_truncate(1 << button as u8)
    }
}

/// Serially-readable controller state with latch/strobe behaviour.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Controller {
    state: Buttons,
    shift: u8,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buttons(&self) -> Buttons {
        self.state
    }

    /// Replaces the held buttons; takes effect on the next latch.
    pub fn set_buttons(&mut self, buttons: Buttons) {
        self.state = buttons;
    }

    /// Update a single button's pressed state.
    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.state.set(button.into(), pressed);
    }

    /// Copies the live button state into the shift register while strobe is high.
    pub fn latch(&mut self) {
        self.shift = self.state.bits();
    }

    /// Shifts out the next button, A first.
    pub fn read(&mut self) -> u8 {
        let bit = self.shift >> 7;
        self.shift <<= 1;
        bit
    }

    pub(crate) fn shift_register(&self) -> u8 {
        self.shift
    }

    pub(crate) fn set_shift_register(&mut self, value: u8) {
        self.shift = value;
    }
}
