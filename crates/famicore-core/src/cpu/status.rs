use bitflags::bitflags;

bitflags! {
    /// Represents the 8-bit processor status register (P) of the NES CPU.
    ///
    /// Bit layout:
    /// 7 6 5 4 3 2 1 0
    /// N V U B D I Z C
    ///
    /// B and U only exist on the copy pushed to the stack.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// Carry flag (C)
        /// Set when an addition produces a carry out of bit 7,
        /// or a subtraction did not require a borrow.
        const CARRY     = 0b0000_0001;

        /// Zero flag (Z)
        const ZERO      = 0b0000_0010;

        /// Interrupt Disable flag (I)
        /// When set, maskable interrupts (IRQ) are ignored.
        const INTERRUPT = 0b0000_0100;

        /// Decimal Mode flag (D)
        /// Stored and restored, but the NES ALU has no BCD mode.
        const DECIMAL   = 0b0000_1000;

        /// Break Command flag (B)
        const BREAK     = 0b0001_0000;

        /// Unused bit, reads back as 1.
        const UNUSED    = 0b0010_0000;

        /// Overflow flag (V)
        const OVERFLOW  = 0b0100_0000;

        /// Negative flag (N)
        const NEGATIVE  = 0b1000_0000;
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

impl Status {
    /// Power-up value (`$24`: I and U set).
    pub fn new() -> Self {
        Status::from_bits_truncate(0x24)
    }

    /// Sets Z and N from a result byte.
    pub fn set_zn(&mut self, value: u8) {
        self.set(Status::ZERO, value == 0);
        self.set(Status::NEGATIVE, value & 0x80 != 0);
    }

    /// Value pushed by PHP/BRK (B and U set).
    pub fn to_pushed_byte(self) -> u8 {
        (self | Status::BREAK | Status::UNUSED).bits()
    }

    /// Value restored by PLP/RTI: B is dropped and U forced on.
    pub fn from_pulled_byte(byte: u8) -> Self {
        (Status::from_bits_truncate(byte) - Status::BREAK) | Status::UNUSED
    }

    pub fn carry_bit(self) -> u8 {
        u8::from(self.contains(Status::CARRY))
    }
}
