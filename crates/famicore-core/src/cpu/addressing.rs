use std::fmt::Display;

/// The thirteen 6502 addressing modes.
///
/// A mode decides how many operand bytes follow the opcode and how they turn
/// into the effective address the operation reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Addressing {
    /// No operand. The instruction works on registers or flags.
    ///
    /// # Examples
    /// - `CLC`
    /// - `TAX`
    Implied,

    /// Operates on the accumulator.
    ///
    /// # Examples
    /// - `ASL A`
    /// - `ROR A`
    Accumulator,

    /// The byte after the opcode is the operand.
    ///
    /// # Examples
    /// - `LDA #$42`
    Immediate,

    /// Full 16-bit address in the two operand bytes.
    ///
    /// # Examples
    /// - `STA $0200`
    /// - `JMP $C000`
    Absolute,

    /// `address + X`. Reads pay one extra cycle when the sum crosses a page.
    ///
    /// # Examples
    /// - `LDA $1234,X`
    AbsoluteX,

    /// `address + Y`. Reads pay one extra cycle when the sum crosses a page.
    ///
    /// # Examples
    /// - `LDA $1234,Y`
    AbsoluteY,

    /// `JMP ($xxxx)`. The pointer's high byte is fetched without carrying into
    /// the next page, so `JMP ($10FF)` reads `$10FF` and `$1000`.
    Indirect,

    /// Single-byte address inside page zero.
    ///
    /// # Examples
    /// - `LDA $42`
    ZeroPage,

    /// `(zp + X) & $FF`.
    ZeroPageX,

    /// `(zp + Y) & $FF`. Only used by LDX/STX/LAX/SAX.
    ZeroPageY,

    /// `(zp,X)`: the pointer lives at `(zp + X) & $FF` and wraps in page zero.
    IndirectX,

    /// `(zp),Y`: the pointer at `zp` plus Y. Reads pay one extra cycle on a
    /// page cross.
    IndirectY,

    /// Signed 8-bit branch offset from the address of the next instruction.
    ///
    /// # Examples
    /// - `BNE $F0`
    Relative,
}

impl Addressing {
    /// Number of operand bytes that follow the opcode.
    pub const fn operand_len(self) -> u16 {
        match self {
            Addressing::Implied | Addressing::Accumulator => 0,
            Addressing::Immediate
            | Addressing::ZeroPage
            | Addressing::ZeroPageX
            | Addressing::ZeroPageY
            | Addressing::IndirectX
            | Addressing::IndirectY
            | Addressing::Relative => 1,
            Addressing::Absolute
            | Addressing::AbsoluteX
            | Addressing::AbsoluteY
            | Addressing::Indirect => 2,
        }
    }
}

impl Display for Addressing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Addressing::Implied => "implied".fmt(f),
            Addressing::Accumulator => "accumulator".fmt(f),
            Addressing::Immediate => "immediate".fmt(f),
            Addressing::Absolute => "absolute".fmt(f),
            Addressing::AbsoluteX => "absolute_x".fmt(f),
            Addressing::AbsoluteY => "absolute_y".fmt(f),
            Addressing::Indirect => "indirect".fmt(f),
            Addressing::ZeroPage => "zero_page".fmt(f),
            Addressing::ZeroPageX => "zero_page_x".fmt(f),
            Addressing::ZeroPageY => "zero_page_y".fmt(f),
            Addressing::IndirectX => "indirect_x".fmt(f),
            Addressing::IndirectY => "indirect_y".fmt(f),
            Addressing::Relative => "relative".fmt(f),
        }
    }
}
