use std::fmt::Display;

/// Every operation the decoder can produce, grouped the way the 6502
/// references group them. Undocumented opcodes use their most common names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    //Load/Store
    LAS,
    LAX,
    LDA,
    LDX,
    LDY,
    SAX,
    SHA,
    SHX,
    SHY,
    STA,
    STX,
    STY,
    //Transfer
    SHS,
    TAX,
    TAY,
    TSX,
    TXA,
    TXS,
    TYA,
    //Stack
    PHA,
    PHP,
    PLA,
    PLP,
    //Shift
    ASL,
    LSR,
    ROL,
    ROR,
    //Logic
    AND,
    BIT,
    EOR,
    ORA,
    //Arithmetic
    ADC,
    ANC,
    ARR,
    ASR,
    CMP,
    CPX,
    CPY,
    DCP,
    ISC,
    RLA,
    RRA,
    SBC,
    SBX,
    SLO,
    SRE,
    XAA,
    //Arithmetic: Inc/Dec
    DEC,
    DEX,
    DEY,
    INC,
    INX,
    INY,
    //Control Flow
    BRK,
    JMP,
    JSR,
    RTI,
    RTS,
    //Control Flow: Branch
    BCC,
    BCS,
    BEQ,
    BMI,
    BNE,
    BPL,
    BVC,
    BVS,
    //Flags
    CLC,
    CLD,
    CLI,
    CLV,
    SEC,
    SED,
    SEI,
    //KIL
    JAM,
    //NOP
    NOP,
}

impl Mnemonic {
    /// Opcodes absent from the official MOS documentation.
    pub const fn is_illegal(self) -> bool {
        matches!(
            self,
            Mnemonic::LAS
                | Mnemonic::LAX
                | Mnemonic::SAX
                | Mnemonic::SHA
                | Mnemonic::SHX
                | Mnemonic::SHY
                | Mnemonic::SHS
                | Mnemonic::ANC
                | Mnemonic::ARR
                | Mnemonic::ASR
                | Mnemonic::DCP
                | Mnemonic::ISC
                | Mnemonic::RLA
                | Mnemonic::RRA
                | Mnemonic::SBX
                | Mnemonic::SLO
                | Mnemonic::SRE
                | Mnemonic::XAA
                | Mnemonic::JAM
        )
    }
}

impl Display for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
