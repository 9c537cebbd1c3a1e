use std::fmt::Display;

use crate::cpu::{
    addressing::Addressing,
    cycle::{CYCLE_TABLE, Cycle},
    lookup::LOOKUP_TABLE,
    mnemonic::Mnemonic,
};

/// Decoded opcode: which operation runs and how its operand is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub addressing: Addressing,
}

impl Instruction {
    pub(crate) const fn new(mnemonic: Mnemonic, addressing: Addressing) -> Self {
        Self {
            mnemonic,
            addressing,
        }
    }

    /// Decodes any of the 256 opcodes.
    pub fn decode(opcode: u8) -> Self {
        LOOKUP_TABLE[opcode as usize]
    }

    /// Encoded size in bytes, opcode included.
    pub const fn size(&self) -> u16 {
        1 + self.addressing.operand_len()
    }

    pub(crate) fn cycle(opcode: u8) -> Cycle {
        CYCLE_TABLE[opcode as usize]
    }

    /// Cycle count before page-cross and branch penalties.
    pub fn base_cycles(opcode: u8) -> u8 {
        Self::cycle(opcode).basic_cycle()
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.mnemonic, self.addressing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_documented_and_illegal_opcodes() {
        let lda = Instruction::decode(0xA9);
        assert_eq!(lda.mnemonic, Mnemonic::LDA);
        assert_eq!(lda.addressing, Addressing::Immediate);
        assert_eq!(lda.size(), 2);
        assert_eq!(Instruction::base_cycles(0xA9), 2);

        let slo = Instruction::decode(0x0F);
        assert_eq!(slo.mnemonic, Mnemonic::SLO);
        assert!(slo.mnemonic.is_illegal());
        assert_eq!(slo.size(), 3);
    }

    #[test]
    fn documented_opcode_count() {
        let documented = (0..=255u8)
            .filter(|&op| !Instruction::decode(op).mnemonic.is_illegal())
            .filter(|&op| {
                // Only $EA is the official NOP; $EB is an SBC alias.
                let ins = Instruction::decode(op);
                (ins.mnemonic != Mnemonic::NOP || op == 0xEA) && op != 0xEB
            })
            .count();
        assert_eq!(documented, 151);
    }
}
