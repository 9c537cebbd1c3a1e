use crate::{
    bus::Bus,
    cpu::{Cpu, Operand, addressing::Addressing, instruction::Instruction, mnemonic::Mnemonic},
    cpu::status::Status,
};

const BIT_5: u8 = 0b0010_0000;
const BIT_6: u8 = 0b0100_0000;
const BIT_7: u8 = 0b1000_0000;

/// Read-modify-write shape shared by the shifts and their illegal combos.
#[derive(Debug, Clone, Copy)]
enum Shift {
    Asl,
    Lsr,
    Rol,
    Ror,
}

impl Cpu {
    /// Executes a decoded instruction against its resolved operand.
    /// Returns `true` when a branch was taken.
    pub(super) fn execute(
        &mut self,
        bus: &mut impl Bus,
        instr: Instruction,
        operand: Operand,
    ) -> bool {
        let addr = operand.addr;
        match instr.mnemonic {
            //Load/Store
            Mnemonic::LDA => {
                self.a = bus.read(addr);
                self.p.set_zn(self.a);
            }
            Mnemonic::LDX => {
                self.x = bus.read(addr);
                self.p.set_zn(self.x);
            }
            Mnemonic::LDY => {
                self.y = bus.read(addr);
                self.p.set_zn(self.y);
            }
            Mnemonic::LAX => {
                let m = bus.read(addr);
                // Immediate LAX (LXA, $AB) ANDs into A instead of loading it.
                self.a = if instr.addressing == Addressing::Immediate {
                    self.a & m
                } else {
                    m
                };
                self.x = self.a;
                self.p.set_zn(self.a);
            }
            Mnemonic::LAS => {
                let m = bus.read(addr) & self.s;
                self.a = m;
                self.x = m;
                self.s = m;
                self.p.set_zn(m);
            }
            Mnemonic::STA => bus.write(addr, self.a),
            Mnemonic::STX => bus.write(addr, self.x),
            Mnemonic::STY => bus.write(addr, self.y),
            Mnemonic::SAX => bus.write(addr, self.a & self.x),
            Mnemonic::SHA => Self::store_high(bus, operand, self.a & self.x),
            Mnemonic::SHX => Self::store_high(bus, operand, self.x),
            Mnemonic::SHY => Self::store_high(bus, operand, self.y),

            //Transfer
            Mnemonic::SHS => {
                self.s = self.a & self.x;
                Self::store_high(bus, operand, self.s);
            }
            Mnemonic::TAX => {
                self.x = self.a;
                self.p.set_zn(self.x);
            }
            Mnemonic::TAY => {
                self.y = self.a;
                self.p.set_zn(self.y);
            }
            Mnemonic::TSX => {
                self.x = self.s;
                self.p.set_zn(self.x);
            }
            Mnemonic::TXA => {
                self.a = self.x;
                self.p.set_zn(self.a);
            }
            Mnemonic::TXS => self.s = self.x,
            Mnemonic::TYA => {
                self.a = self.y;
                self.p.set_zn(self.a);
            }

            //Stack
            Mnemonic::PHA => self.push(bus, self.a),
            Mnemonic::PHP => self.push(bus, self.p.to_pushed_byte()),
            Mnemonic::PLA => {
                self.a = self.pull(bus);
                self.p.set_zn(self.a);
            }
            Mnemonic::PLP => {
                let value = self.pull(bus);
                self.p = Status::from_pulled_byte(value);
            }

            //Shift
            Mnemonic::ASL => {
                self.shift(bus, instr.addressing, addr, Shift::Asl);
            }
            Mnemonic::LSR => {
                self.shift(bus, instr.addressing, addr, Shift::Lsr);
            }
            Mnemonic::ROL => {
                self.shift(bus, instr.addressing, addr, Shift::Rol);
            }
            Mnemonic::ROR => {
                self.shift(bus, instr.addressing, addr, Shift::Ror);
            }

            //Logic
            Mnemonic::AND => {
                self.a &= bus.read(addr);
                self.p.set_zn(self.a);
            }
            Mnemonic::EOR => {
                self.a ^= bus.read(addr);
                self.p.set_zn(self.a);
            }
            Mnemonic::ORA => {
                self.a |= bus.read(addr);
                self.p.set_zn(self.a);
            }
            Mnemonic::BIT => {
                let m = bus.read(addr);
                self.p.set(Status::ZERO, self.a & m == 0);
                self.p.set(Status::OVERFLOW, m & BIT_6 != 0);
                self.p.set(Status::NEGATIVE, m & BIT_7 != 0);
            }

            //Arithmetic
            Mnemonic::ADC => {
                let m = bus.read(addr);
                self.add(m);
            }
            Mnemonic::SBC => {
                let m = bus.read(addr);
                self.add(!m);
            }
            Mnemonic::CMP => {
                let m = bus.read(addr);
                self.compare(self.a, m);
            }
            Mnemonic::CPX => {
                let m = bus.read(addr);
                self.compare(self.x, m);
            }
            Mnemonic::CPY => {
                let m = bus.read(addr);
                self.compare(self.y, m);
            }
            Mnemonic::ANC => {
                self.a &= bus.read(addr);
                self.p.set_zn(self.a);
                self.p.set(Status::CARRY, self.a & BIT_7 != 0);
            }
            Mnemonic::ARR => {
                self.a &= bus.read(addr);
                self.a = (self.a >> 1) | (self.p.carry_bit() << 7);
                self.p.set_zn(self.a);
                let bit6 = self.a & BIT_6 != 0;
                let bit5 = self.a & BIT_5 != 0;
                self.p.set(Status::CARRY, bit6);
                self.p.set(Status::OVERFLOW, bit6 ^ bit5);
            }
            Mnemonic::ASR => {
                self.a &= bus.read(addr);
                self.p.set(Status::CARRY, self.a & 0x01 != 0);
                self.a >>= 1;
                self.p.set_zn(self.a);
            }
            Mnemonic::SBX => {
                let m = bus.read(addr);
                let masked = self.a & self.x;
                self.p.set(Status::CARRY, masked >= m);
                self.x = masked.wrapping_sub(m);
                self.p.set_zn(self.x);
            }
            Mnemonic::XAA => {
                self.a = self.x & bus.read(addr);
                self.p.set_zn(self.a);
            }
            Mnemonic::DCP => {
                let m = bus.read(addr).wrapping_sub(1);
                bus.write(addr, m);
                self.compare(self.a, m);
            }
            Mnemonic::ISC => {
                let m = bus.read(addr).wrapping_add(1);
                bus.write(addr, m);
                self.add(!m);
            }
            Mnemonic::RLA => {
                let m = self.shift(bus, instr.addressing, addr, Shift::Rol);
                self.a &= m;
                self.p.set_zn(self.a);
            }
            Mnemonic::RRA => {
                let m = self.shift(bus, instr.addressing, addr, Shift::Ror);
                self.add(m);
            }
            Mnemonic::SLO => {
                let m = self.shift(bus, instr.addressing, addr, Shift::Asl);
                self.a |= m;
                self.p.set_zn(self.a);
            }
            Mnemonic::SRE => {
                let m = self.shift(bus, instr.addressing, addr, Shift::Lsr);
                self.a ^= m;
                self.p.set_zn(self.a);
            }

            //Arithmetic: Inc/Dec
            Mnemonic::DEC => {
                let m = bus.read(addr).wrapping_sub(1);
                bus.write(addr, m);
                self.p.set_zn(m);
            }
            Mnemonic::INC => {
                let m = bus.read(addr).wrapping_add(1);
                bus.write(addr, m);
                self.p.set_zn(m);
            }
            Mnemonic::DEX => {
                self.x = self.x.wrapping_sub(1);
                self.p.set_zn(self.x);
            }
            Mnemonic::DEY => {
                self.y = self.y.wrapping_sub(1);
                self.p.set_zn(self.y);
            }
            Mnemonic::INX => {
                self.x = self.x.wrapping_add(1);
                self.p.set_zn(self.x);
            }
            Mnemonic::INY => {
                self.y = self.y.wrapping_add(1);
                self.p.set_zn(self.y);
            }

            //Control Flow
            Mnemonic::BRK => {
                // The padding byte was consumed as an immediate operand.
                self.push_word(bus, self.pc);
                self.push(bus, self.p.to_pushed_byte());
                self.p.insert(Status::INTERRUPT);
                self.pc = bus.read_word(crate::memory::cpu::IRQ_VECTOR_LO);
            }
            Mnemonic::JMP => self.pc = addr,
            Mnemonic::JSR => {
                self.push_word(bus, self.pc.wrapping_sub(1));
                self.pc = addr;
            }
            Mnemonic::RTI => {
                let value = self.pull(bus);
                self.p = Status::from_pulled_byte(value);
                self.pc = self.pull_word(bus);
            }
            Mnemonic::RTS => {
                self.pc = self.pull_word(bus).wrapping_add(1);
            }

            //Control Flow: Branch
            Mnemonic::BCC => return self.branch(!self.p.contains(Status::CARRY), addr),
            Mnemonic::BCS => return self.branch(self.p.contains(Status::CARRY), addr),
            Mnemonic::BNE => return self.branch(!self.p.contains(Status::ZERO), addr),
            Mnemonic::BEQ => return self.branch(self.p.contains(Status::ZERO), addr),
            Mnemonic::BPL => return self.branch(!self.p.contains(Status::NEGATIVE), addr),
            Mnemonic::BMI => return self.branch(self.p.contains(Status::NEGATIVE), addr),
            Mnemonic::BVC => return self.branch(!self.p.contains(Status::OVERFLOW), addr),
            Mnemonic::BVS => return self.branch(self.p.contains(Status::OVERFLOW), addr),

            //Flags
            Mnemonic::CLC => self.p.remove(Status::CARRY),
            Mnemonic::CLD => self.p.remove(Status::DECIMAL),
            Mnemonic::CLI => self.p.remove(Status::INTERRUPT),
            Mnemonic::CLV => self.p.remove(Status::OVERFLOW),
            Mnemonic::SEC => self.p.insert(Status::CARRY),
            Mnemonic::SED => self.p.insert(Status::DECIMAL),
            Mnemonic::SEI => self.p.insert(Status::INTERRUPT),

            //KIL
            Mnemonic::JAM => self.pc = self.pc.wrapping_sub(1),

            //NOP
            Mnemonic::NOP => {
                // Multi-byte NOPs still perform their read.
                if !matches!(
                    instr.addressing,
                    Addressing::Implied | Addressing::Immediate
                ) {
                    bus.read(addr);
                }
            }
        }
        false
    }

    /// NV-BDIZC
    /// ✓✓----✓✓
    ///
    /// A + M + C → A. Binary only; D is ignored.
    fn add(&mut self, m: u8) {
        let sum = u16::from(self.a) + u16::from(m) + u16::from(self.p.carry_bit());
        let result = sum as u8;
        self.p.set(Status::CARRY, sum > 0xFF);
        self.p
            .set(Status::OVERFLOW, (!(self.a ^ m) & (self.a ^ result) & BIT_7) != 0);
        self.a = result;
        self.p.set_zn(result);
    }

    fn compare(&mut self, register: u8, m: u8) {
        self.p.set(Status::CARRY, register >= m);
        self.p.set_zn(register.wrapping_sub(m));
    }

    fn branch(&mut self, condition: bool, target: u16) -> bool {
        if condition {
            self.pc = target;
        }
        condition
    }

    /// Applies a shift to A (accumulator mode) or memory. Returns the result.
    fn shift(&mut self, bus: &mut impl Bus, mode: Addressing, addr: u16, kind: Shift) -> u8 {
        let input = if mode == Addressing::Accumulator {
            self.a
        } else {
            bus.read(addr)
        };
        let carry_in = self.p.carry_bit();
        let (result, carry_out) = match kind {
            Shift::Asl => (input << 1, input & BIT_7 != 0),
            Shift::Lsr => (input >> 1, input & 0x01 != 0),
            Shift::Rol => ((input << 1) | carry_in, input & BIT_7 != 0),
            Shift::Ror => ((input >> 1) | (carry_in << 7), input & 0x01 != 0),
        };
        self.p.set(Status::CARRY, carry_out);
        self.p.set_zn(result);
        if mode == Addressing::Accumulator {
            self.a = result;
        } else {
            bus.write(addr, result);
        }
        result
    }

    /// SHA/SHX/SHY/SHS: stores `value & (H + 1)`. On a page cross the
    /// stored value also replaces the high byte of the target address.
    fn store_high(bus: &mut impl Bus, operand: Operand, value: u8) {
        let high = ((operand.base >> 8) as u8).wrapping_add(1);
        let data = value & high;
        let addr = if operand.page_crossed {
            (u16::from(data) << 8) | (operand.addr & 0x00FF)
        } else {
            operand.addr
        };
        bus.write(addr, data);
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        bus::mock::MockBus,
        cpu::{Cpu, Status},
    };

    fn exec(program: &[u8], instructions: usize) -> (Cpu, MockBus) {
        let mut bus = MockBus::with_program(0x8000, program);
        let mut cpu = Cpu::new();
        cpu.power_on(&mut bus);
        cpu.clock_instruction(&mut bus);
        for _ in 0..instructions {
            cpu.clock_instruction(&mut bus);
        }
        (cpu, bus)
    }

    #[test]
    fn rol_accumulator_uses_carry() {
        // SEC; LDA #$80; ROL A
        let (cpu, _) = exec(&[0x38, 0xA9, 0x80, 0x2A], 3);
        assert_eq!(cpu.a(), 0x01);
        assert!(cpu.status().contains(Status::CARRY));
    }

    #[test]
    fn inc_memory_wraps() {
        // INC $10
        let mut program = vec![0xE6, 0x10];
        program.extend([0xEA]);
        let mut bus = MockBus::with_program(0x8000, &program);
        bus.mem[0x10] = 0xFF;
        let mut cpu = Cpu::new();
        cpu.power_on(&mut bus);
        cpu.clock_instruction(&mut bus);
        assert_eq!(cpu.clock_instruction(&mut bus), 5);
        assert_eq!(bus.mem[0x10], 0x00);
        assert!(cpu.status().contains(Status::ZERO));
    }

    #[test]
    fn indirect_y_wraps_zero_page_pointer() {
        // LDY #$01; LDA ($FF),Y
        let mut bus = MockBus::with_program(0x8000, &[0xA0, 0x01, 0xB1, 0xFF]);
        bus.mem[0xFF] = 0x00;
        bus.mem[0x00] = 0x03;
        bus.mem[0x0301] = 0x5A;
        let mut cpu = Cpu::new();
        cpu.power_on(&mut bus);
        cpu.clock_instruction(&mut bus);
        cpu.clock_instruction(&mut bus);
        assert_eq!(cpu.clock_instruction(&mut bus), 5);
        assert_eq!(cpu.a(), 0x5A);
    }

    #[test]
    fn lax_loads_both_registers() {
        // LAX $20
        let (cpu, _) = exec(&[0xA9, 0x0F, 0xA7, 0x20], 2);
        assert_eq!(cpu.a(), 0x00);
        assert_eq!(cpu.x(), 0x00);
        assert!(cpu.status().contains(Status::ZERO));
    }

    #[test]
    fn immediate_lax_ands_into_a() {
        // LDA #$F0; LXA #$3C
        let (cpu, _) = exec(&[0xA9, 0xF0, 0xAB, 0x3C], 2);
        assert_eq!(cpu.a(), 0x30);
        assert_eq!(cpu.x(), 0x30);
        assert!(!cpu.status().contains(Status::ZERO));
    }

    #[test]
    fn sax_stores_a_and_x() {
        // LDA #$F0; LDX #$3C; SAX $20
        let (_, bus) = exec(&[0xA9, 0xF0, 0xA2, 0x3C, 0x87, 0x20], 3);
        assert_eq!(bus.mem[0x20], 0x30);
    }

    #[test]
    fn dcp_decrements_then_compares() {
        // LDA #$41; DCP $30
        let mut bus = MockBus::with_program(0x8000, &[0xA9, 0x41, 0xC7, 0x30]);
        bus.mem[0x30] = 0x42;
        let mut cpu = Cpu::new();
        cpu.power_on(&mut bus);
        for _ in 0..3 {
            cpu.clock_instruction(&mut bus);
        }
        assert_eq!(bus.mem[0x30], 0x41);
        assert!(cpu.status().contains(Status::ZERO | Status::CARRY));
    }

    #[test]
    fn anc_copies_negative_into_carry() {
        // LDA #$FF; ANC #$80
        let (cpu, _) = exec(&[0xA9, 0xFF, 0x0B, 0x80], 2);
        assert_eq!(cpu.a(), 0x80);
        assert!(cpu.status().contains(Status::CARRY | Status::NEGATIVE));
    }

    #[test]
    fn arr_sets_carry_and_overflow_from_result() {
        // SEC; LDA #$FF; ARR #$FF
        let (cpu, _) = exec(&[0x38, 0xA9, 0xFF, 0x6B, 0xFF], 3);
        assert_eq!(cpu.a(), 0xFF);
        assert!(cpu.status().contains(Status::CARRY));
        assert!(!cpu.status().contains(Status::OVERFLOW));
    }

    #[test]
    fn sbx_subtracts_from_a_and_x() {
        // LDA #$0F; LDX #$FF; SBX #$05
        let (cpu, _) = exec(&[0xA9, 0x0F, 0xA2, 0xFF, 0xCB, 0x05], 3);
        assert_eq!(cpu.x(), 0x0A);
        assert!(cpu.status().contains(Status::CARRY));
    }

    #[test]
    fn isc_increments_then_subtracts() {
        // SEC; LDA #$10; ISC $40
        let mut bus = MockBus::with_program(0x8000, &[0x38, 0xA9, 0x10, 0xE7, 0x40]);
        bus.mem[0x40] = 0x04;
        let mut cpu = Cpu::new();
        cpu.power_on(&mut bus);
        for _ in 0..4 {
            cpu.clock_instruction(&mut bus);
        }
        assert_eq!(bus.mem[0x40], 0x05);
        assert_eq!(cpu.a(), 0x0B);
    }

    #[test]
    fn shx_masks_with_high_byte_plus_one() {
        // LDX #$FF; LDY #$00; SHX $0200,Y
        let (_, bus) = exec(&[0xA2, 0xFF, 0xA0, 0x00, 0x9E, 0x00, 0x02], 3);
        assert_eq!(bus.mem[0x0200], 0x03);
    }

    #[test]
    fn bit_copies_high_bits() {
        // LDA #$01; BIT $50
        let mut bus = MockBus::with_program(0x8000, &[0xA9, 0x01, 0x24, 0x50]);
        bus.mem[0x50] = 0xC0;
        let mut cpu = Cpu::new();
        cpu.power_on(&mut bus);
        for _ in 0..3 {
            cpu.clock_instruction(&mut bus);
        }
        assert!(cpu.status().contains(Status::ZERO | Status::OVERFLOW | Status::NEGATIVE));
    }
}
