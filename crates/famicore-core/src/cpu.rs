use std::fmt::Display;

use tracing::trace;

use crate::{
    bus::{Bus, STACK_ADDR},
    cpu::cycle::Cycle,
    error::Result,
    memory::cpu as cpu_mem,
    state::{Savestate, StateReader, StateWriter},
};

pub use addressing::Addressing;
pub use instruction::Instruction;
pub use mnemonic::Mnemonic;
pub use status::Status;

mod addressing;
mod cycle;
mod instruction;
mod lookup;
mod mnemonic;
mod ops;
mod status;

/// Cycles consumed by the reset sequence before the first fetch.
const RESET_CYCLES: u8 = 8;
/// Cycles consumed by the IRQ/NMI entry sequence.
const INTERRUPT_CYCLES: u8 = 7;

/// Effective address produced by an addressing mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Operand {
    /// Final address after indexing.
    pub(crate) addr: u16,
    /// Address before indexing (the branch origin for relative mode).
    pub(crate) base: u16,
    pub(crate) page_crossed: bool,
}

impl Operand {
    const fn at(addr: u16) -> Self {
        Self {
            addr,
            base: addr,
            page_crossed: false,
        }
    }

    const fn indexed(base: u16, addr: u16) -> Self {
        Self {
            addr,
            base,
            page_crossed: (base & 0xFF00) != (addr & 0xFF00),
        }
    }
}

/// 6502-compatible CPU (2A03 core, no decimal mode).
///
/// Each instruction executes in full on its first cycle; the remaining
/// cycles of its budget are then burnt one per [`Cpu::clock`] so the rest of
/// the machine observes correct instruction timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cpu {
    // Registers
    a: u8,     //Accumulator
    x: u8,     //X Index Register
    y: u8,     //Y Index Register
    s: u8,     //Stack Pointer
    p: Status, //Processor Status
    pc: u16,   //Program Counter

    /// Cycles left before the next fetch.
    cycles: u8,
    /// NMI edge latched by the bus, serviced at the next instruction boundary.
    nmi_pending: bool,
    /// IRQ asserted during the current instruction.
    irq_pending: bool,
    total_cycles: u64,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Create a new CPU instance with power-up register values.
    /// Does not fetch the reset vector; call [`Cpu::power_on`] for that.
    pub fn new() -> Self {
        Self {
            a: 0x00,
            x: 0x00,
            y: 0x00,
            s: 0xFD,
            p: Status::new(),
            pc: 0x0000,
            cycles: 0,
            nmi_pending: false,
            irq_pending: false,
            total_cycles: 0,
        }
    }

    /// Power-up state: registers cleared and PC loaded from the reset vector.
    pub fn power_on(&mut self, bus: &mut impl Bus) {
        *self = Self::new();
        self.pc = bus.read_word(cpu_mem::RESET_VECTOR_LO);
        self.cycles = RESET_CYCLES;
    }

    /// Warm reset: reloads PC from `$FFFC/$FFFD`, drops SP by three and masks IRQs.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        self.pc = bus.read_word(cpu_mem::RESET_VECTOR_LO);
        self.s = self.s.wrapping_sub(3);
        self.p.insert(Status::INTERRUPT);
        self.nmi_pending = false;
        self.irq_pending = false;
        self.cycles = RESET_CYCLES;
    }

    /// Advances one CPU cycle. Fetches and executes when the previous
    /// instruction's budget is spent; latched interrupts take precedence.
    pub fn clock(&mut self, bus: &mut impl Bus) {
        if self.cycles == 0 {
            if self.nmi_pending {
                self.nmi_pending = false;
                self.nmi(bus);
            } else if self.irq_pending && !self.p.contains(Status::INTERRUPT) {
                self.irq_pending = false;
                self.irq(bus);
            } else {
                self.irq_pending = false;
                self.step(bus);
            }
        }
        self.cycles = self.cycles.saturating_sub(1);
        self.total_cycles += 1;
    }

    /// Runs cycles until the current instruction completes. Returns the
    /// number of cycles spent.
    pub fn clock_instruction(&mut self, bus: &mut impl Bus) -> u32 {
        let mut spent = 0;
        loop {
            self.clock(bus);
            spent += 1;
            if self.instruction_complete() {
                return spent;
            }
        }
    }

    /// `true` between instructions.
    pub fn instruction_complete(&self) -> bool {
        self.cycles == 0
    }

    /// Maskable interrupt entry. Ignored while I is set.
    pub fn irq(&mut self, bus: &mut impl Bus) {
        if self.p.contains(Status::INTERRUPT) {
            return;
        }
        self.interrupt(bus, cpu_mem::IRQ_VECTOR_LO);
    }

    /// Non-maskable interrupt entry.
    pub fn nmi(&mut self, bus: &mut impl Bus) {
        self.interrupt(bus, cpu_mem::NMI_VECTOR_LO);
    }

    /// Latches an NMI edge for the next instruction boundary.
    pub fn request_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Asserts the IRQ line for the current instruction.
    pub fn request_irq(&mut self) {
        self.irq_pending = true;
    }

    fn interrupt(&mut self, bus: &mut impl Bus, vector: u16) {
        self.push_word(bus, self.pc);
        self.push(bus, (self.p - Status::BREAK | Status::UNUSED).bits());
        self.p.insert(Status::INTERRUPT);
        self.pc = bus.read_word(vector);
        self.cycles = INTERRUPT_CYCLES;
    }

    fn step(&mut self, bus: &mut impl Bus) {
        let opcode = self.fetch(bus);
        let instr = Instruction::decode(opcode);
        trace!(
            pc = self.pc.wrapping_sub(1),
            opcode,
            %instr,
            a = self.a,
            x = self.x,
            y = self.y,
            p = self.p.bits(),
            s = self.s,
            "cpu"
        );

        let operand = self.resolve(bus, instr.addressing);
        let branch_taken = self.execute(bus, instr, operand);

        let cycle = Instruction::cycle(opcode);
        let cross_page = match cycle {
            Cycle::Branch(_) => branch_taken && operand.page_crossed,
            _ => operand.page_crossed,
        };
        self.cycles = cycle.total_cycle(cross_page, branch_taken);
    }

    fn fetch(&mut self, bus: &mut impl Bus) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    fn fetch_word(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = self.fetch(bus);
        let hi = self.fetch(bus);
        u16::from_le_bytes([lo, hi])
    }

    /// Reads a pointer from page zero, wrapping `$FF` to `$00`.
    fn read_zero_page_word(bus: &mut impl Bus, ptr: u8) -> u16 {
        let lo = bus.read(u16::from(ptr));
        let hi = bus.read(u16::from(ptr.wrapping_add(1)));
        u16::from_le_bytes([lo, hi])
    }

    fn resolve(&mut self, bus: &mut impl Bus, mode: Addressing) -> Operand {
        match mode {
            Addressing::Implied | Addressing::Accumulator => Operand::default(),
            Addressing::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                Operand::at(addr)
            }
            Addressing::ZeroPage => Operand::at(u16::from(self.fetch(bus))),
            Addressing::ZeroPageX => Operand::at(u16::from(self.fetch(bus).wrapping_add(self.x))),
            Addressing::ZeroPageY => Operand::at(u16::from(self.fetch(bus).wrapping_add(self.y))),
            Addressing::Absolute => Operand::at(self.fetch_word(bus)),
            Addressing::AbsoluteX => {
                let base = self.fetch_word(bus);
                Operand::indexed(base, base.wrapping_add(u16::from(self.x)))
            }
            Addressing::AbsoluteY => {
                let base = self.fetch_word(bus);
                Operand::indexed(base, base.wrapping_add(u16::from(self.y)))
            }
            Addressing::Indirect => {
                let ptr = self.fetch_word(bus);
                // The high byte never carries into the next page.
                let hi_ptr = (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF);
                let lo = bus.read(ptr);
                let hi = bus.read(hi_ptr);
                Operand::at(u16::from_le_bytes([lo, hi]))
            }
            Addressing::IndirectX => {
                let ptr = self.fetch(bus).wrapping_add(self.x);
                Operand::at(Self::read_zero_page_word(bus, ptr))
            }
            Addressing::IndirectY => {
                let ptr = self.fetch(bus);
                let base = Self::read_zero_page_word(bus, ptr);
                Operand::indexed(base, base.wrapping_add(u16::from(self.y)))
            }
            Addressing::Relative => {
                let offset = self.fetch(bus) as i8;
                let origin = self.pc;
                Operand::indexed(origin, origin.wrapping_add_signed(i16::from(offset)))
            }
        }
    }

    fn push(&mut self, bus: &mut impl Bus, value: u8) {
        bus.write(STACK_ADDR | u16::from(self.s), value);
        self.s = self.s.wrapping_sub(1);
    }

    fn pull(&mut self, bus: &mut impl Bus) -> u8 {
        self.s = self.s.wrapping_add(1);
        bus.read(STACK_ADDR | u16::from(self.s))
    }

    fn push_word(&mut self, bus: &mut impl Bus, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.push(bus, hi);
        self.push(bus, lo);
    }

    fn pull_word(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = self.pull(bus);
        let hi = self.pull(bus);
        u16::from_le_bytes([lo, hi])
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn sp(&self) -> u8 {
        self.s
    }

    pub fn status(&self) -> Status {
        self.p
    }

    /// Cycles executed since power-on.
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }
}

impl Savestate for Cpu {
    fn save(&self, w: &mut StateWriter) {
        w.u8(self.cycles);
        w.u8(self.a);
        w.u8(self.x);
        w.u8(self.y);
        w.u8(self.s);
        w.u16(self.pc);
        w.u8(self.p.bits());
        w.bool(self.nmi_pending);
        w.bool(self.irq_pending);
        w.u64(self.total_cycles);
    }

    fn load(&mut self, r: &mut StateReader<'_>) -> Result<()> {
        self.cycles = r.u8()?;
        self.a = r.u8()?;
        self.x = r.u8()?;
        self.y = r.u8()?;
        self.s = r.u8()?;
        self.pc = r.u16()?;
        self.p = Status::from_bits_truncate(r.u8()?);
        self.nmi_pending = r.bool()?;
        self.irq_pending = r.bool()?;
        self.total_cycles = r.u64()?;
        Ok(())
    }
}

impl Display for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[a:0x{:02x},x:0x{:02x},y:0x{:02x},s:0x{:02x},p:0x{:02x},pc:0x{:04x}]",
            self.a,
            self.x,
            self.y,
            self.s,
            self.p.bits(),
            self.pc
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::MockBus;

    const ORIGIN: u16 = 0x8000;

    /// Boots a CPU on `program` and burns the reset cycles.
    fn boot(program: &[u8]) -> (Cpu, MockBus) {
        let mut bus = MockBus::with_program(ORIGIN, program);
        let mut cpu = Cpu::new();
        cpu.power_on(&mut bus);
        assert_eq!(cpu.clock_instruction(&mut bus), u32::from(RESET_CYCLES));
        (cpu, bus)
    }

    fn run(cpu: &mut Cpu, bus: &mut MockBus, instructions: usize) -> u32 {
        (0..instructions).map(|_| cpu.clock_instruction(bus)).sum()
    }

    #[test]
    fn power_on_state() {
        let (cpu, _) = boot(&[0xEA]);
        assert_eq!(cpu.pc(), ORIGIN);
        assert_eq!(cpu.sp(), 0xFD);
        assert_eq!(cpu.status().bits(), 0x24);
    }

    #[test]
    fn lda_immediate_sets_flags() {
        let (mut cpu, mut bus) = boot(&[0xA9, 0x00, 0xA9, 0x80]);
        assert_eq!(cpu.clock_instruction(&mut bus), 2);
        assert!(cpu.status().contains(Status::ZERO));
        cpu.clock_instruction(&mut bus);
        assert_eq!(cpu.a(), 0x80);
        assert!(cpu.status().contains(Status::NEGATIVE));
        assert!(!cpu.status().contains(Status::ZERO));
    }

    #[test]
    fn absolute_x_page_cross_costs_one_cycle() {
        // LDX #$01; LDA $80FF,X; LDA $8000,X
        let (mut cpu, mut bus) = boot(&[0xA2, 0x01, 0xBD, 0xFF, 0x80, 0xBD, 0x00, 0x80]);
        cpu.clock_instruction(&mut bus);
        assert_eq!(cpu.clock_instruction(&mut bus), 5);
        assert_eq!(cpu.clock_instruction(&mut bus), 4);
    }

    #[test]
    fn stores_never_pay_page_cross() {
        // LDX #$FF; STA $0201,X
        let (mut cpu, mut bus) = boot(&[0xA2, 0xFF, 0x9D, 0x01, 0x02]);
        cpu.clock_instruction(&mut bus);
        assert_eq!(cpu.clock_instruction(&mut bus), 5);
    }

    #[test]
    fn branch_penalties() {
        // $8000 CLC; $8001 BCS +2 (not taken); $8003 BCC +2 (taken, same page)
        let (mut cpu, mut bus) = boot(&[0x18, 0xB0, 0x02, 0x90, 0x02]);
        cpu.clock_instruction(&mut bus);
        assert_eq!(cpu.clock_instruction(&mut bus), 2);
        assert_eq!(cpu.clock_instruction(&mut bus), 3);
        assert_eq!(cpu.pc(), 0x8007);
    }

    #[test]
    fn taken_branch_across_page_costs_four() {
        let mut program = vec![0xEA; 0x100];
        // At $80F0: BNE +$20 -> $8112 (Z clear after power-on).
        program[0xF0] = 0xD0;
        program[0xF1] = 0x20;
        let mut bus = MockBus::with_program(ORIGIN, &program);
        bus.mem[0xFFFC] = 0xF0;
        let mut cpu = Cpu::new();
        cpu.power_on(&mut bus);
        cpu.clock_instruction(&mut bus);
        assert_eq!(cpu.clock_instruction(&mut bus), 4);
        assert_eq!(cpu.pc(), 0x8112);
    }

    #[test]
    fn adc_sets_overflow_and_carry() {
        // LDA #$7F; ADC #$01; ADC #$80
        let (mut cpu, mut bus) = boot(&[0xA9, 0x7F, 0x69, 0x01, 0x69, 0x80]);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.a(), 0x80);
        assert!(cpu.status().contains(Status::OVERFLOW));
        assert!(!cpu.status().contains(Status::CARRY));

        cpu.clock_instruction(&mut bus);
        assert_eq!(cpu.a(), 0x00);
        assert!(cpu.status().contains(Status::CARRY | Status::OVERFLOW | Status::ZERO));
    }

    #[test]
    fn sbc_is_adc_of_complement() {
        // SEC; LDA #$05; SBC #$06
        let (mut cpu, mut bus) = boot(&[0x38, 0xA9, 0x05, 0xE9, 0x06]);
        run(&mut cpu, &mut bus, 3);
        assert_eq!(cpu.a(), 0xFF);
        assert!(!cpu.status().contains(Status::CARRY));
        assert!(cpu.status().contains(Status::NEGATIVE));
    }

    #[test]
    fn jmp_indirect_wraps_within_page() {
        let (mut cpu, mut bus) = boot(&[0x6C, 0xFF, 0x02]);
        bus.mem[0x02FF] = 0x34;
        bus.mem[0x0200] = 0x12;
        bus.mem[0x0300] = 0x99;
        assert_eq!(cpu.clock_instruction(&mut bus), 5);
        assert_eq!(cpu.pc(), 0x1234);
    }

    #[test]
    fn jsr_and_rts_round_trip() {
        // $8000 JSR $8005; $8003 NOP NOP; $8005 RTS
        let (mut cpu, mut bus) = boot(&[0x20, 0x05, 0x80, 0xEA, 0xEA, 0x60]);
        assert_eq!(cpu.clock_instruction(&mut bus), 6);
        assert_eq!(cpu.pc(), 0x8005);
        assert_eq!(bus.mem[0x01FD], 0x80);
        assert_eq!(bus.mem[0x01FC], 0x02);
        assert_eq!(cpu.clock_instruction(&mut bus), 6);
        assert_eq!(cpu.pc(), 0x8003);
        assert_eq!(cpu.sp(), 0xFD);
    }

    #[test]
    fn brk_pushes_break_flag_and_rti_returns() {
        // CLI; BRK #$FF; NOP
        let (mut cpu, mut bus) = boot(&[0x58, 0x00, 0xFF, 0xEA]);
        bus.mem[0xFFFE] = 0x00;
        bus.mem[0xFFFF] = 0x90;
        bus.mem[0x9000] = 0x40;

        cpu.clock_instruction(&mut bus);
        assert_eq!(cpu.clock_instruction(&mut bus), 7);
        assert_eq!(cpu.pc(), 0x9000);
        assert_eq!(bus.mem[0x01FB] & 0x30, 0x30);
        assert!(cpu.status().contains(Status::INTERRUPT));

        assert_eq!(cpu.clock_instruction(&mut bus), 6);
        // BRK skips its padding byte.
        assert_eq!(cpu.pc(), 0x8003);
        assert!(!cpu.status().contains(Status::INTERRUPT));
        assert!(!cpu.status().contains(Status::BREAK));
    }

    #[test]
    fn irq_is_masked_by_interrupt_flag() {
        let (mut cpu, mut bus) = boot(&[0xEA, 0xEA]);
        bus.mem[0xFFFE] = 0x00;
        bus.mem[0xFFFF] = 0x90;

        cpu.irq(&mut bus);
        assert_eq!(cpu.pc(), ORIGIN);

        cpu.p.remove(Status::INTERRUPT);
        cpu.irq(&mut bus);
        assert_eq!(cpu.pc(), 0x9000);
        assert_eq!(bus.mem[0x01FB] & 0x10, 0);
    }

    #[test]
    fn nmi_is_serviced_at_instruction_boundary() {
        let (mut cpu, mut bus) = boot(&[0xEA, 0xEA]);
        bus.mem[0xFFFA] = 0x00;
        bus.mem[0xFFFB] = 0xA0;

        cpu.request_nmi();
        assert_eq!(cpu.clock_instruction(&mut bus), u32::from(INTERRUPT_CYCLES));
        assert_eq!(cpu.pc(), 0xA000);
        assert_eq!(bus.mem[0x01FD], 0x80);
        assert_eq!(bus.mem[0x01FC], 0x00);
    }

    #[test]
    fn reset_drops_stack_pointer_and_masks_irq() {
        let (mut cpu, mut bus) = boot(&[0x58]);
        cpu.clock_instruction(&mut bus);
        assert!(!cpu.status().contains(Status::INTERRUPT));
        cpu.reset(&mut bus);
        assert_eq!(cpu.sp(), 0xFA);
        assert_eq!(cpu.pc(), ORIGIN);
        assert!(cpu.status().contains(Status::INTERRUPT));
    }

    #[test]
    fn php_plp_round_trip_preserves_flags() {
        // SEC; SED; PHP; CLC; CLD; PLP
        let (mut cpu, mut bus) = boot(&[0x38, 0xF8, 0x08, 0x18, 0xD8, 0x28]);
        run(&mut cpu, &mut bus, 3);
        assert_eq!(bus.mem[0x01FD], 0x24 | 0x01 | 0x08 | 0x10);
        run(&mut cpu, &mut bus, 3);
        assert!(cpu.status().contains(Status::CARRY | Status::DECIMAL));
        assert!(!cpu.status().contains(Status::BREAK));
    }

    #[test]
    fn jam_halts_in_place() {
        let (mut cpu, mut bus) = boot(&[0x02]);
        run(&mut cpu, &mut bus, 5);
        assert_eq!(cpu.pc(), ORIGIN);
    }

    #[test]
    fn cpu_state_round_trips() {
        let (mut cpu, mut bus) = boot(&[0xA9, 0x42, 0xAA]);
        run(&mut cpu, &mut bus, 2);
        let mut w = StateWriter::new();
        cpu.save(&mut w);
        let bytes = w.into_bytes();

        let mut restored = Cpu::new();
        let mut r = StateReader::new(&bytes);
        restored.load(&mut r).expect("load cpu");
        r.finish().expect("no trailing bytes");
        assert_eq!(restored, cpu);
    }
}
