/// Base cycle count of an opcode and the penalties it is subject to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Cycle {
    /// Fixed cost, even when indexing crosses a page.
    Normal(u8),
    /// One extra cycle when indexing crosses a page.
    Cross(u8),
    /// Branch: one extra cycle when taken, another when the target is on a
    /// different page.
    Branch(u8),
}

const fn n(cycle: u8) -> Cycle {
    Cycle::Normal(cycle)
}

const fn c(cycle: u8) -> Cycle {
    Cycle::Cross(cycle)
}

const fn b(cycle: u8) -> Cycle {
    Cycle::Branch(cycle)
}

impl Cycle {
    pub(crate) const fn basic_cycle(&self) -> u8 {
        match self {
            Cycle::Normal(cycle) | Cycle::Cross(cycle) | Cycle::Branch(cycle) => *cycle,
        }
    }

    /// `cross_page` for a branch must only be reported when it was taken.
    pub(crate) const fn total_cycle(&self, cross_page: bool, branch_taken: bool) -> u8 {
        let mut total_cycle = self.basic_cycle();
        if cross_page && !matches!(self, Cycle::Normal(_)) {
            total_cycle += 1;
        }

        if branch_taken && matches!(self, Cycle::Branch(_)) {
            total_cycle += 1;
        }
        total_cycle
    }
}

#[rustfmt::skip]
pub(crate) static CYCLE_TABLE: [Cycle; 256] = [
    n(7), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(3), n(2), n(2), n(2), n(4), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(6), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(4), n(2), n(2), n(2), n(4), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(6), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(3), n(2), n(2), n(2), n(3), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(6), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(4), n(2), n(2), n(2), n(5), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(2), n(6), n(2), n(6), n(3), n(3), n(3), n(3), n(2), n(2), n(2), n(2), n(4), n(4), n(4), n(4),
    b(2), n(6), n(2), n(6), n(4), n(4), n(4), n(4), n(2), n(5), n(2), n(5), n(5), n(5), n(5), n(5),
    n(2), n(6), n(2), n(6), n(3), n(3), n(3), n(3), n(2), n(2), n(2), n(2), n(4), n(4), n(4), n(4),
    b(2), c(5), n(2), c(5), n(4), n(4), n(4), n(4), n(2), c(4), n(2), c(4), c(4), c(4), c(4), c(4),
    n(2), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(2), n(2), n(2), n(2), n(4), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(2), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(2), n(2), n(2), n(2), n(4), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
];
