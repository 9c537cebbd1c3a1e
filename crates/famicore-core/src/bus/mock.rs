use crate::bus::Bus;

/// Flat 64 KiB RAM used by CPU unit tests.
#[derive(Debug)]
pub(crate) struct MockBus {
    pub(crate) mem: Box<[u8]>,
}

impl Default for MockBus {
    fn default() -> Self {
        Self {
            mem: vec![0; 0x10000].into_boxed_slice(),
        }
    }
}

impl MockBus {
    /// Copies `program` to `origin` and points the reset vector at it.
    pub(crate) fn with_program(origin: u16, program: &[u8]) -> Self {
        let mut bus = Self::default();
        let start = origin as usize;
        bus.mem[start..start + program.len()].copy_from_slice(program);
        bus.mem[0xFFFC] = origin as u8;
        bus.mem[0xFFFD] = (origin >> 8) as u8;
        bus
    }
}

impl Bus for MockBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.mem[addr as usize] = data;
    }
}
