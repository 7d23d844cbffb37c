/// Which switchable memory bank a `bank_select` write targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BankKind {
    Rom,
    Ram,
    Tile,
    Dpcm,
}

/// What a posted bus transaction is doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransactionKind {
    #[default]
    None,
    Read,
    Write,
}

/// A single in-flight memory request, posted in cycle *n* and resolved by
/// [`crate::mmu::Mmu::update`] so its effect (or, for a read, its result)
/// becomes visible in cycle *n+1*. Each of the CPU and the VPU owns exactly
/// one of these — there is no queue, matching the hardware's one-transaction-
/// in-flight limitation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusTransaction {
    pub kind: TransactionKind,
    pub addr: u16,
    pub value: u16,
    pub width: u8, // 1 or 2 bytes
}

impl BusTransaction {
    pub const fn none() -> Self {
        Self {
            kind: TransactionKind::None,
            addr: 0,
            value: 0,
            width: 1,
        }
    }

    pub const fn read(addr: u16, width: u8) -> Self {
        Self {
            kind: TransactionKind::Read,
            addr,
            value: 0,
            width,
        }
    }

    pub const fn write(addr: u16, value: u16, width: u8) -> Self {
        Self {
            kind: TransactionKind::Write,
            addr,
            value,
            width,
        }
    }
}
