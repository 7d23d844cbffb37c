pub mod bus;
pub mod interrupt;

pub use bus::{BankKind, BusTransaction, TransactionKind};
pub use interrupt::InterruptLine;
