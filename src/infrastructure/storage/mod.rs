//! In-process storage and slot locking

mod locks;
mod memory;

pub use locks::SlotLocks;
pub use memory::InMemoryStorage;
