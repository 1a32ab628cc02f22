pub mod database;
pub mod payment;
pub mod storage;

pub use database::{init_database, run_migrations, DatabaseConfig, SeaOrmRepositoryProvider};
pub use payment::SimulatedPaymentProcessor;
pub use storage::{InMemoryStorage, SlotLocks};
