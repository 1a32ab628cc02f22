//! Database entities module

pub mod audit_log;
pub mod booking;
pub mod slot;
pub mod user;
pub mod vehicle;

pub use audit_log::Entity as AuditLog;
pub use booking::Entity as Booking;
pub use slot::Entity as Slot;
pub use user::Entity as User;
pub use vehicle::Entity as Vehicle;
