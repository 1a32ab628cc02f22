//! Audit log
//!
//! Append-only trail of compensating and maintenance actions.

pub mod model;
pub mod repository;

pub use model::{AuditAction, AuditEntry};
pub use repository::AuditRepository;
