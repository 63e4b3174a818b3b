//! Request audit log.

pub mod logger;

pub use logger::{AuditLogger, AuditRecord};
