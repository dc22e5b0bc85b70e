//! Audit
//!
//! Este módulo contiene el registro de historial de asignaciones.

pub mod logger;

pub use logger::{AuditLogger, NoopAuditLogger, PgAuditLogger};
