//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL con las convenciones estándar.

pub mod assignment;
pub mod assignment_driver;
pub mod audit_event;
pub mod driver;
pub mod shift_occupancy;
pub mod vehicle;

pub use assignment::{AllocationMode, Assignment, AssignmentFilters, AssignmentStatus};
pub use assignment_driver::{AssignmentDriver, DocumentType, SeatStatus, ShiftSlot};
pub use audit_event::AuditEvent;
pub use driver::Driver;
pub use shift_occupancy::ShiftOccupancy;
pub use vehicle::{Vehicle, VehicleState};
