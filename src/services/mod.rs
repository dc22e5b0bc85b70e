//! Services module
//!
//! Este módulo contiene la lógica de negocio del motor de asignaciones:
//! la máquina de estados de asignaciones, la ocupación de turnos y la
//! proyección de estadísticas.

pub mod allocation_service;
pub mod occupancy_service;
pub mod stats_service;

pub use allocation_service::{AllocationService, ConfirmationResult};
pub use occupancy_service::OccupancyService;
pub use stats_service::{FleetStats, StatsService};
