//! Controllers
//!
//! Este módulo contiene la capa intermedia entre las rutas HTTP y el motor.

pub mod assignment_controller;
pub mod stats_controller;

pub use assignment_controller::AssignmentController;
pub use stats_controller::StatsController;
