//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, validación,
//! generación de códigos y otras funcionalidades comunes.

pub mod errors;
pub mod ticket;
pub mod validation;
