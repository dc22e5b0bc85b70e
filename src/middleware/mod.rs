//! Middleware del sistema
//!
//! Este módulo contiene el middleware HTTP transversal de la aplicación.

pub mod cors;

pub use cors::*;
