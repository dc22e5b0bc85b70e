//! Módulo de base de datos
//!
//! Maneja la conexión al PostgreSQL que respalda el RecordStore.

pub mod connection;

pub use connection::DatabaseConnection;
