//! Fleet Assignment Engine
//!
//! Motor de asignaciones de flota: agenda pares vehículo↔conductor(es),
//! los confirma en dos fases, resuelve conflictos por supersesión al activar
//! y proyecta estadísticas de disponibilidad. La API HTTP de axum es una
//! capa fina sobre los servicios; toda la lógica vive en `services`.

pub mod audit;
pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
