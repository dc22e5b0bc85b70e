//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::services::{AllocationService, StatsService};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: EnvironmentConfig,
    pub engine: AllocationService,
    pub stats: StatsService,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: EnvironmentConfig,
        engine: AllocationService,
        stats: StatsService,
    ) -> Self {
        Self {
            pool,
            config,
            engine,
            stats,
        }
    }
}
