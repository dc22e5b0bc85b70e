//! Conexión a PostgreSQL
//!
//! Este módulo maneja la conexión a la base de datos PostgreSQL.

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

use crate::config::database::DatabaseConfig;

/// Conexión a la base de datos con su pool
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    /// Conectar usando una configuración explícita
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        info!("🔗 Conectando a PostgreSQL...");

        let pool = config.create_pool().await?;

        // Test de conexión
        sqlx::query("SELECT 1").execute(&pool).await?;

        info!("✅ PostgreSQL conectado exitosamente");

        Ok(Self { pool })
    }

    /// Conectar con la configuración de variables de entorno
    pub async fn new_default() -> Result<Self> {
        Self::new(DatabaseConfig::default()).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
