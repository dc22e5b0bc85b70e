use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::AuditEvent;
use crate::utils::errors::AppError;

/// Destino del historial de cambios.
///
/// El motor trata el historial como best-effort: si `record_event` falla,
/// la operación de negocio no se revierte.
#[async_trait::async_trait]
pub trait AuditLogger: Send + Sync {
    async fn record_event(&self, event: AuditEvent) -> Result<(), AppError>;
}

/// Logger de auditoría sobre la tabla assignment_history
pub struct PgAuditLogger {
    pool: PgPool,
}

impl PgAuditLogger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AuditLogger for PgAuditLogger {
    async fn record_event(&self, event: AuditEvent) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO assignment_history
                (id, entity_type, entity_id, event_type, previous_state, new_state,
                 details, actor, module, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&event.entity_type)
        .bind(&event.entity_id)
        .bind(&event.event_type)
        .bind(&event.previous_state)
        .bind(&event.new_state)
        .bind(&event.details)
        .bind(event.actor)
        .bind(&event.module)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Dependency(format!("Error recording audit event: {}", e)))?;

        Ok(())
    }
}

/// Logger nulo para entornos donde no se persiste historial
pub struct NoopAuditLogger;

#[async_trait::async_trait]
impl AuditLogger for NoopAuditLogger {
    async fn record_event(&self, _event: AuditEvent) -> Result<(), AppError> {
        Ok(())
    }
}
