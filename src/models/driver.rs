//! Modelo de Driver
//!
//! Entidad del directorio de conductores, de sólo lectura para el motor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Driver - mapea exactamente a la tabla drivers del directorio
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Driver {
    pub id: Uuid,
    pub full_name: String,
    pub license_number: Option<String>,
    pub active: bool,
    pub site_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
