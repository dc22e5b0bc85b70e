//! Modelo de Vehicle
//!
//! Entidad del directorio de flota. El motor de asignaciones no es dueño de
//! los vehículos: los lee y únicamente muta su estado de disponibilidad como
//! efecto colateral de activar/cancelar/borrar asignaciones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado de disponibilidad del vehículo - mapea al ENUM vehicle_state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleState {
    Available,
    InUse,
    Maintenance,
    OutOfService,
}

impl VehicleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleState::Available => "available",
            VehicleState::InUse => "in_use",
            VehicleState::Maintenance => "maintenance",
            VehicleState::OutOfService => "out_of_service",
        }
    }
}

impl std::fmt::Display for VehicleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle - mapea exactamente a la tabla vehicles del directorio
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub license_plate: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub state: VehicleState,
    pub site_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
