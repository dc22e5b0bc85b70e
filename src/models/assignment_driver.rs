//! Modelo de AssignmentDriver
//!
//! Este módulo contiene el struct AssignmentDriver: el "asiento" de un
//! conductor dentro de una asignación, con su turno, documento requerido,
//! lugar de recogida y estado de confirmación.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Turno del asiento - mapea al ENUM shift_slot
///
/// `full_day` sólo aparece en asignaciones single_driver; `day`/`night`
/// sólo en asignaciones shift.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "shift_slot", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShiftSlot {
    Day,
    Night,
    FullDay,
}

impl ShiftSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftSlot::Day => "day",
            ShiftSlot::Night => "night",
            ShiftSlot::FullDay => "full_day",
        }
    }

    /// Un asiento full_day compromete el turno de día
    pub fn covers_day(&self) -> bool {
        matches!(self, ShiftSlot::Day | ShiftSlot::FullDay)
    }

    /// Un asiento full_day compromete el turno de noche
    pub fn covers_night(&self) -> bool {
        matches!(self, ShiftSlot::Night | ShiftSlot::FullDay)
    }
}

impl std::fmt::Display for ShiftSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tipo de documento requerido para el conductor - mapea al ENUM document_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "document_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Contract,
    Annex,
    NotApplicable,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Contract => "contract",
            DocumentType::Annex => "annex",
            DocumentType::NotApplicable => "not_applicable",
        }
    }
}

/// Estado del asiento - mapea al ENUM seat_status
///
/// `cancelled` marca un asiento desplazado por la resolución de conflictos
/// en la activación de otra asignación; nunca se borra salvo hard delete
/// del padre.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "seat_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    Assigned,
    Cancelled,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Assigned => "assigned",
            SeatStatus::Cancelled => "cancelled",
        }
    }
}

/// AssignmentDriver - mapea exactamente a la tabla assignment_drivers
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssignmentDriver {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub driver_id: Uuid,
    pub shift_slot: ShiftSlot,
    pub document_type: DocumentType,
    pub pickup_location: String,
    /// Distancia del viaje compartida; duplicada en todos los asientos hermanos
    pub trip_distance_km: Decimal,
    pub confirmed: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Inicio provisional estampado al confirmar el asiento
    pub started_at: Option<DateTime<Utc>>,
    /// Estampado cuando el asiento es cancelado por desplazamiento
    pub finished_at: Option<DateTime<Utc>>,
    pub status: SeatStatus,
}

impl AssignmentDriver {
    pub fn is_cancelled(&self) -> bool {
        self.status == SeatStatus::Cancelled
    }
}
