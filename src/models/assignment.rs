//! Modelo de Assignment
//!
//! Este módulo contiene el struct Assignment (la asignación vehículo/conductores)
//! y sus enums de estado y modo. Mapea exactamente al schema PostgreSQL con
//! primary key 'id' y constraint de unicidad sobre 'code'.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado de la asignación - mapea al ENUM assignment_status
///
/// Transiciones válidas: scheduled → active → finalized, o scheduled → cancelled.
/// Una vez terminal (finalized/cancelled) la asignación es inmutable salvo
/// appends de notas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "assignment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Scheduled,
    Active,
    Finalized,
    Cancelled,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Scheduled => "scheduled",
            AssignmentStatus::Active => "active",
            AssignmentStatus::Finalized => "finalized",
            AssignmentStatus::Cancelled => "cancelled",
        }
    }

    /// Una asignación abierta (no terminal) ocupa la cola del vehículo
    pub fn is_open(&self) -> bool {
        matches!(self, AssignmentStatus::Scheduled | AssignmentStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modo de asignación - mapea al ENUM allocation_mode
///
/// `single_driver`: un único conductor encargado (asiento full_day).
/// `shift`: hasta dos conductores en turnos día/noche.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "allocation_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    SingleDriver,
    Shift,
}

impl AllocationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationMode::SingleDriver => "single_driver",
            AllocationMode::Shift => "shift",
        }
    }
}

impl std::fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assignment principal - mapea exactamente a la tabla assignments
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    /// Código de ticket legible, único y nunca reutilizado (ej. AS-204518)
    pub code: String,
    pub vehicle_id: Uuid,
    /// Conductor principal: el de día, o el único en modo single_driver
    pub principal_driver_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub mode: AllocationMode,
    pub status: AssignmentStatus,
    pub notes: Option<String>,
    pub site_id: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Assignment {
    /// Agregar una línea a las notas (las notas sólo crecen por append)
    pub fn append_note(&mut self, line: &str) {
        match &mut self.notes {
            Some(notes) => {
                notes.push('\n');
                notes.push_str(line);
            }
            None => self.notes = Some(line.to_string()),
        }
    }
}

// Filtros para búsqueda de asignaciones
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentFilters {
    pub status: Option<AssignmentStatus>,
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub scheduled_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_open() {
        assert!(AssignmentStatus::Scheduled.is_open());
        assert!(AssignmentStatus::Active.is_open());
        assert!(!AssignmentStatus::Finalized.is_open());
        assert!(!AssignmentStatus::Cancelled.is_open());
    }

    #[test]
    fn test_status_terminal_complement() {
        for status in [
            AssignmentStatus::Scheduled,
            AssignmentStatus::Active,
            AssignmentStatus::Finalized,
            AssignmentStatus::Cancelled,
        ] {
            assert_ne!(status.is_open(), status.is_terminal());
        }
    }

    #[test]
    fn test_mode_wire_spelling() {
        let single = serde_json::to_value(AllocationMode::SingleDriver).unwrap();
        assert_eq!(single, serde_json::json!("single_driver"));
        let shift = serde_json::to_value(AllocationMode::Shift).unwrap();
        assert_eq!(shift, serde_json::json!("shift"));
    }

    #[test]
    fn test_append_note() {
        let mut assignment = Assignment {
            id: Uuid::new_v4(),
            code: "AS-000001".to_string(),
            vehicle_id: Uuid::new_v4(),
            principal_driver_id: Uuid::new_v4(),
            scheduled_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            mode: AllocationMode::SingleDriver,
            status: AssignmentStatus::Scheduled,
            notes: None,
            site_id: None,
            created_by: None,
            created_at: Utc::now(),
            activated_at: None,
            finished_at: None,
        };

        assignment.append_note("primera nota");
        assert_eq!(assignment.notes.as_deref(), Some("primera nota"));

        assignment.append_note("[AUTO-CLOSED]");
        assert_eq!(
            assignment.notes.as_deref(),
            Some("primera nota\n[AUTO-CLOSED]")
        );
    }
}
