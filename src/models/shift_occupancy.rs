//! Modelo de ShiftOccupancy
//!
//! Registro desnormalizado de qué vehículo está comprometido en qué turno y
//! fecha. Se crea únicamente en la activación (no al agendar) y es derivable
//! a partir de Assignment + AssignmentDriver; existe para responder
//! "¿está libre el turno de noche del vehículo V el día D?" sin re-escanear
//! asignaciones.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::assignment_driver::ShiftSlot;

/// ShiftOccupancy - mapea exactamente a la tabla shift_occupancy
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShiftOccupancy {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub occupancy_date: NaiveDate,
    pub shift_slot: ShiftSlot,
    pub assignment_driver_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ShiftOccupancy {
    pub fn new(
        vehicle_id: Uuid,
        occupancy_date: NaiveDate,
        shift_slot: ShiftSlot,
        assignment_driver_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            occupancy_date,
            shift_slot,
            assignment_driver_id,
            created_at: Utc::now(),
        }
    }
}
