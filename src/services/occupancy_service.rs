//! Servicio de ocupación de turnos
//!
//! Lleva el registro de qué turnos (día/noche) de cada vehículo están
//! comprometidos en cada fecha. Las filas se crean solo en la activación y
//! se reconstruyen de forma idempotente, así que sobreviven a reintentos.
//!
//! La ocupación no bloquea confirmaciones: el guard de conflictos es la
//! supersesión en la activación. Una asignación agendada sobre un turno ya
//! ocupado se detecta recién al activarla.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::models::{AssignmentDriver, SeatStatus, ShiftOccupancy};
use crate::repositories::RecordStore;
use crate::utils::errors::AppError;

/// Turnos libres (0 a 2) que dejan las filas de ocupación de un vehículo/fecha.
///
/// Una fila `full_day` cubre el turno de día y el de noche a la vez.
pub fn free_slots(rows: &[ShiftOccupancy]) -> u32 {
    let day_taken = rows.iter().any(|r| r.shift_slot.covers_day());
    let night_taken = rows.iter().any(|r| r.shift_slot.covers_night());
    2 - (day_taken as u32) - (night_taken as u32)
}

/// Servicio de ocupación de turnos por (vehículo, fecha)
#[derive(Clone)]
pub struct OccupancyService {
    store: Arc<dyn RecordStore>,
}

impl OccupancyService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Reconstruir la ocupación del vehículo en la fecha a partir de los
    /// asientos vigentes: una fila por asiento no cancelado. Reemplaza lo
    /// que hubiera antes, por lo que reservar dos veces no duplica filas.
    pub async fn reserve(
        &self,
        vehicle_id: Uuid,
        date: NaiveDate,
        seats: &[AssignmentDriver],
    ) -> Result<(), AppError> {
        let rows: Vec<ShiftOccupancy> = seats
            .iter()
            .filter(|seat| seat.status != SeatStatus::Cancelled)
            .map(|seat| ShiftOccupancy::new(vehicle_id, date, seat.shift_slot, seat.id))
            .collect();

        debug!(
            "💾 Reservando {} turno(s) para vehículo {} el {}",
            rows.len(),
            vehicle_id,
            date
        );
        self.store.replace_occupancy(vehicle_id, date, rows).await
    }

    /// Liberar toda la ocupación del vehículo en la fecha.
    pub async fn release(&self, vehicle_id: Uuid, date: NaiveDate) -> Result<(), AppError> {
        debug!("🧹 Liberando ocupación de vehículo {} el {}", vehicle_id, date);
        self.store.release_occupancy(vehicle_id, date).await
    }

    /// Turnos libres (0 a 2) del vehículo en la fecha.
    pub async fn count_available_slots(
        &self,
        vehicle_id: Uuid,
        date: NaiveDate,
    ) -> Result<u32, AppError> {
        let rows = self.store.list_occupancy(vehicle_id, date).await?;
        Ok(free_slots(&rows))
    }
}
