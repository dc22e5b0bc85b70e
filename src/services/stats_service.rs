//! Servicio de estadísticas de flota
//!
//! Proyección de solo lectura sobre el modelo de asignaciones. Se recalcula
//! en cada consulta, nunca muta estado y devuelve ceros con datos vacíos.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{AllocationMode, AssignmentStatus, ShiftOccupancy, VehicleState};
use crate::repositories::RecordStore;
use crate::services::occupancy_service::free_slots;
use crate::utils::errors::AppError;

/// Contadores agregados de la flota para una fecha
#[derive(Debug, Clone, Serialize)]
pub struct FleetStats {
    pub date: NaiveDate,
    pub total_scheduled: i64,
    pub active_single_driver: i64,
    pub active_shift: i64,
    pub drivers_on_active_seat: i64,
    pub vehicles_with_active_assignment: i64,
    pub available_vehicles: i64,
    pub available_shift_slots: i64,
    pub scheduled_today: i64,
}

/// Servicio de estadísticas
#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn RecordStore>,
}

impl StatsService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Calcular los contadores de la flota para la fecha dada.
    pub async fn fleet_stats(&self, date: NaiveDate) -> Result<FleetStats, AppError> {
        let (
            total_scheduled,
            active_single_driver,
            active_shift,
            drivers_on_active_seat,
            vehicles_with_active_assignment,
            available_vehicles,
            scheduled_today,
            available_shift_slots,
        ) = futures::try_join!(
            self.store.count_assignments(AssignmentStatus::Scheduled, None),
            self.store
                .count_assignments(AssignmentStatus::Active, Some(AllocationMode::SingleDriver)),
            self.store
                .count_assignments(AssignmentStatus::Active, Some(AllocationMode::Shift)),
            self.store.count_distinct_active_drivers(),
            self.store.count_distinct_active_vehicles(),
            self.store.count_vehicles_in_state(VehicleState::Available),
            self.store.count_scheduled_on(date),
            self.available_shift_slots(date),
        )?;

        Ok(FleetStats {
            date,
            total_scheduled,
            active_single_driver,
            active_shift,
            drivers_on_active_seat,
            vehicles_with_active_assignment,
            available_vehicles,
            available_shift_slots,
            scheduled_today,
        })
    }

    // Suma de turnos libres (0..2 por vehículo) sobre todo el directorio
    async fn available_shift_slots(&self, date: NaiveDate) -> Result<i64, AppError> {
        let (vehicles, rows) = futures::try_join!(
            self.store.list_vehicles(),
            self.store.list_occupancy_on(date),
        )?;

        let mut by_vehicle: HashMap<Uuid, Vec<ShiftOccupancy>> = HashMap::new();
        for row in rows {
            by_vehicle.entry(row.vehicle_id).or_default().push(row);
        }

        let total = vehicles
            .iter()
            .map(|v| by_vehicle.get(&v.id).map_or(2, |r| free_slots(r)) as i64)
            .sum();

        Ok(total)
    }
}
