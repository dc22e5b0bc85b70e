//! Store en memoria para tests y entornos sin base de datos
//!
//! Mantiene los registros en HashMaps protegidos por un único RwLock, de
//! forma que cada mutación compuesta se aplica bajo un solo write-lock.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    AllocationMode, Assignment, AssignmentDriver, AssignmentFilters, AssignmentStatus, Driver,
    SeatStatus, ShiftOccupancy, ShiftSlot, Vehicle, VehicleState,
};
use crate::repositories::record_store::RecordStore;
use crate::utils::errors::AppError;

#[derive(Default)]
struct Inner {
    assignments: HashMap<Uuid, Assignment>,
    seats: HashMap<Uuid, AssignmentDriver>,
    occupancy: HashMap<Uuid, ShiftOccupancy>,
    vehicles: HashMap<Uuid, Vehicle>,
    drivers: HashMap<Uuid, Driver>,
}

#[derive(Default)]
pub struct MemoryRecordStore {
    inner: RwLock<Inner>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cargar un vehículo en el directorio.
    pub async fn put_vehicle(&self, vehicle: Vehicle) {
        let mut inner = self.inner.write().await;
        inner.vehicles.insert(vehicle.id, vehicle);
    }

    /// Cargar un conductor en el directorio.
    pub async fn put_driver(&self, driver: Driver) {
        let mut inner = self.inner.write().await;
        inner.drivers.insert(driver.id, driver);
    }
}

// Orden de los turnos, igual que el enum de Postgres
fn slot_rank(slot: ShiftSlot) -> u8 {
    match slot {
        ShiftSlot::Day => 0,
        ShiftSlot::Night => 1,
        ShiftSlot::FullDay => 2,
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_assignment(&self, assignment: &Assignment) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner.assignments.insert(assignment.id, assignment.clone());
        Ok(())
    }

    async fn find_assignment(&self, id: Uuid) -> Result<Option<Assignment>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.assignments.get(&id).cloned())
    }

    async fn update_assignment(&self, assignment: &Assignment) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner.assignments.insert(assignment.id, assignment.clone());
        Ok(())
    }

    async fn delete_assignment(&self, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner.assignments.remove(&id);
        Ok(())
    }

    async fn find_assignments_by_vehicle(
        &self,
        vehicle_id: Uuid,
        statuses: &[AssignmentStatus],
    ) -> Result<Vec<Assignment>, AppError> {
        let inner = self.inner.read().await;
        let mut result: Vec<Assignment> = inner
            .assignments
            .values()
            .filter(|a| a.vehicle_id == vehicle_id && statuses.contains(&a.status))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }

    async fn list_assignments(
        &self,
        filters: &AssignmentFilters,
    ) -> Result<Vec<Assignment>, AppError> {
        let limit = filters.limit.unwrap_or(100).clamp(1, 500) as usize;
        let offset = filters.offset.unwrap_or(0).max(0) as usize;

        let inner = self.inner.read().await;
        let mut result: Vec<Assignment> = inner
            .assignments
            .values()
            .filter(|a| filters.status.map_or(true, |s| a.status == s))
            .filter(|a| filters.vehicle_id.map_or(true, |v| a.vehicle_id == v))
            .filter(|a| {
                filters.scheduled_date.map_or(true, |d| a.scheduled_date == d)
            })
            .filter(|a| {
                filters.driver_id.map_or(true, |driver_id| {
                    inner.seats.values().any(|seat| {
                        seat.assignment_id == a.id
                            && seat.driver_id == driver_id
                            && seat.status != SeatStatus::Cancelled
                    })
                })
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result.into_iter().skip(offset).take(limit).collect())
    }

    async fn assignment_code_exists(&self, code: &str) -> Result<bool, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.assignments.values().any(|a| a.code == code))
    }

    async fn insert_assignment_driver(&self, seat: &AssignmentDriver) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner.seats.insert(seat.id, seat.clone());
        Ok(())
    }

    async fn find_assignment_driver(
        &self,
        id: Uuid,
    ) -> Result<Option<AssignmentDriver>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.seats.get(&id).cloned())
    }

    async fn update_assignment_driver(&self, seat: &AssignmentDriver) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner.seats.insert(seat.id, seat.clone());
        Ok(())
    }

    async fn find_seats_by_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<Vec<AssignmentDriver>, AppError> {
        let inner = self.inner.read().await;
        let mut seats: Vec<AssignmentDriver> = inner
            .seats
            .values()
            .filter(|s| s.assignment_id == assignment_id)
            .cloned()
            .collect();
        seats.sort_by_key(|s| slot_rank(s.shift_slot));
        Ok(seats)
    }

    async fn delete_seats_by_assignment(&self, assignment_id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner.seats.retain(|_, s| s.assignment_id != assignment_id);
        Ok(())
    }

    async fn find_assigned_seats_on_active(
        &self,
        driver_id: Uuid,
        exclude_assignment: Uuid,
    ) -> Result<Vec<AssignmentDriver>, AppError> {
        let inner = self.inner.read().await;
        let seats = inner
            .seats
            .values()
            .filter(|s| {
                s.driver_id == driver_id
                    && s.status == SeatStatus::Assigned
                    && s.assignment_id != exclude_assignment
                    && inner
                        .assignments
                        .get(&s.assignment_id)
                        .map_or(false, |a| a.status == AssignmentStatus::Active)
            })
            .cloned()
            .collect();
        Ok(seats)
    }

    async fn replace_occupancy(
        &self,
        vehicle_id: Uuid,
        date: NaiveDate,
        rows: Vec<ShiftOccupancy>,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner
            .occupancy
            .retain(|_, o| !(o.vehicle_id == vehicle_id && o.occupancy_date == date));
        for row in rows {
            inner.occupancy.insert(row.id, row);
        }
        Ok(())
    }

    async fn release_occupancy(&self, vehicle_id: Uuid, date: NaiveDate) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner
            .occupancy
            .retain(|_, o| !(o.vehicle_id == vehicle_id && o.occupancy_date == date));
        Ok(())
    }

    async fn list_occupancy(
        &self,
        vehicle_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<ShiftOccupancy>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .occupancy
            .values()
            .filter(|o| o.vehicle_id == vehicle_id && o.occupancy_date == date)
            .cloned()
            .collect())
    }

    async fn list_occupancy_on(&self, date: NaiveDate) -> Result<Vec<ShiftOccupancy>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .occupancy
            .values()
            .filter(|o| o.occupancy_date == date)
            .cloned()
            .collect())
    }

    async fn delete_occupancy_for_seats(&self, seat_ids: &[Uuid]) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner
            .occupancy
            .retain(|_, o| !seat_ids.contains(&o.assignment_driver_id));
        Ok(())
    }

    async fn find_vehicle(&self, id: Uuid) -> Result<Option<Vehicle>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.vehicles.get(&id).cloned())
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, AppError> {
        let inner = self.inner.read().await;
        let mut vehicles: Vec<Vehicle> = inner.vehicles.values().cloned().collect();
        vehicles.sort_by(|a, b| a.license_plate.cmp(&b.license_plate));
        Ok(vehicles)
    }

    async fn set_vehicle_state(&self, id: Uuid, state: VehicleState) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        if let Some(vehicle) = inner.vehicles.get_mut(&id) {
            vehicle.state = state;
        }
        Ok(())
    }

    async fn find_driver(&self, id: Uuid) -> Result<Option<Driver>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.drivers.get(&id).cloned())
    }

    async fn count_vehicles_in_state(&self, state: VehicleState) -> Result<i64, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.vehicles.values().filter(|v| v.state == state).count() as i64)
    }

    async fn count_assignments(
        &self,
        status: AssignmentStatus,
        mode: Option<AllocationMode>,
    ) -> Result<i64, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .assignments
            .values()
            .filter(|a| a.status == status && mode.map_or(true, |m| a.mode == m))
            .count() as i64)
    }

    async fn count_scheduled_on(&self, date: NaiveDate) -> Result<i64, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .assignments
            .values()
            .filter(|a| a.status == AssignmentStatus::Scheduled && a.scheduled_date == date)
            .count() as i64)
    }

    async fn count_distinct_active_drivers(&self) -> Result<i64, AppError> {
        let inner = self.inner.read().await;
        let drivers: HashSet<Uuid> = inner
            .seats
            .values()
            .filter(|s| {
                s.status == SeatStatus::Assigned
                    && s.confirmed
                    && inner
                        .assignments
                        .get(&s.assignment_id)
                        .map_or(false, |a| a.status == AssignmentStatus::Active)
            })
            .map(|s| s.driver_id)
            .collect();
        Ok(drivers.len() as i64)
    }

    async fn count_distinct_active_vehicles(&self) -> Result<i64, AppError> {
        let inner = self.inner.read().await;
        let vehicles: HashSet<Uuid> = inner
            .assignments
            .values()
            .filter(|a| a.status == AssignmentStatus::Active)
            .map(|a| a.vehicle_id)
            .collect();
        Ok(vehicles.len() as i64)
    }
}
