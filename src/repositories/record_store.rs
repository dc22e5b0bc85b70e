//! Contrato de persistencia para el motor de asignaciones
//!
//! Todas las operaciones de lectura/escritura sobre asignaciones, asientos,
//! ocupación de turnos y directorio (vehículos/conductores) pasan por este
//! trait. Esto permite usar Postgres en producción y un store en memoria
//! para tests sin tocar la lógica del motor.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    AllocationMode, Assignment, AssignmentDriver, AssignmentFilters, AssignmentStatus, Driver,
    ShiftOccupancy, Vehicle, VehicleState,
};
use crate::utils::errors::AppError;

/// Operaciones de persistencia del módulo de asignaciones.
///
/// Cada método que escribe varias filas (por ejemplo `replace_occupancy` o
/// `delete_seats_by_assignment`) debe aplicar sus cambios de forma atómica:
/// la implementación Postgres usa una transacción y la de memoria mantiene
/// un único write-lock durante toda la mutación.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    // --- Asignaciones ---

    async fn insert_assignment(&self, assignment: &Assignment) -> Result<(), AppError>;

    async fn find_assignment(&self, id: Uuid) -> Result<Option<Assignment>, AppError>;

    /// Persistir el estado completo de una asignación ya existente.
    async fn update_assignment(&self, assignment: &Assignment) -> Result<(), AppError>;

    async fn delete_assignment(&self, id: Uuid) -> Result<(), AppError>;

    /// Asignaciones de un vehículo cuyo estado esté en `statuses`.
    async fn find_assignments_by_vehicle(
        &self,
        vehicle_id: Uuid,
        statuses: &[AssignmentStatus],
    ) -> Result<Vec<Assignment>, AppError>;

    async fn list_assignments(
        &self,
        filters: &AssignmentFilters,
    ) -> Result<Vec<Assignment>, AppError>;

    async fn assignment_code_exists(&self, code: &str) -> Result<bool, AppError>;

    // --- Asientos (conductores por asignación) ---

    async fn insert_assignment_driver(&self, seat: &AssignmentDriver) -> Result<(), AppError>;

    async fn find_assignment_driver(
        &self,
        id: Uuid,
    ) -> Result<Option<AssignmentDriver>, AppError>;

    async fn update_assignment_driver(&self, seat: &AssignmentDriver) -> Result<(), AppError>;

    async fn find_seats_by_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<Vec<AssignmentDriver>, AppError>;

    async fn delete_seats_by_assignment(&self, assignment_id: Uuid) -> Result<(), AppError>;

    /// Asientos no cancelados de un conductor cuya asignación padre está
    /// activa, excluyendo la asignación indicada.
    async fn find_assigned_seats_on_active(
        &self,
        driver_id: Uuid,
        exclude_assignment: Uuid,
    ) -> Result<Vec<AssignmentDriver>, AppError>;

    // --- Ocupación de turnos ---

    /// Reemplazar la ocupación de un vehículo en una fecha por `rows`.
    /// Borra las filas anteriores e inserta las nuevas en una sola operación.
    async fn replace_occupancy(
        &self,
        vehicle_id: Uuid,
        date: NaiveDate,
        rows: Vec<ShiftOccupancy>,
    ) -> Result<(), AppError>;

    async fn release_occupancy(&self, vehicle_id: Uuid, date: NaiveDate) -> Result<(), AppError>;

    async fn list_occupancy(
        &self,
        vehicle_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<ShiftOccupancy>, AppError>;

    async fn list_occupancy_on(&self, date: NaiveDate) -> Result<Vec<ShiftOccupancy>, AppError>;

    async fn delete_occupancy_for_seats(&self, seat_ids: &[Uuid]) -> Result<(), AppError>;

    // --- Directorio ---

    async fn find_vehicle(&self, id: Uuid) -> Result<Option<Vehicle>, AppError>;

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, AppError>;

    async fn set_vehicle_state(&self, id: Uuid, state: VehicleState) -> Result<(), AppError>;

    async fn find_driver(&self, id: Uuid) -> Result<Option<Driver>, AppError>;

    async fn count_vehicles_in_state(&self, state: VehicleState) -> Result<i64, AppError>;

    // --- Conteos para estadísticas ---

    async fn count_assignments(
        &self,
        status: AssignmentStatus,
        mode: Option<AllocationMode>,
    ) -> Result<i64, AppError>;

    async fn count_scheduled_on(&self, date: NaiveDate) -> Result<i64, AppError>;

    /// Conductores distintos con asiento confirmado en asignaciones activas.
    async fn count_distinct_active_drivers(&self) -> Result<i64, AppError>;

    /// Vehículos distintos con al menos una asignación activa.
    async fn count_distinct_active_vehicles(&self) -> Result<i64, AppError>;
}
