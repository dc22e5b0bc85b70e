//! Store Postgres del motor de asignaciones
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE allocation_mode AS ENUM ('single_driver', 'shift');
//! CREATE TYPE assignment_status AS ENUM ('scheduled', 'active', 'finalized', 'cancelled');
//! CREATE TYPE shift_slot AS ENUM ('day', 'night', 'full_day');
//! CREATE TYPE document_type AS ENUM ('contract', 'annex', 'not_applicable');
//! CREATE TYPE seat_status AS ENUM ('assigned', 'cancelled');
//! CREATE TYPE vehicle_state AS ENUM ('available', 'in_use', 'maintenance', 'out_of_service');
//!
//! CREATE TABLE vehicles (
//!     id UUID PRIMARY KEY,
//!     license_plate TEXT NOT NULL UNIQUE,
//!     brand TEXT,
//!     model TEXT,
//!     state vehicle_state NOT NULL DEFAULT 'available',
//!     site_id TEXT,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE TABLE drivers (
//!     id UUID PRIMARY KEY,
//!     full_name TEXT NOT NULL,
//!     license_number TEXT,
//!     active BOOLEAN NOT NULL DEFAULT TRUE,
//!     site_id TEXT,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE TABLE assignments (
//!     id UUID PRIMARY KEY,
//!     code TEXT NOT NULL UNIQUE,
//!     vehicle_id UUID NOT NULL REFERENCES vehicles(id),
//!     principal_driver_id UUID NOT NULL REFERENCES drivers(id),
//!     scheduled_date DATE NOT NULL,
//!     mode allocation_mode NOT NULL,
//!     status assignment_status NOT NULL DEFAULT 'scheduled',
//!     notes TEXT,
//!     site_id TEXT,
//!     created_by UUID,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     activated_at TIMESTAMPTZ,
//!     finished_at TIMESTAMPTZ
//! );
//!
//! CREATE TABLE assignment_drivers (
//!     id UUID PRIMARY KEY,
//!     assignment_id UUID NOT NULL REFERENCES assignments(id) ON DELETE CASCADE,
//!     driver_id UUID NOT NULL REFERENCES drivers(id),
//!     shift_slot shift_slot NOT NULL,
//!     document_type document_type NOT NULL,
//!     pickup_location TEXT NOT NULL,
//!     trip_distance_km NUMERIC(10, 2) NOT NULL,
//!     confirmed BOOLEAN NOT NULL DEFAULT FALSE,
//!     confirmed_at TIMESTAMPTZ,
//!     started_at TIMESTAMPTZ,
//!     finished_at TIMESTAMPTZ,
//!     status seat_status NOT NULL DEFAULT 'assigned'
//! );
//!
//! CREATE TABLE shift_occupancy (
//!     id UUID PRIMARY KEY,
//!     vehicle_id UUID NOT NULL REFERENCES vehicles(id),
//!     occupancy_date DATE NOT NULL,
//!     shift_slot shift_slot NOT NULL,
//!     assignment_driver_id UUID NOT NULL REFERENCES assignment_drivers(id) ON DELETE CASCADE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE TABLE assignment_history (
//!     id UUID PRIMARY KEY,
//!     entity_type TEXT NOT NULL,
//!     entity_id TEXT NOT NULL,
//!     event_type TEXT NOT NULL,
//!     previous_state TEXT,
//!     new_state TEXT,
//!     details JSONB,
//!     actor UUID,
//!     module TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE INDEX idx_assignments_vehicle_status ON assignments (vehicle_id, status);
//! CREATE INDEX idx_assignment_drivers_driver ON assignment_drivers (driver_id)
//!     WHERE status = 'assigned';
//! CREATE INDEX idx_shift_occupancy_vehicle_date ON shift_occupancy (vehicle_id, occupancy_date);
//! ```

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    AllocationMode, Assignment, AssignmentDriver, AssignmentFilters, AssignmentStatus, Driver,
    ShiftOccupancy, Vehicle, VehicleState,
};
use crate::repositories::record_store::RecordStore;
use crate::utils::errors::{conflict_error, AppError};

/// Implementación Postgres del contrato de persistencia
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_assignment(&self, assignment: &Assignment) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO assignments
                (id, code, vehicle_id, principal_driver_id, scheduled_date, mode, status,
                 notes, site_id, created_by, created_at, activated_at, finished_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(assignment.id)
        .bind(&assignment.code)
        .bind(assignment.vehicle_id)
        .bind(assignment.principal_driver_id)
        .bind(assignment.scheduled_date)
        .bind(assignment.mode)
        .bind(assignment.status)
        .bind(&assignment.notes)
        .bind(&assignment.site_id)
        .bind(assignment.created_by)
        .bind(assignment.created_at)
        .bind(assignment.activated_at)
        .bind(assignment.finished_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_assignment_error(e, &assignment.code))?;

        Ok(())
    }

    async fn find_assignment(&self, id: Uuid) -> Result<Option<Assignment>, AppError> {
        let assignment =
            sqlx::query_as::<_, Assignment>("SELECT * FROM assignments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::Dependency(format!("Error finding assignment: {}", e)))?;

        Ok(assignment)
    }

    async fn update_assignment(&self, assignment: &Assignment) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE assignments
            SET code = $2, vehicle_id = $3, principal_driver_id = $4, scheduled_date = $5,
                mode = $6, status = $7, notes = $8, site_id = $9, created_by = $10,
                activated_at = $11, finished_at = $12
            WHERE id = $1
            "#,
        )
        .bind(assignment.id)
        .bind(&assignment.code)
        .bind(assignment.vehicle_id)
        .bind(assignment.principal_driver_id)
        .bind(assignment.scheduled_date)
        .bind(assignment.mode)
        .bind(assignment.status)
        .bind(&assignment.notes)
        .bind(&assignment.site_id)
        .bind(assignment.created_by)
        .bind(assignment.activated_at)
        .bind(assignment.finished_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Dependency(format!("Error updating assignment: {}", e)))?;

        Ok(())
    }

    async fn delete_assignment(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM assignments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Dependency(format!("Error deleting assignment: {}", e)))?;

        Ok(())
    }

    async fn find_assignments_by_vehicle(
        &self,
        vehicle_id: Uuid,
        statuses: &[AssignmentStatus],
    ) -> Result<Vec<Assignment>, AppError> {
        let status_values: Vec<String> =
            statuses.iter().map(|s| s.as_str().to_string()).collect();

        let assignments = sqlx::query_as::<_, Assignment>(
            r#"
            SELECT * FROM assignments
            WHERE vehicle_id = $1 AND status::text = ANY($2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(vehicle_id)
        .bind(&status_values)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Dependency(format!("Error listing vehicle assignments: {}", e)))?;

        Ok(assignments)
    }

    async fn list_assignments(
        &self,
        filters: &AssignmentFilters,
    ) -> Result<Vec<Assignment>, AppError> {
        let limit = filters.limit.unwrap_or(100).clamp(1, 500);
        let offset = filters.offset.unwrap_or(0).max(0);

        let assignments = sqlx::query_as::<_, Assignment>(
            r#"
            SELECT a.* FROM assignments a
            WHERE ($1 IS NULL OR a.status = $1)
              AND ($2 IS NULL OR a.vehicle_id = $2)
              AND ($3 IS NULL OR EXISTS (
                    SELECT 1 FROM assignment_drivers ad
                    WHERE ad.assignment_id = a.id
                      AND ad.driver_id = $3
                      AND ad.status <> 'cancelled'))
              AND ($4 IS NULL OR a.scheduled_date = $4)
            ORDER BY a.created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filters.status)
        .bind(filters.vehicle_id)
        .bind(filters.driver_id)
        .bind(filters.scheduled_date)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Dependency(format!("Error listing assignments: {}", e)))?;

        Ok(assignments)
    }

    async fn assignment_code_exists(&self, code: &str) -> Result<bool, AppError> {
        let result: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM assignments WHERE code = $1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::Dependency(format!("Error checking assignment code: {}", e))
                })?;

        Ok(result.0)
    }

    async fn insert_assignment_driver(&self, seat: &AssignmentDriver) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO assignment_drivers
                (id, assignment_id, driver_id, shift_slot, document_type, pickup_location,
                 trip_distance_km, confirmed, confirmed_at, started_at, finished_at, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(seat.id)
        .bind(seat.assignment_id)
        .bind(seat.driver_id)
        .bind(seat.shift_slot)
        .bind(seat.document_type)
        .bind(&seat.pickup_location)
        .bind(seat.trip_distance_km)
        .bind(seat.confirmed)
        .bind(seat.confirmed_at)
        .bind(seat.started_at)
        .bind(seat.finished_at)
        .bind(seat.status)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Dependency(format!("Error creating assignment driver: {}", e)))?;

        Ok(())
    }

    async fn find_assignment_driver(
        &self,
        id: Uuid,
    ) -> Result<Option<AssignmentDriver>, AppError> {
        let seat = sqlx::query_as::<_, AssignmentDriver>(
            "SELECT * FROM assignment_drivers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Dependency(format!("Error finding assignment driver: {}", e)))?;

        Ok(seat)
    }

    async fn update_assignment_driver(&self, seat: &AssignmentDriver) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE assignment_drivers
            SET driver_id = $2, shift_slot = $3, document_type = $4, pickup_location = $5,
                trip_distance_km = $6, confirmed = $7, confirmed_at = $8, started_at = $9,
                finished_at = $10, status = $11
            WHERE id = $1
            "#,
        )
        .bind(seat.id)
        .bind(seat.driver_id)
        .bind(seat.shift_slot)
        .bind(seat.document_type)
        .bind(&seat.pickup_location)
        .bind(seat.trip_distance_km)
        .bind(seat.confirmed)
        .bind(seat.confirmed_at)
        .bind(seat.started_at)
        .bind(seat.finished_at)
        .bind(seat.status)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Dependency(format!("Error updating assignment driver: {}", e)))?;

        Ok(())
    }

    async fn find_seats_by_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<Vec<AssignmentDriver>, AppError> {
        let seats = sqlx::query_as::<_, AssignmentDriver>(
            "SELECT * FROM assignment_drivers WHERE assignment_id = $1 ORDER BY shift_slot ASC",
        )
        .bind(assignment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Dependency(format!("Error listing assignment drivers: {}", e)))?;

        Ok(seats)
    }

    async fn delete_seats_by_assignment(&self, assignment_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM assignment_drivers WHERE assignment_id = $1")
            .bind(assignment_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::Dependency(format!("Error deleting assignment drivers: {}", e))
            })?;

        Ok(())
    }

    async fn find_assigned_seats_on_active(
        &self,
        driver_id: Uuid,
        exclude_assignment: Uuid,
    ) -> Result<Vec<AssignmentDriver>, AppError> {
        let seats = sqlx::query_as::<_, AssignmentDriver>(
            r#"
            SELECT ad.* FROM assignment_drivers ad
            JOIN assignments a ON a.id = ad.assignment_id
            WHERE ad.driver_id = $1
              AND ad.status = 'assigned'
              AND a.status = 'active'
              AND ad.assignment_id <> $2
            "#,
        )
        .bind(driver_id)
        .bind(exclude_assignment)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Dependency(format!("Error finding active seats: {}", e)))?;

        Ok(seats)
    }

    async fn replace_occupancy(
        &self,
        vehicle_id: Uuid,
        date: NaiveDate,
        rows: Vec<ShiftOccupancy>,
    ) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Dependency(format!("Error starting transaction: {}", e)))?;

        sqlx::query("DELETE FROM shift_occupancy WHERE vehicle_id = $1 AND occupancy_date = $2")
            .bind(vehicle_id)
            .bind(date)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Dependency(format!("Error clearing occupancy: {}", e)))?;

        for row in &rows {
            sqlx::query(
                r#"
                INSERT INTO shift_occupancy
                    (id, vehicle_id, occupancy_date, shift_slot, assignment_driver_id, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(row.id)
            .bind(row.vehicle_id)
            .bind(row.occupancy_date)
            .bind(row.shift_slot)
            .bind(row.assignment_driver_id)
            .bind(row.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Dependency(format!("Error inserting occupancy: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Dependency(format!("Error committing occupancy: {}", e)))?;

        Ok(())
    }

    async fn release_occupancy(&self, vehicle_id: Uuid, date: NaiveDate) -> Result<(), AppError> {
        sqlx::query("DELETE FROM shift_occupancy WHERE vehicle_id = $1 AND occupancy_date = $2")
            .bind(vehicle_id)
            .bind(date)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Dependency(format!("Error releasing occupancy: {}", e)))?;

        Ok(())
    }

    async fn list_occupancy(
        &self,
        vehicle_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<ShiftOccupancy>, AppError> {
        let rows = sqlx::query_as::<_, ShiftOccupancy>(
            "SELECT * FROM shift_occupancy WHERE vehicle_id = $1 AND occupancy_date = $2",
        )
        .bind(vehicle_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Dependency(format!("Error listing occupancy: {}", e)))?;

        Ok(rows)
    }

    async fn list_occupancy_on(&self, date: NaiveDate) -> Result<Vec<ShiftOccupancy>, AppError> {
        let rows = sqlx::query_as::<_, ShiftOccupancy>(
            "SELECT * FROM shift_occupancy WHERE occupancy_date = $1",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Dependency(format!("Error listing occupancy: {}", e)))?;

        Ok(rows)
    }

    async fn delete_occupancy_for_seats(&self, seat_ids: &[Uuid]) -> Result<(), AppError> {
        if seat_ids.is_empty() {
            return Ok(());
        }

        sqlx::query("DELETE FROM shift_occupancy WHERE assignment_driver_id = ANY($1)")
            .bind(seat_ids.to_vec())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Dependency(format!("Error deleting seat occupancy: {}", e)))?;

        Ok(())
    }

    async fn find_vehicle(&self, id: Uuid) -> Result<Option<Vehicle>, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Dependency(format!("Error finding vehicle: {}", e)))?;

        Ok(vehicle)
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, AppError> {
        let vehicles =
            sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles ORDER BY license_plate ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::Dependency(format!("Error listing vehicles: {}", e)))?;

        Ok(vehicles)
    }

    async fn set_vehicle_state(&self, id: Uuid, state: VehicleState) -> Result<(), AppError> {
        sqlx::query("UPDATE vehicles SET state = $2 WHERE id = $1")
            .bind(id)
            .bind(state)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Dependency(format!("Error updating vehicle state: {}", e)))?;

        Ok(())
    }

    async fn find_driver(&self, id: Uuid) -> Result<Option<Driver>, AppError> {
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Dependency(format!("Error finding driver: {}", e)))?;

        Ok(driver)
    }

    async fn count_vehicles_in_state(&self, state: VehicleState) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vehicles WHERE state = $1")
            .bind(state)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Dependency(format!("Error counting vehicles: {}", e)))?;

        Ok(row.0)
    }

    async fn count_assignments(
        &self,
        status: AssignmentStatus,
        mode: Option<AllocationMode>,
    ) -> Result<i64, AppError> {
        let row: (i64,) = match mode {
            Some(mode) => sqlx::query_as(
                "SELECT COUNT(*) FROM assignments WHERE status = $1 AND mode = $2",
            )
            .bind(status)
            .bind(mode)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Dependency(format!("Error counting assignments: {}", e)))?,
            None => sqlx::query_as("SELECT COUNT(*) FROM assignments WHERE status = $1")
                .bind(status)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::Dependency(format!("Error counting assignments: {}", e))
                })?,
        };

        Ok(row.0)
    }

    async fn count_scheduled_on(&self, date: NaiveDate) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM assignments WHERE status = 'scheduled' AND scheduled_date = $1",
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Dependency(format!("Error counting scheduled: {}", e)))?;

        Ok(row.0)
    }

    async fn count_distinct_active_drivers(&self) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT ad.driver_id) FROM assignment_drivers ad
            JOIN assignments a ON a.id = ad.assignment_id
            WHERE a.status = 'active' AND ad.status = 'assigned' AND ad.confirmed = TRUE
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Dependency(format!("Error counting active drivers: {}", e)))?;

        Ok(row.0)
    }

    async fn count_distinct_active_vehicles(&self) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT vehicle_id) FROM assignments WHERE status = 'active'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Dependency(format!("Error counting active vehicles: {}", e)))?;

        Ok(row.0)
    }
}

// La restricción UNIQUE sobre `code` es el respaldo contra la carrera de dos
// creaciones generando el mismo código: esa violación se mapea a Conflict,
// cualquier otro fallo del insert a Dependency.
fn insert_assignment_error(e: sqlx::Error, code: &str) -> AppError {
    if e.as_database_error()
        .is_some_and(|d| d.is_unique_violation())
    {
        return conflict_error("Assignment", "code", code);
    }
    AppError::Dependency(format!("Error creating assignment: {}", e))
}
