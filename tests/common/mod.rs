//! Harness compartido para los tests de integración del motor
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use fleet_assignment::audit::AuditLogger;
use fleet_assignment::dto::assignment_dto::{
    ConfirmDriversRequest, CreateAssignmentRequest, DriverSelection,
};
use fleet_assignment::models::{
    AllocationMode, AuditEvent, DocumentType, Driver, SeatStatus, Vehicle, VehicleState,
};
use fleet_assignment::repositories::MemoryRecordStore;
use fleet_assignment::services::{AllocationService, StatsService};
use fleet_assignment::utils::errors::AppError;

/// Audit logger que acumula los eventos recibidos
#[derive(Default)]
pub struct RecordingAuditLogger {
    pub events: Mutex<Vec<AuditEvent>>,
}

#[async_trait::async_trait]
impl AuditLogger for RecordingAuditLogger {
    async fn record_event(&self, event: AuditEvent) -> Result<(), AppError> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Audit logger que falla siempre, para verificar que el motor lo tolera
pub struct FailingAuditLogger;

#[async_trait::async_trait]
impl AuditLogger for FailingAuditLogger {
    async fn record_event(&self, _event: AuditEvent) -> Result<(), AppError> {
        Err(AppError::Dependency("audit log caído".to_string()))
    }
}

pub struct TestContext {
    pub store: Arc<MemoryRecordStore>,
    pub audit: Arc<RecordingAuditLogger>,
    pub engine: AllocationService,
    pub stats: StatsService,
}

/// Motor sobre el store en memoria, con audit logger que graba eventos
pub fn build_context() -> TestContext {
    let store = Arc::new(MemoryRecordStore::new());
    let audit = Arc::new(RecordingAuditLogger::default());
    let engine = AllocationService::new(store.clone(), audit.clone(), "AS".to_string());
    let stats = StatsService::new(store.clone());
    TestContext {
        store,
        audit,
        engine,
        stats,
    }
}

/// Motor cuyo audit logger falla en cada evento
pub fn build_context_with_failing_audit() -> TestContext {
    let store = Arc::new(MemoryRecordStore::new());
    let audit = Arc::new(RecordingAuditLogger::default());
    let engine = AllocationService::new(
        store.clone(),
        Arc::new(FailingAuditLogger),
        "AS".to_string(),
    );
    let stats = StatsService::new(store.clone());
    TestContext {
        store,
        audit,
        engine,
        stats,
    }
}

pub async fn seed_vehicle(ctx: &TestContext, license_plate: &str) -> Uuid {
    let id = Uuid::new_v4();
    ctx.store
        .put_vehicle(Vehicle {
            id,
            license_plate: license_plate.to_string(),
            brand: None,
            model: None,
            state: VehicleState::Available,
            site_id: None,
            created_at: Utc::now(),
        })
        .await;
    id
}

pub async fn seed_driver(ctx: &TestContext, full_name: &str) -> Uuid {
    let id = Uuid::new_v4();
    ctx.store
        .put_driver(Driver {
            id,
            full_name: full_name.to_string(),
            license_number: None,
            active: true,
            site_id: None,
            created_at: Utc::now(),
        })
        .await;
    id
}

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

/// Confirmar todos los asientos no cancelados y exigir la activación
pub async fn confirm_all(ctx: &TestContext, assignment_id: Uuid) {
    let (_, seats) = ctx.engine.get_assignment(assignment_id).await.unwrap();
    let seat_ids: Vec<Uuid> = seats
        .iter()
        .filter(|s| s.status != SeatStatus::Cancelled)
        .map(|s| s.id)
        .collect();
    let result = ctx
        .engine
        .confirm_drivers(
            assignment_id,
            ConfirmDriversRequest {
                seat_ids,
                comments: None,
            },
            None,
        )
        .await
        .unwrap();
    assert!(result.complete);
}

pub fn selection(driver_id: Uuid, document_type: DocumentType, pickup: &str) -> DriverSelection {
    DriverSelection {
        driver_id,
        document_type,
        pickup_location: pickup.to_string(),
    }
}

pub fn single_driver_request(
    vehicle_id: Uuid,
    driver_id: Uuid,
    date: NaiveDate,
) -> CreateAssignmentRequest {
    CreateAssignmentRequest {
        vehicle_id,
        mode: AllocationMode::SingleDriver,
        driver: Some(selection(driver_id, DocumentType::Contract, "Depot A")),
        day_driver: None,
        night_driver: None,
        scheduled_date: date,
        trip_distance_km: Some(Decimal::from(120)),
        notes: None,
        site_id: None,
    }
}

pub fn shift_request(
    vehicle_id: Uuid,
    day_driver: Option<Uuid>,
    night_driver: Option<Uuid>,
    date: NaiveDate,
) -> CreateAssignmentRequest {
    CreateAssignmentRequest {
        vehicle_id,
        mode: AllocationMode::Shift,
        driver: None,
        day_driver: day_driver.map(|id| selection(id, DocumentType::Contract, "Depot A")),
        night_driver: night_driver.map(|id| selection(id, DocumentType::Annex, "Depot B")),
        scheduled_date: date,
        trip_distance_km: Some(Decimal::from(120)),
        notes: None,
        site_id: None,
    }
}
