use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    AllocationMode, Assignment, AssignmentDriver, AssignmentStatus, DocumentType, SeatStatus,
    ShiftSlot,
};

// Selección de un conductor para un asiento de la asignación
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DriverSelection {
    pub driver_id: Uuid,
    pub document_type: DocumentType,
    #[validate(length(min = 1, max = 200))]
    pub pickup_location: String,
}

// Request para crear una asignación
//
// En modo single_driver se usa `driver`; en modo shift se usan `day_driver`
// y/o `night_driver`. La distancia es Option para que el motor pueda detectar
// su ausencia en llamadas programáticas y rechazarla con ValidationError.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAssignmentRequest {
    pub vehicle_id: Uuid,
    pub mode: AllocationMode,
    #[validate]
    pub driver: Option<DriverSelection>,
    #[validate]
    pub day_driver: Option<DriverSelection>,
    #[validate]
    pub night_driver: Option<DriverSelection>,
    pub scheduled_date: NaiveDate,
    pub trip_distance_km: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    pub site_id: Option<String>,
}

// Request para confirmar asientos de una asignación
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ConfirmDriversRequest {
    #[validate(length(min = 1))]
    pub seat_ids: Vec<Uuid>,
    #[validate(length(max = 1000))]
    pub comments: Option<String>,
}

// Request para cancelar una asignación agendada
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CancelAssignmentRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

// Response de un asiento
#[derive(Debug, Serialize)]
pub struct SeatResponse {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub driver_id: Uuid,
    pub shift_slot: ShiftSlot,
    pub document_type: DocumentType,
    pub pickup_location: String,
    pub trip_distance_km: Decimal,
    pub confirmed: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub status: SeatStatus,
}

impl From<AssignmentDriver> for SeatResponse {
    fn from(seat: AssignmentDriver) -> Self {
        Self {
            id: seat.id,
            assignment_id: seat.assignment_id,
            driver_id: seat.driver_id,
            shift_slot: seat.shift_slot,
            document_type: seat.document_type,
            pickup_location: seat.pickup_location,
            trip_distance_km: seat.trip_distance_km,
            confirmed: seat.confirmed,
            confirmed_at: seat.confirmed_at,
            status: seat.status,
        }
    }
}

// Response de asignación con sus asientos
#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub code: String,
    pub vehicle_id: Uuid,
    pub principal_driver_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub mode: AllocationMode,
    pub status: AssignmentStatus,
    pub notes: Option<String>,
    pub site_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub seats: Vec<SeatResponse>,
}

impl AssignmentResponse {
    pub fn from_parts(assignment: Assignment, seats: Vec<AssignmentDriver>) -> Self {
        Self {
            id: assignment.id,
            code: assignment.code,
            vehicle_id: assignment.vehicle_id,
            principal_driver_id: assignment.principal_driver_id,
            scheduled_date: assignment.scheduled_date,
            mode: assignment.mode,
            status: assignment.status,
            notes: assignment.notes,
            site_id: assignment.site_id,
            created_at: assignment.created_at,
            activated_at: assignment.activated_at,
            finished_at: assignment.finished_at,
            seats: seats.into_iter().map(SeatResponse::from).collect(),
        }
    }
}

// Response genérica
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            message: Some(message),
            data: None,
        }
    }
}
