//! Tests de integración del ciclo de vida de asignaciones
//!
//! Ejercitan el motor completo sobre el store en memoria: agendado,
//! confirmación en dos fases, activación con supersesión y desplazamiento,
//! cancelación y borrado administrativo.

mod common;

use rust_decimal::Decimal;
use uuid::Uuid;

use fleet_assignment::dto::assignment_dto::{CancelAssignmentRequest, ConfirmDriversRequest};
use fleet_assignment::models::{
    AssignmentFilters, AssignmentStatus, SeatStatus, ShiftSlot, VehicleState,
};
use fleet_assignment::repositories::RecordStore;
use fleet_assignment::utils::errors::AppError;

use common::{
    build_context, build_context_with_failing_audit, confirm_all, seed_driver, seed_vehicle,
    shift_request, single_driver_request, test_date,
};

fn cancel_request(reason: &str) -> CancelAssignmentRequest {
    CancelAssignmentRequest {
        reason: reason.to_string(),
    }
}

// ============ Creación ============

#[tokio::test]
async fn test_create_single_driver_schedules_full_day_seat() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "AA-111-AA").await;
    let driver_id = seed_driver(&ctx, "Marta Ruiz").await;

    let (assignment, seats) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, driver_id, test_date()), None)
        .await
        .unwrap();

    assert_eq!(assignment.status, AssignmentStatus::Scheduled);
    assert_eq!(assignment.principal_driver_id, driver_id);
    assert!(assignment.code.starts_with("AS-"));
    assert!(assignment.activated_at.is_none());

    assert_eq!(seats.len(), 1);
    assert_eq!(seats[0].shift_slot, ShiftSlot::FullDay);
    assert!(!seats[0].confirmed);
    assert_eq!(seats[0].status, SeatStatus::Assigned);
}

#[tokio::test]
async fn test_create_shift_schedules_day_and_night_seats() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "BB-222-BB").await;
    let day_driver = seed_driver(&ctx, "Marta Ruiz").await;
    let night_driver = seed_driver(&ctx, "Jorge Paz").await;

    let (assignment, seats) = ctx
        .engine
        .create_assignment(
            shift_request(vehicle_id, Some(day_driver), Some(night_driver), test_date()),
            None,
        )
        .await
        .unwrap();

    assert_eq!(seats.len(), 2);
    assert_eq!(seats[0].shift_slot, ShiftSlot::Day);
    assert_eq!(seats[0].driver_id, day_driver);
    assert_eq!(seats[1].shift_slot, ShiftSlot::Night);
    assert_eq!(seats[1].driver_id, night_driver);
    // El principal es el conductor de día
    assert_eq!(assignment.principal_driver_id, day_driver);

    // Agendar no reserva nada: el vehículo sigue disponible y sin ocupación
    let vehicle = ctx.store.find_vehicle(vehicle_id).await.unwrap().unwrap();
    assert_eq!(vehicle.state, VehicleState::Available);
    let occupancy = ctx.store.list_occupancy(vehicle_id, test_date()).await.unwrap();
    assert!(occupancy.is_empty());
}

#[tokio::test]
async fn test_create_requires_trip_distance() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "CC-333-CC").await;
    let driver_id = seed_driver(&ctx, "Marta Ruiz").await;

    let mut request = single_driver_request(vehicle_id, driver_id, test_date());
    request.trip_distance_km = None;

    let err = ctx.engine.create_assignment(request, None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_create_rejects_zero_distance() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "DD-444-DD").await;
    let driver_id = seed_driver(&ctx, "Marta Ruiz").await;

    let mut request = single_driver_request(vehicle_id, driver_id, test_date());
    request.trip_distance_km = Some(Decimal::ZERO);

    let err = ctx.engine.create_assignment(request, None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_create_rejects_unknown_vehicle() {
    let ctx = build_context();
    let driver_id = seed_driver(&ctx, "Marta Ruiz").await;

    let request = single_driver_request(Uuid::new_v4(), driver_id, test_date());
    let err = ctx.engine.create_assignment(request, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_create_rejects_unknown_driver() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "EE-555-EE").await;

    let request = single_driver_request(vehicle_id, Uuid::new_v4(), test_date());
    let err = ctx.engine.create_assignment(request, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_create_allows_queueing_on_busy_vehicle() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "FF-666-FF").await;
    let d1 = seed_driver(&ctx, "Marta Ruiz").await;
    let d2 = seed_driver(&ctx, "Jorge Paz").await;
    let d3 = seed_driver(&ctx, "Lucía Vega").await;

    let (active, _) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, d1, test_date()), None)
        .await
        .unwrap();
    confirm_all(&ctx, active.id).await;

    // El vehículo está in_use y aun así acepta más agendadas en cola
    let (queued_a, _) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, d2, test_date()), None)
        .await
        .unwrap();
    let (queued_b, _) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, d3, test_date()), None)
        .await
        .unwrap();

    assert_eq!(queued_a.status, AssignmentStatus::Scheduled);
    assert_eq!(queued_b.status, AssignmentStatus::Scheduled);

    let open = ctx
        .store
        .find_assignments_by_vehicle(
            vehicle_id,
            &[AssignmentStatus::Scheduled, AssignmentStatus::Active],
        )
        .await
        .unwrap();
    assert_eq!(open.len(), 3);
}

#[tokio::test]
async fn test_get_assignment_not_found() {
    let ctx = build_context();
    let err = ctx.engine.get_assignment(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ============ Confirmación y activación ============

#[tokio::test]
async fn test_partial_confirmation_keeps_assignment_scheduled() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "GG-777-GG").await;
    let day_driver = seed_driver(&ctx, "Marta Ruiz").await;
    let night_driver = seed_driver(&ctx, "Jorge Paz").await;

    let (assignment, seats) = ctx
        .engine
        .create_assignment(
            shift_request(vehicle_id, Some(day_driver), Some(night_driver), test_date()),
            None,
        )
        .await
        .unwrap();

    let result = ctx
        .engine
        .confirm_drivers(
            assignment.id,
            ConfirmDriversRequest {
                seat_ids: vec![seats[0].id],
                comments: None,
            },
            None,
        )
        .await
        .unwrap();

    assert!(!result.complete);
    assert_eq!(result.pending, 1);

    let (after, seats_after) = ctx.engine.get_assignment(assignment.id).await.unwrap();
    assert_eq!(after.status, AssignmentStatus::Scheduled);
    assert!(seats_after[0].confirmed);
    assert!(seats_after[0].confirmed_at.is_some());
    assert!(!seats_after[1].confirmed);

    // Sin quórum el vehículo no se toca
    let vehicle = ctx.store.find_vehicle(vehicle_id).await.unwrap().unwrap();
    assert_eq!(vehicle.state, VehicleState::Available);
}

#[tokio::test]
async fn test_full_confirmation_activates_assignment() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "HH-888-HH").await;
    let day_driver = seed_driver(&ctx, "Marta Ruiz").await;
    let night_driver = seed_driver(&ctx, "Jorge Paz").await;

    let (assignment, seats) = ctx
        .engine
        .create_assignment(
            shift_request(vehicle_id, Some(day_driver), Some(night_driver), test_date()),
            None,
        )
        .await
        .unwrap();

    let result = ctx
        .engine
        .confirm_drivers(
            assignment.id,
            ConfirmDriversRequest {
                seat_ids: seats.iter().map(|s| s.id).collect(),
                comments: Some("Llaves entregadas en portería".to_string()),
            },
            None,
        )
        .await
        .unwrap();
    assert!(result.complete);
    assert_eq!(result.pending, 0);

    let (after, _) = ctx.engine.get_assignment(assignment.id).await.unwrap();
    assert_eq!(after.status, AssignmentStatus::Active);
    assert!(after.activated_at.is_some());
    assert!(after.notes.as_deref().unwrap().contains("Llaves entregadas"));

    let vehicle = ctx.store.find_vehicle(vehicle_id).await.unwrap().unwrap();
    assert_eq!(vehicle.state, VehicleState::InUse);

    // La activación materializa la ocupación de ambos turnos
    let occupancy = ctx.store.list_occupancy(vehicle_id, test_date()).await.unwrap();
    assert_eq!(occupancy.len(), 2);
    assert!(occupancy.iter().any(|o| o.shift_slot == ShiftSlot::Day));
    assert!(occupancy.iter().any(|o| o.shift_slot == ShiftSlot::Night));
}

#[tokio::test]
async fn test_two_driver_shift_end_to_end() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "ZC-120-ZC").await;
    let d1 = seed_driver(&ctx, "Marta Ruiz").await;
    let d2 = seed_driver(&ctx, "Jorge Paz").await;

    let (assignment, seats) = ctx
        .engine
        .create_assignment(shift_request(vehicle_id, Some(d1), Some(d2), test_date()), None)
        .await
        .unwrap();
    assert_eq!(assignment.status, AssignmentStatus::Scheduled);
    assert_eq!(seats.len(), 2);
    assert!(seats.iter().all(|s| !s.confirmed));

    // Confirma el conductor de día: queda uno pendiente
    let first = ctx
        .engine
        .confirm_drivers(
            assignment.id,
            ConfirmDriversRequest {
                seat_ids: vec![seats[0].id],
                comments: None,
            },
            None,
        )
        .await
        .unwrap();
    assert!(!first.complete);
    assert_eq!(first.pending, 1);

    // Confirma el de noche: quórum alcanzado, se activa todo
    let second = ctx
        .engine
        .confirm_drivers(
            assignment.id,
            ConfirmDriversRequest {
                seat_ids: vec![seats[1].id],
                comments: None,
            },
            None,
        )
        .await
        .unwrap();
    assert!(second.complete);

    let (active, _) = ctx.engine.get_assignment(assignment.id).await.unwrap();
    assert_eq!(active.status, AssignmentStatus::Active);
    let vehicle = ctx.store.find_vehicle(vehicle_id).await.unwrap().unwrap();
    assert_eq!(vehicle.state, VehicleState::InUse);
    let occupancy = ctx.store.list_occupancy(vehicle_id, test_date()).await.unwrap();
    assert_eq!(occupancy.len(), 2);
}

#[tokio::test]
async fn test_confirmation_is_idempotent() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "II-999-II").await;
    let day_driver = seed_driver(&ctx, "Marta Ruiz").await;
    let night_driver = seed_driver(&ctx, "Jorge Paz").await;

    let (assignment, seats) = ctx
        .engine
        .create_assignment(
            shift_request(vehicle_id, Some(day_driver), Some(night_driver), test_date()),
            None,
        )
        .await
        .unwrap();
    let day_seat_id = seats[0].id;

    ctx.engine
        .confirm_drivers(
            assignment.id,
            ConfirmDriversRequest {
                seat_ids: vec![day_seat_id],
                comments: None,
            },
            None,
        )
        .await
        .unwrap();
    let first = ctx
        .store
        .find_assignment_driver(day_seat_id)
        .await
        .unwrap()
        .unwrap();

    // Repetir la confirmación no debe pisar el timestamp original
    let result = ctx
        .engine
        .confirm_drivers(
            assignment.id,
            ConfirmDriversRequest {
                seat_ids: vec![day_seat_id],
                comments: None,
            },
            None,
        )
        .await
        .unwrap();
    assert!(!result.complete);

    let second = ctx
        .store
        .find_assignment_driver(day_seat_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.confirmed_at, second.confirmed_at);
}

#[tokio::test]
async fn test_confirm_rejects_foreign_seat() {
    let ctx = build_context();
    let v1 = seed_vehicle(&ctx, "JJ-101-JJ").await;
    let v2 = seed_vehicle(&ctx, "KK-202-KK").await;
    let d1 = seed_driver(&ctx, "Marta Ruiz").await;
    let d2 = seed_driver(&ctx, "Jorge Paz").await;

    let (a1, _) = ctx
        .engine
        .create_assignment(single_driver_request(v1, d1, test_date()), None)
        .await
        .unwrap();
    let (_, seats_b) = ctx
        .engine
        .create_assignment(single_driver_request(v2, d2, test_date()), None)
        .await
        .unwrap();

    let err = ctx
        .engine
        .confirm_drivers(
            a1.id,
            ConfirmDriversRequest {
                seat_ids: vec![seats_b[0].id],
                comments: None,
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = ctx
        .engine
        .confirm_drivers(
            a1.id,
            ConfirmDriversRequest {
                seat_ids: vec![Uuid::new_v4()],
                comments: None,
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_confirm_rejects_active_assignment() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "LL-303-LL").await;
    let driver_id = seed_driver(&ctx, "Marta Ruiz").await;

    let (assignment, seats) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, driver_id, test_date()), None)
        .await
        .unwrap();
    confirm_all(&ctx, assignment.id).await;

    let err = ctx
        .engine
        .confirm_drivers(
            assignment.id,
            ConfirmDriversRequest {
                seat_ids: vec![seats[0].id],
                comments: None,
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn test_activation_supersedes_active_assignment() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "MM-404-MM").await;
    let d1 = seed_driver(&ctx, "Marta Ruiz").await;
    let d2 = seed_driver(&ctx, "Jorge Paz").await;

    let (first, _) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, d1, test_date()), None)
        .await
        .unwrap();
    confirm_all(&ctx, first.id).await;

    let (second, _) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, d2, test_date()), None)
        .await
        .unwrap();
    confirm_all(&ctx, second.id).await;

    // La primera queda finalizada automáticamente con la marca de supersesión
    let (superseded, _) = ctx.engine.get_assignment(first.id).await.unwrap();
    assert_eq!(superseded.status, AssignmentStatus::Finalized);
    assert!(superseded.finished_at.is_some());
    let notes = superseded.notes.unwrap();
    assert!(notes.contains("[AUTO-CLOSED]"));
    assert!(notes.contains(&second.code));

    // Nunca más de una activa por vehículo
    let active = ctx
        .store
        .find_assignments_by_vehicle(vehicle_id, &[AssignmentStatus::Active])
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);

    let vehicle = ctx.store.find_vehicle(vehicle_id).await.unwrap().unwrap();
    assert_eq!(vehicle.state, VehicleState::InUse);
}

#[tokio::test]
async fn test_activation_displaces_driver_seat_elsewhere() {
    let ctx = build_context();
    let v1 = seed_vehicle(&ctx, "NN-505-NN").await;
    let v2 = seed_vehicle(&ctx, "OO-606-OO").await;
    let shared = seed_driver(&ctx, "Marta Ruiz").await;
    let other = seed_driver(&ctx, "Jorge Paz").await;

    let (first, first_seats) = ctx
        .engine
        .create_assignment(shift_request(v1, Some(shared), Some(other), test_date()), None)
        .await
        .unwrap();
    confirm_all(&ctx, first.id).await;

    // El conductor compartido se activa en otro vehículo
    let (second, _) = ctx
        .engine
        .create_assignment(single_driver_request(v2, shared, test_date()), None)
        .await
        .unwrap();
    confirm_all(&ctx, second.id).await;

    // Cae solo el asiento en conflicto; la asignación hermana sigue activa
    let (still_active, seats_after) = ctx.engine.get_assignment(first.id).await.unwrap();
    assert_eq!(still_active.status, AssignmentStatus::Active);

    let displaced = seats_after.iter().find(|s| s.id == first_seats[0].id).unwrap();
    assert_eq!(displaced.status, SeatStatus::Cancelled);
    assert!(displaced.finished_at.is_some());

    let untouched = seats_after.iter().find(|s| s.id == first_seats[1].id).unwrap();
    assert_eq!(untouched.status, SeatStatus::Assigned);
    assert!(untouched.confirmed);

    let v1_row = ctx.store.find_vehicle(v1).await.unwrap().unwrap();
    assert_eq!(v1_row.state, VehicleState::InUse);
}

// ============ Des-confirmación ============

#[tokio::test]
async fn test_unconfirm_resets_confirmation() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "PP-707-PP").await;
    let day_driver = seed_driver(&ctx, "Marta Ruiz").await;
    let night_driver = seed_driver(&ctx, "Jorge Paz").await;

    let (assignment, seats) = ctx
        .engine
        .create_assignment(
            shift_request(vehicle_id, Some(day_driver), Some(night_driver), test_date()),
            None,
        )
        .await
        .unwrap();
    ctx.engine
        .confirm_drivers(
            assignment.id,
            ConfirmDriversRequest {
                seat_ids: vec![seats[0].id],
                comments: None,
            },
            None,
        )
        .await
        .unwrap();

    let seat = ctx.engine.unconfirm_driver(seats[0].id, None).await.unwrap();
    assert!(!seat.confirmed);
    assert!(seat.confirmed_at.is_none());
    assert!(seat.started_at.is_none());

    // Repetir sobre un asiento ya no confirmado es un no-op
    let seat = ctx.engine.unconfirm_driver(seats[0].id, None).await.unwrap();
    assert!(!seat.confirmed);
}

#[tokio::test]
async fn test_unconfirm_rejects_active_parent() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "QQ-808-QQ").await;
    let driver_id = seed_driver(&ctx, "Marta Ruiz").await;

    let (assignment, seats) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, driver_id, test_date()), None)
        .await
        .unwrap();
    confirm_all(&ctx, assignment.id).await;

    let err = ctx
        .engine
        .unconfirm_driver(seats[0].id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

// ============ Cancelación ============

#[tokio::test]
async fn test_cancel_requires_reason() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "RR-909-RR").await;
    let driver_id = seed_driver(&ctx, "Marta Ruiz").await;

    let (assignment, _) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, driver_id, test_date()), None)
        .await
        .unwrap();

    let err = ctx
        .engine
        .cancel_assignment(assignment.id, cancel_request("   "), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let (unchanged, _) = ctx.engine.get_assignment(assignment.id).await.unwrap();
    assert_eq!(unchanged.status, AssignmentStatus::Scheduled);
}

#[tokio::test]
async fn test_cancel_rejects_active_assignment() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "SS-010-SS").await;
    let driver_id = seed_driver(&ctx, "Marta Ruiz").await;

    let (assignment, _) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, driver_id, test_date()), None)
        .await
        .unwrap();
    confirm_all(&ctx, assignment.id).await;

    let err = ctx
        .engine
        .cancel_assignment(assignment.id, cancel_request("Cambio de planes"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // Nada cambió: sigue activa y el vehículo en uso
    let (unchanged, _) = ctx.engine.get_assignment(assignment.id).await.unwrap();
    assert_eq!(unchanged.status, AssignmentStatus::Active);
    let vehicle = ctx.store.find_vehicle(vehicle_id).await.unwrap().unwrap();
    assert_eq!(vehicle.state, VehicleState::InUse);
}

#[tokio::test]
async fn test_cancel_appends_reason_and_resets_seats() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "TT-121-TT").await;
    let day_driver = seed_driver(&ctx, "Marta Ruiz").await;
    let night_driver = seed_driver(&ctx, "Jorge Paz").await;

    let (assignment, seats) = ctx
        .engine
        .create_assignment(
            shift_request(vehicle_id, Some(day_driver), Some(night_driver), test_date()),
            None,
        )
        .await
        .unwrap();
    // Confirmación parcial previa a la cancelación
    ctx.engine
        .confirm_drivers(
            assignment.id,
            ConfirmDriversRequest {
                seat_ids: vec![seats[0].id],
                comments: None,
            },
            None,
        )
        .await
        .unwrap();

    let cancelled = ctx
        .engine
        .cancel_assignment(assignment.id, cancel_request("Vehículo en taller"), None)
        .await
        .unwrap();

    assert_eq!(cancelled.status, AssignmentStatus::Cancelled);
    assert!(cancelled.finished_at.is_some());
    assert!(cancelled.notes.as_deref().unwrap().contains("Vehículo en taller"));

    let seat = ctx
        .store
        .find_assignment_driver(seats[0].id)
        .await
        .unwrap()
        .unwrap();
    assert!(!seat.confirmed);
    assert!(seat.confirmed_at.is_none());

    let vehicle = ctx.store.find_vehicle(vehicle_id).await.unwrap().unwrap();
    assert_eq!(vehicle.state, VehicleState::Available);
}

#[tokio::test]
async fn test_cancel_resets_vehicle_even_with_other_active() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "UU-232-UU").await;
    let d1 = seed_driver(&ctx, "Marta Ruiz").await;
    let d2 = seed_driver(&ctx, "Jorge Paz").await;

    let (active, _) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, d1, test_date()), None)
        .await
        .unwrap();
    confirm_all(&ctx, active.id).await;

    let (queued, _) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, d2, test_date()), None)
        .await
        .unwrap();

    // Cancelar la agendada libera el vehículo aunque otra siga activa
    ctx.engine
        .cancel_assignment(queued.id, cancel_request("Se reprograma"), None)
        .await
        .unwrap();

    let vehicle = ctx.store.find_vehicle(vehicle_id).await.unwrap().unwrap();
    assert_eq!(vehicle.state, VehicleState::Available);
    let (still_active, _) = ctx.engine.get_assignment(active.id).await.unwrap();
    assert_eq!(still_active.status, AssignmentStatus::Active);
}

// ============ Borrado administrativo ============

#[tokio::test]
async fn test_delete_cascades_seats_and_occupancy() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "VV-343-VV").await;
    let driver_id = seed_driver(&ctx, "Marta Ruiz").await;

    let (assignment, _) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, driver_id, test_date()), None)
        .await
        .unwrap();
    confirm_all(&ctx, assignment.id).await;

    ctx.engine.delete_assignment(assignment.id, None).await.unwrap();

    let err = ctx.engine.get_assignment(assignment.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let seats = ctx
        .store
        .find_seats_by_assignment(assignment.id)
        .await
        .unwrap();
    assert!(seats.is_empty());
    let occupancy = ctx.store.list_occupancy(vehicle_id, test_date()).await.unwrap();
    assert!(occupancy.is_empty());

    // Era la ocupante activa, así que el vehículo vuelve a estar disponible
    let vehicle = ctx.store.find_vehicle(vehicle_id).await.unwrap().unwrap();
    assert_eq!(vehicle.state, VehicleState::Available);
}

#[tokio::test]
async fn test_delete_scheduled_leaves_vehicle_untouched() {
    let ctx = build_context();
    let vehicle_id = seed_vehicle(&ctx, "WW-454-WW").await;
    let d1 = seed_driver(&ctx, "Marta Ruiz").await;
    let d2 = seed_driver(&ctx, "Jorge Paz").await;

    let (active, _) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, d1, test_date()), None)
        .await
        .unwrap();
    confirm_all(&ctx, active.id).await;

    let (queued, _) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, d2, test_date()), None)
        .await
        .unwrap();

    ctx.engine.delete_assignment(queued.id, None).await.unwrap();

    // Borrar una agendada no toca al ocupante actual
    let vehicle = ctx.store.find_vehicle(vehicle_id).await.unwrap().unwrap();
    assert_eq!(vehicle.state, VehicleState::InUse);
}

// ============ Listado ============

#[tokio::test]
async fn test_list_assignments_filters_by_status_and_driver() {
    let ctx = build_context();
    let v1 = seed_vehicle(&ctx, "XX-565-XX").await;
    let v2 = seed_vehicle(&ctx, "YY-676-YY").await;
    let d1 = seed_driver(&ctx, "Marta Ruiz").await;
    let d2 = seed_driver(&ctx, "Jorge Paz").await;

    let (kept, _) = ctx
        .engine
        .create_assignment(single_driver_request(v1, d1, test_date()), None)
        .await
        .unwrap();
    let (dropped, _) = ctx
        .engine
        .create_assignment(single_driver_request(v2, d2, test_date()), None)
        .await
        .unwrap();
    ctx.engine
        .cancel_assignment(dropped.id, cancel_request("Sin carga ese día"), None)
        .await
        .unwrap();

    let scheduled = ctx
        .engine
        .list_assignments(&AssignmentFilters {
            status: Some(AssignmentStatus::Scheduled),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].0.id, kept.id);

    let cancelled = ctx
        .engine
        .list_assignments(&AssignmentFilters {
            status: Some(AssignmentStatus::Cancelled),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].0.id, dropped.id);

    let by_driver = ctx
        .engine
        .list_assignments(&AssignmentFilters {
            driver_id: Some(d1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_driver.len(), 1);
    assert_eq!(by_driver[0].0.id, kept.id);
    assert_eq!(by_driver[0].1.len(), 1);
}

// ============ Auditoría ============

#[tokio::test]
async fn test_audit_trail_records_lifecycle() {
    let ctx = build_context();
    let actor = Uuid::new_v4();
    let vehicle_id = seed_vehicle(&ctx, "ZZ-787-ZZ").await;
    let day_driver = seed_driver(&ctx, "Marta Ruiz").await;
    let night_driver = seed_driver(&ctx, "Jorge Paz").await;

    let (assignment, seats) = ctx
        .engine
        .create_assignment(
            shift_request(vehicle_id, Some(day_driver), Some(night_driver), test_date()),
            Some(actor),
        )
        .await
        .unwrap();
    ctx.engine
        .confirm_drivers(
            assignment.id,
            ConfirmDriversRequest {
                seat_ids: seats.iter().map(|s| s.id).collect(),
                comments: None,
            },
            Some(actor),
        )
        .await
        .unwrap();

    let events = ctx.audit.events.lock().await;
    let count = |kind: &str| events.iter().filter(|e| e.event_type == kind).count();

    // Un evento de creación por par vehículo/conductor
    assert_eq!(count("assignment_created"), 2);
    assert_eq!(count("driver_confirmed"), 2);
    assert_eq!(count("assignment_activated"), 1);
    assert!(events.iter().all(|e| e.actor == Some(actor)));
    assert!(events.iter().all(|e| e.module == "allocation"));
}

#[tokio::test]
async fn test_audit_failure_never_blocks_operations() {
    let ctx = build_context_with_failing_audit();
    let vehicle_id = seed_vehicle(&ctx, "AB-898-AB").await;
    let d1 = seed_driver(&ctx, "Marta Ruiz").await;
    let d2 = seed_driver(&ctx, "Jorge Paz").await;

    // Todo el ciclo funciona aunque el historial falle en cada evento
    let (assignment, _) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, d1, test_date()), None)
        .await
        .unwrap();
    confirm_all(&ctx, assignment.id).await;

    let (other, _) = ctx
        .engine
        .create_assignment(single_driver_request(vehicle_id, d2, test_date()), None)
        .await
        .unwrap();
    ctx.engine
        .cancel_assignment(other.id, cancel_request("Prueba de resiliencia"), None)
        .await
        .unwrap();

    let (after, _) = ctx.engine.get_assignment(assignment.id).await.unwrap();
    assert_eq!(after.status, AssignmentStatus::Active);
}
