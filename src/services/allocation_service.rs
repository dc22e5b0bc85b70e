//! Motor de asignaciones
//!
//! Máquina de estados que lleva una asignación vehículo↔conductor(es) por
//! scheduled → active → finalized/cancelled. Concentra las reglas duras del
//! dominio:
//!
//! - a lo sumo una asignación activa por vehículo (supersesión automática
//!   al activar una nueva sobre el mismo vehículo),
//! - confirmación en dos fases: los asientos se confirman de a uno y la
//!   asignación recién se activa cuando todos los no cancelados confirmaron,
//! - desplazamiento a nivel asiento: al activar, los conductores confirmados
//!   pierden sus asientos vigentes en otras asignaciones activas,
//! - agendar nunca reserva el vehículo; solo la activación lo pasa a in_use.
//!
//! Las operaciones mutantes se serializan con locks en memoria por id de
//! asignación; las que tocan el estado del vehículo (activación, cancelación
//! y borrado) toman además el lock del vehículo. El orden de adquisición es
//! siempre asignación → vehículo. El store de producción debe aportar además
//! atomicidad transaccional (ver el contrato del trait).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::audit::AuditLogger;
use crate::dto::assignment_dto::{
    CancelAssignmentRequest, ConfirmDriversRequest, CreateAssignmentRequest, DriverSelection,
};
use crate::models::{
    AllocationMode, Assignment, AssignmentDriver, AssignmentFilters, AssignmentStatus,
    AuditEvent, SeatStatus, ShiftSlot, VehicleState,
};
use crate::repositories::RecordStore;
use crate::services::occupancy_service::OccupancyService;
use crate::utils::errors::{
    conflict_error, invalid_state_error, not_found_error, AppError,
};
use crate::utils::ticket::generate_ticket_code;
use crate::utils::validation::{validate_not_empty, validate_positive};

/// Resultado de una ronda de confirmación
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConfirmationResult {
    pub complete: bool,
    pub pending: usize,
}

// Registro de locks en memoria, uno por Uuid (asignación o vehículo).
// Los mutex se crean on-demand y quedan vivos; el universo de ids de una
// flota es chico, así que no se recolectan.
#[derive(Clone, Default)]
struct LockRegistry {
    locks: Arc<RwLock<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl LockRegistry {
    async fn acquire(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.write().await;
            map.entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Servicio central de asignaciones
#[derive(Clone)]
pub struct AllocationService {
    store: Arc<dyn RecordStore>,
    audit: Arc<dyn AuditLogger>,
    occupancy: OccupancyService,
    locks: LockRegistry,
    code_prefix: String,
}

impl AllocationService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        audit: Arc<dyn AuditLogger>,
        code_prefix: String,
    ) -> Self {
        let occupancy = OccupancyService::new(store.clone());
        Self {
            store,
            audit,
            occupancy,
            locks: LockRegistry::default(),
            code_prefix,
        }
    }

    /// Crear una asignación en estado `scheduled`.
    ///
    /// No toca el estado del vehículo ni bloquea por conflictos: un vehículo
    /// ya ocupado puede recibir asignaciones agendadas en cola y un conductor
    /// activo en otra asignación puede ser agendado igual. Los conflictos se
    /// resuelven recién en la activación.
    pub async fn create_assignment(
        &self,
        request: CreateAssignmentRequest,
        actor: Option<Uuid>,
    ) -> Result<(Assignment, Vec<AssignmentDriver>), AppError> {
        request.validate()?;

        let seat_plan = build_seat_plan(&request)?;

        let trip_distance_km = request.trip_distance_km.ok_or_else(|| {
            AppError::InvalidInput("trip_distance_km is required".to_string())
        })?;
        validate_positive(trip_distance_km).map_err(|_| {
            AppError::InvalidInput("trip_distance_km must be greater than zero".to_string())
        })?;

        for (selection, _) in &seat_plan {
            validate_not_empty(&selection.pickup_location).map_err(|_| {
                AppError::InvalidInput(format!(
                    "pickup_location is required for driver {}",
                    selection.driver_id
                ))
            })?;
        }

        // El vehículo y cada conductor deben existir en el directorio
        let vehicle = self
            .store
            .find_vehicle(request.vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &request.vehicle_id.to_string()))?;

        for (selection, _) in &seat_plan {
            self.store
                .find_driver(selection.driver_id)
                .await?
                .ok_or_else(|| not_found_error("Driver", &selection.driver_id.to_string()))?;
        }

        let code = self.generate_unique_code().await?;
        let principal_driver_id = seat_plan[0].0.driver_id;

        let assignment = Assignment {
            id: Uuid::new_v4(),
            code,
            vehicle_id: vehicle.id,
            principal_driver_id,
            scheduled_date: request.scheduled_date,
            mode: request.mode,
            status: AssignmentStatus::Scheduled,
            notes: request.notes.clone().filter(|n| !n.trim().is_empty()),
            site_id: request.site_id.clone(),
            created_by: actor,
            created_at: Utc::now(),
            activated_at: None,
            finished_at: None,
        };
        self.store.insert_assignment(&assignment).await?;

        let mut seats = Vec::with_capacity(seat_plan.len());
        for (selection, slot) in seat_plan {
            let seat = AssignmentDriver {
                id: Uuid::new_v4(),
                assignment_id: assignment.id,
                driver_id: selection.driver_id,
                shift_slot: slot,
                document_type: selection.document_type,
                pickup_location: selection.pickup_location,
                trip_distance_km,
                confirmed: false,
                confirmed_at: None,
                started_at: None,
                finished_at: None,
                status: SeatStatus::Assigned,
            };
            self.store.insert_assignment_driver(&seat).await?;

            // Un evento por par vehículo/conductor
            self.audit_safe(
                AuditEvent::allocation("assignment", assignment.id, "assignment_created")
                    .with_states(None, Some(assignment.status.as_str().to_string()))
                    .with_details(json!({
                        "code": assignment.code,
                        "vehicle_id": vehicle.id,
                        "driver_id": seat.driver_id,
                        "shift_slot": seat.shift_slot.as_str(),
                    }))
                    .with_actor(actor),
            )
            .await;

            seats.push(seat);
        }

        info!(
            "🚚 Asignación {} agendada: vehículo {} con {} asiento(s) para {}",
            assignment.code,
            vehicle.license_plate,
            seats.len(),
            assignment.scheduled_date
        );

        Ok((assignment, seats))
    }

    /// Confirmar asientos y, si se alcanza el quórum, activar la asignación.
    ///
    /// Confirmar un asiento ya confirmado es un no-op que preserva su
    /// timestamp original. Mientras quede algún asiento no cancelado sin
    /// confirmar, la asignación sigue `scheduled` y se devuelve un resultado
    /// parcial con la cantidad pendiente.
    pub async fn confirm_drivers(
        &self,
        assignment_id: Uuid,
        request: ConfirmDriversRequest,
        actor: Option<Uuid>,
    ) -> Result<ConfirmationResult, AppError> {
        request.validate()?;

        let _assignment_guard = self.locks.acquire(assignment_id).await;

        let mut assignment = self
            .store
            .find_assignment(assignment_id)
            .await?
            .ok_or_else(|| not_found_error("Assignment", &assignment_id.to_string()))?;

        if assignment.status != AssignmentStatus::Scheduled {
            return Err(invalid_state_error(
                "confirm drivers",
                assignment.status.as_str(),
            ));
        }

        let seats = self.store.find_seats_by_assignment(assignment_id).await?;
        let confirmable: HashSet<Uuid> = seats
            .iter()
            .filter(|s| !s.is_cancelled())
            .map(|s| s.id)
            .collect();

        for seat_id in &request.seat_ids {
            if !confirmable.contains(seat_id) {
                return Err(AppError::InvalidInput(format!(
                    "Assignment driver '{}' does not belong to assignment '{}'",
                    seat_id, assignment_id
                )));
            }
        }

        // Fase 1: confirmar cada asiento pedido (idempotente por fila)
        let now = Utc::now();
        for seat in seats.iter().filter(|s| request.seat_ids.contains(&s.id)) {
            if seat.confirmed {
                continue;
            }
            let mut updated = seat.clone();
            updated.confirmed = true;
            updated.confirmed_at = Some(now);
            updated.started_at = Some(now);
            self.store.update_assignment_driver(&updated).await?;

            self.audit_safe(
                AuditEvent::allocation("assignment_driver", updated.id, "driver_confirmed")
                    .with_details(json!({
                        "assignment_id": assignment_id,
                        "driver_id": updated.driver_id,
                        "shift_slot": updated.shift_slot.as_str(),
                    }))
                    .with_actor(actor),
            )
            .await;
        }

        // Fase 2: quórum sobre los asientos re-leídos
        let seats = self.store.find_seats_by_assignment(assignment_id).await?;
        let pending = seats
            .iter()
            .filter(|s| !s.is_cancelled() && !s.confirmed)
            .count();
        if pending > 0 {
            info!(
                "🔍 Confirmación parcial de {}: {} asiento(s) pendiente(s)",
                assignment.code, pending
            );
            return Ok(ConfirmationResult {
                complete: false,
                pending,
            });
        }

        // Fase 3: activación, bajo el lock del vehículo
        let _vehicle_guard = self.locks.acquire(assignment.vehicle_id).await;

        self.supersede_active_on_vehicle(&assignment, actor).await?;
        self.displace_drivers_elsewhere(&assignment, &seats, actor)
            .await?;

        let previous_status = assignment.status;
        assignment.status = AssignmentStatus::Active;
        assignment.activated_at = Some(Utc::now());
        if let Some(comments) = request.comments.as_deref() {
            if !comments.trim().is_empty() {
                assignment.append_note(comments.trim());
            }
        }
        self.store.update_assignment(&assignment).await?;

        self.store
            .set_vehicle_state(assignment.vehicle_id, VehicleState::InUse)
            .await?;

        self.occupancy
            .reserve(assignment.vehicle_id, assignment.scheduled_date, &seats)
            .await?;

        self.audit_safe(
            AuditEvent::allocation("assignment", assignment.id, "assignment_activated")
                .with_states(
                    Some(previous_status.as_str().to_string()),
                    Some(assignment.status.as_str().to_string()),
                )
                .with_details(json!({
                    "code": assignment.code,
                    "vehicle_id": assignment.vehicle_id,
                }))
                .with_actor(actor),
        )
        .await;

        info!(
            "✅ Asignación {} activada: vehículo {} en uso",
            assignment.code, assignment.vehicle_id
        );

        Ok(ConfirmationResult {
            complete: true,
            pending: 0,
        })
    }

    /// Volver un asiento a no confirmado mientras el padre sigue `scheduled`.
    pub async fn unconfirm_driver(
        &self,
        seat_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<AssignmentDriver, AppError> {
        let found = self
            .store
            .find_assignment_driver(seat_id)
            .await?
            .ok_or_else(|| not_found_error("Assignment driver", &seat_id.to_string()))?;

        let _assignment_guard = self.locks.acquire(found.assignment_id).await;

        // Re-leer bajo el lock; otro operador pudo haber tocado el asiento
        let mut seat = self
            .store
            .find_assignment_driver(seat_id)
            .await?
            .ok_or_else(|| not_found_error("Assignment driver", &seat_id.to_string()))?;

        let assignment = self
            .store
            .find_assignment(seat.assignment_id)
            .await?
            .ok_or_else(|| not_found_error("Assignment", &seat.assignment_id.to_string()))?;

        if assignment.status != AssignmentStatus::Scheduled {
            return Err(invalid_state_error(
                "unconfirm driver",
                assignment.status.as_str(),
            ));
        }

        if !seat.confirmed {
            return Ok(seat);
        }

        seat.confirmed = false;
        seat.confirmed_at = None;
        seat.started_at = None;
        self.store.update_assignment_driver(&seat).await?;

        self.audit_safe(
            AuditEvent::allocation("assignment_driver", seat.id, "driver_unconfirmed")
                .with_details(json!({
                    "assignment_id": seat.assignment_id,
                    "driver_id": seat.driver_id,
                }))
                .with_actor(actor),
        )
        .await;

        info!(
            "⚠️ Asiento {} de la asignación {} vuelto a no confirmado",
            seat.id, assignment.code
        );

        Ok(seat)
    }

    /// Cancelar una asignación agendada, con motivo obligatorio.
    pub async fn cancel_assignment(
        &self,
        assignment_id: Uuid,
        request: CancelAssignmentRequest,
        actor: Option<Uuid>,
    ) -> Result<Assignment, AppError> {
        request.validate()?;
        validate_not_empty(&request.reason)
            .map_err(|_| AppError::InvalidInput("reason is required".to_string()))?;

        let _assignment_guard = self.locks.acquire(assignment_id).await;

        let mut assignment = self
            .store
            .find_assignment(assignment_id)
            .await?
            .ok_or_else(|| not_found_error("Assignment", &assignment_id.to_string()))?;

        if assignment.status != AssignmentStatus::Scheduled {
            return Err(invalid_state_error(
                "cancel assignment",
                assignment.status.as_str(),
            ));
        }

        // Reset defensivo: en una asignación agendada no debería haber
        // asientos confirmados, salvo estados intermedios tras un crash.
        let seats = self.store.find_seats_by_assignment(assignment_id).await?;
        for seat in &seats {
            if !seat.confirmed {
                continue;
            }
            let mut updated = seat.clone();
            updated.confirmed = false;
            updated.confirmed_at = None;
            updated.started_at = None;
            self.store.update_assignment_driver(&updated).await?;
        }

        let previous_status = assignment.status;
        assignment.status = AssignmentStatus::Cancelled;
        assignment.finished_at = Some(Utc::now());
        assignment.append_note(request.reason.trim());
        self.store.update_assignment(&assignment).await?;

        // Incondicional a propósito: restaura disponibilidad aunque un flujo
        // externo hubiera marcado el vehículo de forma optimista.
        let _vehicle_guard = self.locks.acquire(assignment.vehicle_id).await;
        self.store
            .set_vehicle_state(assignment.vehicle_id, VehicleState::Available)
            .await?;

        self.audit_safe(
            AuditEvent::allocation("assignment", assignment.id, "assignment_cancelled")
                .with_states(
                    Some(previous_status.as_str().to_string()),
                    Some(assignment.status.as_str().to_string()),
                )
                .with_details(json!({
                    "code": assignment.code,
                    "reason": request.reason.trim(),
                }))
                .with_actor(actor),
        )
        .await;

        info!("🛑 Asignación {} cancelada", assignment.code);

        Ok(assignment)
    }

    /// Borrado administrativo duro, permitido desde cualquier estado.
    ///
    /// Elimina los asientos y su ocupación; el vehículo vuelve a `available`
    /// solo si la asignación borrada era la ocupante actual (estaba activa).
    pub async fn delete_assignment(
        &self,
        assignment_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<(), AppError> {
        let _assignment_guard = self.locks.acquire(assignment_id).await;

        // Primera lectura solo para conocer el vehículo a bloquear
        let found = self
            .store
            .find_assignment(assignment_id)
            .await?
            .ok_or_else(|| not_found_error("Assignment", &assignment_id.to_string()))?;

        let _vehicle_guard = self.locks.acquire(found.vehicle_id).await;

        // Re-leer bajo ambos locks: una activación concurrente sobre el mismo
        // vehículo pudo habernos finalizado por supersesión mientras esperábamos
        let assignment = self
            .store
            .find_assignment(assignment_id)
            .await?
            .ok_or_else(|| not_found_error("Assignment", &assignment_id.to_string()))?;

        let seats = self.store.find_seats_by_assignment(assignment_id).await?;
        let seat_ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();

        self.store.delete_occupancy_for_seats(&seat_ids).await?;
        self.store.delete_seats_by_assignment(assignment_id).await?;
        self.store.delete_assignment(assignment_id).await?;

        if assignment.status == AssignmentStatus::Active {
            self.store
                .set_vehicle_state(assignment.vehicle_id, VehicleState::Available)
                .await?;
        }

        self.audit_safe(
            AuditEvent::allocation("assignment", assignment.id, "assignment_deleted")
                .with_states(Some(assignment.status.as_str().to_string()), None)
                .with_details(json!({
                    "code": assignment.code,
                    "vehicle_id": assignment.vehicle_id,
                    "seats": seat_ids.len(),
                }))
                .with_actor(actor),
        )
        .await;

        info!("🧹 Asignación {} eliminada definitivamente", assignment.code);

        Ok(())
    }

    /// Buscar una asignación con sus asientos.
    pub async fn get_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<(Assignment, Vec<AssignmentDriver>), AppError> {
        let assignment = self
            .store
            .find_assignment(assignment_id)
            .await?
            .ok_or_else(|| not_found_error("Assignment", &assignment_id.to_string()))?;
        let seats = self.store.find_seats_by_assignment(assignment_id).await?;
        Ok((assignment, seats))
    }

    /// Listar asignaciones con sus asientos según filtros.
    pub async fn list_assignments(
        &self,
        filters: &AssignmentFilters,
    ) -> Result<Vec<(Assignment, Vec<AssignmentDriver>)>, AppError> {
        let assignments = self.store.list_assignments(filters).await?;
        let mut result = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let seats = self.store.find_seats_by_assignment(assignment.id).await?;
            result.push((assignment, seats));
        }
        Ok(result)
    }

    // Paso 3b de la activación: finalizar las otras asignaciones activas del
    // vehículo, marcándolas con [AUTO-CLOSED] en las notas.
    async fn supersede_active_on_vehicle(
        &self,
        incoming: &Assignment,
        actor: Option<Uuid>,
    ) -> Result<(), AppError> {
        let active = self
            .store
            .find_assignments_by_vehicle(incoming.vehicle_id, &[AssignmentStatus::Active])
            .await?;

        for mut superseded in active {
            if superseded.id == incoming.id {
                continue;
            }
            let previous_status = superseded.status;
            superseded.status = AssignmentStatus::Finalized;
            superseded.finished_at = Some(Utc::now());
            superseded.append_note(&format!("[AUTO-CLOSED] Superseded by {}", incoming.code));
            self.store.update_assignment(&superseded).await?;

            self.audit_safe(
                AuditEvent::allocation("assignment", superseded.id, "assignment_superseded")
                    .with_states(
                        Some(previous_status.as_str().to_string()),
                        Some(superseded.status.as_str().to_string()),
                    )
                    .with_details(json!({
                        "code": superseded.code,
                        "superseded_by": incoming.code,
                    }))
                    .with_actor(actor),
            )
            .await;

            info!(
                "⚙️ Asignación {} finalizada por supersesión de {}",
                superseded.code, incoming.code
            );
        }

        Ok(())
    }

    // Paso 3c de la activación: cancelar los asientos vigentes de estos
    // conductores en otras asignaciones activas. Solo cae el asiento en
    // conflicto; la asignación hermana queda intacta.
    async fn displace_drivers_elsewhere(
        &self,
        incoming: &Assignment,
        seats: &[AssignmentDriver],
        actor: Option<Uuid>,
    ) -> Result<(), AppError> {
        let driver_ids: HashSet<Uuid> = seats
            .iter()
            .filter(|s| !s.is_cancelled())
            .map(|s| s.driver_id)
            .collect();

        for driver_id in driver_ids {
            let conflicting = self
                .store
                .find_assigned_seats_on_active(driver_id, incoming.id)
                .await?;

            for mut seat in conflicting {
                seat.status = SeatStatus::Cancelled;
                seat.finished_at = Some(Utc::now());
                self.store.update_assignment_driver(&seat).await?;

                self.audit_safe(
                    AuditEvent::allocation("assignment_driver", seat.id, "driver_displaced")
                        .with_states(
                            Some(SeatStatus::Assigned.as_str().to_string()),
                            Some(seat.status.as_str().to_string()),
                        )
                        .with_details(json!({
                            "driver_id": driver_id,
                            "assignment_id": seat.assignment_id,
                            "displaced_by": incoming.code,
                        }))
                        .with_actor(actor),
                )
                .await;

                info!(
                    "⚙️ Conductor {} desplazado de la asignación {} por {}",
                    driver_id, seat.assignment_id, incoming.code
                );
            }
        }

        Ok(())
    }

    // Generación de código con un reintento ante colisión
    async fn generate_unique_code(&self) -> Result<String, AppError> {
        let code = generate_ticket_code(&self.code_prefix);
        if !self.store.assignment_code_exists(&code).await? {
            return Ok(code);
        }

        warn!("⚠️ Colisión de código de asignación {}: reintentando", code);
        let retry = generate_ticket_code(&self.code_prefix);
        if !self.store.assignment_code_exists(&retry).await? {
            return Ok(retry);
        }

        Err(conflict_error("Assignment", "code", &retry))
    }

    // El historial es best-effort: un fallo del logger jamás corta la
    // operación de negocio.
    async fn audit_safe(&self, event: AuditEvent) {
        if let Err(e) = self.audit.record_event(event).await {
            warn!("⚠️ Error registrando evento de auditoría: {}", e);
        }
    }
}

// Armar la lista (selección, turno) según el modo, validando la forma
fn build_seat_plan(
    request: &CreateAssignmentRequest,
) -> Result<Vec<(DriverSelection, ShiftSlot)>, AppError> {
    match request.mode {
        AllocationMode::SingleDriver => {
            if request.day_driver.is_some() || request.night_driver.is_some() {
                return Err(AppError::InvalidInput(
                    "single_driver mode does not accept day_driver or night_driver".to_string(),
                ));
            }
            let selection = request.driver.clone().ok_or_else(|| {
                AppError::InvalidInput(
                    "single_driver mode requires exactly one driver".to_string(),
                )
            })?;
            Ok(vec![(selection, ShiftSlot::FullDay)])
        }
        AllocationMode::Shift => {
            if request.driver.is_some() {
                return Err(AppError::InvalidInput(
                    "shift mode uses day_driver/night_driver, not driver".to_string(),
                ));
            }
            if let (Some(day), Some(night)) = (&request.day_driver, &request.night_driver) {
                if day.driver_id == night.driver_id {
                    return Err(AppError::InvalidInput(
                        "the same driver cannot take both the day and the night slot"
                            .to_string(),
                    ));
                }
            }

            let mut plan = Vec::new();
            if let Some(day) = request.day_driver.clone() {
                plan.push((day, ShiftSlot::Day));
            }
            if let Some(night) = request.night_driver.clone() {
                plan.push((night, ShiftSlot::Night));
            }
            if plan.is_empty() {
                return Err(AppError::InvalidInput(
                    "shift mode requires at least one of day_driver or night_driver".to_string(),
                ));
            }
            Ok(plan)
        }
    }
}
