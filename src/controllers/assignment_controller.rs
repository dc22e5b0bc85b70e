use uuid::Uuid;
use validator::Validate;

use crate::dto::assignment_dto::{
    ApiResponse, AssignmentResponse, CancelAssignmentRequest, ConfirmDriversRequest,
    CreateAssignmentRequest, SeatResponse,
};
use crate::models::AssignmentFilters;
use crate::services::{AllocationService, ConfirmationResult};
use crate::utils::errors::AppError;

pub struct AssignmentController {
    engine: AllocationService,
}

impl AssignmentController {
    pub fn new(engine: AllocationService) -> Self {
        Self { engine }
    }

    pub async fn create(
        &self,
        request: CreateAssignmentRequest,
        actor: Option<Uuid>,
    ) -> Result<ApiResponse<AssignmentResponse>, AppError> {
        // Validación de la capa caller; el motor vuelve a validar igual
        request.validate()?;

        let (assignment, seats) = self.engine.create_assignment(request, actor).await?;

        Ok(ApiResponse::success_with_message(
            AssignmentResponse::from_parts(assignment, seats),
            "Asignación agendada exitosamente".to_string(),
        ))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<AssignmentResponse, AppError> {
        let (assignment, seats) = self.engine.get_assignment(id).await?;
        Ok(AssignmentResponse::from_parts(assignment, seats))
    }

    pub async fn list(
        &self,
        filters: AssignmentFilters,
    ) -> Result<Vec<AssignmentResponse>, AppError> {
        let assignments = self.engine.list_assignments(&filters).await?;
        Ok(assignments
            .into_iter()
            .map(|(assignment, seats)| AssignmentResponse::from_parts(assignment, seats))
            .collect())
    }

    pub async fn confirm(
        &self,
        id: Uuid,
        request: ConfirmDriversRequest,
        actor: Option<Uuid>,
    ) -> Result<ApiResponse<ConfirmationResult>, AppError> {
        request.validate()?;

        let result = self.engine.confirm_drivers(id, request, actor).await?;

        let message = if result.complete {
            "Asignación activada exitosamente".to_string()
        } else {
            format!("Confirmación parcial: {} asiento(s) pendiente(s)", result.pending)
        };

        Ok(ApiResponse::success_with_message(result, message))
    }

    pub async fn unconfirm(
        &self,
        seat_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<ApiResponse<SeatResponse>, AppError> {
        let seat = self.engine.unconfirm_driver(seat_id, actor).await?;

        Ok(ApiResponse::success_with_message(
            SeatResponse::from(seat),
            "Asiento vuelto a no confirmado".to_string(),
        ))
    }

    pub async fn cancel(
        &self,
        id: Uuid,
        request: CancelAssignmentRequest,
        actor: Option<Uuid>,
    ) -> Result<ApiResponse<AssignmentResponse>, AppError> {
        request.validate()?;

        self.engine.cancel_assignment(id, request, actor).await?;
        let (assignment, seats) = self.engine.get_assignment(id).await?;

        Ok(ApiResponse::success_with_message(
            AssignmentResponse::from_parts(assignment, seats),
            "Asignación cancelada exitosamente".to_string(),
        ))
    }

    pub async fn delete(&self, id: Uuid, actor: Option<Uuid>) -> Result<(), AppError> {
        self.engine.delete_assignment(id, actor).await
    }
}
