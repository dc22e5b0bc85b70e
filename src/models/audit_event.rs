//! Modelo de AuditEvent
//!
//! Evento de historial que el motor emite best-effort hacia el audit log.
//! El writer agrega el timestamp al persistirlo.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Evento de auditoría sobre una entidad del motor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub entity_type: String,
    pub entity_id: String,
    pub event_type: String,
    pub previous_state: Option<String>,
    pub new_state: Option<String>,
    pub details: Option<serde_json::Value>,
    pub actor: Option<Uuid>,
    pub module: String,
}

impl AuditEvent {
    /// Crear un evento del módulo de asignaciones
    pub fn allocation(entity_type: &str, entity_id: Uuid, event_type: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            event_type: event_type.to_string(),
            previous_state: None,
            new_state: None,
            details: None,
            actor: None,
            module: "allocation".to_string(),
        }
    }

    pub fn with_states(mut self, previous: Option<String>, new: Option<String>) -> Self {
        self.previous_state = previous;
        self.new_state = new;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_actor(mut self, actor: Option<Uuid>) -> Self {
        self.actor = actor;
        self
    }
}
