//! Generación de códigos de ticket
//!
//! Cada asignación recibe un código legible único compuesto por un prefijo
//! fijo y un sufijo aleatorio de 6 dígitos. La unicidad real la garantiza la
//! consulta al record store más la constraint del schema; aquí sólo se genera
//! el candidato.

use rand::Rng;

/// Prefijo por defecto para códigos de asignación
pub const DEFAULT_CODE_PREFIX: &str = "AS";

/// Generar un código de ticket candidato con el prefijo dado
pub fn generate_ticket_code(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: u32 = rng.gen_range(0..=999_999);
    format!("{}-{:06}", prefix, suffix)
}
