use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::controllers::stats_controller::StatsController;
use crate::services::FleetStats;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_stats_router() -> Router<AppState> {
    Router::new().route("/fleet", get(fleet_stats))
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    date: Option<NaiveDate>,
}

async fn fleet_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<FleetStats>, AppError> {
    let controller = StatsController::new(state.stats.clone());
    let response = controller.fleet(query.date).await?;
    Ok(Json(response))
}
