use chrono::{NaiveDate, Utc};

use crate::services::{FleetStats, StatsService};
use crate::utils::errors::AppError;

pub struct StatsController {
    stats: StatsService,
}

impl StatsController {
    pub fn new(stats: StatsService) -> Self {
        Self { stats }
    }

    /// Contadores de flota; sin fecha explícita se usa el día de hoy (UTC).
    pub async fn fleet(&self, date: Option<NaiveDate>) -> Result<FleetStats, AppError> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        self.stats.fleet_stats(date).await
    }
}
