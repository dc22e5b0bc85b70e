use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{extract::State, response::Json, routing::get, Router};
use dotenvy::dotenv;
use serde_json::json;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use fleet_assignment::audit::PgAuditLogger;
use fleet_assignment::config::environment::EnvironmentConfig;
use fleet_assignment::database::DatabaseConnection;
use fleet_assignment::middleware::cors::{cors_middleware, cors_middleware_with_origins};
use fleet_assignment::repositories::PgRecordStore;
use fleet_assignment::routes;
use fleet_assignment::services::{AllocationService, StatsService};
use fleet_assignment::state::AppState;
use fleet_assignment::utils::errors::AppError;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🚚 Fleet Assignment Engine - Motor de asignaciones");
    info!("==================================================");

    let config = EnvironmentConfig::default();

    // Inicializar base de datos
    let db_connection = match DatabaseConnection::new_default().await {
        Ok(conn) => conn,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };

    let pool = db_connection.pool().clone();

    // Armar los servicios sobre el store de Postgres
    let store = Arc::new(PgRecordStore::new(pool.clone()));
    let audit = Arc::new(PgAuditLogger::new(pool.clone()));
    let engine = AllocationService::new(
        store.clone(),
        audit,
        config.assignment_code_prefix.clone(),
    );
    let stats = StatsService::new(store);

    let app_state = AppState::new(pool, config.clone(), engine, stats);

    let cors = if config.is_development() {
        cors_middleware()
    } else {
        cors_middleware_with_origins(config.cors_origins.clone())
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api/assignment",
            routes::assignment_routes::create_assignment_router(),
        )
        .nest("/api/stats", routes::stats_routes::create_stats_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(ConcurrencyLimitLayer::new(256)),
        )
        .layer(cors)
        .with_state(app_state);

    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🚚 Endpoints - Assignment:");
    info!("   POST   /api/assignment - Agendar asignación");
    info!("   GET    /api/assignment - Listar asignaciones");
    info!("   GET    /api/assignment/:id - Obtener asignación");
    info!("   POST   /api/assignment/:id/confirm - Confirmar asientos");
    info!("   POST   /api/assignment/:id/cancel - Cancelar asignación");
    info!("   DELETE /api/assignment/:id - Eliminar asignación");
    info!("   POST   /api/assignment/seat/:id/unconfirm - Desconfirmar asiento");
    info!("📊 Endpoints - Stats:");
    info!("   GET  /api/stats/fleet?date=YYYY-MM-DD - Estadísticas de flota");

    // Iniciar servidor en background
    let server_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                error!("❌ Error del servidor: {}", e);
                e
            })
    });

    // Esperar a que el servidor termine
    if let Err(e) = server_handle.await? {
        error!("❌ Servidor terminó con error: {}", e);
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Health check con ping a la base de datos
async fn health_check(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;

    Ok(Json(json!({
        "status": "ok",
        "service": "fleet-assignment-engine",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal SIGTERM recibida, apagando servidor...");
        },
    }
}
