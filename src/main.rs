mod api;
mod cache;
mod config;
mod middleware;
mod models;
mod services;
mod state;
mod utils;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info};

use config::environment::EnvironmentConfig;
use middleware::cors::{cors_middleware, cors_middleware_with_origins};
use state::AppState;

/// Intervalo del barrido de entradas expiradas y clientes inactivos
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🧳 AI Travel Planner - Generador de itinerarios");
    info!("================================================");

    let config = EnvironmentConfig::default();
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let app_state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            error!("❌ Error inicializando el estado: {}", e);
            return Err(e);
        }
    };

    // Barrido periódico de caches y del rate limiter
    spawn_sweeper(app_state.clone());

    // Sin orígenes configurados se permite cualquiera (desarrollo)
    let cors = if app_state.config.cors_origins.is_empty() {
        cors_middleware()
    } else {
        cors_middleware_with_origins(app_state.config.cors_origins.clone())
    };

    let app = Router::new()
        .merge(api::create_api_router())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  / - Información del servicio");
    info!("   GET  /health - Health check");
    info!("   POST /generate-itinerary - Generar itinerario de viaje");
    info!("   POST /validate-budget - Validar itinerario contra presupuesto");
    info!("   GET  /stats - Estadísticas de cache, tokens y rate limiting");
    info!("   POST /cache/clear - Vaciar caches");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            anyhow::anyhow!(e)
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Tarea de fondo: expulsar entradas expiradas y clientes inactivos
fn spawn_sweeper(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        interval.tick().await;

        loop {
            interval.tick().await;

            let expired = state.geocode_cache.sweep_expired().await
                + state.forecast_cache.sweep_expired().await
                + state.plan_cache.sweep_expired().await;
            let idle = state.rate_limiter.sweep_idle().await;

            if expired > 0 || idle > 0 {
                info!(
                    "🧹 Sweep: {} entradas expiradas, {} clientes inactivos",
                    expired, idle
                );
            }
        }
    });
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
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
