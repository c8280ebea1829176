//! Endpoints de monitoreo: estadísticas, limpieza de cache y health check

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use futures::future::join3;
use serde::Serialize;
use serde_json::json;

use crate::cache::CacheStats;
use crate::state::AppState;
use crate::utils::tokens::TokenStats;

pub fn create_monitoring_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/cache/clear", post(clear_caches))
}

#[derive(Debug, Serialize)]
pub struct CachesSection {
    pub geocode: CacheStats,
    pub weather: CacheStats,
    pub llm: CacheStats,
}

#[derive(Debug, Serialize)]
pub struct RateLimitSection {
    pub limit_per_minute: u32,
    pub active_clients: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub cache: CachesSection,
    pub tokens: TokenStats,
    pub rate_limit: RateLimitSection,
}

/// Estadísticas de caches, tokens y rate limiting
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let (geocode, weather, llm) = join3(
        state.geocode_cache.stats(),
        state.forecast_cache.stats(),
        state.plan_cache.stats(),
    )
    .await;

    Json(StatsResponse {
        cache: CachesSection {
            geocode,
            weather,
            llm,
        },
        tokens: state.usage.snapshot(),
        rate_limit: RateLimitSection {
            limit_per_minute: state.rate_limiter.limit(),
            active_clients: state.rate_limiter.active_clients().await,
        },
    })
}

/// Vaciar todas las caches (también reinicia sus contadores)
pub async fn clear_caches(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.geocode_cache.clear().await;
    state.forecast_cache.clear().await;
    state.plan_cache.clear().await;

    log::info!("🧹 All caches cleared");
    Json(json!({
        "message": "All caches cleared",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Health check simple
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "travel-planner",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Información del servicio y sus endpoints
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": "AI Travel Planner API",
        "status": "ok",
        "endpoints": {
            "generate_itinerary": "POST /generate-itinerary",
            "validate_budget": "POST /validate-budget",
            "stats": "GET /stats",
            "cache_clear": "POST /cache/clear",
            "health": "GET /health"
        }
    }))
}
