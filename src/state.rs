//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::cache::TtlCache;
use crate::config::environment::EnvironmentConfig;
use crate::middleware::rate_limit::SlidingWindowLimiter;
use crate::models::travel::TravelResponse;
use crate::services::llm_service::GeminiGenerator;
use crate::services::planner_service::TravelPlannerService;
use crate::services::weather_service::{Coordinates, WeatherContext, WeatherService};
use crate::utils::budget::BudgetValidator;
use crate::utils::tokens::UsageTracker;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub planner: Arc<TravelPlannerService>,
    pub validator: BudgetValidator,
    pub geocode_cache: Arc<TtlCache<Coordinates>>,
    pub forecast_cache: Arc<TtlCache<WeatherContext>>,
    pub plan_cache: Arc<TtlCache<TravelResponse>>,
    pub rate_limiter: Arc<SlidingWindowLimiter>,
    pub usage: Arc<UsageTracker>,
}

impl AppState {
    pub fn new(config: EnvironmentConfig) -> Result<Self> {
        let api_key = config
            .gemini_api_key
            .clone()
            .ok_or_else(|| anyhow!("GEMINI_API_KEY must be set"))?;

        let geocode_cache = Arc::new(TtlCache::new(
            "geocode",
            config.geocode_cache_capacity,
            Duration::from_secs(config.geocode_cache_ttl),
        ));
        let forecast_cache = Arc::new(TtlCache::new(
            "weather",
            config.weather_cache_capacity,
            Duration::from_secs(config.weather_cache_ttl),
        ));
        let plan_cache = Arc::new(TtlCache::new(
            "llm",
            config.llm_cache_capacity,
            Duration::from_secs(config.llm_cache_ttl),
        ));

        let rate_limiter = Arc::new(SlidingWindowLimiter::new(
            config.rate_limit_requests,
            Duration::from_secs(config.rate_limit_window),
        ));
        let usage = Arc::new(UsageTracker::new());

        let generator = Arc::new(GeminiGenerator::new(api_key, config.gemini_model.clone()));
        let weather = Arc::new(WeatherService::new(
            geocode_cache.clone(),
            forecast_cache.clone(),
        ));

        let planner = Arc::new(TravelPlannerService::new(
            generator,
            weather,
            plan_cache.clone(),
            rate_limiter.clone(),
            usage.clone(),
            config.budget_tolerance,
            config.max_format_retries,
            config.max_budget_retries,
        ));

        Ok(Self {
            validator: BudgetValidator::new(config.budget_tolerance),
            config,
            planner,
            geocode_cache,
            forecast_cache,
            plan_cache,
            rate_limiter,
            usage,
        })
    }
}
