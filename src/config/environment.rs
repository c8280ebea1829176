//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.
//! Todas las variables tienen defaults razonables salvo la API key del generador.

use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub geocode_cache_ttl: u64,
    pub geocode_cache_capacity: usize,
    pub weather_cache_ttl: u64,
    pub weather_cache_capacity: usize,
    pub llm_cache_ttl: u64,
    pub llm_cache_capacity: usize,
    pub budget_tolerance: Decimal,
    pub max_format_retries: u32,
    pub max_budget_retries: u32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: var_or("PORT", 8000),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|origin| origin.trim().to_string())
                        .collect()
                })
                .unwrap_or_default(),
            rate_limit_requests: var_or("RATE_LIMIT_REQUESTS", 20),
            rate_limit_window: var_or("RATE_LIMIT_WINDOW", 60),
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            // Geocodificación: una semana (las coordenadas no cambian)
            geocode_cache_ttl: var_or("GEOCODE_CACHE_TTL", 604_800),
            geocode_cache_capacity: var_or("GEOCODE_CACHE_CAPACITY", 500),
            // Pronóstico: 6 horas
            weather_cache_ttl: var_or("WEATHER_CACHE_TTL", 21_600),
            weather_cache_capacity: var_or("WEATHER_CACHE_CAPACITY", 500),
            // Itinerarios generados: 24 horas
            llm_cache_ttl: var_or("LLM_CACHE_TTL", 86_400),
            llm_cache_capacity: var_or("LLM_CACHE_CAPACITY", 200),
            budget_tolerance: var_or("BUDGET_TOLERANCE", Decimal::new(5, 2)),
            max_format_retries: var_or("MAX_FORMAT_RETRIES", 2),
            max_budget_retries: var_or("MAX_BUDGET_RETRIES", 2),
        }
    }
}

impl EnvironmentConfig {
    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn var_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
