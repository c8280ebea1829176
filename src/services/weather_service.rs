//! Pronóstico del clima vía Open-Meteo
//!
//! Geocodifica el destino y trae el pronóstico diario para enriquecer el
//! prompt del generador. Ambas llamadas pasan por sus cachés TTL. El clima
//! es contexto opcional: si algo falla aquí, la generación sigue sin él.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;

use crate::cache::{cache_key, TtlCache};

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Open-Meteo solo pronostica hasta 16 días
const MAX_FORECAST_DAYS: u32 = 16;

/// Coordenadas geográficas de un destino
#[derive(Debug, Clone)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Pronóstico de un día individual
#[derive(Debug, Clone)]
pub struct DailyForecast {
    pub day: u32,
    pub date: String,
    pub condition: String,
    pub temp_max: f64,
    pub temp_min: f64,
    pub precipitation_probability: u32,
    pub is_rainy: bool,
    pub is_indoor_preferred: bool,
}

/// Contexto de clima listo para inyectar en el prompt
#[derive(Debug, Clone)]
pub struct WeatherContext {
    pub forecasts: Vec<DailyForecast>,
    pub summary: String,
    pub has_rain: bool,
    pub rainy_days: Vec<u32>,
    pub indoor_preferred_days: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailySeries,
}

#[derive(Debug, Deserialize)]
struct DailySeries {
    time: Vec<String>,
    weather_code: Vec<u32>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    #[serde(default)]
    precipitation_probability_max: Vec<Option<u32>>,
}

/// Servicio de clima con cachés de geocodificación y pronóstico
pub struct WeatherService {
    client: reqwest::Client,
    geocode_cache: Arc<TtlCache<Coordinates>>,
    forecast_cache: Arc<TtlCache<WeatherContext>>,
}

impl WeatherService {
    pub fn new(
        geocode_cache: Arc<TtlCache<Coordinates>>,
        forecast_cache: Arc<TtlCache<WeatherContext>>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            geocode_cache,
            forecast_cache,
        }
    }

    /// Obtener el contexto de clima para un destino, o `None` si falla
    pub async fn weather_context(&self, destination: &str, days: u32) -> Option<WeatherContext> {
        let key = cache_key(
            "weather",
            &[destination.to_lowercase(), days.to_string()],
        );

        if let Some(context) = self.forecast_cache.get(&key).await {
            return Some(context);
        }

        match self.fetch_context(destination, days).await {
            Ok(context) => {
                self.forecast_cache.put(&key, context.clone()).await;
                Some(context)
            }
            Err(e) => {
                log::warn!("⚠️ Weather lookup failed for '{}': {}", destination, e);
                None
            }
        }
    }

    async fn fetch_context(&self, destination: &str, days: u32) -> Result<WeatherContext> {
        let coordinates = self.geocode(destination).await?;
        self.forecast(&coordinates, days).await
    }

    async fn geocode(&self, destination: &str) -> Result<Coordinates> {
        let key = cache_key("geo", &[destination.to_lowercase()]);
        if let Some(coordinates) = self.geocode_cache.get(&key).await {
            return Ok(coordinates);
        }

        log::info!("🗺️ Geocoding destination: {}", destination);
        let url = format!(
            "{}?name={}&count=1",
            GEOCODING_URL,
            urlencoding::encode(destination)
        );

        let response: GeocodingResponse = self.client.get(&url).send().await?.json().await?;

        let result = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No coordinates found for '{}'", destination))?;

        let coordinates = Coordinates {
            latitude: result.latitude,
            longitude: result.longitude,
        };
        self.geocode_cache.put(&key, coordinates.clone()).await;

        Ok(coordinates)
    }

    async fn forecast(&self, coordinates: &Coordinates, days: u32) -> Result<WeatherContext> {
        let days = days.min(MAX_FORECAST_DAYS);
        let start = Utc::now().date_naive();
        let end = start + ChronoDuration::days(i64::from(days.saturating_sub(1)));

        let url = format!(
            "{}?latitude={}&longitude={}&daily=weather_code,temperature_2m_max,temperature_2m_min,precipitation_probability_max&timezone=auto&start_date={}&end_date={}",
            FORECAST_URL,
            coordinates.latitude,
            coordinates.longitude,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
        );

        log::info!("🌤️ Fetching forecast for {} day(s)", days);
        let response: ForecastResponse = self.client.get(&url).send().await?.json().await?;
        let daily = response.daily;

        let mut forecasts = Vec::with_capacity(daily.time.len());
        for (index, date) in daily.time.iter().enumerate() {
            let code = daily.weather_code.get(index).copied().unwrap_or(0);
            let temp_max = daily.temperature_2m_max.get(index).copied().unwrap_or(0.0);
            let temp_min = daily.temperature_2m_min.get(index).copied().unwrap_or(0.0);
            let precipitation_probability = daily
                .precipitation_probability_max
                .get(index)
                .copied()
                .flatten()
                .unwrap_or(0);

            forecasts.push(build_daily_forecast(
                index as u32 + 1,
                date.clone(),
                code,
                temp_max,
                temp_min,
                precipitation_probability,
            ));
        }

        Ok(summarize(forecasts))
    }
}

/// Condición legible a partir del código WMO
pub fn condition_for(code: u32) -> &'static str {
    match code {
        0 => "Clear sky",
        1..=3 => "Partly cloudy",
        45 | 48 => "Foggy",
        51..=55 => "Light drizzle",
        56 | 57 => "Freezing drizzle",
        61..=65 => "Rain",
        66 | 67 => "Freezing rain",
        71..=77 => "Snow",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown",
    }
}

fn is_rainy_code(code: u32) -> bool {
    matches!(code, 51..=67 | 80..=82 | 95..=99)
}

fn build_daily_forecast(
    day: u32,
    date: String,
    code: u32,
    temp_max: f64,
    temp_min: f64,
    precipitation_probability: u32,
) -> DailyForecast {
    let is_rainy = is_rainy_code(code) || precipitation_probability >= 60;
    // Lluvia o temperaturas extremas empujan a actividades bajo techo
    let is_indoor_preferred = is_rainy || temp_max >= 35.0 || temp_max <= 0.0;

    DailyForecast {
        day,
        date,
        condition: condition_for(code).to_string(),
        temp_max,
        temp_min,
        precipitation_probability,
        is_rainy,
        is_indoor_preferred,
    }
}

/// Armar el contexto completo a partir de los pronósticos diarios
fn summarize(forecasts: Vec<DailyForecast>) -> WeatherContext {
    let rainy_days: Vec<u32> = forecasts
        .iter()
        .filter(|forecast| forecast.is_rainy)
        .map(|forecast| forecast.day)
        .collect();
    let indoor_preferred_days: Vec<u32> = forecasts
        .iter()
        .filter(|forecast| forecast.is_indoor_preferred)
        .map(|forecast| forecast.day)
        .collect();

    let mut lines: Vec<String> = forecasts
        .iter()
        .map(|forecast| {
            format!(
                "Day {} ({}): {}, {:.0}-{:.0}°C, rain chance {}%",
                forecast.day,
                forecast.date,
                forecast.condition,
                forecast.temp_min,
                forecast.temp_max,
                forecast.precipitation_probability
            )
        })
        .collect();

    if rainy_days.is_empty() {
        lines.push("✅ Good weather expected throughout the trip".to_string());
    } else {
        let days_list = rainy_days
            .iter()
            .map(|day| day.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!(
            "⚠️ Rain expected on day(s) {} - prioritize indoor activities on those days",
            days_list
        ));
    }

    WeatherContext {
        has_rain: !rainy_days.is_empty(),
        summary: lines.join("\n"),
        rainy_days,
        indoor_preferred_days,
        forecasts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condiciones_wmo() {
        assert_eq!(condition_for(0), "Clear sky");
        assert_eq!(condition_for(2), "Partly cloudy");
        assert_eq!(condition_for(63), "Rain");
        assert_eq!(condition_for(81), "Rain showers");
        assert_eq!(condition_for(95), "Thunderstorm");
        assert_eq!(condition_for(42), "Unknown");
    }

    #[test]
    fn test_dia_lluvioso_por_codigo_o_probabilidad() {
        let by_code = build_daily_forecast(1, "2026-08-23".to_string(), 61, 25.0, 18.0, 10);
        assert!(by_code.is_rainy);
        assert!(by_code.is_indoor_preferred);

        let by_probability = build_daily_forecast(2, "2026-08-24".to_string(), 1, 25.0, 18.0, 80);
        assert!(by_probability.is_rainy);

        let clear = build_daily_forecast(3, "2026-08-25".to_string(), 0, 25.0, 18.0, 10);
        assert!(!clear.is_rainy);
        assert!(!clear.is_indoor_preferred);
    }

    #[test]
    fn test_calor_extremo_prefiere_interiores() {
        let hot = build_daily_forecast(1, "2026-08-23".to_string(), 0, 41.0, 30.0, 0);
        assert!(!hot.is_rainy);
        assert!(hot.is_indoor_preferred);
    }

    #[test]
    fn test_resumen_con_lluvia() {
        let context = summarize(vec![
            build_daily_forecast(1, "2026-08-23".to_string(), 0, 25.0, 18.0, 5),
            build_daily_forecast(2, "2026-08-24".to_string(), 63, 20.0, 15.0, 90),
        ]);

        assert!(context.has_rain);
        assert_eq!(context.rainy_days, vec![2]);
        assert!(context.summary.contains("Day 1 (2026-08-23): Clear sky"));
        assert!(context.summary.contains("⚠️ Rain expected on day(s) 2"));
    }

    #[test]
    fn test_resumen_sin_lluvia() {
        let context = summarize(vec![build_daily_forecast(
            1,
            "2026-08-23".to_string(),
            0,
            25.0,
            18.0,
            5,
        )]);

        assert!(!context.has_rain);
        assert!(context.rainy_days.is_empty());
        assert!(context.summary.contains("✅ Good weather expected"));
    }
}
