//! Endpoints de generación de itinerarios y validación de presupuesto

use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::post,
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::models::money::Money;
use crate::models::travel::{TravelRequest, TravelResponse};
use crate::services::planner_service::PlannerError;
use crate::state::AppState;
use crate::utils::budget::BudgetSummary;
use crate::utils::errors::{AppError, AppResult};

pub fn create_itinerary_router() -> Router<AppState> {
    Router::new()
        .route("/generate-itinerary", post(generate_itinerary))
        .route("/validate-budget", post(validate_budget))
}

/// Endpoint principal: generar un itinerario de viaje
pub async fn generate_itinerary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TravelRequest>,
) -> AppResult<Json<TravelResponse>> {
    request.validate()?;
    let request = request.normalized();
    let client_id = client_id_from(&headers);

    log::info!(
        "🧳 Itinerary request from {}: {} ({} days)",
        client_id,
        request.destination,
        request.duration_days
    );

    let plan = state
        .planner
        .generate_itinerary(request, &client_id)
        .await
        .map_err(|e| match e {
            PlannerError::AdmissionDenied => AppError::RateLimitExceeded,
            PlannerError::UnsupportedCurrency(code) => {
                AppError::BadRequest(format!("Unsupported currency: {}", code))
            }
            PlannerError::MalformedOutput(attempts) => AppError::ExternalApi(format!(
                "Generator produced malformed output in {} attempt(s)",
                attempts
            )),
            PlannerError::Upstream(msg) => AppError::ExternalApi(msg),
        })?;

    Ok(Json(plan))
}

#[derive(Debug, Deserialize)]
pub struct ValidateBudgetRequest {
    pub budget: f64,
    #[serde(default)]
    pub currency: Option<String>,
    pub itinerary: TravelResponse,
}

/// Validar un itinerario existente contra un presupuesto
pub async fn validate_budget(
    State(state): State<AppState>,
    Json(request): Json<ValidateBudgetRequest>,
) -> AppResult<Json<BudgetSummary>> {
    let currency = request
        .currency
        .unwrap_or_else(|| request.itinerary.currency.clone());

    let amount = Decimal::from_f64_retain(request.budget)
        .ok_or_else(|| AppError::BadRequest("Invalid budget amount".to_string()))?;
    let budget = Money::new(amount, &currency)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(state.validator.summary(&request.itinerary, &budget)))
}

/// Identidad del cliente para el control de admisión
///
/// Se toma del primer valor de `x-forwarded-for`, o de `x-real-ip`; sin
/// headers de proxy todos los requests comparten la identidad anónima.
fn client_id_from(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.trim().to_string();
    }

    "anonymous".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_id_desde_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_id_from(&headers), "203.0.113.7");
    }

    #[test]
    fn test_client_id_desde_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(client_id_from(&headers), "198.51.100.4");
    }

    #[test]
    fn test_client_id_anonimo_sin_headers() {
        assert_eq!(client_id_from(&HeaderMap::new()), "anonymous");
    }
}
