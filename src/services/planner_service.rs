//! Orquestador de generación de itinerarios
//!
//! Coordina el flujo completo de un request: control de admisión, consulta
//! de cache, contexto de clima, llamada al generador, normalización de
//! precios y validación de presupuesto, con reintentos acotados e
//! independientes para fallos de formato y excesos de presupuesto.

use std::sync::Arc;

use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::cache::{cache_key, TtlCache};
use crate::middleware::rate_limit::SlidingWindowLimiter;
use crate::models::money::Money;
use crate::models::travel::{BudgetStatus, TravelRequest, TravelResponse};
use crate::services::llm_service::{parse_itinerary, ItineraryGenerator, LlmError};
use crate::services::weather_service::{WeatherContext, WeatherService};
use crate::utils::budget::{BudgetReport, BudgetValidator};
use crate::utils::currency::CurrencyConverter;
use crate::utils::tokens::UsageTracker;

const PROMPT_TEMPLATE: &str = include_str!("../../prompts/itinerary_prompt.txt");

/// Errores del flujo de generación
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Rate limit exceeded")]
    AdmissionDenied,

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Generator produced malformed output in {0} attempt(s)")]
    MalformedOutput(u32),

    #[error("Upstream error: {0}")]
    Upstream(String),
}

/// Resultado de un intento individual de generación
enum AttemptOutcome {
    Accepted(TravelResponse),
    NeedsFormatRetry,
    NeedsBudgetRetry {
        plan: TravelResponse,
        report: BudgetReport,
    },
}

/// Orquestador principal del servicio
pub struct TravelPlannerService {
    generator: Arc<dyn ItineraryGenerator>,
    weather: Arc<WeatherService>,
    plan_cache: Arc<TtlCache<TravelResponse>>,
    rate_limiter: Arc<SlidingWindowLimiter>,
    usage: Arc<UsageTracker>,
    validator: BudgetValidator,
    converter: CurrencyConverter,
    max_format_retries: u32,
    max_budget_retries: u32,
}

impl TravelPlannerService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        generator: Arc<dyn ItineraryGenerator>,
        weather: Arc<WeatherService>,
        plan_cache: Arc<TtlCache<TravelResponse>>,
        rate_limiter: Arc<SlidingWindowLimiter>,
        usage: Arc<UsageTracker>,
        tolerance: Decimal,
        max_format_retries: u32,
        max_budget_retries: u32,
    ) -> Self {
        Self {
            generator,
            weather,
            plan_cache,
            rate_limiter,
            usage,
            validator: BudgetValidator::new(tolerance),
            converter: CurrencyConverter::new(),
            max_format_retries,
            max_budget_retries,
        }
    }

    /// Generar un itinerario para el request dado
    ///
    /// El control de admisión va primero: un cliente rechazado no toca la
    /// cache ni genera llamadas externas. El cupo se cobra aunque el request
    /// termine resolviéndose desde la cache.
    pub async fn generate_itinerary(
        &self,
        request: TravelRequest,
        client_id: &str,
    ) -> Result<TravelResponse, PlannerError> {
        let request_id = Uuid::new_v4();

        if !self.rate_limiter.allow(client_id).await {
            tracing::warn!("🚫 [{}] Admission denied for client {}", request_id, client_id);
            return Err(PlannerError::AdmissionDenied);
        }

        let currency = self.resolve_currency(&request)?;
        let budget = Money::new(Decimal::from(request.budget), &currency)
            .map_err(|_| PlannerError::UnsupportedCurrency(currency.clone()))?;

        tracing::info!(
            "🧳 [{}] Generating itinerary: {} ({} days, {})",
            request_id,
            request.destination,
            request.duration_days,
            budget
        );

        let key = self.plan_key(&request, &budget);
        if let Some(cached) = self.plan_cache.get(&key).await {
            tracing::info!("⚡ [{}] Plan served from cache", request_id);
            return Ok(cached);
        }

        let weather = if request.weather_aware {
            self.weather
                .weather_context(&request.destination, request.duration_days)
                .await
        } else {
            None
        };

        let mut format_retries = 0u32;
        let mut budget_retries = 0u32;
        let mut prompt = self.base_prompt(&request, &budget, weather.as_ref());

        loop {
            match self.attempt(&prompt, &budget).await? {
                AttemptOutcome::Accepted(plan) => {
                    tracing::info!(
                        "✅ [{}] Plan accepted: {} {} ({})",
                        request_id,
                        plan.estimated_total_cost,
                        plan.currency,
                        plan.budget_status
                    );
                    self.plan_cache.put(&key, plan.clone()).await;
                    return Ok(plan);
                }

                AttemptOutcome::NeedsFormatRetry => {
                    format_retries += 1;
                    if format_retries > self.max_format_retries {
                        tracing::error!(
                            "❌ [{}] Malformed output after {} attempt(s)",
                            request_id,
                            format_retries
                        );
                        return Err(PlannerError::MalformedOutput(format_retries));
                    }
                    tracing::warn!(
                        "🔁 [{}] Malformed output, retrying ({}/{})",
                        request_id,
                        format_retries,
                        self.max_format_retries
                    );
                }

                AttemptOutcome::NeedsBudgetRetry { mut plan, report } => {
                    budget_retries += 1;
                    if budget_retries > self.max_budget_retries {
                        // Se agotaron los reintentos: se devuelve el último
                        // plan marcado como fuera de presupuesto, no un error
                        tracing::warn!(
                            "💸 [{}] Budget retries exhausted, returning over-budget plan ({}%)",
                            request_id,
                            report.utilization_percentage
                        );
                        plan.budget_status = BudgetStatus::OverBudget;
                        self.plan_cache.put(&key, plan.clone()).await;
                        return Ok(plan);
                    }

                    tracing::warn!(
                        "🔁 [{}] Plan over budget ({}%), retrying ({}/{})",
                        request_id,
                        report.utilization_percentage,
                        budget_retries,
                        self.max_budget_retries
                    );
                    prompt = self.reinforced_prompt(&request, &budget, &report, weather.as_ref());
                }
            }
        }
    }

    /// Un intento: llamar al generador, parsear, normalizar precios y
    /// evaluar el presupuesto
    async fn attempt(&self, prompt: &str, budget: &Money) -> Result<AttemptOutcome, PlannerError> {
        let generated = match self.generator.generate(prompt).await {
            Ok(generated) => generated,
            Err(LlmError::EmptyResponse) => return Ok(AttemptOutcome::NeedsFormatRetry),
            Err(LlmError::Timeout) => {
                return Err(PlannerError::Upstream("generator timed out".to_string()))
            }
            Err(LlmError::Upstream(msg)) => return Err(PlannerError::Upstream(msg)),
        };

        // Sin metadata de uso se estima por longitud del texto
        let tokens = generated
            .total_tokens
            .unwrap_or((generated.text.len() / 4) as u64);
        self.usage.record(tokens);

        let mut plan = match parse_itinerary(&generated.text) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!("Itinerary did not parse: {}", e);
                return Ok(AttemptOutcome::NeedsFormatRetry);
            }
        };

        self.normalize_prices(&mut plan, &budget.currency);

        let report = self.validator.evaluate(&plan, budget);
        plan.estimated_total_cost = report.estimated_total.amount.to_f64().unwrap_or(0.0);
        plan.budget_status = report.status;

        if report.status == BudgetStatus::WithinBudget {
            Ok(AttemptOutcome::Accepted(plan))
        } else {
            Ok(AttemptOutcome::NeedsBudgetRetry { plan, report })
        }
    }

    /// Moneda efectiva del request: la pedida, la nativa del destino o USD
    fn resolve_currency(&self, request: &TravelRequest) -> Result<String, PlannerError> {
        if let Some(requested) = &request.currency {
            let code = requested.to_uppercase();
            if !CurrencyConverter::is_supported(&code) {
                return Err(PlannerError::UnsupportedCurrency(code));
            }
            return Ok(code);
        }

        Ok(self
            .converter
            .native_currency_for(&request.destination)
            .unwrap_or("USD")
            .to_string())
    }

    /// Clave de cache del plan: todos los campos que cambian el resultado
    fn plan_key(&self, request: &TravelRequest, budget: &Money) -> String {
        let mut interests: Vec<String> = request
            .interests
            .iter()
            .map(|interest| interest.to_lowercase())
            .collect();
        interests.sort();

        cache_key(
            "llm",
            &[
                request.destination.to_lowercase(),
                request.duration_days.to_string(),
                budget.amount.to_string(),
                budget.currency.clone(),
                interests.join(","),
                request.weather_aware.to_string(),
            ],
        )
    }

    fn base_prompt(
        &self,
        request: &TravelRequest,
        budget: &Money,
        weather: Option<&WeatherContext>,
    ) -> String {
        let mut prompt = PROMPT_TEMPLATE
            .replace("{destination}", &request.destination)
            .replace("{duration}", &request.duration_days.to_string())
            .replace("{budget}", &self.display_budget(budget))
            .replace("{interests}", &request.interests.join(", "));

        if let Some(context) = weather {
            prompt.push_str("\n\nWeather forecast for the trip:\n");
            prompt.push_str(&context.summary);
            prompt.push_str(
                "\nSchedule outdoor activities on clear days and indoor alternatives on rainy days.",
            );
        }

        prompt
    }

    /// Prompt de reintento con la restricción de presupuesto reforzada
    fn reinforced_prompt(
        &self,
        request: &TravelRequest,
        budget: &Money,
        report: &BudgetReport,
        weather: Option<&WeatherContext>,
    ) -> String {
        let mut prompt = self.base_prompt(request, budget, weather);
        prompt.push_str(&format!(
            "\n\nIMPORTANT: Your previous plan totaled {} ({}% of the budget). \
             The TOTAL cost MUST NOT exceed {}. Choose cheaper accommodation, \
             transport and activities until the total fits within the budget.",
            self.display_budget(&report.estimated_total),
            report.utilization_percentage,
            self.display_budget(budget),
        ));
        prompt
    }

    /// Monto con símbolo y código, ej. "₹50000 (INR)"
    fn display_budget(&self, money: &Money) -> String {
        format!(
            "{}{} ({})",
            self.converter.symbol(&money.currency),
            money.amount,
            money.currency
        )
    }

    /// Convertir y redondear naturalmente todos los precios del plan a la
    /// moneda del presupuesto
    fn normalize_prices(&self, plan: &mut TravelResponse, target: &str) {
        let source = if CurrencyConverter::is_supported(&plan.currency) {
            plan.currency.clone()
        } else {
            // Moneda desconocida en la salida: se asume que los montos ya
            // vienen en la moneda pedida
            tracing::warn!(
                "Generator reported unsupported currency '{}', assuming {}",
                plan.currency,
                target
            );
            target.to_string()
        };

        for day in &mut plan.itinerary {
            for activity in &mut day.activities {
                activity.estimated_cost = self.normalized_cost(activity.estimated_cost, &source, target);
            }
            for recommendation in &mut day.food_recommendations {
                recommendation.estimated_cost =
                    self.normalized_cost(recommendation.estimated_cost, &source, target);
            }
            day.estimated_day_cost = self.normalized_cost(day.estimated_day_cost, &source, target);
        }

        for suggestion in &mut plan.accommodation_suggestions {
            suggestion.price_per_night =
                self.normalized_cost(suggestion.price_per_night, &source, target);
        }

        if let Some(transportation) = &mut plan.transportation {
            for option in &mut transportation.to_destination {
                option.estimated_cost = self.normalized_cost(option.estimated_cost, &source, target);
            }
            for option in &mut transportation.local_transport {
                option.estimated_daily_cost =
                    self.normalized_cost(option.estimated_daily_cost, &source, target);
            }
        }

        if let Some(breakdown) = &mut plan.budget_breakdown {
            breakdown.accommodation_total =
                self.normalized_cost(breakdown.accommodation_total, &source, target);
            breakdown.transportation_total =
                self.normalized_cost(breakdown.transportation_total, &source, target);
            breakdown.activities_total =
                self.normalized_cost(breakdown.activities_total, &source, target);
            breakdown.food_total = self.normalized_cost(breakdown.food_total, &source, target);
            breakdown.miscellaneous = self.normalized_cost(breakdown.miscellaneous, &source, target);
        }

        plan.currency = target.to_string();
    }

    fn normalized_cost(&self, value: f64, from: &str, to: &str) -> f64 {
        let amount = Decimal::from_f64_retain(value)
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO);

        match self.converter.normalize(amount, from, to) {
            Ok(money) => money.amount.to_f64().unwrap_or(value),
            Err(e) => {
                tracing::warn!("Price normalization failed: {}", e);
                value
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::services::llm_service::GeneratedText;

    /// Generador con respuestas predefinidas que registra los prompts
    struct ScriptedGenerator {
        responses: Mutex<std::collections::VecDeque<String>>,
        prompts: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<String>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn prompt(&self, index: usize) -> String {
            self.prompts.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl ItineraryGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<GeneratedText, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());

            let text = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::Upstream("script exhausted".to_string()))?;

            Ok(GeneratedText {
                text,
                total_tokens: Some(100),
            })
        }
    }

    fn plan_json(accommodation: f64, transport: f64, activities: f64, food: f64, misc: f64) -> String {
        json!({
            "destination": "Tokyo, Japan",
            "duration": 3,
            "estimated_total_cost": accommodation + transport + activities + food + misc,
            "currency": "USD",
            "itinerary": [],
            "budget_breakdown": {
                "accommodation_total": accommodation,
                "transportation_total": transport,
                "activities_total": activities,
                "food_total": food,
                "miscellaneous": misc
            },
            "travel_tips": []
        })
        .to_string()
    }

    fn request() -> TravelRequest {
        TravelRequest {
            destination: "Tokyo, Japan".to_string(),
            duration_days: 3,
            budget: 1000,
            currency: Some("USD".to_string()),
            interests: vec!["culture".to_string()],
            weather_aware: false,
        }
    }

    fn planner(
        generator: Arc<ScriptedGenerator>,
        rate_limit: u32,
    ) -> (TravelPlannerService, Arc<TtlCache<TravelResponse>>) {
        let plan_cache = Arc::new(TtlCache::new("llm", 10, Duration::from_secs(60)));
        let weather = Arc::new(WeatherService::new(
            Arc::new(TtlCache::new("geo", 10, Duration::from_secs(60))),
            Arc::new(TtlCache::new("weather", 10, Duration::from_secs(60))),
        ));

        let service = TravelPlannerService::new(
            generator,
            weather,
            plan_cache.clone(),
            Arc::new(SlidingWindowLimiter::new(rate_limit, Duration::from_secs(60))),
            Arc::new(UsageTracker::new()),
            Decimal::new(5, 2),
            2,
            2,
        );
        (service, plan_cache)
    }

    #[tokio::test]
    async fn test_request_identico_se_sirve_desde_cache() {
        let generator = ScriptedGenerator::new(vec![plan_json(400.0, 200.0, 200.0, 100.0, 50.0)]);
        let (service, plan_cache) = planner(generator.clone(), 10);

        let first = service.generate_itinerary(request(), "client-a").await.unwrap();
        let second = service.generate_itinerary(request(), "client-a").await.unwrap();

        assert_eq!(generator.call_count(), 1);
        assert_eq!(first.estimated_total_cost, second.estimated_total_cost);

        let stats = plan_cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_reintento_por_presupuesto_converge() {
        // 1200 (120%) excede la tolerancia; el reintento baja a 1030 (103%)
        let generator = ScriptedGenerator::new(vec![
            plan_json(600.0, 300.0, 200.0, 80.0, 20.0),
            plan_json(500.0, 250.0, 200.0, 60.0, 20.0),
        ]);
        let (service, _) = planner(generator.clone(), 10);

        let plan = service.generate_itinerary(request(), "client-a").await.unwrap();

        assert_eq!(generator.call_count(), 2);
        assert_eq!(plan.budget_status, BudgetStatus::WithinBudget);
        assert_eq!(plan.estimated_total_cost, 1030.0);

        // El prompt reforzado trae el total previo y el presupuesto con símbolo
        let retry_prompt = generator.prompt(1);
        assert!(retry_prompt.contains("MUST NOT exceed $1000 (USD)"));
        assert!(retry_prompt.contains("$1200 (USD)"));
        assert!(retry_prompt.contains("120"));
    }

    #[tokio::test]
    async fn test_reintentos_de_presupuesto_agotados_devuelve_ultimo_plan() {
        let over = plan_json(700.0, 300.0, 200.0, 100.0, 100.0);
        let generator =
            ScriptedGenerator::new(vec![over.clone(), over.clone(), over]);
        let (service, _) = planner(generator.clone(), 10);

        let plan = service.generate_itinerary(request(), "client-a").await.unwrap();

        // max_budget_retries = 2, o sea 3 intentos en total
        assert_eq!(generator.call_count(), 3);
        assert_eq!(plan.budget_status, BudgetStatus::OverBudget);
        assert_eq!(plan.estimated_total_cost, 1400.0);
    }

    #[tokio::test]
    async fn test_reintento_por_formato_invalido() {
        let generator = ScriptedGenerator::new(vec![
            "I'm sorry, here is some prose instead of JSON".to_string(),
            plan_json(400.0, 200.0, 200.0, 100.0, 50.0),
        ]);
        let (service, _) = planner(generator.clone(), 10);

        let plan = service.generate_itinerary(request(), "client-a").await.unwrap();

        assert_eq!(generator.call_count(), 2);
        assert_eq!(plan.budget_status, BudgetStatus::WithinBudget);
    }

    #[tokio::test]
    async fn test_formato_invalido_persistente_es_fatal() {
        let generator = ScriptedGenerator::new(vec![
            "not json".to_string(),
            "still not json".to_string(),
            "nope".to_string(),
        ]);
        let (service, _) = planner(generator.clone(), 10);

        let result = service.generate_itinerary(request(), "client-a").await;

        assert_eq!(generator.call_count(), 3);
        assert!(matches!(result, Err(PlannerError::MalformedOutput(3))));
    }

    #[tokio::test]
    async fn test_admision_denegada_sin_efectos_colaterales() {
        let generator = ScriptedGenerator::new(vec![plan_json(400.0, 200.0, 200.0, 100.0, 50.0)]);
        let (service, plan_cache) = planner(generator.clone(), 0);

        let result = service.generate_itinerary(request(), "client-a").await;

        assert!(matches!(result, Err(PlannerError::AdmissionDenied)));
        assert_eq!(generator.call_count(), 0);
        // La cache ni se consultó
        assert_eq!(plan_cache.stats().await.total_requests, 0);
    }

    #[tokio::test]
    async fn test_moneda_no_soportada_es_rechazada() {
        let generator = ScriptedGenerator::new(vec![]);
        let (service, _) = planner(generator.clone(), 10);

        let mut bad_request = request();
        bad_request.currency = Some("XYZ".to_string());

        let result = service.generate_itinerary(bad_request, "client-a").await;
        assert!(matches!(result, Err(PlannerError::UnsupportedCurrency(_))));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_precios_se_normalizan_a_la_moneda_pedida() {
        // El generador responde en USD pero el presupuesto es INR
        let generator = ScriptedGenerator::new(vec![plan_json(100.0, 50.0, 30.0, 20.0, 0.0)]);
        let (service, _) = planner(generator.clone(), 10);

        let mut inr_request = request();
        inr_request.budget = 50000;
        inr_request.currency = Some("INR".to_string());

        let plan = service.generate_itinerary(inr_request, "client-a").await.unwrap();

        assert_eq!(plan.currency, "INR");
        let breakdown = plan.budget_breakdown.unwrap();
        // 100 USD = 8300 INR -> redondeo natural a 8300
        assert_eq!(breakdown.accommodation_total, 8300.0);
        // 50 USD = 4150 INR -> redondea al multiplo de 100 mas cercano
        assert_eq!(breakdown.transportation_total, 4200.0);
        assert_eq!(plan.budget_status, BudgetStatus::WithinBudget);
    }

    #[tokio::test]
    async fn test_prompt_base_contiene_los_datos_del_request() {
        let generator = ScriptedGenerator::new(vec![plan_json(400.0, 200.0, 200.0, 100.0, 50.0)]);
        let (service, _) = planner(generator.clone(), 10);

        service.generate_itinerary(request(), "client-a").await.unwrap();

        let prompt = generator.prompt(0);
        assert!(prompt.contains("Tokyo, Japan"));
        assert!(prompt.contains("3 days"));
        assert!(prompt.contains("$1000 (USD)"));
        assert!(prompt.contains("culture"));
    }
}
