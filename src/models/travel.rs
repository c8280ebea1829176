//! Modelos de request y response para la generación de itinerarios
//!
//! Estos DTOs definen el contrato con el caller y la forma estructurada que
//! se espera del generador externo.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request de generación de itinerario
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TravelRequest {
    /// Destino del viaje (ej. "Tokyo, Japan")
    #[validate(length(min = 2, max = 100))]
    pub destination: String,

    /// Número de días del viaje (1-30)
    #[validate(range(min = 1, max = 30))]
    pub duration_days: u32,

    /// Presupuesto total en la moneda indicada
    #[validate(range(min = 1))]
    pub budget: u32,

    /// Código de moneda del presupuesto. Si falta, se detecta la moneda
    /// nativa del destino o se asume USD.
    #[serde(default)]
    pub currency: Option<String>,

    /// Intereses del viajero (ej. ["culture", "food"])
    #[validate(length(min = 1, max = 10))]
    pub interests: Vec<String>,

    /// Incluir el pronóstico del clima en la planificación
    #[serde(default = "default_weather_aware")]
    pub weather_aware: bool,
}

fn default_weather_aware() -> bool {
    true
}

impl TravelRequest {
    /// Normalizar campos de texto: destino recortado e intereses sin vacíos
    pub fn normalized(mut self) -> Self {
        self.destination = self.destination.trim().to_string();
        self.interests = self
            .interests
            .iter()
            .map(|interest| interest.trim().to_string())
            .filter(|interest| !interest.is_empty())
            .collect();
        self
    }
}

/// Actividad individual dentro del itinerario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub time: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub estimated_cost: f64,
    pub location: String,
}

/// Recomendación de comida para una franja del día
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodRecommendation {
    pub meal_type: String,
    pub restaurant: String,
    pub dish: String,
    #[serde(default)]
    pub estimated_cost: f64,
}

/// Itinerario de un día
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayItinerary {
    pub day: u32,
    pub title: String,
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub food_recommendations: Vec<FoodRecommendation>,
    #[serde(default)]
    pub estimated_day_cost: f64,
}

/// Sugerencia de alojamiento
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accommodation {
    pub name: String,
    #[serde(rename = "type")]
    pub accommodation_type: String,
    #[serde(default)]
    pub price_per_night: f64,
    pub location: String,
    #[serde(default)]
    pub amenities: Vec<String>,
}

/// Opción de transporte
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportationOption {
    pub mode: String,
    #[serde(default)]
    pub estimated_cost: f64,
    /// Costo diario para transporte local (se multiplica por la duración)
    #[serde(default)]
    pub estimated_daily_cost: f64,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub tips: String,
}

/// Información completa de transporte
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transportation {
    #[serde(default)]
    pub to_destination: Vec<TransportationOption>,
    #[serde(default)]
    pub local_transport: Vec<TransportationOption>,
}

/// Desglose de presupuesto por categoría
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetBreakdown {
    pub accommodation_total: f64,
    pub transportation_total: f64,
    pub activities_total: f64,
    pub food_total: f64,
    pub miscellaneous: f64,
}

/// Estado del plan respecto al presupuesto solicitado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    #[default]
    WithinBudget,
    OverBudget,
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetStatus::WithinBudget => write!(f, "within_budget"),
            BudgetStatus::OverBudget => write!(f, "over_budget"),
        }
    }
}

/// Respuesta completa con el itinerario generado
///
/// Es también la forma estructurada que se le exige al generador externo;
/// una respuesta que no deserializa a esto es un fallo de formato.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelResponse {
    pub destination: String,
    pub duration: u32,
    #[serde(default)]
    pub estimated_total_cost: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub itinerary: Vec<DayItinerary>,
    #[serde(default)]
    pub accommodation_suggestions: Vec<Accommodation>,
    #[serde(default)]
    pub transportation: Option<Transportation>,
    #[serde(default)]
    pub budget_breakdown: Option<BudgetBreakdown>,
    #[serde(default)]
    pub travel_tips: Vec<String>,
    #[serde(default)]
    pub budget_status: BudgetStatus,
}

fn default_currency() -> String {
    "USD".to_string()
}
