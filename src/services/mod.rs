//! Servicios del sistema
//!
//! Generador externo, clima y el orquestador de planificación.

pub mod llm_service;
pub mod planner_service;
pub mod weather_service;

pub use llm_service::{GeminiGenerator, ItineraryGenerator, LlmError};
pub use planner_service::{PlannerError, TravelPlannerService};
pub use weather_service::WeatherService;
