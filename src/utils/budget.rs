//! Validación de presupuesto
//!
//! Agrega los costos itemizados de un plan generado, los compara contra el
//! presupuesto solicitado con un margen de tolerancia y produce el reporte
//! que el orquestador consulta para decidir si reintenta. Es una función
//! pura: nunca dispara la regeneración por sí misma.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::models::money::Money;
use crate::models::travel::{BudgetStatus, TravelResponse};

/// Fracción de tolerancia por defecto (5%)
pub const DEFAULT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Categorías de costo del desglose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    Accommodation,
    Transport,
    Activities,
    Food,
    Miscellaneous,
}

/// Reporte de presupuesto de un intento de generación
///
/// Se produce uno nuevo por cada intento y no se muta después de creado; un
/// reintento lo reemplaza por completo.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetReport {
    pub estimated_total: Money,
    pub category_totals: HashMap<CostCategory, Money>,
    pub utilization_percentage: Decimal,
    pub status: BudgetStatus,
}

/// Resumen de presupuesto para el endpoint de validación
#[derive(Debug, Clone, Serialize)]
pub struct BudgetSummary {
    pub is_within_budget: bool,
    pub user_budget: Decimal,
    pub currency: String,
    pub estimated_total_cost: Decimal,
    pub remaining_budget: Decimal,
    pub percentage_used: Decimal,
    pub breakdown: HashMap<CostCategory, Decimal>,
    pub status: BudgetStatus,
}

/// Validador de presupuesto con margen de tolerancia
#[derive(Debug, Clone)]
pub struct BudgetValidator {
    /// Fracción de exceso permitida sobre el presupuesto (0.05 = 5%)
    tolerance: Decimal,
}

impl Default for BudgetValidator {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl BudgetValidator {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }

    /// Evaluar los costos de un plan contra el presupuesto solicitado
    pub fn evaluate(&self, itinerary: &TravelResponse, budget: &Money) -> BudgetReport {
        let breakdown = self.breakdown(itinerary);
        let total: Decimal = breakdown.values().copied().sum();

        let max_allowed = budget.amount * (Decimal::ONE + self.tolerance);
        let status = if total <= max_allowed {
            BudgetStatus::WithinBudget
        } else {
            BudgetStatus::OverBudget
        };

        let utilization_percentage = if budget.amount > Decimal::ZERO {
            (total / budget.amount * Decimal::from(100u32)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        debug!(
            "Presupuesto evaluado: total {} vs máximo {} ({})",
            total, max_allowed, status
        );

        // Los montos vienen clampeados a no-negativo y la moneda ya fue
        // validada al construir el presupuesto, así que el literal preserva
        // los invariantes de Money.
        let currency = budget.currency.clone();
        let category_totals = breakdown
            .into_iter()
            .map(|(category, amount)| {
                (
                    category,
                    Money {
                        amount,
                        currency: currency.clone(),
                    },
                )
            })
            .collect();

        BudgetReport {
            estimated_total: Money {
                amount: total,
                currency,
            },
            category_totals,
            utilization_percentage,
            status,
        }
    }

    /// Resumen completo para el endpoint de validación de presupuesto
    pub fn summary(&self, itinerary: &TravelResponse, budget: &Money) -> BudgetSummary {
        let report = self.evaluate(itinerary, budget);
        let total = report.estimated_total.amount;

        BudgetSummary {
            is_within_budget: report.status == BudgetStatus::WithinBudget,
            user_budget: budget.amount,
            currency: budget.currency.clone(),
            estimated_total_cost: total,
            remaining_budget: budget.amount - total,
            percentage_used: report.utilization_percentage,
            breakdown: report
                .category_totals
                .into_iter()
                .map(|(category, money)| (category, money.amount))
                .collect(),
            status: report.status,
        }
    }

    /// Desglose por categoría: usa el provisto por el generador si existe,
    /// si no lo calcula recorriendo el itinerario
    fn breakdown(&self, itinerary: &TravelResponse) -> HashMap<CostCategory, Decimal> {
        if let Some(provided) = &itinerary.budget_breakdown {
            let mut breakdown = HashMap::new();
            breakdown.insert(CostCategory::Accommodation, dec(provided.accommodation_total));
            breakdown.insert(CostCategory::Transport, dec(provided.transportation_total));
            breakdown.insert(CostCategory::Activities, dec(provided.activities_total));
            breakdown.insert(CostCategory::Food, dec(provided.food_total));
            breakdown.insert(CostCategory::Miscellaneous, dec(provided.miscellaneous));
            return breakdown;
        }

        self.breakdown_from_itinerary(itinerary)
    }

    fn breakdown_from_itinerary(&self, itinerary: &TravelResponse) -> HashMap<CostCategory, Decimal> {
        let duration = Decimal::from(itinerary.duration);

        let mut activities = Decimal::ZERO;
        let mut food = Decimal::ZERO;
        for day in &itinerary.itinerary {
            for activity in &day.activities {
                activities += dec(activity.estimated_cost);
            }
            for recommendation in &day.food_recommendations {
                food += dec(recommendation.estimated_cost);
            }
        }

        // Alojamiento: promedio por noche de las sugerencias por la duración
        let mut accommodation = Decimal::ZERO;
        if !itinerary.accommodation_suggestions.is_empty() {
            let nightly_sum: Decimal = itinerary
                .accommodation_suggestions
                .iter()
                .map(|suggestion| dec(suggestion.price_per_night))
                .sum();
            let average = nightly_sum / Decimal::from(itinerary.accommodation_suggestions.len());
            accommodation = (average * duration).round_dp(2);
        }

        let mut transport = Decimal::ZERO;
        if let Some(transportation) = &itinerary.transportation {
            for option in &transportation.to_destination {
                transport += dec(option.estimated_cost);
            }
            for option in &transportation.local_transport {
                transport += dec(option.estimated_daily_cost) * duration;
            }
        }

        // Imprevistos: 10% del subtotal
        let subtotal = activities + food + accommodation + transport;
        let miscellaneous = (subtotal * Decimal::new(1, 1)).round_dp(2);

        let mut breakdown = HashMap::new();
        breakdown.insert(CostCategory::Accommodation, accommodation);
        breakdown.insert(CostCategory::Transport, transport);
        breakdown.insert(CostCategory::Activities, activities);
        breakdown.insert(CostCategory::Food, food);
        breakdown.insert(CostCategory::Miscellaneous, miscellaneous);
        breakdown
    }
}

/// Decimal desde el f64 del JSON generado, clampeado a no-negativo
fn dec(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or(Decimal::ZERO)
        .max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::travel::{
        Accommodation, Activity, BudgetBreakdown, DayItinerary, FoodRecommendation,
        Transportation, TransportationOption,
    };

    fn budget(amount: u32) -> Money {
        Money::new(Decimal::from(amount), "USD").unwrap()
    }

    fn response_with_breakdown(breakdown: BudgetBreakdown) -> TravelResponse {
        TravelResponse {
            destination: "Tokyo, Japan".to_string(),
            duration: 5,
            estimated_total_cost: 0.0,
            currency: "USD".to_string(),
            itinerary: vec![],
            accommodation_suggestions: vec![],
            transportation: None,
            budget_breakdown: Some(breakdown),
            travel_tips: vec![],
            budget_status: BudgetStatus::WithinBudget,
        }
    }

    #[test]
    fn test_total_igual_al_presupuesto_queda_dentro() {
        let validator = BudgetValidator::default();
        let response = response_with_breakdown(BudgetBreakdown {
            accommodation_total: 500.0,
            transportation_total: 200.0,
            activities_total: 200.0,
            food_total: 100.0,
            miscellaneous: 0.0,
        });

        let report = validator.evaluate(&response, &budget(1000));
        assert_eq!(report.status, BudgetStatus::WithinBudget);
        assert_eq!(report.estimated_total.amount, Decimal::from(1000u32));
        assert_eq!(report.utilization_percentage, Decimal::from(100u32));
    }

    #[test]
    fn test_total_en_el_limite_de_tolerancia_queda_dentro() {
        let validator = BudgetValidator::default();
        // Exactamente presupuesto * 1.05
        let response = response_with_breakdown(BudgetBreakdown {
            accommodation_total: 500.0,
            transportation_total: 200.0,
            activities_total: 200.0,
            food_total: 100.0,
            miscellaneous: 50.0,
        });

        let report = validator.evaluate(&response, &budget(1000));
        assert_eq!(report.status, BudgetStatus::WithinBudget);
    }

    #[test]
    fn test_total_sobre_la_tolerancia_queda_fuera() {
        let validator = BudgetValidator::default();
        let response = response_with_breakdown(BudgetBreakdown {
            accommodation_total: 500.0,
            transportation_total: 200.0,
            activities_total: 200.0,
            food_total: 100.0,
            miscellaneous: 50.01,
        });

        let report = validator.evaluate(&response, &budget(1000));
        assert_eq!(report.status, BudgetStatus::OverBudget);
    }

    #[test]
    fn test_desglose_calculado_desde_el_itinerario() {
        let validator = BudgetValidator::default();

        let response = TravelResponse {
            destination: "Goa".to_string(),
            duration: 2,
            estimated_total_cost: 0.0,
            currency: "USD".to_string(),
            itinerary: vec![DayItinerary {
                day: 1,
                title: "Playa".to_string(),
                activities: vec![Activity {
                    time: "10:00".to_string(),
                    name: "Tour".to_string(),
                    description: "Tour guiado".to_string(),
                    estimated_cost: 100.0,
                    location: "Centro".to_string(),
                }],
                food_recommendations: vec![FoodRecommendation {
                    meal_type: "lunch".to_string(),
                    restaurant: "Local".to_string(),
                    dish: "Thali".to_string(),
                    estimated_cost: 50.0,
                }],
                estimated_day_cost: 150.0,
            }],
            accommodation_suggestions: vec![Accommodation {
                name: "Hotel".to_string(),
                accommodation_type: "hotel".to_string(),
                price_per_night: 200.0,
                location: "Centro".to_string(),
                amenities: vec![],
            }],
            transportation: Some(Transportation {
                to_destination: vec![TransportationOption {
                    mode: "flight".to_string(),
                    estimated_cost: 300.0,
                    estimated_daily_cost: 0.0,
                    duration: Some("2h".to_string()),
                    tips: String::new(),
                }],
                local_transport: vec![TransportationOption {
                    mode: "taxi".to_string(),
                    estimated_cost: 0.0,
                    estimated_daily_cost: 20.0,
                    duration: None,
                    tips: String::new(),
                }],
            }),
            budget_breakdown: None,
            travel_tips: vec![],
            budget_status: BudgetStatus::WithinBudget,
        };

        let report = validator.evaluate(&response, &budget(1000));
        let breakdown = &report.category_totals;

        // Alojamiento 200 x 2 noches, transporte 300 + 20 x 2, imprevistos 10%
        assert_eq!(
            breakdown[&CostCategory::Accommodation].amount,
            Decimal::from(400u32)
        );
        assert_eq!(
            breakdown[&CostCategory::Transport].amount,
            Decimal::from(340u32)
        );
        assert_eq!(
            breakdown[&CostCategory::Activities].amount,
            Decimal::from(100u32)
        );
        assert_eq!(breakdown[&CostCategory::Food].amount, Decimal::from(50u32));
        assert_eq!(
            breakdown[&CostCategory::Miscellaneous].amount,
            Decimal::from(89u32)
        );
        assert_eq!(report.estimated_total.amount, Decimal::from(979u32));
    }

    #[test]
    fn test_summary_reporta_restante_y_porcentaje() {
        let validator = BudgetValidator::default();
        let response = response_with_breakdown(BudgetBreakdown {
            accommodation_total: 400.0,
            transportation_total: 200.0,
            activities_total: 150.0,
            food_total: 50.0,
            miscellaneous: 0.0,
        });

        let summary = validator.summary(&response, &budget(1000));
        assert!(summary.is_within_budget);
        assert_eq!(summary.estimated_total_cost, Decimal::from(800u32));
        assert_eq!(summary.remaining_budget, Decimal::from(200u32));
        assert_eq!(summary.percentage_used, Decimal::from(80u32));
        assert_eq!(summary.status, BudgetStatus::WithinBudget);
    }
}
