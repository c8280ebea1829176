//! Conversión de monedas y redondeo natural de precios
//!
//! Tabla estática de tasas de cambio con pivote en USD, más el redondeo por
//! tramos que produce precios "naturales" en lugar de resultados exactos de
//! la aritmética de conversión. Todo precio generado pasa por `convert` y
//! `round_naturally` antes de entrar a un reporte de presupuesto o de
//! mostrarse al usuario.

use std::collections::HashMap;

use lazy_static::lazy_static;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::models::money::Money;

lazy_static! {
    /// Tasas de cambio estáticas (aproximadas, 2026). Base: USD
    static ref RATES: HashMap<&'static str, Decimal> = {
        let mut rates = HashMap::new();
        rates.insert("USD", Decimal::ONE);
        rates.insert("INR", Decimal::new(83, 0)); // 1 USD = 83 INR
        rates.insert("EUR", Decimal::new(92, 2)); // 1 USD = 0.92 EUR
        rates.insert("GBP", Decimal::new(79, 2)); // 1 USD = 0.79 GBP
        rates.insert("JPY", Decimal::new(147, 0)); // 1 USD = 147 JPY
        rates
    };
}

/// Ciudades y regiones de India para detección de moneda nativa
const INDIAN_DESTINATIONS: &[&str] = &[
    // Ciudades principales
    "delhi", "mumbai", "bangalore", "bengaluru", "kolkata", "chennai", "hyderabad",
    "pune", "ahmedabad", "jaipur", "surat", "lucknow", "kanpur", "nagpur",
    // Destinos turísticos
    "goa", "kochi", "cochin", "kerala", "pondicherry", "puducherry", "agra",
    "varanasi", "udaipur", "jaisalmer", "jodhpur", "shimla", "manali", "darjeeling",
    "rishikesh", "haridwar", "amritsar", "mysore", "ooty", "munnar", "alleppey",
    "hampi", "khajuraho", "ajanta", "ellora", "mahabalipuram", "madurai",
    // Estados
    "rajasthan", "maharashtra", "karnataka", "tamil nadu", "west bengal",
    "uttar pradesh", "gujarat", "andhra pradesh", "telangana", "punjab",
    "himachal pradesh", "uttarakhand", "jammu", "kashmir", "meghalaya",
    // Otros
    "india", "andaman", "lakshadweep", "ladakh",
];

/// Errores de conversión de moneda
#[derive(Debug, Error)]
pub enum CurrencyError {
    #[error("Unsupported currency: {0}")]
    Unsupported(String),

    #[error("Negative amount: {0}")]
    NegativeAmount(Decimal),
}

/// Conversor de monedas con tasas estáticas
#[derive(Debug, Clone, Default)]
pub struct CurrencyConverter;

impl CurrencyConverter {
    pub fn new() -> Self {
        Self
    }

    /// Verificar si un código de moneda está en la tabla de tasas
    pub fn is_supported(code: &str) -> bool {
        RATES.contains_key(code.to_uppercase().as_str())
    }

    /// Convertir un monto entre monedas vía el pivote USD
    pub fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Money, CurrencyError> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();

        let from_rate = RATES
            .get(from.as_str())
            .ok_or_else(|| CurrencyError::Unsupported(from.clone()))?;
        let to_rate = RATES
            .get(to.as_str())
            .ok_or_else(|| CurrencyError::Unsupported(to.clone()))?;

        if from == to {
            return Money::new(amount, &to);
        }

        let usd = amount / *from_rate;
        let converted = (usd * *to_rate).round_dp(2);

        Money::new(converted, &to)
    }

    /// Redondear un monto a un valor "natural" según tramos de granularidad
    ///
    /// La tabla es única y se aplica igual a todas las monedas; por eso el
    /// redondeo no recibe el código de moneda.
    ///
    /// Tabla canónica (límite inferior inclusivo, superior exclusivo):
    /// - [0, 50)    -> múltiplo de 10 más cercano
    /// - [50, 200)  -> múltiplo de 20 más cercano
    /// - [200, 1000)-> múltiplo de 50 más cercano
    /// - [1000, ∞)  -> múltiplo de 100 más cercano
    ///
    /// Empates a mitad de camino van hacia arriba. Un resultado puede caer
    /// en un tramo de granularidad distinta (46 -> 50, y 50 pertenece al
    /// tramo de 20), así que se repite el redondeo hasta punto fijo: aplicar
    /// la función dos veces da siempre lo mismo que aplicarla una.
    pub fn round_naturally(&self, amount: Decimal) -> Decimal {
        let mut value = amount;
        for _ in 0..4 {
            let rounded = Self::round_once(value);
            if rounded == value {
                return rounded;
            }
            value = rounded;
        }
        value
    }

    /// Convertir y redondear naturalmente en un solo paso
    pub fn normalize(&self, amount: Decimal, from: &str, to: &str) -> Result<Money, CurrencyError> {
        let converted = self.convert(amount, from, to)?;
        let rounded = self.round_naturally(converted.amount);
        Money::new(rounded, &converted.currency)
    }

    fn round_once(amount: Decimal) -> Decimal {
        let granularity = if amount < Decimal::from(50u32) {
            Decimal::from(10u32)
        } else if amount < Decimal::from(200u32) {
            Decimal::from(20u32)
        } else if amount < Decimal::from(1000u32) {
            Decimal::from(50u32)
        } else {
            Decimal::from(100u32)
        };

        (amount / granularity)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            * granularity
    }

    /// Símbolo de la moneda para mostrar junto al monto
    pub fn symbol(&self, currency: &str) -> String {
        match currency.to_uppercase().as_str() {
            "USD" => "$".to_string(),
            "INR" => "₹".to_string(),
            "EUR" => "€".to_string(),
            "GBP" => "£".to_string(),
            "JPY" => "¥".to_string(),
            other => other.to_string(),
        }
    }

    /// Detectar la moneda nativa de un destino cuando el request no la trae
    ///
    /// Por ahora solo se detectan destinos de India (precios nativos en INR).
    pub fn native_currency_for(&self, destination: &str) -> Option<&'static str> {
        let destination = destination.to_lowercase();
        if INDIAN_DESTINATIONS
            .iter()
            .any(|place| destination.contains(place))
        {
            Some("INR")
        } else {
            None
        }
    }
}
