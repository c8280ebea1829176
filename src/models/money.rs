//! Valor monetario con moneda explícita

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::currency::{CurrencyConverter, CurrencyError};

/// Monto decimal con su código de moneda de 3 letras
///
/// Invariantes: el monto nunca es negativo y el código está en la tabla de
/// tasas. Se construye únicamente vía `Money::new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: String,
}

impl Money {
    /// Crear un valor monetario validado
    pub fn new(amount: Decimal, currency: &str) -> Result<Self, CurrencyError> {
        let code = currency.to_uppercase();

        if !CurrencyConverter::is_supported(&code) {
            return Err(CurrencyError::Unsupported(code));
        }
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(CurrencyError::NegativeAmount(amount));
        }

        Ok(Self {
            amount,
            currency: code,
        })
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_valido() {
        let money = Money::new(Decimal::new(10050, 2), "usd").unwrap();
        assert_eq!(money.currency, "USD");
        assert_eq!(money.to_string(), "100.50 USD");
    }

    #[test]
    fn test_money_rechaza_negativos() {
        let result = Money::new(Decimal::new(-1, 0), "USD");
        assert!(matches!(result, Err(CurrencyError::NegativeAmount(_))));
    }

    #[test]
    fn test_money_rechaza_moneda_desconocida() {
        let result = Money::new(Decimal::ONE, "ZZZ");
        assert!(matches!(result, Err(CurrencyError::Unsupported(_))));
    }
}
