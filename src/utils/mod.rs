//! Utilidades del sistema
//!
//! Manejo de errores, conversión de monedas, validación de presupuesto y
//! contabilidad de tokens.

pub mod budget;
pub mod currency;
pub mod errors;
pub mod tokens;

pub use budget::{BudgetReport, BudgetSummary, BudgetValidator, CostCategory};
pub use currency::{CurrencyConverter, CurrencyError};
pub use errors::{AppError, AppResult};
pub use tokens::{TokenStats, UsageTracker};
