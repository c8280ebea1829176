//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos compartidos.

pub mod money;
pub mod travel;

pub use money::Money;
pub use travel::*;
