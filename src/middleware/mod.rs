//! Middleware del sistema
//!
//! Este módulo contiene el middleware de CORS y el limitador de admisión
//! que consulta el orquestador.

pub mod cors;
pub mod rate_limit;

pub use cors::*;
pub use rate_limit::*;
