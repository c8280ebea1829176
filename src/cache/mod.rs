//! Cache
//!
//! Este módulo contiene los sistemas de cache en memoria. Hay una instancia
//! independiente por clase de recurso (geocoding, forecast, itinerarios
//! generados), cada una con su propia capacidad y TTL.

pub mod ttl_cache;

pub use ttl_cache::{CacheStats, TtlCache};

/// Generar una clave de cache determinística
///
/// Los campos se unen con un delimitador fijo y se reducen con md5, igual
/// para dos requests idénticos campo por campo.
pub fn cache_key(prefix: &str, fields: &[String]) -> String {
    let joined = fields.join("|");
    format!("{}:{:x}", prefix, md5::compute(joined.as_bytes()))
}
