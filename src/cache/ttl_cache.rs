//! Cache genérica en memoria con TTL y evicción LRU
//!
//! Implementa la cache acotada que protege las llamadas a los servicios
//! externos (geocoding, forecast y generación de itinerarios). Cada recurso
//! tiene su propia instancia con capacidad y TTL independientes.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Entrada de cache con valor y expiración
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
    /// Tick del último acceso para LRU estricto. Los ticks son únicos, así
    /// que el orden de inserción resuelve cualquier empate por sí solo.
    touched: u64,
}

struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    hits: u64,
    misses: u64,
    /// Contador monotónico de accesos
    tick: u64,
}

/// Cache acotada con TTL por entrada y evicción LRU estricta
///
/// La expiración es perezosa: una entrada vencida se detecta y se elimina
/// en el `get` que la encuentra, sin barrido de fondo obligatorio.
pub struct TtlCache<V> {
    name: &'static str,
    capacity: usize,
    ttl: Duration,
    inner: RwLock<CacheInner<V>>,
}

/// Estadísticas de una instancia de cache
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: String,
    pub total_requests: u64,
}

impl<V: Clone> TtlCache<V> {
    /// Crear una cache vacía con contadores en cero
    pub fn new(name: &'static str, capacity: usize, ttl: Duration) -> Self {
        Self {
            name,
            capacity,
            ttl,
            inner: RwLock::new(CacheInner {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
                tick: 0,
            }),
        }
    }

    /// Obtener un valor de la cache
    ///
    /// Una entrada vencida cuenta como miss aunque siga físicamente presente
    /// y se elimina en el acto.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.write().await;
        let now = Instant::now();

        let expired = match inner.entries.get(key) {
            Some(entry) => now >= entry.expires_at,
            None => {
                inner.misses += 1;
                debug!("Cache {} miss: {}", self.name, key);
                return None;
            }
        };

        if expired {
            inner.entries.remove(key);
            inner.misses += 1;
            debug!("Cache {} expirada: {}", self.name, key);
            return None;
        }

        inner.tick += 1;
        inner.hits += 1;
        let tick = inner.tick;

        if let Some(entry) = inner.entries.get_mut(key) {
            entry.touched = tick;
            let age = now.duration_since(entry.created_at);
            debug!("Cache {} hit: {} (edad: {:.1}s)", self.name, key, age.as_secs_f64());
            return Some(entry.value.clone());
        }

        None
    }

    /// Guardar un valor con el TTL configurado de esta instancia
    ///
    /// Si la clave es nueva y la cache está llena, se desaloja primero la
    /// entrada menos recientemente usada. Un `put` sobre una clave existente
    /// la sobrescribe y renueva su expiración sin desalojar nada.
    pub async fn put(&self, key: &str, value: V) {
        let mut inner = self.inner.write().await;
        let now = Instant::now();

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.capacity {
            let lru_key = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.touched)
                .map(|(k, _)| k.clone());

            if let Some(lru_key) = lru_key {
                inner.entries.remove(&lru_key);
                debug!("Cache {} evicción LRU: {}", self.name, lru_key);
            }
        }

        inner.tick += 1;
        let tick = inner.tick;

        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                created_at: now,
                expires_at: now + self.ttl,
                touched: tick,
            },
        );

        debug!("Cache {} set: {} (TTL: {}s)", self.name, key, self.ttl.as_secs());
    }

    /// Eliminar las entradas vencidas
    ///
    /// Barrido opcional de higiene de memoria; la expiración perezosa en
    /// `get` sigue siendo la semántica de referencia.
    pub async fn sweep_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        let now = Instant::now();

        let before = inner.entries.len();
        inner.entries.retain(|_, entry| now < entry.expires_at);
        let removed = before - inner.entries.len();

        if removed > 0 {
            debug!("Cache {}: {} entradas vencidas eliminadas", self.name, removed);
        }

        removed
    }

    /// Vaciar la cache y reiniciar los contadores
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        let count = inner.entries.len();

        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
        inner.tick = 0;

        info!("Cache {} limpiada: {} entradas eliminadas", self.name, count);
    }

    /// Obtener estadísticas de la instancia
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        let total_requests = inner.hits + inner.misses;
        let hit_rate = if total_requests > 0 {
            inner.hits as f64 / total_requests as f64 * 100.0
        } else {
            0.0
        };

        CacheStats {
            size: inner.entries.len(),
            max_size: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
            hit_rate: format!("{:.1}%", hit_rate),
            total_requests,
        }
    }
}
