//! Contabilidad de tokens consumidos por el generador externo
//!
//! Contadores atómicos globales al proceso; se exponen en el endpoint de
//! estadísticas junto con un costo estimado.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Costo estimado en USD por cada 1000 tokens
const COST_PER_1K_TOKENS: f64 = 0.0003;

/// Snapshot de uso de tokens para el endpoint de estadísticas
#[derive(Debug, Clone, Serialize)]
pub struct TokenStats {
    pub total_tokens: u64,
    pub total_requests: u64,
    pub avg_tokens_per_request: u64,
    pub estimated_cost_usd: f64,
}

/// Acumulador de tokens por proceso
#[derive(Debug, Default)]
pub struct UsageTracker {
    total_tokens: AtomicU64,
    total_requests: AtomicU64,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registrar los tokens de una llamada al generador
    pub fn record(&self, tokens: u64) {
        self.total_tokens.fetch_add(tokens, Ordering::Relaxed);
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TokenStats {
        let total_tokens = self.total_tokens.load(Ordering::Relaxed);
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let avg_tokens_per_request = if total_requests > 0 {
            total_tokens / total_requests
        } else {
            0
        };

        TokenStats {
            total_tokens,
            total_requests,
            avg_tokens_per_request,
            estimated_cost_usd: (total_tokens as f64 / 1000.0) * COST_PER_1K_TOKENS,
        }
    }
}
