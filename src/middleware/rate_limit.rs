//! Rate limiting de ventana deslizante
//!
//! Este módulo implementa el control de admisión por identidad de cliente.
//! El orquestador lo consulta como primer paso de cada request de
//! generación, antes de tocar la cache o llamar al generador externo.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

/// Limitador de ventana deslizante por identidad de cliente
///
/// Guarda los timestamps de los requests admitidos dentro de la ventana
/// actual; los anteriores a `now - window` se podan de forma perezosa en
/// cada consulta. El cupo se cobra al intentar, no al completar: un request
/// cancelado a mitad de vuelo no devuelve su slot.
pub struct SlidingWindowLimiter {
    window: Duration,
    max_requests: u32,
    clients: RwLock<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    /// Crear un limitador vacío
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            window,
            max_requests,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Verificar si un cliente puede hacer otro request
    ///
    /// Devuelve `true` y registra el timestamp si quedan slots en la
    /// ventana; `false` si la ventana está agotada.
    pub async fn allow(&self, client_id: &str) -> bool {
        let mut clients = self.clients.write().await;
        let now = Instant::now();

        let timestamps = clients.entry(client_id.to_string()).or_default();

        // Sin cutoff (ventana más grande que la vida del reloj monotónico)
        // no hay nada fuera de la ventana todavía
        if let Some(cutoff) = now.checked_sub(self.window) {
            while let Some(oldest) = timestamps.front() {
                if *oldest < cutoff {
                    timestamps.pop_front();
                } else {
                    break;
                }
            }
        }

        if timestamps.len() < self.max_requests as usize {
            timestamps.push_back(now);
            true
        } else {
            debug!("Rate limit agotado para cliente: {}", client_id);
            false
        }
    }

    /// Eliminar el estado de clientes inactivos
    ///
    /// Un cliente cuyo request más reciente quedó fuera de la ventana ya no
    /// aporta nada al control de admisión. Pensado para un barrido periódico
    /// desde una tarea de fondo.
    pub async fn sweep_idle(&self) -> usize {
        let mut clients = self.clients.write().await;
        let cutoff = match Instant::now().checked_sub(self.window) {
            Some(cutoff) => cutoff,
            None => return 0,
        };

        let before = clients.len();
        clients.retain(|_, timestamps| {
            timestamps.back().map(|last| *last >= cutoff).unwrap_or(false)
        });
        let removed = before - clients.len();

        if removed > 0 {
            debug!("Rate limiter: {} clientes inactivos eliminados", removed);
        }

        removed
    }

    /// Número de clientes con actividad dentro de la ventana
    pub async fn active_clients(&self) -> usize {
        let clients = self.clients.read().await;
        let cutoff = Instant::now().checked_sub(self.window);

        clients
            .values()
            .filter(|timestamps| match cutoff {
                Some(cutoff) => timestamps.back().map(|last| *last >= cutoff).unwrap_or(false),
                None => !timestamps.is_empty(),
            })
            .count()
    }

    /// Límite configurado de requests por ventana
    pub fn limit(&self) -> u32 {
        self.max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_admite_hasta_el_limite() {
        let limiter = SlidingWindowLimiter::new(3, Duration::from_secs(60));

        assert!(limiter.allow("cliente-1").await);
        assert!(limiter.allow("cliente-1").await);
        assert!(limiter.allow("cliente-1").await);
        // El cuarto dentro de la misma ventana se rechaza
        assert!(!limiter.allow("cliente-1").await);
    }

    #[tokio::test]
    async fn test_clientes_independientes() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));

        assert!(limiter.allow("cliente-1").await);
        assert!(!limiter.allow("cliente-1").await);
        assert!(limiter.allow("cliente-2").await);
    }

    #[tokio::test]
    async fn test_ventana_deslizante_libera_slots() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_millis(80));

        assert!(limiter.allow("cliente-1").await);
        assert!(limiter.allow("cliente-1").await);
        assert!(!limiter.allow("cliente-1").await);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(limiter.allow("cliente-1").await);
    }

    #[tokio::test]
    async fn test_ventana_mas_grande_que_el_reloj_monotonico() {
        // Una ventana enorme hace que now - window quede antes del inicio
        // del reloj; nada debe entrar en pánico ni podarse
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(u64::MAX / 2));

        assert!(limiter.allow("cliente-1").await);
        assert!(limiter.allow("cliente-1").await);
        assert!(!limiter.allow("cliente-1").await);

        assert_eq!(limiter.active_clients().await, 1);
        assert_eq!(limiter.sweep_idle().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_idle() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_millis(50));

        limiter.allow("cliente-1").await;
        limiter.allow("cliente-2").await;
        assert_eq!(limiter.active_clients().await, 2);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(limiter.active_clients().await, 0);
        assert_eq!(limiter.sweep_idle().await, 2);
    }
}
