//! # Rate Limiter por Cliente
//! src/state/rate_limiter.rs
//!
//! Decide si se admite un request, una vez por request y antes de tocar el
//! sistema de archivos. Tres variantes detrás de [`RateLimiter`]:
//!
//! - [`SlidingWindowLimiter`]: guarda los timestamps de los requests
//!   admitidos dentro de la ventana. Admite exactamente `limit` requests en
//!   cualquier ventana deslizante de `window`. Es la variante correcta.
//! - [`FixedWindowLimiter`]: un contador por segundo de reloj de pared, sin
//!   lock entre la lectura y la escritura. Es más débil a propósito: cerca
//!   del borde de un segundo admite hasta 2× el límite, y dos requests
//!   simultáneos pueden leer el mismo contador viejo y pasar ambos.
//! - [`Unlimited`]: siempre admite.
//!
//! Ninguna variante es retroactiva: un request rechazado no libera cupo.

use super::clock::{SystemTimeSource, TimeSource};
use super::pause;
use clap::ValueEnum;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Variante del limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RateLimiterMode {
    /// Ventana deslizante de timestamps
    Sliding,
    /// Contador por segundo de reloj (ingenuo)
    Fixed,
    /// Sin límite
    Off,
}

impl std::fmt::Display for RateLimiterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimiterMode::Sliding => write!(f, "sliding"),
            RateLimiterMode::Fixed => write!(f, "fixed"),
            RateLimiterMode::Off => write!(f, "off"),
        }
    }
}

/// Interfaz común de los limiters
pub trait RateLimiter: Send + Sync {
    /// `true` si el request de `identity` se admite
    fn allow(&self, identity: &str) -> bool;

    fn name(&self) -> &'static str;
}

/// Construye el limiter elegido en la configuración
pub fn build(
    mode: RateLimiterMode,
    limit: u32,
    window: Duration,
    race_delay: Duration,
) -> Arc<dyn RateLimiter> {
    match mode {
        RateLimiterMode::Sliding => Arc::new(SlidingWindowLimiter::new(limit, window)),
        RateLimiterMode::Fixed => Arc::new(FixedWindowLimiter::new(limit, race_delay)),
        RateLimiterMode::Off => Arc::new(Unlimited),
    }
}

// ==================== Ventana deslizante ====================

type Timestamps = Arc<Mutex<VecDeque<Instant>>>;

/// Limiter de ventana deslizante con un lock por cliente
pub struct SlidingWindowLimiter {
    limit: usize,
    window: Duration,

    /// Lock estructural: solo protege la creación de la cola de un cliente nuevo
    clients: Mutex<HashMap<String, Timestamps>>,
}

impl SlidingWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit as usize,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn timestamps(&self, identity: &str) -> Timestamps {
        Arc::clone(
            self.clients
                .lock()
                .entry(identity.to_string())
                .or_default(),
        )
    }

    /// Cantidad de timestamps retenidos para el cliente
    pub fn tracked(&self, identity: &str) -> usize {
        let timestamps = self.clients.lock().get(identity).cloned();
        match timestamps {
            Some(timestamps) => {
                let len = timestamps.lock().len();
                len
            }
            None => 0,
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn allow(&self, identity: &str) -> bool {
        // El lock estructural ya se soltó aquí
        let timestamps = self.timestamps(identity);
        let mut timestamps = timestamps.lock();
        let now = Instant::now();

        while let Some(&oldest) = timestamps.front() {
            if now.duration_since(oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() < self.limit {
            timestamps.push_back(now);
            true
        } else {
            false
        }
    }

    fn name(&self) -> &'static str {
        "sliding-window"
    }
}

// ==================== Ventana fija ====================

#[derive(Debug, Clone, Copy)]
struct FixedWindow {
    start_second: u64,
    count: u32,
}

/// Limiter ingenuo de ventana fija por segundo de reloj.
///
/// El mapa se lee y se escribe en dos accesos separados, con la decisión
/// (y el retardo artificial) en medio. No hay exclusión entre ambos.
pub struct FixedWindowLimiter<T: TimeSource = SystemTimeSource> {
    limit: u32,
    race_delay: Duration,
    windows: Mutex<HashMap<String, FixedWindow>>,
    time_source: T,
}

impl FixedWindowLimiter<SystemTimeSource> {
    pub fn new(limit: u32, race_delay: Duration) -> Self {
        Self::with_time_source(limit, race_delay, SystemTimeSource)
    }
}

impl<T: TimeSource> FixedWindowLimiter<T> {
    pub fn with_time_source(limit: u32, race_delay: Duration, time_source: T) -> Self {
        Self {
            limit,
            race_delay,
            windows: Mutex::new(HashMap::new()),
            time_source,
        }
    }

    /// Contador guardado del cliente en el segundo actual
    pub fn count_in_window(&self, identity: &str) -> u32 {
        let second = self.time_source.now_secs();
        self.windows
            .lock()
            .get(identity)
            .filter(|w| w.start_second == second)
            .map(|w| w.count)
            .unwrap_or(0)
    }
}

impl<T: TimeSource> RateLimiter for FixedWindowLimiter<T> {
    fn allow(&self, identity: &str) -> bool {
        let second = self.time_source.now_secs();

        let stored = self.windows.lock().get(identity).copied();
        let mut window = match stored {
            Some(w) if w.start_second == second => w,
            _ => FixedWindow {
                start_second: second,
                count: 0,
            },
        };

        let admitted = window.count < self.limit;
        pause(self.race_delay);

        if admitted {
            window.count += 1;
        }
        // Escritura con el valor leído antes del retardo
        self.windows.lock().insert(identity.to_string(), window);

        admitted
    }

    fn name(&self) -> &'static str {
        "fixed-window"
    }
}

// ==================== Sin límite ====================

/// Admite todo
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl RateLimiter for Unlimited {
    fn allow(&self, _identity: &str) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::clock::ManualTimeSource;
    use std::sync::Barrier;
    use std::thread;

    fn concurrent_admissions(limiter: Arc<dyn RateLimiter>, workers: usize) -> usize {
        let barrier = Arc::new(Barrier::new(workers));
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    limiter.allow("burst")
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|admitted| *admitted)
            .count()
    }

    // ==================== Sliding ====================

    #[test]
    fn test_sliding_limit_then_recovers() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(1));

        for i in 0..5 {
            assert!(limiter.allow("10.0.0.1"), "request {} should pass", i + 1);
        }
        assert!(!limiter.allow("10.0.0.1"));
        assert_eq!(limiter.tracked("10.0.0.1"), 5);

        thread::sleep(Duration::from_millis(1100));
        assert!(limiter.allow("10.0.0.1"));
    }

    #[test]
    fn test_sliding_denied_requests_do_not_consume() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(60));

        assert!(limiter.allow("a"));
        assert!(limiter.allow("a"));
        for _ in 0..10 {
            assert!(!limiter.allow("a"));
        }
        assert_eq!(limiter.tracked("a"), 2);
    }

    #[test]
    fn test_sliding_identities_are_independent() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));

        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        assert!(limiter.allow("b"));
        assert_eq!(limiter.tracked("unknown"), 0);
    }

    #[test]
    fn test_sliding_exact_under_concurrency() {
        let limiter = build(
            RateLimiterMode::Sliding,
            5,
            Duration::from_secs(60),
            Duration::from_millis(20),
        );

        assert_eq!(concurrent_admissions(limiter, 32), 5);
    }

    // ==================== Fixed ====================

    #[test]
    fn test_fixed_limit_within_second() {
        let clock = ManualTimeSource::new(1_000);
        let limiter = FixedWindowLimiter::with_time_source(5, Duration::ZERO, clock.clone());

        for _ in 0..5 {
            assert!(limiter.allow("a"));
        }
        assert!(!limiter.allow("a"));
        assert_eq!(limiter.count_in_window("a"), 5);
    }

    #[test]
    fn test_fixed_resets_on_next_second() {
        let clock = ManualTimeSource::new(1_000);
        let limiter = FixedWindowLimiter::with_time_source(5, Duration::ZERO, clock.clone());

        for _ in 0..5 {
            assert!(limiter.allow("a"));
        }
        assert!(!limiter.allow("a"));

        clock.advance(1);
        assert_eq!(limiter.count_in_window("a"), 0);
        assert!(limiter.allow("a"));
    }

    #[test]
    fn test_fixed_boundary_admits_double_limit() {
        let clock = ManualTimeSource::new(2_000);
        let limiter = FixedWindowLimiter::with_time_source(5, Duration::ZERO, clock.clone());

        // 5 al final del segundo T y 5 al inicio de T+1
        let mut admitted = (0..5).filter(|_| limiter.allow("edge")).count();
        clock.advance(1);
        admitted += (0..5).filter(|_| limiter.allow("edge")).count();

        assert_eq!(admitted, 10);
    }

    #[test]
    fn test_fixed_concurrent_burst_exceeds_limit() {
        // Todos los threads leen el contador antes de que alguno escriba
        let clock = ManualTimeSource::new(3_000);
        let limiter: Arc<dyn RateLimiter> = Arc::new(FixedWindowLimiter::with_time_source(
            5,
            Duration::from_millis(50),
            clock,
        ));

        assert!(concurrent_admissions(limiter, 20) > 5);
    }

    #[test]
    fn test_unlimited_always_allows() {
        let limiter = build(RateLimiterMode::Off, 0, Duration::ZERO, Duration::ZERO);
        for _ in 0..1000 {
            assert!(limiter.allow("anyone"));
        }
        assert_eq!(limiter.name(), "off");
    }
}
