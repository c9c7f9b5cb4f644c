//! # Fuente de Tiempo
//! src/state/clock.rs
//!
//! El limiter de ventana fija trabaja con segundos de reloj de pared.
//! La fuente se inyecta para poder mover el reloj en los tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Fuente de segundos de reloj de pared
pub trait TimeSource: Send + Sync {
    /// Segundos completos desde UNIX_EPOCH
    fn now_secs(&self) -> u64;
}

/// Reloj del sistema
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_secs(&self) -> u64 {
        // Un reloj anterior a 1970 cae en el segundo 0
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Reloj controlado a mano. Los clones comparten el mismo segundo.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    secs: Arc<AtomicU64>,
}

impl ManualTimeSource {
    pub fn new(start_secs: u64) -> Self {
        Self {
            secs: Arc::new(AtomicU64::new(start_secs)),
        }
    }

    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_secs(&self) -> u64 {
        self.secs.load(Ordering::SeqCst)
    }
}
