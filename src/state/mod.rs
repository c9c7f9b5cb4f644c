//! # Estado Compartido
//! src/state/mod.rs
//!
//! Los únicos recursos compartidos entre handlers concurrentes:
//!
//! - `hit_counter`: conteo por (cliente, path)
//! - `rate_limiter`: admisión por cliente
//!
//! Ambos se crean vacíos al arrancar y viven lo que vive el proceso.
//! La estrategia de cada uno se elige por configuración al construirlos.

pub mod clock;
pub mod hit_counter;
pub mod rate_limiter;

pub use hit_counter::{HitCounter, HitCounterMode, HitRecord};
pub use rate_limiter::{RateLimiter, RateLimiterMode};

use crate::config::Config;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Estado que comparten todos los handlers
#[derive(Clone)]
pub struct SharedState {
    pub hits: Arc<dyn HitCounter>,
    pub limiter: Arc<dyn RateLimiter>,
}

impl SharedState {
    pub fn new(hits: Arc<dyn HitCounter>, limiter: Arc<dyn RateLimiter>) -> Self {
        Self { hits, limiter }
    }

    /// Construye ambas estrategias según la configuración
    pub fn from_config(config: &Config) -> Self {
        let race_delay = config.race_delay();
        Self {
            hits: hit_counter::build(config.hit_counter, race_delay),
            limiter: rate_limiter::build(
                config.rate_limiter,
                config.rate_limit,
                config.rate_window(),
                race_delay,
            ),
        }
    }
}

/// Retardo artificial para ensanchar ventanas de carrera. Cero = no hace nada.
pub(crate) fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
