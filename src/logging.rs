//! # Logging
//! src/logging.rs
//!
//! Subscriber de `tracing` para el binario. El filtro usa la sintaxis de
//! `EnvFilter` (ej: `info`, `hitcount_server=debug`).

use tracing_subscriber::EnvFilter;

/// Instala el subscriber global. Retorna `false` si ya había uno.
///
/// Un filtro inválido cae en `info`.
pub fn init(filter: &str) -> bool {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init("debug");
        assert!(!init("not a [valid filter"));
    }
}
