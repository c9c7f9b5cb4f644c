//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor con soporte para argumentos CLI y variables de
//! entorno. Todo se decide al arrancar: el modo del accept loop y la
//! estrategia del contador y del limiter no cambian en tiempo de ejecución.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./hitcount_server --port 8080 \
//!   --mode multi \
//!   --hit-counter unsynchronized \
//!   --rate-limiter fixed \
//!   --race-delay-ms 50
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8081 SERVER_MODE=single ./hitcount_server
//! ```

use crate::state::{HitCounterMode, RateLimiterMode};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Modo del accept loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServerMode {
    /// Atiende cada conexión hasta el final antes de aceptar la siguiente
    Single,
    /// Un thread por conexión aceptada
    Multi,
}

impl std::fmt::Display for ServerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerMode::Single => write!(f, "single-threaded"),
            ServerMode::Multi => write!(f, "multi-threaded"),
        }
    }
}

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "hitcount_server")]
#[command(about = "Servidor HTTP/1.1 de archivos con contador de hits y rate limiting")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    /// Directorio raíz que se sirve
    #[arg(long = "root", default_value = "./content", env = "CONTENT_DIR")]
    pub root_dir: PathBuf,

    /// Documento que se sirve para el path vacío
    #[arg(long, default_value = "index.html", env = "DEFAULT_DOCUMENT")]
    pub default_document: String,

    // === Accept loop ===
    /// Modo del accept loop
    #[arg(long, value_enum, default_value = "multi", env = "SERVER_MODE")]
    pub mode: ServerMode,

    /// Backlog del socket de escucha
    #[arg(long, default_value = "128", env = "LISTEN_BACKLOG")]
    pub backlog: u32,

    /// Bytes máximos que se leen como request
    #[arg(long = "read-buffer", default_value = "1024", env = "READ_BUFFER")]
    pub read_buffer: usize,

    // === Estado compartido ===
    /// Estrategia del contador de hits
    #[arg(long = "hit-counter", value_enum, default_value = "synchronized", env = "HIT_COUNTER")]
    pub hit_counter: HitCounterMode,

    /// Variante del rate limiter
    #[arg(long = "rate-limiter", value_enum, default_value = "sliding", env = "RATE_LIMITER")]
    pub rate_limiter: RateLimiterMode,

    /// Requests admitidos por ventana y por cliente
    #[arg(long = "rate-limit", default_value = "5", env = "RATE_LIMIT")]
    pub rate_limit: u32,

    /// Duración de la ventana deslizante en milisegundos
    #[arg(long = "rate-window-ms", default_value = "1000", env = "RATE_WINDOW_MS")]
    pub rate_window_ms: u64,

    /// Retardo artificial dentro del contador y del limiter fijo (0 = ninguno)
    #[arg(long = "race-delay-ms", default_value = "0", env = "RACE_DELAY_MS")]
    pub race_delay_ms: u64,

    /// Header que reemplaza la identidad del cliente (solo para tests)
    #[arg(long = "identity-header", env = "IDENTITY_HEADER")]
    pub identity_header: Option<String>,

    // === Logging ===
    /// Filtro de logging (sintaxis de EnvFilter)
    #[arg(long = "log", default_value = "info", env = "RUST_LOG")]
    pub log_filter: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use hitcount_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_window_ms)
    }

    pub fn race_delay(&self) -> Duration {
        Duration::from_millis(self.race_delay_ms)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), String> {
        if self.backlog == 0 || self.backlog > i32::MAX as u32 {
            return Err("Listen backlog must be between 1 and i32::MAX".to_string());
        }

        if self.read_buffer < 16 {
            return Err("Read buffer must be >= 16 bytes".to_string());
        }

        if self.rate_limiter != RateLimiterMode::Off && self.rate_limit == 0 {
            return Err("Rate limit must be >= 1 (use --rate-limiter off to disable)".to_string());
        }

        if self.rate_limiter == RateLimiterMode::Sliding && self.rate_window_ms == 0 {
            return Err("Rate window must be > 0 ms".to_string());
        }

        if self.default_document.is_empty() || self.default_document.contains('/') {
            return Err("Default document must be a plain file name".to_string());
        }

        if let Some(header) = &self.identity_header {
            if header.trim().is_empty() || header.contains(':') {
                return Err("Identity header must be a valid header name".to_string());
            }
        }

        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║             Hitcount HTTP/1.1 Server Configuration           ║");
        println!("╚══════════════════════════════════════════════════════════════╝");
        println!();
        println!("🌐 Network:");
        println!("   Address:      {}", self.address());
        println!("   Root dir:     {}", self.root_dir.display());
        println!("   Default doc:  {}", self.default_document);
        println!("   Mode:         {}", self.mode);
        println!("   Backlog:      {}", self.backlog);
        println!("   Read buffer:  {} bytes", self.read_buffer);
        println!();
        println!("🧮 Shared state:");
        println!("   Hit counter:  {}", self.hit_counter);
        match self.rate_limiter {
            RateLimiterMode::Off => println!("   Rate limit:   disabled"),
            RateLimiterMode::Sliding => println!(
                "   Rate limit:   {} req / {} ms per client (sliding)",
                self.rate_limit, self.rate_window_ms
            ),
            RateLimiterMode::Fixed => println!(
                "   Rate limit:   {} req / wall-clock second per client (fixed)",
                self.rate_limit
            ),
        }
        if self.race_delay_ms > 0 {
            println!("   Race delay:   {} ms", self.race_delay_ms);
        }
        if let Some(header) = &self.identity_header {
            println!("   Identity via: {} header", header);
        }
        println!();
        println!("═══════════════════════════════════════════════════════════════");
        println!();
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            root_dir: PathBuf::from("./content"),
            default_document: "index.html".to_string(),
            mode: ServerMode::Multi,
            backlog: 128,
            read_buffer: 1024,
            hit_counter: HitCounterMode::Synchronized,
            rate_limiter: RateLimiterMode::Sliding,
            rate_limit: 5,
            rate_window_ms: 1000,
            race_delay_ms: 0,
            identity_header: None,
            log_filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.mode, ServerMode::Multi);
        assert_eq!(config.backlog, 128);
        assert_eq!(config.read_buffer, 1024);
        assert_eq!(config.race_delay(), Duration::ZERO);
    }

    #[test]
    fn test_address_custom() {
        let mut config = Config::default();
        config.host = "127.0.0.1".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_validate_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_parse_cli_arguments() {
        let config = Config::try_parse_from([
            "hitcount_server",
            "--port",
            "8081",
            "--mode",
            "single",
            "--hit-counter",
            "unsynchronized",
            "--rate-limiter",
            "fixed",
            "--race-delay-ms",
            "25",
            "--identity-header",
            "X-Client-Id",
        ])
        .unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.mode, ServerMode::Single);
        assert_eq!(config.hit_counter, HitCounterMode::Unsynchronized);
        assert_eq!(config.rate_limiter, RateLimiterMode::Fixed);
        assert_eq!(config.race_delay(), Duration::from_millis(25));
        assert_eq!(config.identity_header.as_deref(), Some("X-Client-Id"));
    }

    #[test]
    fn test_parse_rejects_unknown_mode() {
        let result = Config::try_parse_from(["hitcount_server", "--mode", "forked"]);
        assert!(result.is_err());
    }

    // ==================== Validation ====================

    #[test]
    fn test_validate_invalid_backlog() {
        let mut config = Config::default();
        config.backlog = 0;
        assert!(config.validate().unwrap_err().contains("backlog"));
    }

    #[test]
    fn test_validate_small_read_buffer() {
        let mut config = Config::default();
        config.read_buffer = 4;
        assert!(config.validate().unwrap_err().contains("Read buffer"));
    }

    #[test]
    fn test_validate_zero_rate_limit() {
        let mut config = Config::default();
        config.rate_limit = 0;
        assert!(config.validate().unwrap_err().contains("Rate limit"));

        config.rate_limiter = RateLimiterMode::Off;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_window() {
        let mut config = Config::default();
        config.rate_window_ms = 0;
        assert!(config.validate().unwrap_err().contains("Rate window"));
    }

    #[test]
    fn test_validate_default_document() {
        let mut config = Config::default();
        config.default_document = "../etc/passwd".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_identity_header() {
        let mut config = Config::default();
        config.identity_header = Some("Bad:Header".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_print_summary() {
        let mut config = Config::default();
        // Should not panic
        config.print_summary();

        config.rate_limiter = RateLimiterMode::Fixed;
        config.race_delay_ms = 10;
        config.identity_header = Some("X-Client-Id".to_string());
        config.print_summary();
    }
}
