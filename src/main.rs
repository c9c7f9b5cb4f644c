//! # Hitcount Server - Entry Point
//! src/main.rs
//!
//! Parsea la configuración, instala el logging y corre el accept loop.

use hitcount_server::config::Config;
use hitcount_server::logging;
use hitcount_server::server::Server;
use hitcount_server::state::SharedState;

fn main() {
    let config = Config::new();

    if let Err(e) = config.validate() {
        eprintln!("💥 Configuración inválida: {}", e);
        std::process::exit(1);
    }

    logging::init(&config.log_filter);
    config.print_summary();

    let state = SharedState::from_config(&config);

    let server = match Server::bind(&config, state) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, address = %config.address(), "failed to start");
            std::process::exit(1);
        }
    };

    // Esto bloquea el thread principal
    if let Err(e) = server.run() {
        tracing::error!(error = %e, "accept loop stopped");
        std::process::exit(1);
    }
}
