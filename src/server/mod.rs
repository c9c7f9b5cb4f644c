//! # Módulo del Servidor
//! src/server/mod.rs
//!
//! - `tcp`: accept loop (single o multi thread)
//! - `handler`: atiende un request por conexión

pub mod handler;
pub mod tcp;

pub use handler::{ConnectionHandler, Outcome};
pub use tcp::Server;
