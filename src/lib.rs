//! # Hitcount Server
//! src/lib.rs
//!
//! Servidor HTTP/1.1 de archivos pensado para ejercitar riesgos de
//! concurrencia: estado mutable compartido entre handlers, rate limiting
//! por cliente y la diferencia entre un accept loop de un solo thread y uno
//! con un thread por conexión.
//!
//! ## Arquitectura
//!
//! ```text
//! Accept loop → Handler → { Rate limiter, Hit counter, archivos } → respuesta
//! ```
//!
//! - `server`: accept loop y handler de conexión
//! - `state`: contador de hits y rate limiter (variantes correctas e ingenuas)
//! - `files`: resolución de paths, tipos MIME y listados de directorio
//! - `http`: parsing de requests y construcción de responses
//! - `config`: argumentos CLI y variables de entorno
//! - `error`: taxonomía de errores
//! - `logging`: subscriber de `tracing`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use hitcount_server::config::Config;
//! use hitcount_server::server::Server;
//! use hitcount_server::state::SharedState;
//!
//! let config = Config::default();
//! let state = SharedState::from_config(&config);
//! let server = Server::bind(&config, state).expect("Error al iniciar servidor");
//! server.run().expect("Error en el accept loop");
//! ```

pub mod config;
pub mod error;
pub mod files;
pub mod http;
pub mod logging;
pub mod server;
pub mod state;
