//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Encuadre HTTP/1.1 mínimo que necesita el servidor de archivos:
//!
//! - Parsing de la request line y headers
//! - Construcción de responses con `Connection: close`
//! - Códigos de estado
//!
//! No hay keep-alive, chunked transfer ni pipelining.

pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
