//! # Archivos Servidos
//! src/files/mod.rs
//!
//! - `resolve`: path de URL → clave del contador y destino en disco
//! - `mime`: content type por extensión
//! - `listing`: HTML de un directorio con conteo de hits

pub mod listing;
pub mod mime;
pub mod resolve;

pub use resolve::{resolve, RequestPath, Target};
