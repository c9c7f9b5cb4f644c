//! # Tipos MIME
//! src/files/mime.rs
//!
//! Solo se sirven archivos cuya extensión está en la tabla; el resto
//! responde 404 aunque exista.

use std::path::Path;

/// Content type para extensiones desconocidas
pub const OCTET_STREAM: &str = "application/octet-stream";

const MIME_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("txt", "text/plain"),
    ("css", "text/css"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("pdf", "application/pdf"),
];

fn lookup(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// Content type según la extensión, `application/octet-stream` si no se conoce
pub fn content_type_for(path: &Path) -> &'static str {
    lookup(path).unwrap_or(OCTET_STREAM)
}

/// `true` si la extensión está en la tabla
pub fn is_allowed(path: &Path) -> bool {
    lookup(path).is_some()
}
