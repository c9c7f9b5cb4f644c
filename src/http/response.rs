//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Todas las respuestas del servidor usan el mismo encuadre:
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/html\r\n
//! Content-Length: 13\r\n
//! Connection: close\r\n
//! \r\n
//! <h1>hola</h1>
//! ```
//!
//! No hay keep-alive: cada conexión atiende un único request.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use hitcount_server::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_content_type("text/plain")
//!     .with_body(b"hola".to_vec());
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

use super::StatusCode;

/// Content type usado cuando no se especifica otro
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Respuesta HTTP/1.1 completa
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    content_type: String,

    /// Headers adicionales, emitidos después de los obligatorios
    extra_headers: Vec<(String, String)>,

    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta vacía con `Content-Type: text/html`
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            extra_headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Establece el content type
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    /// Agrega un header adicional
    ///
    /// `Content-Type`, `Content-Length` y `Connection` los maneja la
    /// propia respuesta y no deben pasarse aquí.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Versión mutable de [`Response::with_header`]
    pub fn add_header(&mut self, name: &str, value: &str) {
        if let Some(existing) = self
            .extra_headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            existing.1 = value.to_string();
        } else {
            self.extra_headers.push((name.to_string(), value.to_string()));
        }
    }

    /// Establece el cuerpo de la respuesta
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Respuesta HTML exitosa (200 OK)
    pub fn html(body: String) -> Self {
        Self::new(StatusCode::Ok).with_body(body.into_bytes())
    }

    /// Respuesta de error con una página HTML mínima
    ///
    /// Formato: `<h1>404 Not Found</h1><p>mensaje</p>`
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = format!(
            "<html><body><h1>{}</h1><p>{}</p></body></html>",
            status,
            escape_html(message)
        );
        Self::new(status).with_body(body.into_bytes())
    }

    /// Respuesta 429 con `Retry-After`
    pub fn rate_limited(identity: &str) -> Self {
        Self::error(
            StatusCode::TooManyRequests,
            &format!("Rate limit exceeded for client {}. Try again later.", identity),
        )
        .with_header("Retry-After", "1")
    }

    /// Convierte la respuesta a bytes listos para enviar por el socket
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = self.head_bytes();
        result.extend_from_slice(&self.body);
        result
    }

    /// Solo status line y headers (respuesta a HEAD)
    ///
    /// `Content-Length` sigue reflejando el tamaño del cuerpo.
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            self.status,
            self.content_type,
            self.body.len()
        );

        for (name, value) in &self.extra_headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }

        head.push_str("\r\n");
        head.into_bytes()
    }

    /// Obtiene el código de estado de la respuesta
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Busca un header adicional, sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.extra_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Obtiene una referencia al body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Escapa los caracteres especiales de HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_response() {
        let response = Response::new(StatusCode::Ok);
        assert_eq!(response.status(), StatusCode::Ok);
        assert!(String::from_utf8_lossy(&response.to_bytes()).contains("Content-Type: text/html\r\n"));
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_wire_format_exact() {
        let response = Response::new(StatusCode::Ok)
            .with_content_type("text/plain")
            .with_body(b"Test".to_vec());

        let text = String::from_utf8(response.to_bytes()).unwrap();

        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 4\r\nConnection: close\r\n\r\nTest"
        );
    }

    #[test]
    fn test_extra_headers_after_mandatory() {
        let response = Response::rate_limited("10.0.0.1");
        let text = String::from_utf8(response.to_bytes()).unwrap();

        assert!(text.starts_with("HTTP/1.1 429 Too Many Requests\r\n"));
        assert!(text.contains("Connection: close\r\nRetry-After: 1\r\n\r\n"));
        assert!(text.contains("10.0.0.1"));
        assert_eq!(response.header("retry-after"), Some("1"));
    }

    #[test]
    fn test_add_header_overwrites() {
        let mut response = Response::new(StatusCode::Ok).with_header("X-Hits", "1");
        response.add_header("x-hits", "2");

        assert_eq!(response.header("X-Hits"), Some("2"));
    }

    #[test]
    fn test_error_response_escapes_message() {
        let response = Response::error(StatusCode::NotFound, "<script>");
        let body = String::from_utf8(response.body().to_vec()).unwrap();

        assert_eq!(response.status(), StatusCode::NotFound);
        assert!(body.contains("<h1>404 Not Found</h1>"));
        assert!(body.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_head_bytes_keep_length() {
        let response = Response::html("<p>hola</p>".to_string());
        let head = String::from_utf8(response.head_bytes()).unwrap();

        assert!(head.contains("Content-Length: 11\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
        assert!(!head.contains("hola"));
    }

    #[test]
    fn test_binary_body() {
        let binary_data = vec![0x89, 0x50, 0x4E, 0x47];
        let response = Response::new(StatusCode::Ok)
            .with_content_type("image/png")
            .with_body(binary_data.clone());

        assert!(response.to_bytes().ends_with(&binary_data));
    }
}
