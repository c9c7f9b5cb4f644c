//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Parser tolerante de requests HTTP. El servidor lee un único buffer
//! acotado por conexión, así que el parser trabaja sobre ese slice completo
//! y nunca espera más datos.
//!
//! Solo el path de la request line puede hacer fallar el parsing. Todo lo
//! demás se acepta tal como llega:
//!
//! - Métodos distintos de GET y HEAD se sirven como GET
//! - La versión HTTP no se valida
//! - Las líneas de header sin `:` (por ejemplo una cortada por el límite de
//!   lectura) se descartan
//!
//! ## Formato
//!
//! ```text
//! GET /docs/index.html?v=2 HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! X-Client-Id: tester-1\r\n
//! \r\n
//! ```

use std::collections::HashMap;
use thiserror::Error;

/// Método HTTP del request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,

    /// Como GET pero solo retorna headers
    HEAD,

    /// Cualquier otro token; se atiende igual que GET
    Other,
}

impl Method {
    fn from_token(token: &str) -> Self {
        match token {
            "GET" => Method::GET,
            "HEAD" => Method::HEAD,
            _ => Method::Other,
        }
    }
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// La request line no tiene un path que empiece con `/`
    #[error("Invalid request line format")]
    InvalidRequestLine,

    /// Request vacío
    #[error("Empty request")]
    EmptyRequest,
}

/// Request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Path decodificado, sin query string (ej: "/docs/a b.html")
    path: String,

    /// Headers con nombre en minúsculas
    headers: HashMap<String, String>,
}

impl Request {
    /// Parsea un request desde bytes
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use hitcount_server::http::Request;
    ///
    /// let raw = b"GET /index.html HTTP/1.1\r\nX-Client-Id: a\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/index.html");
    /// assert_eq!(request.header("x-client-id"), Some("a"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        // El buffer puede cortar un carácter multibyte al final
        let request_str = String::from_utf8_lossy(buffer);

        if request_str.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut lines = request_str.split("\r\n");
        let request_line = lines.next().unwrap_or_default();
        let (method, path) = Self::parse_request_line(request_line)?;
        let headers = Self::parse_headers(lines);

        Ok(Request {
            method,
            path,
            headers,
        })
    }

    /// Formato: `METHOD /path?query [VERSION]`
    fn parse_request_line(line: &str) -> Result<(Method, String), ParseError> {
        let mut parts = line.split_whitespace();
        let method = parts.next().map(Method::from_token);
        let raw_path = parts.next();

        let (method, raw_path) = match (method, raw_path) {
            (Some(method), Some(raw_path)) if raw_path.starts_with('/') => (method, raw_path),
            _ => return Err(ParseError::InvalidRequestLine),
        };

        let without_query = raw_path.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
        Ok((method, percent_decode(without_query)))
    }

    /// Cada header tiene formato "Name: Value"; el nombre se guarda en minúsculas.
    /// Las líneas sin `:` se ignoran.
    fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
        let mut headers = HashMap::new();

        for line in lines {
            // La línea vacía marca el fin de los headers
            if line.trim().is_empty() {
                break;
            }

            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        headers
    }

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> Method {
        self.method
    }

    /// Obtiene el path del request
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene un header, sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }
}

/// Decodifica secuencias `%XX`. Secuencias inválidas se dejan tal cual.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
