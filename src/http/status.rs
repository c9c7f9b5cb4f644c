//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Códigos de estado que usa el servidor de archivos:
//!
//! - **200**: archivo o listado servido
//! - **400**: request line ilegible
//! - **404**: path inexistente o extensión no permitida
//! - **429**: cliente limitado por el rate limiter
//! - **500**: fallo de I/O al leer el archivo ya resuelto

/// Códigos de estado HTTP que soporta el servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 200 OK - La petición fue exitosa
    Ok = 200,

    /// 400 Bad Request - Request line malformada
    BadRequest = 400,

    /// 404 Not Found - Ruta o recurso no encontrado
    NotFound = 404,

    /// 429 Too Many Requests - Rate limiting activado
    TooManyRequests = 429,

    /// 500 Internal Server Error - Error interno del servidor
    InternalServerError = 500,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use hitcount_server::http::StatusCode;
    /// assert_eq!(StatusCode::TooManyRequests.as_u16(), 429);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Texto de razón (reason phrase) asociado al código
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::TooManyRequests => "Too Many Requests",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_values() {
        assert_eq!(StatusCode::Ok.as_u16(), 200);
        assert_eq!(StatusCode::BadRequest.as_u16(), 400);
        assert_eq!(StatusCode::NotFound.as_u16(), 404);
        assert_eq!(StatusCode::TooManyRequests.as_u16(), 429);
    }

    #[test]
    fn test_display() {
        assert_eq!(StatusCode::Ok.to_string(), "200 OK");
        assert_eq!(StatusCode::TooManyRequests.to_string(), "429 Too Many Requests");
    }
}
