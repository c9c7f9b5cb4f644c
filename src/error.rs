//! # Errores del Servidor
//! src/error.rs
//!
//! - `BadRequest`, `NotFound`, `RateLimited`: el handler los convierte en
//!   una respuesta HTTP.
//! - `Io`: aborta solo la conexión actual; el accept loop lo registra y sigue.
//! - `Config`: fallo al arrancar (bind o validación).

use crate::http::{ParseError, Response, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bad request: {0}")]
    BadRequest(#[from] ParseError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;

impl ServerError {
    /// Código HTTP para los errores recuperables
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ServerError::BadRequest(_) => Some(StatusCode::BadRequest),
            ServerError::NotFound(_) => Some(StatusCode::NotFound),
            ServerError::RateLimited(_) => Some(StatusCode::TooManyRequests),
            ServerError::Io(_) | ServerError::Config(_) => None,
        }
    }

    /// Respuesta HTTP para el error, si es recuperable
    pub fn to_response(&self) -> Option<Response> {
        let status = self.status()?;
        let response = match self {
            ServerError::BadRequest(e) => {
                Response::error(status, &format!("Invalid request: {}", e))
            }
            ServerError::NotFound(path) => Response::error(
                status,
                &format!("The requested path /{} was not found on this server.", path),
            ),
            ServerError::RateLimited(identity) => Response::rate_limited(identity),
            ServerError::Io(_) | ServerError::Config(_) => return None,
        };
        Some(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServerError::from(ParseError::EmptyRequest).status(),
            Some(StatusCode::BadRequest)
        );
        assert_eq!(
            ServerError::NotFound("x".into()).status(),
            Some(StatusCode::NotFound)
        );
        assert_eq!(
            ServerError::RateLimited("a".into()).status(),
            Some(StatusCode::TooManyRequests)
        );
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert_eq!(ServerError::from(io).status(), None);
    }

    #[test]
    fn test_to_response_matches_status() {
        let errors = [
            ServerError::from(ParseError::InvalidRequestLine),
            ServerError::NotFound("missing.xyz".into()),
            ServerError::RateLimited("10.0.0.1".into()),
        ];

        for error in errors {
            let response = error.to_response().unwrap();
            assert_eq!(Some(response.status()), error.status());
        }
    }

    #[test]
    fn test_rate_limited_response_has_retry_after() {
        let response = ServerError::RateLimited("10.0.0.1".into())
            .to_response()
            .unwrap();
        assert_eq!(response.header("Retry-After"), Some("1"));
    }

    #[test]
    fn test_display() {
        let error = ServerError::Config("Listen backlog must be >= 1".into());
        assert!(error.to_string().contains("invalid configuration"));
    }
}
