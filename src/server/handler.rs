//! # Handler de Conexión
//! src/server/handler.rs
//!
//! Atiende un único request por conexión, en este orden:
//!
//! 1. Lee hasta `read_buffer` bytes (un solo `read`, sin reensamblar)
//! 2. Si no llegó nada, termina sin error
//! 3. Parsea la request line (400 si es ilegible)
//! 4. Resuelve la identidad del cliente (IP remota o header de override)
//! 5. Consulta el rate limiter (429 sin tocar contador ni disco)
//! 6. Registra el hit de (identidad, path)
//! 7. Sirve el archivo o el listado (404 si no existe)
//! 8. Escribe la respuesta
//!
//! El cierre del socket lo garantiza el dueño del stream al soltarlo, en
//! cualquier camino de salida.

use crate::config::Config;
use crate::error::{Result, ServerError};
use crate::files::{self, listing, mime, RequestPath, Target};
use crate::http::{Method, Request, Response, StatusCode};
use crate::state::SharedState;
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Resultado de una conexión atendida
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: StatusCode,
    pub identity: Option<String>,
    /// Clave del contador, si el request llegó a contarse
    pub path: Option<String>,
    /// Conteo después de registrar este request
    pub hits: Option<u64>,
    /// Bytes de body enviados (0 para HEAD)
    pub body_bytes: usize,
}

/// Respuesta más los datos para logging
struct Handled {
    response: Response,
    head_only: bool,
    identity: Option<String>,
    path: Option<String>,
    hits: Option<u64>,
}

impl Handled {
    fn early(response: Response, identity: Option<String>) -> Self {
        Self {
            response,
            head_only: false,
            identity,
            path: None,
            hits: None,
        }
    }
}

/// Handler compartido por todas las conexiones
pub struct ConnectionHandler {
    state: SharedState,
    root_dir: PathBuf,
    default_document: String,
    read_buffer: usize,
    identity_header: Option<String>,
}

impl ConnectionHandler {
    pub fn new(config: &Config, state: SharedState) -> Self {
        Self {
            state,
            root_dir: config.root_dir.clone(),
            default_document: config.default_document.clone(),
            read_buffer: config.read_buffer,
            identity_header: config.identity_header.clone(),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Atiende la conexión. `peer` es la identidad por defecto (IP remota).
    ///
    /// Retorna `Ok(None)` si el cliente cerró sin enviar nada. Un error de
    /// I/O aborta solo esta conexión.
    pub fn handle<S: Read + Write>(&self, stream: &mut S, peer: &str) -> Result<Option<Outcome>> {
        let mut buffer = vec![0u8; self.read_buffer];
        let bytes_read = stream.read(&mut buffer)?;

        if bytes_read == 0 {
            debug!(peer, "connection closed without data");
            return Ok(None);
        }

        debug!(peer, bytes = bytes_read, "request received");

        let handled = self.respond(&buffer[..bytes_read], peer);

        let bytes = if handled.head_only {
            handled.response.head_bytes()
        } else {
            handled.response.to_bytes()
        };
        stream.write_all(&bytes)?;
        stream.flush()?;

        Ok(Some(Outcome {
            status: handled.response.status(),
            body_bytes: if handled.head_only { 0 } else { handled.response.body().len() },
            identity: handled.identity,
            path: handled.path,
            hits: handled.hits,
        }))
    }

    fn respond(&self, raw: &[u8], peer: &str) -> Handled {
        let request = match Request::parse(raw) {
            Ok(request) => request,
            Err(e) => {
                debug!(peer, error = %e, "parse error");
                let response = ServerError::from(e)
                    .to_response()
                    .unwrap_or_else(|| Response::error(StatusCode::BadRequest, "Invalid request"));
                return Handled::early(response, None);
            }
        };

        let identity = self.identity(&request, peer);

        if !self.state.limiter.allow(&identity) {
            warn!(identity = %identity, path = request.path(), "rate limited");
            let response = ServerError::RateLimited(identity.clone())
                .to_response()
                .unwrap_or_else(|| Response::rate_limited(&identity));
            return Handled::early(response, Some(identity));
        }

        let request_path = RequestPath::from_url(request.path(), &self.default_document);
        let hits = self.state.hits.record_and_get(&identity, &request_path.key);

        let response = match self.serve(&identity, &request_path) {
            Ok(response) => response,
            Err(e) => e.to_response().unwrap_or_else(|| {
                warn!(identity = %identity, path = %request_path.key, error = %e, "failed to read target");
                Response::error(StatusCode::InternalServerError, "Could not read the requested resource")
            }),
        }
        .with_header("X-Hit-Count", &hits.to_string());

        Handled {
            response,
            head_only: request.method() == Method::HEAD,
            identity: Some(identity),
            path: Some(request_path.key),
            hits: Some(hits),
        }
    }

    /// IP remota, o el header de override si está configurado y presente
    fn identity(&self, request: &Request, peer: &str) -> String {
        self.identity_header
            .as_deref()
            .and_then(|name| request.header(name))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(peer)
            .to_string()
    }

    fn serve(&self, identity: &str, request_path: &RequestPath) -> Result<Response> {
        match files::resolve(&self.root_dir, request_path, &self.default_document)? {
            Target::File(path) => {
                let body = fs::read(&path)?;
                Ok(Response::new(StatusCode::Ok)
                    .with_content_type(mime::content_type_for(&path))
                    .with_body(body))
            }
            Target::Directory { dir, url_prefix } => {
                let hits = &self.state.hits;
                let html = listing::render(&dir, &url_prefix, |key| hits.count(identity, key))?;
                Ok(Response::html(html))
            }
        }
    }
}
