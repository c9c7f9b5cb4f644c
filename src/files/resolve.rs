//! # Resolución de Paths
//! src/files/resolve.rs
//!
//! Convierte el path de la URL en:
//!
//! 1. la clave del contador (`RequestPath::key`): segmentos unidos con `/`,
//!    sin `/` inicial ni final, sin `.` ni `//`, y el documento por defecto
//!    cuando el path queda vacío
//! 2. un destino en disco dentro del directorio raíz
//!
//! Cualquier componente `..` o absoluto es 404: nunca se sale de la raíz.

use super::mime;
use crate::error::{Result, ServerError};
use std::path::{Component, Path, PathBuf};

/// Path normalizado de un request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    /// Segmentos unidos con `/`, sin `.` ni separadores repetidos (puede ser vacío).
    /// Los `..` se conservan para que `resolve` los rechace.
    pub relative: String,
    /// Clave para el contador de hits
    pub key: String,
}

impl RequestPath {
    /// Distintas escrituras del mismo recurso producen la misma clave.
    ///
    /// # Ejemplo
    /// ```
    /// use hitcount_server::files::RequestPath;
    ///
    /// let root = RequestPath::from_url("/", "index.html");
    /// assert_eq!(root.relative, "");
    /// assert_eq!(root.key, "index.html");
    ///
    /// let file = RequestPath::from_url("/img/./logo.png", "index.html");
    /// assert_eq!(file.key, "img/logo.png");
    /// ```
    pub fn from_url(url_path: &str, default_document: &str) -> Self {
        let segments: Vec<String> = Path::new(url_path)
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                Component::ParentDir => Some("..".to_string()),
                Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
            })
            .collect();

        let relative = segments.join("/");
        let key = if relative.is_empty() {
            default_document.to_string()
        } else {
            relative.clone()
        };
        Self { relative, key }
    }
}

/// Destino de un request en disco
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Archivo con extensión permitida
    File(PathBuf),
    /// Directorio a listar, con su prefijo de URL sin barras en los extremos
    Directory { dir: PathBuf, url_prefix: String },
}

/// Resuelve el request dentro de `root`
pub fn resolve(root: &Path, request: &RequestPath, default_document: &str) -> Result<Target> {
    let not_found = || ServerError::NotFound(request.key.clone());

    if request.relative.is_empty() {
        let index = root.join(default_document);
        if index.is_file() {
            return Ok(Target::File(index));
        }
        return Ok(Target::Directory {
            dir: root.to_path_buf(),
            url_prefix: String::new(),
        });
    }

    let mut target = root.to_path_buf();
    for segment in request.relative.split('/') {
        if segment == ".." {
            return Err(not_found());
        }
        target.push(segment);
    }

    if target.is_dir() {
        return Ok(Target::Directory {
            dir: target,
            url_prefix: request.relative.clone(),
        });
    }

    if target.is_file() && mime::is_allowed(&target) {
        return Ok(Target::File(target));
    }

    Err(not_found())
}
