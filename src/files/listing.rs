//! # Listado de Directorios
//! src/files/listing.rs
//!
//! Genera el HTML de un directorio: entradas ordenadas por nombre, sin
//! ocultas, con un link a `../` fuera de la raíz y el conteo de hits de
//! cada entrada para el cliente que pide el listado.

use crate::http::response::escape_html;
use std::fs;
use std::io;
use std::path::Path;

/// Una entrada visible del directorio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
}

/// Entradas no ocultas de `dir`, ordenadas por nombre
pub fn entries(dir: &Path) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        entries.push(Entry {
            name,
            is_dir: entry.file_type()?.is_dir(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// URL (sin `/` inicial) de una entrada dentro de `url_prefix`
fn entry_key(url_prefix: &str, name: &str) -> String {
    if url_prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", url_prefix, name)
    }
}

/// Renderiza el listado.
///
/// `hits` recibe la clave de cada entrada (ej: `"docs/b.png"`) y retorna
/// su conteo actual.
pub fn render<F>(dir: &Path, url_prefix: &str, hits: F) -> io::Result<String>
where
    F: Fn(&str) -> u64,
{
    let title = escape_html(&format!("Directory listing for /{}", url_prefix));
    let mut html = format!(
        "<html><head><title>{title}</title></head><body><h2>{title}</h2><ul>"
    );

    if !url_prefix.is_empty() {
        let parent = url_prefix.rsplit_once('/').map(|(p, _)| p).unwrap_or("");
        html.push_str(&format!(
            "<li><a href=\"/{}\">../</a></li>",
            escape_html(parent)
        ));
    }

    for entry in entries(dir)? {
        let key = entry_key(url_prefix, &entry.name);
        let display = if entry.is_dir {
            format!("{}/", entry.name)
        } else {
            entry.name.clone()
        };
        html.push_str(&format!(
            "<li><a href=\"/{}\">{}</a> (hits: {})</li>",
            escape_html(&key),
            escape_html(&display),
            hits(&key)
        ));
    }

    html.push_str("</ul></body></html>");
    Ok(html)
}
