//! # Contador de Hits
//! src/state/hit_counter.rs
//!
//! Cuenta cuántas veces cada cliente pidió cada path. Hay dos estrategias
//! detrás del mismo trait, elegidas al arrancar:
//!
//! - [`UnsynchronizedHitCounter`]: lee, espera y escribe sin exclusión mutua.
//!   Cada acceso individual al mapa es atómico, pero el
//!   read-modify-write completo no lo es. Bajo carga concurrente sobre la
//!   misma clave se pierden incrementos (dos handlers leen 5, ambos
//!   escriben 6).
//! - [`SynchronizedHitCounter`]: la misma secuencia leer-esperar-escribir
//!   ocurre dentro del lock de la clave, así que los conteos observados
//!   para una clave son exactamente 1, 2, ..., N.
//!
//! ```text
//! clients (lock estructural)
//!   └── "10.0.0.1" → paths (lock estructural del cliente)
//!                      ├── "index.html" → Mutex<u64>
//!                      └── "logo.png"   → Mutex<u64>
//! ```

use super::pause;
use clap::ValueEnum;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Estrategia del contador
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HitCounterMode {
    /// Read-modify-write protegido por un lock por clave
    Synchronized,
    /// Read-modify-write sin coordinación (pierde updates bajo carga)
    Unsynchronized,
}

impl std::fmt::Display for HitCounterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HitCounterMode::Synchronized => write!(f, "synchronized"),
            HitCounterMode::Unsynchronized => write!(f, "unsynchronized"),
        }
    }
}

/// Una fila del contador
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitRecord {
    pub identity: String,
    pub path: String,
    pub count: u64,
}

/// Interfaz común de ambas estrategias
pub trait HitCounter: Send + Sync {
    /// Registra un hit para `(identity, path)` y retorna el conteo resultante
    fn record_and_get(&self, identity: &str, path: &str) -> u64;

    /// Conteo actual sin modificarlo (0 si la clave no existe)
    fn count(&self, identity: &str, path: &str) -> u64;

    /// Todas las filas, ordenadas por cliente y luego por path
    fn snapshot(&self) -> Vec<HitRecord>;

    fn mode(&self) -> HitCounterMode;
}

/// Construye la estrategia elegida en la configuración
pub fn build(mode: HitCounterMode, race_delay: Duration) -> Arc<dyn HitCounter> {
    match mode {
        HitCounterMode::Synchronized => Arc::new(SynchronizedHitCounter::new(race_delay)),
        HitCounterMode::Unsynchronized => Arc::new(UnsynchronizedHitCounter::new(race_delay)),
    }
}

fn sorted(mut records: Vec<HitRecord>) -> Vec<HitRecord> {
    records.sort_by(|a, b| a.identity.cmp(&b.identity).then_with(|| a.path.cmp(&b.path)));
    records
}

// ==================== Sin sincronización ====================

/// Contador sin exclusión mutua entre la lectura y la escritura
pub struct UnsynchronizedHitCounter {
    table: Mutex<HashMap<String, HashMap<String, u64>>>,
    race_delay: Duration,
}

impl UnsynchronizedHitCounter {
    pub fn new(race_delay: Duration) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            race_delay,
        }
    }
}

impl HitCounter for UnsynchronizedHitCounter {
    fn record_and_get(&self, identity: &str, path: &str) -> u64 {
        // El lock del mapa se suelta entre la lectura y la escritura
        let current = self.count(identity, path);

        pause(self.race_delay);

        let next = current + 1;
        self.table
            .lock()
            .entry(identity.to_string())
            .or_default()
            .insert(path.to_string(), next);
        next
    }

    fn count(&self, identity: &str, path: &str) -> u64 {
        self.table
            .lock()
            .get(identity)
            .and_then(|paths| paths.get(path))
            .copied()
            .unwrap_or(0)
    }

    fn snapshot(&self) -> Vec<HitRecord> {
        let table = self.table.lock();
        let records = table
            .iter()
            .flat_map(|(identity, paths)| {
                paths.iter().map(move |(path, count)| HitRecord {
                    identity: identity.clone(),
                    path: path.clone(),
                    count: *count,
                })
            })
            .collect();
        sorted(records)
    }

    fn mode(&self) -> HitCounterMode {
        HitCounterMode::Unsynchronized
    }
}

// ==================== Sincronizado ====================

/// Mapa de paths de un cliente. Su lock solo protege la creación de celdas.
#[derive(Default)]
struct ClientHits {
    paths: Mutex<HashMap<String, Arc<Mutex<u64>>>>,
}

/// Contador con un lock por clave `(identity, path)`
pub struct SynchronizedHitCounter {
    /// Lock estructural: protege la creación perezosa de mapas por cliente
    clients: Mutex<HashMap<String, Arc<ClientHits>>>,
    race_delay: Duration,
}

impl SynchronizedHitCounter {
    pub fn new(race_delay: Duration) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            race_delay,
        }
    }

    /// Obtiene (o crea) la celda de la clave.
    ///
    /// Los locks estructurales se sueltan antes de retornar, así que el
    /// lock de la celda nunca se toma mientras se sostiene otro.
    fn cell(&self, identity: &str, path: &str) -> Arc<Mutex<u64>> {
        let client = Arc::clone(
            self.clients
                .lock()
                .entry(identity.to_string())
                .or_default(),
        );

        let mut paths = client.paths.lock();
        let cell = Arc::clone(paths.entry(path.to_string()).or_default());
        cell
    }

    fn existing_cell(&self, identity: &str, path: &str) -> Option<Arc<Mutex<u64>>> {
        let client = self.clients.lock().get(identity).cloned()?;
        let cell = client.paths.lock().get(path).cloned();
        cell
    }
}

impl HitCounter for SynchronizedHitCounter {
    fn record_and_get(&self, identity: &str, path: &str) -> u64 {
        let cell = self.cell(identity, path);

        let mut count = cell.lock();
        let current = *count;
        pause(self.race_delay);
        *count = current + 1;
        *count
    }

    fn count(&self, identity: &str, path: &str) -> u64 {
        match self.existing_cell(identity, path) {
            Some(cell) => {
                let count = *cell.lock();
                count
            }
            None => 0,
        }
    }

    fn snapshot(&self) -> Vec<HitRecord> {
        let clients: Vec<(String, Arc<ClientHits>)> = self
            .clients
            .lock()
            .iter()
            .map(|(identity, hits)| (identity.clone(), Arc::clone(hits)))
            .collect();

        let mut records = Vec::new();
        for (identity, hits) in clients {
            let cells: Vec<(String, Arc<Mutex<u64>>)> = hits
                .paths
                .lock()
                .iter()
                .map(|(path, cell)| (path.clone(), Arc::clone(cell)))
                .collect();

            for (path, cell) in cells {
                records.push(HitRecord {
                    identity: identity.clone(),
                    path,
                    count: *cell.lock(),
                });
            }
        }
        sorted(records)
    }

    fn mode(&self) -> HitCounterMode {
        HitCounterMode::Synchronized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    /// Lanza `workers` threads que llaman `record_and_get` a la vez
    fn hammer(counter: Arc<dyn HitCounter>, workers: usize) -> Vec<u64> {
        let barrier = Arc::new(Barrier::new(workers));
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let counter = Arc::clone(&counter);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    counter.record_and_get("10.0.0.1", "index.html")
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    #[test]
    fn test_sequential_counts_both_modes() {
        for mode in [HitCounterMode::Synchronized, HitCounterMode::Unsynchronized] {
            let counter = build(mode, Duration::ZERO);

            assert_eq!(counter.record_and_get("a", "x.html"), 1);
            assert_eq!(counter.record_and_get("a", "x.html"), 2);
            assert_eq!(counter.record_and_get("a", "y.html"), 1);
            assert_eq!(counter.record_and_get("b", "x.html"), 1);
            assert_eq!(counter.count("a", "x.html"), 2);
            assert_eq!(counter.count("c", "x.html"), 0);
            assert_eq!(counter.mode(), mode);
        }
    }

    #[test]
    fn test_count_does_not_create_keys() {
        let counter = SynchronizedHitCounter::new(Duration::ZERO);

        assert_eq!(counter.count("ghost", "nothing.html"), 0);
        assert!(counter.snapshot().is_empty());
    }

    #[test]
    fn test_synchronized_no_lost_updates() {
        let workers = 16;
        let counter = build(HitCounterMode::Synchronized, Duration::from_millis(2));

        let mut observed = hammer(Arc::clone(&counter), workers);
        observed.sort_unstable();

        let expected: Vec<u64> = (1..=workers as u64).collect();
        assert_eq!(observed, expected);
        assert_eq!(counter.count("10.0.0.1", "index.html"), workers as u64);
    }

    #[test]
    fn test_unsynchronized_loses_updates_with_delay() {
        let workers = 16;
        let mut lost = false;

        // Con la ventana ensanchada basta un intento; se repite por si acaso
        for _ in 0..5 {
            let counter = build(HitCounterMode::Unsynchronized, Duration::from_millis(50));
            hammer(Arc::clone(&counter), workers);
            if counter.count("10.0.0.1", "index.html") < workers as u64 {
                lost = true;
                break;
            }
        }

        assert!(lost, "expected at least one lost update");
    }

    #[test]
    fn test_snapshot_sorted() {
        let counter = UnsynchronizedHitCounter::new(Duration::ZERO);
        counter.record_and_get("b", "z.html");
        counter.record_and_get("a", "y.html");
        counter.record_and_get("a", "x.html");
        counter.record_and_get("a", "x.html");

        let snapshot = counter.snapshot();
        let keys: Vec<(&str, &str, u64)> = snapshot
            .iter()
            .map(|r| (r.identity.as_str(), r.path.as_str(), r.count))
            .collect();

        assert_eq!(
            keys,
            vec![("a", "x.html", 2), ("a", "y.html", 1), ("b", "z.html", 1)]
        );
    }

    #[test]
    fn test_synchronized_independent_keys_in_parallel() {
        let counter = Arc::new(SynchronizedHitCounter::new(Duration::ZERO));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    let identity = format!("client-{}", i);
                    for _ in 0..100 {
                        counter.record_and_get(&identity, "index.html");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        for i in 0..4 {
            assert_eq!(counter.count(&format!("client-{}", i), "index.html"), 100);
        }
    }
}
