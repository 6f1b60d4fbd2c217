use brag_core::generator::StatementGenerator;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub generator: StatementGenerator,
    /// Held across every write to `.brag/` so concurrent requests cannot
    /// interleave read-modify-write cycles on the same document.
    pub write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(root: PathBuf, generator: StatementGenerator) -> Self {
        Self {
            root,
            generator,
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}
