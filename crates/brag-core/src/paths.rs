use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const BRAG_DIR: &str = ".brag";

pub const CONFIG_FILE: &str = ".brag/config.yaml";
pub const TASKS_FILE: &str = ".brag/tasks.yaml";
pub const GENERATED_FILE: &str = ".brag/generated.yaml";
pub const LEDGER_FILE: &str = ".brag/brag-list.md";
pub const PROMPTS_FILE: &str = ".brag/prompts.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn brag_dir(root: &Path) -> PathBuf {
    root.join(BRAG_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn tasks_path(root: &Path) -> PathBuf {
    root.join(TASKS_FILE)
}

pub fn generated_path(root: &Path) -> PathBuf {
    root.join(GENERATED_FILE)
}

pub fn ledger_path(root: &Path) -> PathBuf {
    root.join(LEDGER_FILE)
}

pub fn prompts_path(root: &Path) -> PathBuf {
    root.join(PROMPTS_FILE)
}
