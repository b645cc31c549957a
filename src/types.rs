use serde::Deserialize;

/// Default concurrency ceiling.
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// Where task records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// One JSON file per task under `[store].path`.
    File,
    /// In memory only (lost on restart).
    Memory,
}

impl Default for StoreMode {
    fn default() -> Self {
        StoreMode::File
    }
}
