// src/config/options.rs
use std::path::PathBuf;

use super::consts::STORE_DIR;

/// Knobs for building an [`crate::acquire::Acquirer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcquireOptions {
    /// Root directory of the key-value store (cache + sessions).
    pub store_root: PathBuf,
    /// Base URL of the optional local-network companion service.
    pub helper_url: Option<String>,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from(STORE_DIR),
            helper_url: None,
        }
    }
}
