// src/store.rs
//
// File-per-key persistence primitive under `.store/` (or a caller
// supplied root). Cache and session layers sit on top of this.

use std::{fs, io, path::PathBuf};

use crate::config::consts::STORE_DIR;

#[derive(Clone, Debug)]
pub struct KvStore {
    root: PathBuf,
}

impl Default for KvStore {
    fn default() -> Self {
        Self::open(STORE_DIR)
    }
}

impl KvStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(sanitize_key(key))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    /// Atomic single-key write: temp file in the same directory, then
    /// rename over the target.
    pub fn put(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(key);
        // Not with_extension: keys may contain dots.
        let tmp = self.root.join(format!("{}.tmp", sanitize_key(key)));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> io::Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// Drop every entry whose key starts with `prefix`.
    pub fn clear_prefix(&self, prefix: &str) -> io::Result<()> {
        if !self.root.exists() {
            return Ok(());
        }
        let want = sanitize_key(prefix);
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
            if name.starts_with(&want) {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// Keys become filenames; keep them boring.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::sanitize_key;

    #[test]
    fn keys_are_flattened_to_safe_filenames() {
        assert_eq!(sanitize_key("session.host.example"), "session.host.example");
        assert_eq!(sanitize_key("a/b\\c:d"), "a_b_c_d");
    }
}
