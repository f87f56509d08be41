// SPDX-License-Identifier: Apache-2.0

use murmur_core::{Error, MediaStore, Result};
use std::path::{Component, Path, PathBuf};

/// Filesystem-backed media storage under the configured media root.
/// Uploads land in `posts/`; names are sanitized and deduplicated.
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn sanitize_stem(filename: &str) -> String {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("upload");
        let cleaned: String = stem
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
            .collect();
        if cleaned.is_empty() {
            "upload".to_string()
        } else {
            cleaned
        }
    }

    fn safe_relative(relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        let mut out = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => out.push(part),
                // Anything that could climb out of the root is rejected.
                _ => return None,
            }
        }
        Some(out)
    }
}

impl MediaStore for FsMediaStore {
    fn store(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("bin");
        let stem = Self::sanitize_stem(filename);
        let dir = self.root.join("posts");
        std::fs::create_dir_all(&dir).map_err(|e| Error::media("create media dir", e))?;

        let mut candidate = format!("{stem}.{extension}");
        let mut counter = 1;
        while dir.join(&candidate).exists() {
            candidate = format!("{stem}-{counter}.{extension}");
            counter += 1;
        }
        let target = dir.join(&candidate);
        std::fs::write(&target, bytes).map_err(|e| Error::media("write upload", e))?;
        Ok(format!("posts/{candidate}"))
    }

    fn load(&self, relative_path: &str) -> Result<Vec<u8>> {
        let safe = Self::safe_relative(relative_path)
            .ok_or_else(|| Error::not_found("media", relative_path))?;
        let full = self.root.join(safe);
        match std::fs::read(&full) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found("media", relative_path))
            }
            Err(e) => Err(Error::media("read media", e)),
        }
    }
}
