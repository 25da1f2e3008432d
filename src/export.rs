//! Handing finished composites to the outside world.

use std::path::{Path, PathBuf};

use crate::compositor::CompositeResult;
use crate::error::Result;

/// File name offered when the composite is downloaded.
pub fn download_filename(result: &CompositeResult) -> String {
    let style: String = result
        .style_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    format!("eye-swapped-{}.{}", style, result.format.extension())
}

/// Write the encoded composite to `path`.
pub fn save<P: AsRef<Path>>(result: &CompositeResult, path: P) -> Result<()> {
    std::fs::write(path, &result.data)?;
    Ok(())
}

/// Persistence collaborator: stores bytes and returns where they ended up.
pub trait ImageStore: Send + Sync {
    fn store(&self, name: &str, bytes: &[u8]) -> Result<String>;
}

/// Stores images as files in one directory and returns `file://` URLs.
///
/// Existing files are never overwritten; a numeric suffix is added instead.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn free_path(&self, name: &str) -> PathBuf {
        let candidate = self.root.join(name);
        if !candidate.exists() {
            return candidate;
        }

        let path = Path::new(name);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
        let ext = path.extension().and_then(|s| s.to_str());
        (1u32..)
            .map(|n| match ext {
                Some(ext) => self.root.join(format!("{}-{}.{}", stem, n, ext)),
                None => self.root.join(format!("{}-{}", stem, n)),
            })
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}

impl ImageStore for DirectoryStore {
    fn store(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let file_name = Path::new(name)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        let path = self.free_path(file_name);
        std::fs::write(&path, bytes)?;
        let absolute = std::fs::canonicalize(&path)?;
        log::info!("stored {} bytes at {}", bytes.len(), absolute.display());
        Ok(format!("file://{}", absolute.display()))
    }
}
