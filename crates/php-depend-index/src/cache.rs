//! Parse cache.
//!
//! Units are stored under the SHA-256 of the parser options and the file
//! contents, so an unchanged file parsed with the same options is never
//! parsed twice.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use php_depend_parser::{ParserOptions, SourceUnit};
use sha2::{Digest, Sha256};
use tracing::warn;

pub trait Cache {
    /// A previously stored unit with its parent links restored, or `None`
    /// on a miss.
    fn restore(&self, id: &str) -> Option<SourceUnit>;

    fn store(&mut self, id: &str, unit: &SourceUnit) -> io::Result<()>;
}

/// Cache id for a file's contents parsed with `options`.
pub fn content_hash(options: &ParserOptions, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update([u8::from(options.ignore_annotations)]);
    hasher.update(source.as_bytes());
    let hash = hasher.finalize();
    format!("{hash:x}")
}

/// Keeps units for the lifetime of one run.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, SourceUnit>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Cache for MemoryCache {
    fn restore(&self, id: &str) -> Option<SourceUnit> {
        self.entries.get(id).cloned()
    }

    fn store(&mut self, id: &str, unit: &SourceUnit) -> io::Result<()> {
        self.entries.insert(id.to_string(), unit.clone());
        Ok(())
    }
}

/// One JSON document per unit in a directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileCache { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl Cache for FileCache {
    fn restore(&self, id: &str) -> Option<SourceUnit> {
        let path = self.entry_path(id);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<SourceUnit>(&content) {
            Ok(mut unit) => {
                unit.relink();
                Some(unit)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    fn store(&mut self, id: &str, unit: &SourceUnit) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string(unit).map_err(io::Error::other)?;
        fs::write(self.entry_path(id), json)
    }
}
