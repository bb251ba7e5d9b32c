use crate::domain::entities::job::Job;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

const CACHE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache contents are invalid: {0}")]
    Format(#[from] serde_json::Error),
    #[error("unsupported cache version {0}")]
    Version(u32),
}

/// Offline backup of the manager's job map. Reads are synchronous so the
/// manager has data before its first network round trip.
pub trait LocalCache: Send + Sync {
    fn load(&self) -> Result<Vec<Job>, CacheError>;
    fn save(&self, jobs: &[Job]) -> Result<(), CacheError>;
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    jobs: Vec<Job>,
}

/// JSON file cache. Writes go to a sibling temp file and are renamed into place.
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalCache for FileCache {
    fn load(&self) -> Result<Vec<Job>, CacheError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let file: CacheFile = serde_json::from_slice(&raw)?;
        if file.version != CACHE_VERSION {
            return Err(CacheError::Version(file.version));
        }
        Ok(file.jobs)
    }

    fn save(&self, jobs: &[Job]) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec(&CacheFile {
            version: CACHE_VERSION,
            jobs: jobs.to_vec(),
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    jobs: Mutex<Vec<Job>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(jobs: Vec<Job>) -> Self {
        Self {
            jobs: Mutex::new(jobs),
        }
    }
}

impl LocalCache for MemoryCache {
    fn load(&self) -> Result<Vec<Job>, CacheError> {
        Ok(self.jobs.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }

    fn save(&self, jobs: &[Job]) -> Result<(), CacheError> {
        *self.jobs.lock().unwrap_or_else(|p| p.into_inner()) = jobs.to_vec();
        Ok(())
    }
}
