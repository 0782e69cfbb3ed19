use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::LienError;

/// Monotonically increasing millisecond stamp stored alongside the vector
/// data. Every successful mutation bumps it; query sessions cache the value
/// they opened against and reconnect when they observe a newer one.
///
/// File-backed stamps persist across restarts as a single-line decimal
/// millisecond timestamp. A stamp without a path (tests, ephemeral stores)
/// keeps the counter in memory.
pub struct VersionStamp {
    path: Option<PathBuf>,
    fallback: AtomicU64,
}

impl VersionStamp {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            fallback: AtomicU64::new(0),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            fallback: AtomicU64::new(0),
        }
    }

    /// Current stamp; 0 when never written.
    pub fn read(&self) -> Result<u64, LienError> {
        match &self.path {
            None => Ok(self.fallback.load(Ordering::SeqCst)),
            Some(path) => {
                if !path.exists() {
                    return Ok(0);
                }
                let raw = std::fs::read_to_string(path)?;
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| LienError::corruption(format!("bad version stamp in {}", path.display())))
            }
        }
    }

    /// Advances the stamp to `max(now_ms, current + 1)` and persists it
    /// atomically (temp file + rename). Returns the new value.
    pub fn bump(&self) -> Result<u64, LienError> {
        let current = self.read()?;
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let next = now.max(current + 1);

        match &self.path {
            None => {
                self.fallback.store(next, Ordering::SeqCst);
            }
            Some(path) => {
                write_atomic(path, next.to_string().as_bytes())?;
            }
        }
        Ok(next)
    }

    pub fn date(&self) -> Result<Option<DateTime<Utc>>, LienError> {
        let stamp = self.read()?;
        if stamp == 0 {
            return Ok(None);
        }
        Ok(Utc.timestamp_millis_opt(stamp as i64).single())
    }
}

/// Writes `bytes` to `path` atomically: temp file in the same directory,
/// then rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LienError> {
    let dir = path
        .parent()
        .ok_or_else(|| LienError::invalid_path(path.display().to_string()))?;
    std::fs::create_dir_all(dir)?;
    let tmp = dir.join(format!(
        ".{}.tmp",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("stamp")
    ));
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
