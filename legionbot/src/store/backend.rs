//! Persistence backends for channel records.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use legionbot_core::error::StoreError;
use legionbot_core::model::ChannelState;

/// Durable home of channel records.
///
/// Calls happen while the channel's transaction lock is held, so writes
/// for one channel are totally ordered.
pub trait StateBackend: Send + Sync {
    /// Loads a record, `Ok(None)` when the channel has never been saved.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the record exists but cannot be read.
    fn load(&self, channel: &str) -> Result<Option<ChannelState>, StoreError>;

    /// Persists a record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the record cannot be written.
    fn save(&self, state: &ChannelState) -> Result<(), StoreError>;

    /// Names of every persisted channel.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` when the listing fails.
    fn channel_names(&self) -> Result<Vec<String>, StoreError>;
}

/// Process-local backend; records vanish on exit.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: DashMap<String, ChannelState>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self, channel: &str) -> Result<Option<ChannelState>, StoreError> {
        Ok(self.records.get(channel).map(|r| r.value().clone()))
    }

    fn save(&self, state: &ChannelState) -> Result<(), StoreError> {
        self.records.insert(state.channel.clone(), state.clone());
        Ok(())
    }

    fn channel_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.records.iter().map(|r| r.key().clone()).collect())
    }
}

/// One pretty-printed JSON file per channel under a directory.
#[derive(Debug, Clone)]
pub struct JsonDirBackend {
    dir: PathBuf,
}

impl JsonDirBackend {
    /// Opens `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` when the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, channel: &str) -> Result<PathBuf, StoreError> {
        let valid = !channel.is_empty()
            && channel
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::Io {
                path: self.dir.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("invalid channel name '{channel}'"),
                ),
            });
        }
        Ok(self.dir.join(format!("{channel}.json")))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl StateBackend for JsonDirBackend {
    fn load(&self, channel: &str) -> Result<Option<ChannelState>, StoreError> {
        let path = self.path_for(channel)?;
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path)(e)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                channel: channel.to_string(),
                message: e.to_string(),
            })
    }

    fn save(&self, state: &ChannelState) -> Result<(), StoreError> {
        let path = self.path_for(&state.channel)?;
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(state)?;
        std::fs::write(&tmp, body).map_err(io_error(&tmp))?;
        std::fs::rename(&tmp, &path).map_err(io_error(&path))
    }

    fn channel_names(&self) -> Result<Vec<String>, StoreError> {
        let entries = std::fs::read_dir(&self.dir).map_err(io_error(&self.dir))?;
        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(io_error(&self.dir))?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
