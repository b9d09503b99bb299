use crate::error::AppError;
use crate::models::classify_types::PredictionResult;
use crate::models::history_types::HistoryEntry;
use crate::services::db::Database;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Storage key holding the JSON array of history entries.
pub const HISTORY_KEY: &str = "tumorClassifierHistory";
pub const MAX_HISTORY: usize = 10;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Single-key durable storage behind the history store.
pub trait HistoryBackend: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, AppError>;
    fn save(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// Process-local backend. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HistoryBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.values().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.values().remove(key);
        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteBackend {
    db: Database,
}

impl SqliteBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl HistoryBackend for SqliteBackend {
    fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.db.get_value(key)?)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), AppError> {
        Ok(self.db.set_value(key, value)?)
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        Ok(self.db.delete_value(key)?)
    }
}

/// Bounded, newest-first log of past classifications.
///
/// Every mutation writes through to the backend before the in-memory list
/// changes, so a failed write leaves both views as they were.
pub struct HistoryStore {
    backend: Box<dyn HistoryBackend>,
    entries: Vec<HistoryEntry>,
    last_id: u64,
}

impl HistoryStore {
    /// Rebuilds the list from the backend. Absent or unreadable data gives an empty list.
    pub fn load_on_init(backend: Box<dyn HistoryBackend>) -> Self {
        let entries = match backend.load(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
                Ok(mut entries) => {
                    entries.truncate(MAX_HISTORY);
                    entries
                }
                Err(e) => {
                    log::warn!("Discarding malformed history data: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Failed to read history, starting empty: {}", e);
                Vec::new()
            }
        };

        let last_id = entries
            .iter()
            .filter_map(|e| e.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        log::debug!("Loaded {} history entries", entries.len());

        Self {
            backend,
            entries,
            last_id,
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn append(&mut self, entry: HistoryEntry) -> Result<(), AppError> {
        let mut updated = Vec::with_capacity(MAX_HISTORY);
        updated.push(entry);
        updated.extend(self.entries.iter().take(MAX_HISTORY - 1).cloned());

        let json = serde_json::to_string(&updated)?;
        self.backend.save(HISTORY_KEY, &json)?;
        self.entries = updated;
        Ok(())
    }

    /// Builds an entry for a fresh result (id + local timestamp) and appends it.
    pub fn record(&mut self, filename: &str, result: &PredictionResult) -> Result<HistoryEntry, AppError> {
        let entry = HistoryEntry {
            id: self.next_id().to_string(),
            filename: filename.to_string(),
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            prediction: result.prediction,
            confidence: result.confidence,
        };
        self.append(entry.clone())?;
        Ok(entry)
    }

    pub fn clear(&mut self) -> Result<(), AppError> {
        self.backend.remove(HISTORY_KEY)?;
        self.entries.clear();
        Ok(())
    }

    /// Millisecond clock, bumped past the previous id when the clock has not moved.
    fn next_id(&mut self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        self.last_id = now.max(self.last_id.saturating_add(1));
        self.last_id
    }
}
