use crate::utils::error::{FetchJobError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-identifier progress state. Transitions only move forward:
/// `Pending -> InFlight -> {Done, Failed}`, nothing leaves `Done`/`Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckpointEntry {
    Pending,
    InFlight,
    Done,
    Failed { reason: String },
}

impl CheckpointEntry {
    fn is_terminal(&self) -> bool {
        matches!(self, CheckpointEntry::Done | CheckpointEntry::Failed { .. })
    }
}

/// On-disk shape: human-inspectable pretty JSON, replaced atomically.
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    run_count: u64,
    batches_sealed: u32,
    updated_at: DateTime<Utc>,
    entries: HashMap<String, CheckpointEntry>,
}

/// Durable record of which identifiers are done, failed or still pending.
/// Owned by the orchestrator's single consumer loop; never shared.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    run_count: u64,
    batches_sealed: u32,
    entries: HashMap<String, CheckpointEntry>,
    /// Original input order of this job's identifier set.
    order: Vec<String>,
}

impl CheckpointStore {
    /// Merges the input identifier set with any previously persisted file.
    /// Unseen identifiers start `Pending`; persisted `InFlight` is downgraded
    /// to `Pending` (at-least-once: a duplicate fetch is acceptable, a
    /// duplicate persisted batch is not). A file that exists but cannot be
    /// parsed surfaces as `CorruptCheckpoint` so the caller decides whether
    /// to wipe it or abort.
    pub fn load(path: impl Into<PathBuf>, identifiers: &[String]) -> Result<Self> {
        let path = path.into();
        let mut persisted = if path.exists() {
            let data = fs::read_to_string(&path)?;
            serde_json::from_str::<CheckpointFile>(&data).map_err(|e| {
                FetchJobError::CorruptCheckpoint {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            })?
        } else {
            CheckpointFile {
                run_count: 0,
                batches_sealed: 0,
                updated_at: Utc::now(),
                entries: HashMap::new(),
            }
        };

        for entry in persisted.entries.values_mut() {
            if *entry == CheckpointEntry::InFlight {
                *entry = CheckpointEntry::Pending;
            }
        }

        let mut entries = persisted.entries;
        let mut order = Vec::with_capacity(identifiers.len());
        for id in identifiers {
            entries
                .entry(id.clone())
                .or_insert(CheckpointEntry::Pending);
            order.push(id.clone());
        }

        Ok(Self {
            path,
            run_count: persisted.run_count + 1,
            batches_sealed: persisted.batches_sealed,
            entries,
            order,
        })
    }

    pub fn run_count(&self) -> u64 {
        self.run_count
    }

    pub fn batches_sealed(&self) -> u32 {
        self.batches_sealed
    }

    pub fn set_batches_sealed(&mut self, seq: u32) {
        self.batches_sealed = self.batches_sealed.max(seq);
    }

    /// Identifiers not yet `Done`/`Failed`, in original input order.
    pub fn pending_ids(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| {
                self.entries
                    .get(id.as_str())
                    .is_some_and(|e| !e.is_terminal())
            })
            .cloned()
            .collect()
    }

    pub fn entry(&self, id: &str) -> Option<&CheckpointEntry> {
        self.entries.get(id)
    }

    /// In-memory only: `InFlight` is re-derivable and gets downgraded on the
    /// next load, so it is never worth a flush on its own.
    pub fn mark_in_flight(&mut self, id: &str) {
        if let Some(entry) = self.entries.get_mut(id) {
            if *entry == CheckpointEntry::Pending {
                *entry = CheckpointEntry::InFlight;
            }
        }
    }

    pub fn mark_done(&mut self, id: &str) {
        if let Some(entry) = self.entries.get_mut(id) {
            if !entry.is_terminal() {
                *entry = CheckpointEntry::Done;
            }
        }
    }

    pub fn mark_failed(&mut self, id: &str, reason: impl Into<String>) {
        if let Some(entry) = self.entries.get_mut(id) {
            if !entry.is_terminal() {
                *entry = CheckpointEntry::Failed {
                    reason: reason.into(),
                };
            }
        }
    }

    /// Write-then-rename so a crash mid-write never leaves a half-written
    /// file where `load` expects a valid snapshot.
    pub fn flush(&self) -> Result<()> {
        let file = CheckpointFile {
            run_count: self.run_count,
            batches_sealed: self.batches_sealed,
            updated_at: Utc::now(),
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = tmp_path(&self.path);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
