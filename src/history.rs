//! Persisted history of accepted illust ids.
//!
//! Stored as an opaque JSON blob `{count, history}`; the id list is
//! capped at the most recent 100 000 entries.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Maximum ids kept in the blob.
const HISTORY_CAP: usize = 100_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    /// Number of runs that recorded into this blob.
    #[serde(default)]
    count: u64,
    #[serde(default)]
    history: Vec<u64>,
}

impl History {
    /// Load from `path`; a missing file is an empty history.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    pub fn contains(&self, id: u64) -> bool {
        self.history.contains(&id)
    }

    /// Membership set for the selection predicates.
    pub fn to_set(&self) -> HashSet<u64> {
        self.history.iter().copied().collect()
    }

    /// Record one run's accepted ids, keeping only the most recent
    /// [`HISTORY_CAP`] entries.
    pub fn record(&mut self, ids: &[u64]) {
        self.count += 1;
        self.history.extend_from_slice(ids);
        if self.history.len() > HISTORY_CAP {
            let drop = self.history.len() - HISTORY_CAP;
            self.history.drain(..drop);
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn runs(&self) -> u64 {
        self.count
    }
}
