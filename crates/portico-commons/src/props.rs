//! Connection properties with the dirty bit.
//!
//! The server tracks client-requested property overrides locally and only
//! flushes them to the engine connection on the next data-plane operation.
//! The same struct is the wire shape for `connectionSync`, so the dirty
//! flag doubles as the client-side mirror used to skip no-op syncs.

use serde::{Deserialize, Serialize};

/// Recognized connection property overrides. `None` means "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProps {
    /// True while local overrides have not been pushed to the engine.
    #[serde(default)]
    pub dirty: bool,
    pub auto_commit: Option<bool>,
    pub read_only: Option<bool>,
    pub transaction_isolation: Option<i32>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
}

impl ConnectionProps {
    /// Applies every set field from `other`, marking this view dirty when
    /// anything actually changed.
    pub fn merge(&mut self, other: &ConnectionProps) {
        if let Some(v) = other.auto_commit {
            if self.auto_commit != Some(v) {
                self.auto_commit = Some(v);
                self.dirty = true;
            }
        }
        if let Some(v) = other.read_only {
            if self.read_only != Some(v) {
                self.read_only = Some(v);
                self.dirty = true;
            }
        }
        if let Some(v) = other.transaction_isolation {
            if self.transaction_isolation != Some(v) {
                self.transaction_isolation = Some(v);
                self.dirty = true;
            }
        }
        if let Some(v) = &other.catalog {
            if self.catalog.as_ref() != Some(v) {
                self.catalog = Some(v.clone());
                self.dirty = true;
            }
        }
        if let Some(v) = &other.schema {
            if self.schema.as_ref() != Some(v) {
                self.schema = Some(v.clone());
                self.dirty = true;
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Auto-commit as the engine should see it; on by default.
    pub fn auto_commit_or_default(&self) -> bool {
        self.auto_commit.unwrap_or(true)
    }
}
