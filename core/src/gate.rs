//! Per-identity gating: each module identity is instrumented at most once.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The de-duplication key: resolved location plus detected version.
///
/// The same concrete path may be reached via multiple distinct specifiers;
/// keying on the resolved location is what collapses them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ModuleIdentity {
    pub resolved: String,
    pub version: String,
}

impl ModuleIdentity {
    pub const UNVERSIONED: &'static str = "unversioned";

    pub fn new(resolved: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            resolved: resolved.into(),
            version: version.unwrap_or(Self::UNVERSIONED).to_string(),
        }
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.resolved, self.version)
    }
}

/// Lifecycle of one identity's instrumentation attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GateState {
    /// Instrumentation is running further up the call stack; re-entrant
    /// loads of the same identity must not re-trigger it.
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
struct GateEntry {
    state: GateState,
    recorded_at: DateTime<Utc>,
}

/// Mapping from identity to instrumentation outcome, process lifetime.
#[derive(Debug, Default)]
pub struct VersionGate {
    entries: HashMap<ModuleIdentity, GateEntry>,
}

impl VersionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an identity for instrumentation. Returns `false` when the
    /// identity was already claimed (pending or terminal).
    pub fn begin(&mut self, identity: ModuleIdentity) -> bool {
        if self.entries.contains_key(&identity) {
            return false;
        }
        self.entries.insert(
            identity,
            GateEntry {
                state: GateState::Pending,
                recorded_at: Utc::now(),
            },
        );
        true
    }

    /// Record the terminal outcome for a previously claimed identity.
    pub fn finish(&mut self, identity: &ModuleIdentity, success: bool) {
        let state = if success {
            GateState::Succeeded
        } else {
            GateState::Failed
        };
        self.entries.insert(
            identity.clone(),
            GateEntry {
                state,
                recorded_at: Utc::now(),
            },
        );
    }

    pub fn state(&self, identity: &ModuleIdentity) -> Option<GateState> {
        self.entries.get(identity).map(|entry| entry.state)
    }

    pub fn recorded_at(&self, identity: &ModuleIdentity) -> Option<DateTime<Utc>> {
        self.entries.get(identity).map(|entry| entry.recorded_at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
