//! Structured record emitted for every instrumentation attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gate::ModuleIdentity;

/// What happened to a module's instrumentation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum InstrumentationOutcome {
    /// Exports were mutated in place.
    Applied,
    /// The hook returned a wholesale replacement exports object.
    Replaced,
    /// The hook failed; the module runs uninstrumented.
    Failed,
}

/// Audit entry for one instrumentation attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentationRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub module_name: String,
    pub identity: ModuleIdentity,
    pub outcome: InstrumentationOutcome,
    pub duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstrumentationRecord {
    pub fn new(
        module_name: impl Into<String>,
        identity: ModuleIdentity,
        outcome: InstrumentationOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            module_name: module_name.into(),
            identity,
            outcome,
            duration_ms: 0,
            error: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u128) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
