//! Records reasons for dropping instrumentation definitions at registration.

use serde::{Deserialize, Serialize};

/// Reason a definition was not added to the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    MissingModuleName,
    MissingHooks,
    Disabled,
    DuplicateAlias,
}

/// Record describing a dropped registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    pub reason: SkipReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl SkippedDefinition {
    pub fn new(reason: SkipReason) -> Self {
        Self {
            module_name: None,
            reason,
            details: None,
        }
    }

    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = Some(name.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
