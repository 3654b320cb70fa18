//! Resolve/load hook payloads and the continuation error type.

use modtap_common::ModuleKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Context delivered to a `resolve` hook alongside the specifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolveContext {
    /// URL of the module whose import triggered this resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_url: Option<String>,
    /// Resolution conditions the host honors, in priority order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
    /// Set on resolutions the engine performs for its own purposes. Hooks
    /// seeing this marker delegate straight to the continuation, which keeps
    /// the engine's internal loads from re-entering the hook chain.
    #[serde(default)]
    pub from_engine: bool,
}

impl ResolveContext {
    pub fn with_parent(parent_url: impl Into<String>) -> Self {
        Self {
            parent_url: Some(parent_url.into()),
            ..Self::default()
        }
    }

    /// A context carrying the engine re-entry marker.
    pub fn engine_internal() -> Self {
        Self {
            from_engine: true,
            ..Self::default()
        }
    }
}

/// Result of a `resolve` hook: the canonical location and module kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub url: Url,
    pub kind: ModuleKind,
    /// When set, later hooks in the chain must not reprocess this result.
    #[serde(default)]
    pub short_circuit: bool,
}

impl Resolution {
    pub fn new(url: Url, kind: ModuleKind) -> Self {
        Self {
            url,
            kind,
            short_circuit: false,
        }
    }

    pub fn short_circuited(mut self) -> Self {
        self.short_circuit = true;
        self
    }
}

/// Context delivered to a `load` hook alongside the URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoadContext {
    /// Kind hint carried over from resolution, when the host knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ModuleKind>,
    /// Engine re-entry marker; see [`ResolveContext::from_engine`].
    #[serde(default)]
    pub from_engine: bool,
}

impl LoadContext {
    pub fn of_kind(kind: ModuleKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn engine_internal() -> Self {
        Self {
            from_engine: true,
            ..Self::default()
        }
    }
}

/// Result of a `load` hook: the module kind and its source text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoadOutcome {
    pub kind: ModuleKind,
    pub source: String,
    /// When set, the result is final: no further hooks process it.
    #[serde(default)]
    pub short_circuit: bool,
}

impl LoadOutcome {
    pub fn new(kind: ModuleKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            short_circuit: false,
        }
    }

    pub fn short_circuited(mut self) -> Self {
        self.short_circuit = true;
        self
    }
}

/// Failures surfaced by host continuations and loaders.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoaderError {
    #[error("module not found: {specifier}")]
    NotFound { specifier: String },
    #[error("invalid specifier `{specifier}`: {reason}")]
    InvalidSpecifier { specifier: String, reason: String },
    #[error("host failure: {0}")]
    Host(String),
    #[error("i/o failure: {0}")]
    Io(String),
}

impl LoaderError {
    pub fn not_found(specifier: impl Into<String>) -> Self {
        LoaderError::NotFound {
            specifier: specifier.into(),
        }
    }
}

impl From<std::io::Error> for LoaderError {
    fn from(err: std::io::Error) -> Self {
        LoaderError::Io(err.to_string())
    }
}
