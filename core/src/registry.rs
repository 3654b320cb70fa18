//! Aggregates instrumentation definitions keyed by logical module name.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::definition::InstrumentationDefinition;
use crate::skipped::{SkipReason, SkippedDefinition};

/// A successful lookup: the registered key that matched plus its definitions.
#[derive(Debug, Clone)]
pub struct NameMatch {
    pub name: String,
    pub definitions: Vec<InstrumentationDefinition>,
}

/// Serializable registry view for diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_registered: Option<DateTime<Utc>>,
}

/// One registry key and how many definitions hang off it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSummary {
    pub name: String,
    pub definitions: usize,
    /// Keys added by resolve-phase aliasing rather than explicit
    /// registration.
    #[serde(default)]
    pub aliased: bool,
}

/// Primary runtime view of registered instrumentations.
#[derive(Debug, Default)]
pub struct InstrumentationRegistry {
    entries: HashMap<String, Vec<InstrumentationDefinition>>,
    aliased: HashSet<String>,
    disabled: HashSet<String>,
    skipped: Vec<SkippedDefinition>,
    last_registered: Option<DateTime<Utc>>,
}

impl InstrumentationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Module names instrumentation must never be registered for.
    pub fn set_disabled<I, N>(&mut self, names: I)
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.disabled = names.into_iter().map(Into::into).collect();
    }

    /// Add a definition under its module name.
    ///
    /// Malformed definitions are dropped with a log and a skip record; a
    /// name may accumulate several definitions.
    pub fn register(&mut self, definition: InstrumentationDefinition) {
        if definition.module_name.trim().is_empty() {
            warn!("dropping instrumentation definition without a module name");
            self.skipped.push(
                SkippedDefinition::new(SkipReason::MissingModuleName)
                    .with_details("module name must not be empty"),
            );
            return;
        }
        if !definition.has_hooks() {
            warn!(
                module = definition.module_name.as_str(),
                "dropping instrumentation definition without hooks"
            );
            self.skipped.push(
                SkippedDefinition::new(SkipReason::MissingHooks)
                    .with_module_name(definition.module_name.clone()),
            );
            return;
        }
        if self.disabled.contains(&definition.module_name) {
            info!(
                module = definition.module_name.as_str(),
                "instrumentation disabled by configuration"
            );
            self.skipped.push(
                SkippedDefinition::new(SkipReason::Disabled)
                    .with_module_name(definition.module_name.clone()),
            );
            return;
        }

        self.entries
            .entry(definition.module_name.clone())
            .or_default()
            .push(definition);
        self.last_registered = Some(Utc::now());
    }

    /// Exact lookup by registered key.
    pub fn lookup(&self, name: &str) -> Option<&[InstrumentationDefinition]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Deep lookup: match a specifier against registered names by
    /// path-boundary prefix, preferring the most specific key.
    ///
    /// A registered `pkg` matches `pkg/lib/inner`; graph-module definitions
    /// only ever match their exact root specifier.
    pub fn lookup_deep(&self, specifier: &str) -> Option<NameMatch> {
        let mut best: Option<&str> = None;
        for name in self.entries.keys() {
            if !specifier_matches(name, specifier) {
                continue;
            }
            if best.is_none_or(|current| name.len() > current.len()) {
                best = Some(name);
            }
        }
        let name = best?;
        let definitions: Vec<InstrumentationDefinition> = self.entries[name]
            .iter()
            .filter(|definition| !definition.is_graph_module || name == specifier)
            .cloned()
            .collect();
        if definitions.is_empty() {
            return None;
        }
        Some(NameMatch {
            name: name.to_string(),
            definitions,
        })
    }

    /// Register cloned definitions under a concrete resolved location.
    ///
    /// Used by the resolve phase when an immutable-capable loader reports a
    /// mutable unit: the mutable-load path owns it from then on, keyed by the
    /// resolved path. Definitions to insert are collected by the caller
    /// before this is invoked, so no list is mutated while iterated.
    pub fn alias(&mut self, resolved: &str, definitions: Vec<InstrumentationDefinition>) {
        if self.entries.contains_key(resolved) {
            debug!(resolved, "alias already present");
            self.skipped.push(
                SkippedDefinition::new(SkipReason::DuplicateAlias).with_module_name(resolved),
            );
            return;
        }
        self.aliased.insert(resolved.to_string());
        self.entries.insert(resolved.to_string(), definitions);
    }

    pub fn is_aliased(&self, name: &str) -> bool {
        self.aliased.contains(name)
    }

    /// Registered keys, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn skipped(&self) -> &[SkippedDefinition] {
        &self.skipped
    }

    pub fn last_registered(&self) -> Option<DateTime<Utc>> {
        self.last_registered
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut modules: Vec<ModuleSummary> = self
            .entries
            .iter()
            .map(|(name, definitions)| ModuleSummary {
                name: name.clone(),
                definitions: definitions.len(),
                aliased: self.aliased.contains(name),
            })
            .collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        RegistrySnapshot {
            modules,
            skipped: self.skipped.clone(),
            last_registered: self.last_registered,
        }
    }

    /// Drop every entry and skip record; the disabled set survives because it
    /// comes from configuration, not registration.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.aliased.clear();
        self.skipped.clear();
        self.last_registered = None;
    }
}

/// `specifier` matches `name` exactly or nested below it at a path boundary.
fn specifier_matches(name: &str, specifier: &str) -> bool {
    specifier == name
        || specifier
            .strip_prefix(name)
            .is_some_and(|rest| rest.starts_with('/'))
}
