//! The engine context: process-wide interception state with an explicit
//! init/teardown lifecycle.
//!
//! One `Engine` is created before any application code loads and injected
//! into the interception hooks; tests tear it down with [`Engine::reset`].
//! All shared state lives here rather than in hidden singletons.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use modtap_common::{ExportsHandle, Namespace};
use tracing::{debug, info};
use url::Url;

use crate::audit::{AuditWriter, AuditWriterError};
use crate::config::EngineConfig;
use crate::containment::{guarded_on_require, HookVerdict};
use crate::definition::InstrumentationDefinition;
use crate::gate::{ModuleIdentity, VersionGate};
use crate::host::LoadedModule;
use crate::loader::{rewrite, PendingRewriteRecord};
use crate::metrics::{loaded_metric, Metrics, NullMetrics};
use crate::proxy::ProxyNamespace;
use crate::record::{InstrumentationOutcome, InstrumentationRecord};
use crate::registry::{InstrumentationRegistry, NameMatch, RegistrySnapshot};
use crate::shim::Shim;
use crate::skipped::SkippedDefinition;
use crate::wrap::{self, WrapLedger};

/// Version detector injected by the host: resolved path to package version.
pub type VersionDetector = Arc<dyn Fn(&Path) -> Option<String> + Send + Sync>;

/// Process-wide interception context.
pub struct Engine {
    registry: Mutex<InstrumentationRegistry>,
    gate: Mutex<VersionGate>,
    pending: Mutex<HashMap<Url, PendingRewriteRecord>>,
    ledger: Arc<WrapLedger>,
    metrics: Arc<dyn Metrics>,
    records: Mutex<Vec<InstrumentationRecord>>,
    audit: Option<AuditWriter>,
    version_detector: Option<VersionDetector>,
    capture_bindings_limit: Option<usize>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(InstrumentationRegistry::new()),
            gate: Mutex::new(VersionGate::new()),
            pending: Mutex::new(HashMap::new()),
            ledger: Arc::new(WrapLedger::new()),
            metrics: Arc::new(NullMetrics),
            records: Mutex::new(Vec::new()),
            audit: None,
            version_detector: None,
            capture_bindings_limit: None,
        }
    }

    /// Build an engine from merged configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        let mut engine = Self::new();
        lock(&engine.registry).set_disabled(config.disabled_instrumentations.clone());
        engine.audit = config.audit_log_path.clone().map(AuditWriter::new);
        engine.capture_bindings_limit = config.capture_bindings_limit;
        engine
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_audit_writer(mut self, writer: AuditWriter) -> Self {
        self.audit = Some(writer);
        self
    }

    pub fn with_version_detector<F>(mut self, detector: F) -> Self
    where
        F: Fn(&Path) -> Option<String> + Send + Sync + 'static,
    {
        self.version_detector = Some(Arc::new(detector));
        self
    }

    // ---- registration ----------------------------------------------------

    /// Register an instrumentation definition; see
    /// [`InstrumentationRegistry::register`] for the drop rules.
    pub fn register(&self, definition: InstrumentationDefinition) {
        lock(&self.registry).register(definition);
    }

    pub fn registered_names(&self) -> Vec<String> {
        lock(&self.registry).names()
    }

    pub fn skipped_definitions(&self) -> Vec<SkippedDefinition> {
        lock(&self.registry).skipped().to_vec()
    }

    pub fn registry_snapshot(&self) -> RegistrySnapshot {
        lock(&self.registry).snapshot()
    }

    /// Exact-then-deep lookup for one specifier.
    pub fn match_specifier(&self, specifier: &str) -> Option<NameMatch> {
        let registry = lock(&self.registry);
        if let Some(definitions) = registry.lookup(specifier) {
            return Some(NameMatch {
                name: specifier.to_string(),
                definitions: definitions.to_vec(),
            });
        }
        registry.lookup_deep(specifier)
    }

    fn match_loaded(&self, specifier: &str, resolved: &str) -> Option<NameMatch> {
        self.match_specifier(specifier)
            .or_else(|| self.match_specifier(resolved))
    }

    /// Re-key matched definitions under a concrete resolved location.
    pub fn alias_definitions(&self, url: &Url, matched: &NameMatch) {
        let resolved = rewrite::file_path_of(url);
        if resolved == matched.name {
            return;
        }
        // Clone first: the definitions list must never be mutated while a
        // lookup is iterating it.
        let definitions = matched.definitions.clone();
        lock(&self.registry).alias(&resolved, definitions);
    }

    // ---- pending rewrites ------------------------------------------------

    pub fn store_pending_rewrite(&self, tagged: Url, specifier: &str) {
        lock(&self.pending)
            .entry(tagged)
            .or_insert_with(|| PendingRewriteRecord::new(specifier));
    }

    pub fn pending_rewrite(&self, tagged: &Url) -> Option<PendingRewriteRecord> {
        lock(&self.pending).get(tagged).cloned()
    }

    pub fn finish_pending_rewrite(&self, tagged: &Url) {
        lock(&self.pending).remove(tagged);
    }

    pub fn pending_rewrite_count(&self) -> usize {
        lock(&self.pending).len()
    }

    // ---- interception entry points ---------------------------------------

    /// Specifiers belonging to the engine's own support modules.
    pub fn is_internal_specifier(&self, specifier: &str) -> bool {
        specifier.starts_with("modtap:")
    }

    /// Post-load instrumentation for the mutable path.
    pub fn instrument_loaded(&self, specifier: &str, loaded: LoadedModule) -> LoadedModule {
        let resolved = loaded.resolved_path.to_string_lossy().into_owned();
        let Some(matched) = self.match_loaded(specifier, &resolved) else {
            return loaded;
        };

        let version = loaded
            .version
            .clone()
            .or_else(|| self.detect_version(&loaded.resolved_path));
        let identity = ModuleIdentity::new(resolved, version.as_deref());
        let exports = self.instrument_exports(&matched, loaded.exports.clone(), identity);
        LoadedModule { exports, ..loaded }
    }

    /// Shim-factory entry point named by synthesized wrapper modules: build
    /// the proxy facade over a frozen namespace, then run the same post-load
    /// instrumentation as the mutable path.
    pub fn instrument_namespace(
        &self,
        namespace: Namespace,
        specifier: &str,
        resolved_path: &Path,
    ) -> ExportsHandle {
        let proxy: ExportsHandle = Arc::new(ProxyNamespace::new(
            namespace,
            specifier,
            resolved_path.to_path_buf(),
        ));
        let resolved = resolved_path.to_string_lossy().into_owned();
        let Some(matched) = self.match_loaded(specifier, &resolved) else {
            return proxy;
        };

        let version = self.detect_version(resolved_path);
        let identity = ModuleIdentity::new(resolved, version.as_deref());
        self.instrument_exports(&matched, proxy, identity)
    }

    /// Generic post-load hook shared by both loading styles.
    fn instrument_exports(
        &self,
        matched: &NameMatch,
        exports: ExportsHandle,
        identity: ModuleIdentity,
    ) -> ExportsHandle {
        {
            let mut gate = lock(&self.gate);
            if !gate.begin(identity.clone()) {
                debug!(identity = %identity, "already instrumented; skipping");
                return exports;
            }
        }

        let started = Instant::now();
        let mut current = exports;
        let mut replaced = false;
        let mut failure: Option<String> = None;

        for definition in &matched.definitions {
            let shim = Shim::new(
                definition.kind,
                matched.name.clone(),
                self.ledger.clone(),
                self.metrics.clone(),
            );
            match guarded_on_require(definition, &shim, &current, &matched.name) {
                HookVerdict::Applied { replacement } => {
                    if let Some(replacement) = replacement {
                        current = replacement;
                        replaced = true;
                    }
                }
                HookVerdict::Failed { error } => {
                    // One broken definition must not poison its neighbors;
                    // the rest still run, but the gate remembers the failure.
                    failure.get_or_insert(error);
                }
            }
        }

        let success = failure.is_none();
        lock(&self.gate).finish(&identity, success);

        let outcome = if failure.is_some() {
            InstrumentationOutcome::Failed
        } else if replaced {
            InstrumentationOutcome::Replaced
        } else {
            InstrumentationOutcome::Applied
        };
        if success {
            self.metrics
                .get_or_create_metric(&loaded_metric(&matched.name))
                .increment_call_count();
            info!(module = matched.name.as_str(), identity = %identity, "instrumented");
        }

        let mut record = InstrumentationRecord::new(matched.name.clone(), identity, outcome)
            .with_duration_ms(started.elapsed().as_millis());
        if let Some(error) = failure {
            record = record.with_error(error);
        }
        lock(&self.records).push(record);

        current
    }

    // ---- diagnostics and lifecycle ---------------------------------------

    pub fn detect_version(&self, path: &Path) -> Option<String> {
        self.version_detector
            .as_ref()
            .and_then(|detector| detector(path))
    }

    pub fn capture_bindings_limit(&self) -> Option<usize> {
        self.capture_bindings_limit
    }

    pub fn ledger(&self) -> &Arc<WrapLedger> {
        &self.ledger
    }

    pub fn metrics(&self) -> &Arc<dyn Metrics> {
        &self.metrics
    }

    /// Records accumulated since the last flush or reset.
    pub fn records(&self) -> Vec<InstrumentationRecord> {
        lock(&self.records).clone()
    }

    /// Append accumulated records to the audit log, if one is configured.
    /// Returns how many records were written.
    pub async fn flush_audit(&self) -> Result<usize, AuditWriterError> {
        let Some(writer) = &self.audit else {
            return Ok(0);
        };
        let drained: Vec<InstrumentationRecord> = {
            let mut records = lock(&self.records);
            records.drain(..).collect()
        };
        writer.append_all(&drained).await?;
        Ok(drained.len())
    }

    /// Reverse every wrap performed through this engine's shims.
    pub fn unwrap_all(&self) {
        wrap::unwrap_all(&self.ledger);
    }

    /// Test-harness teardown: unwrap everything and drop all interception
    /// state. Disabled-instrumentation configuration survives.
    pub fn reset(&self) {
        self.unwrap_all();
        lock(&self.registry).clear();
        lock(&self.gate).clear();
        lock(&self.pending).clear();
        lock(&self.records).clear();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registered", &self.registered_names())
            .field("pending_rewrites", &self.pending_rewrite_count())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
