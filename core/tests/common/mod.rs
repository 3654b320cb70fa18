//! In-memory host runtime used by the integration suites.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use modtap_common::{ExportsHandle, ModuleKind, Namespace};
use modtap_core::{LoadedModule, ModuleHost, ModuleLoader};
use modtap_protocol::{LoadContext, LoadOutcome, LoaderError, Resolution, ResolveContext};
use url::Url;

/// Capture engine logs in test output; safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub struct ToyModule {
    pub path: String,
    pub kind: ModuleKind,
    pub version: Option<String>,
    pub exports: Option<ExportsHandle>,
    pub namespace: Option<Namespace>,
    pub source: String,
}

/// A minimal host: a fixed module table, an alias table standing in for the
/// host's specifier resolution, and per-specifier load counters.
#[derive(Default)]
pub struct ToyHost {
    modules: Mutex<HashMap<String, ToyModule>>,
    aliases: Mutex<HashMap<String, String>>,
    load_counts: Mutex<HashMap<String, usize>>,
    fail_namespace: AtomicBool,
}

impl ToyHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mutable(&self, specifier: &str, path: &str, exports: ExportsHandle) {
        self.modules().insert(
            specifier.to_string(),
            ToyModule {
                path: path.to_string(),
                kind: ModuleKind::Mutable,
                version: None,
                exports: Some(exports),
                namespace: None,
                source: String::new(),
            },
        );
    }

    pub fn add_versioned_mutable(
        &self,
        specifier: &str,
        path: &str,
        version: &str,
        exports: ExportsHandle,
    ) {
        self.add_mutable(specifier, path, exports);
        if let Some(module) = self.modules().get_mut(specifier) {
            module.version = Some(version.to_string());
        }
    }

    pub fn add_immutable(&self, specifier: &str, path: &str, namespace: Namespace, source: &str) {
        self.modules().insert(
            specifier.to_string(),
            ToyModule {
                path: path.to_string(),
                kind: ModuleKind::Immutable,
                version: None,
                exports: None,
                namespace: Some(namespace),
                source: source.to_string(),
            },
        );
    }

    /// A second specifier that resolves to an existing module.
    pub fn add_alias(&self, alias: &str, canonical: &str) {
        self.aliases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(alias.to_string(), canonical.to_string());
    }

    pub fn load_count(&self, specifier: &str) -> usize {
        self.load_counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(specifier)
            .copied()
            .unwrap_or(0)
    }

    /// Make `namespace_of` fail, for degrade-path coverage.
    pub fn set_namespace_failure(&self, fail: bool) {
        self.fail_namespace.store(fail, Ordering::SeqCst);
    }

    pub fn url_of(&self, specifier: &str) -> Url {
        let canonical = self.canonical(specifier);
        let path = self
            .modules()
            .get(&canonical)
            .map(|module| module.path.clone())
            .unwrap_or_default();
        Url::parse(&format!("file://{path}")).expect("toy module path is a valid url")
    }

    fn canonical(&self, specifier: &str) -> String {
        self.aliases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(specifier)
            .cloned()
            .unwrap_or_else(|| specifier.to_string())
    }

    fn bump_load_count(&self, specifier: &str) {
        *self
            .load_counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(specifier.to_string())
            .or_insert(0) += 1;
    }

    fn modules(&self) -> MutexGuard<'_, HashMap<String, ToyModule>> {
        self.modules.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn module_by_url(&self, url: &Url) -> Option<(String, ModuleKind, Option<Namespace>, String)> {
        let path = url.path().to_string();
        self.modules()
            .values()
            .find(|module| module.path == path)
            .map(|module| {
                (
                    module.path.clone(),
                    module.kind,
                    module.namespace.clone(),
                    module.source.clone(),
                )
            })
    }
}

impl ModuleLoader for ToyHost {
    fn resolve(&self, specifier: &str) -> Result<PathBuf, LoaderError> {
        let canonical = self.canonical(specifier);
        self.modules()
            .get(&canonical)
            .map(|module| PathBuf::from(&module.path))
            .ok_or_else(|| LoaderError::not_found(specifier))
    }

    fn load(&self, specifier: &str) -> Result<LoadedModule, LoaderError> {
        self.bump_load_count(specifier);
        let canonical = self.canonical(specifier);
        let modules = self.modules();
        let module = modules
            .get(&canonical)
            .ok_or_else(|| LoaderError::not_found(specifier))?;
        let exports = module
            .exports
            .clone()
            .ok_or_else(|| LoaderError::Host(format!("{canonical} is not a mutable module")))?;
        let mut loaded = LoadedModule::new(exports, &module.path);
        if let Some(version) = &module.version {
            loaded = loaded.with_version(version.clone());
        }
        Ok(loaded)
    }
}

#[async_trait]
impl ModuleHost for ToyHost {
    async fn resolve(
        &self,
        specifier: &str,
        _context: &ResolveContext,
    ) -> Result<Resolution, LoaderError> {
        let canonical = self.canonical(specifier);
        let modules = self.modules();
        let module = modules
            .get(&canonical)
            .ok_or_else(|| LoaderError::not_found(specifier))?;
        let url = Url::parse(&format!("file://{}", module.path))
            .map_err(|err| LoaderError::Host(err.to_string()))?;
        Ok(Resolution::new(url, module.kind))
    }

    async fn load(&self, url: &Url, _context: &LoadContext) -> Result<LoadOutcome, LoaderError> {
        let (_, kind, _, source) = self
            .module_by_url(url)
            .ok_or_else(|| LoaderError::not_found(url.as_str()))?;
        Ok(LoadOutcome::new(kind, source))
    }

    async fn namespace_of(&self, url: &Url) -> Result<Namespace, LoaderError> {
        if self.fail_namespace.load(Ordering::SeqCst) {
            return Err(LoaderError::Host("instantiation refused".to_string()));
        }
        let (_, _, namespace, _) = self
            .module_by_url(url)
            .ok_or_else(|| LoaderError::not_found(url.as_str()))?;
        namespace.ok_or_else(|| LoaderError::Host(format!("{url} has no namespace")))
    }
}
