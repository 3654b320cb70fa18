//! Traits a host runtime implements so the engine can intercept its loads.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use modtap_common::{ExportsHandle, Namespace};
use modtap_protocol::{LoadContext, LoadOutcome, LoaderError, Resolution, ResolveContext};
use url::Url;

/// A module produced by a mutable-style loader.
#[derive(Clone)]
pub struct LoadedModule {
    pub exports: ExportsHandle,
    pub resolved_path: PathBuf,
    pub version: Option<String>,
}

impl LoadedModule {
    pub fn new(exports: ExportsHandle, resolved_path: impl Into<PathBuf>) -> Self {
        Self {
            exports,
            resolved_path: resolved_path.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("resolved_path", &self.resolved_path)
            .field("version", &self.version)
            .finish()
    }
}

/// The mutable-style loading function the engine interposes on.
///
/// Implementations are expected to serialize loads per resolved path (a
/// module cache); the engine adds de-duplication of instrumentation, not of
/// loading.
pub trait ModuleLoader: Send + Sync {
    fn resolve(&self, specifier: &str) -> Result<PathBuf, LoaderError>;
    fn load(&self, specifier: &str) -> Result<LoadedModule, LoaderError>;
}

/// The immutable-capable host pipeline the engine's resolve/load hooks sit
/// in front of.
#[async_trait]
pub trait ModuleHost: Send + Sync {
    async fn resolve(
        &self,
        specifier: &str,
        context: &ResolveContext,
    ) -> Result<Resolution, LoaderError>;

    async fn load(&self, url: &Url, context: &LoadContext) -> Result<LoadOutcome, LoaderError>;

    /// Instantiate the module at `url` and surface its namespace so binding
    /// names can be enumerated.
    ///
    /// Implementations must run this retrieval with the engine re-entry
    /// marker set on the contexts they build, otherwise it re-enters the
    /// hook chain and recurses.
    async fn namespace_of(&self, url: &Url) -> Result<Namespace, LoaderError>;
}
