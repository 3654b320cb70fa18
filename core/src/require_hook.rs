//! Interception of mutable-style loads.
//!
//! The interceptor wraps the host's loading function and instruments the
//! exports it produces. It implements [`ModuleLoader`] itself so hosts chain
//! it in front of their real loader without changing call sites.

use std::path::PathBuf;
use std::sync::Arc;

use modtap_protocol::LoaderError;

use crate::engine::Engine;
use crate::host::{LoadedModule, ModuleLoader};

/// Wraps a mutable-style loader with the instrumentation pipeline.
pub struct RequireInterceptor<L> {
    engine: Arc<Engine>,
    inner: L,
}

impl<L: ModuleLoader> RequireInterceptor<L> {
    pub fn new(engine: Arc<Engine>, inner: L) -> Self {
        Self { engine, inner }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L: ModuleLoader> ModuleLoader for RequireInterceptor<L> {
    fn resolve(&self, specifier: &str) -> Result<PathBuf, LoaderError> {
        self.inner.resolve(specifier)
    }

    fn load(&self, specifier: &str) -> Result<LoadedModule, LoaderError> {
        let loaded = self.inner.load(specifier)?;
        // The engine's own support modules must never instrument themselves.
        if self.engine.is_internal_specifier(specifier) {
            return Ok(loaded);
        }
        Ok(self.engine.instrument_loaded(specifier, loaded))
    }
}
