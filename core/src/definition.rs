//! Instrumentation definitions supplied by per-library instrumentation code.

use std::fmt;
use std::sync::Arc;

use modtap_common::ExportsHandle;

use crate::shim::{Shim, ShimKind};

/// Hook invoked after a matching module loads.
///
/// The hook receives the shim capability object, the module's exports handle,
/// and the logical module name. It may mutate the exports in place, or return
/// a wholesale replacement handle.
pub type OnRequire = Arc<
    dyn Fn(&Shim, &ExportsHandle, &str) -> anyhow::Result<Option<ExportsHandle>> + Send + Sync,
>;

/// Optional handler invoked when `on_require` fails.
pub type OnError = Arc<dyn Fn(&anyhow::Error) + Send + Sync>;

/// Declarative description of how to instrument one logical module.
///
/// Definitions are created by instrumentation authors at process start and
/// are immutable once registered.
#[derive(Clone)]
pub struct InstrumentationDefinition {
    pub module_name: String,
    pub on_require: Option<OnRequire>,
    pub on_error: Option<OnError>,
    pub kind: ShimKind,
    /// Definitions marked as graph modules only ever match their exact root
    /// specifier, never deep paths inside the package.
    pub is_graph_module: bool,
}

impl InstrumentationDefinition {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            on_require: None,
            on_error: None,
            kind: ShimKind::Generic,
            is_graph_module: false,
        }
    }

    pub fn on_require<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Shim, &ExportsHandle, &str) -> anyhow::Result<Option<ExportsHandle>>
            + Send
            + Sync
            + 'static,
    {
        self.on_require = Some(Arc::new(hook));
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&anyhow::Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    pub fn with_kind(mut self, kind: ShimKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn graph_module(mut self) -> Self {
        self.is_graph_module = true;
        self
    }

    /// A definition with neither hook has nothing to contribute.
    pub fn has_hooks(&self) -> bool {
        self.on_require.is_some() || self.on_error.is_some()
    }
}

impl fmt::Debug for InstrumentationDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentationDefinition")
            .field("module_name", &self.module_name)
            .field("kind", &self.kind)
            .field("on_require", &self.on_require.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("is_graph_module", &self.is_graph_module)
            .finish()
    }
}
