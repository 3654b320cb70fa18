//! The capability object handed to instrumentation hooks.
//!
//! A shim is constructed per invocation from the definition's declared kind.
//! Every variant exposes the same wrapping operations; the kind selects the
//! metric namespace the flavored conveniences report under, so datastore,
//! web-framework, and messaging instrumentations share one authoring
//! contract.

use std::sync::Arc;

use modtap_common::{ExportsHandle, FuncValue, Value};
use serde::{Deserialize, Serialize};

use crate::metrics::Metrics;
use crate::wrap::{self, WrapLedger};

/// Flavor of shim an instrumentation definition asks for.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ShimKind {
    #[default]
    Generic,
    Datastore,
    WebFramework,
    Messaging,
}

impl ShimKind {
    fn metric_prefix(self) -> &'static str {
        match self {
            ShimKind::Generic => "generic",
            ShimKind::Datastore => "datastore",
            ShimKind::WebFramework => "webFramework",
            ShimKind::Messaging => "messaging",
        }
    }
}

/// Wrapping capabilities scoped to one module's instrumentation run.
#[derive(Clone)]
pub struct Shim {
    kind: ShimKind,
    module_name: String,
    ledger: Arc<WrapLedger>,
    metrics: Arc<dyn Metrics>,
}

impl Shim {
    pub(crate) fn new(
        kind: ShimKind,
        module_name: impl Into<String>,
        ledger: Arc<WrapLedger>,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        Self {
            kind,
            module_name: module_name.into(),
            ledger,
            metrics,
        }
    }

    pub fn kind(&self) -> ShimKind {
        self.kind
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Replace `container[name]` with `factory(original)`; see [`wrap::wrap`].
    pub fn wrap<F>(&self, container: &ExportsHandle, name: &str, factory: F) -> bool
    where
        F: Fn(&FuncValue) -> FuncValue,
    {
        wrap::wrap(&self.ledger, container, &self.module_name, name, factory)
    }

    /// Apply one factory to several properties; returns how many wrapped.
    pub fn wrap_many<F>(&self, container: &ExportsHandle, names: &[&str], factory: F) -> usize
    where
        F: Fn(&FuncValue) -> FuncValue,
    {
        wrap::wrap_many(&self.ledger, container, &self.module_name, names, factory)
    }

    /// Restore a previously wrapped property.
    pub fn unwrap(&self, container: &ExportsHandle, name: &str) -> bool {
        wrap::unwrap(&self.ledger, container, &self.module_name, name)
    }

    /// Replace a data property with an accessor pair.
    pub fn wrap_accessor(
        &self,
        container: &ExportsHandle,
        name: &str,
        get: Option<FuncValue>,
        set: Option<FuncValue>,
    ) -> bool {
        wrap::wrap_accessor(&self.ledger, container, &self.module_name, name, get, set)
    }

    pub fn is_wrapped(value: &Value) -> bool {
        wrap::is_wrapped(value)
    }

    /// Bump the flavor-scoped call-count metric for `operation`.
    pub fn record_operation(&self, operation: &str) {
        let name = format!(
            "{}/operation/{}/{}",
            self.kind.metric_prefix(),
            self.module_name,
            operation
        );
        self.metrics.get_or_create_metric(&name).increment_call_count();
    }

    /// Wrap a property and record it as a flavored operation in one step.
    pub fn wrap_operation<F>(&self, container: &ExportsHandle, name: &str, factory: F) -> bool
    where
        F: Fn(&FuncValue) -> FuncValue,
    {
        let wrapped = self.wrap(container, name, factory);
        if wrapped {
            self.record_operation(name);
        }
        wrapped
    }

    /// Datastore-flavored alias for [`Shim::wrap_operation`].
    pub fn wrap_query<F>(&self, container: &ExportsHandle, name: &str, factory: F) -> bool
    where
        F: Fn(&FuncValue) -> FuncValue,
    {
        self.wrap_operation(container, name, factory)
    }

    /// Web-framework-flavored alias for [`Shim::wrap_operation`].
    pub fn wrap_middleware<F>(&self, container: &ExportsHandle, name: &str, factory: F) -> bool
    where
        F: Fn(&FuncValue) -> FuncValue,
    {
        self.wrap_operation(container, name, factory)
    }

    /// Messaging-flavored alias for [`Shim::wrap_operation`].
    pub fn wrap_publish<F>(&self, container: &ExportsHandle, name: &str, factory: F) -> bool
    where
        F: Fn(&FuncValue) -> FuncValue,
    {
        self.wrap_operation(container, name, factory)
    }
}

impl std::fmt::Debug for Shim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shim")
            .field("kind", &self.kind)
            .field("module_name", &self.module_name)
            .finish()
    }
}
