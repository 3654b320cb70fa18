//! Generic wrap/unwrap primitives over an identity-preserving ledger.
//!
//! Wrapping replaces a callable property with a factory-produced stand-in
//! that carries a reference back to the original. The process-wide ledger
//! records every replacement so `unwrap_all` can reverse them at shutdown or
//! test teardown, even for containers the caller no longer holds directly.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use modtap_common::{ExportsHandle, FuncValue, Property, PropertyContainer, Value};
use tracing::{debug, warn};

/// One reversible property replacement.
struct WrapRecord {
    container: Weak<dyn PropertyContainer>,
    name: String,
    label: String,
    original: Property,
}

/// Process-wide ledger of wraps performed through these primitives.
#[derive(Default)]
pub struct WrapLedger {
    records: Mutex<Vec<WrapRecord>>,
}

impl WrapLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, Vec<WrapRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Predicate: does this value carry the original-reference marker?
pub fn is_wrapped(value: &Value) -> bool {
    value.as_func().is_some_and(FuncValue::is_wrapped)
}

/// Replace `container[name]` with `factory(original)`.
///
/// The replacement is tagged with the original reference and inherits the
/// original's own attached properties. No-ops (with a log) when the property
/// is absent, not callable, or already wrapped.
pub fn wrap<F>(
    ledger: &WrapLedger,
    container: &ExportsHandle,
    label: &str,
    name: &str,
    factory: F,
) -> bool
where
    F: Fn(&FuncValue) -> FuncValue,
{
    let Some(property) = container.property(name) else {
        warn!(label, name, "cannot wrap: property is absent");
        return false;
    };
    let Property::Data(Value::Func(original)) = property else {
        warn!(label, name, "cannot wrap: property is not a callable");
        return false;
    };
    if original.is_wrapped() {
        warn!(label, name, "cannot wrap: property is already wrapped");
        return false;
    }

    let mut replacement = factory(&original);
    if replacement.original().is_none() {
        replacement = replacement.with_original(original.clone());
    }
    // Side-attached helpers on the original must survive the swap.
    for (prop_name, prop_value) in original.props() {
        if !replacement.has_prop(prop_name) {
            replacement.set_prop(prop_name.clone(), prop_value.clone());
        }
    }

    container.define(name, Property::Data(Value::Func(replacement)));
    ledger.records().push(WrapRecord {
        container: Arc::downgrade(container),
        name: name.to_string(),
        label: label.to_string(),
        original: Property::Data(Value::Func(original)),
    });
    true
}

/// Apply one factory to several properties on the same container.
pub fn wrap_many<F>(
    ledger: &WrapLedger,
    container: &ExportsHandle,
    label: &str,
    names: &[&str],
    factory: F,
) -> usize
where
    F: Fn(&FuncValue) -> FuncValue,
{
    names
        .iter()
        .filter(|&&name| wrap(ledger, container, label, name, &factory))
        .count()
}

/// Restore the original callable behind a wrapped property.
pub fn unwrap(ledger: &WrapLedger, container: &ExportsHandle, label: &str, name: &str) -> bool {
    let Some(Property::Data(Value::Func(current))) = container.property(name) else {
        debug!(label, name, "nothing to unwrap");
        return false;
    };
    let Some(original) = current.original() else {
        debug!(label, name, "property is not wrapped");
        return false;
    };

    container.define(name, Property::Data(Value::Func(original.clone())));
    let mut records = ledger.records();
    if let Some(position) = records.iter().rposition(|record| {
        record.name == name && record.container.ptr_eq(&Arc::downgrade(container))
    }) {
        records.remove(position);
    }
    true
}

/// Reverse every wrap still alive in the ledger, newest first.
pub fn unwrap_all(ledger: &WrapLedger) {
    let drained: Vec<WrapRecord> = {
        let mut records = ledger.records();
        records.drain(..).collect()
    };
    for record in drained.into_iter().rev() {
        let Some(container) = record.container.upgrade() else {
            debug!(
                label = record.label.as_str(),
                name = record.name.as_str(),
                "container dropped before unwrap"
            );
            continue;
        };
        container.define(&record.name, record.original.clone());
    }
}

/// Replace a data property with an accessor pair.
///
/// Used for backward-compatible renames: reads and writes route through the
/// supplied getter/setter while the original data value is preserved in the
/// ledger for teardown.
pub fn wrap_accessor(
    ledger: &WrapLedger,
    container: &ExportsHandle,
    label: &str,
    name: &str,
    get: Option<FuncValue>,
    set: Option<FuncValue>,
) -> bool {
    if name.is_empty() || (get.is_none() && set.is_none()) {
        warn!(label, name, "cannot install accessor: missing arguments");
        return false;
    }
    let Some(property) = container.property(name) else {
        warn!(label, name, "cannot install accessor: property is absent");
        return false;
    };
    if !property.is_data() {
        warn!(label, name, "cannot install accessor: property is already an accessor");
        return false;
    }

    container.define(name, Property::Accessor { get, set });
    ledger.records().push(WrapRecord {
        container: Arc::downgrade(container),
        name: name.to_string(),
        label: label.to_string(),
        original: property,
    });
    true
}
