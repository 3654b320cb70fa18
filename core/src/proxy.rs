//! Transparent mutable facade over a frozen namespace.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use modtap_common::{Namespace, Property, PropertyContainer, Value};

/// Presents an immutable namespace as an ordinary editable exports object.
///
/// Reads prefer the override table and fall back to the real namespace;
/// writes and property definitions always land in the override table. The
/// frozen namespace is never touched, which is the whole point: wrapping an
/// immutable module means layering overrides, not mutating bindings.
pub struct ProxyNamespace {
    target: Namespace,
    overrides: Mutex<BTreeMap<String, Property>>,
    logical_name: String,
    resolved_path: PathBuf,
}

impl ProxyNamespace {
    pub fn new(
        target: Namespace,
        logical_name: impl Into<String>,
        resolved_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            target,
            overrides: Mutex::new(BTreeMap::new()),
            logical_name: logical_name.into(),
            resolved_path: resolved_path.into(),
        }
    }

    pub fn target(&self) -> &Namespace {
        &self.target
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn resolved_path(&self) -> &Path {
        &self.resolved_path
    }

    /// Names currently shadowed by overrides, sorted.
    pub fn overridden_names(&self) -> Vec<String> {
        self.overrides().keys().cloned().collect()
    }

    fn overrides(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Property>> {
        self.overrides.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PropertyContainer for ProxyNamespace {
    fn get(&self, name: &str) -> Option<Value> {
        if let Some(property) = self.overrides().get(name) {
            return Some(property.read());
        }
        self.target.get(name)
    }

    fn set(&self, name: &str, value: Value) {
        let mut overrides = self.overrides();
        if let Some(Property::Accessor { set: Some(setter), .. }) = overrides.get(name) {
            let setter = setter.clone();
            drop(overrides);
            setter.call(&[value]);
            return;
        }
        overrides.insert(name.to_string(), Property::Data(value));
    }

    fn define(&self, name: &str, property: Property) {
        self.overrides().insert(name.to_string(), property);
    }

    fn property(&self, name: &str) -> Option<Property> {
        if let Some(property) = self.overrides().get(name) {
            return Some(property.clone());
        }
        self.target.get(name).map(Property::Data)
    }

    fn keys(&self) -> Vec<String> {
        let mut keys = self.target.binding_names();
        for name in self.overrides().keys() {
            if !keys.contains(name) {
                keys.push(name.clone());
            }
        }
        keys.sort();
        keys
    }
}

impl fmt::Debug for ProxyNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyNamespace")
            .field("logical_name", &self.logical_name)
            .field("resolved_path", &self.resolved_path)
            .field("overridden", &self.overridden_names())
            .finish()
    }
}
