//! Export containers: the mutable exports object and the frozen namespace.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::value::{Property, Value};

/// Shared handle to an exports container.
///
/// Both loading mechanisms surface their result through this handle: mutable
/// loads hand out an [`Exports`] object directly, immutable loads hand out a
/// proxy that satisfies the same contract over a frozen [`Namespace`].
pub type ExportsHandle = Arc<dyn PropertyContainer>;

/// Uniform property-level access to a module's exports.
///
/// All methods take `&self`; implementations use interior mutability because
/// a container is shared between the host application and the engine for the
/// life of the process.
pub trait PropertyContainer: Send + Sync + fmt::Debug {
    /// Read a property. Accessor properties invoke their getter.
    fn get(&self, name: &str) -> Option<Value>;

    /// Assign a property. Accessor properties with a setter route through it;
    /// anything else becomes a plain data property.
    fn set(&self, name: &str, value: Value);

    /// Install a property descriptor verbatim.
    fn define(&self, name: &str, property: Property);

    /// The raw descriptor for a property, if present.
    fn property(&self, name: &str) -> Option<Property>;

    /// Every property name visible on this container, sorted.
    fn keys(&self) -> Vec<String>;

    fn has(&self, name: &str) -> bool {
        self.property(name).is_some()
    }
}

/// An in-place-editable exports object produced by a mutable load.
#[derive(Default)]
pub struct Exports {
    props: Mutex<BTreeMap<String, Property>>,
}

impl Exports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an exports object from `(name, value)` pairs and return the
    /// shared handle a loader would hand out.
    pub fn from_values<I, N>(values: I) -> ExportsHandle
    where
        I: IntoIterator<Item = (N, Value)>,
        N: Into<String>,
    {
        let exports = Exports::new();
        for (name, value) in values {
            exports.set(&name.into(), value);
        }
        Arc::new(exports)
    }

    pub fn into_handle(self) -> ExportsHandle {
        Arc::new(self)
    }

    fn props(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Property>> {
        self.props.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PropertyContainer for Exports {
    fn get(&self, name: &str) -> Option<Value> {
        self.props().get(name).map(Property::read)
    }

    fn set(&self, name: &str, value: Value) {
        let mut props = self.props();
        if let Some(Property::Accessor { set: Some(setter), .. }) = props.get(name) {
            let setter = setter.clone();
            drop(props);
            setter.call(&[value]);
            return;
        }
        props.insert(name.to_string(), Property::Data(value));
    }

    fn define(&self, name: &str, property: Property) {
        self.props().insert(name.to_string(), property);
    }

    fn property(&self, name: &str) -> Option<Property> {
        self.props().get(name).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.props().keys().cloned().collect()
    }
}

impl fmt::Debug for Exports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exports").field("keys", &self.keys()).finish()
    }
}

/// An immutable, live-bound namespace produced by an immutable load.
///
/// The engine never mutates one of these; overrides live in the proxy layered
/// on top.
#[derive(Clone)]
pub struct Namespace {
    bindings: Arc<BTreeMap<String, Value>>,
}

impl Namespace {
    pub fn from_bindings<I, N>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (N, Value)>,
        N: Into<String>,
    {
        Self {
            bindings: Arc::new(
                bindings
                    .into_iter()
                    .map(|(name, value)| (name.into(), value))
                    .collect(),
            ),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Exported binding names, sorted.
    pub fn binding_names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("bindings", &self.binding_names())
            .finish()
    }
}
