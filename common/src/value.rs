//! Dynamic values exchanged between a host runtime and instrumentation code.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Signature of a host-callable function value.
pub type NativeFn = dyn Fn(&[Value]) -> Value + Send + Sync;

/// A callable export: the function itself plus its own attached properties.
///
/// Attached properties model helpers hung off an exported callable. Wrapping
/// copies them onto the replacement so callers that reach through the callable
/// keep working. A replacement produced by wrapping also carries a reference
/// back to the original it stands in for, which is what makes unwrapping
/// possible.
#[derive(Clone)]
pub struct FuncValue {
    call: Arc<NativeFn>,
    props: BTreeMap<String, Value>,
    original: Option<Arc<FuncValue>>,
}

impl FuncValue {
    pub fn new<F>(call: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(call),
            props: BTreeMap::new(),
            original: None,
        }
    }

    /// Invoke the underlying callable.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.call)(args)
    }

    /// Attach (or replace) an own property on this callable.
    pub fn set_prop(&mut self, name: impl Into<String>, value: Value) {
        self.props.insert(name.into(), value);
    }

    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    pub fn props(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.props.iter()
    }

    pub fn has_prop(&self, name: &str) -> bool {
        self.props.contains_key(name)
    }

    /// Tag this callable as a replacement for `original`.
    pub fn with_original(mut self, original: FuncValue) -> Self {
        self.original = Some(Arc::new(original));
        self
    }

    /// The callable this one replaced, if it is a wrapper.
    pub fn original(&self) -> Option<&FuncValue> {
        self.original.as_deref()
    }

    pub fn is_wrapped(&self) -> bool {
        self.original.is_some()
    }

    /// Identity comparison: two handles to the same underlying callable.
    pub fn ptr_eq(&self, other: &FuncValue) -> bool {
        Arc::ptr_eq(&self.call, &other.call)
    }
}

impl fmt::Debug for FuncValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncValue")
            .field("props", &self.props.keys().collect::<Vec<_>>())
            .field("wrapped", &self.original.is_some())
            .finish()
    }
}

/// A dynamic value a module may export.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Func(FuncValue),
}

impl Value {
    pub fn func<F>(call: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Value::Func(FuncValue::new(call))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }

    pub fn as_func(&self) -> Option<&FuncValue> {
        match self {
            Value::Func(func) => Some(func),
            _ => None,
        }
    }

    pub fn is_func(&self) -> bool {
        matches!(self, Value::Func(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            // Callables compare by identity, not behavior.
            (Value::Func(a), Value::Func(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<FuncValue> for Value {
    fn from(value: FuncValue) -> Self {
        Value::Func(value)
    }
}

/// A named slot on an exports container: either plain data or an accessor
/// pair installed in place of a data property.
#[derive(Debug, Clone)]
pub enum Property {
    Data(Value),
    Accessor {
        get: Option<FuncValue>,
        set: Option<FuncValue>,
    },
}

impl Property {
    /// Read the property: data properties yield their value, accessors invoke
    /// the getter (or yield `Null` when there is none).
    pub fn read(&self) -> Value {
        match self {
            Property::Data(value) => value.clone(),
            Property::Accessor { get, .. } => match get {
                Some(getter) => getter.call(&[]),
                None => Value::Null,
            },
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Property::Data(_))
    }
}
