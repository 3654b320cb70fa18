//! Shared dynamic value model for the modtap instrumentation engine.
//!
//! Hosts hand loaded modules to the engine as containers of dynamic values;
//! instrumentation code reads, replaces, and augments those values without
//! knowing which loading mechanism produced them.

pub mod container;
pub mod module;
pub mod value;

// Re-export the most common types for convenience.
pub use container::{Exports, ExportsHandle, Namespace, PropertyContainer};
pub use module::ModuleKind;
pub use value::{FuncValue, Property, Value};
