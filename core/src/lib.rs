//! Module-interception and wrapping engine.
//!
//! The engine sits between a host runtime's module loaders and the modules
//! they produce: definitions registered per logical module name are invoked
//! once per module identity, inside an error-containment guard, with a shim
//! capability object for wrapping exports. Mutable loads are edited in
//! place; immutable loads are rewritten at source level and wrapped through
//! a transparent namespace proxy.

pub mod audit;
pub mod config;
pub mod containment;
pub mod definition;
pub mod engine;
pub mod gate;
pub mod host;
pub mod loader;
pub mod metrics;
pub mod proxy;
pub mod record;
pub mod registry;
pub mod require_hook;
pub mod shim;
pub mod skipped;
pub mod wrap;

// Re-export the most common types for convenience.
pub use audit::{AuditWriter, AuditWriterError};
pub use config::{ConfigError, ConfigScope, EngineConfig, LayerSummary};
pub use containment::HookVerdict;
pub use definition::{InstrumentationDefinition, OnError, OnRequire};
pub use engine::Engine;
pub use gate::{GateState, ModuleIdentity, VersionGate};
pub use host::{LoadedModule, ModuleHost, ModuleLoader};
pub use loader::{LoaderHooks, PendingRewriteRecord, SHIM_MODULE_SPECIFIER};
pub use metrics::{Metric, Metrics, NullMetrics, RecordingMetrics};
pub use proxy::ProxyNamespace;
pub use record::{InstrumentationOutcome, InstrumentationRecord};
pub use registry::{InstrumentationRegistry, NameMatch, RegistrySnapshot};
pub use require_hook::RequireInterceptor;
pub use shim::{Shim, ShimKind};
pub use skipped::{SkipReason, SkippedDefinition};
pub use wrap::{is_wrapped, WrapLedger};
