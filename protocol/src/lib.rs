//! Contract types between the modtap engine and a host's pluggable loader.
//!
//! A host runtime that supports pluggable loading invokes chained `resolve`
//! and `load` hooks with continuation-passing semantics. The engine's hooks
//! speak this vocabulary; the types live here so hosts can depend on the
//! contract without pulling in the engine.

pub mod loader;

pub use loader::{
    LoadContext, LoadOutcome, LoaderError, Resolution, ResolveContext,
};
