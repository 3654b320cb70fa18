//! Module kinds surfaced by host loaders.

use serde::{Deserialize, Serialize};

/// Whether a loaded unit is an in-place-editable object or a frozen,
/// live-bound namespace.
///
/// Immutable-capable loaders can still yield mutable units (legacy-style
/// modules reached indirectly), so the kind travels with every resolution
/// rather than being implied by the pipeline that produced it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Mutable,
    Immutable,
}

impl ModuleKind {
    pub fn is_mutable(self) -> bool {
        matches!(self, ModuleKind::Mutable)
    }

    pub fn is_immutable(self) -> bool {
        matches!(self, ModuleKind::Immutable)
    }
}
