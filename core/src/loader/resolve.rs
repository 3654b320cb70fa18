//! Resolve phase: claim matching resolutions for rewriting.

use std::future::Future;

use modtap_common::ModuleKind;
use modtap_protocol::{LoaderError, Resolution, ResolveContext};
use tracing::debug;

use crate::host::ModuleHost;
use crate::loader::{rewrite, LoaderHooks};

impl<H: ModuleHost> LoaderHooks<H> {
    /// The engine's `resolve` hook.
    ///
    /// Continuation-passing: `next` is the rest of the host's resolver chain
    /// and is always consulted first for the canonical location and kind.
    pub async fn resolve<F, Fut>(
        &self,
        specifier: &str,
        context: &ResolveContext,
        next: F,
    ) -> Result<Resolution, LoaderError>
    where
        F: FnOnce(String, ResolveContext) -> Fut,
        Fut: Future<Output = Result<Resolution, LoaderError>>,
    {
        // Internal re-resolutions must not re-enter the interception
        // machinery; that way lies infinite recursion through the chain.
        if context.from_engine || self.engine().is_internal_specifier(specifier) {
            return next(specifier.to_string(), context.clone()).await;
        }

        let resolution = next(specifier.to_string(), context.clone()).await?;
        let Some(matched) = self.engine().match_specifier(specifier) else {
            return Ok(resolution);
        };

        match resolution.kind {
            ModuleKind::Mutable => {
                // Immutable-capable loaders still surface legacy mutable
                // units; those belong to the mutable-load path, keyed by the
                // concrete resolved location.
                self.engine().alias_definitions(&resolution.url, &matched);
                Ok(resolution)
            }
            ModuleKind::Immutable => {
                let tagged = rewrite::tag_url(&resolution.url);
                self.engine()
                    .store_pending_rewrite(tagged.clone(), specifier);
                debug!(
                    specifier,
                    url = %resolution.url,
                    "claimed immutable resolution for rewrite"
                );
                Ok(Resolution {
                    url: tagged,
                    kind: ModuleKind::Immutable,
                    short_circuit: true,
                })
            }
        }
    }
}
