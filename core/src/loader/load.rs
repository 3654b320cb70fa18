//! Load phase: replace tagged modules with synthesized wrapper source.

use std::future::Future;

use modtap_common::ModuleKind;
use modtap_protocol::{LoadContext, LoadOutcome, LoaderError};
use tracing::{debug, warn};
use url::Url;

use crate::host::ModuleHost;
use crate::loader::{rewrite, LoaderHooks};

impl<H: ModuleHost> LoaderHooks<H> {
    /// The engine's `load` hook.
    ///
    /// Suspends on an internal retrieval of the real target to enumerate its
    /// binding names; every failure along the way degrades to delegating the
    /// load unchanged.
    pub async fn load<F, Fut>(
        &self,
        url: &Url,
        context: &LoadContext,
        next: F,
    ) -> Result<LoadOutcome, LoaderError>
    where
        F: FnOnce(Url, LoadContext) -> Fut,
        Fut: Future<Output = Result<LoadOutcome, LoaderError>>,
    {
        if context.from_engine {
            return next(url.clone(), context.clone()).await;
        }
        let Some(untagged) = rewrite::strip_tag(url) else {
            return next(url.clone(), context.clone()).await;
        };
        // The record is consumed only after synthesis succeeds; a second
        // in-flight load of the same tagged URL reuses it instead of
        // re-resolving.
        let Some(record) = self.engine().pending_rewrite(url) else {
            return next(untagged, context.clone()).await;
        };

        let namespace = match self.host().namespace_of(&untagged).await {
            Ok(namespace) => namespace,
            Err(err) => {
                warn!(
                    url = %untagged,
                    %err,
                    "binding enumeration failed; loading without instrumentation"
                );
                return next(untagged, context.clone()).await;
            }
        };

        let bindings = namespace.binding_names();
        if let Some(limit) = self.engine().capture_bindings_limit() {
            if bindings.len() > limit {
                warn!(
                    url = %untagged,
                    bindings = bindings.len(),
                    limit,
                    "binding count exceeds configured limit; loading without instrumentation"
                );
                return next(untagged, context.clone()).await;
            }
        }

        let source = rewrite::synthesize_source(&bindings, &untagged, &record.specifier);
        self.engine().finish_pending_rewrite(url);
        debug!(
            specifier = record.specifier.as_str(),
            url = %untagged,
            bindings = bindings.len(),
            "synthesized wrapper module"
        );

        Ok(LoadOutcome {
            kind: ModuleKind::Immutable,
            source,
            short_circuit: true,
        })
    }
}
