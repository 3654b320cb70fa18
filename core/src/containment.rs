//! Error containment around third-party instrumentation hooks.
//!
//! Every `on_require` invocation runs inside a guard: failures (returned
//! errors and panics alike) are delivered to the definition's `on_error`
//! handler when one exists, logged otherwise, and never propagated. The
//! worst outcome of a broken instrumentation is a dependency that runs
//! untraced.

use std::panic::{catch_unwind, AssertUnwindSafe};

use anyhow::anyhow;
use modtap_common::ExportsHandle;
use tracing::{error, warn};

use crate::definition::InstrumentationDefinition;
use crate::shim::Shim;

/// Outcome of a guarded `on_require` invocation.
#[derive(Debug)]
pub enum HookVerdict {
    /// The hook ran to completion, possibly returning a replacement exports
    /// handle.
    Applied { replacement: Option<ExportsHandle> },
    /// The hook failed; the error was contained.
    Failed { error: String },
}

/// Invoke a definition's `on_require` hook with full containment.
pub fn guarded_on_require(
    definition: &InstrumentationDefinition,
    shim: &Shim,
    exports: &ExportsHandle,
    module_name: &str,
) -> HookVerdict {
    let Some(on_require) = definition.on_require.clone() else {
        return HookVerdict::Applied { replacement: None };
    };

    match catch_unwind(AssertUnwindSafe(|| on_require(shim, exports, module_name))) {
        Ok(Ok(replacement)) => HookVerdict::Applied { replacement },
        Ok(Err(err)) => {
            deliver_error(definition, module_name, &err);
            HookVerdict::Failed {
                error: err.to_string(),
            }
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            let err = anyhow!("instrumentation hook panicked: {message}");
            deliver_error(definition, module_name, &err);
            HookVerdict::Failed {
                error: err.to_string(),
            }
        }
    }
}

/// Route a hook failure to the definition's `on_error` handler, guarding the
/// handler itself as well.
fn deliver_error(definition: &InstrumentationDefinition, module_name: &str, err: &anyhow::Error) {
    let Some(on_error) = definition.on_error.clone() else {
        warn!(
            module = module_name,
            %err,
            "instrumentation failed; module will run uninstrumented"
        );
        return;
    };

    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| on_error(err))) {
        let handler_failure = panic_message(payload.as_ref());
        error!(
            module = module_name,
            %err,
            handler_failure,
            "instrumentation error handler itself failed"
        );
    }
}

/// Best-effort extraction of a panic payload's message.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
