mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::ToyHost;
use modtap_common::{Exports, FuncValue, PropertyContainer, Value};
use modtap_core::{
    is_wrapped, Engine, InstrumentationDefinition, ModuleLoader, RecordingMetrics,
    RequireInterceptor, ShimKind,
};
use pretty_assertions::assert_eq;

fn counting_definition(name: &str, calls: Arc<AtomicUsize>) -> InstrumentationDefinition {
    InstrumentationDefinition::new(name).on_require(move |_, _, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    })
}

fn host_with_mutable_module(specifier: &str, path: &str) -> ToyHost {
    let host = ToyHost::new();
    let exports = Exports::from_values([
        ("handle", Value::func(|_| Value::str("handled"))),
        ("limit", Value::Int(10)),
    ]);
    host.add_mutable(specifier, path, exports);
    host
}

#[test]
fn on_require_runs_once_across_repeated_loads() {
    common::init_test_logging();
    let engine = Arc::new(Engine::new());
    let calls = Arc::new(AtomicUsize::new(0));
    engine.register(counting_definition("foo", calls.clone()));

    let host = host_with_mutable_module("foo", "/srv/foo/index");
    let interceptor = RequireInterceptor::new(engine, host);

    for _ in 0..4 {
        interceptor.load("foo").expect("load succeeds");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(interceptor.inner().load_count("foo"), 4);
}

#[test]
fn two_specifiers_for_one_path_instrument_once() {
    let engine = Arc::new(Engine::new());
    let calls = Arc::new(AtomicUsize::new(0));
    engine.register(counting_definition("foo", calls.clone()));

    let host = host_with_mutable_module("foo", "/srv/foo/index");
    host.add_alias("foo/index", "foo");
    let interceptor = RequireInterceptor::new(engine, host);

    interceptor.load("foo").expect("load by root specifier");
    interceptor.load("foo/index").expect("load by deep specifier");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn failing_hook_leaves_exports_usable() {
    let engine = Arc::new(Engine::new());
    let errors = Arc::new(AtomicUsize::new(0));
    let errors_seen = errors.clone();
    engine.register(
        InstrumentationDefinition::new("foo")
            .on_require(|_, _, _| Err(anyhow::anyhow!("x")))
            .on_error(move |err| {
                assert_eq!(err.to_string(), "x");
                errors_seen.fetch_add(1, Ordering::SeqCst);
            }),
    );

    let host = host_with_mutable_module("foo", "/srv/foo/index");
    let interceptor = RequireInterceptor::new(engine.clone(), host);

    let loaded = interceptor.load("foo").expect("load still succeeds");
    assert_eq!(errors.load(Ordering::SeqCst), 1);

    // The baseline export is untouched and callable.
    let handle = loaded.exports.get("handle").expect("export present");
    assert!(!is_wrapped(&handle));
    assert_eq!(
        handle.as_func().expect("callable").call(&[]),
        Value::str("handled")
    );

    // Repeated loads skip the failed identity without re-invoking anything.
    interceptor.load("foo").expect("load after failure");
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[test]
fn in_place_wrapping_is_visible_to_the_caller() {
    let metrics = Arc::new(RecordingMetrics::new());
    let engine = Arc::new(Engine::new().with_metrics(metrics.clone()));
    engine.register(
        InstrumentationDefinition::new("foo")
            .with_kind(ShimKind::Datastore)
            .on_require(|shim, exports, _| {
                shim.wrap_query(exports, "handle", |inner| {
                    let inner = inner.clone();
                    FuncValue::new(move |args| {
                        let result = inner.call(args);
                        Value::str(format!(
                            "traced:{}",
                            result.as_str().unwrap_or_default()
                        ))
                    })
                });
                Ok(None)
            }),
    );

    let host = host_with_mutable_module("foo", "/srv/foo/index");
    let interceptor = RequireInterceptor::new(engine, host);

    let loaded = interceptor.load("foo").expect("load succeeds");
    let handle = loaded.exports.get("handle").expect("export present");
    assert!(is_wrapped(&handle));
    assert_eq!(
        handle.as_func().expect("callable").call(&[]),
        Value::str("traced:handled")
    );
    assert_eq!(metrics.count("datastore/operation/foo/handle"), 1);
    assert_eq!(metrics.count("supportability/instrumentation/loaded/foo"), 1);
}

#[test]
fn hook_may_replace_exports_wholesale() {
    let engine = Arc::new(Engine::new());
    engine.register(InstrumentationDefinition::new("foo").on_require(|_, _, _| {
        Ok(Some(Exports::from_values([(
            "marker",
            Value::str("replacement"),
        )])))
    }));

    let host = host_with_mutable_module("foo", "/srv/foo/index");
    let interceptor = RequireInterceptor::new(engine, host);

    let loaded = interceptor.load("foo").expect("load succeeds");
    assert_eq!(
        loaded.exports.get("marker"),
        Some(Value::str("replacement"))
    );
    assert!(loaded.exports.get("handle").is_none());
}

#[test]
fn engine_internal_specifiers_bypass_instrumentation() {
    let engine = Arc::new(Engine::new());
    let calls = Arc::new(AtomicUsize::new(0));
    engine.register(counting_definition("modtap:shim", calls.clone()));

    let host = host_with_mutable_module("modtap:shim", "/srv/modtap/shim");
    let interceptor = RequireInterceptor::new(engine, host);

    interceptor.load("modtap:shim").expect("load succeeds");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn detected_version_is_part_of_the_identity() {
    let engine = Arc::new(Engine::new());
    let calls = Arc::new(AtomicUsize::new(0));
    engine.register(counting_definition("foo", calls.clone()));

    let host = ToyHost::new();
    host.add_versioned_mutable(
        "foo",
        "/srv/foo/index",
        "2.1.0",
        Exports::from_values([("handle", Value::func(|_| Value::Null))]),
    );
    let interceptor = RequireInterceptor::new(engine.clone(), host);

    interceptor.load("foo").expect("load succeeds");
    interceptor.load("foo").expect("load succeeds");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let records = engine.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].identity.version, "2.1.0");
}

#[test]
fn reset_unwraps_and_forgets_everything() {
    let engine = Arc::new(Engine::new());
    engine.register(InstrumentationDefinition::new("foo").on_require(|shim, exports, _| {
        shim.wrap(exports, "handle", |inner| {
            let inner = inner.clone();
            FuncValue::new(move |args| inner.call(args))
        });
        Ok(None)
    }));

    let host = host_with_mutable_module("foo", "/srv/foo/index");
    let interceptor = RequireInterceptor::new(engine.clone(), host);

    let loaded = interceptor.load("foo").expect("load succeeds");
    assert!(is_wrapped(&loaded.exports.get("handle").expect("present")));

    engine.reset();
    assert!(!is_wrapped(&loaded.exports.get("handle").expect("present")));
    assert!(engine.registered_names().is_empty());
    assert!(engine.records().is_empty());
}
