use modtap_common::{Exports, FuncValue, Namespace, Property, PropertyContainer, Value};
use pretty_assertions::assert_eq;

#[test]
fn exports_define_overrides_existing_data() {
    let exports = Exports::from_values([("mode", Value::str("plain"))]);
    exports.define(
        "mode",
        Property::Accessor {
            get: Some(FuncValue::new(|_| Value::str("computed"))),
            set: None,
        },
    );
    assert_eq!(exports.get("mode"), Some(Value::str("computed")));
}

#[test]
fn callable_properties_survive_cloning_the_handle() {
    let mut callable = FuncValue::new(|args| args.first().cloned().unwrap_or_default());
    callable.set_prop("version", Value::str("1.2.3"));
    let exports = Exports::from_values([("echo", Value::Func(callable))]);

    let handle = exports.clone();
    let via_clone = handle.get("echo").expect("present");
    let func = via_clone.as_func().expect("callable");
    assert_eq!(func.prop("version"), Some(&Value::str("1.2.3")));
    assert_eq!(func.call(&[Value::Int(9)]), Value::Int(9));
}

#[test]
fn namespace_bindings_enumerate_sorted() {
    let namespace = Namespace::from_bindings([
        ("zeta", Value::Null),
        ("alpha", Value::Null),
        ("default", Value::Int(1)),
    ]);
    assert_eq!(
        namespace.binding_names(),
        vec![
            "alpha".to_string(),
            "default".to_string(),
            "zeta".to_string()
        ]
    );
    assert_eq!(namespace.len(), 3);
}
