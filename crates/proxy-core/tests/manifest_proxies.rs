use pretty_assertions::assert_eq;
use proxy_core::GenerationErrorKind;
use proxy_model::{TypeExpr, TypeManifest, TypeRegistry, Value};
use proxy_test_utils::*;
use serde_json::json;

const DEMO: &str = include_str!("../../../demos/various_constructors.json");

fn load_demo() -> TypeRegistry {
    let registry = TypeRegistry::new();
    TypeManifest::from_json_str(DEMO)
        .unwrap()
        .load_into(&registry)
        .unwrap();
    registry
}

#[test]
fn test_manifest_constructors_bind_like_declared_ones() {
    let registry = load_demo();
    let generator = setup_generator();
    let target = registry.require("Demo.ClassWithVariousConstructors").unwrap();

    let cases = [
        (json!([]), "Default"),
        (json!([{"array": "object", "items": [null]}, "foo"]), "ArrayOfObjectsAndSingleString"),
        (json!([{"array": "string", "items": [null]}, "foo"]), "ArrayAndSingleString"),
        (json!([{"array": "string", "items": []}]), "ArrayOfStrings"),
        (json!([7]), "Int"),
    ];
    for (args, expected) in cases {
        let arguments = registry.values_from_json(&args).unwrap();
        let proxy = generator.create_class_proxy_with_args(&target, arguments).unwrap();
        assert_eq!(constructor_called(&proxy).as_deref(), Some(expected), "{args}");
    }
}

#[test]
fn test_manifest_params_constructor() {
    let registry = load_demo();
    let generator = setup_generator();
    let target = registry.require("Demo.HasCtorWithIntAndParamsArgument").unwrap();

    let proxy = generator
        .create_class_proxy_with_args(&target, vec![Value::from(5)])
        .unwrap();
    assert_eq!(constructor_called(&proxy).as_deref(), Some("IntAndParams"));
}

#[test]
fn test_manifest_method_results_flow_through_interceptors() {
    let registry = load_demo();
    let generator = setup_generator();
    let target = registry.require("Demo.ClassWithVariousConstructors").unwrap();

    let proxy = generator.create_class_proxy(&target, vec![standard_interceptor()]).unwrap();
    assert_eq!(proxy.invoke("Describe", vec![]), Ok(Value::from("various")));
}

#[test]
fn test_manifest_visibility_grants() {
    let registry = load_demo();
    let generator = setup_generator();

    let granted = registry.require("Demo.InternalService").unwrap();
    let proxy = generator.create_class_proxy(&granted, vec![]).unwrap();
    assert_eq!(proxy.invoke("Ping", vec![]), Ok(Value::from(1)));

    let hidden = registry.require("Sealed.Off.Hidden").unwrap();
    let err = generator.create_class_proxy(&hidden, vec![]).unwrap_err();
    assert_eq!(err.generation_kind(), Some(GenerationErrorKind::TypeNotAccessible));
}

#[test]
fn test_manifest_generic_definition_and_instantiation() {
    let registry = load_demo();
    let generator = setup_generator();

    let definition = registry.require("Demo.Repository`1").unwrap();
    let err = generator.create_class_proxy(&definition, vec![]).unwrap_err();
    assert_eq!(err.generation_kind(), Some(GenerationErrorKind::OpenGenericType));

    let expr: TypeExpr =
        serde_json::from_value(json!({"generic": "Demo.Repository`1", "args": ["string"]})).unwrap();
    let closed = registry.resolve(&expr, &[]).unwrap();
    let closed = closed.as_type().unwrap();
    let proxy = generator.create_class_proxy(closed, vec![]).unwrap();
    assert_eq!(proxy.invoke("Store", vec![Value::from("item")]), Ok(Value::Null));
    assert!(matches!(
        proxy.invoke("Store", vec![Value::from(1)]),
        Err(proxy_model::InvocationError::NoMatchingOverload { .. })
    ));
}

#[test]
fn test_manifest_interface_is_added() {
    let registry = load_demo();
    let generator = setup_generator();
    let target = registry.require("Demo.ClassWithVariousConstructors").unwrap();
    let greeter = registry.require("Demo.IGreeter").unwrap();

    let proxy_type = generator
        .generate_class_proxy_type(&target, &[greeter.clone()], &Default::default())
        .unwrap();
    assert_eq!(proxy_type.interfaces(), [greeter]);
}
