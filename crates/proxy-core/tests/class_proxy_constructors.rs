use pretty_assertions::assert_eq;
use proxy_core::{GenerationErrorKind, ProxyError, ProxyGenerationOptions};
use proxy_model::{core_types, TypeRef, TypeSpec, Value};
use proxy_test_utils::*;

fn generation_error(result: Result<proxy_core::ProxyInstance, ProxyError>) -> proxy_core::GenerationError {
    match result {
        Err(ProxyError::Generation(err)) => err,
        Err(other) => panic!("expected generation error, got {other}"),
        Ok(instance) => panic!("expected generation error, got {instance:?}"),
    }
}

#[test]
fn test_generates_type_with_duplicated_base_interfaces() {
    let generator = setup_generator();
    let proxy = generator
        .create_class_proxy_with(
            &my_own_class(),
            &[],
            &ProxyGenerationOptions::default(),
            vec![],
            vec![standard_interceptor()],
        )
        .unwrap();

    assert_eq!(proxy.proxy_type().base_type().full_name(), "Proxy.Tests.MyOwnClass");
    assert!(proxy.proxy_type().interfaces().is_empty());
}

#[test]
fn test_array_of_objects_and_string() {
    let generator = setup_generator();
    let proxy = generator
        .create_class_proxy_with_args(
            &class_with_various_constructors(),
            vec![object_array(vec![Value::Null]), Value::from("foo")],
        )
        .unwrap();
    assert_eq!(constructor_called(&proxy).as_deref(), Some("ArrayOfObjectsAndSingleString"));
}

#[test]
fn test_array_of_strings_and_string() {
    let generator = setup_generator();
    let proxy = generator
        .create_class_proxy_with_args(
            &class_with_various_constructors(),
            vec![string_array(vec![Value::Null]), Value::from("foo")],
        )
        .unwrap();
    assert_eq!(constructor_called(&proxy).as_deref(), Some("ArrayAndSingleString"));
}

#[test]
fn test_empty_string_array_binds_array_of_strings() {
    let generator = setup_generator();
    let proxy = generator
        .create_class_proxy_with_args(&class_with_various_constructors(), vec![string_array(vec![])])
        .unwrap();
    assert_eq!(constructor_called(&proxy).as_deref(), Some("ArrayOfStrings"));
}

#[test]
fn test_array_of_objects_with_single_null() {
    let generator = setup_generator();
    let proxy = generator
        .create_class_proxy_with_args(
            &class_with_various_constructors(),
            vec![object_array(vec![Value::Null])],
        )
        .unwrap();
    assert_eq!(constructor_called(&proxy).as_deref(), Some("ArrayOfObjects"));
}

#[test]
fn test_nothing_binds_default_constructor() {
    let generator = setup_generator();
    let proxy = generator
        .create_class_proxy(&class_with_various_constructors(), vec![])
        .unwrap();
    assert_eq!(constructor_called(&proxy).as_deref(), Some("Default"));
    assert_eq!(proxy.constructed_with().arity(), 0);
}

#[test]
fn test_int_binds_int_constructor() {
    let generator = setup_generator();
    let proxy = generator
        .create_class_proxy_with_args(&class_with_various_constructors(), vec![Value::from(3)])
        .unwrap();
    assert_eq!(constructor_called(&proxy).as_deref(), Some("Int"));
}

#[test]
fn test_single_null_is_ambiguous() {
    let generator = setup_generator();
    let err = generation_error(
        generator.create_class_proxy_with_args(&class_with_various_constructors(), vec![Value::Null]),
    );

    assert_eq!(err.kind(), GenerationErrorKind::ConstructorBindingFailed);
    assert!(err.message().contains("(System.String)"), "{}", err.message());
    assert!(err.message().contains("(System.String[])"), "{}", err.message());
}

#[test]
fn test_unmatched_arguments_fail_binding() {
    let generator = setup_generator();
    let err = generation_error(generator.create_class_proxy_with_args(
        &class_with_various_constructors(),
        vec![Value::from(1), Value::from(2), Value::from(3)],
    ));

    assert_eq!(err.kind(), GenerationErrorKind::ConstructorBindingFailed);
    assert_eq!(
        err.message(),
        "Can not instantiate proxy of class: Proxy.Tests.ClassWithVariousConstructors. \
         Could not find a constructor that would match given arguments: \
         (System.Int32, System.Int32, System.Int32)"
    );
}

#[test]
fn test_params_strings_with_no_arguments() {
    let generator = setup_generator();
    let proxy = generator
        .create_class_proxy_with_args(&has_ctor_with_params_strings(), vec![])
        .unwrap();
    assert_eq!(constructor_called(&proxy).as_deref(), Some("ParamsStrings"));
    assert!(proxy.constructed_with().is_variadic());
}

#[test]
fn test_params_objects_with_no_arguments() {
    let generator = setup_generator();
    let proxy = generator
        .create_class_proxy_with_args(&has_ctor_with_params_argument(), vec![])
        .unwrap();
    assert_eq!(constructor_called(&proxy).as_deref(), Some("ParamsObjects"));
}

#[test]
fn test_params_inline_after_fixed_argument() {
    let generator = setup_generator();
    let proxy = generator
        .create_class_proxy_with_args(&has_ctor_with_int_and_params_argument(), vec![Value::from(5)])
        .unwrap();
    assert_eq!(constructor_called(&proxy).as_deref(), Some("IntAndParams"));
}

#[test]
fn test_empty_string_array_prefers_fixed_array_over_params() {
    let generator = setup_generator();
    let proxy = generator
        .create_class_proxy_with_args(&class_with_params_overloads(), vec![string_array(vec![])])
        .unwrap();
    assert_eq!(constructor_called(&proxy).as_deref(), Some("ArrayOfStrings"));
    assert!(!proxy.constructed_with().is_variadic());
}

#[test]
fn test_array_and_string_prefer_fixed_constructor_over_params() {
    let generator = setup_generator();
    let proxy = generator
        .create_class_proxy_with_args(
            &class_with_params_overloads(),
            vec![object_array(vec![Value::Null]), Value::from("foo")],
        )
        .unwrap();
    assert_eq!(constructor_called(&proxy).as_deref(), Some("ArrayOfObjectsAndSingleString"));
}

#[test]
fn test_params_overloads_fall_back_to_expanded_form() {
    let generator = setup_generator();
    let target = class_with_params_overloads();

    let empty = generator.create_class_proxy_with_args(&target, vec![]).unwrap();
    assert_eq!(constructor_called(&empty).as_deref(), Some("ParamsObjects"));

    let strings = generator
        .create_class_proxy_with_args(&target, vec![Value::from("a"), Value::from("b")])
        .unwrap();
    assert_eq!(constructor_called(&strings).as_deref(), Some("ParamsObjects"));
}

#[test]
fn test_strings_prefer_params_strings_over_params_objects() {
    let generator = setup_generator();
    let target = class_with_competing_params();

    let expanded = generator
        .create_class_proxy_with_args(&target, vec![Value::from("a"), Value::from("b")])
        .unwrap();
    assert_eq!(constructor_called(&expanded).as_deref(), Some("ParamsStrings"));

    let packed = generator
        .create_class_proxy_with_args(&target, vec![string_array(vec![Value::from("a")])])
        .unwrap();
    assert_eq!(constructor_called(&packed).as_deref(), Some("ParamsStrings"));
}

#[test]
fn test_params_constructor_receives_packed_array() {
    let generator = setup_generator();
    let target = TypeSpec::class(
        proxy_model::TypeName::new(TEST_NAMESPACE, "PacksParams"),
        &test_assembly(),
    )
    .constructor(
        proxy_model::ConstructorSpec::new(vec![
            proxy_model::ParamKind::of(int_ref()),
            proxy_model::ParamKind::Variadic(object_ref()),
        ])
        .with_body(|receiver, args| {
            let packed = args[1].as_array().map_or(0, proxy_model::ArrayValue::len);
            receiver.set_field("packed", Value::from(i32::try_from(packed).unwrap_or(-1)));
            Ok(())
        }),
    )
    .build();

    let proxy = generator
        .create_class_proxy_with_args(&target, vec![Value::from(5), Value::from("a"), Value::Null])
        .unwrap();
    assert_eq!(proxy.field("packed"), Some(Value::from(2)));
}

#[test]
fn test_cannot_proxy_open_generic_type() {
    let generator = setup_generator();
    let err = generation_error(generator.create_class_proxy(&core_types().list, vec![]));

    assert_eq!(err.kind(), GenerationErrorKind::OpenGenericType);
    assert_eq!(
        err.to_string(),
        "Can not create proxy for type System.Collections.Generic.List`1 because it is an open generic type."
    );
}

#[test]
fn test_cannot_proxy_generic_type_with_open_generic_argument() {
    let generator = setup_generator();
    let target = list_of(TypeRef::of(&core_types().list));
    let err = generation_error(generator.create_class_proxy(&target, vec![]));

    assert_eq!(err.kind(), GenerationErrorKind::OpenGenericType);
    assert_eq!(
        err.message(),
        format!(
            "Can not create proxy for type {} because type System.Collections.Generic.List`1 is an open generic type.",
            target.full_name()
        )
    );
}

#[test]
fn test_cannot_proxy_generic_type_with_unbound_parameter() {
    let generator = setup_generator();
    let err = generation_error(generator.create_class_proxy(&list_of(TypeRef::param("T")), vec![]));
    assert_eq!(err.kind(), GenerationErrorKind::OpenGenericType);
    assert!(err.message().ends_with("because type T is an open generic type."));
}

#[test]
fn test_cannot_proxy_inaccessible_class() {
    let generator = setup_generator();
    let err = generation_error(generator.create_class_proxy(&private_class(), vec![]));

    assert_eq!(err.kind(), GenerationErrorKind::TypeNotAccessible);
    assert!(err.message().starts_with(
        "Can not create proxy for type Proxy.Tests.ClassProxyConstructorsTestCase+PrivateClass \
         because it is not accessible. Make it public, or internal"
    ));
}

#[test]
fn test_cannot_proxy_generic_class_with_inaccessible_type_argument() {
    let generator = setup_generator();
    let target = list_of(TypeRef::of(&private_class()));
    let err = generation_error(generator.create_class_proxy(&target, vec![]));

    assert_eq!(err.kind(), GenerationErrorKind::TypeNotAccessible);
    assert!(err.message().starts_with(
        "Can not create proxy for type System.Collections.Generic.List`1\
         [[Proxy.Tests.ClassProxyConstructorsTestCase+PrivateClass, Proxy.Tests]] \
         because type Proxy.Tests.ClassProxyConstructorsTestCase+PrivateClass is not accessible. \
         Make it public, or internal"
    ));
}

#[test]
fn test_cannot_proxy_generic_class_with_nested_inaccessible_type_argument() {
    let generator = setup_generator();
    let private = private_class();
    let target = list_of(TypeRef::of(&list_of(TypeRef::of(&private))));
    let err = generation_error(generator.create_class_proxy(&target, vec![]));

    let expected = format!(
        "Can not create proxy for type {} because type {} is not accessible. Make it public, or internal",
        target.full_name(),
        private.full_name()
    );
    assert_eq!(err.kind(), GenerationErrorKind::TypeNotAccessible);
    assert!(err.message().starts_with(&expected), "{}", err.message());
}

#[test]
fn test_internal_class_needs_visibility_grant() {
    let granted = setup_generator();
    let friend = granted.config().generation_assembly.clone();
    assert!(granted.create_class_proxy(&internal_class(&friend), vec![]).is_ok());

    let err = generation_error(granted.create_class_proxy(&internal_class("SomeoneElse"), vec![]));
    assert_eq!(err.kind(), GenerationErrorKind::TypeNotAccessible);
    assert!(err.message().contains(&friend));
}

#[test]
fn test_can_proxy_generic_class() {
    let generator = setup_generator();
    let target = list_of(object_ref());
    let proxy = generator.create_class_proxy(&target, vec![]).unwrap();

    assert_eq!(proxy.proxy_type().base_type(), &target);
    assert_eq!(proxy.invoke("Add", vec![Value::from("x")]), Ok(Value::Null));
}

#[test]
fn test_sealed_and_non_class_targets_are_rejected() {
    let generator = setup_generator();

    let err = generation_error(generator.create_class_proxy(&core_types().string, vec![]));
    assert_eq!(err.kind(), GenerationErrorKind::SealedType);

    let err = generation_error(generator.create_class_proxy(&my_own_interface(), vec![]));
    assert_eq!(err.kind(), GenerationErrorKind::NotAClass);
}

#[test]
fn test_rejected_target_is_not_cached() {
    let generator = setup_generator();
    let err = generation_error(generator.create_class_proxy(&private_class(), vec![standard_interceptor()]));
    assert_eq!(err.kind(), GenerationErrorKind::TypeNotAccessible);
    assert_eq!(generator.cache_stats().entry_count, 0);
}
