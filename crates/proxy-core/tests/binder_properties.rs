use proptest::prelude::*;
use proxy_core::{bind_overload, OverloadError};
use proxy_model::{ParamKind, TypeRef, Value};
use proxy_test_utils::*;

fn param_pool() -> Vec<ParamKind> {
    vec![
        ParamKind::of(object_ref()),
        ParamKind::of(string_ref()),
        ParamKind::of(int_ref()),
        ParamKind::Array(object_ref()),
        ParamKind::Array(string_ref()),
    ]
}

fn variadic_pool() -> Vec<ParamKind> {
    vec![
        ParamKind::Variadic(object_ref()),
        ParamKind::Variadic(string_ref()),
        ParamKind::Variadic(int_ref()),
    ]
}

fn value_pool() -> Vec<Value> {
    vec![
        Value::Null,
        Value::from(1),
        Value::from("s"),
        object_array(vec![Value::Null]),
        string_array(vec![]),
    ]
}

fn signature_strategy() -> impl Strategy<Value = Vec<ParamKind>> {
    (
        proptest::collection::vec(0..5usize, 0..3),
        proptest::option::of(0..3usize),
    )
        .prop_map(|(fixed, variadic)| {
            let pool = param_pool();
            let mut params: Vec<ParamKind> = fixed.into_iter().map(|i| pool[i].clone()).collect();
            if let Some(v) = variadic {
                params.push(variadic_pool()[v].clone());
            }
            params
        })
}

fn accepts(param: &TypeRef, value: &Value) -> bool {
    match value.runtime_type() {
        None => param.accepts_null(),
        Some(actual) => param.is_assignable_from(&actual),
    }
}

proptest! {
    #[test]
    fn prop_chosen_overload_accepts_reshaped_arguments(
        signatures in proptest::collection::vec(signature_strategy(), 1..6),
        picks in proptest::collection::vec(0..5usize, 0..4),
    ) {
        let pool = value_pool();
        let arguments: Vec<Value> = picks.into_iter().map(|i| pool[i].clone()).collect();
        let candidates = signatures
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.as_slice()));

        match bind_overload(candidates, arguments) {
            Ok(chosen) => {
                let params = &signatures[chosen.index];
                prop_assert_eq!(chosen.arguments.len(), params.len());
                prop_assert!(!chosen.expanded || params.last().is_some_and(ParamKind::is_variadic));
                for (param, arg) in params.iter().zip(&chosen.arguments) {
                    if chosen.expanded && param.is_variadic() {
                        let packed = arg.as_array();
                        prop_assert!(packed.is_some());
                        if let (Some(packed), Some(element)) = (packed, param.element_type()) {
                            for item in packed.items() {
                                prop_assert!(accepts(element, item));
                            }
                        }
                    } else {
                        prop_assert!(accepts(&param.declared_type(), arg));
                    }
                }
            }
            Err(OverloadError::Ambiguous(tied)) => {
                prop_assert!(tied.iter().all(|&i| i < signatures.len()));
            }
            Err(OverloadError::NoMatch) => {}
        }
    }
}

#[test]
fn test_identical_signatures_are_ambiguous() {
    let candidates = [vec![ParamKind::of(string_ref())], vec![ParamKind::of(string_ref())]];
    let result = bind_overload(
        candidates.iter().enumerate().map(|(i, p)| (i, p.as_slice())),
        vec![Value::from("x")],
    );
    assert_eq!(result, Err(OverloadError::Ambiguous(vec![0, 1])));
}
