//! Constructor argument binding
//!
//! Chooses which constructor (or method overload) an argument list calls.
//!
//! Every candidate is considered in its *normal form*, where each argument
//! matches one parameter and a `params` parameter takes a ready-made array,
//! and, only when the normal form does not apply and the last parameter is
//! `params`, in its *expanded form*, where trailing arguments each match the
//! element type. Applicable forms are ranked argument by argument:
//!
//! 1. an exact type match beats a widening conversion;
//! 2. otherwise the more specific parameter type (the one assignable to the
//!    other) wins; unrelated parameter types are equally good.
//!
//! A form beats another when it is no worse on any argument and better on
//! at least one. When every argument ties, a normal form beats an expanded
//! one, an expanded form absorbing fewer trailing arguments beats one
//! absorbing more, and finally more specific declared parameters win. A
//! unique form beating every other binds; otherwise the call is ambiguous.

use crate::error::GenerationError;
use crate::validator::ProxyValidator;
use proxy_model::{ArrayValue, ConstructorSignature, ParamKind, TypeRef, TypeSpec, Value};
use std::cmp::Ordering;

/// Chosen overload with reshaped arguments
#[derive(Debug, Clone, PartialEq)]
pub struct OverloadMatch {
    /// Candidate index as supplied by the caller
    pub index: usize,
    /// Whether the expanded (`params`) form was chosen
    pub expanded: bool,
    /// One value per formal parameter; expanded trailing arguments are packed into an array
    pub arguments: Vec<Value>,
}

/// Why no overload was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverloadError {
    /// No candidate accepts the arguments
    NoMatch,
    /// Several candidates accept the arguments equally well (indices of the undominated ones)
    Ambiguous(Vec<usize>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Exact,
    Widened,
}

/// One applicable form of a candidate
struct Applicable<'a> {
    index: usize,
    parameters: &'a [ParamKind],
    expanded: bool,
    /// Arguments absorbed by the `params` element type (expanded forms only)
    absorbed: usize,
    /// Parameter type each argument is matched against
    effective: Vec<TypeRef>,
    conversions: Vec<Conversion>,
}

/// Resolve an overload among `candidates` for `arguments`
///
/// # Errors
/// [`OverloadError::NoMatch`] if no form applies, [`OverloadError::Ambiguous`]
/// if no single form beats every other
pub fn bind_overload<'a, I>(candidates: I, arguments: Vec<Value>) -> Result<OverloadMatch, OverloadError>
where
    I: IntoIterator<Item = (usize, &'a [ParamKind])>,
{
    let applicable: Vec<Applicable<'a>> = candidates
        .into_iter()
        .filter_map(|(index, parameters)| {
            normal_form(index, parameters, &arguments)
                .or_else(|| expanded_form(index, parameters, &arguments))
        })
        .collect();

    if applicable.is_empty() {
        return Err(OverloadError::NoMatch);
    }

    let winners: Vec<&Applicable<'a>> = applicable
        .iter()
        .filter(|a| {
            applicable
                .iter()
                .all(|b| std::ptr::eq(*a, b) || beats(a, b, &arguments))
        })
        .collect();

    match winners.as_slice() {
        [winner] => Ok(OverloadMatch {
            index: winner.index,
            expanded: winner.expanded,
            arguments: reshape(winner, arguments),
        }),
        _ => {
            let undominated = applicable
                .iter()
                .filter(|a| !applicable.iter().any(|b| beats(b, a, &arguments)))
                .map(|a| a.index)
                .collect();
            Err(OverloadError::Ambiguous(undominated))
        }
    }
}

fn normal_form<'a>(index: usize, parameters: &'a [ParamKind], arguments: &[Value]) -> Option<Applicable<'a>> {
    if parameters.len() != arguments.len() {
        return None;
    }
    let effective: Vec<TypeRef> = parameters.iter().map(ParamKind::declared_type).collect();
    let conversions = convert_all(&effective, arguments)?;
    Some(Applicable {
        index,
        parameters,
        expanded: false,
        absorbed: 0,
        effective,
        conversions,
    })
}

fn expanded_form<'a>(index: usize, parameters: &'a [ParamKind], arguments: &[Value]) -> Option<Applicable<'a>> {
    let (last, fixed) = parameters.split_last()?;
    let ParamKind::Variadic(element) = last else {
        return None;
    };
    if arguments.len() < fixed.len() {
        return None;
    }
    let absorbed = arguments.len() - fixed.len();
    let effective: Vec<TypeRef> = fixed
        .iter()
        .map(ParamKind::declared_type)
        .chain(std::iter::repeat(element.clone()).take(absorbed))
        .collect();
    let conversions = convert_all(&effective, arguments)?;
    Some(Applicable {
        index,
        parameters,
        expanded: true,
        absorbed,
        effective,
        conversions,
    })
}

fn convert_all(effective: &[TypeRef], arguments: &[Value]) -> Option<Vec<Conversion>> {
    effective
        .iter()
        .zip(arguments)
        .map(|(param, arg)| conversion(param, arg))
        .collect()
}

/// How `argument` converts to `param`, `None` if it cannot
fn conversion(param: &TypeRef, argument: &Value) -> Option<Conversion> {
    match argument.runtime_type() {
        Some(actual) if actual == *param => Some(Conversion::Exact),
        _ if param.contains_generic_parameters() => Some(Conversion::Widened),
        None => param.accepts_null().then_some(Conversion::Widened),
        Some(actual) => param.is_assignable_from(&actual).then_some(Conversion::Widened),
    }
}

/// Compare how well two parameter types receive one argument
fn compare_argument(a: (&TypeRef, Conversion), b: (&TypeRef, Conversion)) -> Ordering {
    match (a.1, b.1) {
        (Conversion::Exact, Conversion::Widened) => Ordering::Greater,
        (Conversion::Widened, Conversion::Exact) => Ordering::Less,
        _ => specificity(a.0, b.0),
    }
}

/// `Greater` if `a` is strictly more specific than `b`
fn specificity(a: &TypeRef, b: &TypeRef) -> Ordering {
    if a == b || a.contains_generic_parameters() || b.contains_generic_parameters() {
        return Ordering::Equal;
    }
    match (b.is_assignable_from(a), a.is_assignable_from(b)) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// Whether `a` is a strictly better form than `b`
fn beats(a: &Applicable<'_>, b: &Applicable<'_>, arguments: &[Value]) -> bool {
    let mut better = false;
    for i in 0..arguments.len() {
        match compare_argument(
            (&a.effective[i], a.conversions[i]),
            (&b.effective[i], b.conversions[i]),
        ) {
            Ordering::Less => return false,
            Ordering::Greater => better = true,
            Ordering::Equal => {}
        }
    }
    if better {
        return true;
    }

    match (a.expanded, b.expanded) {
        (false, true) => return true,
        (true, false) => return false,
        (true, true) if a.absorbed != b.absorbed => return a.absorbed < b.absorbed,
        _ => {}
    }

    declared_more_specific(a.parameters, b.parameters)
}

fn declared_more_specific(a: &[ParamKind], b: &[ParamKind]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut better = false;
    for (pa, pb) in a.iter().zip(b) {
        match specificity(&pa.declared_type(), &pb.declared_type()) {
            Ordering::Less => return false,
            Ordering::Greater => better = true,
            Ordering::Equal => {}
        }
    }
    better
}

fn reshape(form: &Applicable<'_>, mut arguments: Vec<Value>) -> Vec<Value> {
    if !form.expanded {
        return arguments;
    }
    let fixed = form.parameters.len() - 1;
    let trailing = arguments.split_off(fixed);
    let element = form
        .parameters
        .last()
        .and_then(ParamKind::element_type)
        .cloned();
    if let Some(element) = element {
        arguments.push(Value::Array(ArrayValue::new(element, trailing)));
    }
    arguments
}

/// Render argument runtime types for diagnostics: `System.String, null`
#[must_use]
pub fn describe_arguments(arguments: &[Value]) -> String {
    arguments
        .iter()
        .map(|arg| {
            arg.runtime_type()
                .map_or_else(|| "null".to_string(), |t| t.full_name())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// A constructor chosen for an argument list
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorBinding {
    /// Index into the target's declared constructors
    pub constructor_index: usize,
    /// Signature of the chosen constructor
    pub signature: ConstructorSignature,
    /// Whether the `params` expanded form was chosen
    pub expanded: bool,
    /// Arguments reshaped to one value per formal parameter
    pub arguments: Vec<Value>,
}

/// Binds constructor arguments against a target's accessible constructors
#[derive(Debug, Clone)]
pub struct ConstructorBinder {
    validator: ProxyValidator,
}

impl ConstructorBinder {
    /// Create binder; constructor accessibility is judged by `validator`
    #[inline]
    #[must_use]
    pub fn new(validator: ProxyValidator) -> Self {
        Self { validator }
    }

    /// Choose the constructor of `target` that `arguments` call
    ///
    /// # Errors
    /// [`ConstructorBindingFailed`](crate::GenerationErrorKind::ConstructorBindingFailed)
    /// when no accessible constructor applies or several apply equally well
    pub fn bind(&self, target: &TypeSpec, arguments: Vec<Value>) -> Result<ConstructorBinding, GenerationError> {
        let constructors = target.constructors();
        let candidates = constructors
            .iter()
            .enumerate()
            .filter(|(_, ctor)| self.validator.is_member_accessible(target, ctor.accessibility()))
            .map(|(i, ctor)| (i, ctor.signature().parameters()));

        let described = describe_arguments(&arguments);
        match bind_overload(candidates, arguments) {
            Ok(chosen) => Ok(ConstructorBinding {
                constructor_index: chosen.index,
                signature: constructors[chosen.index].signature().clone(),
                expanded: chosen.expanded,
                arguments: chosen.arguments,
            }),
            Err(OverloadError::NoMatch) => Err(GenerationError::no_matching_constructor(target, &described)),
            Err(OverloadError::Ambiguous(tied)) => {
                let signatures: Vec<String> = tied
                    .iter()
                    .map(|&i| constructors[i].signature().to_string())
                    .collect();
                Err(GenerationError::ambiguous_constructor(target, &described, &signatures))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proxy_model::core_types;

    fn object() -> TypeRef {
        TypeRef::of(&core_types().object)
    }

    fn string() -> TypeRef {
        TypeRef::of(&core_types().string)
    }

    fn int() -> TypeRef {
        TypeRef::of(&core_types().int32)
    }

    fn bind(candidates: &[Vec<ParamKind>], arguments: Vec<Value>) -> Result<OverloadMatch, OverloadError> {
        bind_overload(
            candidates.iter().enumerate().map(|(i, p)| (i, p.as_slice())),
            arguments,
        )
    }

    #[test]
    fn exact_beats_widened() {
        let candidates = vec![vec![ParamKind::Exact(object())], vec![ParamKind::Exact(string())]];
        let chosen = bind(&candidates, vec![Value::from("x")]).unwrap();
        assert_eq!(chosen.index, 1);
    }

    #[test]
    fn null_prefers_more_specific_reference() {
        let candidates = vec![vec![ParamKind::Exact(object())], vec![ParamKind::Exact(string())]];
        assert_eq!(bind(&candidates, vec![Value::Null]).unwrap().index, 1);
    }

    #[test]
    fn null_never_matches_value_type() {
        let candidates = vec![vec![ParamKind::Exact(int())]];
        assert_eq!(bind(&candidates, vec![Value::Null]), Err(OverloadError::NoMatch));
    }

    #[test]
    fn unrelated_references_with_null_are_ambiguous() {
        let candidates = vec![
            vec![ParamKind::Exact(string())],
            vec![ParamKind::Array(object())],
        ];
        assert_eq!(
            bind(&candidates, vec![Value::Null]),
            Err(OverloadError::Ambiguous(vec![0, 1]))
        );
    }

    #[test]
    fn array_covariance() {
        let candidates = vec![vec![ParamKind::Array(object())]];
        let strings = Value::from(ArrayValue::new(string(), vec![]));
        assert_eq!(bind(&candidates, vec![strings]).unwrap().index, 0);

        let ints = Value::from(ArrayValue::new(int(), vec![]));
        assert_eq!(bind(&candidates, vec![ints]), Err(OverloadError::NoMatch));
    }

    #[test]
    fn expanded_form_packs_trailing_arguments() {
        let candidates = vec![vec![ParamKind::Exact(int()), ParamKind::Variadic(string())]];
        let chosen = bind(&candidates, vec![Value::from(5), Value::from("a"), Value::from("b")]).unwrap();

        assert!(chosen.expanded);
        assert_eq!(
            chosen.arguments,
            vec![
                Value::from(5),
                Value::from(ArrayValue::new(string(), vec![Value::from("a"), Value::from("b")])),
            ]
        );
    }

    #[test]
    fn empty_expanded_form() {
        let candidates = vec![vec![ParamKind::Variadic(string())]];
        let chosen = bind(&candidates, vec![]).unwrap();
        assert!(chosen.expanded);
        assert_eq!(chosen.arguments, vec![Value::from(ArrayValue::empty(string()))]);
    }

    #[test]
    fn normal_form_preferred_over_expanded() {
        let candidates = vec![vec![], vec![ParamKind::Variadic(object())]];
        let chosen = bind(&candidates, vec![]).unwrap();
        assert_eq!(chosen.index, 0);
        assert!(!chosen.expanded);
    }

    #[test]
    fn prepacked_array_uses_normal_form() {
        let candidates = vec![vec![ParamKind::Variadic(string())]];
        let packed = Value::from(ArrayValue::new(string(), vec![Value::from("a")]));
        let chosen = bind(&candidates, vec![packed.clone()]).unwrap();
        assert!(!chosen.expanded);
        assert_eq!(chosen.arguments, vec![packed]);
    }

    #[test]
    fn fewer_absorbed_arguments_win() {
        let candidates = vec![
            vec![ParamKind::Variadic(object())],
            vec![ParamKind::Exact(object()), ParamKind::Variadic(object())],
        ];
        let chosen = bind(&candidates, vec![Value::from(1), Value::from(2)]).unwrap();
        assert_eq!(chosen.index, 1);
    }

    #[test]
    fn more_specific_params_array_wins_on_empty_call() {
        let candidates = vec![
            vec![ParamKind::Variadic(string())],
            vec![ParamKind::Variadic(object())],
        ];
        assert_eq!(bind(&candidates, vec![]).unwrap().index, 0);
    }

    #[test]
    fn generic_parameters_accept_anything() {
        let candidates = vec![vec![ParamKind::Exact(TypeRef::param("T"))]];
        assert_eq!(bind(&candidates, vec![Value::from(3)]).unwrap().index, 0);
        assert_eq!(bind(&candidates, vec![Value::Null]).unwrap().index, 0);
    }

    #[test]
    fn describe_arguments_lists_types() {
        assert_eq!(
            describe_arguments(&[Value::from("a"), Value::Null, Value::from(1)]),
            "System.String, null, System.Int32"
        );
    }
}
