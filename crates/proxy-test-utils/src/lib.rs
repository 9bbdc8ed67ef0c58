//! Testing utilities for the proxygen workspace
//!
//! Shared fixture types, interceptors and backends.

#![allow(missing_docs)]

use parking_lot::Mutex;
use proxy_core::{
    EmissionBackend, EmissionError, GeneratedProxyType, GeneratorConfig, Interceptor,
    InterpretingBackend, Invocation, ProxyDescriptor, ProxyGenerator, StandardInterceptor,
};
use proxy_model::{
    core_types, Accessibility, ArrayValue, AssemblyInfo, ConstructorSpec, InvocationError,
    MemberSpec, ParamKind, TypeHandle, TypeName, TypeRef, TypeSpec, Value,
    CONSTRUCTOR_CALLED_FIELD,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const TEST_ASSEMBLY: &str = "Proxy.Tests";
pub const TEST_NAMESPACE: &str = "Proxy.Tests";

pub fn test_assembly() -> Arc<AssemblyInfo> {
    AssemblyInfo::new(TEST_ASSEMBLY).shared()
}

/// Generator with its own cache, so tests do not share types
pub fn setup_generator() -> ProxyGenerator {
    ProxyGenerator::new(GeneratorConfig::new())
}

pub fn object_ref() -> TypeRef {
    TypeRef::of(&core_types().object)
}

pub fn string_ref() -> TypeRef {
    TypeRef::of(&core_types().string)
}

pub fn int_ref() -> TypeRef {
    TypeRef::of(&core_types().int32)
}

pub fn object_array(items: Vec<Value>) -> Value {
    Value::Array(ArrayValue::new(object_ref(), items))
}

pub fn string_array(items: Vec<Value>) -> Value {
    Value::Array(ArrayValue::new(string_ref(), items))
}

/// Label recorded by the constructor that initialized `instance`
pub fn constructor_called(instance: &proxy_core::ProxyInstance) -> Option<String> {
    instance
        .field(CONSTRUCTOR_CALLED_FIELD)
        .and_then(|v| v.as_str().map(str::to_string))
}

/// Class with overlapping constructors:
/// `()`, `(object)`, `(int)`, `(string)`, `(object[])`, `(string[])`,
/// `(object[], string)`, `(string[], string)`
pub fn class_with_various_constructors() -> TypeHandle {
    TypeSpec::class(
        TypeName::new(TEST_NAMESPACE, "ClassWithVariousConstructors"),
        &test_assembly(),
    )
    .constructor(ConstructorSpec::recording(vec![], "Default"))
    .constructor(ConstructorSpec::recording(vec![ParamKind::of(object_ref())], "Object"))
    .constructor(ConstructorSpec::recording(vec![ParamKind::of(int_ref())], "Int"))
    .constructor(ConstructorSpec::recording(vec![ParamKind::of(string_ref())], "String"))
    .constructor(ConstructorSpec::recording(
        vec![ParamKind::Array(object_ref())],
        "ArrayOfObjects",
    ))
    .constructor(ConstructorSpec::recording(
        vec![ParamKind::Array(string_ref())],
        "ArrayOfStrings",
    ))
    .constructor(ConstructorSpec::recording(
        vec![ParamKind::Array(object_ref()), ParamKind::of(string_ref())],
        "ArrayOfObjectsAndSingleString",
    ))
    .constructor(ConstructorSpec::recording(
        vec![ParamKind::Array(string_ref()), ParamKind::of(string_ref())],
        "ArrayAndSingleString",
    ))
    .build()
}

/// `(params string[])`
pub fn has_ctor_with_params_strings() -> TypeHandle {
    TypeSpec::class(TypeName::new(TEST_NAMESPACE, "HasCtorWithParamsStrings"), &test_assembly())
        .constructor(ConstructorSpec::recording(
            vec![ParamKind::Variadic(string_ref())],
            "ParamsStrings",
        ))
        .build()
}

/// `(params object[])`
pub fn has_ctor_with_params_argument() -> TypeHandle {
    TypeSpec::class(TypeName::new(TEST_NAMESPACE, "HasCtorWithParamsArgument"), &test_assembly())
        .constructor(ConstructorSpec::recording(
            vec![ParamKind::Variadic(object_ref())],
            "ParamsObjects",
        ))
        .build()
}

/// `(int, params object[])`
pub fn has_ctor_with_int_and_params_argument() -> TypeHandle {
    TypeSpec::class(
        TypeName::new(TEST_NAMESPACE, "HasCtorWithIntAndParamsArgument"),
        &test_assembly(),
    )
    .constructor(ConstructorSpec::recording(
        vec![ParamKind::of(int_ref()), ParamKind::Variadic(object_ref())],
        "IntAndParams",
    ))
    .build()
}

/// Fixed-array constructors competing with a `params` one:
/// `(string[])`, `(object[], string)`, `(params object[])`
pub fn class_with_params_overloads() -> TypeHandle {
    TypeSpec::class(TypeName::new(TEST_NAMESPACE, "ClassWithParamsOverloads"), &test_assembly())
        .constructor(ConstructorSpec::recording(
            vec![ParamKind::Array(string_ref())],
            "ArrayOfStrings",
        ))
        .constructor(ConstructorSpec::recording(
            vec![ParamKind::Array(object_ref()), ParamKind::of(string_ref())],
            "ArrayOfObjectsAndSingleString",
        ))
        .constructor(ConstructorSpec::recording(
            vec![ParamKind::Variadic(object_ref())],
            "ParamsObjects",
        ))
        .build()
}

/// `(params object[])` and `(params string[])`
pub fn class_with_competing_params() -> TypeHandle {
    TypeSpec::class(TypeName::new(TEST_NAMESPACE, "ClassWithCompetingParams"), &test_assembly())
        .constructor(ConstructorSpec::recording(
            vec![ParamKind::Variadic(object_ref())],
            "ParamsObjects",
        ))
        .constructor(ConstructorSpec::recording(
            vec![ParamKind::Variadic(string_ref())],
            "ParamsStrings",
        ))
        .build()
}

/// Public outer class hosting a private nested class
pub fn test_case_class() -> TypeHandle {
    TypeSpec::class(TypeName::new(TEST_NAMESPACE, "ClassProxyConstructorsTestCase"), &test_assembly())
        .build()
}

/// `ClassProxyConstructorsTestCase+PrivateClass`
pub fn private_class() -> TypeHandle {
    let outer = test_case_class();
    TypeSpec::class(outer.type_name().nested("PrivateClass"), &test_assembly())
        .nested_in(&outer)
        .accessibility(Accessibility::Private)
        .build()
}

/// Internal class whose assembly grants visibility to `friend`
pub fn internal_class(friend: &str) -> TypeHandle {
    let asm = AssemblyInfo::new("Proxy.Internals").with_friend(friend).shared();
    TypeSpec::class(TypeName::new("Proxy.Internals", "InternalService"), &asm)
        .accessibility(Accessibility::Internal)
        .build()
}

/// `List<arg>`
pub fn list_of(argument: TypeRef) -> TypeHandle {
    TypeSpec::make_generic(&core_types().list, vec![argument])
        .unwrap_or_else(|e| panic!("List`1 instantiation failed: {e}"))
}

pub fn my_own_interface() -> TypeHandle {
    TypeSpec::interface(TypeName::new(TEST_NAMESPACE, "IMyOwn"), &test_assembly()).build()
}

/// Abstract class declaring `virtual void Foo<T>(List<T>[])` and repeating
/// an interface its base already implements
pub fn my_own_class() -> TypeHandle {
    let asm = test_assembly();
    let iface = my_own_interface();
    let base = TypeSpec::class(TypeName::new(TEST_NAMESPACE, "MyOwnBase"), &asm)
        .implements(iface.clone())
        .build();
    let list_of_t = list_of(TypeRef::param("T"));
    TypeSpec::class(TypeName::new(TEST_NAMESPACE, "MyOwnClass"), &asm)
        .abstract_type()
        .base(base)
        .implements(iface)
        .member(
            MemberSpec::method("Foo")
                .generic_parameters(["T"])
                .parameter(ParamKind::Array(TypeRef::of(&list_of_t)))
                .virtual_member(),
        )
        .build()
}

/// Class with `Greet(string)`, `Count()`, a non-virtual `Fixed()` and an
/// abstract `Missing()`
pub fn greeter_class() -> TypeHandle {
    TypeSpec::class(TypeName::new(TEST_NAMESPACE, "Greeter"), &test_assembly())
        .abstract_type()
        .constructor(ConstructorSpec::default_constructor())
        .member(
            MemberSpec::method("Greet")
                .parameter(ParamKind::of(string_ref()))
                .returns(string_ref())
                .virtual_member()
                .body(|_, args| {
                    let name = args.first().and_then(Value::as_str).unwrap_or("nobody");
                    Ok(Value::from(format!("Hello, {name}")))
                }),
        )
        .member(
            MemberSpec::method("Count")
                .returns(int_ref())
                .virtual_member()
                .returning(Value::from(1)),
        )
        .member(MemberSpec::method("Fixed").returns(int_ref()).returning(Value::from(7)))
        .member(MemberSpec::method("Missing").virtual_member().abstract_member())
        .build()
}

/// Class whose constructor calls its own virtual `Initialize`
pub fn calls_virtual_in_constructor() -> TypeHandle {
    TypeSpec::class(TypeName::new(TEST_NAMESPACE, "CallsVirtualInConstructor"), &test_assembly())
        .constructor(ConstructorSpec::default_constructor().with_body(|receiver, _| {
            let result = receiver.invoke("Initialize", Vec::new())?;
            receiver.set_field("initialized", result);
            Ok(())
        }))
        .member(
            MemberSpec::method("Initialize")
                .virtual_member()
                .returning(Value::from("base")),
        )
        .build()
}

/// Class whose only constructor always fails
pub fn failing_constructor_class() -> TypeHandle {
    TypeSpec::class(TypeName::new(TEST_NAMESPACE, "FailingConstructor"), &test_assembly())
        .constructor(
            ConstructorSpec::default_constructor()
                .with_body(|_, _| Err(InvocationError::failed("constructor exploded"))),
        )
        .build()
}

/// Interceptor appending `"{name}:{member}"` to a shared log, then proceeding
#[derive(Debug, Clone)]
pub struct RecordingInterceptor {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingInterceptor {
    pub fn new(name: impl Into<String>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }

    pub fn shared(name: impl Into<String>, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn Interceptor> {
        Arc::new(Self::new(name, log.clone()))
    }
}

impl Interceptor for RecordingInterceptor {
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), InvocationError> {
        self.log
            .lock()
            .push(format!("{}:{}", self.name, invocation.method_name()));
        invocation.proceed()
    }
}

/// Interceptor returning a fixed value without proceeding
#[derive(Debug, Clone)]
pub struct ReturnValueInterceptor(pub Value);

impl ReturnValueInterceptor {
    pub fn shared(value: Value) -> Arc<dyn Interceptor> {
        Arc::new(Self(value))
    }
}

pub fn standard_interceptor() -> Arc<dyn Interceptor> {
    Arc::new(StandardInterceptor)
}

impl Interceptor for ReturnValueInterceptor {
    fn intercept(&self, invocation: &mut Invocation<'_>) -> Result<(), InvocationError> {
        invocation.set_return_value(self.0.clone());
        Ok(())
    }
}

/// Backend counting emissions before delegating to [`InterpretingBackend`]
#[derive(Debug)]
pub struct CountingBackend {
    inner: InterpretingBackend,
    emitted: AtomicUsize,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self {
            inner: InterpretingBackend::new("Counted.Proxies"),
            emitted: AtomicUsize::new(0),
        }
    }

    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::SeqCst)
    }
}

impl Default for CountingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl EmissionBackend for CountingBackend {
    fn emit(&self, descriptor: Arc<ProxyDescriptor>) -> Result<GeneratedProxyType, EmissionError> {
        self.emitted.fetch_add(1, Ordering::SeqCst);
        self.inner.emit(descriptor)
    }
}
