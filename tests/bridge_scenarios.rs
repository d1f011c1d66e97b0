//=====================================================
// File: tests/bridge_scenarios.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: End-to-end checks of the reflective bridge from script code
// Objective: Drive overload resolution, var-args packing, array coercion,
//            string marshalling and proxy identity through the evaluator
//=====================================================

use std::sync::Arc;

use solvra_pybridge::host::memory::ObjectData;
use solvra_pybridge::host::{
    ClassBuilder, HostError, HostRuntime, HostValue, MethodDescriptor, PrimitiveKind,
    TypeDescriptor,
};
use solvra_pybridge::script::Value;
use solvra_pybridge::{Bindings, BridgeConfig, InMemoryHost, ScriptEvaluator, SharedHost};

fn int() -> TypeDescriptor {
    TypeDescriptor::Primitive(PrimitiveKind::Int)
}

fn long() -> TypeDescriptor {
    TypeDescriptor::Primitive(PrimitiveKind::Long)
}

fn setup() -> (Arc<InMemoryHost>, ScriptEvaluator) {
    let host = InMemoryHost::shared();
    let shared: SharedHost = host.clone();
    let evaluator = ScriptEvaluator::new(shared, &BridgeConfig::default());
    (host, evaluator)
}

fn register_tally(host: &InMemoryHost) {
    ClassBuilder::new("demo.Tally")
        .method(
            MethodDescriptor::new("sum", vec![TypeDescriptor::array_of(int())], int()).with_static(),
            |host, _, args| {
                let Some(HostValue::Object(array)) = args.first().copied() else {
                    return Err(HostError::invocation("demo.Tally", "missing array"));
                };
                let total: i64 = match host.data(array)? {
                    ObjectData::Array(items) => items.iter().filter_map(HostValue::as_i64).sum(),
                    _ => 0,
                };
                Ok(HostValue::Int(total as i32))
            },
        )
        .register(host);
}

fn register_picker(host: &InMemoryHost, name: &str, order: [(&'static str, TypeDescriptor); 2]) {
    let mut builder = ClassBuilder::new(name);
    for (label, param) in order {
        builder = builder.method(
            MethodDescriptor::new("pick", vec![param], TypeDescriptor::string()).with_static(),
            move |host, _, _| Ok(host.string_value(label)),
        );
    }
    builder.register(host);
}

fn string_binding(host: &InMemoryHost, text: &str) -> HostValue {
    HostValue::Object(host.new_string(text).expect("new string"))
}

#[test]
fn var_args_pack_trailing_arguments() {
    let (_host, mut eval) = setup();
    let script = r#"
importClass('java.util.Arrays')
items = Arrays.asList(1, 'two', 3.5)
empty = Arrays.asList()
[items.size(), empty.size(), str(items.get(1))]
"#;
    let value = eval.evaluate(script, &Bindings::new()).expect("evaluate");
    assert_eq!(value.repr(), "[3, 0, 'two']");
}

#[test]
fn array_arguments_check_the_first_element() {
    let (host, mut eval) = setup();
    register_tally(&host);
    let ok = eval
        .evaluate("importClass('demo.Tally')\nTally.sum([1, 2, 3])", &Bindings::new())
        .expect("sum ints");
    assert!(matches!(ok, Value::Int(6)));

    let empty = eval.evaluate("Tally.sum([])", &Bindings::new()).expect("sum empty");
    assert!(matches!(empty, Value::Int(0)));

    let rejected = eval
        .evaluate("Tally.sum(['a', 1])", &Bindings::new())
        .expect_err("first element is not an int");
    assert!(rejected.message.starts_with("Python exception: TypeError("));
    assert!(rejected.message.contains("No matching method found for sum"));

    let late_failure = eval
        .evaluate("Tally.sum([1, 'a'])", &Bindings::new())
        .expect_err("bulk conversion fails");
    assert!(late_failure.message.contains("TypeError"));
}

#[test]
fn strings_round_trip_through_the_context() {
    let (host, mut eval) = setup();
    let mut bindings = Bindings::new();
    bindings.insert("name".to_string(), string_binding(&host, "bridge"));
    let shout = eval
        .evaluate_to_host("isinstance(name, str) and name.upper() + '!'", &bindings)
        .expect("evaluate");
    let handle = shout.as_handle().expect("string result");
    assert_eq!(host.read_string(handle).expect("read"), Some("BRIDGE!".to_string()));
}

#[test]
fn wrapping_a_raw_handle_gives_an_equal_proxy() {
    let (host, mut eval) = setup();
    let list_class = host.class_for_name("java.util.ArrayList").expect("class");
    let handle = host.construct(&list_class, "()V", &[]).expect("construct");
    let mut bindings = Bindings::new();
    bindings.insert("items".to_string(), HostValue::Object(handle));
    let script = r#"
items.add('x')
again = JWrapper(items.o)
same = JWrapper(again)
[again == items, same == items, again.size()]
"#;
    let value = eval.evaluate(script, &bindings).expect("evaluate");
    assert_eq!(value.repr(), "[True, True, 1]");
}

#[test]
fn first_declared_overload_wins() {
    let (host, mut eval) = setup();
    register_picker(&host, "demo.LongFirst", [("long", long()), ("int", int())]);
    register_picker(&host, "demo.IntFirst", [("int", int()), ("long", long())]);
    let script = r#"
importClass('demo.LongFirst')
importClass('demo.IntFirst')
[LongFirst.pick(5), IntFirst.pick(5), LongFirst.pick(5)]
"#;
    let value = eval.evaluate(script, &Bindings::new()).expect("evaluate");
    assert_eq!(value.repr(), "['long', 'int', 'long']");
}

#[test]
fn fixed_and_var_args_overloads_share_a_name() {
    let (host, mut eval) = setup();
    ClassBuilder::new("demo.Varied")
        .method(
            MethodDescriptor::new("f", vec![int()], TypeDescriptor::string()).with_static(),
            |host, _, _| Ok(host.string_value("fixed")),
        )
        .method(
            MethodDescriptor::new(
                "f",
                vec![int(), TypeDescriptor::array_of(int())],
                TypeDescriptor::string(),
            )
            .with_static()
            .with_var_args(),
            |host, _, args| {
                let Some(HostValue::Object(rest)) = args.get(1).copied() else {
                    return Err(HostError::invocation("demo.Varied", "missing trailing array"));
                };
                let count = match host.data(rest)? {
                    ObjectData::Array(items) => items.len(),
                    _ => 0,
                };
                Ok(host.string_value(format!("varargs:{count}")))
            },
        )
        .register(&host);
    let script = r#"
importClass('demo.Varied')
[Varied.f(1), Varied.f(1, 2, 3), Varied.f(1, 2)]
"#;
    let value = eval.evaluate(script, &Bindings::new()).expect("evaluate");
    assert_eq!(value.repr(), "['fixed', 'varargs:2', 'varargs:1']");

    let err = eval
        .evaluate("Varied.f()", &Bindings::new())
        .expect_err("no overload takes zero arguments");
    assert!(err.message.contains("No matching method found for f"));
}

#[test]
fn static_overloads_choose_by_argument_kind() {
    let (_host, mut eval) = setup();
    let script = r#"
importClass('java.lang.Math')
[Math.max(1, 2), Math.max(1.5, 2), Math.abs(-3)]
"#;
    let value = eval.evaluate(script, &Bindings::new()).expect("evaluate");
    assert_eq!(value.repr(), "[2, 2.0, 3]");
}

#[test]
fn bridge_failures_become_python_exceptions() {
    let (_host, mut eval) = setup();
    let script = r#"
importClass('java.lang.StringBuilder')
sb = StringBuilder('a')
caught = []
try:
    sb.missing()
except AttributeError:
    caught.append('attribute')
try:
    StringBuilder(None, None)
except TypeError:
    caught.append('type')
sb.append('b').append(3)
caught.append(sb.toString())
caught
"#;
    let value = eval.evaluate(script, &Bindings::new()).expect("evaluate");
    assert_eq!(value.repr(), "['attribute', 'type', 'ab3']");
}

//=====================================================
// End of file
//=====================================================
