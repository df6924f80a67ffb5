//! Integration tests for the bridge: reference wrapper, conversions,
//! function boxing and the exception boundary.

mod common;

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::hint::black_box;
use std::rc::Rc;

use chrono::{TimeZone, Utc};
use jsbind::prelude::*;
use jsbind::{CodeKey, FunctionKey, JsValue, MAX_SAFE_INTEGER};
use pretty_assertions::assert_eq;

use common::{fixture, fixture_with};

fn thrown_name(err: &BridgeError) -> String {
    err.as_external().unwrap().get("name").unwrap().string()
}

// ============================================================================
// Typed readers
// ============================================================================

#[test]
fn test_bool() {
    let f = fixture();
    let e = f.dummys.get("someBool").unwrap();
    assert!(e.bool());
    assert!(e.to::<bool>().unwrap());
}

#[test]
fn test_str() {
    let f = fixture();
    let e = f.dummys.get("someString").unwrap();
    assert_eq!(e.string(), "abc\u{1234}");
    assert_eq!(e.to::<String>().unwrap(), "abc\u{1234}");
}

#[test]
fn test_int() {
    let f = fixture();
    let e = f.dummys.get("someInt").unwrap();
    assert_eq!(e.int(), 42);
    assert_eq!(e.int64(), 42);
    assert_eq!(e.uint64(), 42);
    assert_eq!(f.dummys.get_as::<u8>("someInt").unwrap(), 42);
}

#[test]
fn test_float() {
    let f = fixture();
    let e = f.dummys.get("someFloat").unwrap();
    assert_eq!(e.float(), 42.123);
    assert_eq!(e.to::<f64>().unwrap(), 42.123);
    assert_eq!(e.int(), 42);
}

#[test]
fn test_undefined() {
    let f = fixture();
    assert!(f.dummys != f.rt.undefined());
    let missing = f.dummys.get("xyz").unwrap();
    assert!(missing.is_undefined());
    assert!(missing == f.rt.undefined());
    assert!(missing != f.rt.null());
}

#[test]
fn test_null() {
    let f = fixture();
    f.dummys.set("test", f.rt.null()).unwrap();
    let value = f.dummys.get("test").unwrap();
    assert!(value.is_null());
    assert!(value == f.rt.null());
    assert!(value != f.rt.undefined());

    f.dummys.set("test", None::<i64>).unwrap();
    assert!(f.dummys.get("test").unwrap().is_null());
    assert_eq!(f.dummys.get_as::<Option<i64>>("test").unwrap(), None);
}

// ============================================================================
// Property and index access
// ============================================================================

#[test]
fn test_length() {
    let f = fixture();
    assert_eq!(f.dummys.get("someArray").unwrap().length().unwrap(), 3);
}

#[test]
fn test_index() {
    let f = fixture();
    let array = f.dummys.get("someArray").unwrap();
    assert_eq!(array.index(1).unwrap().int(), 42);
    assert!(array.index(10).unwrap().is_undefined());
}

#[test]
fn test_set_index() {
    let f = fixture();
    let array = f.dummys.get("someArray").unwrap();
    array.set_index(2, 99).unwrap();
    assert_eq!(array.index(2).unwrap().int(), 99);
    array.set_index(4, "tail").unwrap();
    assert_eq!(array.length().unwrap(), 5);
}

#[test]
fn test_get_on_undefined_throws() {
    let f = fixture();
    let err = f.rt.undefined().get("x").unwrap_err();
    let exception = err.as_external().unwrap();
    assert_eq!(
        exception.message(),
        "TypeError: Cannot read properties of undefined (reading 'x')"
    );
}

#[test]
fn test_field_names() {
    let f = fixture();
    let object = f.rt.eval("({ b: 1, a: 2 })").unwrap();
    assert_eq!(object.field_names().unwrap(), vec!["b", "a"]);

    let err = f.rt.null().field_names().unwrap_err();
    assert_eq!(thrown_name(&err), "TypeError");
    assert!(f.rt.undefined().field_names().unwrap_err().is_external());
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn test_call() {
    let f = fixture();
    let i: i64 = 40;
    assert_eq!(f.dummys.call("add", (i, 2)).unwrap().int(), 42);

    let forty = f.rt.global().call("eval", ("40",)).unwrap();
    assert_eq!(f.dummys.call("add", (forty, 2)).unwrap().int(), 42);
}

#[test]
fn test_invoke() {
    let f = fixture();
    let add = f.dummys.get("add").unwrap();
    assert_eq!(add.invoke((40, 2)).unwrap().int(), 42);
}

#[test]
fn test_new() {
    let f = fixture();
    let array = f.rt.global().get("Array").unwrap().new((42,)).unwrap();
    assert_eq!(array.length().unwrap(), 42);
}

#[test]
fn test_call_missing_method() {
    let f = fixture();
    let err = f.dummys.call("nope", ()).unwrap_err();
    assert!(err.is_external());
    assert_eq!(thrown_name(&err), "TypeError");
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_func() {
    let f = fixture();
    let a = f
        .dummys
        .call("mapArray", (vec![1, 2, 3], Func::new(|e: i64| e + 40)))
        .unwrap();
    let b = f
        .dummys
        .call(
            "mapArray",
            (vec![1, 2, 3], Func::new(|e: Variadic<i64>| e[0] + 40)),
        )
        .unwrap();
    assert_eq!(a.index(1).unwrap().int(), 42);
    assert_eq!(b.index(1).unwrap().int(), 42);

    let add = f
        .dummys
        .get("add")
        .unwrap()
        .interface()
        .unwrap()
        .into_func()
        .unwrap();
    let i: i64 = 40;
    assert_eq!(add.call((i, 2)).unwrap().int(), 42);
    assert_eq!(add.call_as::<String>(("4", 2)).unwrap(), "42");
}

#[test]
fn test_unboxing() {
    let f = fixture();
    let add: ExternalFn = f.dummys.get_as("add").unwrap();
    let original = f.dummys.get("add").unwrap();
    assert!(f.dummys.call("isEqual", (&add, &original)).unwrap().bool());
}

#[test]
fn test_boxing() {
    let f = fixture();
    let add = Func::new(|a: i64, b: i64| a + b);
    assert!(f.dummys.call("isEqual", (&add, &add)).unwrap().bool());
    assert_eq!(f.rt.cached_functions(), 1);

    let boxed = f.rt.externalize(&add).unwrap();
    assert_eq!(boxed.invoke((40, 2)).unwrap().int(), 42);
    assert_eq!(f.rt.cached_functions(), 1);
}

#[test]
fn test_missing_arguments_are_undefined() {
    let f = fixture();
    let describe = Func::new(|a: Option<i64>, b: Option<i64>| format!("{a:?}/{b:?}"));
    f.dummys.set("describe", describe).unwrap();
    assert_eq!(f.dummys.call("describe", (1,)).unwrap().string(), "Some(1)/None");
    assert_eq!(
        f.dummys.call("describe", (1, 2, 3)).unwrap().string(),
        "Some(1)/Some(2)"
    );
}

struct T {
    calls: Cell<i64>,
}

impl T {
    fn method(&self, _s: String) {
        self.calls.set(self.calls.get() + 1);
    }
}

fn noop(_s: String) {}

fn count_chars(s: String) {
    black_box(s.chars().count());
}

#[test]
fn test_same_func_wrapper() {
    let f = fixture();
    let is_equal = |f: &common::Fixture| {
        let tmp1 = f.dummys.get("tmp1").unwrap();
        let tmp2 = f.dummys.get("tmp2").unwrap();
        f.dummys.call("isEqual", (tmp1, tmp2)).unwrap().bool()
    };

    let a = |_s: String| {};
    f.dummys.set("tmp1", Func::new(a)).unwrap();
    f.dummys.set("tmp2", Func::new(a)).unwrap();
    assert!(is_equal(&f));

    f.dummys.set("tmp1", Func::new(noop)).unwrap();
    f.dummys.set("tmp2", Func::new(noop)).unwrap();
    assert!(is_equal(&f));

    let b = |_s: String| {};
    f.dummys.set("tmp2", Func::new(b)).unwrap();
    f.dummys.set("tmp1", Func::new(a)).unwrap();
    assert!(!is_equal(&f));

    let t1 = Rc::new(T { calls: Cell::new(0) });
    let t2 = Rc::new(T { calls: Cell::new(0) });
    f.dummys.set("tmp1", Func::method(&t1, T::method)).unwrap();
    f.dummys.set("tmp2", Func::method(&t2, T::method)).unwrap();
    assert!(!is_equal(&f));

    f.dummys.set("tmp2", Func::method(&t1, T::method)).unwrap();
    assert!(is_equal(&f));

    f.dummys.call("tmp1", ("x",)).unwrap();
    assert_eq!(t1.calls.get(), 1);
    assert_eq!(t2.calls.get(), 0);
}

#[test]
fn test_fn_pointer_identity() {
    let f = fixture();
    let is_equal = |a: Func, b: Func| f.dummys.call("isEqual", (a, b)).unwrap().bool();

    let p: fn(String) = noop;
    let before = f.rt.cached_functions();
    assert!(is_equal(Func::new(p), Func::new(p)));
    assert_eq!(f.rt.cached_functions(), before + 1);

    let q: fn(String) = count_chars;
    assert!(!is_equal(Func::new(p), Func::new(q)));

    let t = Rc::new(T { calls: Cell::new(0) });
    let m: fn(&T, String) = T::method;
    assert!(is_equal(Func::method(&t, m), Func::method(&t, m)));
}

#[test]
fn test_capturing_closures_are_distinct() {
    let f = fixture();
    let make = |offset: i64| Func::new(move |x: i64| x + offset);
    let (plus_one, plus_two) = (make(1), make(2));
    assert!(matches!(plus_one.key(), FunctionKey::Function(CodeKey::Instance(_))));

    f.dummys.set("tmp1", &plus_one).unwrap();
    f.dummys.set("tmp2", &plus_two).unwrap();
    assert_eq!(f.dummys.call("tmp1", (1,)).unwrap().int(), 2);
    assert_eq!(f.dummys.call("tmp2", (1,)).unwrap().int(), 3);
    assert!(!f.dummys.call("isEqual", (&plus_one, &plus_two)).unwrap().bool());
    assert!(f.dummys.call("isEqual", (&plus_one, plus_one.clone())).unwrap().bool());
}

#[test]
fn test_make_func() {
    let f = fixture();
    let o = f.rt.global().get("Object").unwrap().new(()).unwrap();
    let (expected, x) = (o.clone(), 3);
    o.set(
        "f",
        Func::raw(move |cx: &CallContext<'_>| {
            assert!(*cx.this() == expected);
            assert_eq!(cx.arg_count(), 2);
            assert_eq!(cx.argument(0).int(), 1);
            assert_eq!(cx.argument(1).int(), 2);
            x
        }),
    )
    .unwrap();
    assert_eq!(o.call("f", (1, 2)).unwrap().int(), 3);
}

// ============================================================================
// Context
// ============================================================================

#[test]
fn test_this() {
    let f = fixture();
    let seen = Rc::new(Cell::new(false));
    let (expected, record) = (f.dummys.clone(), Rc::clone(&seen));
    f.dummys
        .set(
            "testThis",
            Func::new(move |this: This, _s: String| record.set(*this == expected)),
        )
        .unwrap();
    f.dummys.call("testThis", ("",)).unwrap();
    assert!(seen.get());
}

#[test]
fn test_arguments() {
    let f = fixture();
    f.dummys
        .set(
            "testArguments",
            Func::new(|args: Arguments| args.len() == 3 && args[1].int() == 1),
        )
        .unwrap();
    assert!(f.dummys.call("testArguments", (0, 1, 2)).unwrap().bool());
}

#[test]
fn test_raw_arguments() {
    let f = fixture();
    let count = Func::raw(|cx: &CallContext<'_>| cx.arguments().len());
    f.dummys.set("count", count).unwrap();
    assert_eq!(f.dummys.call("count", ("a", "b")).unwrap().int(), 2);
}

// ============================================================================
// Dates and equality
// ============================================================================

#[test]
fn test_date() {
    let f = fixture();
    let d = Utc.with_ymd_and_hms(2013, 8, 27, 22, 25, 11).unwrap();
    assert_eq!(
        f.dummys.call("toUnixTimestamp", (d,)).unwrap().int64(),
        d.timestamp()
    );

    let d2 = f
        .rt
        .global()
        .get("Date")
        .unwrap()
        .new((d.timestamp_millis(),))
        .unwrap()
        .interface()
        .unwrap();
    assert_eq!(d2.as_date(), Some(&d));
}

#[test]
fn test_date_precision_is_milliseconds() {
    let f = fixture();
    let d = Utc.timestamp_opt(1_377_642_311, 123_456_789).unwrap();
    let back: chrono::DateTime<Utc> = f.rt.externalize(d).unwrap().to().unwrap();
    assert_eq!(back.timestamp_millis(), d.timestamp_millis());
    assert_ne!(back, d);
}

#[test]
fn test_equality() {
    let f = fixture();
    let global = f.rt.global();
    assert!(global.get("Array").unwrap() == global.get("Array").unwrap());
    assert!(global.get("Array").unwrap() != global.get("String").unwrap());

    #[derive(Wrapped, PartialEq)]
    struct S {
        #[js(embed)]
        object: Object,
    }

    let o1 = global.get("Object").unwrap().new(()).unwrap();
    let o2 = global.get("Object").unwrap().new(()).unwrap();
    let a = S::wrap(o1.clone());
    let b = S::wrap(o1);
    let c = S::wrap(o2);
    assert!(a == b);
    assert!(a != c);
}

#[test]
fn test_handles_from_other_runtimes_differ() {
    let one = fixture();
    let two = fixture();
    assert!(one.rt.global() != two.rt.global());
    assert!(one.rt.global().raw() == two.rt.global().raw());
}

// ============================================================================
// Conversions
// ============================================================================

#[test]
fn test_integer_overflow() {
    let f = fixture();
    let err = f.rt.externalize(300).unwrap().to::<u8>().unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Conversion(ConversionError::IntegerOverflow { target_type: "u8", .. })
    ));
    assert!(f.rt.externalize(-1).unwrap().to::<u32>().is_err());
    assert_eq!(f.rt.externalize(-1.9).unwrap().to::<i32>().unwrap(), -1);
}

#[test]
fn test_type_mismatch() {
    let f = fixture();
    let err = f.dummys.get_as::<i64>("someString").unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Conversion(ConversionError::TypeMismatch {
            expected: "i64",
            actual: "string"
        })
    ));
    assert!(f.rt.undefined().to::<String>().is_err());
}

#[test]
fn test_precision_loss_beyond_safe_integers() {
    let f = fixture();
    f.dummys.set("big", MAX_SAFE_INTEGER).unwrap();
    assert_eq!(f.dummys.get_as::<i64>("big").unwrap(), MAX_SAFE_INTEGER);

    f.dummys.set("big", MAX_SAFE_INTEGER + 2).unwrap();
    assert_eq!(f.dummys.get_as::<i64>("big").unwrap(), MAX_SAFE_INTEGER + 1);
}

#[test]
fn test_nullish_reads_as_zero_values() {
    let f = fixture();
    let undefined = f.rt.undefined();
    assert_eq!(undefined.to::<i64>().unwrap(), 0);
    assert!(!undefined.to::<bool>().unwrap());
    assert!(undefined.to::<f64>().unwrap().is_nan());
    assert_eq!(f.rt.null().to::<f64>().unwrap(), 0.0);
    assert_eq!(undefined.to::<Vec<i64>>().unwrap(), Vec::<i64>::new());
}

#[test]
fn test_sequences_and_maps() {
    let f = fixture();
    let array: Vec<i64> = f.dummys.get_as("someArray").unwrap();
    assert_eq!(array, vec![41, 42, 43]);

    let mut map = BTreeMap::new();
    map.insert("a", 1);
    map.insert("b", 2);
    let object = f.rt.externalize(map).unwrap();
    assert_eq!(object.get("b").unwrap().int(), 2);

    let back: HashMap<String, i64> = object.to().unwrap();
    assert_eq!(back.len(), 2);
    assert_eq!(back["a"], 1);
}

#[test]
fn test_interface() {
    let f = fixture();
    let value = f.rt.eval("[1, 'a', true, null]").unwrap().interface().unwrap();
    assert_eq!(
        value,
        Native::Array(vec![
            Native::Float(1.0),
            Native::String("a".to_string()),
            Native::Bool(true),
            Native::Null,
        ])
    );
    let object = f.dummys.interface().unwrap().into_object().unwrap();
    assert!(object == f.dummys);
}

#[test]
fn test_interface_of_cyclic_array() {
    let f = fixture();
    let a = f.rt.eval("[]").unwrap();
    a.set_index(0, &a).unwrap();

    assert!(a.interface().unwrap_err().is_conversion());
    assert!(a.to::<Native>().unwrap_err().is_conversion());
    assert!(a.to::<Vec<Native>>().unwrap_err().is_conversion());

    let b = f.rt.eval("[]").unwrap();
    b.set_index(0, &a).unwrap();
    a.set_index(0, &b).unwrap();
    assert!(a.interface().unwrap_err().is_conversion());
}

#[test]
fn test_interface_of_shared_element() {
    let f = fixture();
    let x = f.rt.eval("[1]").unwrap();
    let pair = f.rt.eval("[]").unwrap();
    pair.set_index(0, &x).unwrap();
    pair.set_index(1, &x).unwrap();

    let one = Native::Array(vec![Native::Float(1.0)]);
    assert_eq!(pair.interface().unwrap(), Native::Array(vec![one.clone(), one]));
}

#[test]
fn test_numeric_coercion_of_cyclic_array() {
    let f = fixture();
    let a = f.rt.eval("[]").unwrap();
    a.set_index(0, &a).unwrap();

    assert!(a.float().is_nan());
    assert_eq!(a.int(), 0);
    assert_eq!(a.int64(), 0);
    assert_eq!(a.length().unwrap(), 1);
    assert_eq!(f.rt.eval("[[['7']]]").unwrap().float(), 7.0);
}

// ============================================================================
// Externalize
// ============================================================================

#[test]
fn test_externalize_field() {
    let f = fixture();
    let mut map = HashMap::new();
    map.insert("Field", 42);
    assert_eq!(f.dummys.call("testField", (map,)).unwrap().int(), 42);

    #[derive(IntoJs)]
    struct WithField {
        #[js(name = "Field")]
        field: i64,
    }
    let s = WithField { field: 42 };
    assert_eq!(f.dummys.call("testField", (s,)).unwrap().int(), 42);
}

#[test]
fn test_externalize_identity() {
    let f = fixture();
    let o = f.rt.new_object();
    let back = f.dummys.call("identity", (&o,)).unwrap();
    assert!(back == o);
    assert!(f.dummys.call("isEqual", (&o, back)).unwrap().bool());
}

// ============================================================================
// Wrapping host objects
// ============================================================================

struct M {
    value: i64,
}

impl M {
    fn method(&self, x: i64) -> i64 {
        self.value + x
    }

    fn name(&self) -> String {
        format!("M({})", self.value)
    }
}

impl HostObject for M {
    fn methods(table: &mut MethodTable<Self>) {
        table.method("Method", M::method).method("name", M::name);
    }
}

#[test]
fn test_make_wrapper() {
    let f = fixture();
    let m = Rc::new(M { value: 42 });
    let wrapper = f.rt.make_wrapper(Rc::clone(&m)).unwrap();
    assert_eq!(f.dummys.call("testMethod", (&wrapper,)).unwrap().int(), 84);
    assert_eq!(wrapper.call("name", ()).unwrap().string(), "M(42)");

    let again = f.rt.make_wrapper(m).unwrap();
    assert!(again != wrapper);
    assert!(again.get("Method").unwrap() == wrapper.get("Method").unwrap());
}

// ============================================================================
// Exceptions
// ============================================================================

#[test]
fn test_error() {
    let f = fixture();
    let err = f
        .rt
        .global()
        .get("notExisting")
        .unwrap()
        .call("throwsError", ())
        .unwrap_err();
    assert!(err.to_string().contains("throwsError"));
    let exception = err.as_external().unwrap();
    let stack = exception.stack().unwrap();
    assert!(stack.starts_with("TypeError: "));
    assert!(stack.contains("\n    at "));
}

#[test]
fn test_conversion_failure_throws_type_error() {
    let f = fixture();
    f.dummys.set("strict", Func::new(|x: i64| x)).unwrap();
    let err = f.dummys.call("strict", ("abc",)).unwrap_err();
    assert_eq!(thrown_name(&err), "TypeError");
    assert!(err.to_string().contains("expected i64"));
}

#[test]
fn test_host_error_throws_error() {
    let f = fixture();
    f.dummys
        .set(
            "fail",
            Func::new(|| -> Result<(), BridgeError> { Err(BridgeError::host("no luck")) }),
        )
        .unwrap();
    let err = f.dummys.call("fail", ()).unwrap_err();
    assert_eq!(err.to_string(), "Error: no luck");
}

#[test]
fn test_panic_becomes_external_error() {
    let f = fixture();
    f.dummys
        .set("boom", Func::new(|| -> i64 { panic!("kaboom") }))
        .unwrap();
    let err = f.dummys.call("boom", ()).unwrap_err();
    assert_eq!(thrown_name(&err), "HostPanic");
    assert_eq!(err.to_string(), "HostPanic: kaboom");
    assert_eq!(f.rt.depth(), 0);
    assert_eq!(f.realm.call_depth(), 0);
}

#[test]
fn test_rethrow_preserves_identity() {
    let f = fixture();
    let dummys = f.dummys.clone();
    f.dummys
        .set(
            "relay",
            Func::new(move |x: Object| -> Result<(), BridgeError> {
                dummys.call("throwValue", (x,))?;
                Ok(())
            }),
        )
        .unwrap();

    let thrown = f.rt.new_object();
    let err = f.dummys.call("relay", (&thrown,)).unwrap_err();
    assert!(*err.as_external().unwrap().value() == thrown);
}

// ============================================================================
// Reentrancy
// ============================================================================

fn install_recurse(f: &common::Fixture) {
    let recurse = Func::raw(|cx: &CallContext<'_>| -> Result<Object, BridgeError> {
        let n: i64 = cx.arg(0)?;
        if n == 0 {
            return cx.runtime().externalize(cx.runtime().depth());
        }
        cx.this().call("recurse", (n - 1,))
    });
    f.dummys.set("recurse", recurse).unwrap();
}

#[test]
fn test_reentrant_calls() {
    let f = fixture();
    install_recurse(&f);
    assert_eq!(f.dummys.call("recurse", (3,)).unwrap().int(), 4);
    assert_eq!(f.rt.depth(), 0);
}

#[test]
fn test_reentrancy_limit() {
    let f = fixture_with(BridgeConfig::new().with_max_reentrancy(2));
    install_recurse(&f);
    assert_eq!(f.dummys.call("recurse", (1,)).unwrap().int(), 2);

    let err = f.dummys.call("recurse", (5,)).unwrap_err();
    assert_eq!(thrown_name(&err), "RangeError");
    assert!(err.to_string().contains("depth of 2"));
    assert_eq!(f.rt.depth(), 0);
}

#[test]
fn test_boxing_inside_host_function() {
    let f = fixture();
    let dummys = f.dummys.clone();
    let outer = Func::new(move || -> Result<i64, BridgeError> {
        let inner = Func::new(|x: i64| x * 2);
        dummys.call("mapArray", (vec![1, 2], inner))?.index(1)?.to()
    });
    f.dummys.set("outer", outer).unwrap();
    assert_eq!(f.dummys.call("outer", ()).unwrap().int(), 4);
    assert_eq!(f.dummys.call("outer", ()).unwrap().int(), 4);
    assert_eq!(f.rt.cached_functions(), 2);
}

#[test]
fn test_wrapper_debug_output() {
    let f = fixture();
    assert_eq!(format!("{:?}", f.dummys), "[object Object]");
    assert_eq!(f.dummys.get("someArray").unwrap().to_string(), "41,42,43");
}

#[test]
fn test_external_exception_deref() {
    let f = fixture();
    let err = f.rt.eval("missing").unwrap_err();
    let exception = err.into_external().unwrap();
    assert_eq!(exception.get("name").unwrap().string(), "ReferenceError");
    assert_eq!(exception.message(), "ReferenceError: missing is not defined");
    assert_eq!(exception.into_value().class(), jsbind::ValueClass::Error);
}

#[test]
fn test_raw_values() {
    let f = fixture();
    let value = f.dummys.get("someInt").unwrap();
    assert!(value == JsValue::Number(42.0));
}
