//! Wrapped structs: handle embedding, property projection and reflection.

mod common;

use std::rc::Rc;

use jsbind::prelude::*;
use pretty_assertions::assert_eq;

use common::fixture;

#[derive(Wrapped)]
struct StructWithJsField1 {
    #[js(embed)]
    object: Object,
    #[js(name = "length")]
    length: Prop<i64>,
    #[js(name = "slice")]
    slice: Prop<fn(i64, i64) -> Vec<i64>>,
}

#[derive(Wrapped)]
struct StructWithJsField2 {
    #[js(handle)]
    object: Object,
    #[js(name = "length")]
    length: Prop<i64>,
    #[js(name = "slice")]
    slice: Prop<fn(i64, i64) -> Vec<i64>>,
}

#[derive(Wrapped)]
struct Wrapper1 {
    #[js(embed)]
    inner: StructWithJsField1,
    #[js(name = "length")]
    wrapper_length: Prop<i64>,
}

#[derive(Wrapped)]
#[js(name = "SecondWrapper")]
struct Wrapper2 {
    #[js(handle)]
    inner: Rc<StructWithJsField2>,
    #[js(name = "length")]
    wrapper_length: Prop<i64>,
}

fn new_array(f: &common::Fixture, length: i64) -> Object {
    f.rt.global().get("Array").unwrap().new((length,)).unwrap()
}

#[test]
fn test_read_through_projection() {
    let f = fixture();
    let array = new_array(&f, 42);

    let s1 = StructWithJsField1::wrap(array.clone());
    assert_eq!(s1.length().unwrap(), 42);
    assert_eq!(s1.object.length().unwrap(), 42);

    let s2 = StructWithJsField2::wrap(array.clone());
    assert_eq!(s2.length().unwrap(), 42);

    let w1 = Wrapper1::wrap(StructWithJsField1::wrap(array.clone()));
    assert_eq!(w1.wrapper_length().unwrap(), 42);
    assert_eq!(w1.length().unwrap(), 42);
    assert_eq!(w1.inner.length().unwrap(), 42);

    let w2 = Wrapper2::wrap(Rc::new(StructWithJsField2::wrap(array)));
    assert_eq!(w2.wrapper_length().unwrap(), 42);
    assert_eq!(w2.inner.length().unwrap(), 42);
}

#[test]
fn test_write_through_projection() {
    let f = fixture();

    let s1 = StructWithJsField1::wrap(f.rt.new_object());
    s1.set_length(42).unwrap();
    assert_eq!(s1.get("length").unwrap().int(), 42);

    let s2 = StructWithJsField2::wrap(f.rt.new_object());
    s2.set_length(42).unwrap();
    assert_eq!(s2.handle().get("length").unwrap().int(), 42);

    let w1 = Wrapper1::wrap(StructWithJsField1::wrap(f.rt.new_object()));
    w1.set_wrapper_length(42).unwrap();
    assert_eq!(w1.get("length").unwrap().int(), 42);
    assert_eq!(w1.length().unwrap(), 42);

    let w2 = Wrapper2::wrap(Rc::new(StructWithJsField2::wrap(f.rt.new_object())));
    w2.set_wrapper_length(42).unwrap();
    assert_eq!(w2.inner.length().unwrap(), 42);
}

#[test]
fn test_method_projection() {
    let f = fixture();
    let array = new_array(&f, 100);
    array.set_index(3, 123).unwrap();

    let check = |slice: Vec<i64>| {
        assert_eq!(slice.len(), 42);
        assert_eq!(slice[1], 123);
    };

    let s1 = StructWithJsField1::wrap(array.clone());
    check(s1.slice(2, 44).unwrap());
    let slice = s1.slice_fn();
    check(slice(2, 44).unwrap());

    let s2 = StructWithJsField2::wrap(array.clone());
    check(s2.slice(2, 44).unwrap());
    check(s2.slice_fn()(2, 44).unwrap());

    let w1 = Wrapper1::wrap(StructWithJsField1::wrap(array.clone()));
    check(w1.slice(2, 44).unwrap());

    let w2 = Wrapper2::wrap(Rc::new(StructWithJsField2::wrap(array)));
    check(w2.inner.slice(2, 44).unwrap());
}

#[test]
fn test_method_projection_outlives_wrapper() {
    let f = fixture();
    let array = new_array(&f, 10);
    array.set_index(5, 7).unwrap();

    let slice = {
        let s1 = StructWithJsField1::wrap(array);
        s1.slice_fn()
    };
    assert_eq!(slice(5, 6).unwrap(), vec![7]);
}

#[test]
fn test_externalize_wrapped() {
    let f = fixture();
    let array = new_array(&f, 3);

    let s1 = StructWithJsField1::wrap(array.clone());
    let s2 = StructWithJsField2::wrap(array.clone());
    let w1 = Wrapper1::wrap(StructWithJsField1::wrap(array.clone()));
    let w2 = Wrapper2::wrap(Rc::new(StructWithJsField2::wrap(array.clone())));

    let is_equal = |value: Object| f.dummys.call("isEqual", (value, &array)).unwrap().bool();
    assert!(is_equal(f.rt.externalize(&s1).unwrap()));
    assert!(is_equal(f.rt.externalize(&s2).unwrap()));
    assert!(is_equal(f.rt.externalize(&w1).unwrap()));
    assert!(is_equal(f.rt.externalize(w2).unwrap()));
    assert!(is_equal(f.rt.externalize(Rc::new(s1)).unwrap()));
}

#[test]
fn test_unboxing_wrapped() {
    let f = fixture();
    let array = new_array(&f, 7);
    f.dummys.set("tmp", &array).unwrap();

    let w2: Wrapper2 = f.dummys.get_as("tmp").unwrap();
    assert_eq!(w2.wrapper_length().unwrap(), 7);
    assert!(*w2.handle() == array);

    let w1: Wrapper1 = f.dummys.get_as("tmp").unwrap();
    assert!(w1.object == array);
}

#[test]
fn test_wrapped_as_function_argument() {
    let f = fixture();
    let length_of = Func::new(|s: StructWithJsField2| s.length());
    f.dummys.set("lengthOf", length_of).unwrap();
    let array = new_array(&f, 9);
    assert_eq!(f.dummys.call("lengthOf", (&array,)).unwrap().int(), 9);
}

#[test]
fn test_reflect_wrapped() {
    let f = fixture();
    let array = new_array(&f, 42);

    let s1 = StructWithJsField1::wrap(array.clone());
    assert_eq!(s1.type_name(), "StructWithJsField1");
    assert_eq!(s1.field_names().unwrap(), vec!["object", "length"]);
    assert_eq!(s1.field("length").unwrap().int(), 42);
    assert!(s1.field("object").unwrap() == array);
    assert!(s1.method_names().starts_with(&["slice", "get"]));

    let sliced = s1
        .call_method("slice", vec![f.rt.externalize(0).unwrap(), f.rt.externalize(2).unwrap()])
        .unwrap();
    assert_eq!(sliced.length().unwrap(), 2);

    let length = s1.call_method("length", vec![]).unwrap();
    assert_eq!(length.int(), 42);

    let err = s1.field("nope").unwrap_err();
    assert!(matches!(err, BridgeError::NoSuchMember { type_name: "StructWithJsField1", .. }));
}

#[test]
fn test_reflect_set_field() {
    let f = fixture();
    let mut w2 = Wrapper2::wrap(Rc::new(StructWithJsField2::wrap(f.rt.new_object())));
    assert_eq!(w2.type_name(), "SecondWrapper");

    w2.set_field("wrapper_length", f.rt.externalize(5).unwrap()).unwrap();
    assert_eq!(w2.inner.length().unwrap(), 5);

    let replacement = new_array(&f, 11);
    w2.set_field("inner", replacement.clone()).unwrap();
    assert!(*w2.handle() == replacement);
    assert_eq!(w2.wrapper_length().unwrap(), 11);

    let err = w2.set_field("missing", f.rt.null()).unwrap_err();
    assert_eq!(err.to_string(), "SecondWrapper has no member named 'missing'");
}

#[test]
fn test_reflect_nested_wrapper() {
    let f = fixture();
    let array = new_array(&f, 4);
    let w1 = Wrapper1::wrap(StructWithJsField1::wrap(array));

    assert_eq!(w1.field_names().unwrap(), vec!["inner", "wrapper_length"]);
    assert_eq!(w1.field("wrapper_length").unwrap().int(), 4);
    assert!(w1.method_names().contains(&"call"));

    let args = vec![f.rt.externalize("slice").unwrap(), f.rt.externalize(1).unwrap()];
    let sliced = w1.call_method("call", args).unwrap();
    assert_eq!(sliced.length().unwrap(), 3);

    let err = w1.call_method("slice", vec![]).unwrap_err();
    assert!(matches!(err, BridgeError::NoSuchMember { type_name: "Object", .. }));
}
