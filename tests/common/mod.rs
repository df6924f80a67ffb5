//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::rc::Rc;

use jsbind::realm::{Realm, RealmConfig, argument};
use jsbind::{BridgeConfig, Engine, EngineResult, JsValue, Object, PropertyKey, Runtime};

/// A runtime plus the `dummys` object most tests talk to.
pub struct Fixture {
    pub realm: Rc<Realm>,
    pub rt: Runtime,
    pub dummys: Object,
}

pub fn fixture() -> Fixture {
    fixture_with(BridgeConfig::default())
}

pub fn fixture_with(config: BridgeConfig) -> Fixture {
    init_tracing();
    let (realm, rt) = jsbind::new_runtime_with(RealmConfig::default(), config);
    let dummys = rt
        .eval(
            r#"({
                someBool: true,
                someString: "abc\u1234",
                someInt: 42,
                someFloat: 42.123,
                someArray: [41, 42, 43]
            })"#,
        )
        .unwrap();
    install_dummy_functions(&realm, dummys.raw());
    Fixture { realm, rt, dummys }
}

/// Log through `RUST_LOG` when set; repeated initialization is ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn method(realm: &Realm, target: &JsValue, name: &str) -> EngineResult<JsValue> {
    realm.get(target, PropertyKey::Name(name))
}

/// External-side helpers, written natively against the realm.
fn install_dummy_functions(realm: &Realm, dummys: &JsValue) {
    let define = |name: &str, f: fn(&Realm, &JsValue, &[JsValue]) -> EngineResult<JsValue>| {
        realm.define_function(dummys, name, f).unwrap();
    };

    // a + b
    define("add", |realm, _, args| {
        let (a, b) = (argument(args, 0), argument(args, 1));
        Ok(match (&a, &b) {
            (JsValue::String(_), _) | (_, JsValue::String(_)) => {
                JsValue::from(realm.to_display(&a) + &realm.to_display(&b))
            }
            _ => JsValue::Number(realm.to_number(&a) + realm.to_number(&b)),
        })
    });

    // new array of f(element) for each element
    define("mapArray", |realm, _, args| {
        let f = argument(args, 1);
        let mut mapped = Vec::new();
        for item in realm.array_items(&argument(args, 0))? {
            mapped.push(realm.call(&f, &JsValue::Undefined, &[item])?);
        }
        Ok(realm.create_array(mapped))
    });

    // d.getTime() / 1000
    define("toUnixTimestamp", |realm, _, args| {
        let date = argument(args, 0);
        let get_time = method(realm, &date, "getTime")?;
        let millis = realm.call(&get_time, &date, &[])?;
        Ok(JsValue::Number(realm.to_number(&millis) / 1000.0))
    });

    // o.Field
    define("testField", |realm, _, args| {
        method(realm, &argument(args, 0), "Field")
    });

    // o.Method(42)
    define("testMethod", |realm, _, args| {
        let target = argument(args, 0);
        let method = method(realm, &target, "Method")?;
        realm.call(&method, &target, &[JsValue::Number(42.0)])
    });

    // a === b
    define("isEqual", |_, _, args| {
        Ok(JsValue::Bool(argument(args, 0) == argument(args, 1)))
    });

    // f(a), discarding the result
    define("call", |realm, _, args| {
        realm.call(&argument(args, 0), &JsValue::Undefined, &[argument(args, 1)])?;
        Ok(JsValue::Undefined)
    });

    // throw x
    define("throwValue", |_, _, args| Err(argument(args, 0)));

    // x
    define("identity", |_, _, args| Ok(argument(args, 0)));
}
