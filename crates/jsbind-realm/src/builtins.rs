//! Global constructors and prototype methods installed into every realm.

use std::rc::Rc;

use chrono::{DateTime, Months, NaiveDate, Utc};
use jsbind_core::{Engine, EngineResult, JsValue, ObjectId, PropertyKey, ValueClass};
use tracing::trace;

use crate::argument;
use crate::heap::{NativeCtor, NativeFn, PropertyFlags};
use crate::realm::{MAX_ARRAY_LENGTH, Realm, iso_string, time_clip};

const ERROR_CONSTRUCTORS: &[&str] = &[
    "Error",
    "TypeError",
    "RangeError",
    "SyntaxError",
    "ReferenceError",
];

pub(crate) fn install(realm: &Realm) {
    let intrinsics = realm.intrinsics();
    let object_prototype = JsValue::Object(intrinsics.object_prototype);
    let function_prototype = JsValue::Object(intrinsics.function_prototype);
    let array_prototype = JsValue::Object(intrinsics.array_prototype);
    let date_prototype = JsValue::Object(intrinsics.date_prototype);
    let error_prototype = JsValue::Object(intrinsics.error_prototype);

    method(realm, &object_prototype, "toString", object_to_string);
    method(realm, &object_prototype, "hasOwnProperty", has_own_property);

    method(realm, &function_prototype, "call", function_call);
    method(realm, &function_prototype, "apply", function_apply);

    method(realm, &array_prototype, "slice", array_slice);
    method(realm, &array_prototype, "push", array_push);
    method(realm, &array_prototype, "join", array_join);
    method(realm, &array_prototype, "map", array_map);
    method(realm, &array_prototype, "indexOf", array_index_of);

    method(realm, &date_prototype, "getTime", date_get_time);
    method(realm, &date_prototype, "toISOString", date_to_iso_string);

    method(realm, &error_prototype, "toString", error_to_string);
    hidden(realm, &error_prototype, "name", JsValue::from("Error"));
    hidden(realm, &error_prototype, "message", JsValue::from(""));

    constructor(
        realm,
        "Object",
        intrinsics.object_prototype,
        Rc::new(
            |realm: &Realm, _: &JsValue, args: &[JsValue]| -> EngineResult<JsValue> {
                Ok(object_construct(realm, args))
            },
        ),
        Some(Rc::new(
            |realm: &Realm, args: &[JsValue]| -> EngineResult<JsValue> {
                Ok(object_construct(realm, args))
            },
        )),
    );
    constructor(
        realm,
        "Array",
        intrinsics.array_prototype,
        Rc::new(
            |realm: &Realm, _: &JsValue, args: &[JsValue]| -> EngineResult<JsValue> {
                array_construct(realm, args)
            },
        ),
        Some(Rc::new(array_construct)),
    );
    constructor(
        realm,
        "Date",
        intrinsics.date_prototype,
        Rc::new(|realm: &Realm, _: &JsValue, _: &[JsValue]| -> EngineResult<JsValue> {
            let now = realm.create_date(Utc::now().timestamp_millis() as f64);
            Ok(JsValue::from(realm.to_display(&now)))
        }),
        Some(Rc::new(date_construct)),
    );
    for &name in ERROR_CONSTRUCTORS {
        let make = move |realm: &Realm, args: &[JsValue]| -> EngineResult<JsValue> {
            let message = match argument(args, 0) {
                JsValue::Undefined => String::new(),
                value => realm.to_display(&value),
            };
            Ok(realm.create_error(name, &message))
        };
        constructor(
            realm,
            name,
            intrinsics.error_prototype,
            Rc::new(
                move |realm: &Realm, _: &JsValue, args: &[JsValue]| -> EngineResult<JsValue> {
                    make(realm, args)
                },
            ),
            Some(Rc::new(make)),
        );
    }

    let global = realm.global();
    let string = realm.native_function("String", |realm, _, args| {
        Ok(match args.first() {
            Some(value) => JsValue::from(realm.to_display(value)),
            None => JsValue::from(""),
        })
    });
    hidden(realm, &global, "String", string);
    let number = realm.native_function("Number", |realm, _, args| {
        Ok(JsValue::Number(
            args.first().map_or(0.0, |value| realm.to_number(value)),
        ))
    });
    hidden(realm, &global, "Number", number);

    if realm.config().global_eval {
        let eval = realm.native_function("eval", |realm, _, args| match argument(args, 0) {
            JsValue::String(source) => realm.eval(&source),
            other => Ok(other),
        });
        hidden(realm, &global, "eval", eval);
    }
    trace!(objects = realm.heap_size(), "realm built-ins installed");
}

fn method(
    realm: &Realm,
    target: &JsValue,
    name: &str,
    f: fn(&Realm, &JsValue, &[JsValue]) -> EngineResult<JsValue>,
) {
    let function = realm.native_function(name, f);
    hidden(realm, target, name, function);
}

fn hidden(realm: &Realm, target: &JsValue, name: &str, value: JsValue) {
    // Targets are intrinsics, so defining cannot fail.
    let _ = realm.define_property(target, name, value, PropertyFlags::HIDDEN);
}

fn constructor(
    realm: &Realm,
    name: &str,
    prototype: ObjectId,
    call: NativeFn,
    construct: Option<NativeCtor>,
) {
    let function = realm.alloc_function(name, call, construct);
    let prototype = JsValue::Object(prototype);
    let _ = realm.define_property(&function, "prototype", prototype.clone(), PropertyFlags::empty());
    hidden(realm, &prototype, "constructor", function.clone());
    hidden(realm, &realm.global(), name, function);
}

// ============================================================================
// Object
// ============================================================================

fn object_construct(realm: &Realm, args: &[JsValue]) -> JsValue {
    match argument(args, 0) {
        value @ JsValue::Object(_) => value,
        _ => realm.create_object(),
    }
}

fn object_to_string(realm: &Realm, this: &JsValue, _: &[JsValue]) -> EngineResult<JsValue> {
    let tag = match realm.class_of(this) {
        ValueClass::Undefined => "Undefined",
        ValueClass::Null => "Null",
        ValueClass::Boolean => "Boolean",
        ValueClass::Number => "Number",
        ValueClass::String => "String",
        ValueClass::Array => "Array",
        ValueClass::Function => "Function",
        ValueClass::Date => "Date",
        ValueClass::Error => "Error",
        ValueClass::Object => "Object",
    };
    Ok(JsValue::from(format!("[object {tag}]")))
}

fn has_own_property(realm: &Realm, this: &JsValue, args: &[JsValue]) -> EngineResult<JsValue> {
    let key = realm.to_display(&argument(args, 0));
    Ok(JsValue::Bool(match this {
        JsValue::Object(id) => realm.has_own(*id, &key),
        JsValue::String(_) => key == "length",
        JsValue::Undefined | JsValue::Null => {
            return Err(realm.type_error("Cannot convert undefined or null to object"));
        }
        _ => false,
    }))
}

// ============================================================================
// Function
// ============================================================================

fn function_call(realm: &Realm, this: &JsValue, args: &[JsValue]) -> EngineResult<JsValue> {
    let receiver = argument(args, 0);
    realm.call(this, &receiver, args.get(1..).unwrap_or_default())
}

fn function_apply(realm: &Realm, this: &JsValue, args: &[JsValue]) -> EngineResult<JsValue> {
    let receiver = argument(args, 0);
    let list = match argument(args, 1) {
        JsValue::Undefined | JsValue::Null => Vec::new(),
        list => realm.array_items(&list)?,
    };
    realm.call(this, &receiver, &list)
}

// ============================================================================
// Array
// ============================================================================

fn array_construct(realm: &Realm, args: &[JsValue]) -> EngineResult<JsValue> {
    if let [JsValue::Number(length)] = args {
        let valid = length.fract() == 0.0 && (0.0..=MAX_ARRAY_LENGTH as f64).contains(length);
        if !valid {
            return Err(realm.range_error("Invalid array length"));
        }
        return Ok(realm.create_array(vec![JsValue::Undefined; *length as usize]));
    }
    Ok(realm.create_array(args.to_vec()))
}

/// Resolve a relative index argument against `len`.
fn relative_index(n: f64, len: usize) -> usize {
    let len = len as f64;
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    let resolved = if n < 0.0 { (len + n).max(0.0) } else { n.min(len) };
    resolved as usize
}

fn array_slice(realm: &Realm, this: &JsValue, args: &[JsValue]) -> EngineResult<JsValue> {
    let items = realm.array_items(this)?;
    let start = relative_index(realm.to_number(&argument(args, 0)), items.len());
    let end = match argument(args, 1) {
        JsValue::Undefined => items.len(),
        end => relative_index(realm.to_number(&end), items.len()),
    };
    let slice = items.get(start..end).map(<[JsValue]>::to_vec).unwrap_or_default();
    Ok(realm.create_array(slice))
}

fn array_push(realm: &Realm, this: &JsValue, args: &[JsValue]) -> EngineResult<JsValue> {
    let length = realm.with_array_mut(this, |items| {
        items.extend_from_slice(args);
        items.len()
    })?;
    Ok(JsValue::Number(length as f64))
}

fn array_join(realm: &Realm, this: &JsValue, args: &[JsValue]) -> EngineResult<JsValue> {
    let separator = match argument(args, 0) {
        JsValue::Undefined => ",".to_string(),
        value => realm.to_display(&value),
    };
    let joined = realm
        .array_items(this)?
        .iter()
        .map(|item| match item {
            JsValue::Undefined | JsValue::Null => String::new(),
            other => realm.to_display(other),
        })
        .collect::<Vec<_>>()
        .join(&separator);
    Ok(JsValue::from(joined))
}

fn array_map(realm: &Realm, this: &JsValue, args: &[JsValue]) -> EngineResult<JsValue> {
    let callback = argument(args, 0);
    if realm.class_of(&callback) != ValueClass::Function {
        return Err(realm.type_error(&format!(
            "{} is not a function",
            realm.to_display(&callback)
        )));
    }
    let receiver = argument(args, 1);
    let length = realm.array_items(this)?.len();
    let mut mapped = Vec::with_capacity(length);
    for index in 0..length {
        // The callback may mutate the array, so each element is read fresh.
        let item = realm.get(this, PropertyKey::Index(index as u32))?;
        let value = realm.call(
            &callback,
            &receiver,
            &[item, JsValue::Number(index as f64), this.clone()],
        )?;
        mapped.push(value);
    }
    Ok(realm.create_array(mapped))
}

fn array_index_of(realm: &Realm, this: &JsValue, args: &[JsValue]) -> EngineResult<JsValue> {
    let needle = argument(args, 0);
    let position = realm
        .array_items(this)?
        .iter()
        .position(|item| *item == needle);
    Ok(JsValue::Number(position.map_or(-1.0, |i| i as f64)))
}

// ============================================================================
// Date
// ============================================================================

fn date_construct(realm: &Realm, args: &[JsValue]) -> EngineResult<JsValue> {
    let millis = match args {
        [] => Utc::now().timestamp_millis() as f64,
        [JsValue::String(text)] => DateTime::parse_from_rfc3339(text)
            .map_or(f64::NAN, |date| date.timestamp_millis() as f64),
        [single] => match realm.date_value(single) {
            Some(millis) => millis,
            None => realm.to_number(single),
        },
        components => {
            let parts: Vec<f64> = components.iter().map(|v| realm.to_number(v)).collect();
            date_from_components(&parts)
        }
    };
    Ok(realm.create_date(time_clip(millis)))
}

/// Year, month (0-based), day, hours, minutes, seconds and milliseconds,
/// interpreted as UTC.
fn date_from_components(parts: &[f64]) -> f64 {
    if parts.iter().any(|part| !part.is_finite()) {
        return f64::NAN;
    }
    let part = |i: usize, default: f64| parts.get(i).copied().unwrap_or(default).trunc();
    let month = part(1, 0.0);
    let month_start = NaiveDate::from_ymd_opt(part(0, 1970.0) as i32, 1, 1).and_then(|first| {
        if month >= 0.0 {
            first.checked_add_months(Months::new(month as u32))
        } else {
            first.checked_sub_months(Months::new((-month) as u32))
        }
    });
    let Some(midnight) = month_start.and_then(|date| date.and_hms_opt(0, 0, 0)) else {
        return f64::NAN;
    };
    midnight.and_utc().timestamp_millis() as f64
        + (part(2, 1.0) - 1.0) * 86_400_000.0
        + part(3, 0.0) * 3_600_000.0
        + part(4, 0.0) * 60_000.0
        + part(5, 0.0) * 1_000.0
        + part(6, 0.0)
}

fn this_time_value(realm: &Realm, this: &JsValue) -> EngineResult<f64> {
    realm
        .date_value(this)
        .ok_or_else(|| realm.type_error("this is not a Date object."))
}

fn date_get_time(realm: &Realm, this: &JsValue, _: &[JsValue]) -> EngineResult<JsValue> {
    this_time_value(realm, this).map(JsValue::Number)
}

fn date_to_iso_string(realm: &Realm, this: &JsValue, _: &[JsValue]) -> EngineResult<JsValue> {
    let millis = this_time_value(realm, this)?;
    iso_string(millis)
        .map(JsValue::from)
        .ok_or_else(|| realm.range_error("Invalid time value"))
}

// ============================================================================
// Error
// ============================================================================

fn error_to_string(realm: &Realm, this: &JsValue, _: &[JsValue]) -> EngineResult<JsValue> {
    let name = match realm.get(this, PropertyKey::Name("name"))? {
        JsValue::Undefined => "Error".to_string(),
        value => realm.to_display(&value),
    };
    let message = match realm.get(this, PropertyKey::Name("message"))? {
        JsValue::Undefined => String::new(),
        value => realm.to_display(&value),
    };
    Ok(JsValue::from(match (name.is_empty(), message.is_empty()) {
        (_, true) => name,
        (true, false) => message,
        (false, false) => format!("{name}: {message}"),
    }))
}
