//! Conversion traits between host values and external values.
//!
//! - [`IntoJs`]: outbound (host to external)
//! - [`FromJs`]: inbound (external to host)
//! - [`IntoArgs`]: an outbound argument list
//!
//! ## Mapping
//!
//! | Host | External |
//! |------|----------|
//! | `bool` | boolean |
//! | integers, `f32`, `f64` | number (see below) |
//! | `String`, `&str`, `char` | string |
//! | `Vec<T>`, `&[T]`, `[T; N]` | array, element-wise |
//! | `HashMap`/`BTreeMap` with string keys | plain object |
//! | `DateTime<Tz>`, `SystemTime` | date (milliseconds since epoch) |
//! | `Option<T>` | `null` for `None` |
//! | `()` | `undefined` |
//! | [`Object`], wrapped structs | the held handle, unchanged |
//! | [`Func`](crate::Func) | a cached function proxy |
//!
//! Integers travel as `f64`. Values beyond [`MAX_SAFE_INTEGER`] are rounded
//! to the nearest double and that loss is not reported. Inbound integer
//! conversion truncates toward zero and fails with
//! [`ConversionError::IntegerOverflow`] when the result does not fit.
//!
//! Dates keep millisecond precision; anything finer is dropped on the way
//! out and cannot be recovered.
//!
//! `undefined` and `null` convert inbound to the zero value of numeric and
//! boolean types, to `None` for options and to empty sequences and maps.
//!
//! [`MAX_SAFE_INTEGER`]: crate::MAX_SAFE_INTEGER

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{BridgeError, ConversionError};
use crate::object::{Native, Object};
use crate::runtime::Runtime;
use crate::value::{JsValue, ValueClass};

/// Convert a host value to an external value.
pub trait IntoJs {
    fn into_js(self, rt: &Runtime) -> Result<JsValue, BridgeError>;
}

/// Convert an external value to a host value.
///
/// Receives the value wrapped as an [`Object`] so implementations can read
/// properties lazily.
pub trait FromJs: Sized {
    fn from_js(value: Object) -> Result<Self, BridgeError>;
}

/// An outbound argument list.
///
/// Implemented for tuples of up to eight [`IntoJs`] values, for `Vec<T>` and
/// for `()` (no arguments). Every argument is converted before the call is
/// made, so a conversion failure leaves the external side untouched.
pub trait IntoArgs {
    fn into_args(self, rt: &Runtime) -> Result<Vec<JsValue>, BridgeError>;
}

fn mismatch(expected: &'static str, value: &Object) -> BridgeError {
    ConversionError::TypeMismatch {
        expected,
        actual: value.class().name(),
    }
    .into()
}

// ============================================================================
// Primitives
// ============================================================================

impl IntoJs for bool {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(JsValue::Bool(self))
    }
}

impl FromJs for bool {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        match value.raw() {
            JsValue::Bool(b) => Ok(*b),
            JsValue::Undefined | JsValue::Null => Ok(false),
            _ => Err(mismatch("bool", &value)),
        }
    }
}

macro_rules! impl_integer {
    ($($ty:ty),*) => {
        $(
            impl IntoJs for $ty {
                fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
                    Ok(JsValue::Number(self as f64))
                }
            }

            impl FromJs for $ty {
                fn from_js(value: Object) -> Result<Self, BridgeError> {
                    match value.raw() {
                        JsValue::Number(n) => {
                            let truncated = n.trunc();
                            // MAX + 1 is exact for every width up to 64 bits
                            if truncated >= <$ty>::MIN as f64 && truncated < <$ty>::MAX as f64 + 1.0 {
                                Ok(truncated as $ty)
                            } else {
                                Err(ConversionError::IntegerOverflow {
                                    value: *n,
                                    target_type: stringify!($ty),
                                }
                                .into())
                            }
                        }
                        JsValue::Undefined | JsValue::Null => Ok(0),
                        _ => Err(mismatch(stringify!($ty), &value)),
                    }
                }
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl IntoJs for f64 {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(JsValue::Number(self))
    }
}

impl FromJs for f64 {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        match value.raw() {
            JsValue::Number(n) => Ok(*n),
            JsValue::Undefined => Ok(f64::NAN),
            JsValue::Null => Ok(0.0),
            _ => Err(mismatch("f64", &value)),
        }
    }
}

impl IntoJs for f32 {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(JsValue::Number(f64::from(self)))
    }
}

impl FromJs for f32 {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        f64::from_js(value).map(|n| n as f32)
    }
}

// ============================================================================
// Strings
// ============================================================================

impl IntoJs for String {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(JsValue::from(self))
    }
}

impl IntoJs for &String {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(JsValue::from(self.as_str()))
    }
}

impl IntoJs for &str {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(JsValue::from(self))
    }
}

impl IntoJs for Cow<'_, str> {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(JsValue::from(self.as_ref()))
    }
}

impl IntoJs for char {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(JsValue::from(self.to_string()))
    }
}

/// Strings convert as-is; numbers and booleans use their external string
/// form. `undefined` and `null` are rejected.
impl FromJs for String {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        match value.raw() {
            JsValue::String(s) => Ok(s.to_string()),
            JsValue::Number(_) | JsValue::Bool(_) => Ok(value.string()),
            _ => Err(mismatch("string", &value)),
        }
    }
}

impl FromJs for char {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        let s = String::from_js(value)?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ConversionError::Unsupported {
                detail: format!("string of {} characters as char", s.chars().count()),
            }
            .into()),
        }
    }
}

// ============================================================================
// Unit and options
// ============================================================================

impl IntoJs for () {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(JsValue::Undefined)
    }
}

/// Discards the value.
impl FromJs for () {
    fn from_js(_value: Object) -> Result<Self, BridgeError> {
        Ok(())
    }
}

impl<T: IntoJs> IntoJs for Option<T> {
    fn into_js(self, rt: &Runtime) -> Result<JsValue, BridgeError> {
        match self {
            Some(value) => value.into_js(rt),
            None => Ok(JsValue::Null),
        }
    }
}

impl<T: FromJs> FromJs for Option<T> {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        if value.raw().is_nullish() {
            Ok(None)
        } else {
            T::from_js(value).map(Some)
        }
    }
}

/// Host return values: `Err` is raised instead of converted.
impl<T: IntoJs, E: Into<BridgeError>> IntoJs for Result<T, E> {
    fn into_js(self, rt: &Runtime) -> Result<JsValue, BridgeError> {
        self.map_err(Into::into)?.into_js(rt)
    }
}

// ============================================================================
// Handles
// ============================================================================

impl IntoJs for Object {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(self.into_raw())
    }
}

impl IntoJs for &Object {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(self.raw().clone())
    }
}

impl FromJs for Object {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        Ok(value)
    }
}

impl IntoJs for JsValue {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(self)
    }
}

impl FromJs for JsValue {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        Ok(value.into_raw())
    }
}

impl IntoJs for Native {
    fn into_js(self, rt: &Runtime) -> Result<JsValue, BridgeError> {
        match self {
            Native::Undefined => Ok(JsValue::Undefined),
            Native::Null => Ok(JsValue::Null),
            Native::Bool(b) => Ok(JsValue::Bool(b)),
            Native::String(s) => Ok(JsValue::from(s)),
            Native::Float(n) => Ok(JsValue::Number(n)),
            Native::Date(date) => date.into_js(rt),
            Native::Func(func) => func.into_js(rt),
            Native::Array(items) => items.into_js(rt),
            Native::Object(object) => Ok(object.into_raw()),
        }
    }
}

impl FromJs for Native {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        value.interface()
    }
}

// ============================================================================
// Sequences
// ============================================================================

fn array_from<I>(rt: &Runtime, items: I) -> Result<JsValue, BridgeError>
where
    I: IntoIterator,
    I::Item: IntoJs,
{
    let items = items
        .into_iter()
        .map(|item| item.into_js(rt))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rt.engine().create_array(items))
}

impl<T: IntoJs> IntoJs for Vec<T> {
    fn into_js(self, rt: &Runtime) -> Result<JsValue, BridgeError> {
        array_from(rt, self)
    }
}

impl<T: IntoJs + Clone> IntoJs for &[T] {
    fn into_js(self, rt: &Runtime) -> Result<JsValue, BridgeError> {
        array_from(rt, self.iter().cloned())
    }
}

impl<T: IntoJs, const N: usize> IntoJs for [T; N] {
    fn into_js(self, rt: &Runtime) -> Result<JsValue, BridgeError> {
        array_from(rt, self)
    }
}

/// Accepts arrays; `undefined` and `null` become an empty vector.
impl<T: FromJs> FromJs for Vec<T> {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        match value.class() {
            ValueClass::Undefined | ValueClass::Null => Ok(Vec::new()),
            ValueClass::Array => {
                let length = value.length()?;
                (0..length).map(|i| T::from_js(value.index(i)?)).collect()
            }
            _ => Err(mismatch("array", &value)),
        }
    }
}

// ============================================================================
// String-keyed maps
// ============================================================================

fn object_from<K, V, I>(rt: &Runtime, entries: I) -> Result<JsValue, BridgeError>
where
    K: AsRef<str>,
    V: IntoJs,
    I: IntoIterator<Item = (K, V)>,
{
    let object = rt.new_object();
    for (key, value) in entries {
        object.set(key.as_ref(), value)?;
    }
    Ok(object.into_raw())
}

fn entries_of<V: FromJs>(value: &Object) -> Result<Vec<(String, V)>, BridgeError> {
    if value.raw().is_nullish() {
        return Ok(Vec::new());
    }
    if !value.class().is_object() {
        return Err(mismatch("object", value));
    }
    let keys = value
        .runtime()
        .engine()
        .own_keys(value.raw())
        .map_err(|thrown| value.runtime().raise(thrown))?;
    keys.into_iter()
        .map(|key| {
            let item = V::from_js(value.get(&key)?)?;
            Ok((key, item))
        })
        .collect()
}

impl<K: AsRef<str>, V: IntoJs, S> IntoJs for HashMap<K, V, S> {
    fn into_js(self, rt: &Runtime) -> Result<JsValue, BridgeError> {
        object_from(rt, self)
    }
}

impl<V: FromJs, S: BuildHasher + Default> FromJs for HashMap<String, V, S> {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        Ok(entries_of(&value)?.into_iter().collect())
    }
}

impl<K: AsRef<str>, V: IntoJs> IntoJs for BTreeMap<K, V> {
    fn into_js(self, rt: &Runtime) -> Result<JsValue, BridgeError> {
        object_from(rt, self)
    }
}

impl<V: FromJs> FromJs for BTreeMap<String, V> {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        Ok(entries_of(&value)?.into_iter().collect())
    }
}

// ============================================================================
// Dates
// ============================================================================

impl<Tz: TimeZone> IntoJs for DateTime<Tz> {
    fn into_js(self, rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(rt.engine().create_date(self.timestamp_millis() as f64))
    }
}

fn date_millis(value: &Object) -> Result<f64, BridgeError> {
    value
        .runtime()
        .engine()
        .date_value(value.raw())
        .ok_or_else(|| mismatch("date", value))
}

impl FromJs for DateTime<Utc> {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        let millis = date_millis(&value)?;
        if !millis.is_finite() {
            return Err(ConversionError::InvalidDate { millis }.into());
        }
        DateTime::from_timestamp_millis(millis as i64)
            .ok_or_else(|| ConversionError::InvalidDate { millis }.into())
    }
}

impl IntoJs for SystemTime {
    fn into_js(self, rt: &Runtime) -> Result<JsValue, BridgeError> {
        let millis = match self.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_millis() as f64,
            Err(before) => -(before.duration().as_millis() as f64),
        };
        Ok(rt.engine().create_date(millis))
    }
}

impl FromJs for SystemTime {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        let millis = date_millis(&value)?;
        if !millis.is_finite() {
            return Err(ConversionError::InvalidDate { millis }.into());
        }
        let offset = Duration::from_millis(millis.abs() as u64);
        let time = if millis >= 0.0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        };
        time.ok_or_else(|| ConversionError::InvalidDate { millis }.into())
    }
}

// ============================================================================
// Argument lists
// ============================================================================

impl IntoArgs for () {
    fn into_args(self, _rt: &Runtime) -> Result<Vec<JsValue>, BridgeError> {
        Ok(Vec::new())
    }
}

impl<T: IntoJs> IntoArgs for Vec<T> {
    fn into_args(self, rt: &Runtime) -> Result<Vec<JsValue>, BridgeError> {
        self.into_iter().map(|arg| arg.into_js(rt)).collect()
    }
}

macro_rules! impl_into_args_tuple {
    ($($T:ident $v:ident),+) => {
        impl<$($T: IntoJs),+> IntoArgs for ($($T,)+) {
            fn into_args(self, rt: &Runtime) -> Result<Vec<JsValue>, BridgeError> {
                let ($($v,)+) = self;
                Ok(vec![$($v.into_js(rt)?),+])
            }
        }
    };
}

impl_into_args_tuple!(A a);
impl_into_args_tuple!(A a, B b);
impl_into_args_tuple!(A a, B b, C c);
impl_into_args_tuple!(A a, B b, C c, D d);
impl_into_args_tuple!(A a, B b, C c, D d, E e);
impl_into_args_tuple!(A a, B b, C c, D d, E e, F f);
impl_into_args_tuple!(A a, B b, C c, D d, E e, F f, G g);
impl_into_args_tuple!(A a, B b, C c, D d, E e, F f, G g, H h);
