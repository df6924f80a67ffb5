//! The reference wrapper: host-side handle to an external value.

use std::fmt;

use chrono::DateTime;
use tracing::trace;

use crate::convert::{FromJs, IntoArgs, IntoJs};
use crate::error::{BridgeError, ConversionError};
use crate::function::ExternalFn;
use crate::runtime::Runtime;
use crate::value::{JsValue, ObjectId, PropertyKey, ValueClass};

/// Deepest array nesting [`Object::interface`] converts.
pub const MAX_NATIVE_DEPTH: usize = 256;

fn unsupported(detail: &str) -> BridgeError {
    ConversionError::Unsupported {
        detail: detail.to_string(),
    }
    .into()
}

/// Handle to an external value, with the operations of the reference wrapper.
///
/// An `Object` may hold any external value, including primitives and the
/// `null`/`undefined` sentinels. Equality is the external strict equality, so
/// two handles are equal exactly when they denote the same external object.
///
/// Every operation that can run external code returns a [`BridgeError`]
/// instead of a value when the external side throws.
#[derive(Clone)]
pub struct Object {
    runtime: Runtime,
    value: JsValue,
}

impl Object {
    pub(crate) fn from_parts(runtime: Runtime, value: JsValue) -> Self {
        Self { runtime, value }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// The raw external value.
    pub fn raw(&self) -> &JsValue {
        &self.value
    }

    pub fn into_raw(self) -> JsValue {
        self.value
    }

    /// The boundary discriminant of the held value.
    pub fn class(&self) -> ValueClass {
        self.runtime.engine().class_of(&self.value)
    }

    fn catch<T>(&self, result: Result<T, JsValue>) -> Result<T, BridgeError> {
        result.map_err(|thrown| self.runtime.raise(thrown))
    }

    fn external_index(index: usize) -> Result<u32, BridgeError> {
        u32::try_from(index).map_err(|_| ConversionError::IndexOutOfRange { index }.into())
    }

    // ========================================================================
    // Property access
    // ========================================================================

    /// Read a named property. Missing properties read as `undefined`.
    pub fn get(&self, name: &str) -> Result<Object, BridgeError> {
        let value = self.catch(self.runtime.engine().get(&self.value, PropertyKey::Name(name)))?;
        Ok(self.runtime.wrap(value))
    }

    /// Read a named property and convert it.
    pub fn get_as<T: FromJs>(&self, name: &str) -> Result<T, BridgeError> {
        T::from_js(self.get(name)?)
    }

    /// Write a named property.
    pub fn set(&self, name: &str, value: impl IntoJs) -> Result<(), BridgeError> {
        let value = value.into_js(&self.runtime)?;
        self.catch(self.runtime.engine().set(&self.value, PropertyKey::Name(name), value))
    }

    /// Read an indexed element.
    pub fn index(&self, index: usize) -> Result<Object, BridgeError> {
        let key = PropertyKey::Index(Self::external_index(index)?);
        let value = self.catch(self.runtime.engine().get(&self.value, key))?;
        Ok(self.runtime.wrap(value))
    }

    /// Write an indexed element.
    pub fn set_index(&self, index: usize, value: impl IntoJs) -> Result<(), BridgeError> {
        let key = PropertyKey::Index(Self::external_index(index)?);
        let value = value.into_js(&self.runtime)?;
        self.catch(self.runtime.engine().set(&self.value, key, value))
    }

    /// The `length` property as an integer. Non-numeric lengths read as 0.
    pub fn length(&self) -> Result<usize, BridgeError> {
        let length = self.get("length")?;
        let n = self.runtime.engine().to_number(length.raw());
        if n.is_finite() && n > 0.0 {
            Ok(n as usize)
        } else {
            Ok(0)
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call the method `name` with this handle as receiver.
    pub fn call(&self, name: &str, args: impl IntoArgs) -> Result<Object, BridgeError> {
        trace!(method = name, "call");
        let args = args.into_args(&self.runtime)?;
        let engine = self.runtime.engine();
        let method = self.catch(engine.get(&self.value, PropertyKey::Name(name)))?;
        let result = self.catch(engine.call(&method, &self.value, &args))?;
        Ok(self.runtime.wrap(result))
    }

    /// Invoke the handle itself as a function, with `undefined` as receiver.
    pub fn invoke(&self, args: impl IntoArgs) -> Result<Object, BridgeError> {
        trace!("invoke");
        let args = args.into_args(&self.runtime)?;
        let result = self.catch(self.runtime.engine().call(&self.value, &JsValue::Undefined, &args))?;
        Ok(self.runtime.wrap(result))
    }

    /// Invoke the handle as a constructor.
    pub fn new(&self, args: impl IntoArgs) -> Result<Object, BridgeError> {
        trace!("new");
        let args = args.into_args(&self.runtime)?;
        let result = self.catch(self.runtime.engine().construct(&self.value, &args))?;
        Ok(self.runtime.wrap(result))
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Convert the held value to a host type.
    pub fn to<T: FromJs>(&self) -> Result<T, BridgeError> {
        T::from_js(self.clone())
    }

    /// Best-effort conversion to the most specific native value.
    ///
    /// Booleans, strings and numbers come first; then dates, functions and
    /// arrays (element-wise); any other object is returned as the handle.
    /// An array that contains itself, or nests deeper than
    /// [`MAX_NATIVE_DEPTH`], fails with [`ConversionError::Unsupported`].
    pub fn interface(&self) -> Result<Native, BridgeError> {
        self.interface_on_path(&mut Vec::new())
    }

    fn interface_on_path(&self, path: &mut Vec<ObjectId>) -> Result<Native, BridgeError> {
        Ok(match &self.value {
            JsValue::Undefined => Native::Undefined,
            JsValue::Null => Native::Null,
            JsValue::Bool(b) => Native::Bool(*b),
            JsValue::String(s) => Native::String(s.to_string()),
            JsValue::Number(n) => Native::Float(*n),
            JsValue::Object(id) => match self.class() {
                ValueClass::Date => Native::Date(self.to()?),
                ValueClass::Function => Native::Func(ExternalFn::from_object(self.clone())),
                ValueClass::Array => {
                    if path.contains(id) {
                        return Err(unsupported("cyclic array"));
                    }
                    if path.len() >= MAX_NATIVE_DEPTH {
                        return Err(unsupported(&format!(
                            "arrays nested deeper than {MAX_NATIVE_DEPTH}"
                        )));
                    }
                    path.push(*id);
                    let length = self.length()?;
                    let mut items = Vec::with_capacity(length);
                    for i in 0..length {
                        items.push(self.index(i)?.interface_on_path(path)?);
                    }
                    path.pop();
                    Native::Array(items)
                }
                _ => Native::Object(self.clone()),
            },
        })
    }

    /// Truthiness of the held value.
    pub fn bool(&self) -> bool {
        self.value.is_truthy()
    }

    /// String form of the held value.
    pub fn string(&self) -> String {
        match &self.value {
            JsValue::String(s) => s.to_string(),
            other => self.runtime.engine().to_display(other),
        }
    }

    /// Numeric form of the held value.
    pub fn float(&self) -> f64 {
        self.runtime.engine().to_number(&self.value)
    }

    /// 32-bit integer form (`value | 0`).
    pub fn int(&self) -> i32 {
        to_int32(self.float())
    }

    /// 64-bit integer form, truncating and saturating. `NaN` reads as 0.
    pub fn int64(&self) -> i64 {
        self.float() as i64
    }

    /// Unsigned 64-bit integer form, truncating and saturating.
    pub fn uint64(&self) -> u64 {
        self.float() as u64
    }

    pub fn is_undefined(&self) -> bool {
        self.value.is_undefined()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

/// ECMAScript ToInt32: wrap modulo 2^32 into the signed range.
fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    let wrapped = n.trunc().rem_euclid(4_294_967_296.0);
    if wrapped >= 2_147_483_648.0 {
        (wrapped - 4_294_967_296.0) as i32
    } else {
        wrapped as i32
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.runtime == other.runtime
    }
}

impl PartialEq<JsValue> for Object {
    fn eq(&self, other: &JsValue) -> bool {
        &self.value == other
    }
}

/// Renders the external string form, e.g. `[object Object]`.
impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.runtime.engine().to_display(&self.value))
    }
}

/// Same as `Display`: structures holding handles print the external form.
impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Result of [`Object::interface`].
#[derive(Clone, Debug, PartialEq)]
pub enum Native {
    Undefined,
    Null,
    Bool(bool),
    String(String),
    Float(f64),
    Date(DateTime<chrono::Utc>),
    /// An external function, callable with any arguments.
    Func(ExternalFn),
    Array(Vec<Native>),
    /// Any other object.
    Object(Object),
}

impl Native {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Native::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Native::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Native::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<chrono::Utc>> {
        match self {
            Native::Date(date) => Some(date),
            _ => None,
        }
    }

    pub fn into_func(self) -> Option<ExternalFn> {
        match self {
            Native::Func(func) => Some(func),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<Object> {
        match self {
            Native::Object(object) => Some(object),
            _ => None,
        }
    }
}
