//! Tagged representation of external values.

use std::fmt;
use std::rc::Rc;

/// Largest integer the external numeric domain represents exactly (2^53 - 1).
///
/// Integers crossing the boundary are carried as `f64`. Anything beyond this
/// magnitude is rounded to the nearest representable double; the bridge does
/// not detect or correct that loss.
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Identity of an object owned by the external system.
///
/// Two ids are equal exactly when they denote the same external object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Index of the object in the owning engine's storage.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A value as the external system sees it.
///
/// Primitives are carried inline; everything else is an [`ObjectId`] whose
/// structure is only reachable through the [`Engine`](crate::Engine).
#[derive(Clone, Debug, Default)]
pub enum JsValue {
    /// The `undefined` sentinel.
    #[default]
    Undefined,
    /// The `null` sentinel.
    Null,
    /// Boolean primitive.
    Bool(bool),
    /// Double-precision number (the only external numeric type).
    Number(f64),
    /// Immutable string primitive.
    String(Rc<str>),
    /// Reference to an external object, array, function, date or error.
    Object(ObjectId),
}

impl JsValue {
    /// Name of the primitive kind, as reported by the external `typeof`
    /// operator, except that functions report `"object"` here.
    pub fn type_name(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "null",
            JsValue::Bool(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(_) => "object",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsValue::Null)
    }

    /// True for `null` and `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            JsValue::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// External truthiness (`!!value`), without consulting object contents.
    pub fn is_truthy(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Bool(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Object(_) => true,
        }
    }
}

/// Strict equality (`===`): `NaN` is unequal to itself, objects compare by
/// identity, and `null` never equals `undefined`.
impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Bool(a), JsValue::Bool(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for JsValue {
    fn from(value: bool) -> Self {
        JsValue::Bool(value)
    }
}

impl From<f64> for JsValue {
    fn from(value: f64) -> Self {
        JsValue::Number(value)
    }
}

impl From<&str> for JsValue {
    fn from(value: &str) -> Self {
        JsValue::String(Rc::from(value))
    }
}

impl From<String> for JsValue {
    fn from(value: String) -> Self {
        JsValue::String(Rc::from(value))
    }
}

impl From<ObjectId> for JsValue {
    fn from(value: ObjectId) -> Self {
        JsValue::Object(value)
    }
}

/// Boundary discriminant for a value: the "is this a date/array/function"
/// question answered once by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueClass {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    /// Any object that is none of the more specific classes below.
    Object,
    Array,
    Function,
    Date,
    Error,
}

impl ValueClass {
    pub fn name(self) -> &'static str {
        match self {
            ValueClass::Undefined => "undefined",
            ValueClass::Null => "null",
            ValueClass::Boolean => "boolean",
            ValueClass::Number => "number",
            ValueClass::String => "string",
            ValueClass::Object => "object",
            ValueClass::Array => "array",
            ValueClass::Function => "function",
            ValueClass::Date => "date",
            ValueClass::Error => "error",
        }
    }

    pub fn is_object(self) -> bool {
        matches!(
            self,
            ValueClass::Object
                | ValueClass::Array
                | ValueClass::Function
                | ValueClass::Date
                | ValueClass::Error
        )
    }
}

impl fmt::Display for ValueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key used to address a property: a name or an integer index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKey<'a> {
    Name(&'a str),
    Index(u32),
}

impl<'a> From<&'a str> for PropertyKey<'a> {
    fn from(value: &'a str) -> Self {
        PropertyKey::Name(value)
    }
}

impl From<u32> for PropertyKey<'_> {
    fn from(value: u32) -> Self {
        PropertyKey::Index(value)
    }
}

impl fmt::Display for PropertyKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Name(name) => f.write_str(name),
            PropertyKey::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Format a number the way the external system prints it: integral values
/// without a fractional part, `NaN`, and signed `Infinity`.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}
