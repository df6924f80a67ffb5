//! The realm: a single-threaded JavaScript-like object system.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, SecondsFormat};
use jsbind_core::{
    Engine, EngineResult, HostCallback, JsValue, ObjectId, PropertyKey, ValueClass,
    number_to_string,
};

use crate::builtins;
use crate::eval;
use crate::heap::{
    FunctionData, Heap, JsObject, NativeCtor, NativeFn, ObjectKind, PropertyFlags, array_index,
};

/// Largest array a realm will materialize. Arrays are dense, so larger
/// lengths are rejected with a `RangeError`.
pub const MAX_ARRAY_LENGTH: usize = 1 << 24;

/// Greatest magnitude of a valid time value, in milliseconds.
const MAX_TIME_VALUE: f64 = 8.64e15;

/// Deepest array nesting followed when printing or coercing arrays.
const MAX_NESTING_DEPTH: usize = 32;

/// Realm settings.
#[derive(Debug, Clone)]
pub struct RealmConfig {
    /// Frames recorded in the `stack` property of new errors.
    pub stack_trace_limit: usize,
    /// Install `eval` on the global object.
    pub global_eval: bool,
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self {
            stack_trace_limit: 10,
            global_eval: true,
        }
    }
}

impl RealmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack_trace_limit(mut self, limit: usize) -> Self {
        self.stack_trace_limit = limit;
        self
    }

    pub fn with_global_eval(mut self, enabled: bool) -> Self {
        self.global_eval = enabled;
        self
    }
}

/// Well-known objects every realm starts with.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Intrinsics {
    pub global: ObjectId,
    pub object_prototype: ObjectId,
    pub function_prototype: ObjectId,
    pub array_prototype: ObjectId,
    pub date_prototype: ObjectId,
    pub error_prototype: ObjectId,
}

/// An isolated external object system.
///
/// Objects are never collected; they live as long as the realm. No heap
/// borrow is held while a function runs, so native functions and host
/// callbacks may re-enter the realm freely.
pub struct Realm {
    heap: RefCell<Heap>,
    frames: RefCell<Vec<Rc<str>>>,
    intrinsics: Intrinsics,
    config: RealmConfig,
}

impl Realm {
    pub fn new() -> Rc<Self> {
        Self::with_config(RealmConfig::default())
    }

    pub fn with_config(config: RealmConfig) -> Rc<Self> {
        let mut heap = Heap::default();
        let object_prototype = heap.alloc(JsObject::new(None, ObjectKind::Ordinary));
        let derived = |heap: &mut Heap| {
            heap.alloc(JsObject::new(Some(object_prototype), ObjectKind::Ordinary))
        };
        let intrinsics = Intrinsics {
            object_prototype,
            function_prototype: derived(&mut heap),
            array_prototype: derived(&mut heap),
            date_prototype: derived(&mut heap),
            error_prototype: derived(&mut heap),
            global: derived(&mut heap),
        };
        let realm = Realm {
            heap: RefCell::new(heap),
            frames: RefCell::new(Vec::new()),
            intrinsics,
            config,
        };
        builtins::install(&realm);
        Rc::new(realm)
    }

    pub fn config(&self) -> &RealmConfig {
        &self.config
    }

    pub(crate) fn intrinsics(&self) -> Intrinsics {
        self.intrinsics
    }

    /// Number of objects allocated so far.
    pub fn heap_size(&self) -> usize {
        self.heap.borrow().len()
    }

    /// Number of functions currently executing.
    pub fn call_depth(&self) -> usize {
        self.frames.borrow().len()
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Create an external function implemented natively.
    pub fn native_function<F>(&self, name: &str, f: F) -> JsValue
    where
        F: Fn(&Realm, &JsValue, &[JsValue]) -> EngineResult<JsValue> + 'static,
    {
        self.alloc_function(name, Rc::new(f), None)
    }

    /// Install a native function as a property of `target`.
    pub fn define_function<F>(&self, target: &JsValue, name: &str, f: F) -> EngineResult<()>
    where
        F: Fn(&Realm, &JsValue, &[JsValue]) -> EngineResult<JsValue> + 'static,
    {
        let function = self.native_function(name, f);
        self.set(target, PropertyKey::Name(name), function)
    }

    pub(crate) fn alloc_function(
        &self,
        name: &str,
        call: NativeFn,
        construct: Option<NativeCtor>,
    ) -> JsValue {
        let mut object = JsObject::new(
            Some(self.intrinsics.function_prototype),
            ObjectKind::Function(FunctionData {
                name: Rc::from(name),
                call,
                construct,
            }),
        );
        object
            .props
            .define("name", JsValue::from(name), PropertyFlags::CONFIGURABLE);
        object
            .props
            .define("length", JsValue::Number(0.0), PropertyFlags::CONFIGURABLE);
        JsValue::Object(self.heap.borrow_mut().alloc(object))
    }

    /// Define a property with explicit attributes, ignoring existing ones.
    pub fn define_property(
        &self,
        target: &JsValue,
        name: &str,
        value: JsValue,
        flags: PropertyFlags,
    ) -> EngineResult<()> {
        let id = self.expect_object(target, "define property on")?;
        if let Some(object) = self.heap.borrow_mut().get_mut(id) {
            object.props.define(name, value, flags);
        }
        Ok(())
    }

    // ========================================================================
    // Errors
    // ========================================================================

    pub fn type_error(&self, message: &str) -> JsValue {
        self.create_error("TypeError", message)
    }

    pub fn range_error(&self, message: &str) -> JsValue {
        self.create_error("RangeError", message)
    }

    fn stack_trace(&self, header: &str) -> String {
        let mut stack = header.to_string();
        let frames = self.frames.borrow();
        if frames.is_empty() {
            stack.push_str("\n    at <realm>");
        }
        for frame in frames.iter().rev().take(self.config.stack_trace_limit) {
            stack.push_str("\n    at ");
            stack.push_str(if frame.is_empty() { "<anonymous>" } else { frame });
        }
        stack
    }

    fn expect_object(&self, value: &JsValue, action: &str) -> EngineResult<ObjectId> {
        match value {
            JsValue::Object(id) => Ok(*id),
            other => Err(self.type_error(&format!(
                "Cannot {action} {}",
                self.to_display(other)
            ))),
        }
    }

    // ========================================================================
    // Internal accessors used by the built-ins
    // ========================================================================

    /// Property lookup along the prototype chain. `None` when absent.
    pub(crate) fn lookup(&self, id: ObjectId, key: PropertyKey<'_>) -> Option<JsValue> {
        let heap = self.heap.borrow();
        let mut current = Some(id);
        while let Some(cursor) = current {
            let object = heap.get(cursor)?;
            if let Some(value) = object.own(key) {
                return Some(value);
            }
            current = object.proto;
        }
        None
    }

    pub(crate) fn has_own(&self, id: ObjectId, name: &str) -> bool {
        self.heap
            .borrow()
            .get(id)
            .is_some_and(|object| match &object.kind {
                ObjectKind::Array(items) => {
                    name == "length"
                        || array_index(name).is_some_and(|i| i < items.len())
                        || object.props.get(name).is_some()
                }
                _ => object.props.get(name).is_some(),
            })
    }

    /// Elements of an array, or a `TypeError` for anything else.
    pub fn array_items(&self, value: &JsValue) -> EngineResult<Vec<JsValue>> {
        if let JsValue::Object(id) = value
            && let Some(object) = self.heap.borrow().get(*id)
            && let ObjectKind::Array(items) = &object.kind
        {
            return Ok(items.clone());
        }
        Err(self.type_error(&format!("{} is not an array", self.to_display(value))))
    }

    /// Mutate the elements of an array receiver.
    pub(crate) fn with_array_mut<R>(
        &self,
        value: &JsValue,
        f: impl FnOnce(&mut Vec<JsValue>) -> R,
    ) -> EngineResult<R> {
        if let JsValue::Object(id) = value
            && let Some(object) = self.heap.borrow_mut().get_mut(*id)
            && let ObjectKind::Array(items) = &mut object.kind
        {
            return Ok(f(items));
        }
        Err(self.type_error(&format!("{} is not an array", self.to_display(value))))
    }

    fn function_parts(&self, callee: &JsValue) -> Option<(Rc<str>, NativeFn, Option<NativeCtor>)> {
        let id = callee.as_object()?;
        let heap = self.heap.borrow();
        match &heap.get(id)?.kind {
            ObjectKind::Function(data) => Some((
                Rc::clone(&data.name),
                Rc::clone(&data.call),
                data.construct.clone(),
            )),
            _ => None,
        }
    }

    fn enter(&self, name: Rc<str>) -> FrameGuard<'_> {
        self.frames.borrow_mut().push(name);
        FrameGuard(&self.frames)
    }

    /// Single-element arrays coerce through their element; past
    /// `MAX_NESTING_DEPTH` levels the result is `NaN`.
    fn number_depth(&self, value: &JsValue, depth: usize) -> f64 {
        match value {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Bool(b) => f64::from(u8::from(*b)),
            JsValue::Number(n) => *n,
            JsValue::String(s) => parse_number(s),
            JsValue::Object(_) => match self.class_of(value) {
                ValueClass::Date => self.date_value(value).unwrap_or(f64::NAN),
                ValueClass::Array if depth >= MAX_NESTING_DEPTH => f64::NAN,
                ValueClass::Array => match self.array_items(value).unwrap_or_default().as_slice() {
                    [] => 0.0,
                    [single] => self.number_depth(single, depth + 1),
                    _ => f64::NAN,
                },
                _ => f64::NAN,
            },
        }
    }

    fn display_depth(&self, value: &JsValue, depth: usize) -> String {
        match value {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Bool(b) => b.to_string(),
            JsValue::Number(n) => number_to_string(*n),
            JsValue::String(s) => s.to_string(),
            JsValue::Object(id) => match self.class_of(value) {
                ValueClass::Array => {
                    if depth >= MAX_NESTING_DEPTH {
                        return String::new();
                    }
                    let items = self.array_items(value).unwrap_or_default();
                    items
                        .iter()
                        .map(|item| match item {
                            JsValue::Undefined | JsValue::Null => String::new(),
                            other => self.display_depth(other, depth + 1),
                        })
                        .collect::<Vec<_>>()
                        .join(",")
                }
                ValueClass::Function => {
                    let name = self
                        .function_parts(value)
                        .map(|(name, _, _)| name)
                        .unwrap_or_else(|| Rc::from(""));
                    format!("function {name}() {{ [native code] }}")
                }
                ValueClass::Date => match self.date_value(value).and_then(iso_string) {
                    Some(iso) => iso,
                    None => "Invalid Date".to_string(),
                },
                ValueClass::Error => {
                    let field = |key| {
                        self.lookup(*id, PropertyKey::Name(key))
                            .filter(|v| !v.is_undefined())
                            .map(|v| self.display_depth(&v, depth + 1))
                    };
                    let name = field("name").unwrap_or_else(|| "Error".to_string());
                    match field("message") {
                        Some(message) if !message.is_empty() => format!("{name}: {message}"),
                        _ => name,
                    }
                }
                _ => "[object Object]".to_string(),
            },
        }
    }
}

struct FrameGuard<'a>(&'a RefCell<Vec<Rc<str>>>);

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.0.borrow_mut().pop();
    }
}

/// ECMAScript TimeClip.
pub(crate) fn time_clip(millis: f64) -> f64 {
    if !millis.is_finite() || millis.abs() > MAX_TIME_VALUE {
        f64::NAN
    } else {
        millis.trunc() + 0.0
    }
}

/// `Date.prototype.toISOString` formatting.
pub(crate) fn iso_string(millis: f64) -> Option<String> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
        .map(|date| date.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// String to number coercion.
pub(crate) fn parse_number(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    if !text
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return f64::NAN;
    }
    text.parse().unwrap_or(f64::NAN)
}

fn describe_key(key: PropertyKey<'_>) -> String {
    key.to_string()
}

impl Engine for Realm {
    fn global(&self) -> JsValue {
        JsValue::Object(self.intrinsics.global)
    }

    fn get(&self, target: &JsValue, key: PropertyKey<'_>) -> EngineResult<JsValue> {
        match target {
            JsValue::Undefined | JsValue::Null => Err(self.type_error(&format!(
                "Cannot read properties of {} (reading '{}')",
                target.type_name(),
                describe_key(key)
            ))),
            JsValue::String(s) => Ok(match key {
                PropertyKey::Name("length") => JsValue::Number(s.chars().count() as f64),
                PropertyKey::Index(i) => s
                    .chars()
                    .nth(i as usize)
                    .map_or(JsValue::Undefined, |c| JsValue::from(c.to_string())),
                PropertyKey::Name(_) => JsValue::Undefined,
            }),
            JsValue::Bool(_) | JsValue::Number(_) => Ok(JsValue::Undefined),
            JsValue::Object(id) => Ok(self.lookup(*id, key).unwrap_or_default()),
        }
    }

    fn set(&self, target: &JsValue, key: PropertyKey<'_>, value: JsValue) -> EngineResult<()> {
        let id = match target {
            JsValue::Undefined | JsValue::Null => {
                return Err(self.type_error(&format!(
                    "Cannot set properties of {} (setting '{}')",
                    target.type_name(),
                    describe_key(key)
                )));
            }
            JsValue::Object(id) => *id,
            _ => return Ok(()),
        };

        let length = match (key, &value) {
            (PropertyKey::Name("length"), length) => Some(self.to_number(length)),
            _ => None,
        };
        let mut heap = self.heap.borrow_mut();
        let Some(object) = heap.get_mut(id) else {
            return Ok(());
        };

        if let ObjectKind::Array(items) = &mut object.kind {
            let index = match key {
                PropertyKey::Index(i) => Some(i as usize),
                PropertyKey::Name(name) => array_index(name),
            };
            if let Some(index) = index {
                if index >= MAX_ARRAY_LENGTH {
                    drop(heap);
                    return Err(self.range_error("Invalid array length"));
                }
                if index >= items.len() {
                    items.resize(index + 1, JsValue::Undefined);
                }
                items[index] = value;
                return Ok(());
            }
            if let Some(length) = length {
                if length.fract() != 0.0 || !(0.0..=MAX_ARRAY_LENGTH as f64).contains(&length) {
                    drop(heap);
                    return Err(self.range_error("Invalid array length"));
                }
                items.resize(length as usize, JsValue::Undefined);
                return Ok(());
            }
        }

        let name = match key {
            PropertyKey::Name(name) => name.to_string(),
            PropertyKey::Index(i) => i.to_string(),
        };
        object.props.assign(&name, value, PropertyFlags::DEFAULT);
        Ok(())
    }

    fn own_keys(&self, target: &JsValue) -> EngineResult<Vec<String>> {
        match target {
            JsValue::Undefined | JsValue::Null => Err(self.type_error(
                "Cannot convert undefined or null to object",
            )),
            JsValue::Object(id) => {
                let heap = self.heap.borrow();
                let Some(object) = heap.get(*id) else {
                    return Ok(Vec::new());
                };
                let mut keys = Vec::new();
                if let ObjectKind::Array(items) = &object.kind {
                    keys.extend((0..items.len()).map(|i| i.to_string()));
                }
                keys.extend(object.props.enumerable_keys().map(str::to_string));
                Ok(keys)
            }
            _ => Ok(Vec::new()),
        }
    }

    fn call(&self, callee: &JsValue, this: &JsValue, args: &[JsValue]) -> EngineResult<JsValue> {
        let Some((name, call, _)) = self.function_parts(callee) else {
            return Err(self.type_error(&format!(
                "{} is not a function",
                self.to_display(callee)
            )));
        };
        let _frame = self.enter(name);
        call(self, this, args)
    }

    fn construct(&self, callee: &JsValue, args: &[JsValue]) -> EngineResult<JsValue> {
        let Some((name, _, Some(construct))) = self.function_parts(callee) else {
            return Err(self.type_error(&format!(
                "{} is not a constructor",
                self.to_display(callee)
            )));
        };
        let _frame = self.enter(name);
        construct(self, args)
    }

    fn create_object(&self) -> JsValue {
        let object = JsObject::new(Some(self.intrinsics.object_prototype), ObjectKind::Ordinary);
        JsValue::Object(self.heap.borrow_mut().alloc(object))
    }

    fn create_array(&self, items: Vec<JsValue>) -> JsValue {
        let object = JsObject::new(Some(self.intrinsics.array_prototype), ObjectKind::Array(items));
        JsValue::Object(self.heap.borrow_mut().alloc(object))
    }

    fn create_date(&self, millis: f64) -> JsValue {
        let object = JsObject::new(
            Some(self.intrinsics.date_prototype),
            ObjectKind::Date(time_clip(millis)),
        );
        JsValue::Object(self.heap.borrow_mut().alloc(object))
    }

    fn create_error(&self, name: &str, message: &str) -> JsValue {
        let header = if message.is_empty() {
            name.to_string()
        } else {
            format!("{name}: {message}")
        };
        let stack = self.stack_trace(&header);
        let mut object = JsObject::new(Some(self.intrinsics.error_prototype), ObjectKind::Error);
        object.props.define("name", JsValue::from(name), PropertyFlags::HIDDEN);
        object
            .props
            .define("message", JsValue::from(message), PropertyFlags::HIDDEN);
        object.props.define("stack", JsValue::from(stack), PropertyFlags::HIDDEN);
        JsValue::Object(self.heap.borrow_mut().alloc(object))
    }

    fn create_function(&self, name: &str, callback: HostCallback) -> JsValue {
        self.alloc_function(
            name,
            Rc::new(move |_realm: &Realm, this: &JsValue, args: &[JsValue]| callback(this, args)),
            None,
        )
    }

    fn class_of(&self, value: &JsValue) -> ValueClass {
        match value {
            JsValue::Undefined => ValueClass::Undefined,
            JsValue::Null => ValueClass::Null,
            JsValue::Bool(_) => ValueClass::Boolean,
            JsValue::Number(_) => ValueClass::Number,
            JsValue::String(_) => ValueClass::String,
            JsValue::Object(id) => match self.heap.borrow().get(*id).map(|object| &object.kind) {
                Some(ObjectKind::Array(_)) => ValueClass::Array,
                Some(ObjectKind::Function(_)) => ValueClass::Function,
                Some(ObjectKind::Date(_)) => ValueClass::Date,
                Some(ObjectKind::Error) => ValueClass::Error,
                Some(ObjectKind::Ordinary) | None => ValueClass::Object,
            },
        }
    }

    fn date_value(&self, value: &JsValue) -> Option<f64> {
        let id = value.as_object()?;
        match self.heap.borrow().get(id)?.kind {
            ObjectKind::Date(millis) => Some(millis),
            _ => None,
        }
    }

    fn to_number(&self, value: &JsValue) -> f64 {
        self.number_depth(value, 0)
    }

    fn to_display(&self, value: &JsValue) -> String {
        self.display_depth(value, 0)
    }

    fn eval(&self, source: &str) -> EngineResult<JsValue> {
        eval::evaluate(self, source)
    }
}
