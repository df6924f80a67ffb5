//! The seam between the bridge and the external execution engine.
//!
//! The bridge never inspects external objects directly. Everything it needs
//! is expressed through [`Engine`], which a concrete object system implements.
//! Fallible operations report an external throw as `Err(value)` carrying the
//! thrown value; the [`Runtime`](crate::Runtime) converts those at a single
//! choke point into [`BridgeError::External`](crate::BridgeError::External).
//!
//! Engines are single-threaded and must tolerate reentrancy: any call into a
//! host callback may call back into the engine before returning. Implementors
//! must not hold interior borrows across [`Engine::call`] or
//! [`Engine::construct`].

use std::rc::Rc;

use crate::value::{JsValue, PropertyKey, ValueClass};

/// Result of an engine operation; the error is the thrown external value.
pub type EngineResult<T> = Result<T, JsValue>;

/// Host code registered as an external function.
///
/// Receives the call's `this` value and the full argument list. Returning
/// `Err` throws the value on the external side.
pub type HostCallback = Rc<dyn Fn(&JsValue, &[JsValue]) -> EngineResult<JsValue>>;

/// Operations the external object system exposes to the bridge.
pub trait Engine {
    /// The global object.
    fn global(&self) -> JsValue;

    /// Read a property. Missing properties yield `undefined`; reading from
    /// `null` or `undefined` throws.
    fn get(&self, target: &JsValue, key: PropertyKey<'_>) -> EngineResult<JsValue>;

    /// Write a property.
    fn set(&self, target: &JsValue, key: PropertyKey<'_>, value: JsValue) -> EngineResult<()>;

    /// Own enumerable property names, in insertion order.
    fn own_keys(&self, target: &JsValue) -> EngineResult<Vec<String>>;

    /// Call `callee` with the given receiver.
    fn call(&self, callee: &JsValue, this: &JsValue, args: &[JsValue]) -> EngineResult<JsValue>;

    /// Invoke `callee` as a constructor.
    fn construct(&self, callee: &JsValue, args: &[JsValue]) -> EngineResult<JsValue>;

    fn create_object(&self) -> JsValue;

    fn create_array(&self, items: Vec<JsValue>) -> JsValue;

    /// Create a date from milliseconds since the Unix epoch.
    fn create_date(&self, millis: f64) -> JsValue;

    /// Create an error object of the given constructor name.
    fn create_error(&self, name: &str, message: &str) -> JsValue;

    /// Expose a host callback as an external function object.
    fn create_function(&self, name: &str, callback: HostCallback) -> JsValue;

    fn class_of(&self, value: &JsValue) -> ValueClass;

    /// Milliseconds since the epoch for date objects, `None` otherwise.
    fn date_value(&self, value: &JsValue) -> Option<f64>;

    /// Numeric coercion (`+value`) that never runs external code.
    fn to_number(&self, value: &JsValue) -> f64;

    /// String coercion (`String(value)`) that never runs external code.
    fn to_display(&self, value: &JsValue) -> String;

    /// Execute external source text and return its completion value.
    fn eval(&self, source: &str) -> EngineResult<JsValue>;
}
