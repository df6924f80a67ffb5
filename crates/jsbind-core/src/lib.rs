//! Core of the jsbind bridge between Rust and a JavaScript-like object system.
//!
//! ## Key Types
//!
//! - [`Runtime`]: engine access plus the function wrapper cache
//! - [`Object`]: handle to an external value with get/set/call operations
//! - [`IntoJs`] / [`FromJs`]: outbound and inbound conversions
//! - [`Func`] / [`ExternalFn`]: boxed host functions and unboxed external ones
//! - [`CallContext`], [`This`], [`Arguments`], [`Variadic`]: per-call context
//! - [`Prop`] / [`HasHandle`]: field projection for wrapped structs
//! - [`Reflect`]: name-based access to fields and methods
//! - [`BridgeError`]: every failure that crosses the boundary
//!
//! The external system itself sits behind the [`Engine`] trait.

mod config;
mod convert;
mod engine;
mod error;
mod function;
mod object;
mod projection;
mod reflect;
mod runtime;
mod value;
mod wrapper;

pub use config::BridgeConfig;
pub use convert::{FromJs, IntoArgs, IntoJs};
pub use engine::{Engine, EngineResult, HostCallback};
pub use error::{BridgeError, ConversionError, ExternalException};
pub use function::{
    Arguments, CallContext, CodeKey, ExternalFn, FromCallArg, Func, FunctionKey, HostFunction,
    IntoHostFunction, IntoMethod, This, Variadic,
};
pub use object::{MAX_NATIVE_DEPTH, Native, Object};
pub use projection::{HasHandle, Prop};
pub use reflect::Reflect;
pub use runtime::Runtime;
pub use value::{JsValue, MAX_SAFE_INTEGER, ObjectId, PropertyKey, ValueClass, number_to_string};
pub use wrapper::{HostObject, MethodTable};
