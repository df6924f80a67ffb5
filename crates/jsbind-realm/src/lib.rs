//! An in-process JavaScript-like object system.
//!
//! [`Realm`] implements the [`jsbind_core::Engine`] seam, so a
//! [`jsbind_core::Runtime`] can be built directly on top of it:
//!
//! ```
//! use jsbind_core::Runtime;
//! use jsbind_realm::Realm;
//!
//! let realm = Realm::new();
//! let rt = Runtime::new(realm);
//! let answer: i64 = rt.eval("[40, 41, 42][2]").unwrap().to().unwrap();
//! assert_eq!(answer, 42);
//! ```
//!
//! The realm provides objects with prototype chains, dense arrays, dates,
//! error objects with a `stack`, native functions, a handful of built-in
//! constructors and an expression-only `eval`.

mod builtins;
mod eval;
mod heap;
mod realm;

use jsbind_core::JsValue;

pub use heap::{NativeCtor, NativeFn, PropertyFlags};
pub use realm::{MAX_ARRAY_LENGTH, Realm, RealmConfig};

/// Argument `index` of a native call, or `undefined` past the end.
pub fn argument(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or_default()
}
