//! jsbind: a bridge between Rust values and a JavaScript-like object system.
//!
//! Host code reaches external values through [`Object`] handles, converts
//! values in both directions with [`IntoJs`]/[`FromJs`], boxes Rust closures
//! as external functions with [`Func`], and projects external properties onto
//! struct fields with `#[derive(Wrapped)]`.
//!
//! The external system sits behind the [`Engine`] trait; [`realm::Realm`] is
//! the in-process implementation shipped with the crate.
//!
//! # Example
//!
//! ```
//! use jsbind::prelude::*;
//!
//! let (_realm, rt) = jsbind::new_runtime();
//! let array = rt.eval("[1, 2, 3]").unwrap();
//! assert_eq!(array.length().unwrap(), 3);
//!
//! let double = Func::new(|x: f64| x * 2.0);
//! let doubled: Vec<f64> = array.call("map", (double,)).unwrap().to().unwrap();
//! assert_eq!(doubled, vec![2.0, 4.0, 6.0]);
//! ```
//!
//! Derived code names `::jsbind_core`, so crates using the derives depend on
//! `jsbind-core` directly.

use std::rc::Rc;

use tracing::debug;

pub use jsbind_core::*;
pub use jsbind_macros::{FromJs, IntoJs, Reflect, Wrapped};

/// The in-process external object system.
pub mod realm {
    pub use jsbind_realm::*;
}

use realm::{Realm, RealmConfig};

pub mod prelude {
    pub use jsbind_core::{
        Arguments, BridgeConfig, BridgeError, CallContext, ConversionError, ExternalException,
        ExternalFn, FromJs, Func, HasHandle, HostObject, IntoJs, MethodTable, Native, Object,
        Prop, Reflect, Runtime, This, Variadic,
    };
    pub use jsbind_macros::{FromJs, IntoJs, Reflect, Wrapped};
}

/// A fresh realm and a runtime bridged to it, with default settings.
pub fn new_runtime() -> (Rc<Realm>, Runtime) {
    new_runtime_with(RealmConfig::default(), BridgeConfig::default())
}

/// A fresh realm and a runtime bridged to it.
///
/// The realm is returned alongside the runtime so callers can install
/// native external functions with [`Realm::define_function`].
pub fn new_runtime_with(realm_config: RealmConfig, config: BridgeConfig) -> (Rc<Realm>, Runtime) {
    let realm = Realm::with_config(realm_config);
    debug!(?config, "creating runtime");
    let runtime = Runtime::with_config(Rc::clone(&realm) as Rc<dyn Engine>, config);
    (realm, runtime)
}
