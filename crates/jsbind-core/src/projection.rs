//! Field projection support types.
//!
//! A wrapped struct holds one handle-bearing field and any number of [`Prop`]
//! marker fields. `#[derive(Wrapped)]` turns each marker into accessors that
//! read and write the named external property on the held handle:
//!
//! ```ignore
//! #[derive(Wrapped)]
//! struct Array {
//!     #[js(embed)]
//!     object: Object,
//!     #[js(name = "length")]
//!     length: Prop<i64>,
//!     #[js(name = "slice")]
//!     slice: Prop<fn(i64, i64) -> Vec<i64>>,
//! }
//!
//! let a = Array::wrap(array_handle);
//! a.length()?;           // Get("length")
//! a.set_length(10)?;     // Set("length", 10)
//! a.slice(2, 4)?;        // Call("slice", 2, 4)
//! let slice = a.slice_fn();
//! slice(2, 4)?;
//! ```
//!
//! Any type reaching a handle implements [`HasHandle`]. Embedding with
//! `#[js(embed)]` also derefs to the embedded value, so handle operations and
//! accessors of inner types are available on the outer type through any
//! number of levels.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::convert::{FromJs, IntoJs};
use crate::error::BridgeError;
use crate::object::Object;
use crate::runtime::Runtime;
use crate::value::JsValue;

/// Access to the external handle a value holds.
pub trait HasHandle {
    fn handle(&self) -> &Object;
}

impl HasHandle for Object {
    fn handle(&self) -> &Object {
        self
    }
}

impl<T: HasHandle + ?Sized> HasHandle for &T {
    fn handle(&self) -> &Object {
        (**self).handle()
    }
}

impl<T: HasHandle + ?Sized> HasHandle for Rc<T> {
    fn handle(&self) -> &Object {
        (**self).handle()
    }
}

impl<T: HasHandle + ?Sized> HasHandle for Box<T> {
    fn handle(&self) -> &Object {
        (**self).handle()
    }
}

/// Shared handles externalize to the handle they hold.
impl<T: HasHandle + ?Sized> IntoJs for Rc<T> {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(self.handle().raw().clone())
    }
}

impl<T: HasHandle + ?Sized> IntoJs for Box<T> {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(self.handle().raw().clone())
    }
}

impl<T: FromJs> FromJs for Rc<T> {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        T::from_js(value).map(Rc::new)
    }
}

impl<T: FromJs> FromJs for Box<T> {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        T::from_js(value).map(Box::new)
    }
}

/// Marker for a field projected onto an external property.
///
/// Holds no data; every read goes to the external object. `Prop<fn(A..) -> R>`
/// projects a method instead of a value.
pub struct Prop<T>(PhantomData<fn() -> T>);

impl<T> Prop<T> {
    pub const fn new() -> Self {
        Prop(PhantomData)
    }
}

impl<T> Default for Prop<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Prop<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Prop<T> {}

/// Markers carry no state, so they never distinguish two structs.
impl<T> PartialEq for Prop<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> fmt::Debug for Prop<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Prop")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn props_are_zero_sized_and_equal() {
        assert_eq!(std::mem::size_of::<Prop<Vec<String>>>(), 0);
        assert_eq!(Prop::<i64>::new(), Prop::default());
        assert_eq!(format!("{:?}", Prop::<fn(i64) -> i64>::new()), "Prop");
    }
}
