//! jsbind Proc Macros
//!
//! Derives for struct types that cross the bridge.
//!
//! # Macros
//!
//! - `#[derive(Wrapped)]` - A struct holding an external handle, with
//!   projected `Prop<T>` fields
//! - `#[derive(IntoJs)]` / `#[derive(FromJs)]` - A plain struct that travels
//!   as a plain external object
//! - `#[derive(Reflect)]` - Name-based access to handle-bearing fields
//!
//! Generated code refers to `::jsbind_core`, which must be a dependency of
//! the deriving crate.
//!
//! # Example
//!
//! ```ignore
//! use jsbind_core::{Object, Prop};
//! use jsbind_macros::Wrapped;
//!
//! #[derive(Wrapped)]
//! pub struct Array {
//!     #[js(embed)]
//!     pub object: Object,
//!     #[js(name = "length")]
//!     pub length: Prop<i64>,
//! }
//! ```

use proc_macro::TokenStream;

mod attrs;
mod derive_convert;
mod derive_reflect;
mod derive_wrapped;

/// Derive handle access and property projection for a wrapped struct.
///
/// Exactly one field must hold the handle. It may be any `HasHandle` type
/// that also implements `FromJs` (an `Object`, another wrapped struct, or an
/// `Rc`/`Box` of one).
///
/// # Field Attributes
///
/// - `#[js(embed)]` - Hold the handle publicly; the struct derefs to this
///   field, so its handle operations and accessors are promoted
/// - `#[js(handle)]` - Hold the handle privately
/// - `#[js(name = "...")]` - External property bound by a `Prop` field
///   (default: the field name)
///
/// # Generated Items
///
/// - `HasHandle`, `IntoJs` (by value and by reference), `FromJs` and `Reflect`
/// - `fn wrap(handle) -> Self`; every other field starts at its `Default`
/// - For `field: Prop<T>`: `fn field(&self) -> Result<T, _>` and
///   `fn set_field(&self, T) -> Result<(), _>`
/// - For `field: Prop<fn(A, B) -> R>`: `fn field(&self, A, B) -> Result<R, _>`
///   and `fn field_fn(&self) -> impl Fn(A, B) -> Result<R, _>`
///
/// # Example
///
/// ```ignore
/// #[derive(Wrapped)]
/// struct Wrapper {
///     #[js(handle)]
///     inner: Rc<Array>,
///     #[js(name = "slice")]
///     slice: Prop<fn(i64, i64) -> Vec<i64>>,
/// }
/// ```
#[proc_macro_derive(Wrapped, attributes(js))]
pub fn derive_wrapped(input: TokenStream) -> TokenStream {
    derive_wrapped::derive_wrapped_impl(input)
}

/// Externalize a plain struct as a new external object.
///
/// Each field becomes a property holding the field's converted value.
///
/// # Field Attributes
///
/// - `#[js(name = "...")]` - Override the property name
/// - `#[js(skip)]` - Leave the field out
#[proc_macro_derive(IntoJs, attributes(js))]
pub fn derive_into_js(input: TokenStream) -> TokenStream {
    derive_convert::derive_into_js_impl(input)
}

/// Build a plain struct from the properties of an external object.
///
/// Accepts the same field attributes as `IntoJs`; skipped fields take their
/// `Default`.
#[proc_macro_derive(FromJs, attributes(js))]
pub fn derive_from_js(input: TokenStream) -> TokenStream {
    derive_convert::derive_from_js_impl(input)
}

/// Reflect the fields of a plain struct by name.
///
/// Every field not marked `#[js(skip)]` must implement `HasHandle` and
/// `FromJs`.
///
/// # Attributes
///
/// - `#[js(name = "...")]` on the type - Override the reported type name
/// - `#[js(skip)]` on a field - Leave the field out
#[proc_macro_derive(Reflect, attributes(js))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    derive_reflect::derive_reflect_impl(input)
}
