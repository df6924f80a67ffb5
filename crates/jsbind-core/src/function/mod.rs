//! Function bridge: boxing host functions as external callables and
//! unboxing external callables for host use.
//!
//! ## Identity
//!
//! Boxed proxies are cached per [`FunctionKey`]. Boxing the same host
//! function twice yields the same external function object, so the external
//! side sees them as strictly equal; different functions, or the same method
//! bound to different receivers, never share a proxy.
//!
//! Function items and non-capturing closures are identified by type and
//! function pointers by code address. A capturing closure is identified by
//! its `Func`, so only clones of that `Func` share a proxy.
//!
//! ```ignore
//! let add = Func::new(|a: i64, b: i64| a + b);
//! dummys.call("isEqual", (&add, &add))?; // true
//! ```

mod call_context;
mod into_host;

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::mem;
use std::rc::Rc;

pub use call_context::{Arguments, CallContext, FromCallArg, This, Variadic};
pub use into_host::{IntoHostFunction, IntoMethod};

use crate::convert::{FromJs, IntoArgs, IntoJs};
use crate::error::{BridgeError, ConversionError};
use crate::object::Object;
use crate::projection::HasHandle;
use crate::runtime::Runtime;
use crate::value::{JsValue, ValueClass};

/// Type-erased host function invoked with a [`CallContext`].
pub trait HostFunction {
    fn call(&self, cx: &CallContext<'_>) -> Result<JsValue, BridgeError>;
}

impl<F> HostFunction for F
where
    F: Fn(&CallContext<'_>) -> Result<JsValue, BridgeError>,
{
    fn call(&self, cx: &CallContext<'_>) -> Result<JsValue, BridgeError> {
        self(cx)
    }
}

/// Identity of the code behind a host function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodeKey {
    /// A function item or non-capturing closure, by type.
    Type(TypeId),
    /// A function pointer, by code address.
    Address(usize),
    /// One capturing closure value, by the address of its `Func` allocation
    /// (kept alive by the proxy).
    Instance(usize),
}

impl CodeKey {
    fn of<F: 'static>(address: Option<usize>, callable: &Rc<dyn HostFunction>) -> Self {
        match address {
            Some(address) => CodeKey::Address(address),
            None if mem::size_of::<F>() == 0 => CodeKey::Type(TypeId::of::<F>()),
            None => CodeKey::Instance(Rc::as_ptr(callable) as *const () as usize),
        }
    }
}

/// Identity of a boxed host function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FunctionKey {
    /// A free function or closure.
    Function(CodeKey),
    /// A method bound to a receiver.
    Method {
        /// Address of the receiver allocation.
        receiver: usize,
        method: CodeKey,
    },
}

/// A host function ready to cross into the external system.
///
/// Converting a `Func` outbound (passing it as an argument, setting it as a
/// property) boxes it. Clones share the same identity.
#[derive(Clone)]
pub struct Func {
    key: FunctionKey,
    name: Cow<'static, str>,
    callable: Rc<dyn HostFunction>,
}

impl Func {
    /// Box a typed function or closure.
    ///
    /// Parameters are extracted with [`FromCallArg`]: any [`FromJs`] type
    /// takes the next positional argument (missing ones read as `undefined`),
    /// [`This`] and [`Arguments`] read the call context, and a trailing
    /// [`Variadic`] collects the remaining arguments. Excess arguments are
    /// ignored. The return value is converted with [`IntoJs`]; returning
    /// `Err` throws on the external side.
    pub fn new<F, Args>(f: F) -> Self
    where
        F: IntoHostFunction<Args>,
    {
        let address = f.code_address();
        let callable = f.into_host_function();
        Self {
            key: FunctionKey::Function(CodeKey::of::<F>(address, &callable)),
            name: Cow::Borrowed(""),
            callable,
        }
    }

    /// Box a function that works on the call context directly.
    pub fn raw<F, R>(f: F) -> Self
    where
        F: Fn(&CallContext<'_>) -> R + 'static,
        R: IntoJs + 'static,
    {
        let address = (&f as &dyn Any)
            .downcast_ref::<fn(&CallContext<'_>) -> R>()
            .map(|f| *f as usize);
        let callable: Rc<dyn HostFunction> =
            Rc::new(move |cx: &CallContext<'_>| f(cx).into_js(cx.runtime()));
        Self {
            key: FunctionKey::Function(CodeKey::of::<F>(address, &callable)),
            name: Cow::Borrowed(""),
            callable,
        }
    }

    /// Box `method` bound to `receiver`.
    ///
    /// Identity is the pair of receiver allocation and method code, so the
    /// same method bound to two receivers yields two distinct proxies.
    pub fn method<T, M, Args>(receiver: &Rc<T>, method: M) -> Self
    where
        T: 'static,
        M: IntoMethod<T, Args>,
    {
        let address = method.code_address();
        let callable = method.into_method(Rc::clone(receiver));
        let key = FunctionKey::Method {
            receiver: Rc::as_ptr(receiver) as *const () as usize,
            method: CodeKey::of::<M>(address, &callable),
        };
        Self {
            key,
            name: Cow::Borrowed(""),
            callable,
        }
    }

    /// Set the external `name` of the proxy. Only the first boxing of a given
    /// identity decides the name.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn key(&self) -> FunctionKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn callable(&self) -> Rc<dyn HostFunction> {
        Rc::clone(&self.callable)
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("key", &self.key)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl IntoJs for Func {
    fn into_js(self, rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(rt.box_function(&self))
    }
}

impl IntoJs for &Func {
    fn into_js(self, rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(rt.box_function(self))
    }
}

/// An external function unboxed for host use.
///
/// Accepts any number of host arguments and invokes the function with
/// `undefined` as receiver. Converting it back outbound yields the original
/// external function.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalFn {
    target: Object,
}

impl ExternalFn {
    pub(crate) fn from_object(target: Object) -> Self {
        Self { target }
    }

    /// Invoke the function and return its raw result.
    pub fn call(&self, args: impl IntoArgs) -> Result<Object, BridgeError> {
        self.target.invoke(args)
    }

    /// Invoke the function and convert its result.
    pub fn call_as<R: FromJs>(&self, args: impl IntoArgs) -> Result<R, BridgeError> {
        R::from_js(self.call(args)?)
    }

    pub fn object(&self) -> &Object {
        &self.target
    }

    pub fn into_object(self) -> Object {
        self.target
    }
}

impl HasHandle for ExternalFn {
    fn handle(&self) -> &Object {
        &self.target
    }
}

impl IntoJs for ExternalFn {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(self.target.into_raw())
    }
}

impl IntoJs for &ExternalFn {
    fn into_js(self, _rt: &Runtime) -> Result<JsValue, BridgeError> {
        Ok(self.target.raw().clone())
    }
}

impl FromJs for ExternalFn {
    fn from_js(value: Object) -> Result<Self, BridgeError> {
        match value.class() {
            ValueClass::Function => Ok(Self::from_object(value)),
            actual => Err(ConversionError::TypeMismatch {
                expected: "function",
                actual: actual.name(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double(x: i64) -> i64 {
        x * 2
    }

    fn triple(x: i64) -> i64 {
        x * 3
    }

    #[test]
    fn function_items_key_by_code() {
        assert_eq!(Func::new(double).key(), Func::new(double).key());
        assert_ne!(Func::new(double).key(), Func::new(triple).key());
        assert!(matches!(Func::new(double).key(), FunctionKey::Function(CodeKey::Type(_))));
    }

    #[test]
    fn distinct_closures_have_distinct_keys() {
        let a = |x: i64| x;
        let b = |x: i64| x;
        assert_eq!(Func::new(a).key(), Func::new(a).key());
        assert_ne!(Func::new(a).key(), Func::new(b).key());
    }

    #[test]
    fn capturing_closures_key_by_instance() {
        let offset = 10i64;
        let first = Func::new(move |x: i64| x + offset);
        let clone = first.clone();
        let second = Func::new(move |x: i64| x + offset);
        assert!(matches!(first.key(), FunctionKey::Function(CodeKey::Instance(_))));
        assert_eq!(first.key(), clone.key());
        assert_ne!(first.key(), second.key());
    }

    #[test]
    fn function_pointers_key_by_address() {
        let p: fn(i64) -> i64 = double;
        let q: fn(i64) -> i64 = triple;
        assert_eq!(Func::new(p).key(), Func::new(p).key());
        assert_ne!(Func::new(p).key(), Func::new(q).key());
        assert!(matches!(Func::new(p).key(), FunctionKey::Function(CodeKey::Address(_))));
    }

    #[test]
    fn raw_function_pointers_key_by_address() {
        fn arity(cx: &CallContext<'_>) -> usize {
            cx.arguments().len()
        }
        let p: fn(&CallContext<'_>) -> usize = arity;
        assert_eq!(Func::raw(p).key(), Func::raw(p).key());
        assert!(matches!(Func::raw(p).key(), FunctionKey::Function(CodeKey::Address(_))));
    }

    struct Counter;

    impl Counter {
        fn bump(&self, by: i64) -> i64 {
            by
        }

        fn drop_by(&self, by: i64) -> i64 {
            -by
        }
    }

    #[test]
    fn bound_methods_key_by_receiver_and_method() {
        let one = Rc::new(Counter);
        let two = Rc::new(Counter);
        assert_eq!(
            Func::method(&one, Counter::bump).key(),
            Func::method(&one, Counter::bump).key()
        );
        assert_ne!(
            Func::method(&one, Counter::bump).key(),
            Func::method(&two, Counter::bump).key()
        );

        let bump: fn(&Counter, i64) -> i64 = Counter::bump;
        let drop_by: fn(&Counter, i64) -> i64 = Counter::drop_by;
        assert_eq!(Func::method(&one, bump).key(), Func::method(&one, bump).key());
        assert_ne!(Func::method(&one, bump).key(), Func::method(&one, drop_by).key());
    }

    #[test]
    fn naming() {
        let func = Func::new(double).named("double");
        assert_eq!(func.name(), "double");
        assert_eq!(Func::new(triple).name(), "");
    }
}
