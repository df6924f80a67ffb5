//! Per-call context of a boxed host function.

use std::ops::{Deref, DerefMut};

use crate::convert::FromJs;
use crate::error::BridgeError;
use crate::object::Object;
use crate::runtime::Runtime;

/// Receiver and arguments of one external call into a host function.
///
/// A context exists only for the duration of the call it describes and is
/// passed explicitly, so nested calls each see their own receiver and
/// arguments.
pub struct CallContext<'rt> {
    runtime: &'rt Runtime,
    this: Object,
    arguments: Vec<Object>,
}

impl<'rt> CallContext<'rt> {
    pub(crate) fn new(runtime: &'rt Runtime, this: Object, arguments: Vec<Object>) -> Self {
        Self {
            runtime,
            this,
            arguments,
        }
    }

    pub fn runtime(&self) -> &'rt Runtime {
        self.runtime
    }

    /// The receiver the external caller used (`undefined` for plain calls).
    pub fn this(&self) -> &Object {
        &self.this
    }

    /// The full argument list, in call order.
    pub fn arguments(&self) -> &[Object] {
        &self.arguments
    }

    pub fn arg_count(&self) -> usize {
        self.arguments.len()
    }

    /// The argument at `index`, or `undefined` past the end.
    pub fn argument(&self, index: usize) -> Object {
        self.arguments
            .get(index)
            .cloned()
            .unwrap_or_else(|| self.runtime.undefined())
    }

    /// The argument at `index`, converted.
    pub fn arg<T: FromJs>(&self, index: usize) -> Result<T, BridgeError> {
        T::from_js(self.argument(index))
    }
}

/// A parameter of a boxed host function, extracted from the call context.
///
/// `next` is the position of the next unconsumed argument.
pub trait FromCallArg: Sized {
    fn from_call(cx: &CallContext<'_>, next: &mut usize) -> Result<Self, BridgeError>;
}

impl<T: FromJs> FromCallArg for T {
    fn from_call(cx: &CallContext<'_>, next: &mut usize) -> Result<Self, BridgeError> {
        let value = cx.argument(*next);
        *next += 1;
        T::from_js(value)
    }
}

/// The call's receiver. Consumes no argument.
#[derive(Clone, Debug, PartialEq)]
pub struct This(pub Object);

impl FromCallArg for This {
    fn from_call(cx: &CallContext<'_>, _next: &mut usize) -> Result<Self, BridgeError> {
        Ok(This(cx.this().clone()))
    }
}

impl Deref for This {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.0
    }
}

/// Every argument of the call. Consumes no argument.
#[derive(Clone, Debug, PartialEq)]
pub struct Arguments(pub Vec<Object>);

impl FromCallArg for Arguments {
    fn from_call(cx: &CallContext<'_>, _next: &mut usize) -> Result<Self, BridgeError> {
        Ok(Arguments(cx.arguments().to_vec()))
    }
}

impl Deref for Arguments {
    type Target = [Object];

    fn deref(&self) -> &[Object] {
        &self.0
    }
}

/// All remaining arguments, each converted to `T`.
///
/// Must be the last value-consuming parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Variadic<T>(pub Vec<T>);

impl<T: FromJs> FromCallArg for Variadic<T> {
    fn from_call(cx: &CallContext<'_>, next: &mut usize) -> Result<Self, BridgeError> {
        let rest = cx
            .arguments()
            .iter()
            .skip(*next)
            .cloned()
            .map(T::from_js)
            .collect::<Result<Vec<_>, _>>()?;
        *next = cx.arg_count().max(*next);
        Ok(Variadic(rest))
    }
}

impl<T> Variadic<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Deref for Variadic<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

impl<T> DerefMut for Variadic<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.0
    }
}
