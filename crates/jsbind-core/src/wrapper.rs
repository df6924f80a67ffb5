//! Exposing arbitrary host objects to external code.

use std::borrow::Cow;
use std::rc::Rc;

use crate::function::{Func, IntoMethod};

/// A host type whose methods can be called from external code once wrapped
/// with [`Runtime::make_wrapper`](crate::Runtime::make_wrapper).
///
/// ```ignore
/// struct Counter { hits: Cell<i64> }
///
/// impl HostObject for Counter {
///     fn methods(table: &mut MethodTable<Self>) {
///         table.method("hit", Counter::hit);
///     }
/// }
/// ```
pub trait HostObject: Sized + 'static {
    fn methods(table: &mut MethodTable<Self>);
}

/// Methods collected for one receiver.
pub struct MethodTable<T> {
    receiver: Rc<T>,
    entries: Vec<(Cow<'static, str>, Func)>,
}

impl<T: 'static> MethodTable<T> {
    pub(crate) fn new(receiver: Rc<T>) -> Self {
        Self {
            receiver,
            entries: Vec::new(),
        }
    }

    /// The object being wrapped.
    pub fn receiver(&self) -> &Rc<T> {
        &self.receiver
    }

    /// Expose `method` under the external property `name`.
    pub fn method<M, Args>(&mut self, name: &'static str, method: M) -> &mut Self
    where
        M: IntoMethod<T, Args>,
    {
        let func = Func::method(&self.receiver, method).named(name);
        self.entries.push((Cow::Borrowed(name), func));
        self
    }

    pub(crate) fn into_entries(self) -> Vec<(Cow<'static, str>, Func)> {
        self.entries
    }
}
