//! Typed closures and methods as [`HostFunction`]s.

use std::any::Any;
use std::rc::Rc;

use crate::convert::IntoJs;
use crate::error::BridgeError;
use crate::value::JsValue;

use super::{CallContext, FromCallArg, HostFunction};

/// Functions that can be boxed with [`Func::new`](super::Func::new).
///
/// `Args` is a tuple of the parameter types, inferred from the closure.
pub trait IntoHostFunction<Args>: 'static {
    /// Code address when `self` is a function pointer.
    fn code_address(&self) -> Option<usize>;

    fn into_host_function(self) -> Rc<dyn HostFunction>;
}

/// Methods that can be bound with [`Func::method`](super::Func::method).
///
/// Implemented for `Fn(&T, A..) -> R`, so `Type::method` paths work directly.
pub trait IntoMethod<T, Args>: 'static {
    /// Code address when `self` is a function pointer.
    fn code_address(&self) -> Option<usize>;

    fn into_method(self, receiver: Rc<T>) -> Rc<dyn HostFunction>;
}

macro_rules! impl_into_host_function {
    ($($A:ident $a:ident),*) => {
        impl<F, R, $($A,)*> IntoHostFunction<($($A,)*)> for F
        where
            F: Fn($($A),*) -> R + 'static,
            R: IntoJs + 'static,
            $($A: FromCallArg + 'static,)*
        {
            fn code_address(&self) -> Option<usize> {
                (self as &dyn Any)
                    .downcast_ref::<fn($($A),*) -> R>()
                    .map(|f| *f as usize)
            }

            fn into_host_function(self) -> Rc<dyn HostFunction> {
                Rc::new(move |cx: &CallContext<'_>| -> Result<JsValue, BridgeError> {
                    #[allow(unused_mut, unused_variables)]
                    let mut next = 0usize;
                    $(let $a = <$A as FromCallArg>::from_call(cx, &mut next)?;)*
                    (self)($($a),*).into_js(cx.runtime())
                })
            }
        }

        impl<F, T, R, $($A,)*> IntoMethod<T, ($($A,)*)> for F
        where
            F: Fn(&T, $($A),*) -> R + 'static,
            T: 'static,
            R: IntoJs + 'static,
            $($A: FromCallArg + 'static,)*
        {
            fn code_address(&self) -> Option<usize> {
                (self as &dyn Any)
                    .downcast_ref::<fn(&T, $($A),*) -> R>()
                    .map(|f| *f as usize)
            }

            fn into_method(self, receiver: Rc<T>) -> Rc<dyn HostFunction> {
                Rc::new(move |cx: &CallContext<'_>| -> Result<JsValue, BridgeError> {
                    #[allow(unused_mut, unused_variables)]
                    let mut next = 0usize;
                    $(let $a = <$A as FromCallArg>::from_call(cx, &mut next)?;)*
                    (self)(&receiver, $($a),*).into_js(cx.runtime())
                })
            }
        }
    };
}

impl_into_host_function!();
impl_into_host_function!(A1 a1);
impl_into_host_function!(A1 a1, A2 a2);
impl_into_host_function!(A1 a1, A2 a2, A3 a3);
impl_into_host_function!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_into_host_function!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_into_host_function!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_into_host_function!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
impl_into_host_function!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);
