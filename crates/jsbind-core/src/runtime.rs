//! The bridge runtime: engine access, function wrapper cache and the
//! choke points where failures change sides.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::convert::IntoJs;
use crate::engine::{Engine, HostCallback};
use crate::error::{BridgeError, ExternalException};
use crate::function::{CallContext, Func, FunctionKey, HostFunction};
use crate::object::Object;
use crate::value::JsValue;
use crate::wrapper::{HostObject, MethodTable};

/// Shared handle to one engine plus the bridge state attached to it.
///
/// Cloning is cheap and every clone refers to the same state. The runtime is
/// single-threaded (`!Send`); reentrant use from nested host calls is fine
/// because no interior borrow is held across an engine call.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

struct RuntimeInner {
    engine: Rc<dyn Engine>,
    config: BridgeConfig,
    functions: RefCell<FxHashMap<FunctionKey, JsValue>>,
    depth: Cell<usize>,
}

impl Runtime {
    pub fn new(engine: Rc<dyn Engine>) -> Self {
        Self::with_config(engine, BridgeConfig::default())
    }

    pub fn with_config(engine: Rc<dyn Engine>, config: BridgeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                engine,
                config,
                functions: RefCell::new(FxHashMap::default()),
                depth: Cell::new(0),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// The underlying engine.
    pub fn engine(&self) -> &dyn Engine {
        &*self.inner.engine
    }

    /// The external global object.
    pub fn global(&self) -> Object {
        self.wrap(self.engine().global())
    }

    /// The `undefined` sentinel.
    pub fn undefined(&self) -> Object {
        self.wrap(JsValue::Undefined)
    }

    /// The `null` sentinel.
    pub fn null(&self) -> Object {
        self.wrap(JsValue::Null)
    }

    /// Wrap a raw external value for host use.
    pub fn wrap(&self, value: JsValue) -> Object {
        Object::from_parts(self.clone(), value)
    }

    /// A fresh empty external object.
    pub fn new_object(&self) -> Object {
        self.wrap(self.engine().create_object())
    }

    /// Convert any host value to its external representation.
    pub fn externalize(&self, value: impl IntoJs) -> Result<Object, BridgeError> {
        Ok(self.wrap(value.into_js(self)?))
    }

    /// Execute external source text.
    pub fn eval(&self, source: &str) -> Result<Object, BridgeError> {
        let value = self.engine().eval(source).map_err(|thrown| self.raise(thrown))?;
        Ok(self.wrap(value))
    }

    /// Expose the methods of a host object as callable properties of a new
    /// external object.
    ///
    /// Each method is boxed as a bound method, so wrapping the same receiver
    /// again reuses the proxies created the first time.
    pub fn make_wrapper<T: HostObject>(&self, receiver: Rc<T>) -> Result<Object, BridgeError> {
        let mut table = MethodTable::new(receiver);
        T::methods(&mut table);
        let wrapper = self.new_object();
        for (name, func) in table.into_entries() {
            wrapper.set(&name, func)?;
        }
        Ok(wrapper)
    }

    /// Number of host functions currently boxed.
    pub fn cached_functions(&self) -> usize {
        self.inner.functions.borrow().len()
    }

    /// Convert a thrown external value into a host failure.
    pub(crate) fn raise(&self, thrown: JsValue) -> BridgeError {
        let exception = ExternalException::new(self.wrap(thrown));
        debug!(message = exception.message(), "external exception crossed into host");
        BridgeError::External(exception)
    }

    /// Box a host function, reusing the cached proxy for its identity.
    pub(crate) fn box_function(&self, func: &Func) -> JsValue {
        let key = func.key();
        if let Some(proxy) = self.inner.functions.borrow().get(&key) {
            return proxy.clone();
        }

        let runtime = Rc::downgrade(&self.inner);
        let callable = func.callable();
        let callback: HostCallback = Rc::new(move |this, args| {
            invoke_boxed(&runtime, &*callable, this, args)
        });
        let proxy = self.engine().create_function(func.name(), callback);
        debug!(?key, name = func.name(), "boxed host function");
        self.inner.functions.borrow_mut().insert(key, proxy.clone());
        proxy
    }

    /// Run a boxed host function for an external caller.
    fn invoke_host(
        &self,
        callable: &dyn HostFunction,
        this: &JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, JsValue> {
        let _guard = self.enter().map_err(|err| self.to_external(err))?;
        let cx = CallContext::new(
            self,
            self.wrap(this.clone()),
            args.iter().cloned().map(|arg| self.wrap(arg)).collect(),
        );

        let outcome = if self.config().catch_panics {
            panic::catch_unwind(AssertUnwindSafe(|| callable.call(&cx)))
        } else {
            Ok(callable.call(&cx))
        };

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(self.to_external(err)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(%message, "host panic caught at the bridge boundary");
                Err(self.to_external(BridgeError::BoundaryPanic { message }))
            }
        }
    }

    /// Turn a host failure into the value thrown on the external side.
    fn to_external(&self, err: BridgeError) -> JsValue {
        let engine = self.engine();
        let thrown = match &err {
            BridgeError::External(exception) => return exception.value().raw().clone(),
            BridgeError::Conversion(conversion) => {
                engine.create_error("TypeError", &conversion.to_string())
            }
            BridgeError::BoundaryPanic { message } => {
                engine.create_error(&self.config().panic_error_name, message)
            }
            BridgeError::ReentrancyLimit { .. } => engine.create_error("RangeError", &err.to_string()),
            BridgeError::NoSuchMember { .. } | BridgeError::Host(_) => {
                engine.create_error("Error", &err.to_string())
            }
        };
        debug!(error = %err, "host failure rethrown as external exception");
        thrown
    }

    fn enter(&self) -> Result<DepthGuard<'_>, BridgeError> {
        let depth = self.inner.depth.get();
        if let Some(limit) = self.config().max_reentrancy
            && depth >= limit
        {
            return Err(BridgeError::ReentrancyLimit { limit });
        }
        self.inner.depth.set(depth + 1);
        Ok(DepthGuard(&self.inner.depth))
    }

    /// Current nesting depth of host functions called from outside.
    pub fn depth(&self) -> usize {
        self.inner.depth.get()
    }
}

fn invoke_boxed(
    runtime: &Weak<RuntimeInner>,
    callable: &dyn HostFunction,
    this: &JsValue,
    args: &[JsValue],
) -> Result<JsValue, JsValue> {
    match runtime.upgrade() {
        Some(inner) => Runtime { inner }.invoke_host(callable, this, args),
        None => Err(JsValue::from("host runtime has been dropped")),
    }
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl PartialEq for Runtime {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("cached_functions", &self.cached_functions())
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}
