//! Name-based access to fields and methods of handles and wrapped structs.
//!
//! Reading a projected field through [`Reflect::field`] performs the same
//! `Get` as its generated accessor, and [`Reflect::set_field`] the same `Set`.
//! For an [`Object`], fields are the external object's own enumerable
//! properties and methods are the reference wrapper operations. Listing the
//! fields of `null` or `undefined` fails with the external `TypeError`.

use crate::error::BridgeError;
use crate::object::Object;

/// Run-time introspection by name.
pub trait Reflect {
    /// Name of the reflected type.
    fn type_name(&self) -> &'static str;

    /// Names accepted by [`Reflect::field`], in declaration order.
    fn field_names(&self) -> Result<Vec<String>, BridgeError>;

    fn field(&self, name: &str) -> Result<Object, BridgeError>;

    fn set_field(&mut self, name: &str, value: Object) -> Result<(), BridgeError>;

    /// Names accepted by [`Reflect::call_method`].
    fn method_names(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn call_method(&self, name: &str, _args: Vec<Object>) -> Result<Object, BridgeError> {
        Err(BridgeError::NoSuchMember {
            type_name: self.type_name(),
            member: name.to_string(),
        })
    }
}

const OBJECT_METHODS: &[&str] = &[
    "get", "set", "index", "set_index", "length", "call", "invoke", "new",
];

impl Object {
    fn reflected_arg(&self, name: &str, args: &[Object], index: usize) -> Result<Object, BridgeError> {
        args.get(index).cloned().ok_or_else(|| {
            BridgeError::host(format!("{name} expects at least {} argument(s)", index + 1))
        })
    }
}

impl Reflect for Object {
    fn type_name(&self) -> &'static str {
        "Object"
    }

    fn field_names(&self) -> Result<Vec<String>, BridgeError> {
        self.runtime()
            .engine()
            .own_keys(self.raw())
            .map_err(|thrown| self.runtime().raise(thrown))
    }

    fn field(&self, name: &str) -> Result<Object, BridgeError> {
        self.get(name)
    }

    fn set_field(&mut self, name: &str, value: Object) -> Result<(), BridgeError> {
        self.set(name, value)
    }

    fn method_names(&self) -> Vec<&'static str> {
        OBJECT_METHODS.to_vec()
    }

    fn call_method(&self, name: &str, args: Vec<Object>) -> Result<Object, BridgeError> {
        let runtime = self.runtime();
        match name {
            "get" => {
                let key: String = self.reflected_arg(name, &args, 0)?.to()?;
                self.get(&key)
            }
            "set" => {
                let key: String = self.reflected_arg(name, &args, 0)?.to()?;
                self.set(&key, self.reflected_arg(name, &args, 1)?)?;
                Ok(runtime.undefined())
            }
            "index" => {
                let index: usize = self.reflected_arg(name, &args, 0)?.to()?;
                self.index(index)
            }
            "set_index" => {
                let index: usize = self.reflected_arg(name, &args, 0)?.to()?;
                self.set_index(index, self.reflected_arg(name, &args, 1)?)?;
                Ok(runtime.undefined())
            }
            "length" => runtime.externalize(self.length()?),
            "call" => {
                let method: String = self.reflected_arg(name, &args, 0)?.to()?;
                self.call(&method, args[1..].to_vec())
            }
            "invoke" => self.invoke(args),
            "new" => self.new(args),
            _ => Err(BridgeError::NoSuchMember {
                type_name: self.type_name(),
                member: name.to_string(),
            }),
        }
    }
}
