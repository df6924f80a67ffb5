//! Object storage for the realm.
//!
//! Objects live for as long as the realm does; ids are plain indices and are
//! never reused.

use std::rc::Rc;

use bitflags::bitflags;
use jsbind_core::{EngineResult, JsValue, ObjectId, PropertyKey};
use rustc_hash::FxHashMap;

use crate::realm::Realm;

/// External-side function body. Receives `this` and the arguments.
pub type NativeFn = Rc<dyn Fn(&Realm, &JsValue, &[JsValue]) -> EngineResult<JsValue>>;

/// Constructor body invoked by `new`.
pub type NativeCtor = Rc<dyn Fn(&Realm, &[JsValue]) -> EngineResult<JsValue>>;

bitflags! {
    /// Attributes of a data property.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PropertyFlags: u8 {
        const WRITABLE = 1 << 0;
        const ENUMERABLE = 1 << 1;
        const CONFIGURABLE = 1 << 2;

        /// Attributes of a property created by assignment.
        const DEFAULT = Self::WRITABLE.bits() | Self::ENUMERABLE.bits() | Self::CONFIGURABLE.bits();
        /// Attributes of built-in methods.
        const HIDDEN = Self::WRITABLE.bits() | Self::CONFIGURABLE.bits();
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Property {
    pub key: Rc<str>,
    pub value: JsValue,
    pub flags: PropertyFlags,
}

/// Own properties in insertion order.
#[derive(Default)]
pub(crate) struct Properties {
    entries: Vec<Property>,
    index: FxHashMap<Rc<str>, usize>,
}

impl Properties {
    pub fn get(&self, key: &str) -> Option<&Property> {
        self.index.get(key).map(|&slot| &self.entries[slot])
    }

    /// Assign `value`, creating the property with `flags` when missing.
    /// Returns false when an existing property is read-only.
    pub fn assign(&mut self, key: &str, value: JsValue, flags: PropertyFlags) -> bool {
        if let Some(&slot) = self.index.get(key) {
            let property = &mut self.entries[slot];
            if !property.flags.contains(PropertyFlags::WRITABLE) {
                return false;
            }
            property.value = value;
            return true;
        }
        let key: Rc<str> = Rc::from(key);
        self.index.insert(Rc::clone(&key), self.entries.len());
        self.entries.push(Property { key, value, flags });
        true
    }

    /// Create or overwrite a property regardless of its attributes.
    pub fn define(&mut self, key: &str, value: JsValue, flags: PropertyFlags) {
        if let Some(&slot) = self.index.get(key) {
            self.entries[slot] = Property {
                key: Rc::clone(&self.entries[slot].key),
                value,
                flags,
            };
        } else {
            self.assign(key, value, flags);
        }
    }

    pub fn enumerable_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|property| property.flags.contains(PropertyFlags::ENUMERABLE))
            .map(|property| &*property.key)
    }
}

pub(crate) struct FunctionData {
    pub name: Rc<str>,
    pub call: NativeFn,
    pub construct: Option<NativeCtor>,
}

pub(crate) enum ObjectKind {
    Ordinary,
    Array(Vec<JsValue>),
    Function(FunctionData),
    Date(f64),
    Error,
}

pub(crate) struct JsObject {
    pub proto: Option<ObjectId>,
    pub props: Properties,
    pub kind: ObjectKind,
}

impl JsObject {
    pub fn new(proto: Option<ObjectId>, kind: ObjectKind) -> Self {
        Self {
            proto,
            props: Properties::default(),
            kind,
        }
    }

    /// Own property lookup, including the virtual properties of arrays.
    pub fn own(&self, key: PropertyKey<'_>) -> Option<JsValue> {
        if let ObjectKind::Array(items) = &self.kind {
            match key {
                PropertyKey::Index(i) => return Some(element(items, i as usize)),
                PropertyKey::Name("length") => return Some(JsValue::Number(items.len() as f64)),
                PropertyKey::Name(name) => {
                    if let Some(i) = array_index(name) {
                        return Some(element(items, i));
                    }
                }
            }
        }
        match key {
            PropertyKey::Name(name) => self.props.get(name).map(|p| p.value.clone()),
            PropertyKey::Index(i) => self.props.get(&i.to_string()).map(|p| p.value.clone()),
        }
    }
}

fn element(items: &[JsValue], index: usize) -> JsValue {
    items.get(index).cloned().unwrap_or_default()
}

/// Canonical array index form of a property name.
pub(crate) fn array_index(name: &str) -> Option<usize> {
    if name.is_empty() || (name.len() > 1 && name.starts_with('0')) {
        return None;
    }
    if !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse::<u32>().ok().filter(|&i| i != u32::MAX).map(|i| i as usize)
}

#[derive(Default)]
pub(crate) struct Heap {
    objects: Vec<JsObject>,
}

impl Heap {
    pub fn alloc(&mut self, object: JsObject) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&JsObject> {
        self.objects.get(id.index())
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut JsObject> {
        self.objects.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_keep_insertion_order() {
        let mut props = Properties::default();
        props.assign("b", JsValue::Number(1.0), PropertyFlags::DEFAULT);
        props.assign("a", JsValue::Number(2.0), PropertyFlags::DEFAULT);
        props.assign("hidden", JsValue::Null, PropertyFlags::HIDDEN);
        props.assign("b", JsValue::Number(3.0), PropertyFlags::DEFAULT);

        let keys: Vec<_> = props.enumerable_keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(props.get("b").map(|p| p.value.clone()), Some(JsValue::Number(3.0)));
    }

    #[test]
    fn read_only_properties_reject_assignment() {
        let mut props = Properties::default();
        props.define("fixed", JsValue::Bool(true), PropertyFlags::ENUMERABLE);
        assert!(!props.assign("fixed", JsValue::Bool(false), PropertyFlags::DEFAULT));
        assert_eq!(props.get("fixed").map(|p| p.value.clone()), Some(JsValue::Bool(true)));
    }

    #[test]
    fn array_index_names() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("42"), Some(42));
        assert_eq!(array_index("042"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("length"), None);
        assert_eq!(array_index(""), None);
    }

    #[test]
    fn arrays_expose_length_and_elements() {
        let array = JsObject::new(
            None,
            ObjectKind::Array(vec![JsValue::Number(1.0), JsValue::Number(2.0)]),
        );
        assert_eq!(array.own(PropertyKey::Name("length")), Some(JsValue::Number(2.0)));
        assert_eq!(array.own(PropertyKey::Index(1)), Some(JsValue::Number(2.0)));
        assert_eq!(array.own(PropertyKey::Name("0")), Some(JsValue::Number(1.0)));
        assert_eq!(array.own(PropertyKey::Index(5)), Some(JsValue::Undefined));
        assert_eq!(array.own(PropertyKey::Name("push")), None);
    }
}
