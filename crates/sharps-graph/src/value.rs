//! Graph node variants and property slots.

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::Serialize;

use crate::arena::ValueId;

bitflags! {
    /// Property descriptor attribute flags. Object and array literals built
    /// by the parser carry all three, matching ordinary literal semantics.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PropertyAttributes: u8 {
        const ENUMERABLE   = 1 << 0;
        const WRITABLE     = 1 << 1;
        const CONFIGURABLE = 1 << 2;
    }
}

impl Serialize for PropertyAttributes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

impl PropertyAttributes {
    /// The attribute set of an ordinary literal member.
    pub fn literal() -> PropertyAttributes {
        PropertyAttributes::ENUMERABLE
            | PropertyAttributes::WRITABLE
            | PropertyAttributes::CONFIGURABLE
    }
}

/// One own property of an object, or one occupied array slot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum PropertySlot {
    /// A data property.
    Value {
        value: ValueId,
        attrs: PropertyAttributes,
    },
    /// An accessor property. Either half may be absent; an absent half is
    /// omitted from serialized output entirely.
    Accessor {
        get: Option<ValueId>,
        set: Option<ValueId>,
        attrs: PropertyAttributes,
    },
}

impl PropertySlot {
    /// A data slot with ordinary literal attributes.
    pub fn data(value: ValueId) -> PropertySlot {
        PropertySlot::Value {
            value,
            attrs: PropertyAttributes::literal(),
        }
    }

    pub fn is_enumerable(&self) -> bool {
        match self {
            PropertySlot::Value { attrs, .. } | PropertySlot::Accessor { attrs, .. } => {
                attrs.contains(PropertyAttributes::ENUMERABLE)
            }
        }
    }
}

/// An object node: insertion-ordered own properties.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ObjectValue {
    pub properties: IndexMap<String, PropertySlot>,
}

impl ObjectValue {
    pub fn new() -> ObjectValue {
        ObjectValue {
            properties: IndexMap::new(),
        }
    }

    /// Define or overwrite a property, preserving insertion order for new
    /// keys (the defineProperty of this data model).
    pub fn define(&mut self, key: impl Into<String>, slot: PropertySlot) {
        self.properties.insert(key.into(), slot);
    }
}

/// An array node. `None` elements are holes: absent positions, distinct
/// from slots holding `undefined`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ArrayValue {
    pub elements: Vec<Option<PropertySlot>>,
}

impl ArrayValue {
    pub fn new() -> ArrayValue {
        ArrayValue {
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, slot: PropertySlot) {
        self.elements.push(Some(slot));
    }

    pub fn push_hole(&mut self) {
        self.elements.push(None);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// A function value. Functions are opaque to this system: they carry their
/// canonical source text and are never invoked.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunctionValue {
    pub source: String,
}

/// A regular expression value, carried as its literal text (`/x/g`).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegExpValue {
    pub source: String,
}

/// A date value, carried as milliseconds since the epoch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DateValue {
    pub millis: f64,
}

/// An error object: constructor name, message, optional file/line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorValue {
    pub name: String,
    pub message: String,
    pub file_name: Option<String>,
    pub line_number: u32,
}

/// A boxed primitive wrapper object.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum BoxedValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

/// A well-known namespace object rendered as a bare identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SingletonKind {
    Math,
    Json,
}

impl SingletonKind {
    pub fn identifier(&self) -> &'static str {
        match self {
            SingletonKind::Math => "Math",
            SingletonKind::Json => "JSON",
        }
    }
}

/// A graph node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(ObjectValue),
    Array(ArrayValue),
    Function(FunctionValue),
    RegExp(RegExpValue),
    Date(DateValue),
    ErrorObj(ErrorValue),
    Boxed(BoxedValue),
    Singleton(SingletonKind),
}

impl Value {
    /// Whether this node is an object in the host sense: a node with
    /// identity that participates in sharing/cycle marking. Primitives are
    /// compared by value and never receive labels.
    pub fn is_object_like(&self) -> bool {
        !matches!(
            self,
            Value::Undefined
                | Value::Null
                | Value::Bool(_)
                | Value::Number(_)
                | Value::String(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_attributes() {
        let attrs = PropertyAttributes::literal();
        assert!(attrs.contains(PropertyAttributes::ENUMERABLE));
        assert!(attrs.contains(PropertyAttributes::WRITABLE));
        assert!(attrs.contains(PropertyAttributes::CONFIGURABLE));
    }

    #[test]
    fn test_object_preserves_insertion_order() {
        let mut obj = ObjectValue::new();
        obj.define("zebra", PropertySlot::data(ValueId(0)));
        obj.define("apple", PropertySlot::data(ValueId(1)));
        let keys: Vec<&str> = obj.properties.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["zebra", "apple"]);
    }

    #[test]
    fn test_object_like() {
        assert!(!Value::Null.is_object_like());
        assert!(!Value::Number(0.0).is_object_like());
        assert!(Value::Array(ArrayValue::new()).is_object_like());
        assert!(Value::Singleton(SingletonKind::Math).is_object_like());
    }
}
