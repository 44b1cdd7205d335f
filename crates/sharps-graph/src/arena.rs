//! Arena storage for graph nodes.
//!
//! Nodes are stored contiguously and referenced by index. The index is the
//! node's identity: the serializer keys its visit registry by `ValueId` and
//! the parser's sharp table maps labels to `ValueId`s, which sidesteps any
//! need for reference-identity hashing.

use serde::Serialize;

use crate::value::{
    ArrayValue, BoxedValue, DateValue, FunctionValue, ObjectValue, RegExpValue, Value,
};

/// Handle to a node in a [`ValueArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ValueId(pub u32);

/// Arena-based storage for graph nodes.
#[derive(Debug, Default, Serialize)]
pub struct ValueArena {
    pub values: Vec<Value>,
}

impl ValueArena {
    pub fn new() -> ValueArena {
        ValueArena { values: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> ValueArena {
        ValueArena {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Add a node to the arena and return its id.
    pub fn alloc(&mut self, value: Value) -> ValueId {
        let index = self.values.len() as u32;
        self.values.push(value);
        ValueId(index)
    }

    pub fn get(&self, id: ValueId) -> Option<&Value> {
        self.values.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: ValueId) -> Option<&mut Value> {
        self.values.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // --- Convenience constructors ---

    /// Allocate an empty object, to be populated in place.
    pub fn alloc_object(&mut self) -> ValueId {
        self.alloc(Value::Object(ObjectValue::new()))
    }

    /// Allocate an empty array, to be populated in place.
    pub fn alloc_array(&mut self) -> ValueId {
        self.alloc(Value::Array(ArrayValue::new()))
    }

    pub fn alloc_bool(&mut self, value: bool) -> ValueId {
        self.alloc(Value::Bool(value))
    }

    pub fn alloc_number(&mut self, value: f64) -> ValueId {
        self.alloc(Value::Number(value))
    }

    pub fn alloc_string(&mut self, value: impl Into<String>) -> ValueId {
        self.alloc(Value::String(value.into()))
    }

    pub fn alloc_null(&mut self) -> ValueId {
        self.alloc(Value::Null)
    }

    pub fn alloc_undefined(&mut self) -> ValueId {
        self.alloc(Value::Undefined)
    }

    pub fn alloc_function(&mut self, source: impl Into<String>) -> ValueId {
        self.alloc(Value::Function(FunctionValue {
            source: source.into(),
        }))
    }

    pub fn alloc_regexp(&mut self, source: impl Into<String>) -> ValueId {
        self.alloc(Value::RegExp(RegExpValue {
            source: source.into(),
        }))
    }

    pub fn alloc_date(&mut self, millis: f64) -> ValueId {
        self.alloc(Value::Date(DateValue { millis }))
    }

    pub fn alloc_boxed(&mut self, value: BoxedValue) -> ValueId {
        self.alloc(Value::Boxed(value))
    }

    // --- Typed accessors ---

    pub fn object(&self, id: ValueId) -> Option<&ObjectValue> {
        match self.get(id)? {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn object_mut(&mut self, id: ValueId) -> Option<&mut ObjectValue> {
        match self.get_mut(id)? {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn array(&self, id: ValueId) -> Option<&ArrayValue> {
        match self.get(id)? {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn array_mut(&mut self, id: ValueId) -> Option<&mut ArrayValue> {
        match self.get_mut(id)? {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn is_object_like(&self, id: ValueId) -> bool {
        self.get(id).is_some_and(|v| v.is_object_like())
    }

    /// A short kind name for the node, used in type-mismatch messages.
    pub fn kind_name(&self, id: ValueId) -> &'static str {
        match self.get(id) {
            Some(Value::Undefined) => "undefined",
            Some(Value::Null) => "null",
            Some(Value::Bool(_)) => "boolean",
            Some(Value::Number(_)) => "number",
            Some(Value::String(_)) => "string",
            Some(Value::Object(_)) => "object",
            Some(Value::Array(_)) => "array",
            Some(Value::Function(_)) => "function",
            Some(Value::RegExp(_)) => "regexp",
            Some(Value::Date(_)) => "date",
            Some(Value::ErrorObj(_)) => "error",
            Some(Value::Boxed(_)) => "boxed primitive",
            Some(Value::Singleton(_)) => "namespace object",
            None => "invalid handle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PropertySlot;

    #[test]
    fn test_alloc_and_get() {
        let mut arena = ValueArena::new();
        let id = arena.alloc_number(42.0);
        assert_eq!(arena.get(id), Some(&Value::Number(42.0)));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_populate_after_alloc() {
        // The parser's cycle construction: allocate, share the id, then
        // mutate in place.
        let mut arena = ValueArena::new();
        let arr = arena.alloc_array();
        arena.array_mut(arr).unwrap().push(PropertySlot::data(arr));
        let elements = &arena.array(arr).unwrap().elements;
        assert_eq!(elements.len(), 1);
        match &elements[0] {
            Some(PropertySlot::Value { value, .. }) => assert_eq!(*value, arr),
            other => panic!("expected value slot, got {other:?}"),
        }
    }

    #[test]
    fn test_identity_not_coalesced() {
        let mut arena = ValueArena::new();
        let a = arena.alloc_object();
        let b = arena.alloc_object();
        assert_ne!(a, b);
        assert_eq!(arena.object(a), arena.object(b));
    }
}
