//! The emit pass.

use sharps_common::{SharpError, SharpResult};
use sharps_graph::{BoxedValue, PropertySlot, Value, ValueArena, ValueId};
use tracing::debug;

use crate::quote::{accessor_text, key_source, millis_source, number_source, quote_string};
use crate::registry::{Entered, SharpRegistry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EmitStyle {
    /// Host source text: bare keys where possible, single-quoted otherwise,
    /// `", "` separators, outermost object parenthesized.
    Source,
    /// Interchange text for the literal parser: JSON-quoted keys and
    /// strings, tight separators, plain-data values only.
    Literal,
}

/// The serializer. One `Emitter` may be reused across top-level calls;
/// its registry is torn down whenever the call depth returns to zero, so
/// nested invocations share the live registry and independent calls start
/// clean.
pub struct Emitter<'a> {
    arena: &'a ValueArena,
    registry: SharpRegistry,
    style: EmitStyle,
}

impl<'a> Emitter<'a> {
    pub fn new(arena: &'a ValueArena) -> Emitter<'a> {
        Emitter {
            arena,
            registry: SharpRegistry::new(),
            style: EmitStyle::Source,
        }
    }

    /// Serialize any single value as host source text.
    pub fn serialize_value(&mut self, id: ValueId) -> SharpResult<String> {
        self.style = EmitStyle::Source;
        self.top_level(id)
    }

    /// Serialize an array as host source text; a non-array is a type
    /// error.
    pub fn serialize_array(&mut self, id: ValueId) -> SharpResult<String> {
        if self.arena.array(id).is_none() {
            return Err(SharpError::type_mismatch(format!(
                "serialize_array called on incompatible {}",
                self.arena.kind_name(id)
            )));
        }
        self.style = EmitStyle::Source;
        self.top_level(id)
    }

    /// Serialize a plain-data graph in the literal interchange style.
    pub fn serialize_literal(&mut self, id: ValueId) -> SharpResult<String> {
        self.style = EmitStyle::Literal;
        self.top_level(id)
    }

    fn top_level(&mut self, id: ValueId) -> SharpResult<String> {
        let result = self.value_source(id);
        if result.is_err() {
            // Tear the registry down on abnormal exit of the outermost
            // call; nested calls see a consistent depth either way.
            if self.registry.depth() == 0 {
                self.registry.reset();
            }
        }
        debug!(ok = result.is_ok(), "serialized value");
        result
    }

    // =========================================================================
    // Values
    // =========================================================================

    fn value_source(&mut self, id: ValueId) -> SharpResult<String> {
        let value = self
            .arena
            .get(id)
            .ok_or_else(|| SharpError::internal("invalid handle during serialization"))?;

        if !value.is_object_like() {
            return self.primitive_source(value);
        }

        let outermost = self.registry.depth() == 0;
        match self.registry.enter(self.arena, id)? {
            Entered::AlreadyEmitted(label) => Ok(format!("#{label}#")),
            Entered::Fresh(label) => {
                if label.is_some() {
                    // From here on, references back into this node render
                    // as backreferences.
                    self.registry.set_emitted(id);
                }
                let parenthesize = outermost && label.is_none();
                let body = self.object_like_source(id, parenthesize);
                let left = self.registry.leave();
                let body = body?;
                left?;
                Ok(match label {
                    Some(n) => format!("#{n}={body}"),
                    None => body,
                })
            }
        }
    }

    fn object_like_source(&mut self, id: ValueId, parenthesize: bool) -> SharpResult<String> {
        let value = self
            .arena
            .get(id)
            .ok_or_else(|| SharpError::internal("invalid handle during serialization"))?;
        match value {
            Value::Object(obj) => {
                let body = self.object_source(obj)?;
                Ok(if parenthesize && self.style == EmitStyle::Source {
                    format!("({body})")
                } else {
                    body
                })
            }
            Value::Array(arr) => self.array_source(arr),
            Value::Function(f) => match self.style {
                EmitStyle::Source => Ok(f.source.clone()),
                EmitStyle::Literal => Err(self.not_literal(id)),
            },
            Value::RegExp(r) => match self.style {
                EmitStyle::Source => Ok(r.source.clone()),
                EmitStyle::Literal => Err(self.not_literal(id)),
            },
            Value::Date(d) => match self.style {
                EmitStyle::Source => Ok(format!("(new Date({}))", millis_source(d.millis))),
                EmitStyle::Literal => Err(self.not_literal(id)),
            },
            Value::ErrorObj(e) => match self.style {
                EmitStyle::Source => {
                    let message = quote_string(&e.message, '"');
                    let file = e
                        .file_name
                        .as_deref()
                        .map_or_else(|| "(void 0)".to_string(), |f| quote_string(f, '"'));
                    let line = if e.line_number == 0 {
                        String::new()
                    } else {
                        format!(", {}", e.line_number)
                    };
                    Ok(format!("(new {}({message}, {file}{line}))", e.name))
                }
                EmitStyle::Literal => Err(self.not_literal(id)),
            },
            Value::Boxed(b) => match self.style {
                EmitStyle::Source => Ok(match b {
                    BoxedValue::Boolean(v) => format!("(new Boolean({v}))"),
                    BoxedValue::Number(v) => format!("(new Number({}))", number_source(*v)),
                    BoxedValue::String(v) => format!("(new String({}))", quote_string(v, '"')),
                }),
                EmitStyle::Literal => Err(self.not_literal(id)),
            },
            Value::Singleton(kind) => match self.style {
                EmitStyle::Source => Ok(kind.identifier().to_string()),
                EmitStyle::Literal => Err(self.not_literal(id)),
            },
            _ => Err(SharpError::internal("primitive reached container emission")),
        }
    }

    fn primitive_source(&mut self, value: &Value) -> SharpResult<String> {
        match (value, self.style) {
            (Value::Undefined, EmitStyle::Source) => Ok("(void 0)".to_string()),
            (Value::Undefined, EmitStyle::Literal) => Err(SharpError::type_mismatch(
                "undefined is not representable in literal interchange form",
            )),
            (Value::Null, _) => Ok("null".to_string()),
            (Value::Bool(b), _) => Ok(b.to_string()),
            (Value::Number(n), EmitStyle::Source) => Ok(number_source(*n)),
            (Value::Number(n), EmitStyle::Literal) => {
                if n.is_finite() {
                    Ok(number_source(*n))
                } else {
                    Err(SharpError::type_mismatch(
                        "non-finite number is not representable in literal interchange form",
                    ))
                }
            }
            (Value::String(s), EmitStyle::Source) => Ok(quote_string(s, '"')),
            (Value::String(s), EmitStyle::Literal) => serde_json::to_string(s)
                .map_err(|_| SharpError::internal("string failed to quote")),
            _ => Err(SharpError::internal("object reached primitive emission")),
        }
    }

    fn not_literal(&self, id: ValueId) -> SharpError {
        SharpError::type_mismatch(format!(
            "{} is not representable in literal interchange form",
            self.arena.kind_name(id)
        ))
    }

    // =========================================================================
    // Containers
    // =========================================================================

    fn object_source(&mut self, obj: &sharps_graph::ObjectValue) -> SharpResult<String> {
        let mut chars = String::from("{");
        let mut comma = false;
        let separator = match self.style {
            EmitStyle::Source => ", ",
            EmitStyle::Literal => ",",
        };

        for (key, slot) in &obj.properties {
            if !slot.is_enumerable() {
                continue;
            }
            match slot {
                PropertySlot::Value { value, .. } => {
                    if comma {
                        chars.push_str(separator);
                    }
                    comma = true;
                    chars.push_str(&self.member_key(key)?);
                    chars.push(':');
                    chars.push_str(&self.value_source(*value)?);
                }
                PropertySlot::Accessor { get, set, .. } => {
                    if self.style == EmitStyle::Literal {
                        return Err(SharpError::type_mismatch(
                            "accessor property is not representable in literal interchange form",
                        ));
                    }
                    for (keyword, func) in [("get", get), ("set", set)] {
                        // An absent half is censored from the output.
                        let Some(func) = func else { continue };
                        if comma {
                            chars.push_str(separator);
                        }
                        comma = true;
                        chars.push_str(&self.accessor_member(keyword, key, *func)?);
                    }
                }
            }
        }

        chars.push('}');
        Ok(chars)
    }

    /// Render one accessor half. Accessors never sharpen: the syntax has
    /// no place for a label, so the function's text is embedded directly,
    /// stripped of its `function` keyword and name. Text that is not
    /// function-shaped falls back to a plain data-property rendering.
    fn accessor_member(&mut self, keyword: &str, key: &str, func: ValueId) -> SharpResult<String> {
        let key = self.member_key(key)?;
        if let Some(Value::Function(f)) = self.arena.get(func) {
            if let Some(stripped) = accessor_text(&f.source) {
                return Ok(format!("{keyword} {key} {stripped}"));
            }
            return Ok(format!("{key}:{}", f.source));
        }
        let vchars = self.value_source(func)?;
        Ok(format!("{keyword} {key} {vchars}"))
    }

    fn member_key(&self, key: &str) -> SharpResult<String> {
        match self.style {
            EmitStyle::Source => Ok(key_source(key)),
            EmitStyle::Literal => serde_json::to_string(key)
                .map_err(|_| SharpError::internal("key failed to quote")),
        }
    }

    fn array_source(&mut self, arr: &sharps_graph::ArrayValue) -> SharpResult<String> {
        let mut sb = String::from("[");
        let separator = match self.style {
            EmitStyle::Source => ", ",
            EmitStyle::Literal => ",",
        };

        let length = arr.elements.len();
        for (i, element) in arr.elements.iter().enumerate() {
            let hole = element.is_none();
            match element {
                Some(PropertySlot::Value { value, .. }) => {
                    sb.push_str(&self.value_source(*value)?);
                }
                Some(PropertySlot::Accessor { .. }) => {
                    // Array literal syntax cannot carry accessors in
                    // either style.
                    return Err(SharpError::type_mismatch(
                        "accessor element is not representable in array literal syntax",
                    ));
                }
                None => {}
            }
            if i + 1 != length {
                sb.push_str(separator);
            } else if hole {
                // A trailing hole needs one extra comma to stay
                // distinguishable from "no trailing element".
                sb.push(',');
            }
        }

        sb.push(']');
        Ok(sb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharps_graph::{PropertyAttributes, SingletonKind};

    fn arena() -> ValueArena {
        ValueArena::new()
    }

    #[test]
    fn test_primitives_source() {
        let mut a = arena();
        let cases = [
            (a.alloc_undefined(), "(void 0)"),
            (a.alloc_null(), "null"),
            (a.alloc_bool(true), "true"),
            (a.alloc_number(-0.0), "-0"),
            (a.alloc_number(1.5), "1.5"),
            (a.alloc_string("a\nb"), "\"a\\nb\""),
        ];
        for (id, expected) in cases {
            assert_eq!(serialize_value_str(&a, id), expected);
        }
    }

    fn serialize_value_str(a: &ValueArena, id: ValueId) -> String {
        Emitter::new(a).serialize_value(id).unwrap()
    }

    #[test]
    fn test_plain_object_parenthesized() {
        let mut a = arena();
        let one = a.alloc_number(1.0);
        let obj = a.alloc_object();
        a.object_mut(obj).unwrap().define("a", PropertySlot::data(one));
        assert_eq!(serialize_value_str(&a, obj), "({a:1})");
    }

    #[test]
    fn test_nested_object_not_parenthesized() {
        let mut a = arena();
        let inner = a.alloc_object();
        let outer = a.alloc_array();
        a.array_mut(outer).unwrap().push(PropertySlot::data(inner));
        assert_eq!(serialize_value_str(&a, outer), "[{}]");
    }

    #[test]
    fn test_self_cycle() {
        let mut a = arena();
        let obj = a.alloc_object();
        a.object_mut(obj).unwrap().define("me", PropertySlot::data(obj));
        assert_eq!(serialize_value_str(&a, obj), "#1={me:#1#}");
    }

    #[test]
    fn test_cyclic_array() {
        let mut a = arena();
        let arr = a.alloc_array();
        a.array_mut(arr).unwrap().push(PropertySlot::data(arr));
        assert_eq!(serialize_value_str(&a, arr), "#1=[#1#]");
    }

    #[test]
    fn test_shared_array_single_label() {
        // [x, x]: one label, on x, never on the outer array.
        let mut a = arena();
        let x = a.alloc_array();
        let outer = a.alloc_array();
        {
            let arr = a.array_mut(outer).unwrap();
            arr.push(PropertySlot::data(x));
            arr.push(PropertySlot::data(x));
        }
        assert_eq!(serialize_value_str(&a, outer), "[#1=[], #1#]");
    }

    #[test]
    fn test_holes() {
        let mut a = arena();
        let one = a.alloc_number(1.0);
        let three = a.alloc_number(3.0);
        let arr = a.alloc_array();
        {
            let array = a.array_mut(arr).unwrap();
            array.push(PropertySlot::data(one));
            array.push_hole();
            array.push(PropertySlot::data(three));
        }
        assert_eq!(serialize_value_str(&a, arr), "[1, , 3]");

        let trailing = a.alloc_array();
        let one = a.alloc_number(1.0);
        {
            let array = a.array_mut(trailing).unwrap();
            array.push(PropertySlot::data(one));
            array.push_hole();
        }
        assert_eq!(serialize_value_str(&a, trailing), "[1, ,]");
    }

    #[test]
    fn test_key_quoting() {
        let mut a = arena();
        let one = a.alloc_number(1.0);
        let two = a.alloc_number(2.0);
        let three = a.alloc_number(3.0);
        let obj = a.alloc_object();
        {
            let object = a.object_mut(obj).unwrap();
            object.define("plain", PropertySlot::data(one));
            object.define("0", PropertySlot::data(two));
            object.define("a b", PropertySlot::data(three));
        }
        assert_eq!(
            serialize_value_str(&a, obj),
            "({plain:1, 0:2, 'a b':3})"
        );
    }

    #[test]
    fn test_non_enumerable_skipped() {
        let mut a = arena();
        let one = a.alloc_number(1.0);
        let two = a.alloc_number(2.0);
        let obj = a.alloc_object();
        {
            let object = a.object_mut(obj).unwrap();
            object.define("a", PropertySlot::data(one));
            object.define(
                "hidden",
                PropertySlot::Value {
                    value: two,
                    attrs: PropertyAttributes::WRITABLE | PropertyAttributes::CONFIGURABLE,
                },
            );
        }
        assert_eq!(serialize_value_str(&a, obj), "({a:1})");
    }

    #[test]
    fn test_accessors() {
        let mut a = arena();
        let getter = a.alloc_function("function () { return 1; }");
        let obj = a.alloc_object();
        a.object_mut(obj).unwrap().define(
            "x",
            PropertySlot::Accessor {
                get: Some(getter),
                set: None,
                attrs: PropertyAttributes::ENUMERABLE | PropertyAttributes::CONFIGURABLE,
            },
        );
        assert_eq!(serialize_value_str(&a, obj), "({get x () { return 1; }})");
    }

    #[test]
    fn test_templates() {
        let mut a = arena();
        let date = a.alloc_date(0.0);
        assert_eq!(serialize_value_str(&a, date), "(new Date(0))");

        let boxed = a.alloc_boxed(BoxedValue::Number(-0.0));
        assert_eq!(serialize_value_str(&a, boxed), "(new Number(-0))");

        let regex = a.alloc_regexp("/x/g");
        assert_eq!(serialize_value_str(&a, regex), "/x/g");

        let math = a.alloc(Value::Singleton(SingletonKind::Math));
        assert_eq!(serialize_value_str(&a, math), "Math");

        let error = a.alloc(Value::ErrorObj(sharps_graph::ErrorValue {
            name: "TypeError".to_string(),
            message: "boom".to_string(),
            file_name: None,
            line_number: 0,
        }));
        assert_eq!(
            serialize_value_str(&a, error),
            "(new TypeError(\"boom\", (void 0)))"
        );
    }

    #[test]
    fn test_serialize_array_type_error() {
        let mut a = arena();
        let obj = a.alloc_object();
        let err = Emitter::new(&a).serialize_array(obj).unwrap_err();
        match err {
            SharpError::TypeMismatch { message } => {
                assert!(message.contains("incompatible object"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_literal_style() {
        let mut a = arena();
        let one = a.alloc_number(1.0);
        let obj = a.alloc_object();
        a.object_mut(obj).unwrap().define("me", PropertySlot::data(obj));
        a.object_mut(obj).unwrap().define("n", PropertySlot::data(one));
        let text = Emitter::new(&a).serialize_literal(obj).unwrap();
        assert_eq!(text, "#1={\"me\":#1#,\"n\":1}");
    }

    #[test]
    fn test_literal_style_rejects_functions() {
        let mut a = arena();
        let f = a.alloc_function("function () {}");
        let arr = a.alloc_array();
        a.array_mut(arr).unwrap().push(PropertySlot::data(f));
        assert!(matches!(
            Emitter::new(&a).serialize_literal(arr),
            Err(SharpError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_emitter_reusable_after_error() {
        let mut a = arena();
        let f = a.alloc_undefined();
        let arr = a.alloc_array();
        a.array_mut(arr).unwrap().push(PropertySlot::data(f));
        let ok = a.alloc_array();

        let mut emitter = Emitter::new(&a);
        assert!(emitter.serialize_literal(arr).is_err());
        assert_eq!(emitter.serialize_literal(ok).unwrap(), "[]");
    }

    #[test]
    fn test_shared_date_gets_label() {
        let mut a = arena();
        let date = a.alloc_date(5.0);
        let arr = a.alloc_array();
        {
            let array = a.array_mut(arr).unwrap();
            array.push(PropertySlot::data(date));
            array.push(PropertySlot::data(date));
        }
        assert_eq!(
            serialize_value_str(&a, arr),
            "[#1=(new Date(5)), #1#]"
        );
    }
}
