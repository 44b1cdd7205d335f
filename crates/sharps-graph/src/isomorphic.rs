//! Identity-aware graph comparison.
//!
//! Deep equality alone cannot validate a round trip: two deep-equal graphs
//! may still differ in which sub-objects are shared. This checker walks both
//! graphs with a work list and maintains a bijection between their node
//! identities in both directions, so aliasing and cycles must correspond
//! exactly. Functions compare by their canonical source text.

use rustc_hash::FxHashMap;

use crate::arena::{ValueArena, ValueId};
use crate::value::{PropertySlot, Value};

/// Check that the graph at `a` in `arena_a` is isomorphic to the graph at
/// `b` in `arena_b`, including sharing structure. Returns a description of
/// the first mismatch found.
pub fn check(
    arena_a: &ValueArena,
    a: ValueId,
    arena_b: &ValueArena,
    b: ValueId,
) -> Result<(), String> {
    let mut ab: FxHashMap<ValueId, ValueId> = FxHashMap::default();
    let mut ba: FxHashMap<ValueId, ValueId> = FxHashMap::default();
    let mut queue: Vec<(ValueId, ValueId, String)> = vec![(a, b, String::new())];

    while let Some((a, b, at)) = queue.pop() {
        let va = arena_a
            .get(a)
            .ok_or_else(|| format!("invalid handle on left side{at}"))?;
        let vb = arena_b
            .get(b)
            .ok_or_else(|| format!("invalid handle on right side{at}"))?;

        if va.is_object_like() {
            // Identity: once a pair is mapped, every later encounter must
            // hit the same pair from both directions.
            match (ab.get(&a), ba.get(&b)) {
                (Some(&mapped_b), _) => {
                    if mapped_b != b {
                        return Err(format!("sharing mismatch{at}"));
                    }
                    continue;
                }
                (None, Some(_)) => return Err(format!("sharing mismatch{at}")),
                (None, None) => {
                    ab.insert(a, b);
                    ba.insert(b, a);
                }
            }
        }

        match (va, vb) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => {}
            (Value::Bool(x), Value::Bool(y)) if x == y => {}
            (Value::Number(x), Value::Number(y)) if number_equal(*x, *y) => {}
            (Value::String(x), Value::String(y)) if x == y => {}
            (Value::Function(x), Value::Function(y)) if x.source == y.source => {}
            (Value::RegExp(x), Value::RegExp(y)) if x.source == y.source => {}
            (Value::Date(x), Value::Date(y)) if number_equal(x.millis, y.millis) => {}
            (Value::ErrorObj(x), Value::ErrorObj(y)) if x == y => {}
            (Value::Boxed(x), Value::Boxed(y)) if x == y => {}
            (Value::Singleton(x), Value::Singleton(y)) if x == y => {}
            (Value::Object(oa), Value::Object(ob)) => {
                if oa.properties.len() != ob.properties.len() {
                    return Err(format!("property count mismatch{at}"));
                }
                for ((ka, sa), (kb, sb)) in oa.properties.iter().zip(ob.properties.iter()) {
                    if ka != kb {
                        return Err(format!("key order mismatch{at}: {ka:?} vs {kb:?}"));
                    }
                    let here = format!("{at}.{ka}");
                    enqueue_slots(sa, sb, &here, &mut queue)?;
                }
            }
            (Value::Array(xa), Value::Array(xb)) => {
                if xa.elements.len() != xb.elements.len() {
                    return Err(format!("length mismatch{at}"));
                }
                for (i, (ea, eb)) in xa.elements.iter().zip(xb.elements.iter()).enumerate() {
                    let here = format!("{at}[{i}]");
                    match (ea, eb) {
                        (None, None) => {}
                        (Some(sa), Some(sb)) => enqueue_slots(sa, sb, &here, &mut queue)?,
                        _ => return Err(format!("hole mismatch{here}")),
                    }
                }
            }
            _ => {
                return Err(format!(
                    "value mismatch{at}: {va:?} vs {vb:?}"
                ));
            }
        }
    }

    Ok(())
}

fn enqueue_slots(
    sa: &PropertySlot,
    sb: &PropertySlot,
    at: &str,
    queue: &mut Vec<(ValueId, ValueId, String)>,
) -> Result<(), String> {
    match (sa, sb) {
        (
            PropertySlot::Value { value: va, attrs: aa },
            PropertySlot::Value { value: vb, attrs: ab },
        ) => {
            if aa != ab {
                return Err(format!("attribute mismatch{at}"));
            }
            queue.push((*va, *vb, at.to_string()));
        }
        (
            PropertySlot::Accessor {
                get: ga,
                set: ta,
                attrs: aa,
            },
            PropertySlot::Accessor {
                get: gb,
                set: tb,
                attrs: ab,
            },
        ) => {
            if aa != ab {
                return Err(format!("attribute mismatch{at}"));
            }
            match (ga, gb) {
                (None, None) => {}
                (Some(x), Some(y)) => queue.push((*x, *y, format!("{at}.[[Get]]"))),
                _ => return Err(format!("getter presence mismatch{at}")),
            }
            match (ta, tb) {
                (None, None) => {}
                (Some(x), Some(y)) => queue.push((*x, *y, format!("{at}.[[Set]]"))),
                _ => return Err(format!("setter presence mismatch{at}")),
            }
        }
        _ => return Err(format!("slot kind mismatch{at}")),
    }
    Ok(())
}

/// Number equality for graph comparison: NaN equals NaN, and the two zeros
/// are distinct.
fn number_equal(a: f64, b: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    if a == 0.0 && b == 0.0 {
        return a.is_sign_negative() == b.is_sign_negative();
    }
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PropertySlot;

    #[test]
    fn test_deep_equal_but_shared_differently() {
        // Left: [x, x]. Right: [x, y] with y deep-equal to x. Not isomorphic.
        let mut a = ValueArena::new();
        let xa = a.alloc_object();
        let roota = a.alloc_array();
        {
            let arr = a.array_mut(roota).unwrap();
            arr.push(PropertySlot::data(xa));
            arr.push(PropertySlot::data(xa));
        }

        let mut b = ValueArena::new();
        let xb = b.alloc_object();
        let yb = b.alloc_object();
        let rootb = b.alloc_array();
        {
            let arr = b.array_mut(rootb).unwrap();
            arr.push(PropertySlot::data(xb));
            arr.push(PropertySlot::data(yb));
        }

        assert!(check(&a, roota, &b, rootb).is_err());
    }

    #[test]
    fn test_cycles_match() {
        let mut a = ValueArena::new();
        let ra = a.alloc_array();
        a.array_mut(ra).unwrap().push(PropertySlot::data(ra));

        let mut b = ValueArena::new();
        let rb = b.alloc_array();
        b.array_mut(rb).unwrap().push(PropertySlot::data(rb));

        assert_eq!(check(&a, ra, &b, rb), Ok(()));
    }

    #[test]
    fn test_negative_zero_distinct() {
        let mut a = ValueArena::new();
        let na = a.alloc_number(-0.0);
        let mut b = ValueArena::new();
        let nb = b.alloc_number(0.0);
        assert!(check(&a, na, &b, nb).is_err());
    }

    #[test]
    fn test_nan_equal() {
        let mut a = ValueArena::new();
        let na = a.alloc_number(f64::NAN);
        let mut b = ValueArena::new();
        let nb = b.alloc_number(f64::NAN);
        assert_eq!(check(&a, na, &b, nb), Ok(()));
    }
}
