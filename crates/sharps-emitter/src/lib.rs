//! Graph serializer for the sharps notation.
//!
//! Walks a live graph, detects sharing and cycles by node identity, and
//! emits canonical sharp object text. Two passes share one registry: the
//! mark pass assigns a label to a node the *second* time that identity is
//! encountered, so nodes visited exactly once carry no label at all; the
//! emit pass prefixes the first rendering of a labeled node with `#n=` and
//! renders every later encounter as `#n#` with no body.
//!
//! Two output styles:
//! - source style (`serialize_value`, `serialize_array`): host source
//!   text, the classic `uneval` rendering
//! - literal interchange style (`serialize_literal`): the JSON-shaped
//!   surface read back by `sharps-parser`

mod emitter;
mod quote;
mod registry;

pub use emitter::Emitter;

use sharps_common::SharpResult;
use sharps_graph::{ValueArena, ValueId};

/// Serialize any single value as host source text.
pub fn serialize_value(arena: &ValueArena, id: ValueId) -> SharpResult<String> {
    Emitter::new(arena).serialize_value(id)
}

/// Serialize an array as host source text. Fails with a type error when
/// `id` is not an array.
pub fn serialize_array(arena: &ValueArena, id: ValueId) -> SharpResult<String> {
    Emitter::new(arena).serialize_array(id)
}

/// Serialize a plain-data graph in the literal interchange style.
pub fn serialize_literal(arena: &ValueArena, id: ValueId) -> SharpResult<String> {
    Emitter::new(arena).serialize_literal(id)
}
