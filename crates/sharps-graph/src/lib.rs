//! Live object-graph data model for the sharps notation.
//!
//! A graph is stored in a [`ValueArena`]; nodes are addressed by
//! [`ValueId`] handles. Identity is the arena index: two structurally equal
//! nodes with different ids are distinct for sharing and cycle detection.
//! Containers are mutable in place after allocation, which is what lets the
//! parser register a label for a still-empty container and then populate it
//! while backreferences to it already resolve.

pub mod arena;
pub mod isomorphic;
pub mod value;

pub use arena::{ValueArena, ValueId};
pub use value::{
    ArrayValue, BoxedValue, DateValue, ErrorValue, FunctionValue, ObjectValue,
    PropertyAttributes, PropertySlot, RegExpValue, SingletonKind, Value,
};
