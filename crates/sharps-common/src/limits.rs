//! Centralized limits for the sharps crates.
//!
//! The traversals in this workspace use native recursion, so their depth is
//! bounded by the nesting of the input text or graph. These limits keep
//! adversarially deep inputs from exhausting the call stack; when one is
//! exceeded the parser or compiler fails with a grammar-class error instead
//! of aborting the process.

/// Maximum nesting depth accepted by the literal parser, the expression
/// parser, and the compiler's translate pass.
///
/// Each nested object/array literal adds a handful of stack frames. 500
/// levels stays well inside the default thread stack while admitting any
/// plausible real-world graph.
pub const MAX_NESTING_DEPTH: u32 = 500;
