//! Glas Core: immutable tree values for the Glas runtime
//!
//! Everything programs compute with is one persistent binary tree shape —
//! bits prefixed onto leaves, branches, or accelerated lists. This crate
//! provides that value model and its standard readings:
//!
//! - `stem`/`bits`: packed stem words and growable bit sequences
//! - `value`: the `Value` tree, structural equality/ordering/hashing
//! - `rope`: finger-tree lists with packed byte chunks
//! - `list`: the list/binary reading of values
//! - `record`: the radix-tree record reading (symbol keys)
//! - `num`: naturals, signed integers, width-preserving arithmetic
//! - `print`: human-readable display
//! - `serialize`: serde/bincode exchange form
//!
//! All operations are persistent; results share structure with their
//! inputs, which is what makes interpreter backtracking cheap.

pub mod bits;
pub mod list;
pub mod num;
pub mod print;
pub mod record;
pub mod rope;
pub mod serialize;
pub mod stem;
pub mod value;

// Re-export key types and functions
pub use bits::Bits;
pub use rope::Rope;
pub use serialize::{CodecError, TypedValue, from_bytes, to_bytes};
pub use value::{Value, symbol_bits};
