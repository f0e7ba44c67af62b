//! Serialization of values
//!
//! Provides a serializable mirror of runtime values for persistence and
//! exchange with external systems. This is an exchange form, not a
//! canonical wire format.
//!
//! # Why TypedValue?
//!
//! The runtime `Value` shares structure through `Arc` and hides its chunked
//! stem and rope encodings. `TypedValue` captures the *logical* tree — the
//! canonical stem-run decomposition — with owned buffers, so serde/bincode
//! can walk it and two equal values always serialize to identical bytes.
//! Binaries keep a packed byte fast path.

use crate::bits::Bits;
use crate::value::{Node, Value};
use serde::{Deserialize, Serialize};

/// Error during serialization/deserialization
#[derive(Debug)]
pub enum CodecError {
    /// Bincode encoding/decoding error (preserves original error for debugging)
    Bincode(Box<bincode::Error>),
    /// A decoded structure that violates the format's invariants
    Malformed(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Bincode(e) => write!(f, "Bincode error: {}", e),
            CodecError::Malformed(msg) => write!(f, "Malformed value data: {}", msg),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Bincode(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<bincode::Error> for CodecError {
    fn from(e: bincode::Error) -> Self {
        CodecError::Bincode(Box::new(e))
    }
}

/// Serializable mirror of the logical value tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    Unit,
    /// Bitstring: `len` bits packed MSB-first into bytes, then a leaf.
    Bits { len: u64, bytes: Vec<u8> },
    /// Stem run over a non-leaf terminal.
    Stem {
        len: u64,
        bytes: Vec<u8>,
        rest: Box<TypedValue>,
    },
    Branch(Box<TypedValue>, Box<TypedValue>),
    /// Byte-list fast path.
    Binary(Vec<u8>),
    List(Vec<TypedValue>),
}

impl TypedValue {
    pub fn from_value(v: &Value) -> TypedValue {
        if v.is_unit() {
            return TypedValue::Unit;
        }
        if let Some(rope) = v.as_rope() {
            if let Some(bytes) = rope.to_bytes() {
                return TypedValue::Binary(bytes);
            }
            return TypedValue::List(rope.iter().map(|e| TypedValue::from_value(&e)).collect());
        }
        let (run, term) = v.stem_run();
        let terminal = match &*term {
            Node::Leaf => {
                return TypedValue::Bits {
                    len: run.len() as u64,
                    bytes: run.to_padded_bytes(),
                };
            }
            _ => {
                // non-leaf terminal is a pair view (rope handled above)
                match crate::value::node_pair(&term) {
                    Some((l, r)) => TypedValue::Branch(
                        Box::new(TypedValue::from_value(&l)),
                        Box::new(TypedValue::from_value(&r)),
                    ),
                    None => TypedValue::Unit,
                }
            }
        };
        if run.is_empty() {
            terminal
        } else {
            TypedValue::Stem {
                len: run.len() as u64,
                bytes: run.to_padded_bytes(),
                rest: Box::new(terminal),
            }
        }
    }

    pub fn to_value(&self) -> Result<Value, CodecError> {
        match self {
            TypedValue::Unit => Ok(Value::unit()),
            TypedValue::Bits { len, bytes } => Ok(Value::of_bits(&unpack_bits(*len, bytes)?)),
            TypedValue::Stem { len, bytes, rest } => {
                let bits = unpack_bits(*len, bytes)?;
                Ok(Value::of_bits_then(&bits, rest.to_value()?))
            }
            TypedValue::Branch(l, r) => Ok(Value::pair(l.to_value()?, r.to_value()?)),
            TypedValue::Binary(bytes) => Ok(Value::of_bytes(bytes)),
            TypedValue::List(items) => {
                let vals: Result<Vec<Value>, CodecError> =
                    items.iter().map(|t| t.to_value()).collect();
                Ok(Value::of_list(vals?))
            }
        }
    }
}

fn unpack_bits(len: u64, bytes: &[u8]) -> Result<Bits, CodecError> {
    let len = usize::try_from(len)
        .map_err(|_| CodecError::Malformed("bit length out of range".to_string()))?;
    Bits::from_padded_bytes(len, bytes)
        .ok_or_else(|| CodecError::Malformed(format!("{} bits need more bytes", len)))
}

/// Encode a value with bincode.
pub fn to_bytes(v: &Value) -> Result<Vec<u8>, CodecError> {
    Ok(bincode::serialize(&TypedValue::from_value(v))?)
}

/// Decode a value produced by `to_bytes`.
pub fn from_bytes(buf: &[u8]) -> Result<Value, CodecError> {
    let typed: TypedValue = bincode::deserialize(buf)?;
    typed.to_value()
}
