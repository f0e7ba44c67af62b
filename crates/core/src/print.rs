//! Readable display of values
//!
//! One value can encode many things; the printer tries the common readings
//! in a fixed order and falls back to raw structure:
//!
//! - unit prints `()`
//! - symbols print as bare identifiers, canonical naturals as decimal
//! - binaries of printable ASCII print as string literals, other lists as
//!   `[a, b, c]`
//! - records print `(k:v, …)` in sorted key order, single-key records as
//!   `tag:value` (this also catches variants whose payload is a bitstring)
//! - remaining bitstrings print as `0x…` (byte-aligned) or `0b…`
//! - anything else prints as a dotted pair or a bit run over its terminal
//!
//! `Debug` shares the same rendering; these forms are for humans and logs,
//! not a wire format.

use crate::record;
use crate::value::Value;
use std::fmt;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self)
    }
}

fn is_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn write_value(f: &mut fmt::Formatter<'_>, v: &Value) -> fmt::Result {
    if v.is_unit() {
        return f.write_str("()");
    }
    let bits = v.to_bits();
    if let Some(bits) = &bits {
        if let Some(name) = v.as_symbol() {
            if is_ident(&name) {
                return f.write_str(&name);
            }
        }
        if !bits.has_leading_zero() && bits.len() <= 64 {
            if let Some(n) = bits.to_u64() {
                return write!(f, "{}", n);
            }
        }
    }
    if let Some(rope) = v.as_rope() {
        if let Some(bytes) = rope.to_bytes() {
            if !bytes.is_empty() && bytes.iter().all(|b| (32..=126).contains(b)) {
                f.write_str("\"")?;
                for b in bytes {
                    let c = b as char;
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                return f.write_str("\"");
            }
        }
        f.write_str("[")?;
        for (i, item) in rope.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_value(f, &item)?;
        }
        return f.write_str("]");
    }
    if let Some(entries) = record::entries(v) {
        if !entries.is_empty() && entries.iter().all(|(n, _)| is_ident(n)) {
            if entries.len() == 1 {
                let (tag, payload) = &entries[0];
                write!(f, "{}:", tag)?;
                return write_value(f, payload);
            }
            f.write_str("(")?;
            for (i, (k, val)) in entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}:", k)?;
                write_value(f, val)?;
            }
            return f.write_str(")");
        }
    }
    if let Some(bits) = &bits {
        if let Some(bytes) = bits.to_bytes() {
            f.write_str("0x")?;
            for b in bytes {
                write!(f, "{:02x}", b)?;
            }
            return Ok(());
        }
        f.write_str("0b")?;
        for b in bits.iter() {
            f.write_str(if b { "1" } else { "0" })?;
        }
        return Ok(());
    }
    if let Some((a, b)) = v.as_pair() {
        f.write_str("(")?;
        write_value(f, &a)?;
        f.write_str(" . ")?;
        write_value(f, &b)?;
        return f.write_str(")");
    }
    // raw bit run over a terminal that fits no other reading
    let (run, _) = v.stem_run();
    f.write_str("0b")?;
    for b in run.iter() {
        f.write_str(if b { "1" } else { "0" })?;
    }
    f.write_str(":")?;
    match v.drop_bits(run.len()) {
        Some(rest) => write_value(f, &rest),
        None => Ok(()),
    }
}
