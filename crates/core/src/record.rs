//! Radix-tree records
//!
//! A record is an ordinary value read as a radix tree: following the bits
//! of a key from the root reaches the value stored at that key. Keys are
//! null-terminated byte labels (see `symbol_bits`), so distinct labels never
//! prefix one another and every label ends at a clean branch point.
//!
//! All three operations are persistent and keep the tree canonical: insert
//! splits stems at the divergence point, delete collapses branches whose
//! other side vanished.

use crate::bits::Bits;
use crate::value::{Value, node_pair, symbol_bits};

/// Value at `key`, if the full key path exists.
pub fn lookup(key: &Bits, r: &Value) -> Option<Value> {
    let mut v = r.clone();
    let mut pos = 0usize;
    loop {
        let rem = key.len() - pos;
        if rem == 0 {
            return Some(v);
        }
        let (run, term) = v.stem_run();
        let m = key.common_prefix_from(pos, &run.slice(0, run.len().min(rem)));
        if m == rem {
            return v.drop_bits(rem);
        }
        if m < run.len() {
            return None; // diverged inside the stem
        }
        pos += m;
        let (l, rt) = node_pair(&term)?;
        v = if key.get(pos) { rt } else { l };
        pos += 1;
    }
}

/// Store `item` at `key`, replacing whatever subtree was there.
pub fn insert(key: &Bits, item: Value, r: &Value) -> Value {
    ins(key, 0, item, r)
}

fn ins(key: &Bits, pos: usize, item: Value, r: &Value) -> Value {
    let rem = key.len() - pos;
    if rem == 0 {
        return item;
    }
    let (run, term) = r.stem_run();
    let m = key.common_prefix_from(pos, &run.slice(0, run.len().min(rem)));
    if m == rem {
        // key ends at or inside the stem: keep the matched prefix, drop the rest
        return Value::of_bits_then(&run.slice(0, rem), item);
    }
    if m < run.len() {
        // stem divergence: split into a branch
        let old = r
            .drop_bits(m + 1)
            .unwrap_or_else(Value::unit);
        let new = Value::of_bits_then(&key.slice(pos + m + 1, key.len()), item);
        let branch = if key.get(pos + m) {
            Value::pair(old, new)
        } else {
            Value::pair(new, old)
        };
        return Value::of_bits_then(&run.slice(0, m), branch);
    }
    // the whole stem matched; descend into the terminal
    match node_pair(&term) {
        None => {
            // path ends here (leaf): create the remaining key bits
            let rest = Value::of_bits_then(&key.slice(pos + m, key.len()), item);
            Value::of_bits_then(&run, rest)
        }
        Some((l, rt)) => {
            let branch = if key.get(pos + m) {
                Value::pair(l, ins(key, pos + m + 1, item, &rt))
            } else {
                Value::pair(ins(key, pos + m + 1, item, &l), rt)
            };
            Value::of_bits_then(&run, branch)
        }
    }
}

/// Remove the subtree at `key`. Deleting the last path of a branch collapses
/// it back into its sibling's stem.
pub fn delete(key: &Bits, r: &Value) -> Value {
    del(key, 0, r).unwrap_or_else(Value::unit)
}

fn del(key: &Bits, pos: usize, r: &Value) -> Option<Value> {
    let rem = key.len() - pos;
    if rem == 0 {
        return None; // the whole subtree goes
    }
    let (run, term) = r.stem_run();
    let m = key.common_prefix_from(pos, &run.slice(0, run.len().min(rem)));
    if m == rem {
        // everything here lives under the key
        return None;
    }
    if m < run.len() {
        return Some(r.clone()); // key absent
    }
    match node_pair(&term) {
        None => Some(r.clone()), // path ends early; key absent
        Some((l, rt)) => {
            let bit = key.get(pos + m);
            let (child, sibling) = if bit { (rt, l) } else { (l, rt) };
            match del(key, pos + m + 1, &child) {
                Some(kept) => {
                    let branch = if bit {
                        Value::pair(sibling, kept)
                    } else {
                        Value::pair(kept, sibling)
                    };
                    Some(Value::of_bits_then(&run, branch))
                }
                None => {
                    // branch collapses onto the sibling
                    let merged = sibling.prepend_bit(!bit as u64);
                    Some(Value::of_bits_then(&run, merged))
                }
            }
        }
    }
}

// ---- symbol-keyed convenience ----

pub fn get(label: &str, r: &Value) -> Option<Value> {
    lookup(&symbol_bits(label), r)
}

pub fn put(label: &str, item: Value, r: &Value) -> Value {
    insert(&symbol_bits(label), item, r)
}

pub fn remove(label: &str, r: &Value) -> Value {
    delete(&symbol_bits(label), r)
}

/// Variant view: a single symbol label prefixed onto a payload. The label
/// must sit entirely inside the leading stem run (a branch inside the label
/// means the value has several keys).
pub fn as_variant(v: &Value) -> Option<(String, Value)> {
    let (run, _) = v.stem_run();
    let mut bytes = Vec::new();
    let mut i = 0;
    while i + 8 <= run.len() {
        let mut b = 0u8;
        for j in 0..8 {
            b = (b << 1) | run.get(i + j) as u8;
        }
        i += 8;
        if b == 0 {
            let name = String::from_utf8(bytes).ok()?;
            return Some((name, v.drop_bits(i)?));
        }
        bytes.push(b);
    }
    None
}

/// All (label, value) entries of a record, sorted by label. `None` when any
/// path fails to spell a null-terminated UTF-8 label.
pub fn entries(r: &Value) -> Option<Vec<(String, Value)>> {
    if r.is_unit() {
        return Some(Vec::new());
    }
    let mut out = Vec::new();
    collect(r, Vec::new(), 0, 0, &mut out)?;
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Some(out)
}

fn collect(
    v: &Value,
    mut label: Vec<u8>,
    mut partial: u8,
    mut nbits: u8,
    out: &mut Vec<(String, Value)>,
) -> Option<()> {
    let (run, term) = v.stem_run();
    for i in 0..run.len() {
        partial = (partial << 1) | run.get(i) as u8;
        nbits += 1;
        if nbits == 8 {
            if partial == 0 {
                let name = String::from_utf8(label).ok()?;
                let rest = v.drop_bits(i + 1)?;
                out.push((name, rest));
                return Some(());
            }
            label.push(partial);
            partial = 0;
            nbits = 0;
        }
    }
    match node_pair(&term) {
        None => None, // path ended without a label terminator
        Some((l, rt)) => {
            let mut left_label = label.clone();
            let lp = (partial << 1, nbits + 1);
            let rp = ((partial << 1) | 1, nbits + 1);
            // a byte can complete exactly at the branch bit
            step_into(&l, &mut left_label, lp.0, lp.1, out)?;
            step_into(&rt, &mut label, rp.0, rp.1, out)
        }
    }
}

fn step_into(
    v: &Value,
    label: &mut Vec<u8>,
    partial: u8,
    nbits: u8,
    out: &mut Vec<(String, Value)>,
) -> Option<()> {
    if nbits == 8 {
        if partial == 0 {
            let name = String::from_utf8(label.clone()).ok()?;
            out.push((name, v.clone()));
            return Some(());
        }
        label.push(partial);
        return collect(v, label.clone(), 0, 0, out);
    }
    collect(v, label.clone(), partial, nbits, out)
}

/// A value reads as a record when every path carries a well-formed label.
pub fn is_record(v: &Value) -> bool {
    entries(v).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: &[(&str, Value)]) -> Value {
        pairs
            .iter()
            .fold(Value::unit(), |r, (k, v)| put(k, v.clone(), &r))
    }

    #[test]
    fn test_lookup_after_insert() {
        let r = rec(&[("alpha", Value::of_byte(1)), ("beta", Value::of_byte(2))]);
        assert_eq!(get("alpha", &r), Some(Value::of_byte(1)));
        assert_eq!(get("beta", &r), Some(Value::of_byte(2)));
        assert_eq!(get("gamma", &r), None);
    }

    #[test]
    fn test_insert_overwrites() {
        let r = rec(&[("k", Value::of_byte(1))]);
        let r = put("k", Value::of_byte(9), &r);
        assert_eq!(get("k", &r), Some(Value::of_byte(9)));
    }

    #[test]
    fn test_shared_prefixes_split_correctly() {
        let r = rec(&[
            ("car", Value::of_byte(1)),
            ("cat", Value::of_byte(2)),
            ("cattle", Value::of_byte(3)),
        ]);
        assert_eq!(get("car", &r), Some(Value::of_byte(1)));
        assert_eq!(get("cat", &r), Some(Value::of_byte(2)));
        assert_eq!(get("cattle", &r), Some(Value::of_byte(3)));
        assert_eq!(get("ca", &r), None);
    }

    #[test]
    fn test_delete_then_lookup_misses() {
        let r = rec(&[("a", Value::of_byte(1)), ("b", Value::of_byte(2))]);
        let r = remove("a", &r);
        assert_eq!(get("a", &r), None);
        assert_eq!(get("b", &r), Some(Value::of_byte(2)));
    }

    #[test]
    fn test_delete_collapses_to_canonical_form() {
        // inserting then deleting a second key restores the original value
        let one = rec(&[("only", Value::of_byte(7))]);
        let two = put("other", Value::of_byte(8), &one);
        let back = remove("other", &two);
        assert_eq!(back, one);
    }

    #[test]
    fn test_delete_absent_is_identity() {
        let r = rec(&[("x", Value::of_byte(1))]);
        assert_eq!(remove("y", &r), r);
        assert_eq!(remove("xy", &r), r);
    }

    #[test]
    fn test_delete_last_key_yields_unit() {
        let r = rec(&[("x", Value::of_byte(1))]);
        assert!(remove("x", &r).is_unit());
    }

    #[test]
    fn test_distinct_key_ops_commute() {
        let base = rec(&[("p", Value::of_byte(1)), ("q", Value::of_byte(2))]);
        let ab = put("s", Value::of_byte(4), &put("r", Value::of_byte(3), &base));
        let ba = put("r", Value::of_byte(3), &put("s", Value::of_byte(4), &base));
        assert_eq!(ab, ba);

        let da = remove("q", &put("r", Value::of_byte(3), &base));
        let ad = put("r", Value::of_byte(3), &remove("q", &base));
        assert_eq!(da, ad);
    }

    #[test]
    fn test_lookup_mid_stem_returns_remainder() {
        // the radix view is defined on arbitrary bit paths, not only labels
        let r = rec(&[("cattle", Value::of_byte(3))]);
        let partial = lookup(&crate::bits::Bits::from_bytes(b"cat"), &r);
        assert!(partial.is_some());
        let rest = partial.unwrap();
        assert_eq!(get("", &rest), None);
        assert_eq!(
            lookup(&crate::value::symbol_bits("tle"), &rest),
            Some(Value::of_byte(3))
        );
    }

    #[test]
    fn test_as_variant() {
        let v = Value::variant("data", Value::of_byte(5));
        assert_eq!(as_variant(&v), Some(("data".to_string(), Value::of_byte(5))));
        let s = Value::symbol("fail");
        assert_eq!(as_variant(&s), Some(("fail".to_string(), Value::unit())));
        assert_eq!(as_variant(&Value::unit()), None);
        assert_eq!(as_variant(&Value::of_byte(3)), None);
    }

    #[test]
    fn test_entries_sorted() {
        let r = rec(&[
            ("zeta", Value::of_byte(1)),
            ("alpha", Value::of_byte(2)),
            ("mid", Value::of_byte(3)),
        ]);
        let es = entries(&r).unwrap();
        let names: Vec<&str> = es.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert!(is_record(&r));
    }

    #[test]
    fn test_entries_rejects_non_records() {
        assert!(entries(&Value::of_byte(3)).is_none());
        assert!(!is_record(&Value::pair(Value::of_byte(1), Value::unit())));
        // unit is the empty record
        assert_eq!(entries(&Value::unit()), Some(Vec::new()));
    }
}
