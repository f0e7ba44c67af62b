//! List operations over values
//!
//! A list is unit (empty) or a pair of head and tail-list; a binary is a
//! list of bytes. Both may be physically encoded as plain pair cells or as
//! a rope — the operations here accept either and produce ropes, so bulk
//! work stays O(log n) while observational behavior matches the pair view.

use crate::rope::Rope;
use crate::stem;
use crate::value::{Node, Value};
use std::sync::Arc;

impl Value {
    /// Wrap a rope; the empty rope is unit.
    pub fn of_rope(rope: Rope) -> Value {
        if rope.is_empty() {
            Value::unit()
        } else {
            Value {
                stem: stem::EMPTY,
                node: Arc::new(Node::Rope(rope)),
            }
        }
    }

    pub fn of_list(items: Vec<Value>) -> Value {
        Value::of_rope(Rope::from_values(items))
    }

    /// Binary: a list of bytes, stored packed.
    pub fn of_bytes(bytes: &[u8]) -> Value {
        Value::of_rope(Rope::from_bytes(bytes))
    }

    pub fn of_str(s: &str) -> Value {
        Value::of_bytes(s.as_bytes())
    }

    /// Rope view of a list; walks pair cells if needed. `None` when the
    /// value is not a well-formed list (unit-terminated pair spine).
    pub fn as_rope(&self) -> Option<Rope> {
        if !stem::is_empty(self.stem) {
            return None;
        }
        match &*self.node {
            Node::Leaf => Some(Rope::new()),
            Node::Rope(r) => Some(r.clone()),
            Node::Branch(..) => {
                let mut elems = Vec::new();
                let mut cur = self.clone();
                loop {
                    if !stem::is_empty(cur.stem) {
                        return None;
                    }
                    let tail = match &*cur.node {
                        Node::Leaf => return Some(Rope::from_values(elems)),
                        Node::Rope(r) => return Some(Rope::from_values(elems).concat(r)),
                        Node::Branch(h, t) => {
                            elems.push(h.clone());
                            t.clone()
                        }
                        Node::Stem(..) => return None,
                    };
                    cur = tail;
                }
            }
            Node::Stem(..) => None,
        }
    }

    pub fn is_list(&self) -> bool {
        self.as_rope().is_some()
    }

    /// Packed bytes of a binary.
    pub fn as_binary(&self) -> Option<Vec<u8>> {
        self.as_rope()?.to_bytes()
    }

    pub fn is_binary(&self) -> bool {
        self.as_binary().is_some()
    }

    pub fn to_str(&self) -> Option<String> {
        String::from_utf8(self.as_binary()?).ok()
    }

    pub fn list_len(&self) -> Option<usize> {
        Some(self.as_rope()?.len())
    }

    /// `l ++ r`; both operands must be lists.
    pub fn list_append(&self, other: &Value) -> Option<Value> {
        Some(Value::of_rope(self.as_rope()?.concat(&other.as_rope()?)))
    }

    /// Split after the first `n` elements; fails if `n` exceeds the length.
    pub fn list_split(&self, n: usize) -> Option<(Value, Value)> {
        let r = self.as_rope()?;
        if n > r.len() {
            return None;
        }
        let (a, b) = r.split_at(n);
        Some((Value::of_rope(a), Value::of_rope(b)))
    }

    pub fn list_take(&self, n: usize) -> Option<Value> {
        Some(self.list_split(n)?.0)
    }

    pub fn list_skip(&self, n: usize) -> Option<Value> {
        Some(self.list_split(n)?.1)
    }

    pub fn list_rev(&self) -> Option<Value> {
        Some(Value::of_rope(self.as_rope()?.reverse()))
    }

    pub fn list_item(&self, i: usize) -> Option<Value> {
        self.as_rope()?.get(i)
    }

    /// Cons: `( head, tail )`. Rope tails extend in place.
    pub fn list_pushl(head: Value, tail: &Value) -> Value {
        match tail.as_rope() {
            Some(r) => Value::of_rope(r.push_front(head)),
            None => Value::pair(head, tail.clone()),
        }
    }

    /// Uncons; fails on unit and non-pairs.
    pub fn list_popl(&self) -> Option<(Value, Value)> {
        self.as_pair()
    }

    /// Append one element at the back; the receiver must be a list.
    pub fn list_pushr(&self, last: Value) -> Option<Value> {
        Some(Value::of_rope(self.as_rope()?.push_back(last)))
    }

    /// Split off the last element.
    pub fn list_popr(&self) -> Option<(Value, Value)> {
        let (v, rest) = self.as_rope()?.pop_back()?;
        Some((v, Value::of_rope(rest)))
    }

    pub fn list_iter(&self) -> Option<crate::rope::Iter> {
        Some(self.as_rope()?.iter())
    }

    pub fn list_map(&self, f: impl Fn(&Value) -> Value) -> Option<Value> {
        Some(Value::of_list(
            self.as_rope()?.iter().map(|v| f(&v)).collect(),
        ))
    }

    pub fn list_foldl<A>(&self, init: A, f: impl Fn(A, &Value) -> A) -> Option<A> {
        let mut acc = init;
        for v in self.as_rope()?.iter() {
            acc = f(acc, &v);
        }
        Some(acc)
    }
}
