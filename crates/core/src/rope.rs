//! Finger-tree ropes
//!
//! Accelerated representation for lists and binaries: a 2-3 finger tree
//! measured by element count, over chunks that are either packed byte runs
//! or small arrays of arbitrary values. Concatenation and splitting are
//! O(log n), the ends are amortized O(1), and byte runs merge
//! opportunistically so binaries stay contiguous for bulk extraction.
//!
//! A rope is observationally identical to the pair-encoded list it stands
//! for; `value` routes equality, ordering and hashing through the logical
//! view.

use crate::value::Value;
use std::sync::Arc;

/// Byte chunks stop growing past this, keeping edge pushes cheap.
const MAX_BYTES: usize = 384;
/// Value-array chunks stay small; elements may be arbitrarily large trees.
const MAX_VALS: usize = 32;

#[derive(Clone, Debug)]
pub(crate) enum Chunk {
    Bytes(Arc<[u8]>),
    Vals(Arc<[Value]>),
}

impl Chunk {
    fn len(&self) -> usize {
        match self {
            Chunk::Bytes(b) => b.len(),
            Chunk::Vals(v) => v.len(),
        }
    }

    fn get(&self, i: usize) -> Value {
        match self {
            Chunk::Bytes(b) => Value::of_byte(b[i]),
            Chunk::Vals(v) => v[i].clone(),
        }
    }

    fn split(&self, n: usize) -> (Chunk, Chunk) {
        debug_assert!(0 < n && n < self.len());
        match self {
            Chunk::Bytes(b) => (Chunk::Bytes(b[..n].into()), Chunk::Bytes(b[n..].into())),
            Chunk::Vals(v) => (
                Chunk::Vals(v[..n].to_vec().into()),
                Chunk::Vals(v[n..].to_vec().into()),
            ),
        }
    }

    fn of_value(v: Value) -> Chunk {
        match v.to_byte() {
            Some(b) => Chunk::Bytes(vec![b].into()),
            None => Chunk::Vals(vec![v].into()),
        }
    }

    fn reversed(&self) -> Chunk {
        match self {
            Chunk::Bytes(b) => {
                let mut v = b.to_vec();
                v.reverse();
                Chunk::Bytes(v.into())
            }
            Chunk::Vals(vs) => {
                let mut v = vs.to_vec();
                v.reverse();
                Chunk::Vals(v.into())
            }
        }
    }
}

#[derive(Clone, Debug)]
enum Item {
    Leaf(Chunk),
    Node(Arc<Node23>),
}

#[derive(Debug)]
struct Node23 {
    len: usize,
    kids: Vec<Item>,
}

impl Item {
    fn len(&self) -> usize {
        match self {
            Item::Leaf(c) => c.len(),
            Item::Node(n) => n.len,
        }
    }
}

fn items_len(items: &[Item]) -> usize {
    items.iter().map(Item::len).sum()
}

fn node_of(kids: Vec<Item>) -> Item {
    debug_assert!((2..=3).contains(&kids.len()));
    Item::Node(Arc::new(Node23 {
        len: items_len(&kids),
        kids,
    }))
}

#[derive(Clone, Debug)]
enum Tree {
    Empty,
    Single(Item),
    Deep(Arc<Deep>),
}

#[derive(Debug)]
struct Deep {
    len: usize,
    pr: Vec<Item>,
    mid: Tree,
    sf: Vec<Item>,
}

fn mk_deep(pr: Vec<Item>, mid: Tree, sf: Vec<Item>) -> Tree {
    debug_assert!((1..=4).contains(&pr.len()));
    debug_assert!((1..=4).contains(&sf.len()));
    let len = items_len(&pr) + mid.len() + items_len(&sf);
    Tree::Deep(Arc::new(Deep { len, pr, mid, sf }))
}

fn tree_of_items(items: Vec<Item>) -> Tree {
    items
        .into_iter()
        .fold(Tree::Empty, |t, it| t.push_back(it))
}

/// Deep tree with no prefix digit: borrow one item from the middle.
fn deep_borrow_front(mid: Tree, sf: Vec<Item>) -> Tree {
    match mid.pop_front() {
        Some((Item::Node(n), mid2)) => mk_deep(n.kids.clone(), mid2, sf),
        Some((leaf, mid2)) => mk_deep(vec![leaf], mid2, sf),
        None => tree_of_items(sf),
    }
}

/// Deep tree with no suffix digit: borrow one item from the middle.
fn deep_borrow_back(pr: Vec<Item>, mid: Tree) -> Tree {
    match mid.pop_back() {
        Some((Item::Node(n), mid2)) => mk_deep(pr, mid2, n.kids.clone()),
        Some((leaf, mid2)) => mk_deep(pr, mid2, vec![leaf]),
        None => tree_of_items(pr),
    }
}

impl Tree {
    fn len(&self) -> usize {
        match self {
            Tree::Empty => 0,
            Tree::Single(it) => it.len(),
            Tree::Deep(d) => d.len,
        }
    }

    fn push_front(self, it: Item) -> Tree {
        match self {
            Tree::Empty => Tree::Single(it),
            Tree::Single(b) => mk_deep(vec![it], Tree::Empty, vec![b]),
            Tree::Deep(d) => {
                if d.pr.len() == 4 {
                    let node = node_of(d.pr[1..].to_vec());
                    let mid = d.mid.clone().push_front(node);
                    mk_deep(vec![it, d.pr[0].clone()], mid, d.sf.clone())
                } else {
                    let mut pr = vec![it];
                    pr.extend_from_slice(&d.pr);
                    mk_deep(pr, d.mid.clone(), d.sf.clone())
                }
            }
        }
    }

    fn push_back(self, it: Item) -> Tree {
        match self {
            Tree::Empty => Tree::Single(it),
            Tree::Single(a) => mk_deep(vec![a], Tree::Empty, vec![it]),
            Tree::Deep(d) => {
                if d.sf.len() == 4 {
                    let node = node_of(d.sf[..3].to_vec());
                    let mid = d.mid.clone().push_back(node);
                    mk_deep(d.pr.clone(), mid, vec![d.sf[3].clone(), it])
                } else {
                    let mut sf = d.sf.clone();
                    sf.push(it);
                    mk_deep(d.pr.clone(), d.mid.clone(), sf)
                }
            }
        }
    }

    fn pop_front(&self) -> Option<(Item, Tree)> {
        match self {
            Tree::Empty => None,
            Tree::Single(it) => Some((it.clone(), Tree::Empty)),
            Tree::Deep(d) => {
                let it = d.pr[0].clone();
                let rest = if d.pr.len() > 1 {
                    mk_deep(d.pr[1..].to_vec(), d.mid.clone(), d.sf.clone())
                } else {
                    deep_borrow_front(d.mid.clone(), d.sf.clone())
                };
                Some((it, rest))
            }
        }
    }

    fn pop_back(&self) -> Option<(Item, Tree)> {
        match self {
            Tree::Empty => None,
            Tree::Single(it) => Some((it.clone(), Tree::Empty)),
            Tree::Deep(d) => {
                let it = d.sf[d.sf.len() - 1].clone();
                let rest = if d.sf.len() > 1 {
                    mk_deep(
                        d.pr.clone(),
                        d.mid.clone(),
                        d.sf[..d.sf.len() - 1].to_vec(),
                    )
                } else {
                    deep_borrow_back(d.pr.clone(), d.mid.clone())
                };
                Some((it, rest))
            }
        }
    }

    fn split_at(&self, n: usize) -> (Tree, Tree) {
        if n == 0 {
            return (Tree::Empty, self.clone());
        }
        if n >= self.len() {
            return (self.clone(), Tree::Empty);
        }
        match self {
            Tree::Empty => (Tree::Empty, Tree::Empty),
            Tree::Single(it) => {
                let (l, r) = split_item(it, n);
                (tree_of_items(l), tree_of_items(r))
            }
            Tree::Deep(d) => {
                let pl = items_len(&d.pr);
                if n < pl {
                    let (l, r) = split_items(&d.pr, n);
                    let rest = deep_borrow_front(d.mid.clone(), d.sf.clone());
                    let right = r.into_iter().rev().fold(rest, |t, it| t.push_front(it));
                    (tree_of_items(l), right)
                } else if n < pl + d.mid.len() {
                    let (ml, mr) = d.mid.split_at(n - pl);
                    (
                        deep_borrow_back(d.pr.clone(), ml),
                        deep_borrow_front(mr, d.sf.clone()),
                    )
                } else {
                    let k = n - pl - d.mid.len();
                    let (l, r) = split_items(&d.sf, k);
                    let base = deep_borrow_back(d.pr.clone(), d.mid.clone());
                    let left = l.into_iter().fold(base, |t, it| t.push_back(it));
                    (left, tree_of_items(r))
                }
            }
        }
    }

    fn get(&self, i: usize) -> Option<Value> {
        if i >= self.len() {
            return None;
        }
        match self {
            Tree::Empty => None,
            Tree::Single(it) => item_get(it, i),
            Tree::Deep(d) => {
                let pl = items_len(&d.pr);
                if i < pl {
                    items_get(&d.pr, i)
                } else if i < pl + d.mid.len() {
                    d.mid.get(i - pl)
                } else {
                    items_get(&d.sf, i - pl - d.mid.len())
                }
            }
        }
    }
}

fn concat_trees(a: Tree, b: Tree) -> Tree {
    app3(a, Vec::new(), b)
}

fn app3(a: Tree, ts: Vec<Item>, b: Tree) -> Tree {
    match (a, b) {
        (Tree::Empty, b) => ts.into_iter().rev().fold(b, |t, it| t.push_front(it)),
        (a, Tree::Empty) => ts.into_iter().fold(a, |t, it| t.push_back(it)),
        (Tree::Single(x), b) => app3(Tree::Empty, ts, b).push_front(x),
        (a, Tree::Single(y)) => app3(a, ts, Tree::Empty).push_back(y),
        (Tree::Deep(da), Tree::Deep(db)) => {
            let mut mids = da.sf.clone();
            mids.extend(ts);
            mids.extend_from_slice(&db.pr);
            let mid = app3(da.mid.clone(), group_nodes(mids), db.mid.clone());
            mk_deep(da.pr.clone(), mid, db.sf.clone())
        }
    }
}

/// Regroup 2..=12 items into 2-3 nodes.
fn group_nodes(items: Vec<Item>) -> Vec<Item> {
    let n = items.len();
    debug_assert!(n >= 2);
    let mut out = Vec::new();
    let mut i = 0;
    while n - i > 4 {
        out.push(node_of(items[i..i + 3].to_vec()));
        i += 3;
    }
    match n - i {
        2 => out.push(node_of(items[i..].to_vec())),
        3 => out.push(node_of(items[i..].to_vec())),
        4 => {
            out.push(node_of(items[i..i + 2].to_vec()));
            out.push(node_of(items[i + 2..].to_vec()));
        }
        _ => {}
    }
    out
}

/// Split a run of items at element index `n` (0 < n < total), descending
/// into chunks and nodes as needed.
fn split_items(items: &[Item], n: usize) -> (Vec<Item>, Vec<Item>) {
    let mut before = Vec::new();
    let mut acc = 0usize;
    for (i, it) in items.iter().enumerate() {
        let l = it.len();
        if n < acc + l {
            let off = n - acc;
            if off == 0 {
                return (before, items[i..].to_vec());
            }
            let (a, mut b) = split_item(it, off);
            before.extend(a);
            b.extend_from_slice(&items[i + 1..]);
            return (before, b);
        }
        acc += l;
        before.push(it.clone());
    }
    (before, Vec::new())
}

fn split_item(it: &Item, n: usize) -> (Vec<Item>, Vec<Item>) {
    debug_assert!(0 < n && n < it.len());
    match it {
        Item::Leaf(c) => {
            let (a, b) = c.split(n);
            (vec![Item::Leaf(a)], vec![Item::Leaf(b)])
        }
        Item::Node(node) => split_items(&node.kids, n),
    }
}

fn item_get(it: &Item, i: usize) -> Option<Value> {
    match it {
        Item::Leaf(c) => (i < c.len()).then(|| c.get(i)),
        Item::Node(n) => items_get(&n.kids, i),
    }
}

fn items_get(items: &[Item], mut i: usize) -> Option<Value> {
    for it in items {
        if i < it.len() {
            return item_get(it, i);
        }
        i -= it.len();
    }
    None
}

#[derive(Clone, Debug)]
pub struct Rope {
    tree: Tree,
}

impl Rope {
    pub fn new() -> Rope {
        Rope { tree: Tree::Empty }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<Value> {
        self.tree.get(i)
    }

    /// Greedy chunking: byte runs pack together, other values group into
    /// small arrays.
    pub fn from_values(vals: Vec<Value>) -> Rope {
        let mut tree = Tree::Empty;
        let mut bytes: Vec<u8> = Vec::new();
        let mut arr: Vec<Value> = Vec::new();
        for v in vals {
            match v.to_byte() {
                Some(b) => {
                    if !arr.is_empty() {
                        tree = tree.push_back(Item::Leaf(Chunk::Vals(std::mem::take(&mut arr).into())));
                    }
                    bytes.push(b);
                    if bytes.len() == MAX_BYTES {
                        tree = tree.push_back(Item::Leaf(Chunk::Bytes(std::mem::take(&mut bytes).into())));
                    }
                }
                None => {
                    if !bytes.is_empty() {
                        tree = tree.push_back(Item::Leaf(Chunk::Bytes(std::mem::take(&mut bytes).into())));
                    }
                    arr.push(v);
                    if arr.len() == MAX_VALS {
                        tree = tree.push_back(Item::Leaf(Chunk::Vals(std::mem::take(&mut arr).into())));
                    }
                }
            }
        }
        if !bytes.is_empty() {
            tree = tree.push_back(Item::Leaf(Chunk::Bytes(bytes.into())));
        }
        if !arr.is_empty() {
            tree = tree.push_back(Item::Leaf(Chunk::Vals(arr.into())));
        }
        Rope { tree }
    }

    pub fn from_bytes(bytes: &[u8]) -> Rope {
        let mut tree = Tree::Empty;
        for chunk in bytes.chunks(MAX_BYTES) {
            tree = tree.push_back(Item::Leaf(Chunk::Bytes(chunk.into())));
        }
        Rope { tree }
    }

    /// Packed bytes, if every element is a byte.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        let mut out = Vec::with_capacity(self.len());
        let mut ok = true;
        self.for_each_chunk(&mut |c| match c {
            Chunk::Bytes(b) => out.extend_from_slice(b),
            Chunk::Vals(vs) => {
                for v in vs.iter() {
                    match v.to_byte() {
                        Some(b) => out.push(b),
                        None => ok = false,
                    }
                }
            }
        });
        ok.then_some(out)
    }

    pub fn push_front(&self, v: Value) -> Rope {
        if let Some((Item::Leaf(c), rest)) = self.tree.pop_front() {
            if let Some(merged) = merge_value(&v, &c, true) {
                return Rope {
                    tree: rest.push_front(Item::Leaf(merged)),
                };
            }
        }
        Rope {
            tree: self.tree.clone().push_front(Item::Leaf(Chunk::of_value(v))),
        }
    }

    pub fn push_back(&self, v: Value) -> Rope {
        if let Some((Item::Leaf(c), rest)) = self.tree.pop_back() {
            if let Some(merged) = merge_value(&v, &c, false) {
                return Rope {
                    tree: rest.push_back(Item::Leaf(merged)),
                };
            }
        }
        Rope {
            tree: self.tree.clone().push_back(Item::Leaf(Chunk::of_value(v))),
        }
    }

    pub fn pop_front(&self) -> Option<(Value, Rope)> {
        let (it, rest) = self.tree.pop_front()?;
        match it {
            Item::Leaf(c) => {
                if c.len() == 1 {
                    Some((c.get(0), Rope { tree: rest }))
                } else {
                    let (a, b) = c.split(1);
                    Some((
                        a.get(0),
                        Rope {
                            tree: rest.push_front(Item::Leaf(b)),
                        },
                    ))
                }
            }
            Item::Node(n) => {
                let mut tree = rest;
                for kid in n.kids.iter().rev() {
                    tree = tree.push_front(kid.clone());
                }
                Rope { tree }.pop_front()
            }
        }
    }

    pub fn pop_back(&self) -> Option<(Value, Rope)> {
        let (it, rest) = self.tree.pop_back()?;
        match it {
            Item::Leaf(c) => {
                let n = c.len();
                if n == 1 {
                    Some((c.get(0), Rope { tree: rest }))
                } else {
                    let (a, b) = c.split(n - 1);
                    Some((
                        b.get(0),
                        Rope {
                            tree: rest.push_back(Item::Leaf(a)),
                        },
                    ))
                }
            }
            Item::Node(n) => {
                let mut tree = rest;
                for kid in n.kids.iter() {
                    tree = tree.push_back(kid.clone());
                }
                Rope { tree }.pop_back()
            }
        }
    }

    pub fn concat(&self, other: &Rope) -> Rope {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        // merge small byte chunks across the seam
        if let (Some((Item::Leaf(Chunk::Bytes(a)), la)), Some((Item::Leaf(Chunk::Bytes(b)), rb))) =
            (self.tree.pop_back(), other.tree.pop_front())
        {
            if a.len() + b.len() <= MAX_BYTES {
                let mut joined = a.to_vec();
                joined.extend_from_slice(&b);
                let left = la.push_back(Item::Leaf(Chunk::Bytes(joined.into())));
                return Rope {
                    tree: concat_trees(left, rb),
                };
            }
        }
        Rope {
            tree: concat_trees(self.tree.clone(), other.tree.clone()),
        }
    }

    pub fn split_at(&self, n: usize) -> (Rope, Rope) {
        let (l, r) = self.tree.split_at(n);
        (Rope { tree: l }, Rope { tree: r })
    }

    pub fn reverse(&self) -> Rope {
        let mut chunks = Vec::new();
        self.for_each_chunk(&mut |c| chunks.push(c.reversed()));
        let mut tree = Tree::Empty;
        for c in chunks.into_iter().rev() {
            tree = tree.push_back(Item::Leaf(c));
        }
        Rope { tree }
    }

    pub fn iter(&self) -> Iter {
        Iter {
            stack: vec![Frame::T(self.tree.clone())],
            cur: None,
        }
    }

    pub(crate) fn for_each_chunk(&self, f: &mut impl FnMut(&Chunk)) {
        walk_tree(&self.tree, f);
    }
}

fn merge_value(v: &Value, c: &Chunk, front: bool) -> Option<Chunk> {
    match (v.to_byte(), c) {
        (Some(b), Chunk::Bytes(bs)) if bs.len() < MAX_BYTES => {
            let mut joined = Vec::with_capacity(bs.len() + 1);
            if front {
                joined.push(b);
                joined.extend_from_slice(bs);
            } else {
                joined.extend_from_slice(bs);
                joined.push(b);
            }
            Some(Chunk::Bytes(joined.into()))
        }
        (None, Chunk::Vals(vs)) if vs.len() < MAX_VALS => {
            let mut joined = Vec::with_capacity(vs.len() + 1);
            if front {
                joined.push(v.clone());
                joined.extend_from_slice(vs);
            } else {
                joined.extend_from_slice(vs);
                joined.push(v.clone());
            }
            Some(Chunk::Vals(joined.into()))
        }
        _ => None,
    }
}

fn walk_tree(t: &Tree, f: &mut impl FnMut(&Chunk)) {
    match t {
        Tree::Empty => {}
        Tree::Single(it) => walk_item(it, f),
        Tree::Deep(d) => {
            for it in &d.pr {
                walk_item(it, f);
            }
            walk_tree(&d.mid, f);
            for it in &d.sf {
                walk_item(it, f);
            }
        }
    }
}

fn walk_item(it: &Item, f: &mut impl FnMut(&Chunk)) {
    match it {
        Item::Leaf(c) => f(c),
        Item::Node(n) => {
            for kid in &n.kids {
                walk_item(kid, f);
            }
        }
    }
}

enum Frame {
    T(Tree),
    I(Item),
}

pub struct Iter {
    stack: Vec<Frame>,
    cur: Option<(Chunk, usize)>,
}

impl Iterator for Iter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        loop {
            if let Some((c, i)) = &mut self.cur {
                if *i < c.len() {
                    let v = c.get(*i);
                    *i += 1;
                    return Some(v);
                }
                self.cur = None;
            }
            match self.stack.pop() {
                Some(Frame::I(Item::Leaf(c))) => self.cur = Some((c, 0)),
                Some(Frame::I(Item::Node(n))) => {
                    for kid in n.kids.iter().rev() {
                        self.stack.push(Frame::I(kid.clone()));
                    }
                }
                Some(Frame::T(Tree::Empty)) => {}
                Some(Frame::T(Tree::Single(it))) => self.stack.push(Frame::I(it)),
                Some(Frame::T(Tree::Deep(d))) => {
                    for it in d.sf.iter().rev() {
                        self.stack.push(Frame::I(it.clone()));
                    }
                    self.stack.push(Frame::T(d.mid.clone()));
                    for it in d.pr.iter().rev() {
                        self.stack.push(Frame::I(it.clone()));
                    }
                }
                None => return None,
            }
        }
    }
}

impl Default for Rope {
    fn default() -> Rope {
        Rope::new()
    }
}

impl PartialEq for Rope {
    fn eq(&self, other: &Rope) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl FromIterator<Value> for Rope {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Rope {
        Rope::from_values(iter.into_iter().collect())
    }
}
