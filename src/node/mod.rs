//! Hash-consed node storage.
//!
//! Every expression, identifier, and constant of a compilation lives in
//! a [`NodeArena`]: an append-only interning store. Interning the same
//! shape twice yields the same [`NodeRef`], so node equality is handle
//! equality and structural comparison is O(1) everywhere above this
//! layer.
//!
//! Children are interned before parents, so the stored graph is acyclic
//! by construction. Nodes are immutable once interned; the source line
//! recorded at first interning wins and is not part of the identity.

use num_bigint::BigInt;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::{FailureKind, Tag};
use crate::word::{Signedness, WordValue};

/// Handle to an interned node. Equality is node identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(u32);

impl NodeRef {
    /// Position in the arena's interning order. Stable for the lifetime
    /// of the compilation; used for canonical child ordering.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Payload carried by leaf nodes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Payload {
    None,
    /// Arbitrary-precision integer constant.
    Int(BigInt),
    /// Word constant; the tag mirrors the signedness.
    Word(WordValue),
    /// Interned identifier text.
    Atom(SmolStr),
    /// Deferred constant-evaluation error.
    Failure(FailureInfo),
}

/// Description of a deferred error value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FailureInfo {
    pub kind: FailureKind,
    pub message: SmolStr,
    pub line: u32,
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct NodeKey {
    tag: Tag,
    left: Option<NodeRef>,
    right: Option<NodeRef>,
    payload: Payload,
}

struct NodeData {
    key: NodeKey,
    line: Option<u32>,
}

#[derive(Default)]
struct ArenaInner {
    nodes: Vec<NodeData>,
    index: FxHashMap<NodeKey, NodeRef>,
}

/// Append-only interning arena. Shared per compilation; all methods
/// take `&self` and are safe to call from multiple threads.
#[derive(Default)]
pub struct NodeArena {
    inner: RwLock<ArenaInner>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern_key(&self, key: NodeKey, line: Option<u32>) -> NodeRef {
        if let Some(&r) = self.inner.read().index.get(&key) {
            return r;
        }
        let mut inner = self.inner.write();
        if let Some(&r) = inner.index.get(&key) {
            return r;
        }
        let r = NodeRef(inner.nodes.len() as u32);
        inner.index.insert(key.clone(), r);
        inner.nodes.push(NodeData { key, line });
        r
    }

    /// Interns a compound node. Identical inputs return the identical
    /// reference.
    pub fn intern(&self, tag: Tag, left: Option<NodeRef>, right: Option<NodeRef>) -> NodeRef {
        self.intern_at(tag, left, right, None)
    }

    /// Interns a compound node, recording `line` if the node is new.
    pub fn intern_at(
        &self,
        tag: Tag,
        left: Option<NodeRef>,
        right: Option<NodeRef>,
        line: Option<u32>,
    ) -> NodeRef {
        self.intern_key(NodeKey { tag, left, right, payload: Payload::None }, line)
    }

    // ------------------------------------------------------------------
    // Leaf constructors
    // ------------------------------------------------------------------

    /// The boolean truth leaf.
    pub fn bool_true(&self) -> NodeRef {
        self.intern(Tag::TrueExp, None, None)
    }

    /// The boolean falsity leaf.
    pub fn bool_false(&self) -> NodeRef {
        self.intern(Tag::FalseExp, None, None)
    }

    /// An integer constant leaf.
    pub fn int(&self, value: BigInt) -> NodeRef {
        self.intern_key(
            NodeKey { tag: Tag::Number, left: None, right: None, payload: Payload::Int(value) },
            None,
        )
    }

    /// Convenience over [`NodeArena::int`] for machine integers.
    pub fn int_i64(&self, value: i64) -> NodeRef {
        self.int(BigInt::from(value))
    }

    /// A word-constant leaf; the tag follows the value's signedness.
    pub fn word(&self, value: WordValue) -> NodeRef {
        let tag = match value.sign() {
            Signedness::Unsigned => Tag::NumberUnsignedWord,
            Signedness::Signed => Tag::NumberSignedWord,
        };
        self.intern_key(
            NodeKey { tag, left: None, right: None, payload: Payload::Word(value) },
            None,
        )
    }

    /// A symbolic identifier leaf.
    pub fn atom(&self, name: &str) -> NodeRef {
        self.intern_key(
            NodeKey {
                tag: Tag::Atom,
                left: None,
                right: None,
                payload: Payload::Atom(SmolStr::new(name)),
            },
            None,
        )
    }

    /// The `self` pseudo-identifier.
    pub fn self_id(&self) -> NodeRef {
        self.intern(Tag::SelfId, None, None)
    }

    /// A deferred error leaf.
    pub fn failure(&self, kind: FailureKind, message: &str, line: u32) -> NodeRef {
        self.intern_key(
            NodeKey {
                tag: Tag::Failure,
                left: None,
                right: None,
                payload: Payload::Failure(FailureInfo {
                    kind,
                    message: SmolStr::new(message),
                    line,
                }),
            },
            Some(line),
        )
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn tag(&self, n: NodeRef) -> Tag {
        self.inner.read().nodes[n.index()].key.tag
    }

    pub fn left(&self, n: NodeRef) -> Option<NodeRef> {
        self.inner.read().nodes[n.index()].key.left
    }

    pub fn right(&self, n: NodeRef) -> Option<NodeRef> {
        self.inner.read().nodes[n.index()].key.right
    }

    /// Source line, if one was recorded when the node was first interned.
    pub fn line(&self, n: NodeRef) -> Option<u32> {
        self.inner.read().nodes[n.index()].line
    }

    /// Integer payload of a `Number` leaf.
    pub fn int_value(&self, n: NodeRef) -> Option<BigInt> {
        match &self.inner.read().nodes[n.index()].key.payload {
            Payload::Int(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Word payload of a word-constant leaf.
    pub fn word_value(&self, n: NodeRef) -> Option<WordValue> {
        match &self.inner.read().nodes[n.index()].key.payload {
            Payload::Word(v) => Some(*v),
            _ => None,
        }
    }

    /// Identifier text of an `Atom` leaf.
    pub fn atom_str(&self, n: NodeRef) -> Option<SmolStr> {
        match &self.inner.read().nodes[n.index()].key.payload {
            Payload::Atom(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Failure payload of a `Failure` leaf.
    pub fn failure_info(&self, n: NodeRef) -> Option<FailureInfo> {
        match &self.inner.read().nodes[n.index()].key.payload {
            Payload::Failure(f) => Some(f.clone()),
            _ => None,
        }
    }

    /// Number of interned nodes.
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ------------------------------------------------------------------
    // Cons lists
    // ------------------------------------------------------------------

    /// A `CONS` cell; used for parameter lists and memoization keys.
    pub fn cons(&self, head: NodeRef, tail: Option<NodeRef>) -> NodeRef {
        self.intern(Tag::Cons, Some(head), tail)
    }

    /// Builds a right-nested `CONS` chain from the given elements.
    pub fn cons_list<I>(&self, elems: I) -> Option<NodeRef>
    where
        I: IntoIterator<Item = NodeRef>,
        I::IntoIter: DoubleEndedIterator,
    {
        elems
            .into_iter()
            .rev()
            .fold(None, |tail, head| Some(self.cons(head, tail)))
    }

    /// Flattens a `CONS` chain into its elements, in list order.
    pub fn collect_cons(&self, mut n: Option<NodeRef>) -> Vec<NodeRef> {
        let mut out = Vec::new();
        while let Some(cell) = n {
            if self.tag(cell) != Tag::Cons {
                out.push(cell);
                break;
            }
            if let Some(head) = self.left(cell) {
                out.push(head);
            }
            n = self.right(cell);
        }
        out
    }

    /// Renders an identifier expression (`ATOM`, `DOT`, `ARRAY`, `BIT`,
    /// numbers) as user-facing text; used in diagnostics.
    pub fn display_name(&self, n: NodeRef) -> String {
        match self.tag(n) {
            Tag::Atom => self.atom_str(n).map(|s| s.to_string()).unwrap_or_default(),
            Tag::Number => self
                .int_value(n)
                .map(|v| v.to_string())
                .unwrap_or_default(),
            Tag::NumberUnsignedWord | Tag::NumberSignedWord => self
                .word_value(n)
                .map(|v| v.to_string())
                .unwrap_or_default(),
            Tag::SelfId => "self".to_string(),
            Tag::Dot => {
                let lhs = self.left(n).map(|l| self.display_name(l));
                let rhs = self.right(n).map(|r| self.display_name(r)).unwrap_or_default();
                match lhs {
                    Some(l) if !l.is_empty() => format!("{l}.{rhs}"),
                    _ => rhs,
                }
            }
            Tag::Array => {
                let base = self.left(n).map(|l| self.display_name(l)).unwrap_or_default();
                let idx = self.right(n).map(|r| self.display_name(r)).unwrap_or_default();
                format!("{base}[{idx}]")
            }
            Tag::Bit => {
                let base = self.left(n).map(|l| self.display_name(l)).unwrap_or_default();
                let idx = self.right(n).map(|r| self.display_name(r)).unwrap_or_default();
                format!("{base}.{idx}")
            }
            tag => format!("<{tag:?}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_returns_same_handle() {
        let arena = NodeArena::new();
        let a = arena.atom("x");
        let b = arena.atom("x");
        assert_eq!(a, b);

        let t1 = arena.intern(Tag::And, Some(a), Some(arena.bool_true()));
        let t2 = arena.intern(Tag::And, Some(b), Some(arena.bool_true()));
        assert_eq!(t1, t2);
        assert_ne!(t1, arena.intern(Tag::Or, Some(a), Some(arena.bool_true())));
    }

    #[test]
    fn payloads_distinguish_leaves() {
        let arena = NodeArena::new();
        assert_ne!(arena.int_i64(0), arena.int_i64(1));
        assert_ne!(arena.atom("x"), arena.atom("y"));
        let w1 = arena.word(WordValue::from_unsigned(3, 4).unwrap());
        let w2 = arena.word(WordValue::from_unsigned(3, 5).unwrap());
        assert_ne!(w1, w2);
        // signedness lives in the tag
        let s = arena.word(WordValue::from_unsigned(3, 4).unwrap().to_signed());
        assert_eq!(arena.tag(s), Tag::NumberSignedWord);
        assert_eq!(arena.tag(w1), Tag::NumberUnsignedWord);
    }

    #[test]
    fn first_interning_line_wins() {
        let arena = NodeArena::new();
        let x = arena.atom("x");
        let n1 = arena.intern_at(Tag::Next, Some(x), None, Some(12));
        let n2 = arena.intern_at(Tag::Next, Some(x), None, Some(99));
        assert_eq!(n1, n2);
        assert_eq!(arena.line(n1), Some(12));
    }

    #[test]
    fn cons_lists_round_trip() {
        let arena = NodeArena::new();
        let elems = vec![arena.atom("a"), arena.atom("b"), arena.atom("c")];
        let list = arena.cons_list(elems.clone());
        assert_eq!(arena.collect_cons(list), elems);
        assert!(arena.collect_cons(None).is_empty());
    }

    #[test]
    fn display_name_renders_identifiers() {
        let arena = NodeArena::new();
        let m = arena.atom("m");
        let x = arena.atom("x");
        let dot = arena.intern(Tag::Dot, Some(m), Some(x));
        assert_eq!(arena.display_name(dot), "m.x");
        let arr = arena.intern(Tag::Array, Some(dot), Some(arena.int_i64(3)));
        assert_eq!(arena.display_name(arr), "m.x[3]");
    }
}
