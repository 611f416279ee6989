//! Ordered, deduplicated constant sets.
//!
//! A [`Set`] is a finite sequence of interned nodes, ordered by
//! insertion and uniqued on insert. Sets back enumeration types,
//! integer ranges, and `UNION` expressions. Sharing is copy-on-write:
//! cloning is cheap, and the first mutation of a shared set makes a
//! private copy.

use std::sync::Arc;

use indexmap::IndexSet;

use crate::base::Tag;
use crate::node::{NodeArena, NodeRef};

/// Insertion-ordered set of interned nodes with copy-on-write sharing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Set {
    inner: Arc<IndexSet<NodeRef>>,
}

impl Set {
    /// The empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set with a single element.
    pub fn singleton(el: NodeRef) -> Self {
        let mut s = IndexSet::new();
        s.insert(el);
        Set { inner: Arc::new(s) }
    }

    /// Builds a set from a `UNION` tree. `TWODOTS` ranges with constant
    /// integer bounds expand to their elements; any other node is taken
    /// as one element. Returns the empty set for `None`.
    pub fn from_union(arena: &NodeArena, expr: Option<NodeRef>) -> Self {
        let mut set = Set::new();
        if let Some(e) = expr {
            set.add_union(arena, e);
        }
        set
    }

    fn add_union(&mut self, arena: &NodeArena, expr: NodeRef) {
        match arena.tag(expr) {
            Tag::Union => {
                if let Some(l) = arena.left(expr) {
                    self.add_union(arena, l);
                }
                if let Some(r) = arena.right(expr) {
                    self.add_union(arena, r);
                }
            }
            Tag::TwoDots => {
                let lo = arena.left(expr).and_then(|n| arena.int_value(n));
                let hi = arena.right(expr).and_then(|n| arena.int_value(n));
                match (lo, hi) {
                    (Some(lo), Some(hi)) => {
                        let mut v = lo;
                        while v <= hi {
                            self.add(arena.int(v.clone()));
                            v += 1;
                        }
                    }
                    // non-constant range bounds: keep the range opaque
                    _ => {
                        self.add(expr);
                    }
                }
            }
            _ => {
                self.add(expr);
            }
        }
    }

    /// Builds a set from a `CONS` chain.
    pub fn from_list(arena: &NodeArena, list: Option<NodeRef>) -> Self {
        let mut set = Set::new();
        for el in arena.collect_cons(list) {
            set.add(el);
        }
        set
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Membership by node identity.
    pub fn is_member(&self, el: NodeRef) -> bool {
        self.inner.contains(&el)
    }

    /// True when every element of `other` is a member of `self`.
    pub fn contains(&self, other: &Set) -> bool {
        other.inner.iter().all(|el| self.is_member(*el))
    }

    /// True when the two sets share at least one element.
    pub fn intersects(&self, other: &Set) -> bool {
        other.inner.iter().any(|el| self.is_member(*el))
    }

    /// Adds an element, keeping insertion order; no-op when present.
    pub fn add(&mut self, el: NodeRef) {
        if !self.inner.contains(&el) {
            Arc::make_mut(&mut self.inner).insert(el);
        }
    }

    /// Removes an element; no-op when absent.
    pub fn remove(&mut self, el: NodeRef) {
        if self.inner.contains(&el) {
            Arc::make_mut(&mut self.inner).shift_remove(&el);
        }
    }

    /// Adds every element of `other`, preserving `self`'s ordering for
    /// elements already present.
    pub fn union_with(&mut self, other: &Set) {
        for el in other.iter() {
            self.add(el);
        }
    }

    /// Keeps only elements that are also in `other`.
    pub fn intersect_with(&mut self, other: &Set) {
        if self.inner.iter().any(|el| !other.is_member(*el)) {
            let kept: IndexSet<NodeRef> =
                self.inner.iter().copied().filter(|el| other.is_member(*el)).collect();
            self.inner = Arc::new(kept);
        }
    }

    /// Removes every element of `other`.
    pub fn difference_with(&mut self, other: &Set) {
        if self.inner.iter().any(|el| other.is_member(*el)) {
            let kept: IndexSet<NodeRef> =
                self.inner.iter().copied().filter(|el| !other.is_member(*el)).collect();
            self.inner = Arc::new(kept);
        }
    }

    /// Iterates elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.inner.iter().copied()
    }

    /// The sole element of a cardinality-1 set.
    pub fn only_member(&self) -> Option<NodeRef> {
        if self.inner.len() == 1 {
            self.inner.first().copied()
        } else {
            None
        }
    }

    /// Rebuilds the canonical `UNION` tree for this set. Returns `None`
    /// for the empty set, the sole element for singletons.
    pub fn to_union(&self, arena: &NodeArena) -> Option<NodeRef> {
        let mut iter = self.iter();
        let first = iter.next()?;
        Some(iter.fold(first, |acc, el| arena.intern(Tag::Union, Some(acc), Some(el))))
    }
}

impl FromIterator<NodeRef> for Set {
    fn from_iter<I: IntoIterator<Item = NodeRef>>(iter: I) -> Self {
        let mut set = Set::new();
        for el in iter {
            set.add(el);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_preserves_insertion_order() {
        let arena = NodeArena::new();
        let (a, b, c) = (arena.atom("a"), arena.atom("b"), arena.atom("c"));
        let set: Set = [b, a, b, c, a].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![b, a, c]);
    }

    #[test]
    fn union_with_itself_is_identity() {
        let arena = NodeArena::new();
        let set: Set = [arena.atom("a"), arena.atom("b")].into_iter().collect();
        let mut u = set.clone();
        u.union_with(&set);
        assert_eq!(u, set);
        let mut i = set.clone();
        i.intersect_with(&set);
        assert_eq!(i, set);
    }

    #[test]
    fn union_contains_both_operands() {
        let arena = NodeArena::new();
        let a: Set = [arena.atom("a"), arena.atom("b")].into_iter().collect();
        let b: Set = [arena.atom("b"), arena.atom("c")].into_iter().collect();
        let mut u = a.clone();
        u.union_with(&b);
        assert!(u.contains(&a));
        assert!(u.contains(&b));
    }

    #[test]
    fn copy_on_write_leaves_clones_untouched() {
        let arena = NodeArena::new();
        let shared: Set = [arena.atom("a")].into_iter().collect();
        let mut branch = shared.clone();
        branch.add(arena.atom("b"));
        assert_eq!(shared.len(), 1);
        assert_eq!(branch.len(), 2);
    }

    #[test]
    fn from_union_flattens_and_expands_ranges() {
        let arena = NodeArena::new();
        let x = arena.atom("x");
        let range = arena.intern(
            Tag::TwoDots,
            Some(arena.int_i64(1)),
            Some(arena.int_i64(3)),
        );
        let u = arena.intern(Tag::Union, Some(x), Some(range));
        let set = Set::from_union(&arena, Some(u));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![x, arena.int_i64(1), arena.int_i64(2), arena.int_i64(3)]
        );
    }

    #[test]
    fn to_union_round_trips_singletons() {
        let arena = NodeArena::new();
        let x = arena.atom("x");
        let set = Set::singleton(x);
        assert_eq!(set.to_union(&arena), Some(x));
        assert_eq!(Set::new().to_union(&arena), None);
    }
}
