//! Well-formed temporal formulas.
//!
//! Thin constructors over the node arena for LTL and past-LTL
//! formulas, plus the negation-normal-form rewriter in [`nnf`]. Unlike
//! the expression algebra, these constructors only short-circuit
//! boolean constants; temporal structure is preserved as written.

mod nnf;

pub use nnf::{NnfCache, NnfError};

use crate::base::Tag;
use crate::node::{NodeArena, NodeRef};

/// Constructor set for temporal formulas.
#[derive(Clone, Copy)]
pub struct Wff<'a> {
    arena: &'a NodeArena,
}

impl<'a> Wff<'a> {
    pub fn new(arena: &'a NodeArena) -> Self {
        Wff { arena }
    }

    pub fn arena(&self) -> &'a NodeArena {
        self.arena
    }

    pub fn truth(&self) -> NodeRef {
        self.arena.bool_true()
    }

    pub fn falsity(&self) -> NodeRef {
        self.arena.bool_false()
    }

    fn unary(&self, tag: Tag, arg: NodeRef) -> NodeRef {
        self.arena.intern(tag, Some(arg), None)
    }

    fn binary(&self, tag: Tag, a: NodeRef, b: NodeRef) -> NodeRef {
        self.arena.intern(tag, Some(a), Some(b))
    }

    pub fn not(&self, arg: NodeRef) -> NodeRef {
        self.unary(Tag::Not, arg)
    }

    pub fn and(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if a == self.falsity() || b == self.falsity() {
            return self.falsity();
        }
        if a == self.truth() {
            return b;
        }
        if b == self.truth() {
            return a;
        }
        self.binary(Tag::And, a, b)
    }

    pub fn or(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if a == self.truth() || b == self.truth() {
            return self.truth();
        }
        if a == self.falsity() {
            return b;
        }
        if b == self.falsity() {
            return a;
        }
        self.binary(Tag::Or, a, b)
    }

    pub fn implies(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        self.binary(Tag::Implies, a, b)
    }

    pub fn iff(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        self.binary(Tag::Iff, a, b)
    }

    /// The transition-relation primitive, not the temporal operator.
    pub fn next(&self, arg: NodeRef) -> NodeRef {
        self.unary(Tag::Next, arg)
    }

    /// Temporal `X`.
    pub fn op_next(&self, arg: NodeRef) -> NodeRef {
        self.unary(Tag::OpNext, arg)
    }

    /// `X` applied `times` times.
    pub fn op_next_times(&self, arg: NodeRef, times: u32) -> NodeRef {
        (0..times).fold(arg, |acc, _| self.op_next(acc))
    }

    /// Past-temporal `Y` (previous).
    pub fn op_prec(&self, arg: NodeRef) -> NodeRef {
        self.unary(Tag::OpPrec, arg)
    }

    /// Past-temporal `Z` (weak previous).
    pub fn op_notprecnot(&self, arg: NodeRef) -> NodeRef {
        self.unary(Tag::OpNotPrecNot, arg)
    }

    /// Temporal `G`.
    pub fn globally(&self, arg: NodeRef) -> NodeRef {
        self.unary(Tag::OpGlobal, arg)
    }

    /// Past-temporal `H`.
    pub fn historically(&self, arg: NodeRef) -> NodeRef {
        self.unary(Tag::OpHistorical, arg)
    }

    /// Temporal `F`.
    pub fn eventually(&self, arg: NodeRef) -> NodeRef {
        self.unary(Tag::OpFuture, arg)
    }

    /// Past-temporal `O`.
    pub fn once(&self, arg: NodeRef) -> NodeRef {
        self.unary(Tag::OpOnce, arg)
    }

    /// Temporal `U`.
    pub fn until(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        self.binary(Tag::Until, a, b)
    }

    /// Past-temporal `S`.
    pub fn since(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        self.binary(Tag::Since, a, b)
    }

    /// Temporal `V`/`R`.
    pub fn releases(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        self.binary(Tag::Releases, a, b)
    }

    /// Past-temporal `T`.
    pub fn triggered(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        self.binary(Tag::Triggered, a, b)
    }

    /// Nesting depth of temporal operators; boolean connectives are
    /// transparent.
    pub fn depth(&self, wff: NodeRef) -> u32 {
        match self.arena.tag(wff) {
            Tag::OpNext
            | Tag::OpPrec
            | Tag::OpNotPrecNot
            | Tag::OpGlobal
            | Tag::OpHistorical
            | Tag::OpFuture
            | Tag::OpOnce => {
                1 + self.arena.left(wff).map_or(0, |l| self.depth(l))
            }
            Tag::Until | Tag::Since | Tag::Releases | Tag::Triggered => {
                let l = self.arena.left(wff).map_or(0, |l| self.depth(l));
                let r = self.arena.right(wff).map_or(0, |r| self.depth(r));
                1 + l.max(r)
            }
            Tag::Not | Tag::And | Tag::Or | Tag::Implies | Tag::Iff | Tag::Xor | Tag::Xnor => {
                let l = self.arena.left(wff).map_or(0, |l| self.depth(l));
                let r = self.arena.right(wff).map_or(0, |r| self.depth(r));
                l.max(r)
            }
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_short_circuits() {
        let arena = NodeArena::new();
        let w = Wff::new(&arena);
        let p = arena.atom("p");
        assert_eq!(w.and(p, w.truth()), p);
        assert_eq!(w.and(w.falsity(), p), w.falsity());
        assert_eq!(w.or(p, w.falsity()), p);
        assert_eq!(w.or(w.truth(), p), w.truth());
    }

    #[test]
    fn depth_counts_temporal_nesting() {
        let arena = NodeArena::new();
        let w = Wff::new(&arena);
        let p = arena.atom("p");
        let q = arena.atom("q");
        let f = w.globally(w.until(p, w.op_next(q)));
        assert_eq!(w.depth(f), 3);
        assert_eq!(w.depth(w.and(p, q)), 0);
        assert_eq!(w.op_next_times(p, 3), w.op_next(w.op_next(w.op_next(p))));
    }
}
