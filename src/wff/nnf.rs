//! Negation normal form.
//!
//! [`Wff::to_nnf`] pushes negations down to the atomic level of an
//! LTL/PTL formula. `CASE`/`ITE` are expanded into boolean structure
//! first; `iff`, `xor`, `xnor`, and `implies` are expanded into the
//! requested polarity; temporal operators dualize (`¬X = X¬`,
//! `¬G = F¬`, `¬(a U b) = ¬a R ¬b`, and the past-time mirrors).
//!
//! The traversal is memoized per (formula, polarity); the table lives
//! for one compile step and is released by its owner afterwards.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::base::{FailureKind, Tag};
use crate::node::NodeRef;
use crate::wff::Wff;

/// Defects in the input formula; all are fatal to the compile step.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NnfError {
    #[error("unexpected next operator in a temporal formula")]
    NextInFormula,

    #[error("unexpected leaf {0:?} in a flattened formula")]
    UnexpectedLeaf(Tag),

    #[error("unexpected mod operator in a boolean formula")]
    UnexpectedMod,

    #[error("unexpected operator {0:?}")]
    UnexpectedOperator(Tag),

    #[error("failure in formula: {0}")]
    FailureNode(String),
}

/// Memoization table for the NNF rewriting, keyed per (formula,
/// polarity). Owned by the compile step that drives the rewriting.
#[derive(Default)]
pub struct NnfCache {
    memo: FxHashMap<(NodeRef, bool), NodeRef>,
}

impl NnfCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.memo.clear();
    }
}

impl<'a> Wff<'a> {
    /// Rewrites `wff` into negation normal form under positive
    /// polarity.
    pub fn to_nnf(&self, cache: &mut NnfCache, wff: NodeRef) -> Result<NodeRef, NnfError> {
        self.mk_nnf(cache, wff, true)
    }

    fn mk_nnf(
        &self,
        cache: &mut NnfCache,
        wff: NodeRef,
        pol: bool,
    ) -> Result<NodeRef, NnfError> {
        // the transition primitive must not occur in a temporal formula
        if self.arena().tag(wff) == Tag::Next {
            return Err(NnfError::NextInFormula);
        }
        if let Some(&res) = cache.memo.get(&(wff, pol)) {
            return Ok(res);
        }

        let arena = self.arena();
        let left = || {
            arena
                .left(wff)
                .ok_or(NnfError::UnexpectedOperator(arena.tag(wff)))
        };
        let right = || {
            arena
                .right(wff)
                .ok_or(NnfError::UnexpectedOperator(arena.tag(wff)))
        };

        let res = match arena.tag(wff) {
            Tag::TrueExp => {
                if pol { self.truth() } else { self.falsity() }
            }
            Tag::FalseExp => {
                if pol { self.falsity() } else { self.truth() }
            }

            Tag::Not => self.mk_nnf(cache, left()?, !pol)?,

            Tag::And => {
                let (a, b) = (left()?, right()?);
                if pol {
                    self.and(self.mk_nnf(cache, a, true)?, self.mk_nnf(cache, b, true)?)
                } else {
                    // !(a & b) <-> (!a | !b)
                    self.or(self.mk_nnf(cache, a, false)?, self.mk_nnf(cache, b, false)?)
                }
            }

            Tag::Or => {
                let (a, b) = (left()?, right()?);
                if pol {
                    self.or(self.mk_nnf(cache, a, true)?, self.mk_nnf(cache, b, true)?)
                } else {
                    // !(a | b) <-> (!a & !b)
                    self.and(self.mk_nnf(cache, a, false)?, self.mk_nnf(cache, b, false)?)
                }
            }

            Tag::Implies => {
                let (a, b) = (left()?, right()?);
                if pol {
                    // (a -> b) <-> (!a | b)
                    self.or(self.mk_nnf(cache, a, false)?, self.mk_nnf(cache, b, true)?)
                } else {
                    // !(a -> b) <-> (a & !b)
                    self.and(self.mk_nnf(cache, a, true)?, self.mk_nnf(cache, b, false)?)
                }
            }

            Tag::Iff | Tag::Xnor => {
                let (a, b) = (left()?, right()?);
                if pol {
                    // (a <-> b) <-> (!a | b) & (!b | a)
                    self.and(
                        self.or(self.mk_nnf(cache, a, false)?, self.mk_nnf(cache, b, true)?),
                        self.or(self.mk_nnf(cache, a, true)?, self.mk_nnf(cache, b, false)?),
                    )
                } else {
                    // !(a <-> b) <-> (a & !b) | (!a & b)
                    self.or(
                        self.and(self.mk_nnf(cache, a, true)?, self.mk_nnf(cache, b, false)?),
                        self.and(self.mk_nnf(cache, a, false)?, self.mk_nnf(cache, b, true)?),
                    )
                }
            }

            Tag::Xor => {
                let (a, b) = (left()?, right()?);
                if pol {
                    // (a xor b) <-> (a & !b) | (!a & b)
                    self.or(
                        self.and(self.mk_nnf(cache, a, true)?, self.mk_nnf(cache, b, false)?),
                        self.and(self.mk_nnf(cache, a, false)?, self.mk_nnf(cache, b, true)?),
                    )
                } else {
                    // !(a xor b) <-> (a | !b) & (!a | b)
                    self.and(
                        self.or(self.mk_nnf(cache, a, true)?, self.mk_nnf(cache, b, false)?),
                        self.or(self.mk_nnf(cache, a, false)?, self.mk_nnf(cache, b, true)?),
                    )
                }
            }

            // !X(a) <-> X(!a): X is self-dual
            Tag::OpNext => self.op_next(self.mk_nnf(cache, left()?, pol)?),

            // !Y(a) <-> Z(!a)
            Tag::OpPrec => {
                let inner = self.mk_nnf(cache, left()?, pol)?;
                if pol { self.op_prec(inner) } else { self.op_notprecnot(inner) }
            }

            // !Z(a) <-> Y(!a)
            Tag::OpNotPrecNot => {
                let inner = self.mk_nnf(cache, left()?, pol)?;
                if pol { self.op_notprecnot(inner) } else { self.op_prec(inner) }
            }

            // !G(a) <-> F(!a)
            Tag::OpGlobal => {
                let inner = self.mk_nnf(cache, left()?, pol)?;
                if pol { self.globally(inner) } else { self.eventually(inner) }
            }

            // !F(a) <-> G(!a)
            Tag::OpFuture => {
                let inner = self.mk_nnf(cache, left()?, pol)?;
                if pol { self.eventually(inner) } else { self.globally(inner) }
            }

            // !H(a) <-> O(!a)
            Tag::OpHistorical => {
                let inner = self.mk_nnf(cache, left()?, pol)?;
                if pol { self.historically(inner) } else { self.once(inner) }
            }

            // !O(a) <-> H(!a)
            Tag::OpOnce => {
                let inner = self.mk_nnf(cache, left()?, pol)?;
                if pol { self.once(inner) } else { self.historically(inner) }
            }

            // !(a U b) <-> (!a V !b)
            Tag::Until => {
                let a = self.mk_nnf(cache, left()?, pol)?;
                let b = self.mk_nnf(cache, right()?, pol)?;
                if pol { self.until(a, b) } else { self.releases(a, b) }
            }

            // !(a V b) <-> (!a U !b)
            Tag::Releases => {
                let a = self.mk_nnf(cache, left()?, pol)?;
                let b = self.mk_nnf(cache, right()?, pol)?;
                if pol { self.releases(a, b) } else { self.until(a, b) }
            }

            // !(a S b) <-> (!a T !b)
            Tag::Since => {
                let a = self.mk_nnf(cache, left()?, pol)?;
                let b = self.mk_nnf(cache, right()?, pol)?;
                if pol { self.since(a, b) } else { self.triggered(a, b) }
            }

            // !(a T b) <-> (!a S !b)
            Tag::Triggered => {
                let a = self.mk_nnf(cache, left()?, pol)?;
                let b = self.mk_nnf(cache, right()?, pol)?;
                if pol { self.triggered(a, b) } else { self.since(a, b) }
            }

            Tag::Case | Tag::IfThenElse => {
                let expanded = self.expand_case(wff)?;
                self.mk_nnf(cache, expanded, pol)?
            }

            // boolean atoms: stop the recursion
            Tag::Bit | Tag::Dot | Tag::Array => {
                if pol { wff } else { self.not(wff) }
            }

            // bare atoms and numbers must have been flattened away
            Tag::Atom
            | Tag::Number
            | Tag::NumberUnsignedWord
            | Tag::NumberSignedWord
            | Tag::NumberFrac
            | Tag::NumberReal
            | Tag::NumberExp => {
                return Err(NnfError::UnexpectedLeaf(arena.tag(wff)));
            }

            Tag::Mod => return Err(NnfError::UnexpectedMod),

            // predicates are atomic for NNF purposes
            Tag::Le | Tag::Lt | Tag::Ge | Tag::Gt | Tag::Equal | Tag::NotEqual | Tag::SetIn => {
                if pol { wff } else { self.not(wff) }
            }

            tag => return Err(NnfError::UnexpectedOperator(tag)),
        };

        cache.memo.insert((wff, pol), res);
        Ok(res)
    }

    /// Expands `case(c, t, e)` into `(c ∧ t) ∨ (¬c ∧ e)`, with
    /// short-circuiting on constant conditions. Recoverable `Failure`
    /// branches become truth after a warning, so the surrounding
    /// formula still type-checks.
    fn expand_case(&self, wff: NodeRef) -> Result<NodeRef, NnfError> {
        let arena = self.arena();
        match arena.tag(wff) {
            Tag::Case | Tag::IfThenElse => {
                let colon = arena
                    .left(wff)
                    .ok_or(NnfError::UnexpectedOperator(Tag::Case))?;
                let cond = arena
                    .left(colon)
                    .ok_or(NnfError::UnexpectedOperator(Tag::Colon))?;
                let then = arena
                    .right(colon)
                    .ok_or(NnfError::UnexpectedOperator(Tag::Colon))?;
                let rest = arena
                    .right(wff)
                    .ok_or(NnfError::UnexpectedOperator(Tag::Case))?;

                if cond == self.truth() {
                    return Ok(then);
                }
                if cond == self.falsity() {
                    return self.expand_case(rest);
                }
                let rest = self.expand_case(rest)?;
                Ok(self.or(self.and(cond, then), self.and(self.not(cond), rest)))
            }

            Tag::Failure => {
                let info = arena
                    .failure_info(wff)
                    .ok_or(NnfError::UnexpectedOperator(Tag::Failure))?;
                match info.kind {
                    FailureKind::CaseNotExhaustive
                    | FailureKind::DivByZero
                    | FailureKind::ArrayOutOfBounds => {
                        tracing::warn!(
                            line = info.line,
                            "{} in case expression; branch forced to true",
                            info.kind.describe()
                        );
                        Ok(self.truth())
                    }
                    FailureKind::Unspecified => {
                        Err(NnfError::FailureNode(info.message.to_string()))
                    }
                }
            }

            _ => Ok(wff),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeArena;

    fn pred(arena: &NodeArena, name: &str) -> NodeRef {
        // flattened boolean atoms are DOT-qualified names
        arena.intern(Tag::Dot, None, Some(arena.atom(name)))
    }

    #[test]
    fn negated_until_becomes_releases() {
        let arena = NodeArena::new();
        let w = Wff::new(&arena);
        let mut cache = NnfCache::new();
        let (a, b) = (pred(&arena, "a"), pred(&arena, "b"));

        let f = w.not(w.until(a, b));
        let nnf = w.to_nnf(&mut cache, f).unwrap();
        assert_eq!(nnf, w.releases(w.not(a), w.not(b)));
    }

    #[test]
    fn past_dualities() {
        let arena = NodeArena::new();
        let w = Wff::new(&arena);
        let mut cache = NnfCache::new();
        let a = pred(&arena, "a");

        assert_eq!(
            w.to_nnf(&mut cache, w.not(w.op_prec(a))).unwrap(),
            w.op_notprecnot(w.not(a))
        );
        assert_eq!(
            w.to_nnf(&mut cache, w.not(w.historically(a))).unwrap(),
            w.once(w.not(a))
        );
        assert_eq!(
            w.to_nnf(&mut cache, w.not(w.since(a, a))).unwrap(),
            w.triggered(w.not(a), w.not(a))
        );
    }

    #[test]
    fn double_negation_cancels() {
        let arena = NodeArena::new();
        let w = Wff::new(&arena);
        let mut cache = NnfCache::new();
        let a = pred(&arena, "a");
        assert_eq!(w.to_nnf(&mut cache, w.not(w.not(a))).unwrap(), a);
    }

    #[test]
    fn iff_expands_per_polarity() {
        let arena = NodeArena::new();
        let w = Wff::new(&arena);
        let mut cache = NnfCache::new();
        let (a, b) = (pred(&arena, "a"), pred(&arena, "b"));

        let pos = w.to_nnf(&mut cache, w.iff(a, b)).unwrap();
        assert_eq!(
            pos,
            w.and(w.or(w.not(a), b), w.or(a, w.not(b)))
        );
        let neg = w.to_nnf(&mut cache, w.not(w.iff(a, b))).unwrap();
        assert_eq!(
            neg,
            w.or(w.and(a, w.not(b)), w.and(w.not(a), b))
        );
    }

    #[test]
    fn output_negations_sit_on_atoms_only() {
        let arena = NodeArena::new();
        let w = Wff::new(&arena);
        let mut cache = NnfCache::new();
        let (a, b) = (pred(&arena, "a"), pred(&arena, "b"));

        let f = w.not(w.globally(w.implies(a, w.eventually(b))));
        let nnf = w.to_nnf(&mut cache, f).unwrap();
        // !G(a -> F b) <-> F(a & G !b)
        assert_eq!(nnf, w.eventually(w.and(a, w.globally(w.not(b)))));
        assert_no_inner_not(&arena, &w, nnf);
    }

    fn assert_no_inner_not(arena: &NodeArena, w: &Wff<'_>, f: NodeRef) {
        match arena.tag(f) {
            Tag::Not => {
                let child = arena.left(f).unwrap();
                assert!(
                    matches!(
                        arena.tag(child),
                        Tag::Dot
                            | Tag::Bit
                            | Tag::Array
                            | Tag::Le
                            | Tag::Lt
                            | Tag::Ge
                            | Tag::Gt
                            | Tag::Equal
                            | Tag::NotEqual
                            | Tag::SetIn
                    ),
                    "negation above non-atom {:?}",
                    arena.tag(child)
                );
            }
            _ => {
                if let Some(l) = arena.left(f) {
                    assert_no_inner_not(arena, w, l);
                }
                if let Some(r) = arena.right(f) {
                    assert_no_inner_not(arena, w, r);
                }
            }
        }
    }

    #[test]
    fn case_expands_and_failures_recover() {
        let arena = NodeArena::new();
        let w = Wff::new(&arena);
        let mut cache = NnfCache::new();
        let (c, t) = (pred(&arena, "c"), pred(&arena, "t"));

        let failure = arena.failure(
            FailureKind::CaseNotExhaustive,
            "case conditions are not exhaustive",
            4,
        );
        let colon = arena.intern(Tag::Colon, Some(c), Some(t));
        let case = arena.intern(Tag::Case, Some(colon), Some(failure));

        let nnf = w.to_nnf(&mut cache, case).unwrap();
        // failure branch is forced to true: (c & t) | (!c & true)
        assert_eq!(nnf, w.or(w.and(c, t), w.not(c)));
    }

    #[test]
    fn transition_next_is_a_defect() {
        let arena = NodeArena::new();
        let w = Wff::new(&arena);
        let mut cache = NnfCache::new();
        let a = pred(&arena, "a");
        assert_eq!(
            w.to_nnf(&mut cache, w.next(a)),
            Err(NnfError::NextInFormula)
        );
        assert_eq!(
            w.to_nnf(&mut cache, arena.atom("raw")),
            Err(NnfError::UnexpectedLeaf(Tag::Atom))
        );
    }
}
