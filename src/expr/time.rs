//! Timed expressions.
//!
//! Bounded analyses stamp sub-expressions with absolute times via
//! `ATTIME` nodes. The current time of an expression is the minimum of
//! its children's times under the ordering `current < next < 0 <= 1
//! <= …`; frozen variables are time-agnostic and absorb into whatever
//! surrounds them. Stripping the stamps back out turns a stamp equal
//! to the current time into nothing and a stamp one past it into a
//! `next`. Nested `ATTIME` and nested `next` are defects.

use rustc_hash::FxHashMap;

use crate::base::Tag;
use crate::expr::{EvalError, ExprBuilder};
use crate::node::NodeRef;
use crate::symbol::ResolvedSymbol;

/// Current time of an expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExprTime {
    /// Only frozen variables and constants: compatible with any time.
    DontCare,
    /// Untimed, current state.
    Current,
    /// Untimed, next state.
    Next,
    /// Absolute stamp.
    At(u32),
}

impl ExprTime {
    /// Minimum under `current < next < 0 <= 1 <= …`; don't-care is
    /// absorbing from both sides.
    fn min_with(self, other: ExprTime) -> ExprTime {
        use ExprTime::*;
        match (self, other) {
            (DontCare, t) | (t, DontCare) => t,
            (Current, _) | (_, Current) => Current,
            (Next, _) | (_, Next) => Next,
            (At(a), At(b)) => At(a.min(b)),
        }
    }

    pub fn is_dont_care(self) -> bool {
        self == ExprTime::DontCare
    }

    pub fn is_current(self) -> bool {
        self == ExprTime::Current
    }
}

impl<'a> ExprBuilder<'a> {
    /// Wraps `e` with an absolute time stamp. Constants and constant
    /// sets are returned unwrapped.
    pub fn at_time(&self, e: NodeRef, time: u32) -> NodeRef {
        if self.is_constant_expr(e) {
            return e;
        }
        let stamp = self.arena().int_i64(i64::from(time));
        self.arena().intern(Tag::AtTime, Some(e), Some(stamp))
    }

    /// The stamp of an `ATTIME` node.
    pub fn at_time_stamp(&self, e: NodeRef) -> Option<u32> {
        if self.arena().tag(e) != Tag::AtTime {
            return None;
        }
        self.arena()
            .right(e)
            .and_then(|t| self.arena().int_value(t))
            .and_then(|v| u32::try_from(&v).ok())
    }

    /// The wrapped expression of an `ATTIME` node.
    pub fn at_time_body(&self, e: NodeRef) -> Option<NodeRef> {
        if self.arena().tag(e) == Tag::AtTime {
            self.arena().left(e)
        } else {
            None
        }
    }

    /// Computes the current time of `expr` (memoized per call).
    ///
    /// Nested `ATTIME` aborts with [`EvalError::NestedAtTime`]; an
    /// untimed `next` below an `ATTIME` stamp aborts with
    /// [`EvalError::NestedNext`].
    pub fn time_of(&self, expr: NodeRef) -> Result<ExprTime, EvalError> {
        let mut memo = FxHashMap::default();
        self.time_of_rec(expr, &mut memo)
    }

    fn time_of_rec(
        &self,
        expr: NodeRef,
        memo: &mut FxHashMap<NodeRef, ExprTime>,
    ) -> Result<ExprTime, EvalError> {
        if let Some(&t) = memo.get(&expr) {
            return Ok(t);
        }
        let arena = self.arena();
        let res = match arena.tag(expr) {
            Tag::Dot | Tag::Atom => {
                if self.is_frozen_name(expr) {
                    ExprTime::DontCare
                } else {
                    ExprTime::Current
                }
            }

            Tag::Failure
            | Tag::Array
            | Tag::Bit
            | Tag::NumberSignedWord
            | Tag::NumberUnsignedWord
            | Tag::UwConst
            | Tag::SwConst
            | Tag::WordArray
            | Tag::Number
            | Tag::NumberReal
            | Tag::NumberFrac
            | Tag::NumberExp
            | Tag::TrueExp
            | Tag::FalseExp => ExprTime::Current,

            Tag::AtTime => {
                let stamp = self
                    .at_time_stamp(expr)
                    .ok_or_else(|| EvalError::Type("malformed attime stamp".into()))?;
                let body = self
                    .at_time_body(expr)
                    .ok_or_else(|| EvalError::Type("attime without body".into()))?;
                match self.time_of_rec(body, memo)? {
                    ExprTime::DontCare => ExprTime::DontCare,
                    ExprTime::Current => ExprTime::At(stamp),
                    ExprTime::Next => return Err(EvalError::NestedNext),
                    ExprTime::At(_) => return Err(EvalError::NestedAtTime),
                }
            }

            _ => {
                let l = match arena.left(expr) {
                    Some(l) => self.time_of_rec(l, memo)?,
                    None => ExprTime::DontCare,
                };
                let r = match arena.right(expr) {
                    Some(r) => self.time_of_rec(r, memo)?,
                    None => ExprTime::DontCare,
                };
                l.min_with(r)
            }
        };
        memo.insert(expr, res);
        Ok(res)
    }

    fn is_frozen_name(&self, name: NodeRef) -> bool {
        let Some(view) = self.view() else { return false };
        match ResolvedSymbol::resolve(view, self.arena(), name, None) {
            Ok(rs) => rs
                .resolved_name()
                .is_some_and(|resolved| view.is_frozen_var(resolved)),
            Err(_) => false,
        }
    }

    /// Rewrites a timed expression into an untimed one, computing the
    /// current time first.
    pub fn untimed(&self, expr: NodeRef) -> Result<NodeRef, EvalError> {
        let time = self.time_of(expr)?;
        self.untimed_at(expr, time)
    }

    /// Rewrites a timed expression into an untimed one against the
    /// given current time: stamps equal to it are stripped, stamps one
    /// past it become `next`. A frozen variable matches any stamp.
    pub fn untimed_at(&self, expr: NodeRef, time: ExprTime) -> Result<NodeRef, EvalError> {
        let curr = match time {
            ExprTime::At(t) => Some(t),
            _ => None,
        };
        let mut memo = FxHashMap::default();
        self.untimed_rec(expr, curr, false, &mut memo)
    }

    fn untimed_rec(
        &self,
        expr: NodeRef,
        curr: Option<u32>,
        in_next: bool,
        memo: &mut FxHashMap<(NodeRef, bool), NodeRef>,
    ) -> Result<NodeRef, EvalError> {
        if let Some(&res) = memo.get(&(expr, in_next)) {
            return Ok(res);
        }
        let arena = self.arena();
        let res = match arena.tag(expr) {
            Tag::Failure
            | Tag::Array
            | Tag::Bit
            | Tag::Dot
            | Tag::Atom
            | Tag::NumberSignedWord
            | Tag::NumberUnsignedWord
            | Tag::UwConst
            | Tag::SwConst
            | Tag::WordArray
            | Tag::Number
            | Tag::NumberReal
            | Tag::NumberFrac
            | Tag::NumberExp
            | Tag::TrueExp
            | Tag::FalseExp => expr,

            Tag::AtTime => {
                let body = self
                    .at_time_body(expr)
                    .ok_or_else(|| EvalError::Type("attime without body".into()))?;
                let stamp = self
                    .at_time_stamp(expr)
                    .ok_or_else(|| EvalError::Type("malformed attime stamp".into()))?;
                // a frozen variable is compatible with any stamp
                let effective = if self.is_frozen_name(body) { curr } else { Some(stamp) };

                if effective == curr {
                    self.untimed_rec(body, curr, in_next, memo)?
                } else if curr.is_some() && effective == curr.map(|c| c + 1) {
                    if in_next {
                        return Err(EvalError::NestedNext);
                    }
                    let inner = self.untimed_rec(body, curr, true, memo)?;
                    arena.intern(Tag::Next, Some(inner), None)
                } else {
                    return Err(EvalError::NestedAtTime);
                }
            }

            Tag::Next => {
                if in_next {
                    return Err(EvalError::NestedNext);
                }
                let body = arena
                    .left(expr)
                    .ok_or_else(|| EvalError::Type("next without body".into()))?;
                let inner = self.untimed_rec(body, curr, true, memo)?;
                arena.intern(Tag::Next, Some(inner), None)
            }

            tag => {
                let l = arena
                    .left(expr)
                    .map(|l| self.untimed_rec(l, curr, in_next, memo))
                    .transpose()?;
                let r = arena
                    .right(expr)
                    .map(|r| self.untimed_rec(r, curr, in_next, memo))
                    .transpose()?;
                arena.intern(tag, l, r)
            }
        };
        memo.insert((expr, in_next), res);
        Ok(res)
    }

    /// True when the expression contains an `ATTIME` stamp. `next`
    /// sub-expressions are untimed by definition.
    pub fn is_timed(&self, expr: NodeRef) -> bool {
        let mut memo = FxHashMap::default();
        self.is_timed_rec(expr, &mut memo)
    }

    fn is_timed_rec(&self, expr: NodeRef, memo: &mut FxHashMap<NodeRef, bool>) -> bool {
        if let Some(&b) = memo.get(&expr) {
            return b;
        }
        let arena = self.arena();
        let res = match arena.tag(expr) {
            Tag::AtTime => true,
            Tag::Next => false,
            t if t.is_leaf() => false,
            _ => {
                arena.left(expr).is_some_and(|l| self.is_timed_rec(l, memo))
                    || arena.right(expr).is_some_and(|r| self.is_timed_rec(r, memo))
            }
        };
        memo.insert(expr, res);
        res
    }
}
