//! Expression algebra.
//!
//! Every operator is a smart constructor: it inspects its (already
//! simplified, already interned) arguments and may return a simplified
//! node instead of the literal application. Simplification is local —
//! one rule at a time on the current root — and deterministic.
//!
//! The expressions handed to this layer are assumed flattened.
//! Constructors take `&self` on an [`ExprBuilder`], which carries the
//! arena and an optional [`SymbolView`]; without a view only syntactic
//! simplification happens.
//!
//! Commutative constructors order their children by node identity when
//! no rule fires, so `op(a, b)` and `op(b, a)` intern to the same node.

mod simplify;
mod time;

pub use simplify::SimplifyCache;
pub use time::ExprTime;

use num_bigint::BigInt;
use thiserror::Error;

use crate::base::{FailureKind, Tag};
use crate::node::{NodeArena, NodeRef};
use crate::set::Set;
use crate::symbol::SymbolView;
use crate::word::{WordError, WordValue, MAX_WORD_WIDTH};

/// Fatal expression-construction errors. Deferred (recoverable) errors
/// travel as `Failure` nodes instead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("right operand of {0} is out of range")]
    OperandOutOfRange(&'static str),

    #[error("size specifier of swconst/uwconst operator is out of range [1, {MAX_WORD_WIDTH}]")]
    WordSizeOutOfRange,

    #[error("word operation failed: {0}")]
    Word(#[from] WordError),

    #[error("invalid nested next operator")]
    NestedNext,

    #[error("invalid nested timed expression")]
    NestedAtTime,

    #[error("type error: {0}")]
    Type(String),
}

fn big_is_zero(v: &BigInt) -> bool {
    v.sign() == num_bigint::Sign::NoSign
}

/// Smart-constructor front end over a [`NodeArena`].
#[derive(Clone, Copy)]
pub struct ExprBuilder<'a> {
    arena: &'a NodeArena,
    view: Option<&'a dyn SymbolView>,
}

impl<'a> ExprBuilder<'a> {
    /// A builder performing purely syntactic simplification.
    pub fn new(arena: &'a NodeArena) -> Self {
        ExprBuilder { arena, view: None }
    }

    /// A builder that additionally consults the symbol table for
    /// type-directed rules (set detection, enum constants, frozen
    /// variables).
    pub fn with_view(arena: &'a NodeArena, view: &'a dyn SymbolView) -> Self {
        ExprBuilder { arena, view: Some(view) }
    }

    pub fn arena(&self) -> &'a NodeArena {
        self.arena
    }

    pub fn view(&self) -> Option<&'a dyn SymbolView> {
        self.view
    }

    // ------------------------------------------------------------------
    // Constants and predicates
    // ------------------------------------------------------------------

    pub fn truth(&self) -> NodeRef {
        self.arena.bool_true()
    }

    pub fn falsity(&self) -> NodeRef {
        self.arena.bool_false()
    }

    pub fn is_true(&self, n: NodeRef) -> bool {
        self.arena.tag(n) == Tag::TrueExp
    }

    pub fn is_false(&self, n: NodeRef) -> bool {
        self.arena.tag(n) == Tag::FalseExp
    }

    fn is_bool_const(&self, n: NodeRef) -> bool {
        self.is_true(n) || self.is_false(n)
    }

    fn bool_node(&self, b: bool) -> NodeRef {
        if b { self.truth() } else { self.falsity() }
    }

    fn word_const(&self, n: NodeRef) -> Option<WordValue> {
        if self.arena.tag(n).is_word_constant() {
            self.arena.word_value(n)
        } else {
            None
        }
    }

    fn int_const(&self, n: NodeRef) -> Option<BigInt> {
        if self.arena.tag(n) == Tag::Number {
            self.arena.int_value(n)
        } else {
            None
        }
    }

    /// The operand under a `NOT`, if `n` is one.
    fn not_operand(&self, n: NodeRef) -> Option<NodeRef> {
        if self.arena.tag(n) == Tag::Not {
            self.arena.left(n)
        } else {
            None
        }
    }

    fn complementary(&self, a: NodeRef, b: NodeRef) -> bool {
        self.not_operand(a) == Some(b) || self.not_operand(b) == Some(a)
    }

    /// Interns with children ordered by identity, multiplying sharing
    /// between `op(a, b)` and `op(b, a)`.
    fn ordered(&self, tag: Tag, a: NodeRef, b: NodeRef) -> NodeRef {
        if a.index() > b.index() {
            self.arena.intern(tag, Some(b), Some(a))
        } else {
            self.arena.intern(tag, Some(a), Some(b))
        }
    }

    /// Folds a bitwise word operation when both operands are word
    /// constants of the same kind and width.
    fn fold_word(
        &self,
        a: NodeRef,
        b: NodeRef,
        op: fn(&WordValue, &WordValue) -> Result<WordValue, WordError>,
    ) -> Option<NodeRef> {
        let (wa, wb) = (self.word_const(a)?, self.word_const(b)?);
        if wa.sign() != wb.sign() {
            return None;
        }
        op(&wa, &wb).ok().map(|w| self.arena.word(w))
    }

    fn expr_type(&self, n: NodeRef) -> Option<crate::symbol::SymbolType> {
        self.view.map(|v| v.expression_type(n))
    }

    fn is_set_typed(&self, n: NodeRef) -> Option<bool> {
        self.expr_type(n).map(|t| t.is_set())
    }

    /// True when `n` is a constant for `next`/`attime` purposes:
    /// boolean and scalar constants, constant ranges, declared enum
    /// constants, and unions thereof.
    fn is_constant_expr(&self, n: NodeRef) -> bool {
        match self.arena.tag(n) {
            Tag::TrueExp
            | Tag::FalseExp
            | Tag::Number
            | Tag::NumberUnsignedWord
            | Tag::NumberSignedWord => true,
            Tag::TwoDots => {
                self.arena.left(n).map(|l| self.arena.tag(l)) == Some(Tag::Number)
                    && self.arena.right(n).map(|r| self.arena.tag(r)) == Some(Tag::Number)
            }
            Tag::Union => match self.view {
                Some(view) => Set::from_union(self.arena, Some(n))
                    .iter()
                    .all(|el| view.is_constant(el)),
                None => false,
            },
            _ => self.view.is_some_and(|view| view.is_constant(n)),
        }
    }

    // ------------------------------------------------------------------
    // Boolean connectives
    // ------------------------------------------------------------------

    /// Logical/bitwise AND.
    pub fn and(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if self.is_true(a) {
            return b;
        }
        if self.is_true(b) {
            return a;
        }
        if self.is_false(a) {
            return a;
        }
        if self.is_false(b) {
            return b;
        }
        if a == b {
            return a;
        }
        if self.complementary(a, b) {
            return self.falsity();
        }
        if let Some(n) = self.fold_word(a, b, WordValue::and) {
            return n;
        }
        self.ordered(Tag::And, a, b)
    }

    /// AND over an iterator, treating the empty sequence as truth.
    pub fn conjoin<I: IntoIterator<Item = NodeRef>>(&self, elems: I) -> NodeRef {
        elems
            .into_iter()
            .fold(self.truth(), |acc, e| self.and(acc, e))
    }

    /// Logical/bitwise NOT.
    pub fn not(&self, a: NodeRef) -> NodeRef {
        if self.is_true(a) {
            return self.falsity();
        }
        if self.is_false(a) {
            return self.truth();
        }
        if let Some(inner) = self.not_operand(a) {
            return inner;
        }
        if let Some(w) = self.word_const(a) {
            return self.arena.word(w.not());
        }
        self.arena.intern(Tag::Not, Some(a), None)
    }

    /// Logical/bitwise OR.
    pub fn or(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if self.is_true(a) {
            return a;
        }
        if self.is_true(b) {
            return b;
        }
        if self.is_false(a) {
            return b;
        }
        if self.is_false(b) {
            return a;
        }
        if a == b {
            return a;
        }
        if self.complementary(a, b) {
            return self.truth();
        }
        if let Some(n) = self.or_absorb_conjunctions(a, b) {
            return n;
        }
        if let Some(n) = self.fold_word(a, b, WordValue::or) {
            return n;
        }
        self.ordered(Tag::Or, a, b)
    }

    /// `(A ∧ B) ∨ (A ∧ ¬B) → A` and its three mirrored layouts.
    fn or_absorb_conjunctions(&self, a: NodeRef, b: NodeRef) -> Option<NodeRef> {
        if self.arena.tag(a) != Tag::And || self.arena.tag(b) != Tag::And {
            return None;
        }
        let (al, ar) = (self.arena.left(a)?, self.arena.right(a)?);
        let (bl, br) = (self.arena.left(b)?, self.arena.right(b)?);

        // (A & B) | (A & !B)  /  (A & !B) | (A & B)  ---> A
        if al == bl
            && (self.not_operand(br) == Some(ar) || self.not_operand(ar) == Some(br))
        {
            return Some(al);
        }
        // (A & B) | (!A & B)  /  (!A & B) | (A & B)  ---> B
        if ar == br
            && (self.not_operand(bl) == Some(al) || self.not_operand(al) == Some(bl))
        {
            return Some(ar);
        }
        // (A & B) | (B & !A)  /  (!A & B) | (B & A)  ---> B
        if ar == bl
            && (self.not_operand(br) == Some(al) || self.not_operand(al) == Some(br))
        {
            return Some(ar);
        }
        // (A & B) | (!B & A)  /  (A & !B) | (B & A)  ---> A
        if al == br
            && (self.not_operand(bl) == Some(ar) || self.not_operand(ar) == Some(bl))
        {
            return Some(al);
        }
        None
    }

    /// OR over an iterator, treating the empty sequence as falsity.
    pub fn disjoin<I: IntoIterator<Item = NodeRef>>(&self, elems: I) -> NodeRef {
        elems
            .into_iter()
            .fold(self.falsity(), |acc, e| self.or(acc, e))
    }

    /// Logical/bitwise XOR.
    pub fn xor(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if self.is_true(a) {
            return self.not(b);
        }
        if self.is_true(b) {
            return self.not(a);
        }
        if self.is_false(a) {
            return b;
        }
        if self.is_false(b) {
            return a;
        }
        if self.complementary(a, b) {
            return self.truth();
        }
        if a == b && self.non_word_operands(a, b) {
            return self.falsity();
        }
        if let Some(n) = self.fold_word(a, b, WordValue::xor) {
            return n;
        }
        self.ordered(Tag::Xor, a, b)
    }

    /// Logical/bitwise XNOR.
    pub fn xnor(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if self.is_true(a) {
            return b;
        }
        if self.is_true(b) {
            return a;
        }
        if self.is_false(a) {
            return self.not(b);
        }
        if self.is_false(b) {
            return self.not(a);
        }
        if self.complementary(a, b) {
            return self.falsity();
        }
        if a == b && self.non_word_operands(a, b) {
            return self.truth();
        }
        if let Some(n) = self.fold_word(a, b, WordValue::xnor) {
            return n;
        }
        self.ordered(Tag::Xnor, a, b)
    }

    /// Logical/bitwise IFF. For non-word operands `a <-> a` is truth;
    /// for words the rule would be unsound (the result is a word).
    pub fn iff(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if self.is_true(a) {
            return b;
        }
        if self.is_true(b) {
            return a;
        }
        if self.is_false(a) {
            return self.not(b);
        }
        if self.is_false(b) {
            return self.not(a);
        }
        if self.complementary(a, b) {
            return self.falsity();
        }
        if a == b && self.non_word_operands(a, b) {
            return self.truth();
        }
        if let Some(n) = self.fold_word(a, b, WordValue::iff) {
            return n;
        }
        self.ordered(Tag::Iff, a, b)
    }

    fn non_word_operands(&self, a: NodeRef, b: NodeRef) -> bool {
        match self.view {
            Some(view) => {
                !view.expression_type(a).is_word() && !view.expression_type(b).is_word()
            }
            None => false,
        }
    }

    /// Logical/bitwise IMPLIES. Falls back to `¬a ∨ b`.
    pub fn implies(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if self.is_true(a) {
            return b;
        }
        if self.is_false(a) {
            return self.truth();
        }
        if self.is_true(b) {
            return self.truth();
        }
        if self.is_false(b) {
            return self.not(a);
        }
        if self.complementary(a, b) {
            return b;
        }
        if let Some(n) = self.fold_word(a, b, WordValue::implies) {
            return n;
        }
        self.or(self.not(a), b)
    }

    // ------------------------------------------------------------------
    // Case / if-then-else
    // ------------------------------------------------------------------

    /// If-then-else / one-branch `CASE`. The constructed shape is
    /// `CASE(COLON(cond, t), e)`.
    pub fn ite(&self, cond: NodeRef, t: NodeRef, e: NodeRef) -> NodeRef {
        if self.is_true(cond) {
            return t;
        }
        if self.is_false(cond) {
            return e;
        }
        if t == e {
            return t;
        }
        if self.is_true(t) && self.is_false(e) {
            return cond;
        }
        if self.is_false(t) && self.is_true(e) {
            return self.not(cond);
        }

        // Boolean rewrites apply only when the surviving branch is not
        // set-typed; only CASE expressions may produce sets.
        if self.is_false(t) {
            if self.arena.tag(e) == Tag::Failure {
                self.warn_discarded_failure(e);
                return self.not(cond);
            }
            if self.is_set_typed(e) == Some(false) {
                return self.and(self.not(cond), e);
            }
        }
        if self.is_true(t) {
            if self.arena.tag(e) == Tag::Failure {
                self.warn_discarded_failure(e);
                return cond;
            }
            if self.is_set_typed(e) == Some(false) {
                return self.or(cond, e);
            }
        }
        if self.is_false(e) && self.is_set_typed(t) == Some(false) {
            return self.and(cond, t);
        }
        if self.is_true(e) && self.is_set_typed(t) == Some(false) {
            return self.or(self.not(cond), t);
        }

        // Adjacent branches with equal results merge their conditions:
        //   case c1: r; c2: r; rest  --->  case c1|c2: r; rest
        if matches!(self.arena.tag(e), Tag::Case | Tag::IfThenElse) {
            if let Some(colon) = self.arena.left(e) {
                let inner_cond = self.arena.left(colon);
                let inner_then = self.arena.right(colon);
                if inner_then == Some(t) {
                    if let (Some(ic), Some(rest)) = (inner_cond, self.arena.right(e)) {
                        return self.ite(self.or(cond, ic), t, rest);
                    }
                }
            }
        }

        // A nested CASE guarded by the same condition collapses to its
        // first branch.
        let then_branch = if matches!(self.arena.tag(t), Tag::Case | Tag::IfThenElse) {
            match self.arena.left(t) {
                Some(colon) if self.arena.left(colon) == Some(cond) => {
                    self.arena.right(colon).unwrap_or(t)
                }
                _ => t,
            }
        } else {
            t
        };

        let colon = self.arena.intern(Tag::Colon, Some(cond), Some(then_branch));
        self.arena.intern(Tag::Case, Some(colon), Some(e))
    }

    fn warn_discarded_failure(&self, failure: NodeRef) {
        if let Some(info) = self.arena.failure_info(failure) {
            tracing::warn!(
                line = info.line,
                "discarding failure branch: {} ({})",
                info.message,
                info.kind.describe()
            );
        }
    }

    // ------------------------------------------------------------------
    // Next
    // ------------------------------------------------------------------

    /// Transition-relation `next`. Constants and sets of constants pass
    /// through unwrapped.
    pub fn next(&self, a: NodeRef) -> NodeRef {
        if self.is_constant_expr(a) {
            return a;
        }
        self.arena.intern(Tag::Next, Some(a), None)
    }

    // ------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------

    /// Equality over booleans, scalars and words.
    pub fn equal(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if a == b {
            return self.truth();
        }
        if self.is_bool_const(a) && self.is_bool_const(b) {
            return self.bool_node(self.is_true(a) == self.is_true(b));
        }
        if self.complementary(a, b) {
            return self.falsity();
        }
        if let (Some(va), Some(vb)) = (self.int_const(a), self.int_const(b)) {
            return self.bool_node(va == vb);
        }
        if let (Some(wa), Some(wb)) = (self.word_const(a), self.word_const(b)) {
            if let Ok(eq) = wa.eq_value(&wb) {
                return self.bool_node(eq);
            }
        }
        if let Some(view) = self.view {
            // two distinct declared constants are never equal
            if view.is_constant(a) && view.is_constant(b) {
                return self.falsity();
            }
            if self.is_true(a) && view.expression_type(b).is_boolean() {
                return b;
            }
            if self.is_true(b) && view.expression_type(a).is_boolean() {
                return a;
            }
            if self.is_false(a) && view.expression_type(b).is_boolean() {
                return self.not(b);
            }
            if self.is_false(b) && view.expression_type(a).is_boolean() {
                return self.not(a);
            }
        }
        self.ordered(Tag::Equal, a, b)
    }

    /// Disequality over booleans, scalars and words.
    pub fn not_equal(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if a == b {
            return self.falsity();
        }
        if self.is_bool_const(a) && self.is_bool_const(b) {
            return self.bool_node(self.is_true(a) != self.is_true(b));
        }
        if self.complementary(a, b) {
            return self.truth();
        }
        if let (Some(va), Some(vb)) = (self.int_const(a), self.int_const(b)) {
            return self.bool_node(va != vb);
        }
        if let (Some(wa), Some(wb)) = (self.word_const(a), self.word_const(b)) {
            if let Ok(ne) = wa.ne_value(&wb) {
                return self.bool_node(ne);
            }
        }
        if let Some(view) = self.view {
            if view.is_constant(a) && view.is_constant(b) {
                return self.truth();
            }
            if self.is_true(a) && view.expression_type(b).is_boolean() {
                return self.not(b);
            }
            if self.is_true(b) && view.expression_type(a).is_boolean() {
                return self.not(a);
            }
            if self.is_false(a) && view.expression_type(b).is_boolean() {
                return b;
            }
            if self.is_false(b) && view.expression_type(a).is_boolean() {
                return a;
            }
        }
        self.ordered(Tag::NotEqual, a, b)
    }

    /// Less-than over scalars and words.
    pub fn lt(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if a == b {
            return self.falsity();
        }
        if let (Some(va), Some(vb)) = (self.int_const(a), self.int_const(b)) {
            return self.bool_node(va < vb);
        }
        let (wa, wb) = (self.word_const(a), self.word_const(b));
        if let (Some(wa), Some(wb)) = (wa, wb) {
            let lt = if wa.is_signed() { wa.slt(&wb) } else { wa.ult(&wb) };
            if let Ok(lt) = lt {
                return self.bool_node(lt);
            }
        }
        // expr < 0w         ---> false
        // maxU < expr       ---> false
        // maxS < expr       ---> false
        if wb.is_some_and(|w| !w.is_signed() && w.is_zero())
            || wa.is_some_and(|w| self.is_word_max(&w))
        {
            return self.falsity();
        }
        self.arena.intern(Tag::Lt, Some(a), Some(b))
    }

    /// Less-than-or-equal over scalars and words.
    pub fn le(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if a == b {
            return self.truth();
        }
        if let (Some(va), Some(vb)) = (self.int_const(a), self.int_const(b)) {
            return self.bool_node(va <= vb);
        }
        let (wa, wb) = (self.word_const(a), self.word_const(b));
        if let (Some(wa), Some(wb)) = (wa, wb) {
            let le = if wa.is_signed() { wa.sle(&wb) } else { wa.ule(&wb) };
            if let Ok(le) = le {
                return self.bool_node(le);
            }
        }
        // expr <= 0w        ---> expr = 0w
        if wb.is_some_and(|w| !w.is_signed() && w.is_zero()) {
            return self.equal(a, b);
        }
        // 0w <= expr, expr <= max ---> true
        if wa.is_some_and(|w| !w.is_signed() && w.is_zero())
            || wb.is_some_and(|w| self.is_word_max(&w))
        {
            return self.truth();
        }
        self.arena.intern(Tag::Le, Some(a), Some(b))
    }

    /// Greater-than over scalars and words.
    pub fn gt(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if a == b {
            return self.falsity();
        }
        if let (Some(va), Some(vb)) = (self.int_const(a), self.int_const(b)) {
            return self.bool_node(va > vb);
        }
        let (wa, wb) = (self.word_const(a), self.word_const(b));
        if let (Some(wa), Some(wb)) = (wa, wb) {
            let gt = if wa.is_signed() { wa.sgt(&wb) } else { wa.ugt(&wb) };
            if let Ok(gt) = gt {
                return self.bool_node(gt);
            }
        }
        // 0w > expr, expr > max ---> false
        if wa.is_some_and(|w| !w.is_signed() && w.is_zero())
            || wb.is_some_and(|w| self.is_word_max(&w))
        {
            return self.falsity();
        }
        self.arena.intern(Tag::Gt, Some(a), Some(b))
    }

    /// Greater-than-or-equal over scalars and words.
    pub fn ge(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if a == b {
            return self.truth();
        }
        if let (Some(va), Some(vb)) = (self.int_const(a), self.int_const(b)) {
            return self.bool_node(va >= vb);
        }
        let (wa, wb) = (self.word_const(a), self.word_const(b));
        if let (Some(wa), Some(wb)) = (wa, wb) {
            let ge = if wa.is_signed() { wa.sge(&wb) } else { wa.uge(&wb) };
            if let Ok(ge) = ge {
                return self.bool_node(ge);
            }
        }
        // 0w >= expr        ---> 0w = expr
        if wa.is_some_and(|w| !w.is_signed() && w.is_zero()) {
            return self.equal(a, b);
        }
        // expr >= 0w, max >= expr ---> true
        if wb.is_some_and(|w| !w.is_signed() && w.is_zero())
            || wa.is_some_and(|w| self.is_word_max(&w))
        {
            return self.truth();
        }
        self.arena.intern(Tag::Ge, Some(a), Some(b))
    }

    fn is_word_max(&self, w: &WordValue) -> bool {
        if w.is_signed() {
            w.signed_value() == WordValue::max_signed_value(w.width())
        } else {
            w.unsigned_value() == WordValue::max_unsigned_value(w.width())
        }
    }

    // ------------------------------------------------------------------
    // Arithmetic
    // ------------------------------------------------------------------

    fn is_zero_scalar(&self, n: NodeRef) -> bool {
        self.int_const(n).is_some_and(|v| big_is_zero(&v))
            || self.word_const(n).is_some_and(|w| w.is_zero())
    }

    pub fn unary_minus(&self, a: NodeRef) -> NodeRef {
        if let Some(v) = self.int_const(a) {
            return self.arena.int(-v);
        }
        if let Some(w) = self.word_const(a) {
            return self.arena.word(w.negate());
        }
        self.arena.intern(Tag::UMinus, Some(a), None)
    }

    pub fn plus(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if let (Some(va), Some(vb)) = (self.int_const(a), self.int_const(b)) {
            return self.arena.int(va + vb);
        }
        if let Some(n) = self.fold_word(a, b, WordValue::add) {
            return n;
        }
        if self.is_zero_scalar(a) {
            return b;
        }
        if self.is_zero_scalar(b) {
            return a;
        }
        self.ordered(Tag::Plus, a, b)
    }

    pub fn minus(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if let (Some(va), Some(vb)) = (self.int_const(a), self.int_const(b)) {
            return self.arena.int(va - vb);
        }
        if let Some(n) = self.fold_word(a, b, WordValue::sub) {
            return n;
        }
        if self.is_zero_scalar(a) {
            return self.unary_minus(b);
        }
        if self.is_zero_scalar(b) {
            return a;
        }
        self.arena.intern(Tag::Minus, Some(a), Some(b))
    }

    pub fn times(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if let (Some(va), Some(vb)) = (self.int_const(a), self.int_const(b)) {
            return self.arena.int(va * vb);
        }
        if let Some(n) = self.fold_word(a, b, WordValue::mul) {
            return n;
        }
        // 0 * A = A * 0 = 0, preserving the word-typed operand's width
        if self.int_const(a).is_some_and(|v| big_is_zero(&v))
            || self.int_const(b).is_some_and(|v| big_is_zero(&v))
        {
            return self.arena.int_i64(0);
        }
        if self.word_const(a).is_some_and(|w| w.is_zero()) {
            return a;
        }
        if self.word_const(b).is_some_and(|w| w.is_zero()) {
            return b;
        }
        self.ordered(Tag::Times, a, b)
    }

    /// Division. A constant zero divisor yields a deferred
    /// `Failure(DivByZero)` node, so dead branches survive compilation.
    pub fn divide(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if let (Some(va), Some(vb)) = (self.int_const(a), self.int_const(b)) {
            if big_is_zero(&vb) {
                return self.div_by_zero_failure(b);
            }
            return self.arena.int(va / vb);
        }
        if let (Some(wa), Some(wb)) = (self.word_const(a), self.word_const(b)) {
            if wa.sign() == wb.sign() {
                if wb.is_zero() {
                    return self.div_by_zero_failure(b);
                }
                let q = if wa.is_signed() { wa.signed_div(&wb) } else { wa.unsigned_div(&wb) };
                if let Ok(q) = q {
                    return self.arena.word(q);
                }
            }
        }
        self.arena.intern(Tag::Divide, Some(a), Some(b))
    }

    /// Modulo; same zero-divisor policy as [`ExprBuilder::divide`].
    pub fn modulo(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if let (Some(va), Some(vb)) = (self.int_const(a), self.int_const(b)) {
            if big_is_zero(&vb) {
                return self.div_by_zero_failure(b);
            }
            return self.arena.int(va % vb);
        }
        if let (Some(wa), Some(wb)) = (self.word_const(a), self.word_const(b)) {
            if wa.sign() == wb.sign() {
                if wb.is_zero() {
                    return self.div_by_zero_failure(b);
                }
                let r = if wa.is_signed() { wa.signed_mod(&wb) } else { wa.unsigned_mod(&wb) };
                if let Ok(r) = r {
                    return self.arena.word(r);
                }
            }
        }
        self.arena.intern(Tag::Mod, Some(a), Some(b))
    }

    fn div_by_zero_failure(&self, divisor: NodeRef) -> NodeRef {
        let line = self.arena.line(divisor).unwrap_or(0);
        self.arena
            .failure(FailureKind::DivByZero, "division by zero", line)
    }

    // ------------------------------------------------------------------
    // Sets and ranges
    // ------------------------------------------------------------------

    /// Set union. Deduplicates via the set domain and collapses back to
    /// the sole element when one remains.
    pub fn union(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if a == b {
            return a;
        }
        let u = self.arena.intern(Tag::Union, Some(a), Some(b));
        let set = Set::from_union(self.arena, Some(u));
        if let Some(only) = set.only_member() {
            return only;
        }
        u
    }

    /// Integer range; collapses to the bound when both coincide.
    pub fn range(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if a == b {
            return a;
        }
        if let (Some(va), Some(vb)) = (self.int_const(a), self.int_const(b)) {
            if va == vb {
                return a;
            }
        }
        self.arena.intern(Tag::TwoDots, Some(a), Some(b))
    }

    /// Set membership. Containment is syntactic over interned identity;
    /// with a symbol view, two all-constant sets decide the negative
    /// case as well.
    pub fn set_in(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        let seta = Set::from_union(self.arena, Some(a));
        let setb = Set::from_union(self.arena, Some(b));
        if setb.contains(&seta) {
            return self.truth();
        }
        if let Some(view) = self.view {
            let all_const = seta
                .iter()
                .chain(setb.iter())
                .all(|el| self.is_constant_expr(el) || view.is_constant(el));
            if all_const {
                return self.falsity();
            }
        }
        self.arena.intern(Tag::SetIn, Some(a), Some(b))
    }

    /// Uninterpreted function application; `params` is a `CONS` list.
    pub fn function(&self, name: NodeRef, params: Option<NodeRef>) -> NodeRef {
        self.arena.intern(Tag::NFunction, Some(name), params)
    }
}
