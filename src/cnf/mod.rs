//! CNF materialization.
//!
//! [`Cnf`] represents a boolean expression as a clause list over
//! integer literals (positive = variable, negative = negated), a list
//! of independent variables, the maximum variable index, and the
//! signed literal the whole formula was encoded as. Variables map
//! bidirectionally to expression-graph nodes.
//!
//! Two encodings are selectable by their established names:
//! `"tseitin"` introduces the defining clauses of every connective in
//! both directions; `"sheridan"` keeps only the implications of the
//! polarity each sub-formula is actually used in.

use std::io::{self, Write};

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::base::Tag;
use crate::node::{NodeArena, NodeRef};

/// CNF conversion failures.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CnfError {
    #[error("unknown CNF algorithm \"{0}\"")]
    UnknownAlgorithm(String),

    #[error("operator {0:?} has no boolean CNF encoding")]
    UnsupportedOperator(Tag),

    #[error("malformed boolean expression")]
    MalformedExpression,
}

/// CNF conversion algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CnfAlgorithm {
    /// Full Tseitin: both implication directions for every connective.
    Tseitin,
    /// Polarity-reduced conversion in the style of Sheridan's
    /// encoder: only the implications of the used polarity.
    Sheridan,
}

impl CnfAlgorithm {
    /// Parses the established algorithm-name strings.
    pub fn by_name(name: &str) -> Result<Self, CnfError> {
        match name {
            "tseitin" => Ok(CnfAlgorithm::Tseitin),
            "sheridan" => Ok(CnfAlgorithm::Sheridan),
            other => Err(CnfError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// A boolean expression materialized in conjunctive normal form.
pub struct Cnf {
    original: NodeRef,
    vars: Vec<i32>,
    clauses: Vec<Vec<i32>>,
    max_var: i32,
    formula_literal: i32,
    var_to_node: FxHashMap<i32, NodeRef>,
    node_to_var: FxHashMap<NodeRef, i32>,
}

impl Cnf {
    /// Converts a (flattened, simplified) boolean expression.
    pub fn convert(
        arena: &NodeArena,
        expr: NodeRef,
        algorithm: CnfAlgorithm,
    ) -> Result<Cnf, CnfError> {
        let mut enc = Encoder {
            arena,
            algorithm,
            cnf: Cnf {
                original: expr,
                vars: Vec::new(),
                clauses: Vec::new(),
                max_var: 0,
                formula_literal: 0,
                var_to_node: FxHashMap::default(),
                node_to_var: FxHashMap::default(),
            },
            memo: FxHashMap::default(),
        };
        // the SAT caller asserts the formula literal positively; the
        // polarity-reduced encoding exploits that at the root
        let literal = match algorithm {
            CnfAlgorithm::Tseitin => enc.literal_of(expr, true, true)?,
            CnfAlgorithm::Sheridan => enc.literal_of(expr, true, false)?,
        };
        enc.cnf.formula_literal = literal;
        Ok(enc.cnf)
    }

    /// The expression this CNF was created from.
    pub fn original_expression(&self) -> NodeRef {
        self.original
    }

    /// The literal assigned to the whole formula; its sign is the
    /// root polarity.
    pub fn formula_literal(&self) -> i32 {
        self.formula_literal
    }

    /// Independent CNF variables (one per atomic expression).
    pub fn vars(&self) -> &[i32] {
        &self.vars
    }

    pub fn clauses(&self) -> &[Vec<i32>] {
        &self.clauses
    }

    /// Largest variable index in use.
    pub fn max_var_index(&self) -> i32 {
        self.max_var
    }

    pub fn vars_number(&self) -> usize {
        self.vars.len()
    }

    pub fn clauses_number(&self) -> usize {
        self.clauses.len()
    }

    /// Expression-graph node encoded by a CNF variable.
    pub fn cnf_var_to_node(&self, var: i32) -> Option<NodeRef> {
        self.var_to_node.get(&var).copied()
    }

    /// CNF variable encoding an expression-graph node.
    pub fn node_to_cnf_var(&self, node: NodeRef) -> Option<i32> {
        self.node_to_var.get(&node).copied()
    }

    /// Removes repeated literals within each clause, in place.
    /// Idempotent.
    pub fn remove_duplicate_literals(&mut self) {
        for clause in &mut self.clauses {
            let mut seen = FxHashSet::default();
            clause.retain(|&lit| seen.insert(lit));
        }
    }

    /// Prints clause count, variable count, max variable index,
    /// average clause size, and max clause size.
    pub fn print_stats(&self, out: &mut dyn Write, prefix: &str) -> io::Result<()> {
        let mut max_clause_size = 0usize;
        let mut sum_clause_size = 0usize;
        for clause in &self.clauses {
            sum_clause_size += clause.len();
            max_clause_size = max_clause_size.max(clause.len());
        }
        let avg = if self.clauses.is_empty() {
            0.0
        } else {
            sum_clause_size as f64 / self.clauses.len() as f64
        };
        writeln!(out, "{prefix} Clause number: {}", self.clauses_number())?;
        writeln!(out, "{prefix} Var number: {}", self.vars_number())?;
        writeln!(out, "{prefix} Max var index: {}", self.max_var)?;
        writeln!(out, "{prefix} Average clause size: {avg:.2}")?;
        writeln!(out, "{prefix} Max clause size: {max_clause_size}")
    }
}

/// Encoding state for one sub-formula: its variable plus which
/// polarities already have defining clauses. A shared sub-formula may
/// be reached positively first and negatively later; the missing
/// direction is emitted on the later visit.
#[derive(Clone, Copy, Default)]
struct MemoEntry {
    var: i32,
    pos_done: bool,
    neg_done: bool,
}

struct Encoder<'a> {
    arena: &'a NodeArena,
    algorithm: CnfAlgorithm,
    cnf: Cnf,
    memo: FxHashMap<NodeRef, MemoEntry>,
}

impl<'a> Encoder<'a> {
    fn fresh_var(&mut self, node: NodeRef, independent: bool) -> i32 {
        let var = self.cnf.max_var + 1;
        self.cnf.max_var = var;
        if independent {
            self.cnf.vars.push(var);
        }
        self.cnf.var_to_node.insert(var, node);
        self.cnf.node_to_var.insert(node, var);
        var
    }

    fn clause(&mut self, lits: &[i32]) {
        self.cnf.clauses.push(lits.to_vec());
    }

    /// Returns the signed literal encoding `expr`, emitting any
    /// defining clauses still missing for the requested polarities.
    fn literal_of(
        &mut self,
        expr: NodeRef,
        used_pos: bool,
        used_neg: bool,
    ) -> Result<i32, CnfError> {
        // full Tseitin defines both directions unconditionally
        let (used_pos, used_neg) = match self.algorithm {
            CnfAlgorithm::Tseitin => (true, true),
            CnfAlgorithm::Sheridan => (used_pos, used_neg),
        };

        let arena = self.arena;
        if arena.tag(expr) == Tag::Not {
            let a = arena.left(expr).ok_or(CnfError::MalformedExpression)?;
            return Ok(-self.literal_of(a, used_neg, used_pos)?);
        }

        // atoms and constants are fully defined on first sight; compound
        // shapes may still owe the other polarity's clauses
        let single_shot = self.is_atomic(expr)
            || matches!(arena.tag(expr), Tag::TrueExp | Tag::FalseExp);

        let (v, need_pos, need_neg, first_visit) = match self.memo.get(&expr).copied() {
            Some(entry) => (
                entry.var,
                used_pos && !entry.pos_done,
                used_neg && !entry.neg_done,
                false,
            ),
            None => {
                let independent = self.is_atomic(expr);
                let v = self.fresh_var(expr, independent);
                (v, used_pos, used_neg, true)
            }
        };
        let entry = self.memo.entry(expr).or_default();
        entry.var = v;
        entry.pos_done |= used_pos || single_shot;
        entry.neg_done |= used_neg || single_shot;

        if !first_visit && !need_pos && !need_neg {
            return Ok(v);
        }

        match arena.tag(expr) {
            // constants pin their variable with a unit clause
            Tag::TrueExp => {
                if first_visit {
                    self.clause(&[v]);
                }
            }
            Tag::FalseExp => {
                if first_visit {
                    self.clause(&[-v]);
                }
            }

            Tag::And => {
                let a = arena.left(expr).ok_or(CnfError::MalformedExpression)?;
                let b = arena.right(expr).ok_or(CnfError::MalformedExpression)?;
                let la = self.literal_of(a, used_pos, used_neg)?;
                let lb = self.literal_of(b, used_pos, used_neg)?;
                // v -> a, v -> b; (a & b) -> v
                if need_pos {
                    self.clause(&[-v, la]);
                    self.clause(&[-v, lb]);
                }
                if need_neg {
                    self.clause(&[v, -la, -lb]);
                }
            }

            Tag::Or => {
                let a = arena.left(expr).ok_or(CnfError::MalformedExpression)?;
                let b = arena.right(expr).ok_or(CnfError::MalformedExpression)?;
                let la = self.literal_of(a, used_pos, used_neg)?;
                let lb = self.literal_of(b, used_pos, used_neg)?;
                // v -> (a | b); a -> v, b -> v
                if need_pos {
                    self.clause(&[-v, la, lb]);
                }
                if need_neg {
                    self.clause(&[v, -la]);
                    self.clause(&[v, -lb]);
                }
            }

            Tag::Implies => {
                let a = arena.left(expr).ok_or(CnfError::MalformedExpression)?;
                let b = arena.right(expr).ok_or(CnfError::MalformedExpression)?;
                // a -> b is !a | b; the antecedent flips polarity
                let la = self.literal_of(a, used_neg, used_pos)?;
                let lb = self.literal_of(b, used_pos, used_neg)?;
                if need_pos {
                    self.clause(&[-v, -la, lb]);
                }
                if need_neg {
                    self.clause(&[v, la]);
                    self.clause(&[v, -lb]);
                }
            }

            Tag::Iff | Tag::Xnor | Tag::Xor => {
                let a = arena.left(expr).ok_or(CnfError::MalformedExpression)?;
                let b = arena.right(expr).ok_or(CnfError::MalformedExpression)?;
                // both polarities of the operands are reachable
                let la = self.literal_of(a, true, true)?;
                let lb = self.literal_of(b, true, true)?;
                let (la, lb) = if arena.tag(expr) == Tag::Xor {
                    // a xor b  ==  !(a <-> b)
                    (-la, lb)
                } else {
                    (la, lb)
                };
                if need_pos {
                    self.clause(&[-v, -la, lb]);
                    self.clause(&[-v, la, -lb]);
                }
                if need_neg {
                    self.clause(&[v, la, lb]);
                    self.clause(&[v, -la, -lb]);
                }
            }

            // atomic boolean expressions need no defining clauses
            Tag::Dot | Tag::Bit | Tag::Array | Tag::Atom | Tag::Equal | Tag::NotEqual
            | Tag::Lt | Tag::Le | Tag::Gt | Tag::Ge | Tag::SetIn | Tag::Next => {}

            tag => return Err(CnfError::UnsupportedOperator(tag)),
        }

        Ok(v)
    }

    fn is_atomic(&self, expr: NodeRef) -> bool {
        matches!(
            self.arena.tag(expr),
            Tag::Dot
                | Tag::Bit
                | Tag::Array
                | Tag::Atom
                | Tag::Equal
                | Tag::NotEqual
                | Tag::Lt
                | Tag::Le
                | Tag::Gt
                | Tag::Ge
                | Tag::SetIn
                | Tag::Next
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(arena: &NodeArena, name: &str) -> NodeRef {
        arena.intern(Tag::Dot, None, Some(arena.atom(name)))
    }

    /// Brute-force satisfiability check of clauses ∧ formula literal.
    fn models(cnf: &Cnf) -> Vec<Vec<bool>> {
        let n = cnf.max_var_index() as usize;
        let mut found = Vec::new();
        for bits in 0..(1u32 << n) {
            let value = |lit: i32| {
                let var = lit.unsigned_abs() as usize;
                let v = bits >> (var - 1) & 1 == 1;
                if lit > 0 { v } else { !v }
            };
            let clauses_ok = cnf.clauses().iter().all(|c| c.iter().any(|&l| value(l)));
            if clauses_ok && value(cnf.formula_literal()) {
                found.push((1..=n).map(|v| bits >> (v - 1) & 1 == 1).collect());
            }
        }
        found
    }

    #[test]
    fn conjunction_has_single_projected_model() {
        let arena = NodeArena::new();
        let (a, b) = (atom(&arena, "a"), atom(&arena, "b"));
        let expr = arena.intern(Tag::And, Some(a), Some(b));
        let cnf = Cnf::convert(&arena, expr, CnfAlgorithm::Tseitin).unwrap();

        assert_eq!(cnf.vars_number(), 2);
        let va = cnf.node_to_cnf_var(a).unwrap() as usize;
        let vb = cnf.node_to_cnf_var(b).unwrap() as usize;
        // in every model of the encoding, a and b hold
        let ms = models(&cnf);
        assert!(!ms.is_empty());
        assert!(ms.iter().all(|m| m[va - 1] && m[vb - 1]));
    }

    #[test]
    fn negated_root_yields_negative_literal() {
        let arena = NodeArena::new();
        let a = atom(&arena, "a");
        let expr = arena.intern(Tag::Not, Some(a), None);
        let cnf = Cnf::convert(&arena, expr, CnfAlgorithm::Tseitin).unwrap();
        assert!(cnf.formula_literal() < 0);
        let ms = models(&cnf);
        let va = cnf.node_to_cnf_var(a).unwrap() as usize;
        assert!(ms.iter().all(|m| !m[va - 1]));
    }

    #[test]
    fn sheridan_never_adds_clauses_over_tseitin() {
        let arena = NodeArena::new();
        let (a, b, c) = (atom(&arena, "a"), atom(&arena, "b"), atom(&arena, "c"));
        let expr = arena.intern(
            Tag::Or,
            Some(arena.intern(Tag::And, Some(a), Some(b))),
            Some(c),
        );
        let full = Cnf::convert(&arena, expr, CnfAlgorithm::Tseitin).unwrap();
        let reduced = Cnf::convert(&arena, expr, CnfAlgorithm::Sheridan).unwrap();
        assert!(reduced.clauses_number() <= full.clauses_number());

        // both encodings agree on satisfiability with the same
        // projected assignments to the independent variables
        let project = |cnf: &Cnf| {
            let mut seen: Vec<Vec<bool>> = models(cnf)
                .into_iter()
                .map(|m| {
                    cnf.vars()
                        .iter()
                        .map(|&v| m[v as usize - 1])
                        .collect()
                })
                .collect();
            seen.sort();
            seen.dedup();
            seen
        };
        assert_eq!(project(&full), project(&reduced));
    }

    #[test]
    fn duplicate_literal_removal_is_idempotent() {
        let arena = NodeArena::new();
        let a = atom(&arena, "a");
        let mut cnf = Cnf::convert(&arena, a, CnfAlgorithm::Tseitin).unwrap();
        cnf.clauses.push(vec![1, 1, -1, 1]);
        cnf.remove_duplicate_literals();
        assert_eq!(cnf.clauses.last().unwrap(), &vec![1, -1]);
        cnf.remove_duplicate_literals();
        assert_eq!(cnf.clauses.last().unwrap(), &vec![1, -1]);
    }

    #[test]
    fn algorithm_names_resolve() {
        assert_eq!(CnfAlgorithm::by_name("tseitin"), Ok(CnfAlgorithm::Tseitin));
        assert_eq!(CnfAlgorithm::by_name("sheridan"), Ok(CnfAlgorithm::Sheridan));
        assert!(matches!(
            CnfAlgorithm::by_name("resolution"),
            Err(CnfError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn stats_report_counts() {
        let arena = NodeArena::new();
        let (a, b) = (atom(&arena, "a"), atom(&arena, "b"));
        let expr = arena.intern(Tag::And, Some(a), Some(b));
        let cnf = Cnf::convert(&arena, expr, CnfAlgorithm::Tseitin).unwrap();
        let mut out = Vec::new();
        cnf.print_stats(&mut out, "::").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(":: Clause number: 3"));
        assert!(text.contains(":: Var number: 2"));
        assert!(text.contains(":: Max var index: 3"));
    }
}
