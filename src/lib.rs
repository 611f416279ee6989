//! # kripke-base
//!
//! Core library for symbolic model checking: expression algebra, symbol
//! resolution, NNF rewriting, and clustered BDD transition relations.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! cnf, encode  → SAT materialization, expression→BDD encoder contract
//!   ↓
//! trans, fair  → clustered transition relation, fairness constraints
//!   ↓
//! dd           → BDD manager interface, owned handles, graph dumps
//!   ↓
//! wff          → temporal formulas, negation normal form
//!   ↓
//! expr         → smart constructors, simplification, timed expressions
//!   ↓
//! symbol       → symbol classification, name resolution
//!   ↓
//! set, word    → value domains (constant sets, fixed-width words)
//!   ↓
//! node, base   → hash-consed node store, tags, failure kinds
//! ```
//!
//! The crate assumes expressions handed to it are already flattened by
//! the front end: identifiers are qualified, module instances expanded.
//! The BDD engine and the symbol table are consumed through the
//! [`dd::DdManager`] and [`symbol::SymbolView`] interfaces and are not
//! implemented here.

// ============================================================================
// MODULES (dependency order: base → node/word → set → symbol → expr → wff
//          → dd → fair/trans → cnf/encode)
// ============================================================================

/// Foundation types: parse-tree tags, failure kinds
pub mod base;

/// Hash-consed node arena and handles
pub mod node;

/// Fixed-width signed/unsigned word arithmetic
pub mod word;

/// Ordered, deduplicated constant sets
pub mod set;

/// Symbol classification interface and name resolution
pub mod symbol;

/// Expression algebra: smart constructors, simplifier, timed expressions
pub mod expr;

/// Temporal formula constructors and NNF rewriting
pub mod wff;

/// BDD manager interface, owned handles, graph dumps
pub mod dd;

/// Justice and compassion fairness constraint lists
pub mod fair;

/// Clustered transition relation and image computation
pub mod trans;

/// CNF materialization for SAT-based analyses
pub mod cnf;

/// Expression→BDD encoder contract
pub mod encode;

// Re-export foundation types
pub use base::{FailureKind, Tag};
pub use node::{NodeArena, NodeRef};
pub use word::WordValue;
