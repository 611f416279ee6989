//! Expression→BDD encoder contract.
//!
//! Lifting expressions into BDDs (boolean encoding of scalar
//! variables, word blasting, variable grouping) lives in the encoding
//! layer of the front end. The core consumes it through
//! [`BoolEncoder`]; only the shape matters here.

use thiserror::Error;

use crate::dd::{Bdd, DdError};
use crate::node::{NodeArena, NodeRef};
use crate::symbol::SymbolView;

/// Encoding failures. Infinite-precision variables are detected up
/// front, before any boolean transition relation is built.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("variable \"{0}\" has infinite-precision type and cannot be booleanized")]
    InfinitePrecision(String),

    #[error("expression cannot be encoded: {0}")]
    Unencodable(String),

    #[error(transparent)]
    Dd(#[from] DdError),
}

/// The contract used by higher-level code to lift expressions into
/// BDDs.
///
/// Every returned BDD is an owned handle; the encoder keeps no claim
/// on it. Cube accessors expose the variable groups the encoder
/// allocated.
pub trait BoolEncoder {
    /// Lifts a flattened boolean expression into a BDD.
    fn expr_to_bdd(&self, expr: NodeRef) -> Result<Bdd, EncodeError>;

    /// Cube of the current-state variables.
    fn state_cube(&self) -> Bdd;

    /// Cube of the input variables.
    fn input_cube(&self) -> Bdd;

    /// Cube of the next-state variables.
    fn next_state_cube(&self) -> Bdd;
}

/// Rejects variables whose declared type has no finite boolean
/// encoding. Run before building a boolean FSM; the first offending
/// variable aborts.
pub fn reject_infinite_precision<I>(
    view: &dyn SymbolView,
    arena: &NodeArena,
    vars: I,
) -> Result<(), EncodeError>
where
    I: IntoIterator<Item = NodeRef>,
{
    for var in vars {
        if let Some(ty) = view.var_type(var) {
            if ty.is_infinite_precision() {
                return Err(EncodeError::InfinitePrecision(arena.display_name(var)));
            }
        }
    }
    Ok(())
}
