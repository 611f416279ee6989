//! Symbol classification and name resolution.
//!
//! The symbol table itself lives in the front end; this module defines
//! the query interface the core consumes ([`SymbolView`]) and the
//! resolver that turns syntactic identifier expressions into canonical
//! fully-qualified names with a classification record
//! ([`ResolvedSymbol`]).

mod resolve;
mod types;

pub use resolve::{ResolveError, ResolvedSymbol};
pub use types::SymbolType;

use crate::node::NodeRef;

/// Query interface over the front end's symbol table.
///
/// Names are canonical identifier nodes (`DOT`/`ARRAY`/`BIT` chains or
/// bare atoms) as produced by [`ResolvedSymbol::resolve`].
pub trait SymbolView {
    /// True for declared state, input, or frozen variables.
    fn is_var(&self, name: NodeRef) -> bool {
        self.is_state_var(name) || self.is_input_var(name) || self.is_frozen_var(name)
    }

    fn is_state_var(&self, name: NodeRef) -> bool;

    fn is_input_var(&self, name: NodeRef) -> bool;

    /// True for variables declared once and never changing.
    fn is_frozen_var(&self, name: NodeRef) -> bool;

    fn is_define(&self, name: NodeRef) -> bool;

    fn is_array_define(&self, name: NodeRef) -> bool;

    fn is_variable_array(&self, name: NodeRef) -> bool;

    /// True for module formal parameters.
    fn is_parameter(&self, name: NodeRef) -> bool;

    /// True for declared (global-scope) constants.
    fn is_constant(&self, name: NodeRef) -> bool;

    /// True for uninterpreted functions.
    fn is_function(&self, name: NodeRef) -> bool;

    /// True when the name is declared in any of the above roles.
    fn is_declared(&self, name: NodeRef) -> bool {
        self.is_var(name)
            || self.is_define(name)
            || self.is_array_define(name)
            || self.is_variable_array(name)
            || self.is_parameter(name)
            || self.is_constant(name)
            || self.is_function(name)
    }

    /// The unflattened actual argument bound to a module parameter.
    fn actual_parameter(&self, name: NodeRef) -> Option<NodeRef>;

    /// The flattened actual argument bound to a module parameter.
    fn flatten_actual_parameter(&self, name: NodeRef) -> Option<NodeRef>;

    /// Declared type of a variable.
    fn var_type(&self, name: NodeRef) -> Option<SymbolType>;

    /// Type of an arbitrary (flattened) expression. This is the
    /// type-checker surface; implementations may memoize.
    fn expression_type(&self, expr: NodeRef) -> SymbolType;
}
