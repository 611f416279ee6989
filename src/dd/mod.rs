//! Decision-diagram manager interface.
//!
//! The BDD engine is an external collaborator: the core drives it
//! through the [`DdManager`] trait and never looks inside. Raw node
//! handles ([`DdNodeId`]) carry explicit reference counts at the
//! engine's side; the owned wrappers [`Bdd`] and [`Add`] turn that
//! protocol into RAII — clone references, drop releases.
//!
//! Ownership rule at every boundary: a function *returning* a handle
//! transfers one reference to the caller; a function *accepting* a
//! handle borrows it.

mod dump;
mod handle;

pub use dump::{dump_blif, dump_blif_body, dump_davinci, dump_dot};
pub use handle::{Add, Bdd};

use thiserror::Error;

/// Raw decision-diagram node handle. Meaning is private to the engine;
/// equality of ids is equality of (canonical) functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DdNodeId(pub u64);

/// Variable-block handle returned by [`DdManager::var_block_new`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DdBlockId(pub u64);

/// Engine failures. Out-of-memory and reordering faults surface as a
/// null result inside the engine wrapper; the core treats them as
/// fatal.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DdError {
    #[error("decision-diagram manager failure")]
    ManagerFailure,

    #[error("invalid variable index {0}")]
    InvalidVariable(u32),

    #[error("reordering failed")]
    ReorderFailure,
}

/// Dynamic-reordering methods accepted by [`DdManager::reduce_heap`]
/// and [`DdManager::autodyn_enable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReorderMethod {
    /// Repeat whatever method ran last.
    Same,
    Sift,
    SiftConverge,
    SymmetrySift,
    SymmetrySiftConverge,
    Window2,
    Window3,
    Window4,
    Window2Converge,
    Window3Converge,
    Window4Converge,
    Annealing,
    Genetic,
    Exact,
    Linear,
    LinearConverge,
}

impl ReorderMethod {
    /// Parses the established method names used in configuration.
    /// Unknown names yield `None`; callers log and ignore them.
    pub fn by_name(name: &str) -> Option<ReorderMethod> {
        let method = match name {
            "same" => ReorderMethod::Same,
            "sift" => ReorderMethod::Sift,
            "sift_converge" => ReorderMethod::SiftConverge,
            "symmetry_sift" => ReorderMethod::SymmetrySift,
            "symmetry_sift_converge" => ReorderMethod::SymmetrySiftConverge,
            "window2" => ReorderMethod::Window2,
            "window3" => ReorderMethod::Window3,
            "window4" => ReorderMethod::Window4,
            "window2_converge" => ReorderMethod::Window2Converge,
            "window3_converge" => ReorderMethod::Window3Converge,
            "window4_converge" => ReorderMethod::Window4Converge,
            "annealing" => ReorderMethod::Annealing,
            "genetic" => ReorderMethod::Genetic,
            "exact" => ReorderMethod::Exact,
            "linear" => ReorderMethod::Linear,
            "linear_converge" => ReorderMethod::LinearConverge,
            _ => return None,
        };
        Some(method)
    }
}

/// The operations the core requires of a BDD engine.
///
/// All node-returning operations yield a *referenced* node; callers
/// release it (usually by wrapping it into a [`Bdd`]/[`Add`]
/// immediately). Inputs are borrowed.
pub trait DdManager {
    // ------------------------------------------------------------------
    // Reference counting
    // ------------------------------------------------------------------

    /// Adds one reference to a node.
    fn ref_node(&self, n: DdNodeId);

    /// Drops one reference from a node, non-recursively.
    fn deref_node(&self, n: DdNodeId);

    /// Drops one reference from a node and, transitively, from its
    /// descendants that become unreferenced.
    fn recursive_deref_node(&self, n: DdNodeId);

    // ------------------------------------------------------------------
    // Constants and variables
    // ------------------------------------------------------------------

    /// The constant true function (referenced).
    fn one(&self) -> DdNodeId;

    /// The constant false function (referenced).
    fn zero(&self) -> DdNodeId;

    /// True when `f` is the constant true function.
    fn is_one(&self, f: DdNodeId) -> bool {
        let one = self.one();
        let res = f == one;
        self.recursive_deref_node(one);
        res
    }

    /// True when `f` is the constant false function.
    fn is_zero(&self, f: DdNodeId) -> bool {
        let zero = self.zero();
        let res = f == zero;
        self.recursive_deref_node(zero);
        res
    }

    /// Number of variables currently known to the manager.
    fn num_vars(&self) -> u32;

    /// The projection function of variable `index`, creating it if
    /// needed (referenced).
    fn new_var_with_index(&self, index: u32) -> Result<DdNodeId, DdError>;

    /// A fresh variable placed at `level` in the current order
    /// (referenced).
    fn new_var_at_level(&self, level: u32) -> Result<DdNodeId, DdError>;

    // ------------------------------------------------------------------
    // Boolean connectives (all results referenced)
    // ------------------------------------------------------------------

    fn not(&self, f: DdNodeId) -> Result<DdNodeId, DdError>;

    fn and(&self, f: DdNodeId, g: DdNodeId) -> Result<DdNodeId, DdError>;

    fn or(&self, f: DdNodeId, g: DdNodeId) -> Result<DdNodeId, DdError>;

    fn xor(&self, f: DdNodeId, g: DdNodeId) -> Result<DdNodeId, DdError>;

    fn xnor(&self, f: DdNodeId, g: DdNodeId) -> Result<DdNodeId, DdError>;

    fn iff(&self, f: DdNodeId, g: DdNodeId) -> Result<DdNodeId, DdError> {
        self.xnor(f, g)
    }

    fn implies(&self, f: DdNodeId, g: DdNodeId) -> Result<DdNodeId, DdError>;

    fn ite(&self, i: DdNodeId, t: DdNodeId, e: DdNodeId) -> Result<DdNodeId, DdError>;

    // ------------------------------------------------------------------
    // Abstraction and generalized cofactors
    // ------------------------------------------------------------------

    /// Existential abstraction of the variables in `cube`.
    fn exists(&self, f: DdNodeId, cube: DdNodeId) -> Result<DdNodeId, DdError>;

    /// Universal abstraction of the variables in `cube`.
    fn forall(&self, f: DdNodeId, cube: DdNodeId) -> Result<DdNodeId, DdError>;

    /// `∃ cube. f ∧ g` in one pass.
    fn and_abstract(
        &self,
        f: DdNodeId,
        g: DdNodeId,
        cube: DdNodeId,
    ) -> Result<DdNodeId, DdError>;

    /// Coudert–Madre restrict of `f` with care set `c`.
    fn restrict(&self, f: DdNodeId, c: DdNodeId) -> Result<DdNodeId, DdError>;

    /// The `constrain` generalized cofactor.
    fn constrain(&self, f: DdNodeId, c: DdNodeId) -> Result<DdNodeId, DdError>;

    /// True when `f` implies `g`.
    fn leq(&self, f: DdNodeId, g: DdNodeId) -> bool;

    // ------------------------------------------------------------------
    // Support and cube arithmetic
    // ------------------------------------------------------------------

    /// The support of `f`, as a positive cube (referenced).
    fn support(&self, f: DdNodeId) -> Result<DdNodeId, DdError>;

    /// Variables of `a` that are not in `b` (both cubes).
    fn cube_diff(&self, a: DdNodeId, b: DdNodeId) -> Result<DdNodeId, DdError>;

    /// Variables common to the cubes `a` and `b`.
    fn cube_intersection(&self, a: DdNodeId, b: DdNodeId) -> Result<DdNodeId, DdError>;

    /// Union of the cubes `a` and `b`.
    fn cube_union(&self, a: DdNodeId, b: DdNodeId) -> Result<DdNodeId, DdError> {
        self.and(a, b)
    }

    // ------------------------------------------------------------------
    // Structure, sizes, primes
    // ------------------------------------------------------------------

    /// Permutes variables; `permutation[i]` is the new index of
    /// variable `i`.
    fn permute(&self, f: DdNodeId, permutation: &[u32]) -> Result<DdNodeId, DdError>;

    /// Swaps the two variable sets in `f`.
    fn swap_variables(
        &self,
        f: DdNodeId,
        xs: &[DdNodeId],
        ys: &[DdNodeId],
    ) -> Result<DdNodeId, DdError>;

    /// A prime implicant of `f` containing the minterm cube `m`.
    fn make_prime(&self, f: DdNodeId, m: DdNodeId) -> Result<DdNodeId, DdError>;

    /// A largest cube (shortest clause) of `f`.
    fn largest_cube(&self, f: DdNodeId) -> Result<DdNodeId, DdError>;

    /// The cube of essential variables of `f`.
    fn find_essential(&self, f: DdNodeId) -> Result<DdNodeId, DdError>;

    /// Number of minterms of `f` over `nvars` variables.
    fn count_minterm(&self, f: DdNodeId, nvars: u32) -> f64;

    /// Number of nodes in the DAG rooted at `f`.
    fn dag_size(&self, f: DdNodeId) -> usize;

    /// Lowest (top-most in the order) variable index in `f`'s support;
    /// `None` for constants.
    fn lowest_index(&self, f: DdNodeId) -> Option<u32>;

    // ------------------------------------------------------------------
    // Structural access (dump writers, engine doubles)
    // ------------------------------------------------------------------

    /// True for the terminal nodes.
    fn is_constant(&self, f: DdNodeId) -> bool;

    /// Decision variable of an internal node.
    fn node_var(&self, f: DdNodeId) -> Option<u32>;

    /// Then-child (referenced).
    fn node_then(&self, f: DdNodeId) -> Result<DdNodeId, DdError>;

    /// Else-child (referenced).
    fn node_else(&self, f: DdNodeId) -> Result<DdNodeId, DdError>;

    /// True when the edge to `f` is a complement edge. Engines without
    /// complement edges return false.
    fn is_complement(&self, f: DdNodeId) -> bool;

    // ------------------------------------------------------------------
    // ADD subset (k-bounded image computation)
    // ------------------------------------------------------------------

    /// Casts a BDD to a 0/1 ADD (referenced).
    fn bdd_to_01_add(&self, f: DdNodeId) -> Result<DdNodeId, DdError>;

    /// Casts an ADD back to a BDD: nonzero leaves become true.
    fn add_to_bdd(&self, f: DdNodeId) -> Result<DdNodeId, DdError>;

    /// Pointwise product of two ADDs.
    fn add_times(&self, f: DdNodeId, g: DdNodeId) -> Result<DdNodeId, DdError>;

    /// Abstraction by addition over the variables of `cube`.
    fn add_exists_sum(&self, f: DdNodeId, cube: DdNodeId) -> Result<DdNodeId, DdError>;

    /// BDD of the inputs whose ADD value is strictly greater than `k`.
    fn add_strict_threshold(&self, f: DdNodeId, k: i64) -> Result<DdNodeId, DdError>;

    // ------------------------------------------------------------------
    // Reordering
    // ------------------------------------------------------------------

    /// Enables dynamic reordering with the given method.
    fn autodyn_enable(&self, method: ReorderMethod);

    /// Disables dynamic reordering.
    fn autodyn_disable(&self);

    /// Currently enabled dynamic-reordering method, if any.
    fn reordering_status(&self) -> Option<ReorderMethod>;

    /// Runs one reordering pass; `minsize` gates the invocation.
    fn reduce_heap(&self, method: ReorderMethod, minsize: usize) -> Result<(), DdError>;

    /// Imposes the given variable order (a permutation of indices).
    fn shuffle_heap(&self, order: &[u32]) -> Result<(), DdError>;

    /// Declares a reordering-atomic block of `size` variables starting
    /// at index `low`.
    fn var_block_new(&self, low: u32, size: u32) -> Result<DdBlockId, DdError>;

    /// Dissolves a variable block.
    fn var_block_free(&self, block: DdBlockId) -> Result<(), DdError>;
}
