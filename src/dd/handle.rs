//! Owned decision-diagram handles.
//!
//! [`Bdd`] and [`Add`] wrap a raw node id together with its manager.
//! Construction takes over one engine reference; cloning adds one;
//! dropping releases one recursively. Containers of handles therefore
//! release everything they hold when destroyed, matching the
//! borrow/transfer contract in [`crate::dd`].

use std::fmt;
use std::rc::Rc;

use crate::dd::{DdError, DdManager, DdNodeId};

/// Owned BDD handle.
pub struct Bdd {
    mgr: Rc<dyn DdManager>,
    id: DdNodeId,
}

impl Bdd {
    /// Wraps a referenced node, taking ownership of one reference.
    pub fn from_referenced(mgr: Rc<dyn DdManager>, id: DdNodeId) -> Self {
        Bdd { mgr, id }
    }

    /// The constant true function.
    pub fn one(mgr: &Rc<dyn DdManager>) -> Self {
        let id = mgr.one();
        Bdd::from_referenced(Rc::clone(mgr), id)
    }

    /// The constant false function.
    pub fn zero(mgr: &Rc<dyn DdManager>) -> Self {
        let id = mgr.zero();
        Bdd::from_referenced(Rc::clone(mgr), id)
    }

    pub fn id(&self) -> DdNodeId {
        self.id
    }

    pub fn manager(&self) -> &Rc<dyn DdManager> {
        &self.mgr
    }

    pub fn is_one(&self) -> bool {
        self.mgr.is_one(self.id)
    }

    pub fn is_zero(&self) -> bool {
        self.mgr.is_zero(self.id)
    }

    fn lift(&self, id: DdNodeId) -> Bdd {
        Bdd::from_referenced(Rc::clone(&self.mgr), id)
    }

    pub fn not(&self) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.not(self.id)?))
    }

    pub fn and(&self, other: &Bdd) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.and(self.id, other.id)?))
    }

    pub fn or(&self, other: &Bdd) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.or(self.id, other.id)?))
    }

    pub fn xor(&self, other: &Bdd) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.xor(self.id, other.id)?))
    }

    pub fn xnor(&self, other: &Bdd) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.xnor(self.id, other.id)?))
    }

    pub fn implies(&self, other: &Bdd) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.implies(self.id, other.id)?))
    }

    pub fn ite(&self, t: &Bdd, e: &Bdd) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.ite(self.id, t.id, e.id)?))
    }

    /// Conjoins `other` into `self` in place.
    pub fn and_assign(&mut self, other: &Bdd) -> Result<(), DdError> {
        *self = self.and(other)?;
        Ok(())
    }

    /// Disjoins `other` into `self` in place.
    pub fn or_assign(&mut self, other: &Bdd) -> Result<(), DdError> {
        *self = self.or(other)?;
        Ok(())
    }

    pub fn exists(&self, cube: &Bdd) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.exists(self.id, cube.id)?))
    }

    pub fn forall(&self, cube: &Bdd) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.forall(self.id, cube.id)?))
    }

    /// `∃ cube. self ∧ other` without building the conjunction.
    pub fn and_abstract(&self, other: &Bdd, cube: &Bdd) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.and_abstract(self.id, other.id, cube.id)?))
    }

    pub fn restrict(&self, care: &Bdd) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.restrict(self.id, care.id)?))
    }

    pub fn constrain(&self, care: &Bdd) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.constrain(self.id, care.id)?))
    }

    /// True when `self` implies `other`.
    pub fn leq(&self, other: &Bdd) -> bool {
        self.mgr.leq(self.id, other.id)
    }

    /// Support as a positive cube.
    pub fn support(&self) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.support(self.id)?))
    }

    pub fn cube_diff(&self, other: &Bdd) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.cube_diff(self.id, other.id)?))
    }

    pub fn cube_intersection(&self, other: &Bdd) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.cube_intersection(self.id, other.id)?))
    }

    pub fn cube_union(&self, other: &Bdd) -> Result<Bdd, DdError> {
        Ok(self.lift(self.mgr.cube_union(self.id, other.id)?))
    }

    pub fn count_minterm(&self, nvars: u32) -> f64 {
        self.mgr.count_minterm(self.id, nvars)
    }

    /// DAG size in nodes.
    pub fn size(&self) -> usize {
        self.mgr.dag_size(self.id)
    }

    /// Top-most variable index in the support.
    pub fn lowest_index(&self) -> Option<u32> {
        self.mgr.lowest_index(self.id)
    }

    /// Casts to a 0/1 ADD.
    pub fn to_01_add(&self) -> Result<Add, DdError> {
        Ok(Add::from_referenced(
            Rc::clone(&self.mgr),
            self.mgr.bdd_to_01_add(self.id)?,
        ))
    }
}

impl Clone for Bdd {
    fn clone(&self) -> Self {
        self.mgr.ref_node(self.id);
        Bdd { mgr: Rc::clone(&self.mgr), id: self.id }
    }
}

impl Drop for Bdd {
    fn drop(&mut self) {
        self.mgr.recursive_deref_node(self.id);
    }
}

impl PartialEq for Bdd {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.mgr, &other.mgr) && self.id == other.id
    }
}

impl Eq for Bdd {}

impl fmt::Debug for Bdd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bdd({:#x}, {} nodes)", self.id.0, self.size())
    }
}

/// Owned ADD handle.
pub struct Add {
    mgr: Rc<dyn DdManager>,
    id: DdNodeId,
}

impl Add {
    /// Wraps a referenced node, taking ownership of one reference.
    pub fn from_referenced(mgr: Rc<dyn DdManager>, id: DdNodeId) -> Self {
        Add { mgr, id }
    }

    pub fn id(&self) -> DdNodeId {
        self.id
    }

    /// Pointwise product.
    pub fn times(&self, other: &Add) -> Result<Add, DdError> {
        Ok(Add::from_referenced(
            Rc::clone(&self.mgr),
            self.mgr.add_times(self.id, other.id)?,
        ))
    }

    /// Abstraction by addition over the variables of `cube`.
    pub fn exists_sum(&self, cube: &Bdd) -> Result<Add, DdError> {
        Ok(Add::from_referenced(
            Rc::clone(&self.mgr),
            self.mgr.add_exists_sum(self.id, cube.id())?,
        ))
    }

    /// BDD of the inputs valued strictly above `k`.
    pub fn strict_threshold(&self, k: i64) -> Result<Bdd, DdError> {
        Ok(Bdd::from_referenced(
            Rc::clone(&self.mgr),
            self.mgr.add_strict_threshold(self.id, k)?,
        ))
    }

    /// Back to a BDD; nonzero leaves become true.
    pub fn to_bdd(&self) -> Result<Bdd, DdError> {
        Ok(Bdd::from_referenced(
            Rc::clone(&self.mgr),
            self.mgr.add_to_bdd(self.id)?,
        ))
    }

    pub fn size(&self) -> usize {
        self.mgr.dag_size(self.id)
    }
}

impl Clone for Add {
    fn clone(&self) -> Self {
        self.mgr.ref_node(self.id);
        Add { mgr: Rc::clone(&self.mgr), id: self.id }
    }
}

impl Drop for Add {
    fn drop(&mut self) {
        self.mgr.recursive_deref_node(self.id);
    }
}

impl PartialEq for Add {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.mgr, &other.mgr) && self.id == other.id
    }
}

impl Eq for Add {}
