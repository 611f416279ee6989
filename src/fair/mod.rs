//! Fairness constraint lists.
//!
//! Two shapes over a common base: a [`JusticeList`] holds an ordered
//! sequence of BDD state-sets that must hold infinitely often; a
//! [`CompassionList`] holds ordered pairs `(p, q)` — infinitely often
//! `p` implies infinitely often `q`.
//!
//! Every stored BDD is an owned handle; dropping a list releases all
//! of them. Iteration hands out owned references, so callers keep
//! results alive independently of the list. The synchronous product
//! concatenates the other list's contents.

use std::rc::Rc;

use crate::dd::{Bdd, DdManager};

/// Ordered justice (infinitely-often) constraints.
#[derive(Clone)]
pub struct JusticeList {
    mgr: Rc<dyn DdManager>,
    sets: Vec<Bdd>,
}

impl JusticeList {
    pub fn new(mgr: Rc<dyn DdManager>) -> Self {
        JusticeList { mgr, sets: Vec::new() }
    }

    pub fn manager(&self) -> &Rc<dyn DdManager> {
        &self.mgr
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Appends a state-set, keeping its own reference to it.
    pub fn append(&mut self, p: &Bdd) {
        self.sets.push(p.clone());
    }

    /// The set at `index`, as an owned reference.
    pub fn get(&self, index: usize) -> Option<Bdd> {
        self.sets.get(index).cloned()
    }

    /// Iterates the sets in order; each item is an owned reference.
    pub fn iter(&self) -> impl Iterator<Item = Bdd> + '_ {
        self.sets.iter().cloned()
    }

    /// Appends every constraint of `other`.
    pub fn apply_synchronous_product(&mut self, other: &JusticeList) {
        for p in other.iter() {
            self.sets.push(p);
        }
    }
}

/// Ordered compassion (strong fairness) constraints.
#[derive(Clone)]
pub struct CompassionList {
    mgr: Rc<dyn DdManager>,
    pairs: Vec<(Bdd, Bdd)>,
}

impl CompassionList {
    pub fn new(mgr: Rc<dyn DdManager>) -> Self {
        CompassionList { mgr, pairs: Vec::new() }
    }

    pub fn manager(&self) -> &Rc<dyn DdManager> {
        &self.mgr
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Appends a `(p, q)` pair, keeping its own references to both.
    pub fn append(&mut self, p: &Bdd, q: &Bdd) {
        self.pairs.push((p.clone(), q.clone()));
    }

    /// The premise of the pair at `index`, as an owned reference.
    pub fn get_p(&self, index: usize) -> Option<Bdd> {
        self.pairs.get(index).map(|(p, _)| p.clone())
    }

    /// The conclusion of the pair at `index`, as an owned reference.
    pub fn get_q(&self, index: usize) -> Option<Bdd> {
        self.pairs.get(index).map(|(_, q)| q.clone())
    }

    /// Iterates the pairs in order; each item holds owned references.
    pub fn iter(&self) -> impl Iterator<Item = (Bdd, Bdd)> + '_ {
        self.pairs.iter().map(|(p, q)| (p.clone(), q.clone()))
    }

    /// Appends every constraint of `other`.
    pub fn apply_synchronous_product(&mut self, other: &CompassionList) {
        for pair in other.iter() {
            self.pairs.push(pair);
        }
    }
}
