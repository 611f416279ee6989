//! A sub-relation with its early-quantification cubes.

use crate::dd::{Bdd, DdError};

/// One conjunct of the transition relation.
///
/// Besides the sub-relation itself, a cluster carries the two cubes
/// that image computation abstracts immediately after conjoining it:
/// `quant_state` holds the state variables, `quant_state_input` the
/// state and input variables (a superset). Until a schedule is built
/// both cubes are the empty (true) cube.
///
/// Clusters are owned by exactly one list at a time; cloning
/// deep-copies the record, with every held BDD re-referenced.
#[derive(Clone)]
pub struct Cluster {
    trans: Bdd,
    quant_state: Bdd,
    quant_state_input: Bdd,
}

impl Cluster {
    /// Wraps a sub-relation with empty quantification cubes.
    pub fn new(trans: Bdd) -> Self {
        let one = Bdd::one(trans.manager());
        Cluster { trans, quant_state: one.clone(), quant_state_input: one }
    }

    /// The sub-relation (an owned reference).
    pub fn trans(&self) -> Bdd {
        self.trans.clone()
    }

    /// Replaces the sub-relation.
    pub fn set_trans(&mut self, trans: Bdd) {
        self.trans = trans;
    }

    /// State-variable cube abstracted right after this cluster.
    pub fn quant_state(&self) -> Bdd {
        self.quant_state.clone()
    }

    pub fn set_quant_state(&mut self, cube: Bdd) {
        self.quant_state = cube;
    }

    /// State-and-input cube abstracted right after this cluster.
    pub fn quant_state_input(&self) -> Bdd {
        self.quant_state_input.clone()
    }

    pub fn set_quant_state_input(&mut self, cube: Bdd) {
        self.quant_state_input = cube;
    }

    /// Cluster equality is identity of the sub-relation BDD.
    pub fn is_equal(&self, other: &Cluster) -> bool {
        self.trans == other.trans
    }

    /// DAG size of the sub-relation.
    pub fn size(&self) -> usize {
        self.trans.size()
    }

    /// Support cube of the sub-relation.
    pub fn support(&self) -> Result<Bdd, DdError> {
        self.trans.support()
    }
}
