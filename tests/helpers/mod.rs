//! Shared test helpers: a truth-table-backed decision-diagram engine
//! double and small construction conveniences.
//!
//! The double stores every function as its full truth table over a
//! fixed set of variables (so it only scales to a dozen variables,
//! plenty for tests), canonicalized through an interning map — id
//! equality is function equality, like a real BDD engine. Reference
//! counts are tracked so tests can assert that containers release
//! everything they hold.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use kripke::dd::{Bdd, DdBlockId, DdError, DdManager, DdNodeId, ReorderMethod};

#[derive(Clone, PartialEq, Eq, Hash)]
enum Func {
    /// Characteristic bitset over the 2^n minterms.
    Bool(Vec<u64>),
    /// Integer value per minterm (ADD).
    Num(Vec<i64>),
}

struct Inner {
    nvars: u32,
    funcs: Vec<Func>,
    index: HashMap<Func, DdNodeId>,
    refs: Vec<i64>,
}

/// Truth-table decision-diagram engine for tests.
pub struct TableManager {
    inner: RefCell<Inner>,
}

impl TableManager {
    /// A manager over `nvars` boolean variables (at most 12).
    pub fn new(nvars: u32) -> Rc<TableManager> {
        assert!(nvars <= 12, "truth-table double only scales to 12 vars");
        Rc::new(TableManager {
            inner: RefCell::new(Inner {
                nvars,
                funcs: Vec::new(),
                index: HashMap::new(),
                refs: Vec::new(),
            }),
        })
    }

    /// Sum of all outstanding references; use to check for leaks.
    pub fn total_refs(&self) -> i64 {
        self.inner.borrow().refs.iter().sum()
    }

    fn minterms(&self) -> usize {
        1usize << self.inner.borrow().nvars
    }

    fn words(&self) -> usize {
        self.minterms().div_ceil(64)
    }

    fn tail_mask(&self) -> u64 {
        let rem = self.minterms() % 64;
        if rem == 0 { u64::MAX } else { (1u64 << rem) - 1 }
    }

    fn intern(&self, func: Func) -> DdNodeId {
        let mut inner = self.inner.borrow_mut();
        if let Some(&id) = inner.index.get(&func) {
            inner.refs[id.0 as usize] += 1;
            return id;
        }
        let id = DdNodeId(inner.funcs.len() as u64);
        inner.funcs.push(func.clone());
        inner.index.insert(func, id);
        inner.refs.push(1);
        id
    }

    fn bool_table(&self, id: DdNodeId) -> Vec<u64> {
        match &self.inner.borrow().funcs[id.0 as usize] {
            Func::Bool(t) => t.clone(),
            Func::Num(_) => unreachable!("expected a BDD, found an ADD"),
        }
    }

    fn num_table(&self, id: DdNodeId) -> Vec<i64> {
        match &self.inner.borrow().funcs[id.0 as usize] {
            Func::Num(t) => t.clone(),
            Func::Bool(_) => unreachable!("expected an ADD, found a BDD"),
        }
    }

    fn intern_bool(&self, mut t: Vec<u64>) -> DdNodeId {
        let mask = self.tail_mask();
        if let Some(last) = t.last_mut() {
            *last &= mask;
        }
        self.intern(Func::Bool(t))
    }

    fn bit(t: &[u64], i: usize) -> bool {
        t[i / 64] >> (i % 64) & 1 == 1
    }

    fn set_bit(t: &mut [u64], i: usize) {
        t[i / 64] |= 1 << (i % 64);
    }

    fn const_table(&self, value: bool) -> Vec<u64> {
        let mut t = vec![if value { u64::MAX } else { 0 }; self.words()];
        if value {
            if let Some(last) = t.last_mut() {
                *last &= self.tail_mask();
            }
        }
        t
    }

    fn var_table(&self, var: u32) -> Vec<u64> {
        let mut t = vec![0u64; self.words()];
        for i in 0..self.minterms() {
            if i >> var & 1 == 1 {
                Self::set_bit(&mut t, i);
            }
        }
        t
    }

    /// Cofactor with variable `var` fixed to `value`.
    fn cofactor(&self, t: &[u64], var: u32, value: bool) -> Vec<u64> {
        let mut out = vec![0u64; t.len()];
        for i in 0..self.minterms() {
            let j = if value { i | (1 << var) } else { i & !(1 << var) };
            if Self::bit(t, j) {
                Self::set_bit(&mut out, i);
            }
        }
        out
    }

    fn support_vars_of(&self, t: &[u64]) -> Vec<u32> {
        let nvars = self.inner.borrow().nvars;
        (0..nvars)
            .filter(|&v| self.cofactor(t, v, false) != self.cofactor(t, v, true))
            .collect()
    }

    fn cube_of_vars(&self, vars: &[u32]) -> Vec<u64> {
        let mut t = self.const_table(true);
        for &v in vars {
            let vt = self.var_table(v);
            for (w, vw) in t.iter_mut().zip(vt.iter()) {
                *w &= vw;
            }
        }
        t
    }

    fn is_empty_table(t: &[u64]) -> bool {
        t.iter().all(|&w| w == 0)
    }

    /// ROBDD node count under the natural variable order.
    fn robdd_size(&self, t: &[u64]) -> usize {
        let mut seen: HashSet<Vec<u64>> = HashSet::new();
        let mut terminals: HashSet<bool> = HashSet::new();
        self.robdd_walk(t.to_vec(), &mut seen, &mut terminals);
        seen.len() + terminals.len()
    }

    fn robdd_walk(
        &self,
        t: Vec<u64>,
        seen: &mut HashSet<Vec<u64>>,
        terminals: &mut HashSet<bool>,
    ) {
        let support = self.support_vars_of(&t);
        match support.first() {
            None => {
                terminals.insert(!Self::is_empty_table(&t));
            }
            Some(&v) => {
                if seen.insert(t.clone()) {
                    self.robdd_walk(self.cofactor(&t, v, false), seen, terminals);
                    self.robdd_walk(self.cofactor(&t, v, true), seen, terminals);
                }
            }
        }
    }

    fn binop(&self, a: DdNodeId, b: DdNodeId, f: impl Fn(u64, u64) -> u64) -> DdNodeId {
        let (ta, tb) = (self.bool_table(a), self.bool_table(b));
        let t: Vec<u64> = ta.iter().zip(tb.iter()).map(|(&x, &y)| f(x, y)).collect();
        self.intern_bool(t)
    }
}

impl DdManager for TableManager {
    fn ref_node(&self, n: DdNodeId) {
        self.inner.borrow_mut().refs[n.0 as usize] += 1;
    }

    fn deref_node(&self, n: DdNodeId) {
        self.inner.borrow_mut().refs[n.0 as usize] -= 1;
    }

    fn recursive_deref_node(&self, n: DdNodeId) {
        self.deref_node(n);
    }

    fn one(&self) -> DdNodeId {
        let t = self.const_table(true);
        self.intern_bool(t)
    }

    fn zero(&self) -> DdNodeId {
        let t = self.const_table(false);
        self.intern_bool(t)
    }

    fn num_vars(&self) -> u32 {
        self.inner.borrow().nvars
    }

    fn new_var_with_index(&self, index: u32) -> Result<DdNodeId, DdError> {
        if index >= self.num_vars() {
            return Err(DdError::InvalidVariable(index));
        }
        let t = self.var_table(index);
        Ok(self.intern_bool(t))
    }

    fn new_var_at_level(&self, level: u32) -> Result<DdNodeId, DdError> {
        self.new_var_with_index(level)
    }

    fn not(&self, f: DdNodeId) -> Result<DdNodeId, DdError> {
        let t: Vec<u64> = self.bool_table(f).iter().map(|&w| !w).collect();
        Ok(self.intern_bool(t))
    }

    fn and(&self, f: DdNodeId, g: DdNodeId) -> Result<DdNodeId, DdError> {
        Ok(self.binop(f, g, |a, b| a & b))
    }

    fn or(&self, f: DdNodeId, g: DdNodeId) -> Result<DdNodeId, DdError> {
        Ok(self.binop(f, g, |a, b| a | b))
    }

    fn xor(&self, f: DdNodeId, g: DdNodeId) -> Result<DdNodeId, DdError> {
        Ok(self.binop(f, g, |a, b| a ^ b))
    }

    fn xnor(&self, f: DdNodeId, g: DdNodeId) -> Result<DdNodeId, DdError> {
        Ok(self.binop(f, g, |a, b| !(a ^ b)))
    }

    fn implies(&self, f: DdNodeId, g: DdNodeId) -> Result<DdNodeId, DdError> {
        Ok(self.binop(f, g, |a, b| !a | b))
    }

    fn ite(&self, i: DdNodeId, t: DdNodeId, e: DdNodeId) -> Result<DdNodeId, DdError> {
        let (ti, tt, te) = (self.bool_table(i), self.bool_table(t), self.bool_table(e));
        let out: Vec<u64> = ti
            .iter()
            .zip(tt.iter().zip(te.iter()))
            .map(|(&c, (&a, &b))| (c & a) | (!c & b))
            .collect();
        Ok(self.intern_bool(out))
    }

    fn exists(&self, f: DdNodeId, cube: DdNodeId) -> Result<DdNodeId, DdError> {
        let cube_t = self.bool_table(cube);
        let mut t = self.bool_table(f);
        for v in self.support_vars_of(&cube_t) {
            let lo = self.cofactor(&t, v, false);
            let hi = self.cofactor(&t, v, true);
            t = lo.iter().zip(hi.iter()).map(|(&a, &b)| a | b).collect();
        }
        Ok(self.intern_bool(t))
    }

    fn forall(&self, f: DdNodeId, cube: DdNodeId) -> Result<DdNodeId, DdError> {
        let cube_t = self.bool_table(cube);
        let mut t = self.bool_table(f);
        for v in self.support_vars_of(&cube_t) {
            let lo = self.cofactor(&t, v, false);
            let hi = self.cofactor(&t, v, true);
            t = lo.iter().zip(hi.iter()).map(|(&a, &b)| a & b).collect();
        }
        Ok(self.intern_bool(t))
    }

    fn and_abstract(
        &self,
        f: DdNodeId,
        g: DdNodeId,
        cube: DdNodeId,
    ) -> Result<DdNodeId, DdError> {
        let conj = self.and(f, g)?;
        let res = self.exists(conj, cube)?;
        self.recursive_deref_node(conj);
        Ok(res)
    }

    // a valid (non-minimizing) restrict: agrees with f on the care set
    fn restrict(&self, f: DdNodeId, _c: DdNodeId) -> Result<DdNodeId, DdError> {
        self.ref_node(f);
        Ok(f)
    }

    fn constrain(&self, f: DdNodeId, _c: DdNodeId) -> Result<DdNodeId, DdError> {
        self.ref_node(f);
        Ok(f)
    }

    fn leq(&self, f: DdNodeId, g: DdNodeId) -> bool {
        let (tf, tg) = (self.bool_table(f), self.bool_table(g));
        tf.iter().zip(tg.iter()).all(|(&a, &b)| a & !b == 0)
    }

    fn support(&self, f: DdNodeId) -> Result<DdNodeId, DdError> {
        let vars = self.support_vars_of(&self.bool_table(f));
        let t = self.cube_of_vars(&vars);
        Ok(self.intern_bool(t))
    }

    fn cube_diff(&self, a: DdNodeId, b: DdNodeId) -> Result<DdNodeId, DdError> {
        let va = self.support_vars_of(&self.bool_table(a));
        let vb = self.support_vars_of(&self.bool_table(b));
        let vars: Vec<u32> = va.into_iter().filter(|v| !vb.contains(v)).collect();
        let t = self.cube_of_vars(&vars);
        Ok(self.intern_bool(t))
    }

    fn cube_intersection(&self, a: DdNodeId, b: DdNodeId) -> Result<DdNodeId, DdError> {
        let va = self.support_vars_of(&self.bool_table(a));
        let vb = self.support_vars_of(&self.bool_table(b));
        let vars: Vec<u32> = va.into_iter().filter(|v| vb.contains(v)).collect();
        let t = self.cube_of_vars(&vars);
        Ok(self.intern_bool(t))
    }

    fn permute(&self, f: DdNodeId, permutation: &[u32]) -> Result<DdNodeId, DdError> {
        let t = self.bool_table(f);
        let nvars = self.num_vars();
        let mut out = vec![0u64; t.len()];
        for i in 0..self.minterms() {
            if Self::bit(&t, i) {
                let mut j = 0usize;
                for v in 0..nvars {
                    if i >> v & 1 == 1 {
                        let target = permutation.get(v as usize).copied().unwrap_or(v);
                        j |= 1 << target;
                    }
                }
                Self::set_bit(&mut out, j);
            }
        }
        Ok(self.intern_bool(out))
    }

    fn swap_variables(
        &self,
        f: DdNodeId,
        xs: &[DdNodeId],
        ys: &[DdNodeId],
    ) -> Result<DdNodeId, DdError> {
        let mut permutation: Vec<u32> = (0..self.num_vars()).collect();
        for (x, y) in xs.iter().zip(ys.iter()) {
            let vx = self.lowest_index(*x).ok_or(DdError::ManagerFailure)?;
            let vy = self.lowest_index(*y).ok_or(DdError::ManagerFailure)?;
            permutation[vx as usize] = vy;
            permutation[vy as usize] = vx;
        }
        self.permute(f, &permutation)
    }

    fn make_prime(&self, f: DdNodeId, m: DdNodeId) -> Result<DdNodeId, DdError> {
        // greedily drop literals from m while it remains an implicant
        let tf = self.bool_table(f);
        let mut cube = self.bool_table(m);
        loop {
            let mut changed = false;
            for v in self.support_vars_of(&cube.clone()) {
                let lo = self.cofactor(&cube, v, false);
                let hi = self.cofactor(&cube, v, true);
                let widened: Vec<u64> = lo.iter().zip(hi.iter()).map(|(&a, &b)| a | b).collect();
                let implicant = widened.iter().zip(tf.iter()).all(|(&a, &b)| a & !b == 0);
                if implicant {
                    cube = widened;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        Ok(self.intern_bool(cube))
    }

    fn largest_cube(&self, f: DdNodeId) -> Result<DdNodeId, DdError> {
        let t = self.bool_table(f);
        let Some(first) = (0..self.minterms()).find(|&i| Self::bit(&t, i)) else {
            return Ok(self.zero());
        };
        // a prime expanded from one satisfying minterm
        let mut minterm = vec![0u64; t.len()];
        Self::set_bit(&mut minterm, first);
        let m = self.intern_bool(minterm);
        let prime = self.make_prime(f, m)?;
        self.recursive_deref_node(m);
        Ok(prime)
    }

    fn find_essential(&self, f: DdNodeId) -> Result<DdNodeId, DdError> {
        let t = self.bool_table(f);
        let mut cube = self.const_table(true);
        for v in 0..self.num_vars() {
            let vt = self.var_table(v);
            let pos_essential = t.iter().zip(vt.iter()).all(|(&a, &b)| a & !b == 0);
            let neg_essential = t.iter().zip(vt.iter()).all(|(&a, &b)| a & b == 0);
            if pos_essential {
                cube = cube.iter().zip(vt.iter()).map(|(&a, &b)| a & b).collect();
            } else if neg_essential {
                cube = cube.iter().zip(vt.iter()).map(|(&a, &b)| a & !b).collect();
            }
        }
        Ok(self.intern_bool(cube))
    }

    fn count_minterm(&self, f: DdNodeId, nvars: u32) -> f64 {
        let t = self.bool_table(f);
        let count: u32 = t.iter().map(|w| w.count_ones()).sum();
        let scale = nvars as i32 - self.num_vars() as i32;
        count as f64 * 2f64.powi(scale)
    }

    fn dag_size(&self, f: DdNodeId) -> usize {
        self.robdd_size(&self.bool_table(f))
    }

    fn lowest_index(&self, f: DdNodeId) -> Option<u32> {
        match &self.inner.borrow().funcs[f.0 as usize] {
            Func::Bool(t) => self.support_vars_of(t).first().copied(),
            Func::Num(_) => None,
        }
    }

    fn is_constant(&self, f: DdNodeId) -> bool {
        match &self.inner.borrow().funcs[f.0 as usize] {
            Func::Bool(t) => self.support_vars_of(t).is_empty(),
            Func::Num(t) => t.iter().all(|&v| v == t[0]),
        }
    }

    fn node_var(&self, f: DdNodeId) -> Option<u32> {
        self.lowest_index(f)
    }

    fn node_then(&self, f: DdNodeId) -> Result<DdNodeId, DdError> {
        let t = self.bool_table(f);
        let v = self.support_vars_of(&t).first().copied().ok_or(DdError::ManagerFailure)?;
        Ok(self.intern_bool(self.cofactor(&t, v, true)))
    }

    fn node_else(&self, f: DdNodeId) -> Result<DdNodeId, DdError> {
        let t = self.bool_table(f);
        let v = self.support_vars_of(&t).first().copied().ok_or(DdError::ManagerFailure)?;
        Ok(self.intern_bool(self.cofactor(&t, v, false)))
    }

    fn is_complement(&self, _f: DdNodeId) -> bool {
        false
    }

    fn bdd_to_01_add(&self, f: DdNodeId) -> Result<DdNodeId, DdError> {
        let t = self.bool_table(f);
        let vals: Vec<i64> = (0..self.minterms())
            .map(|i| if Self::bit(&t, i) { 1 } else { 0 })
            .collect();
        Ok(self.intern(Func::Num(vals)))
    }

    fn add_to_bdd(&self, f: DdNodeId) -> Result<DdNodeId, DdError> {
        let vals = self.num_table(f);
        let mut t = vec![0u64; self.words()];
        for (i, &v) in vals.iter().enumerate() {
            if v != 0 {
                Self::set_bit(&mut t, i);
            }
        }
        Ok(self.intern_bool(t))
    }

    fn add_times(&self, f: DdNodeId, g: DdNodeId) -> Result<DdNodeId, DdError> {
        let (tf, tg) = (self.num_table(f), self.num_table(g));
        let vals: Vec<i64> = tf.iter().zip(tg.iter()).map(|(&a, &b)| a * b).collect();
        Ok(self.intern(Func::Num(vals)))
    }

    fn add_exists_sum(&self, f: DdNodeId, cube: DdNodeId) -> Result<DdNodeId, DdError> {
        let cube_t = self.bool_table(cube);
        let mut vals = self.num_table(f);
        for v in self.support_vars_of(&cube_t) {
            let mut out = vec![0i64; vals.len()];
            for (i, slot) in out.iter_mut().enumerate() {
                let lo = vals[i & !(1usize << v)];
                let hi = vals[i | (1usize << v)];
                *slot = lo + hi;
            }
            vals = out;
        }
        Ok(self.intern(Func::Num(vals)))
    }

    fn add_strict_threshold(&self, f: DdNodeId, k: i64) -> Result<DdNodeId, DdError> {
        let vals = self.num_table(f);
        let mut t = vec![0u64; self.words()];
        for (i, &v) in vals.iter().enumerate() {
            if v > k {
                Self::set_bit(&mut t, i);
            }
        }
        Ok(self.intern_bool(t))
    }

    fn autodyn_enable(&self, _method: ReorderMethod) {}

    fn autodyn_disable(&self) {}

    fn reordering_status(&self) -> Option<ReorderMethod> {
        None
    }

    fn reduce_heap(&self, _method: ReorderMethod, _minsize: usize) -> Result<(), DdError> {
        Ok(())
    }

    fn shuffle_heap(&self, _order: &[u32]) -> Result<(), DdError> {
        Ok(())
    }

    fn var_block_new(&self, low: u32, _size: u32) -> Result<DdBlockId, DdError> {
        Ok(DdBlockId(low as u64))
    }

    fn var_block_free(&self, _block: DdBlockId) -> Result<(), DdError> {
        Ok(())
    }
}

/// The projection function of variable `index`, as an owned handle.
pub fn var(mgr: &Rc<TableManager>, index: u32) -> Bdd {
    let dyn_mgr: Rc<dyn DdManager> = mgr.clone();
    let id = mgr.new_var_with_index(index).unwrap();
    Bdd::from_referenced(dyn_mgr, id)
}

/// The positive cube of the given variables.
pub fn cube(mgr: &Rc<TableManager>, vars: &[u32]) -> Bdd {
    let dyn_mgr: Rc<dyn DdManager> = mgr.clone();
    let mut acc = Bdd::one(&dyn_mgr);
    for &v in vars {
        acc = acc.and(&var(mgr, v)).unwrap();
    }
    acc
}

/// Upcast helper for APIs taking `Rc<dyn DdManager>`.
pub fn as_dyn(mgr: &Rc<TableManager>) -> Rc<dyn DdManager> {
    mgr.clone()
}
