//! Ordered cluster lists and the algorithms over them.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::io::{self, Write};
use std::rc::Rc;

use crate::dd::{Add, Bdd, DdError, DdManager};
use crate::trans::{Cluster, ClusterOptions};

/// Above this many input clusters, affinity clustering is substituted
/// by plain threshold clustering: the pair heap grows with C(N,2).
pub const AFFINITY_INHIBIT_SIZE: usize = 100;

/// An ordered sequence of clusters over a shared manager.
///
/// Ordering is semantically significant: it is the schedule of
/// conjunctions during image computation. The list owns its clusters;
/// operations that accept a cluster take ownership, operations that
/// return one leave ownership with the list.
pub struct ClusterList {
    mgr: Rc<dyn DdManager>,
    clusters: VecDeque<Cluster>,
}

impl ClusterList {
    pub fn new(mgr: Rc<dyn DdManager>) -> Self {
        ClusterList { mgr, clusters: VecDeque::new() }
    }

    pub fn manager(&self) -> &Rc<dyn DdManager> {
        &self.mgr
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn prepend(&mut self, cluster: Cluster) {
        self.clusters.push_front(cluster);
    }

    pub fn append(&mut self, cluster: Cluster) {
        self.clusters.push_back(cluster);
    }

    pub fn reverse(&mut self) {
        self.clusters.make_contiguous().reverse();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Cluster> {
        self.clusters.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Cluster> {
        self.clusters.get_mut(index)
    }

    /// Removes every cluster whose sub-relation equals `cluster`'s;
    /// returns how many were removed.
    pub fn remove_cluster(&mut self, cluster: &Cluster) -> usize {
        let before = self.clusters.len();
        self.clusters.retain(|c| !c.is_equal(cluster));
        before - self.clusters.len()
    }

    /// Deep copy: every cluster is copied with its BDDs re-referenced.
    pub fn duplicate(&self) -> ClusterList {
        ClusterList { mgr: Rc::clone(&self.mgr), clusters: self.clusters.clone() }
    }

    // ------------------------------------------------------------------
    // Monolithic views
    // ------------------------------------------------------------------

    /// Conjunction of every cluster's sub-relation.
    pub fn monolithic_bdd(&self) -> Result<Bdd, DdError> {
        let mut acc = Bdd::one(&self.mgr);
        for cluster in &self.clusters {
            acc.and_assign(&cluster.trans())?;
        }
        Ok(acc)
    }

    /// Cube of the supports of every cluster's sub-relation.
    pub fn clusters_cube(&self) -> Result<Bdd, DdError> {
        let mut acc = Bdd::one(&self.mgr);
        for cluster in &self.clusters {
            acc.and_assign(&cluster.support()?)?;
        }
        Ok(acc)
    }

    /// Collapses to a single-cluster list holding the monolithic BDD.
    pub fn apply_monolithic(&self) -> Result<ClusterList, DdError> {
        let mut res = ClusterList::new(Rc::clone(&self.mgr));
        res.prepend(Cluster::new(self.monolithic_bdd()?));
        Ok(res)
    }

    /// True when the two lists denote the same relation.
    pub fn check_equality(&self, other: &ClusterList) -> Result<bool, DdError> {
        Ok(self.monolithic_bdd()? == other.monolithic_bdd()?)
    }

    /// Logs the size of each cluster.
    pub fn print_short_info(&self, out: &mut dyn Write) -> io::Result<()> {
        for (i, cluster) in self.clusters.iter().enumerate() {
            writeln!(out, "cluster {}\t:\tsize {}", i + 1, cluster.size())?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Quantification schedule
    // ------------------------------------------------------------------

    /// Builds the early-quantification schedule.
    ///
    /// Walking right-to-left, each cluster may abstract exactly the
    /// variables that no later cluster mentions:
    /// `quant_state_input_i = (state ∪ input) ∖ support(suffix)` and
    /// `quant_state_i = state ∖ support(suffix)`.
    pub fn build_schedule(
        &mut self,
        state_cube: &Bdd,
        input_cube: &Bdd,
    ) -> Result<(), DdError> {
        let si_cube = state_cube.and(input_cube)?;
        let mut acc_s = Bdd::one(&self.mgr);
        let mut acc_si = Bdd::one(&self.mgr);

        for i in (0..self.clusters.len()).rev() {
            let s = state_cube.cube_diff(&acc_s)?;
            let si = si_cube.cube_diff(&acc_si)?;
            let supp = self.clusters[i].support()?;

            let cluster = &mut self.clusters[i];
            cluster.set_quant_state(s);
            cluster.set_quant_state_input(si);

            acc_s.and_assign(&supp)?;
            acc_si.and_assign(&supp)?;
        }
        Ok(())
    }

    /// Verifies the schedule: for every pair `i < j`, the support of
    /// `C_j` must not intersect `quant_state_input_i` — a variable
    /// abstracted at step `i` may not reappear later.
    pub fn check_schedule(&self) -> Result<bool, DdError> {
        for i in 0..self.clusters.len() {
            let qi = self.clusters[i].quant_state_input();
            for j in (i + 1)..self.clusters.len() {
                let supp_j = self.clusters[j].support()?;
                let outside = qi.cube_diff(&supp_j)?;
                if outside != qi {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Image computation
    // ------------------------------------------------------------------

    /// Image of `s`, abstracting state and input variables early.
    pub fn image_state(&self, s: &Bdd) -> Result<Bdd, DdError> {
        self.image(s, Cluster::quant_state_input)
    }

    /// Image of `s`, abstracting state variables only (inputs stay
    /// live in the result).
    pub fn image_state_input(&self, s: &Bdd) -> Result<Bdd, DdError> {
        self.image(s, Cluster::quant_state)
    }

    fn image(&self, s: &Bdd, cube_of: fn(&Cluster) -> Bdd) -> Result<Bdd, DdError> {
        let mut product = s.clone();
        let mut max_size = 0usize;
        for cluster in &self.clusters {
            let cube = cube_of(cluster);
            product = product.and_abstract(&cluster.trans(), &cube)?;
            max_size = max_size.max(product.size());
            tracing::debug!(size = product.size(), "intermediate image product");
        }
        tracing::debug!(max_size, "image computation finished");
        Ok(product)
    }

    /// States reachable by at least `k` distinct transitions:
    /// clusters are multiplied as 0/1 ADDs, abstracted by addition,
    /// and thresholded at the end.
    pub fn k_image_state(&self, s: &Bdd, k: i64) -> Result<Bdd, DdError> {
        self.k_image(s, k, Cluster::quant_state_input)
    }

    /// As [`ClusterList::k_image_state`], keeping input variables live.
    pub fn k_image_state_input(&self, s: &Bdd, k: i64) -> Result<Bdd, DdError> {
        self.k_image(s, k, Cluster::quant_state)
    }

    fn k_image(
        &self,
        s: &Bdd,
        k: i64,
        cube_of: fn(&Cluster) -> Bdd,
    ) -> Result<Bdd, DdError> {
        let mut product: Add = s.to_01_add()?;
        for cluster in &self.clusters {
            let trans = cluster.trans().to_01_add()?;
            let multiplied = product.times(&trans)?;
            let cube = cube_of(cluster);
            product = multiplied.exists_sum(&cube)?;
            tracing::debug!(size = product.size(), "intermediate k-image product");
        }
        product.strict_threshold(k - 1)
    }

    // ------------------------------------------------------------------
    // Threshold clustering
    // ------------------------------------------------------------------

    /// Partitions according to `options`: affinity merging when enabled
    /// and the list is small enough, plain threshold accumulation
    /// otherwise. `self` is not modified.
    pub fn apply_threshold(&self, options: &ClusterOptions) -> Result<ClusterList, DdError> {
        if options.affinity && self.len() <= AFFINITY_INHIBIT_SIZE {
            self.threshold_affinity(options.threshold, options.append)
        } else {
            self.threshold_plain(options.threshold, options.append)
        }
    }

    /// Greedy in-order accumulation: conjoin successive sub-relations
    /// while both the accumulator and the next relation stay within
    /// the threshold; commit and restart when either exceeds it.
    fn threshold_plain(&self, threshold: usize, append: bool) -> Result<ClusterList, DdError> {
        let mut result = ClusterList::new(Rc::clone(&self.mgr));
        let mut acc = Bdd::one(&self.mgr);
        let mut first_in_cluster = true;

        let commit = |result: &mut ClusterList, acc: &Bdd| {
            let cluster = Cluster::new(acc.clone());
            if append {
                result.append(cluster);
            } else {
                result.prepend(cluster);
            }
        };

        let mut idx = 0;
        while idx < self.clusters.len() {
            let relation = self.clusters[idx].trans();
            let can_accumulate = first_in_cluster
                || (acc.size() <= threshold && relation.size() <= threshold);

            if can_accumulate {
                acc.and_assign(&relation)?;
                first_in_cluster = false;
                idx += 1;
                if idx == self.clusters.len() {
                    commit(&mut result, &acc);
                }
            } else {
                commit(&mut result, &acc);
                acc = Bdd::one(&self.mgr);
                first_in_cluster = true;
            }
        }
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Affinity clustering
    // ------------------------------------------------------------------

    /// Merges the highest-affinity pair of small clusters until every
    /// merge result exceeds the threshold.
    fn threshold_affinity(
        &self,
        threshold: usize,
        append: bool,
    ) -> Result<ClusterList, DdError> {
        let mut result = ClusterList::new(Rc::clone(&self.mgr));
        let mut entries: Vec<Rc<RefCell<AffinityEntry>>> = Vec::new();
        let mut heap: BinaryHeap<AffinityPair> = BinaryHeap::new();

        let commit = |result: &mut ClusterList, trans: Bdd| {
            let cluster = Cluster::new(trans);
            if append {
                result.append(cluster);
            } else {
                result.prepend(cluster);
            }
        };

        // oversized clusters go straight to the output; the rest seed
        // the working set and the pair heap
        let mut n = 0usize;
        for cluster in &self.clusters {
            let trans = cluster.trans();
            if trans.size() > threshold {
                commit(&mut result, trans);
            } else {
                add_affinity_entry(&mut entries, &mut heap, trans)?;
                n += 1;
            }
        }

        while n > 1 {
            let Some(pair) = heap.pop() else { break };
            // pairs holding a tombstoned endpoint are stale
            let (t1, t2) = (pair.c1.borrow().trans(), pair.c2.borrow().trans());
            let (Some(t1), Some(t2)) = (t1, t2) else { continue };

            let merged = t1.and(&t2)?;
            pair.c1.borrow_mut().kill();
            pair.c2.borrow_mut().kill();

            if merged.size() > threshold {
                commit(&mut result, merged);
                n -= 2;
            } else {
                add_affinity_entry(&mut entries, &mut heap, merged)?;
                n -= 1;
            }
        }

        if n == 1 {
            let last = entries.iter().find_map(|e| e.borrow().trans());
            match last {
                Some(trans) => commit(&mut result, trans),
                None => unreachable!("affinity bookkeeping lost the last cluster"),
            }
        }

        Ok(result)
    }

    // ------------------------------------------------------------------
    // IWLS95 ordering
    // ------------------------------------------------------------------

    /// The full IWLS95 partition pipeline: optional preordering,
    /// threshold (or affinity) clustering at `cluster_size`, and a
    /// final ordering pass. The caller rebuilds the schedule.
    pub fn apply_iwls95_partition(
        &self,
        state_cube: &Bdd,
        input_cube: &Bdd,
        next_state_cube: &Bdd,
        options: &ClusterOptions,
    ) -> Result<ClusterList, DdError> {
        let source = if options.iwls95_preorder {
            tracing::debug!("performing clusters preordering");
            self.iwls95_order(state_cube, input_cube, next_state_cube, options)?
        } else {
            self.duplicate()
        };

        let clustered = {
            let sized = ClusterOptions { threshold: options.cluster_size, ..options.clone() };
            source.apply_threshold(&sized)?
        };

        clustered.iwls95_order(state_cube, input_cube, next_state_cube, options)
    }

    /// Orders a copy of the list by repeatedly extracting the cluster
    /// with the highest IWLS95 benefit. `self` is unchanged.
    pub fn iwls95_order(
        &self,
        state_cube: &Bdd,
        input_cube: &Bdd,
        next_state_cube: &Bdd,
        options: &ClusterOptions,
    ) -> Result<ClusterList, DdError> {
        let pspi = state_cube.and(input_cube)?;
        let mut working = self.duplicate();
        let mut result = ClusterList::new(Rc::clone(&self.mgr));

        while !working.is_empty() {
            let scored = working.collect_iwls95_info(&pspi, next_state_cube, options)?;

            let mut best_idx = 0usize;
            let mut best_benefit = f64::NEG_INFINITY;
            for (idx, (_, benefit)) in scored.iter().enumerate() {
                if *benefit > best_benefit {
                    best_benefit = *benefit;
                    best_idx = idx;
                }
            }

            let (best_cluster, _) = &scored[best_idx];
            working.remove_cluster(best_cluster);
            result.append(best_cluster.clone());
        }

        Ok(result)
    }

    /// Computes per-cluster IWLS95 features and the resulting benefit
    /// for every cluster of the list.
    fn collect_iwls95_info(
        &self,
        pspi: &Bdd,
        next_state_cube: &Bdd,
        options: &ClusterOptions,
    ) -> Result<Vec<(Cluster, f64)>, DdError> {
        // global features over the whole working set
        let acc = self.clusters_cube()?;
        let acc_pspi = acc.cube_intersection(pspi)?;
        let acc_ns = acc.cube_intersection(next_state_cube)?;
        let x_c = acc_pspi.size() as f64;
        let z_c = acc_ns.size() as f64;
        let max_c = acc_pspi.lowest_index().unwrap_or(0) as f64;

        let mut scored = Vec::with_capacity(self.len());
        for cluster in &self.clusters {
            let supp = cluster.support()?;
            let supp_pspi = supp.cube_intersection(pspi)?;
            let supp_ns = supp.cube_intersection(next_state_cube)?;

            // present-state/input variables local to this cluster
            let supp_rest = self.support_of_others(cluster)?;
            let local = supp_pspi.cube_diff(&supp_rest)?;

            let clamp = |n: isize| if n > 0 { n as f64 } else { 0.0 };
            let v_c = clamp(local.size() as isize - 1);
            let w_c = clamp(supp_pspi.size() as isize - 1);
            let m_c = clamp(supp_ns.size() as isize - 1);
            let min_c = supp_pspi.lowest_index().unwrap_or(0) as f64;

            let [w1, w2, w3, w4, ..] = options.iwls95_weights;
            let mut benefit = 0.0;
            if w_c != 0.0 {
                benefit += w1 * v_c / w_c;
            }
            if x_c != 0.0 {
                benefit += w2 * w_c / x_c;
            }
            if z_c != 0.0 {
                benefit -= w3 * m_c / z_c;
            }
            if max_c != 0.0 {
                benefit -= w4 * min_c / max_c;
            }

            let mut with_info = cluster.clone();
            with_info.set_quant_state_input(local);
            scored.push((with_info, benefit));
        }
        Ok(scored)
    }

    /// Cube of present-state/input support over every *other* cluster
    /// still in the list.
    fn support_of_others(&self, this: &Cluster) -> Result<Bdd, DdError> {
        let mut acc = Bdd::one(&self.mgr);
        for cluster in &self.clusters {
            if !cluster.is_equal(this) {
                acc.and_assign(&cluster.support()?)?;
            }
        }
        Ok(acc)
    }

    // ------------------------------------------------------------------
    // Synchronous product
    // ------------------------------------------------------------------

    /// Appends deep copies of `other`'s clusters and rebuilds the
    /// schedule over the union of both lists' quantified variables.
    /// Both lists must already carry a schedule.
    pub fn apply_synchronous_product(&mut self, other: &ClusterList) -> Result<(), DdError> {
        let mut state_cube = Bdd::one(&self.mgr);
        let mut state_input_cube = Bdd::one(&self.mgr);

        for cluster in self.clusters.iter().chain(other.clusters.iter()) {
            state_cube.and_assign(&cluster.quant_state())?;
            state_input_cube.and_assign(&cluster.quant_state_input())?;
        }
        let input_cube = state_input_cube.cube_diff(&state_cube)?;

        for cluster in other.iter() {
            self.append(cluster.clone());
        }
        self.build_schedule(&state_cube, &input_cube)
    }
}

// ----------------------------------------------------------------------
// Affinity bookkeeping
// ----------------------------------------------------------------------

/// A small cluster waiting to be merged. Tombstoned (killed) entries
/// stay in the heap's pairs and are skipped when popped.
struct AffinityEntry {
    trans: Option<Bdd>,
}

impl AffinityEntry {
    fn trans(&self) -> Option<Bdd> {
        self.trans.clone()
    }

    fn kill(&mut self) {
        self.trans = None;
    }
}

/// A candidate merge, keyed by affinity. Higher affinity means more
/// shared structure; the heap pops the most similar pair first.
struct AffinityPair {
    affinity: f64,
    c1: Rc<RefCell<AffinityEntry>>,
    c2: Rc<RefCell<AffinityEntry>>,
}

impl PartialEq for AffinityPair {
    fn eq(&self, other: &Self) -> bool {
        self.affinity == other.affinity
    }
}

impl Eq for AffinityPair {}

impl PartialOrd for AffinityPair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AffinityPair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.affinity.total_cmp(&other.affinity)
    }
}

/// Affinity of two sub-relations: the size of their conjunction over
/// the sum of their sizes. (The Moon–Hachtel–Somenzi support-cube
/// ratio is an accepted alternative with the same monotonicity.)
fn compute_affinity(a: &Bdd, b: &Bdd) -> Result<f64, DdError> {
    let joint = a.and(b)?;
    let denom = (a.size() + b.size()) as f64;
    Ok(joint.size() as f64 / denom)
}

/// Registers a new working cluster: pairs it with every live entry and
/// pushes the pairs onto the heap.
fn add_affinity_entry(
    entries: &mut Vec<Rc<RefCell<AffinityEntry>>>,
    heap: &mut BinaryHeap<AffinityPair>,
    trans: Bdd,
) -> Result<(), DdError> {
    let new_entry = Rc::new(RefCell::new(AffinityEntry { trans: Some(trans.clone()) }));
    for entry in entries.iter() {
        let Some(other) = entry.borrow().trans() else { continue };
        let affinity = compute_affinity(&trans, &other)?;
        heap.push(AffinityPair {
            affinity,
            c1: Rc::clone(&new_entry),
            c2: Rc::clone(entry),
        });
    }
    entries.push(new_entry);
    Ok(())
}
