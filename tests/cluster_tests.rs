//! Cluster list behavior: scheduling, partitioning, image computation.

mod helpers;

use std::rc::Rc;

use kripke::dd::Bdd;
use kripke::trans::{Cluster, ClusterList, ClusterOptions, AFFINITY_INHIBIT_SIZE};

use helpers::{as_dyn, cube, var, TableManager};

/// Variables for the two-bit machine used across these tests:
/// x, y are current state; xp, yp the corresponding next state.
const X: u32 = 0;
const Y: u32 = 1;
const XP: u32 = 2;
const YP: u32 = 3;

fn two_bit_machine() -> (Rc<TableManager>, ClusterList, Bdd, Bdd) {
    let mgr = TableManager::new(4);
    // C1: x' = x            C2: y' = y, constrained to x'
    let c1 = var(&mgr, X).xnor(&var(&mgr, XP)).unwrap();
    let c2 = var(&mgr, Y)
        .xnor(&var(&mgr, YP))
        .unwrap()
        .and(&var(&mgr, XP))
        .unwrap();

    let mut list = ClusterList::new(as_dyn(&mgr));
    list.append(Cluster::new(c1));
    list.append(Cluster::new(c2));

    let state = cube(&mgr, &[X, Y]);
    let input = Bdd::one(&as_dyn(&mgr));
    (mgr, list, state, input)
}

#[test]
fn schedule_quantifies_variables_at_their_last_use() {
    let (mgr, mut list, state, input) = two_bit_machine();
    list.build_schedule(&state, &input).unwrap();

    // x is dead after the first cluster; y lives until the second
    let q1 = list.get(0).unwrap().quant_state_input();
    assert_eq!(q1, cube(&mgr, &[X]));

    let q2 = list.get(1).unwrap().quant_state_input();
    assert!(q2.leq(&cube(&mgr, &[X, Y])));

    assert!(list.check_schedule().unwrap());
}

#[test]
fn scrambled_schedule_fails_the_check() {
    let (mgr, mut list, state, input) = two_bit_machine();
    list.build_schedule(&state, &input).unwrap();

    // force the first cluster to quantify y, which the second still uses
    list.get_mut(0)
        .unwrap()
        .set_quant_state_input(cube(&mgr, &[X, Y]));
    assert!(!list.check_schedule().unwrap());
}

#[test]
fn image_equals_monolithic_quantification() {
    let (mgr, mut list, state, input) = two_bit_machine();
    list.build_schedule(&state, &input).unwrap();

    // from the state x=1, y=1 the machine steps to x'=1, y'=1
    let s = var(&mgr, X).and(&var(&mgr, Y)).unwrap();
    let image = list.image_state(&s).unwrap();

    let mono = list.monolithic_bdd().unwrap();
    let expected = mono
        .and(&s)
        .unwrap()
        .exists(&cube(&mgr, &[X, Y]))
        .unwrap();
    assert_eq!(image, expected);
    assert_eq!(image, var(&mgr, XP).and(&var(&mgr, YP)).unwrap());
}

#[test]
fn monolithic_collapse_has_one_cluster() {
    let (_mgr, list, _state, _input) = two_bit_machine();
    let mono_list = list.apply_monolithic().unwrap();
    assert_eq!(mono_list.len(), 1);
    assert_eq!(
        mono_list.get(0).unwrap().trans(),
        list.monolithic_bdd().unwrap()
    );
    assert!(list.check_equality(&mono_list).unwrap());
}

#[test]
fn remove_cluster_drops_every_occurrence() {
    let mgr = TableManager::new(4);
    let t = var(&mgr, X);
    let mut list = ClusterList::new(as_dyn(&mgr));
    list.append(Cluster::new(t.clone()));
    list.append(Cluster::new(var(&mgr, Y)));
    list.append(Cluster::new(t.clone()));

    assert_eq!(list.remove_cluster(&Cluster::new(t)), 2);
    assert_eq!(list.len(), 1);
}

#[test]
fn threshold_clustering_preserves_the_relation() {
    let mgr = TableManager::new(6);
    let mut list = ClusterList::new(as_dyn(&mgr));
    for v in 0..3 {
        let rel = var(&mgr, v).xnor(&var(&mgr, v + 3)).unwrap();
        list.append(Cluster::new(rel));
    }

    for threshold in [1usize, 3, 100] {
        let options = ClusterOptions {
            threshold,
            affinity: false,
            ..ClusterOptions::default()
        };
        let clustered = list.apply_threshold(&options).unwrap();
        assert!(list.check_equality(&clustered).unwrap());
    }
}

#[test]
fn affinity_clustering_preserves_the_relation() {
    let mgr = TableManager::new(6);
    let mut list = ClusterList::new(as_dyn(&mgr));
    for v in 0..3 {
        let rel = var(&mgr, v).xnor(&var(&mgr, v + 3)).unwrap();
        list.append(Cluster::new(rel));
    }
    // two clusters share variable 0 and merge first
    list.append(Cluster::new(var(&mgr, 0).implies(&var(&mgr, 4)).unwrap()));

    let options = ClusterOptions {
        threshold: 50,
        affinity: true,
        ..ClusterOptions::default()
    };
    let clustered = list.apply_threshold(&options).unwrap();
    assert!(list.check_equality(&clustered).unwrap());
    assert!(clustered.len() <= list.len());
}

#[test]
fn large_lists_fall_back_to_plain_threshold() {
    let mgr = TableManager::new(6);
    let mut list = ClusterList::new(as_dyn(&mgr));
    for i in 0..(AFFINITY_INHIBIT_SIZE + 20) {
        list.append(Cluster::new(var(&mgr, (i % 6) as u32)));
    }
    assert!(list.len() > AFFINITY_INHIBIT_SIZE);

    let options = ClusterOptions { threshold: 4, affinity: true, ..ClusterOptions::default() };
    let clustered = list.apply_threshold(&options).unwrap();
    assert!(list.check_equality(&clustered).unwrap());
}

#[test]
fn iwls95_partition_preserves_relation_and_schedules() {
    let (mgr, list, state, input) = two_bit_machine();
    let next = cube(&mgr, &[XP, YP]);

    for preorder in [false, true] {
        let options = ClusterOptions {
            cluster_size: 1,
            iwls95_preorder: preorder,
            ..ClusterOptions::default()
        };
        let mut ordered = list
            .apply_iwls95_partition(&state, &input, &next, &options)
            .unwrap();
        assert!(list.check_equality(&ordered).unwrap());

        ordered.build_schedule(&state, &input).unwrap();
        assert!(ordered.check_schedule().unwrap());

        let s = var(&mgr, X).and(&var(&mgr, Y)).unwrap();
        assert_eq!(
            ordered.image_state(&s).unwrap(),
            list.apply_monolithic()
                .unwrap()
                .get(0)
                .unwrap()
                .trans()
                .and(&s)
                .unwrap()
                .exists(&cube(&mgr, &[X, Y]))
                .unwrap()
        );
    }
}

#[test]
fn synchronous_product_conjoins_both_relations() {
    let mgr = TableManager::new(8);
    let dynm = as_dyn(&mgr);

    // machine A over {0, 2}: 2 is next-state of 0
    let mut a = ClusterList::new(dynm.clone());
    a.append(Cluster::new(var(&mgr, 0).xnor(&var(&mgr, 2)).unwrap()));
    a.build_schedule(&cube(&mgr, &[0]), &Bdd::one(&dynm)).unwrap();

    // machine B over {1, 3}
    let mut b = ClusterList::new(dynm.clone());
    b.append(Cluster::new(var(&mgr, 1).xnor(&var(&mgr, 3)).unwrap()));
    b.build_schedule(&cube(&mgr, &[1]), &Bdd::one(&dynm)).unwrap();

    let mono_a = a.monolithic_bdd().unwrap();
    let mono_b = b.monolithic_bdd().unwrap();

    a.apply_synchronous_product(&b).unwrap();
    assert_eq!(a.len(), 2);
    assert_eq!(a.monolithic_bdd().unwrap(), mono_a.and(&mono_b).unwrap());
    assert!(a.check_schedule().unwrap());
}

#[test]
fn k_image_counts_distinct_transitions() {
    let mgr = TableManager::new(2);
    let dynm = as_dyn(&mgr);
    let state = cube(&mgr, &[0]);
    let input = Bdd::one(&dynm);

    // both values of x step to x'=1: two transitions into that state
    let mut list = ClusterList::new(dynm.clone());
    list.append(Cluster::new(var(&mgr, 1)));
    list.build_schedule(&state, &input).unwrap();

    let everywhere = Bdd::one(&dynm);
    assert_eq!(
        list.k_image_state(&everywhere, 1).unwrap(),
        list.image_state(&everywhere).unwrap()
    );
    assert_eq!(list.k_image_state(&everywhere, 2).unwrap(), var(&mgr, 1));
    assert!(list.k_image_state(&everywhere, 3).unwrap().is_zero());
}

#[test]
fn cluster_lists_release_their_bdds() {
    let mgr = TableManager::new(4);
    {
        let (_, mut list, state, input) = {
            let c1 = var(&mgr, X).xnor(&var(&mgr, XP)).unwrap();
            let mut list = ClusterList::new(as_dyn(&mgr));
            list.append(Cluster::new(c1));
            let state = cube(&mgr, &[X]);
            let input = Bdd::one(&as_dyn(&mgr));
            ((), list, state, input)
        };
        list.build_schedule(&state, &input).unwrap();
        let _image = list.image_state(&Bdd::one(&as_dyn(&mgr))).unwrap();
    }
    assert_eq!(mgr.total_refs(), 0);
}
