//! Justice and compassion list behavior.

mod helpers;

use kripke::fair::{CompassionList, JusticeList};

use helpers::{as_dyn, var, TableManager};

#[test]
fn justice_preserves_order_and_content() {
    let mgr = TableManager::new(3);
    let mut justice = JusticeList::new(as_dyn(&mgr));
    assert!(justice.is_empty());

    let (a, b, c) = (var(&mgr, 0), var(&mgr, 1), var(&mgr, 2));
    justice.append(&a);
    justice.append(&b);
    justice.append(&c);

    assert_eq!(justice.len(), 3);
    let collected: Vec<_> = justice.iter().collect();
    assert_eq!(collected, vec![a.clone(), b.clone(), c.clone()]);
    assert_eq!(justice.get(1), Some(b));
}

#[test]
fn compassion_stores_pairs() {
    let mgr = TableManager::new(2);
    let mut compassion = CompassionList::new(as_dyn(&mgr));
    let (p, q) = (var(&mgr, 0), var(&mgr, 1));
    compassion.append(&p, &q);

    assert_eq!(compassion.len(), 1);
    assert_eq!(compassion.get_p(0), Some(p.clone()));
    assert_eq!(compassion.get_q(0), Some(q.clone()));
    assert_eq!(compassion.iter().next(), Some((p, q)));
}

#[test]
fn synchronous_product_concatenates() {
    let mgr = TableManager::new(4);
    let mut a = JusticeList::new(as_dyn(&mgr));
    let mut b = JusticeList::new(as_dyn(&mgr));
    a.append(&var(&mgr, 0));
    b.append(&var(&mgr, 1));
    b.append(&var(&mgr, 2));

    a.apply_synchronous_product(&b);
    assert_eq!(a.len(), 3);
    assert_eq!(b.len(), 2);
    let collected: Vec<_> = a.iter().collect();
    assert_eq!(collected[1], var(&mgr, 1));
    assert_eq!(collected[2], var(&mgr, 2));
}

#[test]
fn lists_release_their_bdds_on_drop() {
    let mgr = TableManager::new(3);
    {
        let mut justice = JusticeList::new(as_dyn(&mgr));
        let mut compassion = CompassionList::new(as_dyn(&mgr));
        let (p, q) = (var(&mgr, 0), var(&mgr, 1));
        justice.append(&p);
        compassion.append(&p, &q);

        // copies reference, they do not alias
        let copy = justice.clone();
        drop(justice);
        assert_eq!(copy.len(), 1);
    }
    assert_eq!(mgr.total_refs(), 0);
}
