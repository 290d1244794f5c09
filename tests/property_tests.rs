use corrclust::cluster::{Clustering, ClusteringAlgorithm, Dbscan, Optics, NOISE};
use corrclust::correlation::{Copac, Eric, FourC, HiCO};
use corrclust::Relation;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

fn points(dim: usize, max: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop::collection::vec(prop::collection::vec(-10.0f64..10.0, dim), 1..max)
}

/// Every point lies in exactly one cluster.
fn check_partition<M>(clustering: &Clustering<M>, n: usize) -> Result<(), TestCaseError> {
    let mut seen = vec![0usize; n];
    for c in clustering.clusters() {
        for &id in c.ids() {
            prop_assert!(id < n);
            seen[id] += 1;
        }
    }
    prop_assert!(seen.iter().all(|&s| s == 1), "membership counts: {:?}", seen);
    prop_assert!(clustering.clusters().iter().filter(|c| c.is_noise()).count() <= 1);
    Ok(())
}

proptest! {
    #[test]
    fn prop_dbscan_partitions(
        data in points(2, 40),
        eps in 0.1f64..5.0,
        minpts in 1usize..6
    ) {
        let rel = Relation::new(&data).unwrap();
        let clustering = Dbscan::new(eps, minpts).run(&rel).unwrap();
        check_partition(&clustering, rel.len())?;

        let labels = clustering.labels(rel.len());
        for (id, &l) in labels.iter().enumerate() {
            if l != NOISE {
                prop_assert!(clustering.cluster(l).ids().contains(&id));
            }
        }
    }

    #[test]
    fn prop_copac_partitions_and_is_deterministic(
        data in points(3, 30),
        k in 1usize..8,
        minpts in 1usize..5
    ) {
        let rel = Relation::new(&data).unwrap();
        let copac = Copac::new(k, 0.5, minpts);
        let first = copac.run(&rel).unwrap();
        check_partition(&first, rel.len())?;
        for c in first.non_noise() {
            prop_assert!(c.model().dimensionality >= 1);
            prop_assert!(c.model().dimensionality <= 3);
        }

        let second = copac.run(&rel).unwrap();
        prop_assert_eq!(first.labels(rel.len()), second.labels(rel.len()));
    }

    #[test]
    fn prop_fourc_partitions(
        data in points(2, 30),
        eps in 0.5f64..5.0,
        minpts in 1usize..5
    ) {
        let rel = Relation::new(&data).unwrap();
        let fourc = FourC::new(eps, minpts);
        let clustering = fourc.run(&rel).unwrap();
        check_partition(&clustering, rel.len())?;

        let again = fourc.run(&rel).unwrap();
        prop_assert_eq!(clustering.labels(rel.len()), again.labels(rel.len()));
    }

    #[test]
    fn prop_eric_hierarchy_descends(
        data in points(3, 30),
        k in 2usize..8
    ) {
        let rel = Relation::new(&data).unwrap();
        let eric = Eric::new(k, 2);
        let clustering = eric.run(&rel).unwrap();
        check_partition(&clustering, rel.len())?;
        for (parent, child) in clustering.edges() {
            prop_assert!(
                clustering.cluster(parent).model().dimensionality()
                    > clustering.cluster(child).model().dimensionality()
            );
        }
        for &top in clustering.toplevel() {
            prop_assert!(clustering.parents(top).is_empty());
        }

        let again = eric.run(&rel).unwrap();
        prop_assert_eq!(clustering.labels(rel.len()), again.labels(rel.len()));
        prop_assert_eq!(
            clustering.edges().collect::<Vec<_>>(),
            again.edges().collect::<Vec<_>>()
        );
        prop_assert_eq!(clustering.toplevel(), again.toplevel());
    }

    #[test]
    fn prop_optics_order_is_permutation(
        data in points(2, 40),
        minpts in 1usize..5
    ) {
        let rel = Relation::new(&data).unwrap();
        let order = Optics::new(f64::INFINITY, minpts).run(&rel).unwrap();
        let mut ids: Vec<_> = order.ids().collect();
        ids.sort_unstable();
        prop_assert_eq!(ids, (0..rel.len()).collect::<Vec<_>>());
    }

    #[test]
    fn prop_hico_order_is_permutation(
        data in prop::collection::vec(prop::collection::vec(-10.0f64..10.0, 3), 4..25)
    ) {
        let rel = Relation::new(&data).unwrap();
        let hico = HiCO::new(3);
        let order = hico.run(&rel).unwrap();
        let mut ids: Vec<_> = order.ids().collect();
        ids.sort_unstable();
        prop_assert_eq!(ids, (0..rel.len()).collect::<Vec<_>>());

        let first = order.entries()[0];
        prop_assert!(first.reachability.is_infinite());
        prop_assert!(first.predecessor.is_none());
        for e in &order.entries()[1..] {
            prop_assert!(e.predecessor.is_some());
            prop_assert!(e.correlation.is_some_and(|c| c <= 3));
        }

        let again = hico.run(&rel).unwrap();
        prop_assert_eq!(order.entries(), again.entries());
    }
}
