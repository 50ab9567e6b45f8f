// Unit tests for Swap Ring graph construction and cycle enumeration

use std::collections::BTreeSet;
use swap_ring::core::{elementary_cycles, Cycle, PreferenceGraph};
use swap_ring::models::{Application, ApplicationId, CityId, LengthOfStay, Property, PropertyId};

fn ids(raw: &[i64]) -> Vec<ApplicationId> {
    raw.iter().map(|&i| ApplicationId(i)).collect()
}

fn graph(nodes: &[i64], edges: &[(i64, i64)]) -> PreferenceGraph {
    PreferenceGraph::from_edges(
        ids(nodes),
        edges.iter().map(|&(a, b)| (ApplicationId(a), ApplicationId(b))),
    )
}

fn complete_graph(n: i64) -> PreferenceGraph {
    let nodes: Vec<i64> = (1..=n).collect();
    let edges: Vec<(i64, i64)> = (1..=n)
        .flat_map(|a| (1..=n).filter(move |&b| b != a).map(move |b| (a, b)))
        .collect();
    graph(&nodes, &edges)
}

fn create_application(id: i64, offers: i64, prefers: &[i64]) -> Application {
    Application {
        id: ApplicationId(id),
        length_of_stay: LengthOfStay::SixMonths,
        property: Some(Property { id: PropertyId(id), city_id: Some(CityId(offers)) }),
        preferred_cities: prefers.iter().map(|&c| CityId(c)).collect(),
        pet_friendly: None,
        move_in_date: None,
        accepted: false,
    }
}

/// Every reported cycle is long enough, simple, and follows real edges
fn assert_valid_cycles(graph: &PreferenceGraph, cycles: &[Cycle]) {
    for cycle in cycles {
        assert!(cycle.len() >= 2, "cycle too short: {:?}", cycle);

        let distinct: BTreeSet<_> = cycle.iter().collect();
        assert_eq!(distinct.len(), cycle.len(), "repeated node in {:?}", cycle);

        for i in 0..cycle.len() {
            let from = cycle[i];
            let to = cycle[(i + 1) % cycle.len()];
            assert!(graph.contains_edge(from, to), "missing edge {} -> {} in {:?}", from, to, cycle);
        }
    }
}

#[test]
fn test_complete_graph_cycle_count() {
    // Sum over k of C(4, k) * (k - 1)! = 6 + 8 + 6
    let g = complete_graph(4);
    let cycles = elementary_cycles(&g, None);

    assert_eq!(cycles.len(), 20);
    assert_valid_cycles(&g, &cycles);
}

#[test]
fn test_complete_graph_cycles_are_unique() {
    let g = complete_graph(5);
    let cycles = elementary_cycles(&g, None);

    let unique: BTreeSet<_> = cycles.iter().cloned().collect();
    assert_eq!(unique.len(), cycles.len());
    // 10 + 20 + 30 + 24
    assert_eq!(cycles.len(), 84);
}

#[test]
fn test_cycles_start_at_their_smallest_node() {
    let g = complete_graph(4);
    for cycle in elementary_cycles(&g, None) {
        let min = cycle.iter().min().copied();
        assert_eq!(cycle.first().copied(), min);
    }
}

#[test]
fn test_output_is_sorted_and_repeatable() {
    let g = graph(
        &[1, 2, 3, 4, 5, 6],
        &[(1, 2), (2, 3), (3, 1), (3, 4), (4, 5), (5, 3), (5, 6), (6, 5), (2, 1)],
    );

    let first = elementary_cycles(&g, None);
    let second = elementary_cycles(&g, None);

    assert_eq!(first, second);
    let mut sorted = first.clone();
    sorted.sort();
    assert_eq!(first, sorted);
    assert_valid_cycles(&g, &first);
}

#[test]
fn test_separate_components() {
    let g = graph(&[1, 2, 3, 4, 5], &[(1, 2), (2, 1), (3, 4), (4, 5), (5, 3)]);

    let cycles = elementary_cycles(&g, None);

    assert_eq!(cycles, vec![ids(&[1, 2]), ids(&[3, 4, 5])]);
}

#[test]
fn test_graph_without_edges_has_no_cycles() {
    let g = graph(&[1, 2, 3, 4], &[]);
    assert!(elementary_cycles(&g, None).is_empty());
}

#[test]
fn test_length_cap_keeps_short_cycles() {
    let g = complete_graph(4);

    let capped = elementary_cycles(&g, Some(3));

    // All 2- and 3-cycles of K4, none of the six 4-cycles
    assert_eq!(capped.len(), 14);
    assert!(capped.iter().all(|c| c.len() <= 3));
    assert_valid_cycles(&g, &capped);
}

#[test]
fn test_builder_and_enumerator_together() {
    // 1 wants city 20 (offered by 2), 2 wants 30 (offered by 3), 3 wants 10 (offered by 1)
    let apps = vec![
        create_application(1, 10, &[20]),
        create_application(2, 20, &[30]),
        create_application(3, 30, &[10]),
        create_application(4, 40, &[10]),
    ];

    let g = PreferenceGraph::build(&apps).unwrap();
    let cycles = elementary_cycles(&g, None);

    assert_eq!(g.node_count(), 4);
    assert_eq!(cycles, vec![ids(&[1, 2, 3])]);
}

#[test]
fn test_same_city_preference_does_not_inflate_ring() {
    let apps = vec![
        create_application(1, 10, &[20, 10]),
        create_application(2, 20, &[10]),
    ];

    let g = PreferenceGraph::build(&apps).unwrap();

    assert_eq!(g.edge_count(), 2);
    assert_eq!(elementary_cycles(&g, None), vec![ids(&[1, 2])]);
}

#[test]
fn test_shared_city_creates_edges_to_every_offer() {
    let apps = vec![
        create_application(1, 10, &[20]),
        create_application(2, 20, &[10]),
        create_application(3, 20, &[10]),
    ];

    let g = PreferenceGraph::build(&apps).unwrap();
    let cycles = elementary_cycles(&g, None);

    assert!(g.contains_edge(ApplicationId(1), ApplicationId(2)));
    assert!(g.contains_edge(ApplicationId(1), ApplicationId(3)));
    assert_eq!(cycles, vec![ids(&[1, 2]), ids(&[1, 3])]);
}
