// Criterion benchmarks for Swap Ring

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use swap_ring::core::{elementary_cycles, MatchLimits, Matcher, PreferenceGraph};
use swap_ring::models::{Application, ApplicationId, CityId, LengthOfStay, Property, PropertyId};

fn create_application(id: usize, city_count: usize) -> Application {
    let offers = id % city_count;
    Application {
        id: ApplicationId(id as i64),
        length_of_stay: match id % 4 {
            0 => LengthOfStay::ThreeMonths,
            1 => LengthOfStay::SixMonths,
            2 => LengthOfStay::TwelveMonths,
            _ => LengthOfStay::TwentyFourMonths,
        },
        property: Some(Property {
            id: PropertyId(id as i64),
            city_id: Some(CityId(offers as i64)),
        }),
        preferred_cities: vec![
            CityId(((offers + 1) % city_count) as i64),
            CityId(((offers * 7 + 3) % city_count) as i64),
        ],
        pet_friendly: None,
        move_in_date: None,
        accepted: false,
    }
}

fn complete_graph(n: i64) -> PreferenceGraph {
    let nodes: Vec<ApplicationId> = (1..=n).map(ApplicationId).collect();
    let edges: Vec<(ApplicationId, ApplicationId)> = (1..=n)
        .flat_map(|a| {
            (1..=n)
                .filter(move |&b| b != a)
                .map(move |b| (ApplicationId(a), ApplicationId(b)))
        })
        .collect();
    PreferenceGraph::from_edges(nodes, edges)
}

fn bench_complete_graph_cycles(c: &mut Criterion) {
    let mut group = c.benchmark_group("elementary_cycles");

    for n in [4i64, 5, 6, 7].iter() {
        let graph = complete_graph(*n);
        group.bench_with_input(BenchmarkId::new("complete_graph", n), n, |b, _| {
            b.iter(|| elementary_cycles(black_box(&graph), None));
        });
    }

    group.finish();
}

fn bench_graph_build(c: &mut Criterion) {
    let pool: Vec<Application> = (0..500).map(|i| create_application(i, 60)).collect();

    c.bench_function("preference_graph_500_applications", |b| {
        b.iter(|| PreferenceGraph::build(black_box(&pool)));
    });
}

fn bench_matching(c: &mut Criterion) {
    let matcher = Matcher::new(MatchLimits {
        max_group_size: None,
        max_cycle_length: Some(4),
    });

    let mut group = c.benchmark_group("matching");

    for pool_size in [20usize, 50, 100, 200].iter() {
        let pool: Vec<Application> = (0..*pool_size)
            .map(|i| create_application(i, pool_size / 4 + 1))
            .collect();

        group.bench_with_input(
            BenchmarkId::new("find_matching_application_sets", pool_size),
            pool_size,
            |b, _| {
                b.iter(|| matcher.find_matching_application_sets(black_box(&pool)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_complete_graph_cycles,
    bench_graph_build,
    bench_matching
);

criterion_main!(benches);
