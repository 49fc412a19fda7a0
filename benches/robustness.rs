use cisgrn::grn::{infer_network, perturbation_analysis, BoostParams, InferenceParams, RegulatoryNetwork};
use cisgrn::test_utilities::{random_inference_matrix, random_network};
use cisgrn::DEFAULT_IMPORTANCE_THRESHOLD;
use criterion::{criterion_group, criterion_main, Criterion};

const NUM_GENES: usize = 2_000;
const NUM_EDGES: usize = 20_000;

fn bench_perturbation(c: &mut Criterion) {
    // create the benchmark group
    let mut group = c.benchmark_group("perturbation");

    // create the test data
    let edges = random_network(NUM_GENES, NUM_EDGES, 666);
    let network = RegulatoryNetwork::from_edges(&edges, DEFAULT_IMPORTANCE_THRESHOLD);

    // configure the sample size for the group
    group.sample_size(10);

    group.bench_function("build_network", |b| {
        b.iter(|| RegulatoryNetwork::from_edges(&edges, DEFAULT_IMPORTANCE_THRESHOLD).edge_count());
    });

    group.bench_function("stats", |b| {
        b.iter(|| network.stats().num_components);
    });

    group.bench_function("remove_top_10", |b| {
        b.iter(|| perturbation_analysis(&network, 10).len());
    });
}

fn bench_inference(c: &mut Criterion) {
    let mut group = c.benchmark_group("inference");
    let matrix = random_inference_matrix(50, 40, 666);
    let regulators: Vec<usize> = (0..10).collect();
    let params = InferenceParams {
        boost: BoostParams {
            max_estimators: 500,
            ..Default::default()
        },
        ..Default::default()
    };
    group.sample_size(10);
    group.bench_function("infer_40_genes", |b| {
        b.iter(|| infer_network(&matrix, &regulators, &params).unwrap().len());
    });
}

criterion_group!(benches, bench_perturbation, bench_inference);
criterion_main!(benches);
