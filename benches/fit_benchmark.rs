// ========================================================================================
//
//                 NCLASSO DENSE VERSUS SPARSE DESIGN BENCHMARK
//
// ========================================================================================
//
// Measures a full network-constrained Lasso fit on a synthetic cohort as the
// fraction of nonzero genotype calls varies, once with a dense `ndarray` design and
// once with the compressed sparse column design.
//
// ========================================================================================

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nclasso::{IncidenceOperator, NcLasso, NcLassoConfig, SparseGenotypeMatrix};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

// --- Benchmark Tuning Parameters ---

/// Number of individuals in the simulated cohort.
const NUM_PEOPLE: usize = 500;
/// Number of variants (features).
const NUM_VARIANTS: usize = 2_000;
/// Edges per variant in the simulated network, connecting each variant to its successors.
const NETWORK_FANOUT: usize = 3;
/// Alternate allele frequencies to test.
const ALLELE_FREQUENCIES: [f64; 4] = [0.01, 0.05, 0.2, 0.5];

fn simulate_genotypes(rng: &mut StdRng, frequency: f64) -> Array2<f64> {
    Array2::from_shape_fn((NUM_PEOPLE, NUM_VARIANTS), |_| {
        let first = rng.gen_bool(frequency) as u8;
        let second = rng.gen_bool(frequency) as u8;
        f64::from(first + second)
    })
}

fn simulate_network() -> IncidenceOperator {
    let edges = (0..NUM_VARIANTS).flat_map(|u| {
        (1..=NETWORK_FANOUT)
            .map(move |step| (u, u + step, 1.0))
            .filter(|&(_, v, _)| v < NUM_VARIANTS)
    });
    IncidenceOperator::from_edges(NUM_VARIANTS, edges).unwrap()
}

fn benchmark_design_layouts(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2024);
    let operator = Arc::new(simulate_network());
    let config = NcLassoConfig::new(0.05, 0.05).with_max_iterations(200);

    let mut group = c.benchmark_group("ncLasso fit");
    group.sample_size(10);
    group.throughput(Throughput::Elements((NUM_PEOPLE * NUM_VARIANTS) as u64));

    for &frequency in &ALLELE_FREQUENCIES {
        let dense = simulate_genotypes(&mut rng, frequency);
        let sparse = SparseGenotypeMatrix::from_dense(dense.view()).unwrap();
        let mut beta = Array1::zeros(NUM_VARIANTS);
        for j in (0..NUM_VARIANTS).step_by(97) {
            beta[j] = 1.0;
        }
        let y = dense.dot(&beta);

        group.bench_with_input(BenchmarkId::new("Dense", frequency), &dense, |b, dense| {
            b.iter(|| {
                let mut model = NcLasso::new(Arc::clone(&operator), config.clone()).unwrap();
                model.fit(black_box(dense), black_box(y.view())).unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("Sparse", frequency), &sparse, |b, sparse| {
            b.iter(|| {
                let mut model = NcLasso::new(Arc::clone(&operator), config.clone()).unwrap();
                model.fit(black_box(sparse), black_box(y.view())).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_design_layouts);
criterion_main!(benches);
