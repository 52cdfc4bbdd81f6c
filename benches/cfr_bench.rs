//! Benchmarks for the MCCFR trainer.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nlhe_blueprint::cfr::{CfrConfig, CfrTrainer};
use nlhe_blueprint::games::kuhn::KuhnGame;
use nlhe_blueprint::games::nlhe::NlheGame;

fn kuhn_iteration(c: &mut Criterion) {
    let mut trainer = CfrTrainer::new(KuhnGame::new(), CfrConfig::default().with_seed(42));
    c.bench_function("kuhn_single_iteration", |b| {
        b.iter(|| {
            trainer.run_iteration();
            black_box(trainer.iteration())
        })
    });
}

fn kuhn_1000_iterations(c: &mut Criterion) {
    c.bench_function("kuhn_1000_iterations", |b| {
        b.iter(|| {
            let mut trainer =
                CfrTrainer::new(KuhnGame::new(), CfrConfig::default().with_seed(42));
            trainer.train(black_box(1000));
            black_box(trainer.num_info_sets())
        })
    });
}

fn nlhe_iteration(c: &mut Criterion) {
    // Heuristic bucketing: the bench measures tree traversal, not table
    // lookups.
    let mut trainer = CfrTrainer::new(NlheGame::default(), CfrConfig::default().with_seed(42));
    c.bench_function("nlhe_single_iteration", |b| {
        b.iter(|| {
            trainer.run_iteration();
            black_box(trainer.iteration())
        })
    });
}

criterion_group!(benches, kuhn_iteration, kuhn_1000_iterations, nlhe_iteration);
criterion_main!(benches);
