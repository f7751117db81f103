//! Performance benchmarks for SOMA brains

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use soma_brain::body::{Body, Node, NodeKind, Vec2};
use soma_brain::brain::{Resting, TickContext};
use soma_brain::neural::reinforce::{Experience, ReinforceTrainer};
use soma_brain::neural::topology::Topology;
use soma_brain::neural::PolicyNetwork;
use soma_brain::{Brain, BrainConfig, Environment, Sandbox};

fn benchmark_sandbox_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("sandbox_step");

    for population in [50, 200, 500].iter() {
        let mut sandbox = Sandbox::new_with_seed(BrainConfig::default(), *population, 42);

        // Warm up
        sandbox.run(10);

        group.bench_with_input(
            BenchmarkId::new("population", population),
            population,
            |b, _| {
                b.iter(|| {
                    sandbox.step();
                });
            },
        );
    }

    group.finish();
}

fn benchmark_forward(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let small = PolicyNetwork::new(
        Topology {
            input_size: 12,
            hidden_size: 5,
            output_size: 8,
        },
        &mut rng,
    );
    let large = PolicyNetwork::new(
        Topology {
            input_size: 40,
            hidden_size: 30,
            output_size: 32,
        },
        &mut rng,
    );
    let small_input = vec![0.5; 12];
    let large_input = vec![0.5; 40];

    c.bench_function("forward_small", |b| {
        b.iter(|| small.forward(black_box(&small_input)))
    });
    c.bench_function("forward_large", |b| {
        b.iter(|| large.forward(black_box(&large_input)))
    });
}

fn benchmark_tick(c: &mut Criterion) {
    let config = BrainConfig::default();
    let env = Environment::empty(200.0, 200.0);
    let mut rng = ChaCha8Rng::seed_from_u64(2);

    let mut body = Body::new(0);
    let core = body.add_node(Node::new(NodeKind::Neuron, Vec2::new(100.0, 100.0)));
    body.nodes[core].is_brain = true;
    for (i, kind) in [NodeKind::Emitter, NodeKind::Swimmer, NodeKind::Eye, NodeKind::Jet]
        .into_iter()
        .enumerate()
    {
        let limb = body.add_node(Node::new(kind, Vec2::new(100.0 + i as f64 * 3.0, 104.0)));
        body.connect(core, limb);
    }
    let mut brain = Brain::new(&config);

    c.bench_function("brain_tick", |b| {
        b.iter(|| {
            brain.process(
                &mut body,
                TickContext { env: &env, config: &config },
                &mut rng,
                &mut Resting,
            )
        });
    });
}

fn benchmark_train(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let topology = Topology {
        input_size: 16,
        hidden_size: 20,
        output_size: 12,
    };
    let mut network = PolicyNetwork::new(topology, &mut rng);
    let mut trainer = ReinforceTrainer::new(0.001, 0.99, 1e-8);

    let batch: Vec<Experience> = (0..10)
        .map(|t| {
            let state: Vec<f64> = (0..16).map(|i| ((t * 16 + i) as f64 * 0.1).sin()).collect();
            let pass = network.forward(&state);
            let raw = pass.raw_outputs.to_vec();
            let mut body = Body::new(0);
            for _ in 0..2 {
                body.add_node(Node::new(NodeKind::Swimmer, Vec2::ZERO));
            }
            body.add_node(Node::new(NodeKind::Jet, Vec2::ZERO));
            let action_details = soma_brain::neural::actions::sample_and_apply(
                &mut body,
                &raw,
                &Default::default(),
                &mut rng,
            );
            Experience {
                state,
                action_details,
                reward: t as f64 * 0.1,
            }
        })
        .collect();

    c.bench_function("reinforce_train_batch10", |b| {
        b.iter(|| trainer.train(&mut network, black_box(&batch)))
    });
}

criterion_group!(
    benches,
    benchmark_sandbox_step,
    benchmark_forward,
    benchmark_tick,
    benchmark_train,
);
criterion_main!(benches);
