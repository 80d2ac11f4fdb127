// Zero-knowledge proof benchmarks for RiskProof.
//
// Benchmarks the MiMC-7 commitment, Groth16 trusted setup, proof generation
// and proof verification for the range-assessment circuit over BN254.

use criterion::{criterion_group, criterion_main, Criterion};

use ark_std::rand::{rngs::StdRng, SeedableRng};

use riskproof_protocol::config::RANGE_BITS;
use riskproof_protocol::zkp::prover::prove_blocking;
use riskproof_protocol::zkp::{commit, input, setup_circuit, verify, Groth16Backend, ProvingBackend};

fn bench_commit(c: &mut Criterion) {
    c.bench_function("zkp/mimc_commit", |b| {
        b.iter(|| commit(1_000_000).unwrap());
    });
}

fn bench_groth16_setup(c: &mut Criterion) {
    let mut group = c.benchmark_group("zkp");
    group.sample_size(10);
    group.bench_function("groth16_setup", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(42);
            setup_circuit("bench", RANGE_BITS, &mut rng).unwrap()
        });
    });
    group.finish();
}

fn bench_groth16_prove(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let setup = setup_circuit("bench", RANGE_BITS, &mut rng).unwrap();
    let artifacts = setup.artifacts();
    let backend = Groth16Backend::new();

    let commitment = commit(55).unwrap();
    let circuit_input = input::build(55, 0, 100, &commitment).unwrap();

    c.bench_function("zkp/groth16_prove", |b| {
        b.iter(|| prove_blocking(&backend, &circuit_input, &artifacts).unwrap());
    });
}

fn bench_groth16_verify(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let setup = setup_circuit("bench", RANGE_BITS, &mut rng).unwrap();

    let commitment = commit(55).unwrap();
    let circuit_input = input::build(55, 0, 100, &commitment).unwrap();
    let bundle = Groth16Backend::new()
        .prove(&circuit_input, &setup.artifacts())
        .unwrap();

    c.bench_function("zkp/groth16_verify", |b| {
        b.iter(|| verify(&bundle.proof, &bundle.public_signals, &setup.verification_key).unwrap());
    });
}

criterion_group!(
    benches,
    bench_commit,
    bench_groth16_setup,
    bench_groth16_prove,
    bench_groth16_verify,
);
criterion_main!(benches);
