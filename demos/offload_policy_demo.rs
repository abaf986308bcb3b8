//! Offloading policy demo: per-device placement decisions.
//!
//! Runs the baseline policies on a small batch of synthetic states, one of
//! which is not yet valid (contains NaN), and prints the decoded decisions.
//!
//! Run:
//! ```sh
//! RUST_LOG=debug cargo run --example offload_policy_demo
//! ```
//!
//! With the neural actor and twin critic (requires libtorch):
//! ```sh
//! RUST_LOG=debug cargo run --example offload_policy_demo --features rl-nn
//! ```

use edge_offload::algorithms::rl::{
    sample_preference, LocalOnlyPolicy, OffloadConfig, OffloadPolicy, RandomOffloadPolicy,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn print_decisions(policy: &mut dyn OffloadPolicy, states: &[Vec<f64>], prefs: &[Vec<f64>]) {
    println!("--- {} ---", policy.name());
    match policy.decide(states, prefs) {
        Ok(rows) => {
            for (i, row) in rows.iter().enumerate() {
                match row {
                    Some(decisions) => {
                        for d in decisions {
                            println!("  row {}: {}", i, d);
                        }
                    }
                    None => println!("  row {}: skipped (undefined state)", i),
                }
            }
        }
        Err(e) => println!("  error: {}", e),
    }
    println!();
}

fn main() {
    env_logger::init();
    println!("=== Edge Offloading Policy Demo ===\n");

    let config = OffloadConfig {
        devices: 3,
        servers: 2,
        objectives: 2,
        state_dim: 6,
        ..OffloadConfig::default()
    };

    let mut rng = StdRng::seed_from_u64(42);
    let mut states = vec![
        vec![0.2, 0.4, 0.1, 0.9, 0.5, 0.3],
        vec![0.8, 0.1, 0.6, 0.2, 0.7, 0.4],
        vec![0.5, 0.5, 0.5, 0.5, 0.5, 0.5],
    ];
    states[2][3] = f64::NAN;
    let prefs: Vec<Vec<f64>> = (0..states.len())
        .map(|_| sample_preference(&mut rng, config.objectives))
        .collect();

    println!("Configuration:");
    println!("  Devices: {}", config.devices);
    println!("  Servers: {} (+ local)", config.servers);
    println!("  Objectives: {}", config.objectives);
    println!();

    let mut random = RandomOffloadPolicy::new(config.clone()).expect("valid config");
    print_decisions(&mut random, &states, &prefs);

    let mut local = LocalOnlyPolicy::new(config.clone(), [0.5, 0.5]).expect("valid config");
    print_decisions(&mut local, &states, &prefs);

    #[cfg(feature = "rl-nn")]
    {
        use edge_offload::algorithms::rl::{
            pessimistic_scalarized, rows_to_tensor, HybridPolicy, NeuralOffloadPolicy,
            TwinVectorCritic,
        };
        use tch::Device;

        let device = Device::cuda_if_available();
        let mut neural = NeuralOffloadPolicy::new(config.clone(), device).expect("valid config");
        print_decisions(&mut neural, &states, &prefs);

        println!("=== Actor / Critic ===\n");
        let actor = HybridPolicy::new(config.clone(), device).expect("valid config");
        let critic = TwinVectorCritic::new(config.clone(), device).expect("valid config");

        let state_t = rows_to_tensor("state", &states, config.state_dim).expect("state rows");
        let pref_t =
            rows_to_tensor("preference", &prefs, config.objectives).expect("preference rows");
        let sample = actor.sample(&state_t, &pref_t).expect("sample");
        println!("  retained rows: {:?}", sample.rows);
        println!("  discrete: {:?}", sample.discrete.size());
        println!("  continuous_raw: {:?}", sample.continuous_raw.size());

        let kept = tch::Tensor::from_slice(
            &sample.rows.iter().map(|&r| r as i64).collect::<Vec<_>>(),
        )
        .to_device(device);
        let state_kept = state_t.to_device(device).index_select(0, &kept);
        let pref_kept = pref_t.to_device(device).index_select(0, &kept);
        let (q1, q2) = critic
            .estimate(&state_kept, &sample.continuous, &sample.discrete, &pref_kept)
            .expect("estimate");
        println!("  q1: {:?}, q2: {:?}", q1.size(), q2.size());
        pessimistic_scalarized(&q1, &q2, &pref_kept).print();
    }
}
