//! Integration-level determinism checks for RngManager.
//!
//! Unit tests in `rng/xorshift.rs` cover individual distributions; these
//! tests check that a full mixed sequence of calls replays identically,
//! which is what the orchestrator actually relies on for deterministic
//! simulation replay.

use payment_simulator_core_rs::RngManager;

#[test]
fn mixed_call_sequence_replays_identically() {
    let mut rng_a = RngManager::new(2026);
    let mut rng_b = RngManager::new(2026);

    for i in 0..500 {
        assert_eq!(rng_a.next().unwrap(), rng_b.next().unwrap());
        assert_eq!(rng_a.next_f64().unwrap(), rng_b.next_f64().unwrap());
        assert_eq!(rng_a.range(0, 1000).unwrap(), rng_b.range(0, 1000).unwrap());
        assert_eq!(
            rng_a.poisson(1.5 + (i % 5) as f64).unwrap(),
            rng_b.poisson(1.5 + (i % 5) as f64).unwrap()
        );
        assert_eq!(rng_a.get_state(), rng_b.get_state());
    }
}

#[test]
fn resuming_from_checkpointed_state_continues_the_same_sequence() {
    let mut rng = RngManager::new(777);
    for _ in 0..50 {
        rng.next().unwrap();
    }
    let checkpoint_state = rng.get_state();

    let expected: Vec<u64> = (0..20).map(|_| rng.next().unwrap()).collect();

    let mut resumed = RngManager::new(checkpoint_state);
    let actual: Vec<u64> = (0..20).map(|_| resumed.next().unwrap()).collect();

    assert_eq!(expected, actual, "resuming from checkpointed state must reproduce the same sequence");
}

#[test]
fn different_seeds_diverge() {
    let mut rng_a = RngManager::new(1);
    let mut rng_b = RngManager::new(2);

    let seq_a: Vec<u64> = (0..10).map(|_| rng_a.next().unwrap()).collect();
    let seq_b: Vec<u64> = (0..10).map(|_| rng_b.next().unwrap()).collect();

    assert_ne!(seq_a, seq_b);
}
