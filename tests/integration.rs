//! End-to-end pipeline tests (Builder -> TreeHandle -> Cursor -> Mutator),
//! covering the numbered scenarios of spec §8.

use prolly_tree::{Builder, CacheConfig, CachingStore, ChunkStrategy, MemoryStore, ProllyError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn store() -> Arc<CachingStore<MemoryStore>> {
    Arc::new(CachingStore::new(MemoryStore::new(), CacheConfig::default()))
}

fn random_pairs(rng: &mut StdRng, n: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut pairs: Vec<(Vec<u8>, Vec<u8>)> = (0..n)
        .map(|_| {
            let key: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
            let value_len = rng.gen_range(16..=64);
            let value: Vec<u8> = (0..value_len).map(|_| rng.gen()).collect();
            (key, value)
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs.dedup_by(|a, b| a.0 == b.0);
    pairs
}

/// S1 Round-trip 100 000.
#[test]
fn s1_round_trip_one_hundred_thousand() {
    let mut rng = StdRng::seed_from_u64(42);
    let pairs = random_pairs(&mut rng, 100_000);

    let mut builder = Builder::new(store(), ChunkStrategy::default(), None).unwrap();
    for (k, v) in &pairs {
        builder.append(k.clone(), v.clone()).unwrap();
    }
    let (tree, _digest) = builder.build().unwrap();

    assert_eq!(tree.first_key().unwrap().as_deref(), Some(pairs[0].0.as_slice()));
    assert_eq!(tree.last_key().unwrap().as_deref(), Some(pairs.last().unwrap().0.as_slice()));
    assert_eq!(tree.tree_count(), pairs.len() as u64);

    for _ in 0..1000 {
        let idx = rng.gen_range(0..pairs.len());
        let (k, v) = &pairs[idx];
        assert_eq!(&tree.get(k).unwrap(), v);
    }
}

/// S2 Proof at root.
#[test]
fn s2_proof_at_root() {
    let mut rng = StdRng::seed_from_u64(7);
    let pairs = random_pairs(&mut rng, 5_000);

    let mut builder = Builder::new(store(), ChunkStrategy::default(), None).unwrap();
    for (k, v) in &pairs {
        builder.append(k.clone(), v.clone()).unwrap();
    }
    let (tree, _digest) = builder.build().unwrap();

    let first_key = tree.first_key().unwrap().unwrap();
    let proof = tree.get_proof(&first_key).unwrap();
    let root_digest = proof.frames[0].digest;
    assert_eq!(tree.header().root_digest, root_digest);

    let value = tree.get(&first_key).unwrap();
    assert!(proof.verify(root_digest, &first_key, &value));
}

/// S3 Reload isolation.
#[test]
fn s3_reload_isolation() {
    let s = store();
    let mut rng = StdRng::seed_from_u64(11);
    let pairs = random_pairs(&mut rng, 2_000);

    let mut builder = Builder::new(s.clone(), ChunkStrategy::default(), None).unwrap();
    for (k, v) in &pairs {
        builder.append(k.clone(), v.clone()).unwrap();
    }
    let (tree, tree_digest) = builder.build().unwrap();

    let mutated_key = pairs[500].0.clone();
    let new_value = b"s3-new-value".to_vec();
    let mut mutation = tree.mutate();
    mutation.put(mutated_key.clone(), new_value.clone()).unwrap();
    let new_digest = mutation.rebuild().unwrap();

    let old_view = prolly_tree::TreeHandle::load(tree_digest, s.clone()).unwrap();
    let new_view = prolly_tree::TreeHandle::load(new_digest, s).unwrap();

    for (k, v) in &pairs {
        assert_eq!(&old_view.get(k).unwrap(), v);
    }
    assert_eq!(new_view.get(&mutated_key).unwrap(), new_value);
}

/// S4 Delete tail.
#[test]
fn s4_delete_tail() {
    let s = store();
    let keys: Vec<Vec<u8>> = (0..10_000u32).map(|i| format!("key-{i:06}").into_bytes()).collect();
    let values: Vec<Vec<u8>> = (0..10_000u32).map(|i| format!("val-{i}").into_bytes()).collect();

    let mut builder = Builder::new(s.clone(), ChunkStrategy::default(), None).unwrap();
    for (k, v) in keys.iter().zip(values.iter()) {
        builder.append(k.clone(), v.clone()).unwrap();
    }
    let (tree, _digest) = builder.build().unwrap();

    let mut mutation = tree.mutate();
    for k in &keys[5000..] {
        mutation.delete(k.clone()).unwrap();
    }
    mutation.rebuild().unwrap();

    for i in 5000..10_000usize {
        assert!(matches!(tree.get(&keys[i]), Err(ProllyError::KeyNotFound)));
    }
    for i in 0..5000usize {
        assert_eq!(tree.get(&keys[i]).unwrap(), values[i]);
    }
}

/// S5 Critical prefix.
#[test]
fn s5_critical_prefix() {
    let s = store();
    let mut keys: Vec<Vec<u8>> = vec![vec![0x00], vec![0x00, 0x01], vec![0x00, 0x01, 0x0C]];
    for suffix in 0x65u8..=0x68u8 {
        keys.push(vec![0x00, 0x75, 0x73, suffix]);
    }
    keys.sort();

    let mut builder = Builder::new(s, ChunkStrategy::default(), None).unwrap();
    for k in &keys {
        builder.append(k.clone(), k.clone()).unwrap();
    }
    let (tree, _digest) = builder.build().unwrap();

    let lo = vec![0x00, 0x75, 0x73, 0x64];
    let hi = vec![0x00, 0x75, 0x73, 0x69];
    let found: Vec<Vec<u8>> = tree.search(&lo, &hi).unwrap().map(|r| r.unwrap().0).collect();

    let expected: Vec<Vec<u8>> = (0x65u8..=0x68u8).map(|suffix| vec![0x00, 0x75, 0x73, suffix]).collect();
    assert_eq!(found, expected);
}

/// S6 Determinism across orders: two independent builders over the same
/// sorted input produce identical roots.
#[test]
fn s6_determinism_across_builds() {
    let mut rng = StdRng::seed_from_u64(99);
    let pairs = random_pairs(&mut rng, 3_000);

    let build_once = || {
        let mut builder = Builder::new(store(), ChunkStrategy::default(), None).unwrap();
        for (k, v) in &pairs {
            builder.append(k.clone(), v.clone()).unwrap();
        }
        builder.build().unwrap().0.header().root_digest
    };

    assert_eq!(build_once(), build_once());
}

/// Property 7 (mutation equivalence), exercised directly against the public
/// API rather than the mutator module's own unit tests.
#[test]
fn mutation_equivalence_against_public_api() {
    let s = store();
    let base: Vec<(Vec<u8>, Vec<u8>)> =
        (0..1000u32).map(|i| (format!("k-{i:05}").into_bytes(), format!("v-{i}").into_bytes())).collect();

    let mut builder = Builder::new(s.clone(), ChunkStrategy::default(), None).unwrap();
    for (k, v) in &base {
        builder.append(k.clone(), v.clone()).unwrap();
    }
    let (tree, _digest) = builder.build().unwrap();

    let mut mutation = tree.mutate();
    for i in (0..1000u32).step_by(10) {
        mutation.delete(format!("k-{i:05}").into_bytes()).unwrap();
    }
    for i in 1000..1010u32 {
        mutation.put(format!("k-{i:05}").into_bytes(), format!("v-{i}").into_bytes()).unwrap();
    }
    mutation.rebuild().unwrap();

    let mut expected_builder = Builder::new(store(), ChunkStrategy::default(), None).unwrap();
    for i in 0..1010u32 {
        if i < 1000 && i % 10 == 0 {
            continue;
        }
        expected_builder
            .append(format!("k-{i:05}").into_bytes(), format!("v-{i}").into_bytes())
            .unwrap();
    }
    let (expected_tree, _digest) = expected_builder.build().unwrap();

    assert_eq!(tree.header().root_digest, expected_tree.header().root_digest);
}
