use artree::TreeMap;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};

fn generate_keys(count: usize) -> Vec<[u8; 8]> {
    let mut rng = SmallRng::seed_from_u64(0xdead_beef);
    let mut keys: Vec<[u8; 8]> = (0..count).map(|_| rng.gen()).collect();
    keys.sort_unstable();
    keys.dedup();
    keys.shuffle(&mut rng);
    keys
}

fn build_map(keys: &[[u8; 8]]) -> TreeMap<[u8; 8], u64> {
    let mut map = TreeMap::new();
    for (value, key) in keys.iter().enumerate() {
        map.insert(*key, value as u64);
    }
    map
}

fn bench_insert(c: &mut Criterion) {
    let keys = generate_keys(10_000);

    c.bench_function("insert/10k_random", |b| {
        b.iter_batched(
            TreeMap::<[u8; 8], u64>::new,
            |mut map| {
                for (value, key) in keys.iter().enumerate() {
                    map.insert(*key, value as u64);
                }
                map
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_get(c: &mut Criterion) {
    let keys = generate_keys(10_000);
    let map = build_map(&keys);

    c.bench_function("get/hit", |b| {
        let mut index = 0;
        b.iter(|| {
            index = (index + 1) % keys.len();
            map.get(&keys[index])
        })
    });

    let mut missing = keys.clone();
    for key in &mut missing {
        key[7] ^= 0xff;
    }
    c.bench_function("get/miss", |b| {
        let mut index = 0;
        b.iter(|| {
            index = (index + 1) % missing.len();
            map.get(&missing[index])
        })
    });
}

fn bench_remove(c: &mut Criterion) {
    let keys = generate_keys(10_000);

    c.bench_function("remove/10k_random", |b| {
        b.iter_batched(
            || build_map(&keys),
            |mut map| {
                for key in &keys {
                    map.remove(key);
                }
                map
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_insert, bench_get, bench_remove);
criterion_main!(benches);
