use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::thread;

use super::*;
use crate::store::{Config, EnumStore, NumericStore, PendingChange, StringStore};

#[test]
fn test_reader_snapshot() {
    let s = |x: &str| x.to_string();

    let mut store: StringStore = EnumStore::new(&Config::new("test_reader_snapshot"));
    let r0 = store.reader();
    assert!(r0.is_empty());

    let mut w = store.batch_updater();
    let a = w.add(s("alpha")).unwrap();
    w.inc_ref_count(a).unwrap();
    w.commit().unwrap();

    let r1 = store.reader();
    assert_eq!(r1.len(), 1);
    assert_eq!(r1.to_generation(), r0.to_generation() + 1);
    assert!(r0.find(&s("alpha")).is_none());
    assert!(r0.get(a).is_err());
    assert_eq!(r1.find(&s("alpha")), Some(a));
    assert_eq!(r1.get(a).unwrap(), "alpha");

    // release alpha, readers bound to older generations still see it.
    let mut w = store.batch_updater();
    w.dec_ref_count(a).unwrap();
    let b = w.add(s("Alpha")).unwrap();
    w.inc_ref_count(b).unwrap();
    w.commit().unwrap();

    let r2 = store.reader();
    assert_eq!(r1.find(&s("alpha")), Some(a));
    assert_eq!(r1.get(a).unwrap(), "alpha");
    assert_eq!(r2.find(&s("alpha")), None);
    assert_eq!(r2.find_folded(&s("ALPHA")), vec![(s("Alpha"), b)]);

    let stats = store.to_stats();
    assert_eq!(stats.n_readers, 3);
    assert_eq!(stats.oldest_used, r0.to_generation());
    assert!(stats.held > 0);

    drop(r0);
    drop(r1);
    store.remove_all_old_generations().unwrap();
    let stats = store.to_stats();
    assert_eq!(stats.held, 0);
    assert_eq!(stats.dead, stats.used / 2);
    assert_eq!(stats.n_readers, 1);
    store.validate().unwrap();
}

#[test]
fn test_reader_scan() {
    let mut config = Config::new("test_reader_scan");
    config.set_fast_search(false);

    let mut store: NumericStore<u64> = EnumStore::new(&config);
    let mut w = store.batch_updater();
    for value in (0..100_u64).rev() {
        let index = w.add(value * 2).unwrap();
        w.inc_ref_count(index).unwrap();
    }
    w.commit().unwrap();

    let reader = store.reader();
    for value in 0..200_u64 {
        let index = reader.find(&value);
        assert_eq!(index, store.find_index(&value));
        match index {
            Some(index) => assert_eq!(*reader.get(index).unwrap(), value),
            None => assert_eq!(value % 2, 1),
        }
    }
    let values: Vec<u64> = reader.iter().map(|(v, _)| v).collect();
    assert_eq!(values, (0..100).map(|v| v * 2).collect::<Vec<u64>>());
}

#[test]
fn test_concurrent_readers() {
    let seed: u64 = random();
    println!("test_concurrent_readers seed:{}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    let (n_readers, n_cycles, n_values) = (4, 200, 128_u64);

    let mut config = Config::new("test_concurrent_readers");
    config.set_chunk_size(16);
    let mut store: NumericStore<u64> = EnumStore::new(&config);
    let readers = store.to_readers();

    let mut handles = vec![];
    for id in 0..n_readers {
        let readers = readers.clone();
        let seed = seed.wrapping_add(id * 100);
        handles.push(thread::spawn(move || {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut n_reads = 0;
            loop {
                let reader = readers.reader();
                // every index in the snapshot resolves to its own value.
                for (value, index) in reader.iter() {
                    assert_eq!(*reader.get(index).unwrap(), value);
                }
                let value = rng.gen::<u64>() % n_values;
                if let Some(index) = reader.find(&value) {
                    assert_eq!(*reader.get(index).unwrap(), value);
                }
                n_reads += 1;
                if reader.find(&u64::MAX).is_some() {
                    break n_reads;
                }
            }
        }));
    }

    let mut docs: Vec<Option<EnumIndex>> = vec![None; 16];
    for _ in 0..n_cycles {
        let doc = rng.gen::<usize>() % docs.len();
        let mut changes = vec![PendingChange::new(rng.gen::<u64>() % n_values)];
        if rng.gen::<u8>() % 32 == 0 {
            store.set_pending_compact();
        }

        let mut w = store.batch_updater();
        w.insert_new_unique_values(&mut changes, &mut docs).unwrap();
        let index = w.resolve(&mut changes[0]).unwrap();
        w.inc_ref_count(index).unwrap();
        if let Some(old) = docs[doc].replace(index) {
            w.dec_ref_count(old).unwrap();
        }
        w.commit().unwrap();
    }

    // signal readers to exit.
    let mut w = store.batch_updater();
    let index = w.add(u64::MAX).unwrap();
    w.inc_ref_count(index).unwrap();
    w.commit().unwrap();

    for handle in handles {
        assert!(handle.join().unwrap() > 0);
    }

    store.remove_all_old_generations().unwrap();
    let stats = store.to_stats();
    assert_eq!(stats.n_readers, 0);
    assert_eq!(stats.held, 0);
    store.validate().unwrap();
}
