use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::{sync::Arc, thread};

use super::*;

#[test]
fn test_spinlock() {
    let seed: u64 = random();
    println!("test_spinlock seed:{}", seed);

    let (n_readers, n_writes, size) = (4, 10_000, 64);
    let spin = Arc::new(Spinlock::new(Arc::new(vec![0_u64; size])));

    let mut readers = vec![];
    for id in 0..n_readers {
        let spin = Arc::clone(&spin);
        let seed = seed.wrapping_add((id as u64) * 100);
        readers.push(thread::spawn(move || {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut n_reads = 0;
            loop {
                let snapshot = Arc::clone(&spin.read());
                // every snapshot is written as a whole, never partially.
                let first = snapshot[0];
                assert!(snapshot.iter().all(|x| *x == first), "{:?}", snapshot);
                n_reads += 1;
                if first == n_writes {
                    break n_reads;
                }
                if rng.gen::<u8>() % 8 == 0 {
                    thread::yield_now();
                }
            }
        }));
    }

    for i in 1..=n_writes {
        let snapshot = Arc::new(vec![i; size]);
        *spin.write() = snapshot;
    }

    for reader in readers.into_iter() {
        let n_reads = reader.join().unwrap();
        assert!(n_reads > 0);
    }

    let stats = spin.to_stats();
    println!("test_spinlock stats {}", stats);
    assert_eq!(stats.latchlock, 0);
    assert_eq!(stats.write_locks, n_writes as usize);
    assert!(stats.read_locks >= n_readers);
}

#[test]
fn test_spinlock_guards() {
    let spin = Spinlock::new(10_u32);
    {
        let (r1, r2) = (spin.read(), spin.read());
        assert_eq!(*r1 + *r2, 20);
        assert_eq!(spin.to_stats().latchlock, 2);
    }
    {
        let mut w = spin.write();
        *w += 1;
        assert_eq!(spin.to_stats().latchlock, 0xC0000000);
    }
    assert_eq!(*spin.read(), 11);
    assert_eq!(spin.to_stats().latchlock, 0);
}
