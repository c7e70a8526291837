use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::collections::BTreeMap;

use super::*;
use crate::store::{FoldedOrder, NaturalOrder};

#[test]
fn test_dict_insert_find() {
    let mut dict: Dict<u64, NaturalOrder> = Dict::default();
    assert!(dict.is_empty());
    assert_eq!(dict.find(&10), None);

    for (i, value) in [50_u64, 10, 40, 20, 30].iter().enumerate() {
        dict.insert(*value, EnumIndex::new(i as u32)).unwrap();
    }
    assert_eq!(dict.len(), 5);
    dict.validate().unwrap();

    assert_eq!(dict.find(&40), Some(EnumIndex::new(2)));
    assert_eq!(dict.scan(&40), Some(EnumIndex::new(2)));
    assert_eq!(dict.find(&45), None);
    assert_eq!(dict.scan(&45), None);
    assert_eq!(dict.scan(&100), None);

    match dict.insert(20, EnumIndex::new(10)) {
        Err(Error::Fatal(_, _)) => (),
        res => panic!("unexpected {:?}", res),
    }
    assert_eq!(dict.len(), 5);
    assert_eq!(dict.find(&20), Some(EnumIndex::new(3)));

    let values: Vec<u64> = dict.iter().map(|(v, _)| v).collect();
    assert_eq!(values, vec![10, 20, 30, 40, 50]);
}

#[test]
fn test_dict_snapshot() {
    let mut dict: Dict<u64, NaturalOrder> = Dict::default();
    for value in 0..100_u64 {
        dict.insert(value, EnumIndex::new(value as u32)).unwrap();
    }

    let snapshot = dict.clone();
    let iter = dict.iter();
    for value in (0..100_u64).filter(|v| v % 2 == 0) {
        assert_eq!(dict.remove(&value).unwrap(), Some(EnumIndex::new(value as u32)));
    }
    dict.insert(1000, EnumIndex::new(1000)).unwrap();
    dict.validate().unwrap();

    // snapshot and the iterator are not affected by later mutations.
    assert_eq!(snapshot.len(), 100);
    snapshot.validate().unwrap();
    assert_eq!(iter.count(), 100);
    assert_eq!(snapshot.find(&2), Some(EnumIndex::new(2)));

    assert_eq!(dict.len(), 51);
    assert_eq!(dict.find(&2), None);
    assert_eq!(dict.find(&1000), Some(EnumIndex::new(1000)));
}

#[test]
fn test_dict_find_folded() {
    let s = |x: &str| x.to_string();

    let mut dict: Dict<String, FoldedOrder> = Dict::default();
    let values = ["foo", "Foo", "FOO", "bar", "fooo", "Bar", "baz", "fo"];
    for (i, value) in values.iter().enumerate() {
        dict.insert(s(value), EnumIndex::new(i as u32)).unwrap();
    }
    dict.validate().unwrap();

    let items: Vec<String> = dict.find_folded(&s("foo")).into_iter().map(|(v, _)| v).collect();
    assert_eq!(items, vec![s("FOO"), s("Foo"), s("foo")]);

    let items: Vec<String> = dict.find_folded(&s("BAR")).into_iter().map(|(v, _)| v).collect();
    assert_eq!(items, vec![s("Bar"), s("bar")]);

    assert!(dict.find_folded(&s("qux")).is_empty());
    assert_eq!(dict.find(&s("Foo")), Some(EnumIndex::new(1)));
    assert_eq!(dict.find(&s("fOO")), None);
}

#[test]
fn test_dict_random() {
    let seed: u64 = random();
    println!("test_dict_random seed:{}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut dict: Dict<u64, NaturalOrder> = Dict::default();
    let mut btmap: BTreeMap<u64, EnumIndex> = BTreeMap::new();

    for i in 0..20_000_u32 {
        let value = rng.gen::<u64>() % 2000;
        match rng.gen::<u8>() % 3 {
            0 | 1 if btmap.contains_key(&value) => {
                assert!(dict.insert(value, EnumIndex::new(i)).is_err());
            }
            0 | 1 => {
                dict.insert(value, EnumIndex::new(i)).unwrap();
                btmap.insert(value, EnumIndex::new(i));
            }
            _ => {
                let old = dict.remove(&value).unwrap();
                assert_eq!(old, btmap.remove(&value));
            }
        }
        if i % 1000 == 0 {
            dict.validate().unwrap();
        }
    }

    dict.validate().unwrap();
    assert_eq!(dict.len(), btmap.len());
    let items: Vec<(u64, EnumIndex)> = dict.iter().collect();
    let refs: Vec<(u64, EnumIndex)> = btmap.into_iter().collect();
    assert_eq!(items, refs);
}
