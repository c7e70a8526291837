use super::*;

#[test]
fn test_table_push_get() {
    let mut table: Table<u64> = Table::new(10 * 1024, 4);
    assert!(table.is_empty());

    let size = Table::entry_size(&0_u64).unwrap();
    assert_eq!(size % 8, 0);
    assert!(size >= 8 + SLOT_OVERHEAD);

    let mut indices = vec![];
    for value in 0..10_u64 {
        indices.push(table.push(value * 10).unwrap());
    }
    assert_eq!(table.len(), 10);
    assert_eq!(table.to_chunks().len(), 3);
    assert_eq!(table.to_used(), size * 10);
    assert_eq!(table.to_remaining(), (10 * 1024) - (size * 10));

    for (i, index) in indices.into_iter().enumerate() {
        assert_eq!(index.to_offset(), i);
        assert_eq!(*table.get(index).unwrap(), (i as u64) * 10);
        assert_eq!(table.to_ref_count(index).unwrap(), 0);
    }
    match table.get(EnumIndex::new(10)) {
        Err(Error::KeyNotFound(_, _)) => (),
        res => panic!("unexpected {:?}", res),
    }
}

#[test]
fn test_table_exhausted() {
    let size = Table::entry_size(&0_u64).unwrap();
    let mut table: Table<u64> = Table::new(size * 2, 1024);
    table.push(1).unwrap();
    table.push(2).unwrap();
    match table.push(3) {
        Err(Error::Exhausted(_, _)) => (),
        res => panic!("unexpected {:?}", res),
    }
    assert_eq!(table.len(), 2);

    assert_eq!(table.grow(size, u64::MAX), size * 3);
    table.push(3).unwrap();
    // growth is capped.
    assert_eq!(table.grow(size * 100, size * 4), size * 4);
    // capacity never drops below the current limit.
    assert_eq!(table.grow(size, size * 2), size * 4);
    assert_eq!(table.grow(0, 0), size * 4);
}

#[test]
fn test_table_ref_count() {
    let mut table: Table<String> = Table::new(1024, 2);
    let index = table.push("hello".to_string()).unwrap();

    assert_eq!(table.inc_ref_count(index).unwrap(), 1);
    assert_eq!(table.inc_ref_count(index).unwrap(), 2);
    assert_eq!(table.dec_ref_count(index).unwrap(), 1);
    assert_eq!(table.to_live_bytes(), table.to_used());
    assert_eq!(table.dec_ref_count(index).unwrap(), 0);
    assert_eq!(table.to_live_bytes(), 0);
    match table.dec_ref_count(index) {
        Err(Error::Fatal(_, _)) => (),
        res => panic!("unexpected {:?}", res),
    }
    assert_eq!(table.to_ref_count(index).unwrap(), 0);

    table.set_ref_count(index, 10).unwrap();
    assert_eq!(table.to_total_ref_count(), 10);
}

#[test]
fn test_table_hold_release() {
    let mut table: Table<u64> = Table::new(1024, 2);
    let (a, b) = (table.push(1).unwrap(), table.push(2).unwrap());
    table.inc_ref_count(b).unwrap();

    assert!(table.hold(b, 1).is_err());
    let size = table.hold(a, 1).unwrap();
    assert_eq!(table.to_held(), size);
    assert_eq!(table.to_slot(a).unwrap().state, State::Held(1));

    // held entries can't be revived.
    assert!(table.inc_ref_count(a).is_err());
    assert!(table.release(b).is_err());

    table.release(a).unwrap();
    assert_eq!(table.to_held(), 0);
    assert_eq!(table.to_dead(), size);
    assert_eq!(table.to_slot(a).unwrap().state, State::Dead);
    assert!(table.release(a).is_err());
    // value is still readable, until compaction.
    assert_eq!(*table.get(a).unwrap(), 1);
}

#[test]
fn test_table_shared_chunks() {
    let mut table: Table<u64> = Table::new(1024, 4);
    table.push(1).unwrap();
    table.push(2).unwrap();

    let snapshot = table.to_chunks();
    table.push(3).unwrap();
    // snapshot is not affected by appends.
    assert_eq!(snapshot[0].as_slice(), &[1, 2]);
    assert_eq!(table.to_chunks()[0].as_slice(), &[1, 2, 3]);
}
