use std::thread;

use super::*;

#[test]
fn test_generation_guard() {
    let handler = GenerationHandler::default();
    assert_eq!(handler.to_current(), 0);
    assert_eq!(handler.oldest_used(), 0);

    let g0 = handler.take_guard();
    assert_eq!(g0.to_generation(), 0);
    assert_eq!(handler.inc_generation(), 1);
    assert_eq!(handler.inc_generation(), 2);

    let g2a = handler.take_guard();
    let g2b = handler.clone().take_guard();
    assert_eq!(handler.to_reader_count(), 3);
    assert_eq!(handler.oldest_used(), 0);

    drop(g0);
    assert_eq!(handler.oldest_used(), 2);
    drop(g2a);
    assert_eq!(handler.oldest_used(), 2);
    assert_eq!(handler.inc_generation(), 3);
    drop(g2b);
    assert_eq!(handler.to_reader_count(), 0);
    assert_eq!(handler.oldest_used(), 3);
}

#[test]
fn test_generation_threads() {
    let handler = GenerationHandler::default();

    let mut handles = vec![];
    for _ in 0..8 {
        let handler = handler.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..1000 {
                let guard = handler.take_guard();
                assert!(handler.oldest_used() <= guard.to_generation());
            }
        }));
    }
    for _ in 0..1000 {
        handler.inc_generation();
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(handler.to_reader_count(), 0);
    assert_eq!(handler.oldest_used(), 1000);
}

#[test]
fn test_hold_list() {
    let mut list: HoldList<&str> = HoldList::default();
    assert!(list.is_empty());

    list.hold(1, 10, "a");
    list.hold(1, 20, "b");
    list.hold(3, 30, "c");
    assert_eq!(list.len(), 3);
    assert_eq!(list.to_held_bytes(), 60);

    // items released at generation 1 are still visible to readers at 1.
    assert!(list.trim(1).is_empty());
    assert_eq!(list.trim(2), vec!["a", "b"]);
    assert_eq!(list.to_held_bytes(), 30);
    assert!(list.trim(3).is_empty());

    list.hold(4, 40, "d");
    assert_eq!(list.clear(), vec!["c", "d"]);
    assert_eq!(list.to_held_bytes(), 0);
    assert!(list.is_empty());
}
