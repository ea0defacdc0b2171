mod common;

use std::sync::Arc;

use common::{keys, priorities, publish, ram_queue, sized};
use failsafe_queue::{
    EntryId, EntryPayload, IdGenerator, MsgUnit, Priority, QueueEntry, StorageQueue, Timestamp,
};

#[test]
fn mixed_priorities_drain_highest_first_then_oldest() {
    let ids = IdGenerator::new();
    let q = ram_queue(100, 100_000);
    for (prio, key) in [(5, "a"), (9, "b"), (5, "c"), (1, "d")] {
        q.put(publish(&ids, prio, key), false).unwrap();
    }

    let taken = q.take_range(4, -1, 0, 9).unwrap();
    assert_eq!(priorities(&taken), vec![9, 5, 5, 1]);
    assert_eq!(keys(&taken), vec!["b", "a", "c", "d"]);
    assert_eq!(q.entry_count(), 0);
}

#[test]
fn single_takes_drain_in_sort_order() {
    let ids = IdGenerator::new();
    let q = ram_queue(1000, 10_000_000);
    let prios = [3u8, 7, 0, 9, 5, 5, 7, 1, 9, 3, 2, 8, 4, 6, 0];
    for (i, prio) in prios.iter().enumerate() {
        q.put(publish(&ids, *prio, &i.to_string()), false).unwrap();
    }

    let mut drained = Vec::new();
    loop {
        let taken = q.take_range(1, -1, 0, 9).unwrap();
        if taken.is_empty() {
            break;
        }
        drained.extend(taken);
    }

    assert_eq!(drained.len(), prios.len());
    for pair in drained.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.priority() >= b.priority());
        if a.priority() == b.priority() {
            assert!(a.created_at() <= b.created_at());
        }
    }
}

#[test]
fn equal_timestamps_fall_back_to_id() {
    let q = ram_queue(10, 10_000);
    let ts = Timestamp::from_nanos(1_000);
    let mk = |id: u64| {
        Arc::new(QueueEntry::with_identity(
            EntryId::from_raw(id),
            ts,
            Priority::NORM,
            false,
            EntryPayload::Publish(MsgUnit::new(id.to_string(), "", "")),
        ))
    };
    q.put(mk(3), false).unwrap();
    q.put(mk(1), false).unwrap();
    q.put(mk(2), false).unwrap();

    let taken = q.take(-1, -1).unwrap();
    assert_eq!(keys(&taken), vec!["1", "2", "3"]);
}

#[test]
fn peek_range_filters_priorities() {
    let ids = IdGenerator::new();
    let q = ram_queue(100, 100_000);
    for (prio, key) in [(9, "a"), (7, "b"), (5, "c"), (3, "d"), (1, "e")] {
        q.put(publish(&ids, prio, key), false).unwrap();
    }

    let ret = q.peek_range(-1, -1, 3, 7);
    assert_eq!(keys(&ret.entries), vec!["b", "c", "d"]);
    assert_eq!(ret.count_entries, 3);
    assert_eq!(
        ret.count_bytes,
        ret.entries.iter().map(|e| e.size_in_bytes()).sum::<u64>()
    );
    // Peeking leaves everything in place.
    assert_eq!(q.entry_count(), 5);
}

#[test]
fn same_priority_reads_only_the_head_band() {
    let ids = IdGenerator::new();
    let q = ram_queue(100, 100_000);
    for (prio, key) in [(7, "a"), (5, "b"), (7, "c"), (7, "d")] {
        q.put(publish(&ids, prio, key), false).unwrap();
    }

    let peeked = q.peek_same_priority(-1, -1);
    assert_eq!(keys(&peeked), vec!["a", "c", "d"]);

    let taken = q.take_same_priority(2, -1).unwrap();
    assert_eq!(keys(&taken), vec!["a", "c"]);
    let taken = q.take_same_priority(-1, -1).unwrap();
    assert_eq!(keys(&taken), vec!["d"]);
    let taken = q.take_same_priority(-1, -1).unwrap();
    assert_eq!(keys(&taken), vec!["b"]);
}

#[test]
fn byte_limit_stops_before_exceeding_but_returns_first() {
    let ids = IdGenerator::new();
    let q = ram_queue(100, 100_000);
    for _ in 0..3 {
        q.put(sized(&ids, 5, false, 400), false).unwrap();
    }

    // The head alone is larger than the limit and is still returned.
    assert_eq!(q.peek_n(-1, 100).len(), 1);
    assert_eq!(q.peek_n(-1, 799).len(), 1);
    assert_eq!(q.peek_n(-1, 800).len(), 2);
    assert_eq!(q.peek_n(2, -1).len(), 2);
    assert!(q.peek_n(0, -1).is_empty());
}

#[test]
fn peek_returns_head() {
    let ids = IdGenerator::new();
    let q = ram_queue(10, 10_000);
    assert!(q.peek().is_none());
    q.put(publish(&ids, 3, "low"), false).unwrap();
    q.put(publish(&ids, 8, "high"), false).unwrap();
    assert_eq!(q.peek().unwrap().key_oid(), Some("high"));
}

#[test]
fn take_lowest_walks_from_the_tail() {
    let ids = IdGenerator::new();
    let q = ram_queue(100, 100_000);
    for (prio, key) in [(9, "a"), (5, "b"), (5, "c"), (1, "d")] {
        q.put(publish(&ids, prio, key), false).unwrap();
    }

    let peeked = q.peek_lowest(2, -1, None, false);
    assert_eq!(keys(&peeked), vec!["d", "c"]);
    assert_eq!(q.entry_count(), 4);

    let taken = q.take_lowest(2, -1, None, false).unwrap();
    assert_eq!(keys(&taken), vec!["d", "c"]);
    assert_eq!(keys(&q.peek_n(-1, -1)), vec!["a", "b"]);
}

#[test]
fn take_lowest_stops_at_boundary() {
    let ids = IdGenerator::new();
    let q = ram_queue(100, 100_000);
    let entries: Vec<_> = [(9, "a"), (7, "b"), (5, "c"), (3, "d")]
        .into_iter()
        .map(|(p, k)| publish(&ids, p, k))
        .collect();
    q.put_all(&entries, false).unwrap();

    let taken = q.take_lowest(-1, -1, Some(&entries[1]), false).unwrap();
    assert_eq!(keys(&taken), vec!["d", "c"]);
    assert_eq!(keys(&q.peek_n(-1, -1)), vec!["a", "b"]);
}

#[test]
fn take_lowest_leave_one_keeps_single_entry() {
    let ids = IdGenerator::new();
    let q = ram_queue(10, 10_000);
    let only = publish(&ids, 5, "only");
    q.put(Arc::clone(&only), false).unwrap();

    let taken = q.take_lowest(1, -1, None, true).unwrap();
    assert!(taken.is_empty());
    assert_eq!(q.entry_count(), 1);
    assert!(only.is_stored());
}

#[test]
fn take_lowest_leave_one_on_larger_queue() {
    let ids = IdGenerator::new();
    let q = ram_queue(10, 10_000);
    for key in ["a", "b", "c"] {
        q.put(publish(&ids, 5, key), false).unwrap();
    }

    let taken = q.take_lowest(-1, -1, None, true).unwrap();
    assert_eq!(keys(&taken), vec!["c", "b"]);
    assert_eq!(keys(&q.peek_n(-1, -1)), vec!["a"]);

    // Without the full queue being selected, nothing is held back.
    q.put(publish(&ids, 5, "d"), false).unwrap();
    let taken = q.take_lowest(1, -1, None, true).unwrap();
    assert_eq!(keys(&taken), vec!["d"]);
}

#[test]
fn lowest_with_both_limits_uses_the_looser_one() {
    let ids = IdGenerator::new();
    let q = ram_queue(10, 10_000);
    for _ in 0..4 {
        q.put(sized(&ids, 5, false, 100), false).unwrap();
    }
    // One entry allowed by count, but 300 bytes allowed by size.
    assert_eq!(q.peek_lowest(1, 300, None, false).len(), 3);
    // Byte limit alone.
    assert_eq!(q.peek_lowest(-1, 150, None, false).len(), 2);
}

#[test]
fn entries_from_separate_generators_are_all_kept() {
    let first = IdGenerator::new();
    let second = IdGenerator::new();
    let q = ram_queue(100, 100_000);
    for i in 0..10 {
        q.put(publish(&first, 5, &format!("a{i}")), false).unwrap();
        q.put(publish(&second, 5, &format!("b{i}")), false).unwrap();
    }
    assert_eq!(q.entry_count(), 20);
    assert_eq!(q.take(-1, -1).unwrap().len(), 20);
}
