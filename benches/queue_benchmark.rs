use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;

use failsafe_queue::{
    EntryPayload, IdGenerator, MsgUnit, Priority, QueueConfig, QueueEntry, RamQueue, StorageId,
    StorageQueue,
};

fn create_entries(ids: &IdGenerator, count: usize) -> Vec<Arc<QueueEntry>> {
    (0..count)
        .map(|i| {
            let prio = Priority::new((i % 10) as i64).unwrap();
            let unit = MsgUnit::new(format!("key-{i}"), vec![0u8; 256], "");
            Arc::new(QueueEntry::new(ids, prio, i % 2 == 0, EntryPayload::Publish(unit)))
        })
        .collect()
}

fn create_queue(max_entries: u64) -> RamQueue {
    RamQueue::new(
        StorageId::new("bench", "queue").unwrap(),
        QueueConfig::with_limits(max_entries, u64::MAX),
    )
    .unwrap()
}

fn bench_put_take(c: &mut Criterion) {
    let mut group = c.benchmark_group("ram_queue_put_take");

    for &size in [1000usize, 10_000].iter() {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("put_then_drain", size), &size, |b, &size| {
            let ids = IdGenerator::new();
            let entries = create_entries(&ids, size);
            let queue = create_queue(size as u64);

            b.iter(|| {
                for entry in &entries {
                    queue.put(Arc::clone(entry), true).unwrap();
                }
                black_box(queue.take(-1, -1).unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("put_all_batch", size), &size, |b, &size| {
            let ids = IdGenerator::new();
            let entries = create_entries(&ids, size);
            let queue = create_queue(size as u64);

            b.iter(|| {
                queue.put_all(&entries, true).unwrap();
                black_box(queue.clear());
            });
        });
    }

    group.finish();
}

fn bench_peek(c: &mut Criterion) {
    let mut group = c.benchmark_group("ram_queue_peek");
    let ids = IdGenerator::new();
    let entries = create_entries(&ids, 10_000);
    let queue = create_queue(10_000);
    queue.put_all(&entries, true).unwrap();

    group.bench_function("peek_same_priority_100", |b| {
        b.iter(|| black_box(queue.peek_same_priority(100, -1)));
    });
    group.bench_function("peek_range_bytes_64k", |b| {
        b.iter(|| black_box(queue.peek_range(-1, 64 * 1024, 3, 7)));
    });
    group.bench_function("peek_lowest_100", |b| {
        b.iter(|| black_box(queue.peek_lowest(100, -1, None, true)));
    });

    group.finish();
}

criterion_group!(benches, bench_put_take, bench_peek);
criterion_main!(benches);
