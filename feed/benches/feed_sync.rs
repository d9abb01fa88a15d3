use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::thread;

const ITEMS: usize = 100_000;

fn run_feed(capacity: usize, consumers: usize) -> usize {
  let mut next = 0usize;
  let feed = fibre_feed::create(capacity, move || {
    if next < ITEMS {
      next += 1;
      Some(next)
    } else {
      None
    }
  });
  let sessions: Vec<_> = (0..consumers).map(|_| feed.check_in()).collect();
  feed.start().unwrap();

  let handles: Vec<_> = sessions
    .into_iter()
    .map(|consumer| thread::spawn(move || consumer.count()))
    .collect();
  let total = handles.into_iter().map(|h| h.join().unwrap()).sum();
  feed.wait();
  feed.release().unwrap();
  total
}

fn bench_feed(c: &mut Criterion) {
  let mut group = c.benchmark_group("feed_sync");
  group.throughput(Throughput::Elements(ITEMS as u64));
  group.sample_size(10);

  for &capacity in &[1usize, 64, 1024] {
    for &consumers in &[1usize, 4] {
      group.bench_with_input(
        BenchmarkId::new(format!("cap{}", capacity), consumers),
        &(capacity, consumers),
        |b, &(capacity, consumers)| {
          b.iter(|| {
            let total = run_feed(capacity, consumers);
            assert_eq!(total, ITEMS);
          })
        },
      );
    }
  }
  group.finish();
}

criterion_group!(benches, bench_feed);
criterion_main!(benches);
