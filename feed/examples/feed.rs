// examples/feed.rs
use fibre_feed::{generator, FeedBuilder};
use std::{
  sync::atomic::{AtomicUsize, Ordering},
  sync::Arc,
  thread,
  time::Duration,
};
use tracing_subscriber::EnvFilter;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
    .with_thread_names(true)
    .init();

  println!("--- Feed: counting generator, 3 consumers ---");
  {
    let mut next = 0u64;
    let feed = fibre_feed::create(4, move || {
      if next >= 20 {
        return None;
      }
      next += 1;
      thread::sleep(Duration::from_millis(5));
      Some(next)
    });

    let processed = Arc::new(AtomicUsize::new(0));
    let consumers: Vec<_> = (0..3).map(|_| feed.check_in()).collect();
    feed.start().expect("failed to start producer");

    let handles: Vec<_> = consumers
      .into_iter()
      .enumerate()
      .map(|(id, mut consumer)| {
        let processed = Arc::clone(&processed);
        thread::spawn(move || {
          while let Some(item) = consumer.get_item() {
            println!("[Consumer {}] Got item {}", id, item);
            processed.fetch_add(1, Ordering::Relaxed);
            thread::sleep(Duration::from_millis(10 + id as u64 * 5));
          }
          println!("[Consumer {}] End of stream, checking out.", id);
          consumer.check_out();
        })
      })
      .collect();

    feed.wait();
    println!("[Controller] Feed finished: {:?}", feed.stats());
    for handle in handles {
      handle.join().unwrap();
    }
    assert_eq!(processed.load(Ordering::Relaxed), 20);
    feed.release().expect("feed should be quiescent");
  }

  println!("\n--- Feed: iterator generator, configured producer thread ---");
  {
    let words = "the quick brown fox jumps over the lazy dog";
    let feed = FeedBuilder::new(2)
      .thread_name("word-producer")
      .build(generator::from_iter(words.split_whitespace().map(str::to_owned)))
      .expect("valid configuration");

    let consumers: Vec<_> = (0..2).map(|_| feed.check_in()).collect();
    feed.start().expect("failed to start producer");

    let handles: Vec<_> = consumers
      .into_iter()
      .enumerate()
      .map(|(id, consumer)| {
        thread::spawn(move || {
          for word in consumer {
            println!("[Consumer {}] {}", id, word.to_uppercase());
          }
        })
      })
      .collect();

    while !feed.is_finished() {
      thread::sleep(Duration::from_millis(1));
    }
    for handle in handles {
      handle.join().unwrap();
    }
    feed.release().expect("feed should be quiescent");
  }
}
