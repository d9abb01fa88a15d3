// src/producer.rs

//! The producer side of the feed: the loop run on the dedicated producer
//! thread, the blocking push, and the end-of-stream handshake.

use crate::generator::Generator;
use crate::queue::BoundedQueue;
use crate::shared::FeedShared;
use crate::telemetry;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

/// Body of the producer thread. Polls `generator` until it is exhausted and
/// pushes every item, then ends generation and waits for in-flight dequeues.
pub(crate) fn run<T, Q>(shared: Arc<FeedShared<T, Q>>, mut generator: Box<dyn Generator<T>>)
where
  Q: BoundedQueue<T>,
{
  let _end_of_stream = EndOfStream { shared: &shared };
  tracing::debug!(capacity = shared.queue.capacity(), "feed producer started");

  while let Some(item) = generator.generate() {
    shared.push_blocking(item);
  }
}

/// Ends generation when dropped, so consumers are released even if the
/// generator panics.
struct EndOfStream<'a, T, Q: BoundedQueue<T>> {
  shared: &'a FeedShared<T, Q>,
}

impl<T, Q: BoundedQueue<T>> Drop for EndOfStream<'_, T, Q> {
  fn drop(&mut self) {
    if thread::panicking() {
      self.shared.producer_panicked.store(true, Ordering::SeqCst);
      tracing::error!(
        produced = self.shared.produced.load(Ordering::Relaxed),
        "feed generator panicked, ending generation"
      );
    }
    self.shared.finish_generation();
  }
}

impl<T, Q: BoundedQueue<T>> FeedShared<T, Q> {
  /// Pushes `item`, blocking while the queue is full.
  pub(crate) fn push_blocking(&self, item: T) {
    let item_id = self.produced.load(Ordering::Relaxed);
    let mut pending = item;
    loop {
      pending = match self.queue.try_push(pending) {
        Ok(()) => break,
        Err(returned) => returned,
      };
      telemetry::log_event(Some(item_id), telemetry::LOC_PUSH, telemetry::EVT_P_QUEUE_FULL, None);

      let mut guard = self.signal.lock();
      // Nudge a consumer in case one is parked on a stale empty check.
      self.item_available.notify_one();
      // Re-check under the lock: a consumer frees space then locks to notify,
      // so either this push succeeds or the notification arrives after we wait.
      pending = match self.queue.try_push(pending) {
        Ok(()) => break,
        Err(returned) => returned,
      };
      telemetry::increment_counter(telemetry::LOC_PUSH, telemetry::CTR_PRODUCER_PARKS);
      telemetry::log_event(Some(item_id), telemetry::LOC_PUSH, telemetry::EVT_P_PARK, None);
      self.space_available.wait(&mut guard);
      telemetry::log_event(Some(item_id), telemetry::LOC_PUSH, telemetry::EVT_P_UNPARKED, None);
    }

    self.produced.fetch_add(1, Ordering::Relaxed);
    self.wake_consumers();
  }

  /// Marks the generator exhausted, releases parked consumers and waits until
  /// no consumer is left inside `pop_blocking`.
  pub(crate) fn finish_generation(&self) {
    self.generation_active.store(false, Ordering::SeqCst);
    telemetry::log_event(None, telemetry::LOC_FINISH, telemetry::EVT_P_END_OF_STREAM, None);
    tracing::debug!(
      produced = self.produced.load(Ordering::Relaxed),
      buffered = self.queue.len(),
      "feed generator exhausted"
    );

    // With no registered consumers nobody else will ever evaluate completion.
    self.try_complete();

    let mut guard = self.signal.lock();
    self.item_available.notify_all();
    while self.active_dequeues.load(Ordering::SeqCst) > 0 {
      #[cfg(feature = "fibre_telemetry")]
      telemetry::log_event(
        None,
        telemetry::LOC_FINISH,
        telemetry::EVT_P_DRAIN_WAIT,
        Some(format!(
          "active_dequeues:{}",
          self.active_dequeues.load(Ordering::Relaxed)
        )),
      );
      self.item_available.notify_all();
      self.dequeues_drained.wait(&mut guard);
    }
    drop(guard);
    tracing::trace!("feed producer drained");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossbeam_queue::ArrayQueue;
  use std::time::Duration;

  #[test]
  fn push_blocking_waits_for_space() {
    let shared: Arc<FeedShared<i32, ArrayQueue<i32>>> = Arc::new(FeedShared::new(ArrayQueue::new(1)));
    shared.push_blocking(1);
    assert_eq!(shared.queue.len(), 1);

    let producer = {
      let shared = Arc::clone(&shared);
      thread::spawn(move || shared.push_blocking(2))
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!producer.is_finished());

    assert_eq!(shared.queue.try_pop(), Some(1));
    {
      let _guard = shared.signal.lock();
      shared.space_available.notify_one();
    }
    producer.join().unwrap();
    assert_eq!(shared.queue.try_pop(), Some(2));
    assert_eq!(shared.produced.load(Ordering::Relaxed), 2);
  }

  #[test]
  fn finish_without_consumers_completes() {
    let shared: FeedShared<u8, ArrayQueue<u8>> = FeedShared::new(ArrayQueue::new(4));
    shared.finish_generation();
    assert!(!shared.generation_active.load(Ordering::SeqCst));
    assert!(shared.completion.is_open());
  }

  #[test]
  fn generator_panic_still_ends_generation() {
    let shared: Arc<FeedShared<u32, ArrayQueue<u32>>> = Arc::new(FeedShared::new(ArrayQueue::new(4)));
    let worker = {
      let shared = Arc::clone(&shared);
      thread::spawn(move || {
        let mut calls = 0;
        let gen = move || -> Option<u32> {
          calls += 1;
          if calls > 2 {
            panic!("generator failure");
          }
          Some(calls)
        };
        run(shared, Box::new(gen));
      })
    };
    assert!(worker.join().is_err());
    assert!(shared.producer_panicked.load(Ordering::SeqCst));
    assert!(!shared.generation_active.load(Ordering::SeqCst));
    assert!(shared.completion.is_open());
    assert_eq!(shared.queue.len(), 2);
  }
}
