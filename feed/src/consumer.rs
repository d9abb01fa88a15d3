// src/consumer.rs

//! The consumer side of the feed.
//!
//! A consumer thread obtains a [`Consumer`] session with
//! [`Feed::check_in`](crate::Feed::check_in), pulls items with
//! [`Consumer::get_item`] until it returns `None`, and checks out by calling
//! [`Consumer::check_out`] or dropping the session. The session type makes it
//! impossible to pull without checking in or to check out twice.

use crate::queue::BoundedQueue;
use crate::shared::FeedShared;
use crate::telemetry;

use crossbeam_queue::ArrayQueue;

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// A checked-in consumer of a [`Feed`](crate::Feed).
///
/// Holds one registration on the feed; the feed cannot complete while any
/// session is alive. Sessions are `Send` and are usually moved into the worker
/// thread that drains them.
pub struct Consumer<T: Send + 'static, Q: BoundedQueue<T> + 'static = ArrayQueue<T>> {
  shared: Arc<FeedShared<T, Q>>,
  checked_out: bool,
}

impl<T: Send + 'static, Q: BoundedQueue<T> + 'static> fmt::Debug for Consumer<T, Q> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Consumer")
      .field("shared", &self.shared)
      .field("checked_out", &self.checked_out)
      .finish()
  }
}

impl<T: Send + 'static, Q: BoundedQueue<T> + 'static> Consumer<T, Q> {
  pub(crate) fn check_in(shared: Arc<FeedShared<T, Q>>) -> Self {
    shared.register_consumer();
    Consumer {
      shared,
      checked_out: false,
    }
  }

  /// Takes the next item, blocking while the queue is empty and the generator
  /// is still producing.
  ///
  /// Returns `None` once production has ended and the queue is drained. No
  /// further items will ever arrive for this consumer after that.
  pub fn get_item(&mut self) -> Option<T> {
    self.shared.pop_blocking()
  }

  /// Deregisters this consumer. Equivalent to dropping the session.
  pub fn check_out(mut self) {
    self.check_out_internal();
  }

  fn check_out_internal(&mut self) {
    if !self.checked_out {
      self.checked_out = true;
      self.shared.deregister_consumer();
    }
  }
}

impl<T: Send + 'static, Q: BoundedQueue<T> + 'static> Iterator for Consumer<T, Q> {
  type Item = T;

  fn next(&mut self) -> Option<T> {
    self.get_item()
  }
}

impl<T: Send + 'static, Q: BoundedQueue<T> + 'static> Drop for Consumer<T, Q> {
  fn drop(&mut self) {
    self.check_out_internal();
  }
}

impl<T, Q: BoundedQueue<T>> FeedShared<T, Q> {
  pub(crate) fn register_consumer(&self) {
    let registered = self.registered_consumers.fetch_add(1, Ordering::SeqCst) + 1;
    tracing::trace!(registered, "feed consumer checked in");
  }

  pub(crate) fn deregister_consumer(&self) {
    // A departing consumer may have been the one a sibling was relying on.
    self.wake_consumers();

    let previous = self.registered_consumers.fetch_sub(1, Ordering::SeqCst);
    debug_assert!(previous > 0, "feed consumer checked out more often than in");
    #[cfg(feature = "fibre_telemetry")]
    telemetry::log_event(
      None,
      telemetry::LOC_CHECK_OUT,
      telemetry::EVT_C_CHECK_OUT,
      Some(format!("remaining:{}", previous - 1)),
    );
    tracing::trace!(remaining = previous - 1, "feed consumer checked out");

    if previous == 1 {
      self.try_complete();
    }
  }

  /// Pops the next item, blocking while the queue is empty and generation is
  /// active. Returns `None` once generation has ended and the queue has been
  /// observed empty afterwards, and always once the feed has finished.
  pub(crate) fn pop_blocking(&self) -> Option<T> {
    // Only a consumer that checked in after completion gets here; whatever is
    // still buffered belongs to nobody.
    if self.completion.is_open() {
      telemetry::log_event(None, telemetry::LOC_POP, telemetry::EVT_C_EXHAUSTED, None);
      return None;
    }

    self.active_dequeues.fetch_add(1, Ordering::SeqCst);

    let mut item = self.queue.try_pop();
    while item.is_none() && self.generation_active.load(Ordering::SeqCst) {
      let mut guard = self.signal.lock();
      // Let a producer stalled on a full queue retry.
      self.space_available.notify_one();

      item = self.queue.try_pop();
      if item.is_none() && self.generation_active.load(Ordering::SeqCst) {
        telemetry::increment_counter(telemetry::LOC_POP, telemetry::CTR_CONSUMER_PARKS);
        telemetry::log_event(None, telemetry::LOC_POP, telemetry::EVT_C_PARK, None);
        self.item_available.wait(&mut guard);
        drop(guard);
        telemetry::log_event(None, telemetry::LOC_POP, telemetry::EVT_C_UNPARKED, None);
        item = self.queue.try_pop();
      }
    }
    // Items pushed before end of generation remain valid; take one if our last
    // empty observation raced with the final push.
    if item.is_none() {
      item = self.queue.try_pop();
    }

    {
      let _guard = self.signal.lock();
      self.space_available.notify_one();
    }

    match item {
      Some(_) => {
        self.delivered.fetch_add(1, Ordering::Relaxed);
      }
      None => {
        telemetry::log_event(None, telemetry::LOC_POP, telemetry::EVT_C_EXHAUSTED, None);
      }
    }

    let remaining = self.active_dequeues.fetch_sub(1, Ordering::SeqCst) - 1;
    if remaining == 0 && !self.generation_active.load(Ordering::SeqCst) {
      let _guard = self.signal.lock();
      self.dequeues_drained.notify_all();
    }
    item
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::thread;
  use std::time::Duration;

  fn shared(capacity: usize) -> Arc<FeedShared<u32, ArrayQueue<u32>>> {
    Arc::new(FeedShared::new(ArrayQueue::new(capacity)))
  }

  #[test]
  fn pop_returns_buffered_item_without_blocking() {
    let shared = shared(2);
    shared.push_blocking(7);
    let mut consumer = Consumer::check_in(Arc::clone(&shared));
    assert_eq!(consumer.get_item(), Some(7));
    assert_eq!(shared.active_dequeues.load(Ordering::SeqCst), 0);
    assert_eq!(shared.delivered.load(Ordering::Relaxed), 1);
  }

  #[test]
  fn pop_drains_buffer_after_end_of_generation() {
    let shared = shared(4);
    shared.push_blocking(1);
    shared.push_blocking(2);
    let mut consumer = Consumer::check_in(Arc::clone(&shared));
    shared.finish_generation();

    assert_eq!(consumer.get_item(), Some(1));
    assert_eq!(consumer.get_item(), Some(2));
    assert_eq!(consumer.get_item(), None);
    assert_eq!(consumer.get_item(), None);
  }

  #[test]
  fn parked_consumer_released_by_end_of_generation() {
    let shared = shared(1);
    let consumer = Consumer::check_in(Arc::clone(&shared));
    let worker = thread::spawn(move || {
      let mut consumer = consumer;
      consumer.get_item()
    });

    thread::sleep(Duration::from_millis(50));
    assert!(!worker.is_finished());
    shared.finish_generation();
    assert_eq!(worker.join().unwrap(), None);
    assert_eq!(shared.active_dequeues.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn last_check_out_opens_completion() {
    let shared = shared(1);
    let first = Consumer::check_in(Arc::clone(&shared));
    let second = Consumer::check_in(Arc::clone(&shared));
    shared.finish_generation();
    assert!(!shared.completion.is_open());

    first.check_out();
    assert!(!shared.completion.is_open());
    drop(second);
    assert!(shared.completion.is_open());
    assert_eq!(shared.registered_consumers.load(Ordering::SeqCst), 0);
  }
}
