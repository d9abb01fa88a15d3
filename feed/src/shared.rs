// src/shared.rs

use crate::coord::Latch;
use crate::queue::BoundedQueue;
use crate::stats::FeedStats;
use crate::telemetry;

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex};

/// Coordination state shared by the producer thread, every consumer session
/// and the owning `Feed`.
///
/// The queue itself is lock-free; `signal` only serializes the wait/wake
/// protocol on the three condition variables. A thread always re-checks the
/// queue and `generation_active` while holding `signal` before it waits, and
/// every notifier acquires `signal` before notifying, so no wake-up is lost.
/// Wake-ups are advisory: a woken thread retries the non-blocking operation.
pub(crate) struct FeedShared<T, Q> {
  pub(crate) queue: Q,
  /// `true` until the generator is exhausted. Only ever goes true -> false.
  pub(crate) generation_active: AtomicBool,
  pub(crate) registered_consumers: CachePadded<AtomicUsize>,
  /// Consumers currently inside `pop_blocking`.
  pub(crate) active_dequeues: CachePadded<AtomicUsize>,
  pub(crate) signal: Mutex<()>,
  /// Wakes consumers: an item may be available or generation has ended.
  pub(crate) item_available: Condvar,
  /// Wakes the producer: a slot may have been freed.
  pub(crate) space_available: Condvar,
  /// Wakes the producer's shutdown handshake once `active_dequeues` hits zero.
  pub(crate) dequeues_drained: Condvar,
  pub(crate) completion: Latch,
  pub(crate) produced: AtomicUsize,
  pub(crate) delivered: AtomicUsize,
  pub(crate) producer_panicked: AtomicBool,
  _item: PhantomData<fn() -> T>,
}

impl<T, Q: BoundedQueue<T>> fmt::Debug for FeedShared<T, Q> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FeedShared")
      .field("capacity", &self.queue.capacity())
      .field("buffered", &self.queue.len())
      .field(
        "generation_active",
        &self.generation_active.load(Ordering::Relaxed),
      )
      .field(
        "registered_consumers",
        &self.registered_consumers.load(Ordering::Relaxed),
      )
      .field("active_dequeues", &self.active_dequeues.load(Ordering::Relaxed))
      .field("completion", &self.completion)
      .finish_non_exhaustive()
  }
}

impl<T, Q: BoundedQueue<T>> FeedShared<T, Q> {
  pub(crate) fn new(queue: Q) -> Self {
    FeedShared {
      queue,
      generation_active: AtomicBool::new(true),
      registered_consumers: CachePadded::new(AtomicUsize::new(0)),
      active_dequeues: CachePadded::new(AtomicUsize::new(0)),
      signal: Mutex::new(()),
      item_available: Condvar::new(),
      space_available: Condvar::new(),
      dequeues_drained: Condvar::new(),
      completion: Latch::new(),
      produced: AtomicUsize::new(0),
      delivered: AtomicUsize::new(0),
      producer_panicked: AtomicBool::new(false),
      _item: PhantomData,
    }
  }

  /// Broadcasts `item_available` under the signal lock.
  pub(crate) fn wake_consumers(&self) {
    let _guard = self.signal.lock();
    self.item_available.notify_all();
  }

  /// Opens the completion latch if generation has ended and no consumer is
  /// registered. The check runs under the latch lock, so concurrent callers
  /// (the producer finishing, the last consumer checking out) cannot both
  /// win or both miss the transition.
  pub(crate) fn try_complete(&self) -> bool {
    let opened = self.completion.open_if(|| {
      !self.generation_active.load(Ordering::SeqCst)
        && self.registered_consumers.load(Ordering::SeqCst) == 0
    });
    if opened {
      telemetry::increment_counter(telemetry::LOC_COMPLETE, telemetry::CTR_COMPLETIONS);
      tracing::debug!(
        produced = self.produced.load(Ordering::Relaxed),
        delivered = self.delivered.load(Ordering::Relaxed),
        "feed completed"
      );
    }
    opened
  }

  pub(crate) fn stats(&self) -> FeedStats {
    FeedStats {
      produced: self.produced.load(Ordering::Relaxed),
      delivered: self.delivered.load(Ordering::Relaxed),
      buffered: self.queue.len(),
      capacity: self.queue.capacity(),
      registered_consumers: self.registered_consumers.load(Ordering::Relaxed),
      active_dequeues: self.active_dequeues.load(Ordering::Relaxed),
      generation_active: self.generation_active.load(Ordering::Relaxed),
      finished: self.completion.is_open(),
    }
  }
}
