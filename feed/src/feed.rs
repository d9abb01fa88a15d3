// src/feed.rs

use crate::consumer::Consumer;
use crate::coord::WaiterKey;
use crate::error::{ReleaseError, StartError};
use crate::generator::Generator;
use crate::producer;
use crate::queue::BoundedQueue;
use crate::shared::FeedShared;
use crate::stats::FeedStats;

use crossbeam_queue::ArrayQueue;
use parking_lot::Mutex;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) struct ProducerSettings {
  pub(crate) thread_name: String,
  pub(crate) stack_size: Option<usize>,
}

/// A single-producer, multi-consumer work feed.
///
/// The feed owns a generator and a bounded queue. [`start`](Feed::start)
/// spawns the producer thread, which pushes every generated item into the
/// queue, blocking while it is full. Consumers obtained from
/// [`check_in`](Feed::check_in) pull items from any thread, blocking while the
/// queue is empty. Once the generator is exhausted and every consumer has
/// checked out, the feed is finished and [`wait`](Feed::wait) returns.
///
/// Consumers should check in before the generator can run dry, typically
/// before calling `start`. A consumer that checks in after the feed finished
/// simply receives `None`.
pub struct Feed<T: Send + 'static, Q: BoundedQueue<T> + 'static = ArrayQueue<T>> {
  shared: Arc<FeedShared<T, Q>>,
  generator: Mutex<Option<Box<dyn Generator<T>>>>,
  producer: Mutex<Option<JoinHandle<()>>>,
  settings: ProducerSettings,
}

impl<T: Send + 'static, Q: BoundedQueue<T> + 'static> fmt::Debug for Feed<T, Q> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Feed")
      .field("shared", &self.shared)
      .field("started", &self.generator.lock().is_none())
      .field("thread_name", &self.settings.thread_name)
      .finish_non_exhaustive()
  }
}

impl<T: Send + 'static, Q: BoundedQueue<T> + 'static> Feed<T, Q> {
  pub(crate) fn from_parts(
    queue: Q,
    generator: Box<dyn Generator<T>>,
    settings: ProducerSettings,
  ) -> Self {
    Feed {
      shared: Arc::new(FeedShared::new(queue)),
      generator: Mutex::new(Some(generator)),
      producer: Mutex::new(None),
      settings,
    }
  }

  /// Spawns the producer thread.
  ///
  /// # Errors
  ///
  /// Returns [`StartError::AlreadyStarted`] if called more than once, and
  /// [`StartError::Spawn`] if the thread could not be created. A spawn failure
  /// is fatal for the feed: the generator is dropped and the feed never
  /// finishes.
  pub fn start(&self) -> Result<(), StartError> {
    let generator = self
      .generator
      .lock()
      .take()
      .ok_or(StartError::AlreadyStarted)?;

    let mut builder = thread::Builder::new().name(self.settings.thread_name.clone());
    if let Some(bytes) = self.settings.stack_size {
      builder = builder.stack_size(bytes);
    }

    let shared = Arc::clone(&self.shared);
    let handle = builder
      .spawn(move || producer::run(shared, generator))
      .map_err(|err| {
        tracing::error!(error = %err, "failed to spawn feed producer thread");
        StartError::Spawn(err)
      })?;
    *self.producer.lock() = Some(handle);
    Ok(())
  }

  /// Registers a new consumer and returns its session.
  pub fn check_in(&self) -> Consumer<T, Q> {
    Consumer::check_in(Arc::clone(&self.shared))
  }

  /// Blocks until the generator is exhausted and every consumer has checked
  /// out. Returns immediately once the feed has finished; may be called any
  /// number of times from any thread, including before `start`.
  pub fn wait(&self) {
    self.shared.completion.wait();
  }

  /// Like [`wait`](Feed::wait), giving up after `timeout`.
  /// Returns `true` if the feed has finished.
  pub fn wait_timeout(&self, timeout: Duration) -> bool {
    self.shared.completion.wait_timeout(timeout)
  }

  /// Returns a future that resolves once the feed has finished.
  pub fn wait_async(&self) -> CompletionFuture<T, Q> {
    CompletionFuture {
      shared: Arc::clone(&self.shared),
      key: None,
    }
  }

  /// Returns `true` once the feed has finished. Never reverts to `false`.
  ///
  /// Also wakes every consumer parked on an empty queue, so polling this from
  /// a controller thread doubles as a periodic nudge.
  pub fn is_finished(&self) -> bool {
    self.shared.wake_consumers();
    self.shared.completion.is_open()
  }

  /// Returns `true` while the generator has not been exhausted.
  pub fn is_producing(&self) -> bool {
    self.shared.generation_active.load(Ordering::SeqCst)
  }

  /// The capacity of the underlying queue.
  pub fn capacity(&self) -> usize {
    self.shared.queue.capacity()
  }

  /// The number of items currently buffered.
  pub fn len(&self) -> usize {
    self.shared.queue.len()
  }

  /// Returns `true` if no items are currently buffered.
  pub fn is_empty(&self) -> bool {
    self.shared.queue.is_empty()
  }

  /// Takes a snapshot of the feed's counters.
  pub fn stats(&self) -> FeedStats {
    self.shared.stats()
  }

  /// Joins the producer thread and frees the feed.
  ///
  /// # Errors
  ///
  /// Returns [`ReleaseError::InUse`] with the feed handed back if it has not
  /// finished or a consumer session is still alive, and
  /// [`ReleaseError::ProducerPanicked`] if the generator panicked.
  pub fn release(self) -> Result<(), ReleaseError<T, Q>> {
    if !self.shared.completion.is_open() {
      return Err(ReleaseError::InUse(self));
    }

    // The producer may still be in its drain handshake; joining is bounded by
    // the consumers currently inside `get_item`.
    let handle = self.producer.lock().take();
    let joined_ok = match handle {
      Some(handle) => handle.join().is_ok(),
      None => true,
    };

    if Arc::strong_count(&self.shared) > 1 {
      return Err(ReleaseError::InUse(self));
    }
    if !joined_ok || self.shared.producer_panicked.load(Ordering::SeqCst) {
      return Err(ReleaseError::ProducerPanicked);
    }
    tracing::debug!(stats = ?self.shared.stats(), "feed released");
    Ok(())
  }
}

/// Future returned by [`Feed::wait_async`].
///
/// Dropping a pending future unregisters its waker from the feed.
pub struct CompletionFuture<T: Send + 'static, Q: BoundedQueue<T> + 'static = ArrayQueue<T>> {
  shared: Arc<FeedShared<T, Q>>,
  key: Option<WaiterKey>,
}

impl<T: Send + 'static, Q: BoundedQueue<T> + 'static> fmt::Debug for CompletionFuture<T, Q> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CompletionFuture")
      .field("finished", &self.shared.completion.is_open())
      .finish()
  }
}

impl<T: Send + 'static, Q: BoundedQueue<T> + 'static> Future for CompletionFuture<T, Q> {
  type Output = ();

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
    let this = self.get_mut();
    this.shared.completion.poll_open(cx, &mut this.key)
  }
}

impl<T: Send + 'static, Q: BoundedQueue<T> + 'static> Drop for CompletionFuture<T, Q> {
  fn drop(&mut self) {
    if let Some(key) = self.key.take() {
      self.shared.completion.forget(key);
    }
  }
}
