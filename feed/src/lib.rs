#![warn(missing_debug_implementations, rust_2018_idioms)]

//! A blocking single-producer, multi-consumer work feed.
//!
//! A [`Feed`] runs a caller-supplied [`Generator`] on a dedicated producer
//! thread and pushes every item it yields into a fixed-capacity lock-free
//! queue. Any number of consumer threads check in, pull items until the feed
//! reports end-of-stream, and check out. Producer and consumers may run at
//! different and varying rates: the producer sleeps while the queue is full,
//! consumers sleep while it is empty, and nobody spins.
//!
//! Once the generator is exhausted and every consumer has checked out, the
//! feed is *finished*: [`Feed::wait`] returns, [`Feed::is_finished`] reports
//! `true` forever after, and the feed can be [released](Feed::release).
//!
//! ## Guarantees
//!
//! - Every produced item is delivered to exactly one consumer.
//! - Items leave the queue in the order the generator produced them; which
//!   consumer receives which item is unspecified.
//! - A consumer blocked on an empty queue is always released once the
//!   generator is exhausted.
//!
//! # Examples
//!
//! ```
//! use std::thread;
//!
//! let mut next = 0u32;
//! let feed = fibre_feed::create(4, move || {
//!   if next < 10 {
//!     next += 1;
//!     Some(next)
//!   } else {
//!     None
//!   }
//! });
//!
//! // Check consumers in before starting so none of them misses the stream.
//! let consumers: Vec<_> = (0..3).map(|_| feed.check_in()).collect();
//! feed.start().unwrap();
//!
//! let handles: Vec<_> = consumers
//!   .into_iter()
//!   .map(|consumer| thread::spawn(move || consumer.sum::<u32>()))
//!   .collect();
//! let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
//!
//! feed.wait();
//! assert_eq!(total, 55);
//! assert!(feed.is_finished());
//! feed.release().unwrap();
//! ```

pub mod builder;
pub mod coord;
pub mod error;
pub mod generator;
pub mod queue;
pub mod stats;
pub mod telemetry;

mod consumer;
mod feed;
mod producer;
mod shared;

pub use builder::{FeedBuilder, FeedConfig};
pub use consumer::Consumer;
pub use error::{BuildError, ReleaseError, StartError};
pub use feed::{CompletionFuture, Feed};
pub use generator::Generator;
pub use queue::BoundedQueue;
pub use stats::FeedStats;

/// Creates a feed buffering up to `capacity` items from `generator`, using the
/// default producer thread settings. The producer is not started.
///
/// # Panics
///
/// Panics if `capacity` is 0. Use [`FeedBuilder`] to handle that case as an
/// error instead.
pub fn create<T, G>(capacity: usize, generator: G) -> Feed<T>
where
  T: Send + 'static,
  G: Generator<T> + 'static,
{
  assert!(capacity > 0, "feed capacity must be > 0");
  match FeedBuilder::new(capacity).build(generator) {
    Ok(feed) => feed,
    Err(err) => unreachable!("capacity checked above: {}", err),
  }
}

// Helper function to check if a type is Send + Sync.
#[allow(dead_code)]
fn assert_send_sync<T: Send + Sync>() {}

#[allow(dead_code)]
fn assert_handles_are_thread_safe() {
  assert_send_sync::<Feed<u64>>();
  assert_send_sync::<Consumer<u64>>();
}
