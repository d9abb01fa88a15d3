use crate::error::BuildError;
use crate::feed::{Feed, ProducerSettings};
use crate::generator::Generator;
use crate::queue::BoundedQueue;

use crossbeam_queue::ArrayQueue;

use core::fmt;

/// The default name given to the producer thread.
pub const DEFAULT_THREAD_NAME: &str = "fibre-feed-producer";

/// Plain configuration for a feed, suitable for loading from a config file
/// when the `serde` feature is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FeedConfig {
  /// Number of items the queue can buffer between producer and consumers.
  pub capacity: usize,
  /// Name of the producer thread.
  pub thread_name: String,
  /// Stack size of the producer thread in bytes. `None` uses the platform default.
  pub stack_size: Option<usize>,
}

impl Default for FeedConfig {
  fn default() -> Self {
    Self {
      capacity: 64,
      thread_name: DEFAULT_THREAD_NAME.to_string(),
      stack_size: None,
    }
  }
}

/// A builder for creating [`Feed`] instances.
///
/// ```
/// use fibre_feed::FeedBuilder;
///
/// let feed = FeedBuilder::new(8)
///   .thread_name("tile-producer")
///   .build(fibre_feed::generator::from_iter(0..100u32))
///   .unwrap();
/// assert_eq!(feed.capacity(), 8);
/// ```
pub struct FeedBuilder {
  capacity: usize,
  thread_name: String,
  stack_size: Option<usize>,
}

impl fmt::Debug for FeedBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FeedBuilder")
      .field("capacity", &self.capacity)
      .field("thread_name", &self.thread_name)
      .field("stack_size", &self.stack_size)
      .finish()
  }
}

impl Default for FeedBuilder {
  fn default() -> Self {
    Self::from_config(FeedConfig::default())
  }
}

impl From<FeedConfig> for FeedBuilder {
  fn from(config: FeedConfig) -> Self {
    Self::from_config(config)
  }
}

impl FeedBuilder {
  /// Creates a builder for a feed buffering up to `capacity` items.
  pub fn new(capacity: usize) -> Self {
    Self::default().capacity(capacity)
  }

  /// Creates a builder from a [`FeedConfig`].
  pub fn from_config(config: FeedConfig) -> Self {
    Self {
      capacity: config.capacity,
      thread_name: config.thread_name,
      stack_size: config.stack_size,
    }
  }

  /// Sets the number of items the queue can buffer.
  pub fn capacity(mut self, capacity: usize) -> Self {
    self.capacity = capacity;
    self
  }

  /// Sets the name of the producer thread.
  pub fn thread_name(mut self, name: impl Into<String>) -> Self {
    self.thread_name = name.into();
    self
  }

  /// Sets the stack size of the producer thread.
  pub fn stack_size(mut self, bytes: usize) -> Self {
    self.stack_size = Some(bytes);
    self
  }

  /// Builds a feed backed by a lock-free `ArrayQueue` of the configured
  /// capacity. The producer is not started.
  pub fn build<T, G>(self, generator: G) -> Result<Feed<T>, BuildError>
  where
    T: Send + 'static,
    G: Generator<T> + 'static,
  {
    if self.capacity == 0 {
      return Err(BuildError::ZeroCapacity);
    }
    let queue = ArrayQueue::new(self.capacity);
    self.build_with_queue(queue, generator)
  }

  /// Builds a feed backed by a caller-supplied queue. The configured capacity
  /// is ignored in favour of `queue.capacity()`.
  pub fn build_with_queue<T, Q, G>(self, queue: Q, generator: G) -> Result<Feed<T, Q>, BuildError>
  where
    T: Send + 'static,
    Q: BoundedQueue<T> + 'static,
    G: Generator<T> + 'static,
  {
    if queue.capacity() == 0 {
      return Err(BuildError::ZeroCapacity);
    }
    let settings = ProducerSettings {
      thread_name: self.thread_name,
      stack_size: self.stack_size,
    };
    Ok(Feed::from_parts(queue, Box::new(generator), settings))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::generator;

  #[test]
  fn zero_capacity_rejected() {
    let result = FeedBuilder::new(0).build(generator::from_iter(0..3u8));
    assert_eq!(result.err(), Some(BuildError::ZeroCapacity));
  }

  #[test]
  fn config_round_trips_into_builder() {
    let config = FeedConfig {
      capacity: 3,
      thread_name: "cfg-producer".into(),
      stack_size: Some(256 * 1024),
    };
    let builder = FeedBuilder::from(config);
    assert_eq!(builder.capacity, 3);
    assert_eq!(builder.thread_name, "cfg-producer");
    assert_eq!(builder.stack_size, Some(256 * 1024));
  }

  #[test]
  fn default_config_is_usable() {
    let feed = FeedBuilder::default()
      .build(generator::from_iter(Vec::<u8>::new()))
      .unwrap();
    assert_eq!(feed.capacity(), FeedConfig::default().capacity);
  }

  #[cfg(feature = "serde")]
  #[test]
  fn config_deserializes_with_defaults() {
    let config: FeedConfig = serde_json::from_str(r#"{ "capacity": 16 }"#).unwrap();
    assert_eq!(config.capacity, 16);
    assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
    assert_eq!(config.stack_size, None);
  }
}
