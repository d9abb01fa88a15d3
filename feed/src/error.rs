// src/error.rs

use core::fmt;
use std::io;

use crate::queue::BoundedQueue;
use crate::Feed;

/// Errors that can occur when building a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
  /// The feed was configured with a capacity of zero. The producer could
  /// never enqueue an item, so this is rejected up front.
  ZeroCapacity,
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::ZeroCapacity => write!(f, "feed capacity cannot be zero"),
    }
  }
}

impl std::error::Error for BuildError {}

/// Error returned by [`Feed::start`].
#[derive(Debug)]
pub enum StartError {
  /// The producer thread has already been started for this feed.
  AlreadyStarted,
  /// The operating system refused to spawn the producer thread.
  Spawn(io::Error),
}

impl fmt::Display for StartError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StartError::AlreadyStarted => write!(f, "feed producer already started"),
      StartError::Spawn(err) => write!(f, "failed to spawn feed producer thread: {}", err),
    }
  }
}

impl std::error::Error for StartError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      StartError::AlreadyStarted => None,
      StartError::Spawn(err) => Some(err),
    }
  }
}

/// Error returned by [`Feed::release`].
pub enum ReleaseError<T: Send + 'static, Q: BoundedQueue<T> + 'static> {
  /// The feed has not completed, or a consumer session is still alive.
  /// The feed is handed back untouched.
  InUse(Feed<T, Q>),
  /// The generator panicked on the producer thread. All resources have been
  /// released regardless.
  ProducerPanicked,
}

impl<T: Send + 'static, Q: BoundedQueue<T> + 'static> ReleaseError<T, Q> {
  /// Returns the feed if the release was refused because it is still in use.
  #[inline]
  pub fn into_inner(self) -> Option<Feed<T, Q>> {
    match self {
      ReleaseError::InUse(feed) => Some(feed),
      ReleaseError::ProducerPanicked => None,
    }
  }
}

impl<T: Send + 'static, Q: BoundedQueue<T> + 'static> fmt::Debug for ReleaseError<T, Q> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::InUse(_) => write!(f, "ReleaseError::InUse(..)"),
      ReleaseError::ProducerPanicked => write!(f, "ReleaseError::ProducerPanicked"),
    }
  }
}

impl<T: Send + 'static, Q: BoundedQueue<T> + 'static> fmt::Display for ReleaseError<T, Q> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::InUse(_) => write!(f, "feed is still producing or has live consumers"),
      ReleaseError::ProducerPanicked => write!(f, "feed generator panicked"),
    }
  }
}

impl<T: Send + 'static, Q: BoundedQueue<T> + 'static> std::error::Error for ReleaseError<T, Q> {}
