//! Point-in-time statistics for a feed.

/// A snapshot of a feed's counters, taken with [`Feed::stats`](crate::Feed::stats).
///
/// Fields are read individually without a common lock, so under concurrent
/// activity they may not be mutually consistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
  /// Items the generator produced and the producer enqueued.
  pub produced: usize,
  /// Items handed out to consumers by `get_item`.
  pub delivered: usize,
  /// Items currently sitting in the queue.
  pub buffered: usize,
  /// Capacity of the queue.
  pub capacity: usize,
  /// Consumer sessions currently checked in.
  pub registered_consumers: usize,
  /// Consumers currently inside `get_item`.
  pub active_dequeues: usize,
  /// `false` once the generator has been exhausted.
  pub generation_active: bool,
  /// `true` once the completion gate has opened.
  pub finished: bool,
}

impl FeedStats {
  /// Items produced but not yet delivered, i.e. still buffered or in flight.
  pub fn outstanding(&self) -> usize {
    self.produced.saturating_sub(self.delivered)
  }
}
