//! The fixed-capacity, non-blocking queue that sits between the producer
//! thread and the consumers.
//!
//! The feed never locks around queue operations. Any implementation must be
//! safe to push and pop from many threads at once, and must never block: a full
//! queue rejects the push and hands the item back, an empty queue returns
//! `None`. All waiting is done by the feed on its own condition variables.

use crossbeam_queue::ArrayQueue;

/// A bounded FIFO with non-blocking push and pop.
pub trait BoundedQueue<T>: Send + Sync {
  /// Attempts to enqueue `item`, returning it back if the queue is full.
  fn try_push(&self, item: T) -> Result<(), T>;

  /// Attempts to dequeue the oldest item.
  fn try_pop(&self) -> Option<T>;

  /// The maximum number of items the queue can hold.
  fn capacity(&self) -> usize;

  /// The number of items currently buffered. May be stale under contention.
  fn len(&self) -> usize;

  /// Returns `true` if no items are buffered.
  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<T: Send> BoundedQueue<T> for ArrayQueue<T> {
  #[inline]
  fn try_push(&self, item: T) -> Result<(), T> {
    self.push(item)
  }

  #[inline]
  fn try_pop(&self) -> Option<T> {
    self.pop()
  }

  #[inline]
  fn capacity(&self) -> usize {
    ArrayQueue::capacity(self)
  }

  #[inline]
  fn len(&self) -> usize {
    ArrayQueue::len(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn array_queue_rejects_when_full() {
    let queue: ArrayQueue<i32> = ArrayQueue::new(2);
    assert!(BoundedQueue::is_empty(&queue));
    assert_eq!(queue.try_push(1), Ok(()));
    assert_eq!(queue.try_push(2), Ok(()));
    assert_eq!(BoundedQueue::len(&queue), BoundedQueue::capacity(&queue));
    assert_eq!(queue.try_push(3), Err(3));

    assert_eq!(queue.try_pop(), Some(1));
    assert_eq!(queue.try_push(3), Ok(()));
    assert_eq!(queue.try_pop(), Some(2));
    assert_eq!(queue.try_pop(), Some(3));
    assert_eq!(queue.try_pop(), None);
  }
}
