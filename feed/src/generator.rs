//! The item source driven by the producer thread.
//!
//! A [`Generator`] is polled repeatedly on the producer thread until it
//! returns `None`, after which the feed enters its draining phase and no
//! further items are ever produced. Closures of the form
//! `FnMut() -> Option<T>` are generators, and any iterator can be adapted with
//! [`from_iter`].

use std::fmt;

/// Produces the next work item, or `None` once the source is exhausted.
pub trait Generator<T>: Send {
  /// Produces the next item. Returning `None` ends production permanently;
  /// the generator is not polled again.
  fn generate(&mut self) -> Option<T>;
}

impl<T, F> Generator<T> for F
where
  F: FnMut() -> Option<T> + Send,
{
  #[inline]
  fn generate(&mut self) -> Option<T> {
    self()
  }
}

/// A [`Generator`] backed by an iterator. Created by [`from_iter`].
pub struct IterGenerator<I> {
  iter: I,
}

impl<I> fmt::Debug for IterGenerator<I> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("IterGenerator").finish_non_exhaustive()
  }
}

impl<I> Generator<I::Item> for IterGenerator<I>
where
  I: Iterator + Send,
{
  #[inline]
  fn generate(&mut self) -> Option<I::Item> {
    self.iter.next()
  }
}

/// Adapts an iterator into a [`Generator`].
///
/// ```
/// use fibre_feed::generator::{self, Generator};
///
/// let mut gen = generator::from_iter(vec!["a", "b"]);
/// assert_eq!(gen.generate(), Some("a"));
/// assert_eq!(gen.generate(), Some("b"));
/// assert_eq!(gen.generate(), None);
/// ```
pub fn from_iter<I>(iter: I) -> IterGenerator<I::IntoIter>
where
  I: IntoIterator,
  I::IntoIter: Send,
{
  IterGenerator {
    iter: iter.into_iter(),
  }
}
