//! A one-shot latch that supports both blocking and asynchronous waiters.
//!
//! The latch starts closed and is opened at most once; it never closes again.
//! The open flag and the async waker list share one `parking_lot::Mutex`, and
//! blocking waiters sleep on a `Condvar` tied to that mutex, so a waiter can
//! never miss the transition.
//!
//! The feed uses it as its completion gate: [`Latch::open_if`] evaluates the
//! completion condition and flips the flag under the same lock, so of any
//! number of threads racing to complete the feed exactly one performs the
//! transition.
//!
//! Async waiters register under a [`WaiterKey`] and should hand it back with
//! [`Latch::forget`] when they stop waiting, so abandoned wakers do not pile up
//! while the latch stays closed.

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Identifies one async waiter registered with a [`Latch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaiterKey(u64);

#[derive(Debug, Default)]
struct LatchInternal {
  open: bool,
  next_key: u64,
  wakers: Vec<(u64, Waker)>,
}

/// A single-use gate that threads and tasks can wait on.
pub struct Latch {
  internal: Mutex<LatchInternal>,
  // Mirrors `internal.open` for lock-free reads; only written under the lock.
  open_flag: AtomicBool,
  cond: Condvar,
}

impl fmt::Debug for Latch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let internal = self.internal.lock();
    f.debug_struct("Latch")
      .field("open", &internal.open)
      .field("async_waiters", &internal.wakers.len())
      .finish()
  }
}

impl Default for Latch {
  fn default() -> Self {
    Self::new()
  }
}

impl Latch {
  /// Creates a closed latch.
  pub fn new() -> Self {
    Self {
      internal: Mutex::new(LatchInternal::default()),
      open_flag: AtomicBool::new(false),
      cond: Condvar::new(),
    }
  }

  /// Returns `true` once the latch has been opened.
  pub fn is_open(&self) -> bool {
    self.open_flag.load(Ordering::Acquire)
  }

  /// Opens the latch. Returns `true` if this call performed the transition.
  pub fn open(&self) -> bool {
    self.open_if(|| true)
  }

  /// Opens the latch if it is closed and `ready` returns `true`.
  ///
  /// `ready` runs while the latch lock is held, so the check and the
  /// transition are a single step with respect to every other caller.
  /// Returns `true` only for the call that opened the latch.
  pub fn open_if<F>(&self, ready: F) -> bool
  where
    F: FnOnce() -> bool,
  {
    let wakers = {
      let mut internal = self.internal.lock();
      if internal.open || !ready() {
        return false;
      }
      internal.open = true;
      self.open_flag.store(true, Ordering::Release);
      mem::take(&mut internal.wakers)
    };
    self.cond.notify_all();
    for (_, waker) in wakers {
      waker.wake();
    }
    true
  }

  /// Blocks the current thread until the latch is open.
  pub fn wait(&self) {
    let mut internal = self.internal.lock();
    while !internal.open {
      self.cond.wait(&mut internal);
    }
  }

  /// Blocks until the latch is open or `timeout` elapses.
  /// Returns `true` if the latch is open.
  pub fn wait_timeout(&self, timeout: Duration) -> bool {
    let deadline = match Instant::now().checked_add(timeout) {
      Some(deadline) => deadline,
      None => {
        self.wait();
        return true;
      }
    };
    let mut internal = self.internal.lock();
    while !internal.open {
      if self.cond.wait_until(&mut internal, deadline).timed_out() {
        return internal.open;
      }
    }
    true
  }

  /// Polls the latch from an async context.
  ///
  /// While the latch is closed the task's waker is stored under `key`,
  /// allocating a key on first use and refreshing the stored waker on later
  /// polls. Once the latch is open `key` is cleared.
  pub fn poll_open(&self, cx: &mut Context<'_>, key: &mut Option<WaiterKey>) -> Poll<()> {
    let mut internal = self.internal.lock();
    if internal.open {
      *key = None;
      return Poll::Ready(());
    }

    if let Some(WaiterKey(id)) = *key {
      if let Some((_, waker)) = internal.wakers.iter_mut().find(|(k, _)| *k == id) {
        if !waker.will_wake(cx.waker()) {
          *waker = cx.waker().clone();
        }
        return Poll::Pending;
      }
    }

    let id = internal.next_key;
    internal.next_key += 1;
    internal.wakers.push((id, cx.waker().clone()));
    *key = Some(WaiterKey(id));
    Poll::Pending
  }

  /// Drops the waker registered under `key`, if the latch still holds it.
  pub fn forget(&self, key: WaiterKey) {
    let mut internal = self.internal.lock();
    internal.wakers.retain(|(id, _)| *id != key.0);
  }

  #[cfg(test)]
  fn async_waiters(&self) -> usize {
    self.internal.lock().wakers.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::thread;

  #[test]
  fn opens_exactly_once() {
    let latch = Latch::new();
    assert!(!latch.is_open());
    assert!(latch.open());
    assert!(!latch.open());
    assert!(latch.is_open());
  }

  #[test]
  fn open_if_respects_condition() {
    let latch = Latch::new();
    assert!(!latch.open_if(|| false));
    assert!(!latch.is_open());
    assert!(latch.open_if(|| true));
    // An open latch does not evaluate the condition again.
    assert!(!latch.open_if(|| panic!("condition evaluated on open latch")));
  }

  #[test]
  fn wait_returns_after_open_from_other_thread() {
    let latch = Arc::new(Latch::new());
    let waiters: Vec<_> = (0..4)
      .map(|_| {
        let latch = Arc::clone(&latch);
        thread::spawn(move || latch.wait())
      })
      .collect();

    thread::sleep(Duration::from_millis(20));
    latch.open();
    for waiter in waiters {
      waiter.join().unwrap();
    }
    // Idempotent once open.
    latch.wait();
    latch.wait();
  }

  #[test]
  fn wait_timeout_reports_closed_latch() {
    let latch = Latch::new();
    assert!(!latch.wait_timeout(Duration::from_millis(10)));
    latch.open();
    assert!(latch.wait_timeout(Duration::from_millis(10)));
  }

  #[test]
  fn wait_timeout_accepts_unbounded_duration() {
    let latch = Latch::new();
    latch.open();
    assert!(latch.wait_timeout(Duration::MAX));

    let latch = Arc::new(Latch::new());
    let opener = {
      let latch = Arc::clone(&latch);
      thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        latch.open();
      })
    };
    assert!(latch.wait_timeout(Duration::MAX));
    opener.join().unwrap();
  }

  struct NoopWake;

  impl std::task::Wake for NoopWake {
    fn wake(self: Arc<Self>) {}
  }

  fn noop_waker() -> Waker {
    Waker::from(Arc::new(NoopWake))
  }

  #[test]
  fn forgotten_waiters_are_removed() {
    let latch = Latch::new();
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);

    let mut first = None;
    let mut second = None;
    assert!(latch.poll_open(&mut cx, &mut first).is_pending());
    assert!(latch.poll_open(&mut cx, &mut first).is_pending());
    assert!(latch.poll_open(&mut cx, &mut second).is_pending());
    // Same task, separate registrations; repolling reuses the slot.
    assert_eq!(latch.async_waiters(), 2);
    assert_ne!(first, second);

    if let Some(key) = first {
      latch.forget(key);
    }
    assert_eq!(latch.async_waiters(), 1);

    latch.open();
    assert_eq!(latch.async_waiters(), 0);
    assert!(latch.poll_open(&mut cx, &mut second).is_ready());
    assert_eq!(second, None);
  }

  #[test]
  fn racing_openers_single_winner() {
    let latch = Arc::new(Latch::new());
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let latch = Arc::clone(&latch);
        thread::spawn(move || latch.open())
      })
      .collect();
    let winners = handles
      .into_iter()
      .map(|h| h.join().unwrap())
      .filter(|won| *won)
      .count();
    assert_eq!(winners, 1);
  }
}
