#![allow(dead_code)]

use std::time::Duration;

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(500);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(3);
pub const STRESS_TIMEOUT: Duration = Duration::from_secs(15);
pub const ITEMS_LOW: usize = 50;
pub const ITEMS_MEDIUM: usize = 200;
pub const ITEMS_HIGH: usize = 1000;

/// A generator yielding `0..count` one item at a time.
pub fn counting(count: usize) -> impl FnMut() -> Option<usize> + Send + 'static {
  let mut next = 0;
  move || {
    if next < count {
      next += 1;
      Some(next - 1)
    } else {
      None
    }
  }
}
