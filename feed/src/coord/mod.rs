//! Coordination primitives used by the feed.

mod latch;

pub use latch::{Latch, WaiterKey};
