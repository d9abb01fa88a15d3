mod common;
use common::*;

use std::sync::Arc;
use std::thread;

#[tokio::test]
async fn wait_async_resolves_after_consumers_finish() {
  let feed = fibre_feed::create(4, counting(ITEMS_MEDIUM));
  let sessions: Vec<_> = (0..3).map(|_| feed.check_in()).collect();
  feed.start().unwrap();

  let handles: Vec<_> = sessions
    .into_iter()
    .map(|consumer| thread::spawn(move || consumer.count()))
    .collect();

  tokio::time::timeout(LONG_TIMEOUT, feed.wait_async())
    .await
    .expect("feed did not finish in time");
  assert!(feed.is_finished());

  let consumed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
  assert_eq!(consumed, ITEMS_MEDIUM);
  feed.release().unwrap();
}

#[tokio::test]
async fn wait_async_is_pending_until_check_out() {
  let feed = fibre_feed::create(2, counting(0));
  let consumer = feed.check_in();
  feed.start().unwrap();

  let early = tokio::time::timeout(SHORT_TIMEOUT / 5, feed.wait_async()).await;
  assert!(early.is_err(), "completed while a consumer was still checked in");
  // The timed-out future was dropped and took its waker with it.
  assert!(format!("{:?}", feed).contains("async_waiters: 0"));

  consumer.check_out();
  tokio::time::timeout(SHORT_TIMEOUT, feed.wait_async())
    .await
    .expect("check out should complete the feed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_tasks_await_the_same_feed() {
  let feed = Arc::new(fibre_feed::create(1, counting(ITEMS_LOW)));
  let consumer = feed.check_in();
  feed.start().unwrap();

  let waiters: Vec<_> = (0..8)
    .map(|_| tokio::spawn(feed.wait_async()))
    .collect();

  let worker = thread::spawn(move || consumer.count());
  for waiter in waiters {
    tokio::time::timeout(LONG_TIMEOUT, waiter)
      .await
      .expect("waiter timed out")
      .unwrap();
  }
  assert_eq!(worker.join().unwrap(), ITEMS_LOW);
  // Awaiting an already finished feed resolves immediately.
  feed.wait_async().await;
}
