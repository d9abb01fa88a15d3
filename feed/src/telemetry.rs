// src/telemetry.rs

//! Fine-grained protocol instrumentation.
//!
//! With the `fibre_telemetry` feature enabled every park, wake-up and
//! end-of-stream transition in the feed is recorded into a process-wide
//! collector that can be dumped with [`print_telemetry_report`] or queried with
//! [`counter`]. Without the feature all functions compile to nothing.
//!
//! Coarse lifecycle events (producer start, end of generation, completion) are
//! always emitted through `tracing` regardless of this feature.

#[cfg(feature = "fibre_telemetry")]
mod enabled {
  use std::collections::HashMap;
  use std::fmt;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::thread::{self, ThreadId};
  use std::time::Instant;

  use parking_lot::Mutex;

  static NEXT_EVENT_SEQUENCE_ID: AtomicUsize = AtomicUsize::new(0);

  #[derive(Clone)]
  pub struct TelemetryEvent {
    pub seq_id: usize,
    pub timestamp: Instant,
    pub os_thread_id: ThreadId,
    pub item_id: Option<usize>, // Producer-side sequence number of the item, if any
    pub location: &'static str,
    pub event_type: &'static str,
    pub message: Option<String>,
  }

  impl fmt::Debug for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("TelemetryEvent")
        .field("seq", &self.seq_id)
        .field("os_tid", &self.os_thread_id)
        .field("item_id", &self.item_id)
        .field("loc", &self.location)
        .field("evt", &self.event_type)
        .field("msg", &self.message.as_deref().unwrap_or(""))
        .finish()
    }
  }

  type CounterKey = (&'static str, &'static str); // (location, counter_name)

  struct CollectorData {
    events: Vec<TelemetryEvent>,
    counters: HashMap<CounterKey, usize>,
    start_time: Instant,
  }

  impl CollectorData {
    fn new() -> Self {
      CollectorData {
        events: Vec::new(),
        counters: HashMap::new(),
        start_time: Instant::now(),
      }
    }
  }

  lazy_static::lazy_static! {
      static ref GLOBAL_COLLECTOR: Mutex<CollectorData> = Mutex::new(CollectorData::new());
  }

  pub fn log_event_fn(
    item_id: Option<usize>,
    location: &'static str,
    event_type: &'static str,
    message: Option<String>,
  ) {
    let event = TelemetryEvent {
      seq_id: NEXT_EVENT_SEQUENCE_ID.fetch_add(1, Ordering::Relaxed),
      timestamp: Instant::now(),
      os_thread_id: thread::current().id(),
      item_id,
      location,
      event_type,
      message,
    };
    GLOBAL_COLLECTOR.lock().events.push(event);
  }

  pub fn increment_counter_fn(location: &'static str, counter_name: &'static str) {
    *GLOBAL_COLLECTOR
      .lock()
      .counters
      .entry((location, counter_name))
      .or_insert(0) += 1;
  }

  pub fn counter_fn(location: &'static str, counter_name: &'static str) -> usize {
    GLOBAL_COLLECTOR
      .lock()
      .counters
      .get(&(location, counter_name))
      .copied()
      .unwrap_or(0)
  }

  pub fn print_telemetry_report_fn() {
    let collector = GLOBAL_COLLECTOR.lock();
    println!("\n--- Fibre Feed Telemetry Report (Feature: fibre_telemetry) ---");
    println!("Collection started at: {:?}", collector.start_time);

    if collector.events.is_empty() {
      println!("\n[Events] No detailed events recorded.");
    } else {
      println!("\n[Events] Recorded Events ({}):", collector.events.len());
      let mut sorted_events = collector.events.clone();
      sorted_events.sort_by_key(|e| e.seq_id);

      for event in sorted_events.iter() {
        let time_since_start = event.timestamp.duration_since(collector.start_time);
        println!(
          "  +{:<10.6}s [Seq:{:<5}] TID:{:<12} Item:{:<6} Loc:{:<25} Evt:{:<24} Msg: {}",
          time_since_start.as_secs_f64(),
          event.seq_id,
          format!("{:?}", event.os_thread_id),
          event.item_id.map_or_else(|| "N/A".to_string(), |id| id.to_string()),
          event.location,
          event.event_type,
          event.message.as_deref().unwrap_or("")
        );
      }
    }

    if collector.counters.is_empty() {
      println!("\n[Counters] No counters recorded.");
    } else {
      println!("\n[Counters] Recorded Counters ({}):", collector.counters.len());
      let mut sorted_counters: Vec<_> = collector.counters.iter().collect();
      sorted_counters.sort_by_key(|(k, _v)| **k);
      for ((loc, name), count) in sorted_counters {
        println!("  Loc:{:<25} Counter:{:<30} Value: {}", loc, name, count);
      }
    }
    println!("\n--- End of Telemetry Report ---");
  }

  pub fn clear_telemetry_fn() {
    let mut collector = GLOBAL_COLLECTOR.lock();
    collector.events.clear();
    collector.counters.clear();
    collector.start_time = Instant::now();
    NEXT_EVENT_SEQUENCE_ID.store(0, Ordering::Relaxed);
  }
}

#[cfg(not(feature = "fibre_telemetry"))]
mod disabled {
  #[inline(always)]
  pub fn log_event_fn(
    _item_id: Option<usize>,
    _location: &'static str,
    _event_type: &'static str,
    _message: Option<String>,
  ) {
  }
  #[inline(always)]
  pub fn increment_counter_fn(_location: &'static str, _counter_name: &'static str) {}
  #[inline(always)]
  pub fn counter_fn(_location: &'static str, _counter_name: &'static str) -> usize {
    0
  }
  #[inline(always)]
  pub fn print_telemetry_report_fn() {}
  #[inline(always)]
  pub fn clear_telemetry_fn() {}
}

#[cfg(feature = "fibre_telemetry")]
pub use enabled::{
  clear_telemetry_fn as clear_telemetry, counter_fn as counter,
  increment_counter_fn as increment_counter, log_event_fn as log_event,
  print_telemetry_report_fn as print_telemetry_report,
};

#[cfg(not(feature = "fibre_telemetry"))]
pub use disabled::{
  clear_telemetry_fn as clear_telemetry, counter_fn as counter,
  increment_counter_fn as increment_counter, log_event_fn as log_event,
  print_telemetry_report_fn as print_telemetry_report,
};

// Locations and names used by the feed's instrumentation points.
pub const LOC_PUSH: &str = "FeedShared::push_blocking";
pub const LOC_POP: &str = "FeedShared::pop_blocking";
pub const LOC_FINISH: &str = "FeedShared::finish_generation";
pub const LOC_CHECK_OUT: &str = "FeedShared::deregister_consumer";
pub const LOC_COMPLETE: &str = "FeedShared::try_complete";

pub const EVT_P_QUEUE_FULL: &str = "P:QueueFull";
pub const EVT_P_PARK: &str = "P:ExecPark";
pub const EVT_P_UNPARKED: &str = "P:Unparked";
pub const EVT_P_END_OF_STREAM: &str = "P:EndOfStream";
pub const EVT_P_DRAIN_WAIT: &str = "P:DrainWait";
pub const EVT_C_PARK: &str = "C:ExecPark";
pub const EVT_C_UNPARKED: &str = "C:Unparked";
pub const EVT_C_EXHAUSTED: &str = "C:Exhausted";
pub const EVT_C_CHECK_OUT: &str = "C:CheckOut";

pub const CTR_PRODUCER_PARKS: &str = "ProducerParks";
pub const CTR_CONSUMER_PARKS: &str = "ConsumerParks";
pub const CTR_COMPLETIONS: &str = "Completions";
