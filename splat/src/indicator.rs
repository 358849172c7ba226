use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::time::Millis;

/// A low-priority background thread that reports progress
/// while the device is busy connecting, so that a slow cellular
/// attach does not look like a hang.
///
/// Stops when [`Indicator::stop`] is called or the indicator is dropped.
#[derive(Debug)]
pub struct Indicator {
  stop: Option<Sender<()>>,
  handle: Option<JoinHandle<u32>>,
}

impl Indicator {
  /// Spawn a thread named `splat-indicator` that logs `what`
  /// every `interval` until stopped
  pub fn spawn(what: &'static str, interval: Millis) -> io::Result<Self> {
    let (tx, rx) = mpsc::channel::<()>();
    let interval = Duration::from_millis(interval.0);

    thread::Builder::new().name("splat-indicator".into())
                          .spawn(move || {
                            let mut ticks = 0u32;
                            loop {
                              match rx.recv_timeout(interval) {
                                | Err(RecvTimeoutError::Timeout) => {
                                  ticks += 1;
                                  log::info!("{}{}", what, ".".repeat(ticks as usize));
                                },
                                | Ok(()) | Err(RecvTimeoutError::Disconnected) => break ticks,
                              }
                            }
                          })
                          .map(|handle| Self { stop: Some(tx),
                                               handle: Some(handle) })
  }

  /// Stop the indicator, yielding the number of times it reported
  pub fn stop(mut self) -> u32 {
    self.shutdown()
  }

  fn shutdown(&mut self) -> u32 {
    if let Some(stop) = self.stop.take() {
      stop.send(()).ok();
    }

    self.handle
        .take()
        .and_then(|h| h.join().ok())
        .unwrap_or(0)
  }
}

impl Drop for Indicator {
  fn drop(&mut self) {
    self.shutdown();
  }
}
