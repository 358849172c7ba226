use std::net::SocketAddr;

use embedded_time::duration::Milliseconds;
use toad_msg::Id;

use crate::retry::{Attempts, Strategy};
use crate::time::Millis;

/// Credentials identifying this device to the smart platform
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
  /// Device digest, issued alongside the serial number
  pub digest: String,
  /// Device serial number
  pub serial: String,
  /// Project API key, the first segment of every endpoint path
  pub api_key: String,
}

/// Capacities of the working buffers.
///
/// Requests whose URI or body would not fit are rejected
/// before anything is sent, and responses whose payload would
/// not fit are rejected after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Buffers {
  /// Capacity of the URI buffer
  ///
  /// ```
  /// use splat::config::Buffers;
  ///
  /// assert_eq!(Buffers::default().uri, 128);
  /// ```
  pub uri: usize,
  /// Capacity of the JSON buffer, used both for
  /// request bodies and for response payloads
  ///
  /// ```
  /// use splat::config::Buffers;
  ///
  /// assert_eq!(Buffers::default().json, 256);
  /// ```
  pub json: usize,
  /// Largest datagram the receiver will read. Anything beyond
  /// this is truncated by the socket.
  ///
  /// ```
  /// use splat::config::Buffers;
  ///
  /// assert_eq!(Buffers::default().recv, 1280);
  /// ```
  pub recv: usize,
}

impl Default for Buffers {
  fn default() -> Self {
    Buffers { uri: 128,
              json: 256,
              recv: 1280 }
  }
}

/// Configuration options related to sending requests & awaiting responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Msg {
  /// Message ID placed on GET requests
  ///
  /// ```
  /// use splat::config::Msg;
  /// use toad_msg::Id;
  ///
  /// assert_eq!(Msg::default().get_id, Id(9));
  /// ```
  pub get_id: Id,
  /// Message ID placed on POST requests
  ///
  /// ```
  /// use splat::config::Msg;
  /// use toad_msg::Id;
  ///
  /// assert_eq!(Msg::default().post_id, Id(7));
  /// ```
  pub post_id: Id,
  /// Message ID used when reading sensor data back from the
  /// platform. Responses to a read-back are only accepted if
  /// they carry this ID.
  ///
  /// ```
  /// use splat::config::Msg;
  /// use toad_msg::Id;
  ///
  /// assert_eq!(Msg::default().readback_id, Id(9));
  /// ```
  pub readback_id: Id,
  /// How long to wait for a response before giving up on an exchange.
  ///
  /// Defaults to 30 seconds.
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use splat::config::Msg;
  ///
  /// assert_eq!(Msg::default().response_timeout, Milliseconds(30_000u64));
  /// ```
  pub response_timeout: Millis,
  /// How often the inbox is checked while waiting for a response.
  ///
  /// Defaults to 1 second.
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use splat::config::Msg;
  ///
  /// assert_eq!(Msg::default().poll_interval, Milliseconds(1_000u64));
  /// ```
  pub poll_interval: Millis,
  /// Number of requests sent when reading sensor data back
  /// before giving up on a response with the expected ID.
  ///
  /// ```
  /// use splat::config::Msg;
  /// use splat::retry::Attempts;
  ///
  /// assert_eq!(Msg::default().readback_attempts, Attempts(3));
  /// ```
  pub readback_attempts: Attempts,
}

impl Default for Msg {
  fn default() -> Self {
    Msg { get_id: Id(9),
          post_id: Id(7),
          readback_id: Id(9),
          response_timeout: Milliseconds(30_000),
          poll_interval: Milliseconds(1_000),
          readback_attempts: Attempts(3) }
  }
}

/// Retry policy applied to a whole stage of the session
/// (connecting, resolving the device ID, registering)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
  /// Delay between attempts.
  ///
  /// Defaults to a fixed 10 second delay:
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use splat::config::Stage;
  /// use splat::retry::Strategy;
  ///
  /// assert_eq!(Stage::default().strategy,
  ///            Strategy::Delay { min: Milliseconds(10_000),
  ///                              max: Milliseconds(10_000) });
  /// ```
  pub strategy: Strategy,
  /// Number of attempts before the stage is considered failed
  ///
  /// ```
  /// use splat::config::Stage;
  /// use splat::retry::Attempts;
  ///
  /// assert_eq!(Stage::default().max_attempts, Attempts(3));
  /// ```
  pub max_attempts: Attempts,
}

impl Default for Stage {
  fn default() -> Self {
    Stage { strategy: Strategy::fixed(Milliseconds(10_000)),
            max_attempts: Attempts(3) }
  }
}

/// Configuration options related to bringing up the network link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connect {
  /// Number of back-to-back connection attempts made by
  /// a single connect, before the [`Stage`] policy kicks in.
  ///
  /// ```
  /// use splat::config::Connect;
  /// use splat::retry::Attempts;
  ///
  /// assert_eq!(Connect::default().attempts, Attempts(4));
  /// ```
  pub attempts: Attempts,
  /// How often the progress indicator reports while connecting
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use splat::config::Connect;
  ///
  /// assert_eq!(Connect::default().indicator_interval, Milliseconds(4_000u64));
  /// ```
  pub indicator_interval: Millis,
}

impl Default for Connect {
  fn default() -> Self {
    Connect { attempts: Attempts(4),
              indicator_interval: Milliseconds(4_000) }
  }
}

/// Runtime config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// See [`Device`]
  pub device: Device,
  /// Address of the smart platform's CoAP endpoint
  pub server: SocketAddr,
  /// Local address the UDP socket binds to
  pub bind: SocketAddr,
  /// See [`Buffers`]
  pub buffers: Buffers,
  /// See [`Msg`]
  pub msg: Msg,
  /// See [`Stage`]
  pub stage: Stage,
  /// See [`Connect`]
  pub connect: Connect,
  /// Time between sensor uploads, also used as the default
  /// [`Stage`] delay.
  pub schedule: Millis,
}

impl Config {
  /// Create a config for a device talking to `server`,
  /// with every other option at its default.
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use splat::config::{Config, Device};
  ///
  /// let device = Device { digest: "d1g3st".into(),
  ///                       serial: "SN123".into(),
  ///                       api_key: "k".into() };
  /// let config = Config::new(device, "127.0.0.1:5683".parse().unwrap());
  ///
  /// assert_eq!(config.schedule, Milliseconds(10_000u64));
  /// assert_eq!(config.bind, "0.0.0.0:0".parse().unwrap());
  /// ```
  pub fn new(device: Device, server: SocketAddr) -> Self {
    Config { device,
             server,
             bind: SocketAddr::from(([0, 0, 0, 0], 0)),
             buffers: Buffers::default(),
             msg: Msg::default(),
             stage: Stage::default(),
             connect: Connect::default(),
             schedule: Milliseconds(10_000) }
  }

  /// Worst-case time spent in a stage whose every attempt times out
  pub fn max_stage_millis(&self) -> u64 {
    let waits = self.stage.strategy.max_time(self.stage.max_attempts).0;
    let exchanges = self.msg.response_timeout.0 * self.stage.max_attempts.0 as u64;
    waits + exchanges
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn max_stage_millis() {
    let device = Device { digest: "d".into(),
                          serial: "s".into(),
                          api_key: "k".into() };
    let config = Config::new(device, "127.0.0.1:5683".parse().unwrap());

    // 3 timeouts of 30s + 2 delays of 10s
    assert_eq!(config.max_stage_millis(), 110_000);
  }
}
