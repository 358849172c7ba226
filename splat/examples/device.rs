//! Report simulated temperature & humidity readings to a smart platform.
//!
//! ```sh
//! SPLAT_SERVER=10.0.0.1:5683 \
//! SPLAT_API_KEY=... SPLAT_SERIAL=... SPLAT_DIGEST=... \
//! RUST_LOG=info cargo run --example device
//! ```
use std::env;
use std::net::SocketAddr;
use std::process::exit;
use std::time::{SystemTime, UNIX_EPOCH};

use embedded_time::duration::Milliseconds;
use splat::config::{Config, Device as Creds};
use splat::device::Device;
use splat::sensor::{Sample, Simulated};
use splat::std::{Clock, UdpLink};

fn var(name: &str) -> String {
  env::var(name).unwrap_or_else(|_| {
                  log::error!("{} must be set", name);
                  exit(1)
                })
}

fn main() {
  simple_logger::init_with_env().unwrap();

  let server = var("SPLAT_SERVER").parse::<SocketAddr>().unwrap_or_else(|e| {
                                                             log::error!("SPLAT_SERVER: {}", e);
                                                             exit(1)
                                                           });
  let creds = Creds { api_key: var("SPLAT_API_KEY"),
                      serial: var("SPLAT_SERIAL"),
                      digest: var("SPLAT_DIGEST") };

  let mut config = Config::new(creds, server);
  if let Some(ms) = env::var("SPLAT_SCHEDULE_MS").ok()
                                                 .and_then(|ms| ms.parse::<u64>().ok())
  {
    config.schedule = Milliseconds(ms);
    config.stage.strategy = splat::retry::Strategy::fixed(Milliseconds(ms));
  }

  let link = UdpLink::new(config.bind, config.server);
  let clock = Clock::new();
  let seed = SystemTime::now().duration_since(UNIX_EPOCH)
                              .map(|d| d.as_secs())
                              .unwrap_or(0);
  let sensor = Simulated::new(seed,
                              Sample { temperature: 22.0,
                                       humidity: 45 });

  let device = match Device::start(link, clock, config) {
    | Ok(device) => device,
    | Err(e) => {
      log::error!("Couldn't start device: {:?}", e);
      exit(1)
    },
  };

  let Err(e) = device.run(sensor);
  log::error!("{:?}", e);
  exit(1)
}
