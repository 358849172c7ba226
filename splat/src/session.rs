use core::fmt::Debug;

use crate::api::{self, Api};
use crate::config::{self, Config};
use crate::exchange::{self, Exchange};
use crate::indicator::Indicator;
use crate::net::{self, Link, LinkError};
use crate::req::Request;
use crate::resp::{code, Response};
use crate::result_ext::ResultExt;
use crate::retry::{RetryTimer, YouShould};
use crate::sensor::{Sample, Sensor};
use crate::time::{self, Clock, Millis, Sleep};

/// Where a device is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
  /// Link is down
  Disconnected,
  /// Bringing the link up
  Connecting,
  /// Link is up, device ID unknown
  Connected,
  /// Asking the platform for the device ID
  Resolving,
  /// Registering the device with the platform
  Registering,
  /// Device ID known; uploading sensor data on a schedule
  Operational,
}

/// Errors encounterable during a single session operation.
///
/// These are all retryable; a stage that keeps failing
/// with them escalates to [`Fatal`].
#[derive(Debug)]
pub enum Error {
  /// Formatting the request failed
  Api(api::Error),
  /// The request / response exchange failed
  Exchange(exchange::Error),
  /// The platform answered, but the response did not contain a device ID
  DeviceIdNotFound,
  /// The operation needs a device ID, and we don't have one yet
  NotResolved,
  /// The sensor could not be read
  Sensor(String),
}

impl From<api::Error> for Error {
  fn from(e: api::Error) -> Self {
    Self::Api(e)
  }
}

impl From<exchange::Error> for Error {
  fn from(e: exchange::Error) -> Self {
    Self::Exchange(e)
  }
}

/// A stage of the session ran out of attempts.
///
/// There is nothing left for the device to do but give up.
#[derive(Debug)]
pub enum Fatal {
  /// The device ID could not be resolved and registering failed
  NotRegistered(Error),
  /// The device registered but its ID still could not be resolved
  NoDeviceId(Error),
}

/// Errors that may be worth attempting the failed work again for
pub trait Retryable {
  /// Could attempting again succeed?
  fn is_retryable(&self) -> bool;
}

impl Retryable for Error {
  fn is_retryable(&self) -> bool {
    true
  }
}

impl<E> Retryable for LinkError<E> {
  fn is_retryable(&self) -> bool {
    !self.is_auth_failure()
  }
}

/// Perform `work` until it succeeds, fails with an error that is not [`Retryable`],
/// or `policy` runs out of attempts; sleeping between attempts as `policy` prescribes.
pub fn stage<C, T, E>(clock: &C,
                      policy: &config::Stage,
                      what: &str,
                      mut work: impl FnMut() -> Result<T, E>)
                      -> Result<T, E>
  where C: Clock + Sleep,
        E: Retryable + Debug
{
  let mut retry = RetryTimer::new(time::now_millis(clock).0,
                                  policy.strategy,
                                  policy.max_attempts);

  loop {
    let e = match work() {
      | Ok(t) => return Ok(t),
      | Err(e) if !e.is_retryable() => return Err(e),
      | Err(e) => e,
    };

    let attempt = retry.attempts();
    match retry.what_should_i_do() {
      | YouShould::Retry { after } => {
        log::warn!("{} failed (attempt {} of {}): {:?}, retrying in {}ms",
                   what,
                   attempt.0,
                   policy.max_attempts.0,
                   e,
                   after.0);
        clock.sleep(after);
      },
      | YouShould::Cry => {
        log::error!("{} failed after {} attempts: {:?}", what, attempt.0, e);
        return Err(e);
      },
    }
  }
}

/// Bring `link` up, retrying the (already retrying) [connect primitive](net::connect)
/// as a whole stage, with a progress [`Indicator`] running meanwhile.
///
/// Authentication failures are returned immediately.
pub fn connect<L, C>(link: &mut L, clock: &C, config: &Config) -> Result<(), LinkError<L::Error>>
  where L: Link,
        C: Clock + Sleep
{
  log::info!("{:?} -> {:?}", State::Disconnected, State::Connecting);

  let indicator = Indicator::spawn("Connecting", config.connect.indicator_interval)
    .map_err(|e| log::warn!("Couldn't start connection indicator: {:?}", e))
    .ok();

  let connected = stage(clock, &config.stage, "Connect", || {
                    net::connect(link, config.connect.attempts)
                  });

  if let Some(indicator) = indicator {
    indicator.stop();
  }

  connected.perform(|_| log::info!("{:?} -> {:?}", State::Connecting, State::Connected))
}

/// The device's session with the smart platform, from a connected
/// link to uploading sensor data forever.
#[derive(Debug)]
pub struct Session<X, C> {
  exchange: X,
  clock: C,
  config: Config,
  api: Api,
  state: State,
  device_id: Option<String>,
  ticks: u64,
  started: Option<Millis>,
}

impl<X, C> Session<X, C> {
  /// Current state
  pub fn state(&self) -> State {
    self.state
  }

  /// The device ID, once resolved
  pub fn device_id(&self) -> Option<&str> {
    self.device_id.as_deref()
  }

  /// Number of operational ticks so far
  pub fn ticks(&self) -> u64 {
    self.ticks
  }
}

impl<X, C> Session<X, C>
  where X: Exchange,
        C: Clock + Sleep + Clone
{
  /// Create a session over an exchanger whose link is already up
  pub fn new(exchange: X, clock: C, config: Config) -> Self {
    Self { api: Api::new(config.device.clone(), config.buffers),
           exchange,
           clock,
           config,
           state: State::Connected,
           device_id: None,
           ticks: 0,
           started: None }
  }

  fn transition(&mut self, to: State) {
    if self.state != to {
      log::info!("{:?} -> {:?}", self.state, to);
      self.state = to;
    }
  }

  fn send(&self, req: &Request) -> Result<Response, Error> {
    self.exchange
        .exchange(req, self.config.msg.response_timeout)
        .map_err(Error::from)
  }

  /// Ask the platform for this device's ID (once, no retries)
  pub fn get_device_id(&mut self) -> Result<String, Error> {
    let req = Request::get(self.api.thing_uri()?, self.config.msg.get_id);
    let resp = self.send(&req)?.expect_code(code::CONTENT)?;

    resp.payload_str()
        .ok()
        .and_then(api::device_id)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .ok_or(Error::DeviceIdNotFound)
  }

  /// Register this device with the platform (once, no retries)
  pub fn register(&mut self) -> Result<Response, Error> {
    let path = self.api.registry_uri()?.to_string();
    let body = self.api.register_body()?.to_vec();
    let req = Request::post(path, self.config.msg.post_id, body);

    self.send(&req)?
        .expect_code(code::CONTENT)
        .map_err(Error::from)
  }

  fn resolve_stage(&mut self) -> Result<String, Error> {
    self.transition(State::Resolving);
    let clock = self.clock.clone();
    let policy = self.config.stage;
    stage(&clock, &policy, "Get device ID", || self.get_device_id())
  }

  /// Resolve the device ID, registering the device if the
  /// platform does not know about it yet.
  ///
  /// Every step is retried per the [stage policy](config::Stage).
  pub fn resolve_identity(&mut self) -> Result<&str, Fatal> {
    let id = match self.resolve_stage() {
      | Ok(id) => id,
      | Err(_) => {
        self.transition(State::Registering);
        let clock = self.clock.clone();
        let policy = self.config.stage;
        stage(&clock, &policy, "Register", || self.register()).map_err(Fatal::NotRegistered)?;

        self.resolve_stage().map_err(Fatal::NoDeviceId)?
      },
    };

    log::info!("Device ID: {}", id);
    self.transition(State::Operational);
    Ok(self.device_id.insert(id).as_str())
  }

  /// Upload a sensor sample (once, no retries)
  pub fn write_sensor_data(&mut self, sample: &Sample) -> Result<Response, Error> {
    let id = self.device_id.as_deref().ok_or(Error::NotResolved)?;
    let path = self.api.rawdata_uri(id)?.to_string();
    let body = self.api.sensor_data_body(sample)?.to_vec();
    let req = Request::post(path, self.config.msg.post_id, body);

    self.send(&req)?
        .expect_code(code::CONTENT)
        .map_err(Error::from)
  }

  /// Read back the latest data the platform holds for one of our sensors.
  ///
  /// Late responses to earlier requests may still be in flight, so only a
  /// response carrying the read-back message ID is accepted. The request is
  /// sent again immediately (up to [`config::Msg::readback_attempts`] times)
  /// until one arrives.
  pub fn get_sensor_data(&mut self, sensor: &str) -> Result<Response, Error> {
    let id = self.device_id.as_deref().ok_or(Error::NotResolved)?;
    let expected = self.config.msg.readback_id;
    let req = Request::get(self.api.sensor_rawdata_uri(id, sensor)?, expected);

    let attempts = self.config.msg.readback_attempts.0.max(1);
    let mut last = Error::Exchange(exchange::Error::Timeout);
    for attempt in 1..=attempts {
      match self.send(&req)
                .and_then(|resp| resp.expect_id(expected).map_err(Error::from))
      {
        | Ok(resp) => return resp.expect_code(code::CONTENT).map_err(Error::from),
        | Err(e) => {
          log::debug!("Read back attempt {} of {} failed: {:?}", attempt, attempts, e);
          last = e;
        },
      }
    }

    Err(last)
  }

  /// Read the sensor and upload the reading
  pub fn tick<S: Sensor>(&mut self, sensor: &mut S) -> Result<Response, Error> {
    self.ticks += 1;

    let now = time::now_millis(&self.clock);
    let started = *self.started.get_or_insert(now);
    log::info!("Tick {} ({}s elapsed)",
               self.ticks,
               time::elapsed(&self.clock, started).0 / 1000);

    let sample = sensor.read()
                       .map_err(|e| Error::Sensor(format!("{:?}", e)))?;
    log::debug!("{:?}", sample);

    self.write_sensor_data(&sample)
  }

  /// [`Session::tick`], logging and discarding failures,
  /// then sleep until the next scheduled upload.
  pub fn step<S: Sensor>(&mut self, sensor: &mut S) {
    self.tick(sensor)
        .perform_err(|e| log::warn!("Upload failed: {:?}", e))
        .ok();

    self.clock.sleep(self.config.schedule);
  }

  /// Upload sensor data on schedule, forever.
  pub fn operate<S: Sensor>(&mut self, mut sensor: S) -> ! {
    loop {
      self.step(&mut sensor);
    }
  }
}

#[cfg(test)]
mod test {
  use embedded_time::duration::Milliseconds;
  use toad_msg::Id;

  use super::*;
  use crate::config::Device;
  use crate::req::Method;
  use crate::retry::{Attempts, Strategy};
  use crate::test::{ClockMock, ExchangeMock, LinkMock, SensorMock};

  fn config() -> Config {
    let device = Device { digest: "d1g3st".into(),
                          serial: "SN123".into(),
                          api_key: "k3y".into() };
    Config::new(device, "127.0.0.1:5683".parse().unwrap())
  }

  fn ok(id: u16, payload: &str) -> Result<Response, exchange::Error> {
    Ok(Response { id: Id(id),
                  code: code::CONTENT,
                  payload: payload.as_bytes().to_vec(),
                  content_format: None })
  }

  fn timeout() -> Result<Response, exchange::Error> {
    Err(exchange::Error::Timeout)
  }

  #[test]
  fn stage_calls_work_exactly_max_attempts() {
    let clock = ClockMock::new();
    let mut calls = 0;

    let r = stage(&clock, &config::Stage::default(), "test", || {
              calls += 1;
              Err::<(), _>(Error::DeviceIdNotFound)
            });

    assert!(matches!(r, Err(Error::DeviceIdNotFound)));
    assert_eq!(calls, 3);
    assert_eq!(clock.millis(), 20_000);
  }

  #[test]
  fn stage_stops_on_success() {
    let clock = ClockMock::new();
    let mut calls = 0;
    let policy = config::Stage { strategy: Strategy::fixed(Milliseconds(5)),
                                 max_attempts: Attempts(10) };

    let r = stage(&clock, &policy, "test", || {
              calls += 1;
              if calls < 4 {
                Err(Error::NotResolved)
              } else {
                Ok(calls)
              }
            });

    assert_eq!(r.unwrap(), 4);
    assert_eq!(clock.millis(), 15);
  }

  #[test]
  fn get_id_stage_exhausted_over_failing_exchanger() {
    let ex = ExchangeMock::new(vec![]);
    let mut session = Session::new(&ex, ClockMock::new(), config());

    assert!(matches!(session.resolve_stage(),
                     Err(Error::Exchange(exchange::Error::Timeout))));
    assert_eq!(ex.requests().len(), 3);
  }

  #[test]
  fn get_device_id() {
    let ex = ExchangeMock::new(vec![ok(9, r#"{"deviceId":"7568574498"}"#)]);
    let mut session = Session::new(&ex, ClockMock::new(), config());

    assert_eq!(session.get_device_id().unwrap(), "7568574498");

    let reqs = ex.requests();
    assert_eq!(reqs[0].method, Method::Get);
    assert_eq!(reqs[0].id, Id(9));
    assert_eq!(reqs[0].path, "/k3y/iot/v1/thing/SN123?digest=d1g3st");
  }

  #[test]
  fn get_device_id_rejects_error_codes() {
    let not_found = Ok(Response { id: Id(9),
                                  code: code::NOT_FOUND,
                                  payload: br#"{"deviceId":"1"}"#.to_vec(),
                                  content_format: None });
    let ex = ExchangeMock::new(vec![not_found, ok(9, r#"{"id":"1"}"#)]);
    let mut session = Session::new(&ex, ClockMock::new(), config());

    assert!(matches!(session.get_device_id(),
                     Err(Error::Exchange(exchange::Error::UnexpectedCode { .. }))));
    assert!(matches!(session.get_device_id(), Err(Error::DeviceIdNotFound)));
  }

  #[test]
  fn registers_when_id_unknown() {
    let ex = ExchangeMock::new(vec![timeout(),
                                    timeout(),
                                    ok(9, r#"{"error":"unknown device"}"#),
                                    ok(7, ""),
                                    ok(9, r#"{"deviceId":"7568574498"}"#)]);
    let mut session = Session::new(&ex, ClockMock::new(), config());
    assert_eq!(session.state(), State::Connected);

    assert_eq!(session.resolve_identity().unwrap(), "7568574498");
    assert_eq!(session.state(), State::Operational);
    assert_eq!(session.device_id(), Some("7568574498"));

    let reqs = ex.requests();
    assert_eq!(reqs.len(), 5);
    assert_eq!(reqs[3].method, Method::Post);
    assert_eq!(reqs[3].id, Id(7));
    assert_eq!(reqs[3].path, "/k3y/iot/v1/registry/SN123");
    assert_eq!(reqs[3].payload_str(),
               Ok(r#"{"op":"Reconfigure","digest":"d1g3st","authority":"device"}"#));
  }

  #[test]
  fn registration_exhausted_is_fatal() {
    let ex = ExchangeMock::new(vec![]);
    let clock = ClockMock::new();
    let mut session = Session::new(&ex, clock.clone(), config());

    assert!(matches!(session.resolve_identity(),
                     Err(Fatal::NotRegistered(Error::Exchange(exchange::Error::Timeout)))));
    assert_eq!(session.state(), State::Registering);
    assert_eq!(ex.requests().len(), 6);
    assert_eq!(clock.millis(), 40_000);
  }

  #[test]
  fn registered_but_unresolvable_is_fatal() {
    let ex = ExchangeMock::new(vec![timeout(), timeout(), timeout(), ok(7, "")]);
    let mut session = Session::new(&ex, ClockMock::new(), config());

    assert!(matches!(session.resolve_identity(), Err(Fatal::NoDeviceId(_))));
    assert_eq!(ex.requests().len(), 7);
  }

  #[test]
  fn upload_before_resolving() {
    let ex = ExchangeMock::new(vec![]);
    let mut session = Session::new(&ex, ClockMock::new(), config());
    let sample = Sample { temperature: 1.0,
                          humidity: 1 };

    assert!(matches!(session.write_sensor_data(&sample), Err(Error::NotResolved)));
    assert!(ex.requests().is_empty());
  }

  #[test]
  fn upload_timeouts_keep_operating() {
    let ex = ExchangeMock::new(vec![ok(9, r#"{"deviceId":"42"}"#)]);
    let clock = ClockMock::new();
    let mut session = Session::new(&ex, clock.clone(), config());
    let mut sensor = SensorMock::new(Sample { temperature: 23.456,
                                              humidity: 51 });

    session.resolve_identity().unwrap();
    (0..5).for_each(|_| session.step(&mut sensor));

    assert_eq!(session.ticks(), 5);
    assert_eq!(session.state(), State::Operational);
    assert_eq!(clock.millis(), 50_000);

    let reqs = ex.requests();
    assert_eq!(reqs.len(), 6);
    reqs[1..].iter().for_each(|req| {
                      assert_eq!(req.method, Method::Post);
                      assert_eq!(req.path, "/k3y/iot/v1/device/42/rawdata");
                      assert_eq!(req.payload_str(),
                                 Ok(r#"[{"id":"temperature","value":["23.46"]},{"id":"humidity","value":["51"]}]"#));
                    });
  }

  #[test]
  fn sensor_failure_skips_upload() {
    let ex = ExchangeMock::new(vec![ok(9, r#"{"deviceId":"42"}"#)]);
    let mut session = Session::new(&ex, ClockMock::new(), config());
    let mut sensor = SensorMock::failing();

    session.resolve_identity().unwrap();
    assert!(matches!(session.tick(&mut sensor), Err(Error::Sensor(_))));
    assert_eq!(ex.requests().len(), 1);
  }

  #[test]
  fn read_back_skips_mismatched_ids() {
    let ex = ExchangeMock::new(vec![ok(9, r#"{"deviceId":"42"}"#),
                                    ok(7, "stale"),
                                    ok(9, r#"[{"value":["23.46"]}]"#)]);
    let mut session = Session::new(&ex, ClockMock::new(), config());
    session.resolve_identity().unwrap();

    let resp = session.get_sensor_data("temperature").unwrap();
    assert_eq!(resp.payload_str(), Ok(r#"[{"value":["23.46"]}]"#));

    let reqs = ex.requests();
    assert_eq!(reqs.len(), 3);
    assert_eq!(reqs[2].path, "/k3y/iot/v1/device/42/sensor/temperature/rawdata");
    assert_eq!(reqs[2].method, Method::Get);
  }

  #[test]
  fn read_back_gives_up() {
    let ex = ExchangeMock::new(vec![ok(9, r#"{"deviceId":"42"}"#),
                                    ok(1, ""),
                                    ok(2, ""),
                                    ok(3, ""),
                                    ok(9, "")]);
    let mut session = Session::new(&ex, ClockMock::new(), config());
    session.resolve_identity().unwrap();

    assert!(matches!(session.get_sensor_data("humidity"),
                     Err(Error::Exchange(exchange::Error::IdMismatch { expected: Id(9),
                                                                       actual: Id(3) }))));
    assert_eq!(ex.requests().len(), 4);
  }

  #[test]
  fn connect_retries_stage() {
    // each connect primitive makes 4 attempts, the stage calls it 3 times
    let mut link = LinkMock::failing(6);
    let clock = ClockMock::new();
    let mut config = config();
    config.connect.indicator_interval = Milliseconds(60_000);

    connect(&mut link, &clock, &config).unwrap();
    assert_eq!(link.connects(), 7);
    assert_eq!(clock.millis(), 10_000);
  }

  #[test]
  fn connect_auth_failure_is_fatal() {
    let mut link = LinkMock::auth_failure();
    let clock = ClockMock::new();

    assert_eq!(connect(&mut link, &clock, &config()), Err(LinkError::AuthFailure));
    assert_eq!(link.connects(), 1);
    assert_eq!(clock.millis(), 0);
  }

  #[test]
  fn connect_exhausted() {
    let mut link = LinkMock::failing(100);
    let clock = ClockMock::new();

    assert_eq!(connect(&mut link, &clock, &config()),
               Err(LinkError::Other("no signal")));
    assert_eq!(link.connects(), 12);
  }
}
