use core::fmt::Write;

use serde::Serialize;

use crate::config::{Buffers, Device};
use crate::sensor::Sample;

/// Which working buffer overflowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Buffer {
  /// The URI buffer
  Uri,
  /// The JSON body buffer
  Json,
}

/// Errors encounterable while formatting requests to the smart platform
#[derive(Debug)]
pub enum Error {
  /// The formatted value does not fit in its buffer
  TooLong {
    /// The buffer that overflowed
    buffer: Buffer,
    /// Capacity of the buffer
    capacity: usize,
    /// Size of the formatted value
    size: usize,
  },
  /// Serializing a JSON body failed
  Json(serde_json::Error),
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Self::Json(e)
  }
}

#[derive(Serialize)]
struct Reconfigure<'a> {
  op: &'a str,
  digest: &'a str,
  authority: &'a str,
}

#[derive(Serialize)]
struct Reading<'a> {
  id: &'a str,
  value: [String; 1],
}

/// Formats the endpoints and bodies of the smart platform API
/// for a single device.
///
/// Every value is written into a buffer that is reused from one call to the
/// next, and rejected if it grows beyond the buffer's configured capacity.
///
/// ```
/// use splat::api::Api;
/// use splat::config::{Buffers, Device};
///
/// let device = Device { digest: "d1g3st".into(),
///                       serial: "SN123".into(),
///                       api_key: "k3y".into() };
/// let mut api = Api::new(device, Buffers::default());
///
/// assert_eq!(api.thing_uri().unwrap(), "/k3y/iot/v1/thing/SN123?digest=d1g3st");
/// assert_eq!(api.rawdata_uri("42").unwrap(), "/k3y/iot/v1/device/42/rawdata");
/// ```
#[derive(Debug, Clone)]
pub struct Api {
  device: Device,
  buffers: Buffers,
  uri: String,
  json: Vec<u8>,
}

impl Api {
  /// Create an API formatter for `device`
  pub fn new(device: Device, buffers: Buffers) -> Self {
    Self { uri: String::with_capacity(buffers.uri),
           json: Vec::with_capacity(buffers.json),
           device,
           buffers }
  }

  /// The device this formatter writes requests for
  pub fn device(&self) -> &Device {
    &self.device
  }

  /// `GET` endpoint that resolves this device's serial & digest into its device ID
  pub fn thing_uri(&mut self) -> Result<&str, Error> {
    let Device { api_key,
                 serial,
                 digest, } = &self.device;
    Self::write_uri(&mut self.uri,
                    self.buffers.uri,
                    format_args!("/{}/iot/v1/thing/{}?digest={}", api_key, serial, digest))
  }

  /// `POST` endpoint that registers this device with the platform
  pub fn registry_uri(&mut self) -> Result<&str, Error> {
    let Device { api_key, serial, .. } = &self.device;
    Self::write_uri(&mut self.uri,
                    self.buffers.uri,
                    format_args!("/{}/iot/v1/registry/{}", api_key, serial))
  }

  /// `POST` endpoint that accepts sensor readings for `device_id`
  pub fn rawdata_uri(&mut self, device_id: &str) -> Result<&str, Error> {
    Self::write_uri(&mut self.uri,
                    self.buffers.uri,
                    format_args!("/{}/iot/v1/device/{}/rawdata",
                                 self.device.api_key, device_id))
  }

  /// `GET` endpoint that reads back the readings of one sensor of `device_id`
  pub fn sensor_rawdata_uri(&mut self, device_id: &str, sensor: &str) -> Result<&str, Error> {
    Self::write_uri(&mut self.uri,
                    self.buffers.uri,
                    format_args!("/{}/iot/v1/device/{}/sensor/{}/rawdata",
                                 self.device.api_key, device_id, sensor))
  }

  /// Body of the registration request
  ///
  /// ```
  /// use splat::api::Api;
  /// use splat::config::{Buffers, Device};
  ///
  /// let device = Device { digest: "d1g3st".into(),
  ///                       serial: "SN123".into(),
  ///                       api_key: "k3y".into() };
  /// let mut api = Api::new(device, Buffers::default());
  ///
  /// assert_eq!(api.register_body().unwrap(),
  ///            br#"{"op":"Reconfigure","digest":"d1g3st","authority":"device"}"#);
  /// ```
  pub fn register_body(&mut self) -> Result<&[u8], Error> {
    let body = Reconfigure { op: "Reconfigure",
                             digest: &self.device.digest,
                             authority: "device" };
    Self::write_json(&mut self.json, self.buffers.json, &body)
  }

  /// Body of a sensor data upload
  ///
  /// ```
  /// use splat::api::Api;
  /// use splat::config::{Buffers, Device};
  /// use splat::sensor::Sample;
  ///
  /// let device = Device { digest: "d".into(),
  ///                       serial: "s".into(),
  ///                       api_key: "k".into() };
  /// let mut api = Api::new(device, Buffers::default());
  /// let sample = Sample { temperature: 21.5,
  ///                       humidity: 40 };
  ///
  /// assert_eq!(api.sensor_data_body(&sample).unwrap(),
  ///            br#"[{"id":"temperature","value":["21.50"]},{"id":"humidity","value":["40"]}]"#);
  /// ```
  pub fn sensor_data_body(&mut self, sample: &Sample) -> Result<&[u8], Error> {
    let body = [Reading { id: "temperature",
                          value: [format!("{:.2}", sample.temperature)] },
                Reading { id: "humidity",
                          value: [sample.humidity.to_string()] }];
    Self::write_json(&mut self.json, self.buffers.json, &body)
  }

  fn write_uri<'a>(buf: &'a mut String,
                   capacity: usize,
                   args: core::fmt::Arguments)
                   -> Result<&'a str, Error> {
    buf.clear();
    // writing to a String is infallible
    buf.write_fmt(args).ok();
    Self::check(Buffer::Uri, capacity, buf.len()).map(|_| buf.as_str())
  }

  fn write_json<'a, T: Serialize>(buf: &'a mut Vec<u8>,
                                  capacity: usize,
                                  body: &T)
                                  -> Result<&'a [u8], Error> {
    buf.clear();
    serde_json::to_writer(&mut *buf, body)?;
    Self::check(Buffer::Json, capacity, buf.len()).map(|_| buf.as_slice())
  }

  fn check(buffer: Buffer, capacity: usize, size: usize) -> Result<(), Error> {
    if size > capacity {
      Err(Error::TooLong { buffer,
                           capacity,
                           size })
    } else {
      Ok(())
    }
  }
}

/// Find the device ID in a response to the [thing endpoint](Api::thing_uri).
///
/// The response is not parsed as JSON; the ID is whatever follows the first
/// `"deviceId":"` up to the next `"`.
///
/// ```
/// use splat::api::device_id;
///
/// assert_eq!(device_id(r#"{"deviceId":"7568574498"}"#), Some("7568574498"));
/// assert_eq!(device_id(r#"{"error":"not found"}"#), None);
/// ```
pub fn device_id(payload: &str) -> Option<&str> {
  const MARKER: &str = "\"deviceId\":\"";

  let start = payload.find(MARKER)? + MARKER.len();
  let rest = &payload[start..];
  rest.find('"').map(|end| &rest[..end])
}

#[cfg(test)]
mod test {
  use super::*;

  fn api(buffers: Buffers) -> Api {
    let device = Device { digest: "d1g3st".into(),
                          serial: "SN123".into(),
                          api_key: "k3y".into() };
    Api::new(device, buffers)
  }

  #[test]
  fn uris() {
    let mut api = api(Buffers::default());
    assert_eq!(api.thing_uri().unwrap(),
               "/k3y/iot/v1/thing/SN123?digest=d1g3st");
    assert_eq!(api.registry_uri().unwrap(), "/k3y/iot/v1/registry/SN123");
    assert_eq!(api.rawdata_uri("7568574498").unwrap(),
               "/k3y/iot/v1/device/7568574498/rawdata");
    assert_eq!(api.sensor_rawdata_uri("7568574498", "temperature")
                  .unwrap(),
               "/k3y/iot/v1/device/7568574498/sensor/temperature/rawdata");
  }

  #[test]
  fn uri_too_long() {
    let mut api = api(Buffers { uri: 30,
                                ..Default::default() });

    match api.thing_uri() {
      | Err(Error::TooLong { buffer: Buffer::Uri,
                             capacity: 30,
                             size, }) => assert_eq!(size, 37),
      | other => panic!("{:?}", other),
    }

    // buffer is reused; a short value still fits afterwards
    assert_eq!(api.rawdata_uri("1").unwrap(), "/k3y/iot/v1/device/1/rawdata");
  }

  #[test]
  fn json_too_long() {
    let mut api = api(Buffers { json: 16,
                                ..Default::default() });
    assert!(matches!(api.register_body(),
                     Err(Error::TooLong { buffer: Buffer::Json,
                                          capacity: 16,
                                          .. })));
  }

  #[test]
  fn sensor_body_rounds_temperature() {
    let mut api = api(Buffers::default());
    let body = api.sensor_data_body(&Sample { temperature: 23.456,
                                              humidity: 51 })
                  .unwrap();
    assert_eq!(core::str::from_utf8(body).unwrap(),
               r#"[{"id":"temperature","value":["23.46"]},{"id":"humidity","value":["51"]}]"#);
  }

  #[test]
  fn device_id_extraction() {
    let payload = r#"{"id":"x","deviceId":"7568574498","deviceName":"thing"}"#;
    assert_eq!(device_id(payload), Some("7568574498"));
    assert_eq!(device_id(r#"{"deviceId":"unterminated"#), None);
    assert_eq!(device_id(""), None);
    assert_eq!(device_id(r#"{"deviceId":""}"#), Some(""));
  }
}
