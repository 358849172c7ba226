use toad_msg::{Code, Id};

use crate::exchange;
use crate::ContentFormat;

/// Response codes
pub mod code;

/// A response from the smart platform, owned and decoded
///
/// ```
/// use splat::resp::{code, Response};
/// use toad_msg::Id;
///
/// let resp = Response { id: Id(9),
///                       code: code::CONTENT,
///                       payload: br#"{"deviceId":"42"}"#.to_vec(),
///                       content_format: None };
///
/// let resp = resp.expect_code(code::CONTENT)
///                .and_then(|r| r.expect_id(Id(9)))
///                .unwrap();
/// assert_eq!(resp.payload_str(), Ok(r#"{"deviceId":"42"}"#));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
  /// CoAP message ID
  pub id: Id,
  /// Response code, e.g. [`code::CONTENT`]
  pub code: Code,
  /// Response body
  pub payload: Vec<u8>,
  /// Content-Format option, if the server set one
  pub content_format: Option<ContentFormat>,
}

impl Response {
  /// Get the payload and attempt to interpret it as a UTF-8 string
  pub fn payload_str(&self) -> Result<&str, core::str::Utf8Error> {
    core::str::from_utf8(&self.payload)
  }

  /// Is this response a success (2.xx)?
  pub fn is_success(&self) -> bool {
    self.code.class == 2
  }

  /// Yield `self` if it has `code`, otherwise [`exchange::Error::UnexpectedCode`]
  pub fn expect_code(self, code: Code) -> Result<Self, exchange::Error> {
    if self.code == code {
      Ok(self)
    } else {
      Err(exchange::Error::UnexpectedCode { expected: code,
                                            actual: self.code })
    }
  }

  /// Yield `self` if it has message ID `id`, otherwise [`exchange::Error::IdMismatch`]
  pub fn expect_id(self, id: Id) -> Result<Self, exchange::Error> {
    if self.id == id {
      Ok(self)
    } else {
      Err(exchange::Error::IdMismatch { expected: id,
                                        actual: self.id })
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn resp(code: Code) -> Response {
    Response { id: Id(1),
               code,
               payload: vec![],
               content_format: None }
  }

  #[test]
  fn expect_code() {
    assert!(resp(code::CONTENT).expect_code(code::CONTENT).is_ok());
    assert_eq!(resp(code::NOT_FOUND).expect_code(code::CONTENT),
               Err(exchange::Error::UnexpectedCode { expected: code::CONTENT,
                                                     actual: code::NOT_FOUND }));
  }

  #[test]
  fn expect_id() {
    assert!(resp(code::CONTENT).expect_id(Id(1)).is_ok());
    assert_eq!(resp(code::CONTENT).expect_id(Id(9)),
               Err(exchange::Error::IdMismatch { expected: Id(9),
                                                 actual: Id(1) }));
  }

  #[test]
  fn is_success() {
    assert!(resp(code::CONTENT).is_success());
    assert!(resp(code::CREATED).is_success());
    assert!(!resp(code::INTERNAL_SERVER_ERROR).is_success());
  }
}
