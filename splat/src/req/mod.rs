use toad_msg::Id;

/// Request methods understood by the smart platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  /// `GET` (0.01)
  Get,
  /// `POST` (0.02)
  Post,
}

impl Method {
  /// The CoAP request code for this method
  ///
  /// ```
  /// use splat::req::Method;
  ///
  /// assert_eq!(Method::Get.code().detail, 1);
  /// assert_eq!(Method::Post.code().detail, 2);
  /// ```
  pub const fn code(&self) -> toad_msg::Code {
    match self {
      | Method::Get => toad_msg::Code::new(0, 1),
      | Method::Post => toad_msg::Code::new(0, 2),
    }
  }

  /// Interpret a CoAP code as a method, if it is one we know about
  pub fn from_code(code: toad_msg::Code) -> Option<Self> {
    match (code.class, code.detail) {
      | (0, 1) => Some(Method::Get),
      | (0, 2) => Some(Method::Post),
      | _ => None,
    }
  }
}

/// A request bound for the smart platform
///
/// `path` is relative to the server root and may carry a query string
/// (`a/b?c=d`); the [codec](crate::codec) splits it into CoAP Uri-Path
/// and Uri-Query options.
///
/// ```
/// use splat::req::{Method, Request};
/// use toad_msg::Id;
///
/// let req = Request::post("/k/iot/v1/registry/SN123", Id(7), b"{}".to_vec());
/// assert_eq!(req.method, Method::Post);
/// assert_eq!(req.payload_str(), Ok("{}"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  /// Path (and query) of the resource
  pub path: String,
  /// See [`Method`]
  pub method: Method,
  /// Request body, `None` for requests without one
  pub payload: Option<Vec<u8>>,
  /// CoAP message ID
  pub id: Id,
}

impl Request {
  /// Create a GET request
  pub fn get(path: impl ToString, id: Id) -> Self {
    Self { path: path.to_string(),
           method: Method::Get,
           payload: None,
           id }
  }

  /// Create a POST request
  pub fn post(path: impl ToString, id: Id, payload: Vec<u8>) -> Self {
    Self { path: path.to_string(),
           method: Method::Post,
           payload: Some(payload),
           id }
  }

  /// Request body, empty if there is none
  pub fn payload(&self) -> &[u8] {
    self.payload.as_deref().unwrap_or(&[])
  }

  /// Get the payload and attempt to interpret it as a UTF-8 string
  pub fn payload_str(&self) -> Result<&str, core::str::Utf8Error> {
    core::str::from_utf8(self.payload())
  }

  /// The path without its query string or leading slash
  ///
  /// ```
  /// use splat::req::Request;
  /// use toad_msg::Id;
  ///
  /// let req = Request::get("/k/iot/v1/thing/SN123?digest=abc", Id(9));
  /// assert_eq!(req.path_segments().collect::<Vec<_>>(),
  ///            vec!["k", "iot", "v1", "thing", "SN123"]);
  /// assert_eq!(req.query_params().collect::<Vec<_>>(), vec!["digest=abc"]);
  /// ```
  pub fn path_segments(&self) -> impl Iterator<Item = &str> {
    let path = self.path.split('?').next().unwrap_or("");
    path.split('/').filter(|s| !s.is_empty())
  }

  /// `&`-separated query parameters, if the path has a query string
  pub fn query_params(&self) -> impl Iterator<Item = &str> {
    self.path
        .split_once('?')
        .map(|(_, q)| q)
        .unwrap_or("")
        .split('&')
        .filter(|s| !s.is_empty())
  }
}
