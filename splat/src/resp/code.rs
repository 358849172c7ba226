pub use toad_msg::Code;

macro_rules! code {
  ($doc:literal $name:ident = $c:literal * $d:literal) => {
    #[doc = $doc]
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: Code = Code::new($c, $d);
  };
}

// 2.xx
code!("2.01 Created" CREATED = 2*01);
code!("2.02 Deleted" DELETED = 2*02);
code!("2.03 Valid"   VALID   = 2*03);
code!("2.04 Changed" CHANGED = 2*04);
code!("2.05 Content; the only code the smart platform answers successful requests with"
      CONTENT = 2*05);

// 4.xx
code!("4.00 Bad Request"                BAD_REQUEST                = 4*00);
code!("4.01 Unauthorized"               UNAUTHORIZED               = 4*01);
code!("4.03 Forbidden"                  FORBIDDEN                  = 4*03);
code!("4.04 Not Found"                  NOT_FOUND                  = 4*04);
code!("4.05 Method Not Allowed"         METHOD_NOT_ALLOWED         = 4*05);
code!("4.13 Request Entity Too Large"   REQUEST_ENTITY_TOO_LARGE   = 4*13);
code!("4.15 Unsupported Content-Format" UNSUPPORTED_CONTENT_FORMAT = 4*15);

// 5.xx
code!("5.00 Internal Server Error" INTERNAL_SERVER_ERROR = 5*00);
code!("5.03 Service Unavailable"   SERVICE_UNAVAILABLE   = 5*03);
code!("5.04 Gateway Timeout"       GATEWAY_TIMEOUT       = 5*04);

/// Render a code the way RFC 7252 writes them (`2.05`)
///
/// ```
/// use splat::resp::code::{self, to_human};
///
/// assert_eq!(to_human(code::CONTENT), "2.05");
/// assert_eq!(to_human(code::NOT_FOUND), "4.04");
/// ```
pub fn to_human(code: Code) -> String {
  format!("{}.{:02}", code.class, code.detail)
}
