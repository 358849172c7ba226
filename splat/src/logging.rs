use core::fmt::Write;

use crate::req::Request;
use crate::resp::{code, Response};

pub(crate) fn req_summary(req: &Request) -> String {
  format!("{:?} {} (id {}) with {} byte payload",
          req.method,
          req.path,
          req.id.0,
          req.payload().len())
}

pub(crate) fn resp_summary(resp: &Response) -> String {
  format!("{} (id {}) with {} byte payload",
          code::to_human(resp.code),
          resp.id.0,
          resp.payload.len())
}

pub(crate) fn hex(bytes: &[u8]) -> String {
  let mut buf = String::with_capacity(bytes.len() * 3);
  bytes.iter().enumerate().for_each(|(ix, b)| {
                            if ix > 0 {
                              buf.push(' ');
                            }
                            write!(buf, "{:02x}", b).ok();
                          });
  buf
}

#[cfg(test)]
mod test {
  use toad_msg::Id;

  use super::*;

  #[test]
  fn summaries() {
    let req = Request::post("/a/b", Id(7), b"hi".to_vec());
    assert_eq!(req_summary(&req), "Post /a/b (id 7) with 2 byte payload");

    let resp = Response { id: Id(9),
                          code: code::CONTENT,
                          payload: vec![],
                          content_format: None };
    assert_eq!(resp_summary(&resp), "2.05 (id 9) with 0 byte payload");
  }

  #[test]
  fn hex_dump() {
    assert_eq!(hex(&[0x40, 0x01, 0xff]), "40 01 ff");
    assert_eq!(hex(&[]), "");
  }
}
