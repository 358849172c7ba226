use std::collections::BTreeMap;

use toad_msg::alloc::Message;
use toad_msg::to_bytes::MessageToBytesError;
use toad_msg::{Code,
               MessageParseError,
               OptNumber,
               OptValue,
               Payload,
               Token,
               TryFromBytes,
               TryIntoBytes,
               Type};

use crate::req::{Method, Request};
use crate::resp::Response;
use crate::ContentFormat;

/// Uri-Path
pub const URI_PATH: OptNumber = OptNumber(11);

/// Content-Format
pub const CONTENT_FORMAT: OptNumber = OptNumber(12);

/// Uri-Query
pub const URI_QUERY: OptNumber = OptNumber(15);

/// Errors encounterable while decoding a request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodeRequestError {
  /// The datagram was not a valid CoAP message
  Parse(MessageParseError),
  /// The message code was not a method we understand
  UnknownMethod(Code),
}

impl From<MessageParseError> for DecodeRequestError {
  fn from(e: MessageParseError) -> Self {
    Self::Parse(e)
  }
}

/// Build the CoAP message for a request.
///
/// Every request is confirmable, carries no token and
/// declares its payload as `text/plain`.
pub fn message(req: &Request) -> Message {
  let mut opts = BTreeMap::new();

  let path = req.path_segments()
                .map(|seg| OptValue(seg.as_bytes().to_vec()))
                .collect::<Vec<_>>();
  if !path.is_empty() {
    opts.insert(URI_PATH, path);
  }

  opts.insert(CONTENT_FORMAT, vec![OptValue(ContentFormat::Text.bytes())]);

  let query = req.query_params()
                 .map(|param| OptValue(param.as_bytes().to_vec()))
                 .collect::<Vec<_>>();
  if !query.is_empty() {
    opts.insert(URI_QUERY, query);
  }

  Message { id: req.id,
            ty: Type::Con,
            ver: Default::default(),
            token: Token(Default::default()),
            code: req.method.code(),
            opts,
            payload: Payload(req.payload().to_vec()) }
}

/// Encode a request to bytes ready to be sent
pub fn encode(req: &Request) -> Result<Vec<u8>, MessageToBytesError> {
  message(req).try_into_bytes::<Vec<u8>>()
}

/// Decode a datagram into a [`Response`]
pub fn decode(bytes: &[u8]) -> Result<Response, MessageParseError> {
  let msg = Message::try_from_bytes(bytes)?;

  let content_format = Options::new(bytes).find(|(n, _)| *n == CONTENT_FORMAT)
                                          .map(|(_, v)| ContentFormat::from_bytes(v));

  Ok(Response { id: msg.id,
                code: msg.code,
                content_format,
                payload: msg.payload.0 })
}

/// Decode a datagram into a [`Request`], reassembling its
/// Uri-Path and Uri-Query options into a path.
pub fn decode_request(bytes: &[u8]) -> Result<Request, DecodeRequestError> {
  let msg = Message::try_from_bytes(bytes)?;
  let method = Method::from_code(msg.code).ok_or(DecodeRequestError::UnknownMethod(msg.code))?;

  let join = |n: OptNumber, sep: &str| {
    Options::new(bytes).filter(|(num, _)| *num == n)
                       .map(|(_, v)| String::from_utf8_lossy(v).into_owned())
                       .collect::<Vec<_>>()
                       .join(sep)
  };

  let mut path = format!("/{}", join(URI_PATH, "/"));
  let query = join(URI_QUERY, "&");
  if !query.is_empty() {
    path.push('?');
    path.push_str(&query);
  }

  let payload = Some(msg.payload.0).filter(|p| !p.is_empty());

  Ok(Request { path,
               method,
               payload,
               id: msg.id })
}

/// Iterator over the options of an encoded message, in wire order,
/// yielding each option's number and value.
///
/// Repeated options (e.g. one Uri-Path per segment) are yielded once per
/// occurrence. Iteration stops at the payload marker, at the end of the
/// datagram, or at the first malformed option.
#[derive(Debug, Clone)]
pub struct Options<'a> {
  bytes: &'a [u8],
  at: usize,
  number: u32,
}

impl<'a> Options<'a> {
  /// Walk the options of `bytes`, skipping the fixed header and token
  pub fn new(bytes: &'a [u8]) -> Self {
    let tkl = bytes.first().map(|b| (b & 0b1111) as usize).unwrap_or(0);
    Self { bytes,
           at: 4 + tkl,
           number: 0 }
  }

  fn next_byte(&mut self) -> Option<u8> {
    let b = *self.bytes.get(self.at)?;
    self.at += 1;
    Some(b)
  }

  fn len_or_delta(&mut self, head: u8) -> Option<u32> {
    match head {
      | 13 => self.next_byte().map(|n| n as u32 + 13),
      | 14 => {
        let a = self.next_byte()?;
        let b = self.next_byte()?;
        Some(u16::from_be_bytes([a, b]) as u32 + 269)
      },
      | 15 => None,
      | _ => Some(head as u32),
    }
  }
}

impl<'a> Iterator for Options<'a> {
  type Item = (OptNumber, &'a [u8]);

  fn next(&mut self) -> Option<Self::Item> {
    let head = self.next_byte().filter(|b| *b != 0xff)?;

    // delta is encoded before the length
    let delta = self.len_or_delta(head >> 4)?;
    let len = self.len_or_delta(head & 0b1111)? as usize;

    let value = self.bytes.get(self.at..self.at + len)?;
    self.at += len;
    self.number += delta;

    Some((OptNumber(self.number), value))
  }
}
