use std::sync::Arc;

use embedded_time::duration::Milliseconds;
use toad_msg::to_bytes::MessageToBytesError;
use toad_msg::{Code, Id, MessageParseError};

use crate::codec;
use crate::inbox::Inbox;
use crate::logging;
use crate::net::{Addrd, Transport};
use crate::req::Request;
use crate::resp::Response;
use crate::result_ext::ResultExt;
use crate::time::{Millis, Sleep};

/// Errors encounterable while exchanging a request for a response
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error {
  /// The request could not be serialized
  Encode(MessageToBytesError),
  /// A datagram arrived but it was not a valid CoAP message
  Decode(MessageParseError),
  /// No datagram arrived before the timeout elapsed
  Timeout,
  /// The response payload does not fit in the payload buffer
  BufferTooSmall {
    /// Capacity of the payload buffer
    capacity: usize,
    /// Size of the payload that was received
    size: usize,
  },
  /// A response arrived with a code other than the one expected
  UnexpectedCode {
    #[allow(missing_docs)]
    expected: Code,
    #[allow(missing_docs)]
    actual: Code,
  },
  /// A response arrived with a message ID other than the one expected
  IdMismatch {
    #[allow(missing_docs)]
    expected: Id,
    #[allow(missing_docs)]
    actual: Id,
  },
}

impl Error {
  /// Did the exchange fail because nothing came back?
  pub fn is_timeout(&self) -> bool {
    matches!(self, Self::Timeout)
  }
}

impl From<MessageToBytesError> for Error {
  fn from(e: MessageToBytesError) -> Self {
    Self::Encode(e)
  }
}

impl From<MessageParseError> for Error {
  fn from(e: MessageParseError) -> Self {
    Self::Decode(e)
  }
}

/// Send a request and wait (a bounded amount of time) for its response
///
/// At most one exchange may be in flight at a time; responses are not
/// correlated with requests beyond "the next datagram to arrive".
pub trait Exchange {
  /// Send `req` and yield the first response to arrive within `timeout`
  fn exchange(&self, req: &Request, timeout: Millis) -> Result<Response, Error>;
}

impl<X: Exchange> Exchange for &X {
  fn exchange(&self, req: &Request, timeout: Millis) -> Result<Response, Error> {
    X::exchange(self, req, timeout)
  }
}

/// [`Exchange`] over a [`Transport`], with responses delivered through an [`Inbox`]
/// by a [receiver thread](crate::recv).
#[derive(Debug)]
pub struct Exchanger<T, S> {
  transport: Arc<T>,
  inbox: Arc<Inbox>,
  sleep: S,
  poll_interval: Millis,
  capacity: usize,
}

impl<T: Transport, S: Sleep> Exchanger<T, S> {
  /// Create an exchanger that checks `inbox` every `poll_interval`,
  /// and rejects responses with payloads larger than `capacity`.
  pub fn new(transport: Arc<T>,
             inbox: Arc<Inbox>,
             sleep: S,
             poll_interval: Millis,
             capacity: usize)
             -> Self {
    Self { transport,
           inbox,
           sleep,
           poll_interval,
           capacity }
  }

  /// The inbox responses are read from
  pub fn inbox(&self) -> &Arc<Inbox> {
    &self.inbox
  }

  fn send(&self, bytes: &[u8]) {
    match self.transport.send(bytes) {
      | Ok(n) => log::trace!("Sent {} bytes: {}", n, logging::hex(bytes)),
      | Err(e) => log::warn!("Failed to send request: {:?}, waiting for a response anyway", e),
    }
  }

  /// Check the inbox, then sleep `poll_interval`,
  /// `ceil(timeout / poll_interval)` times at most
  fn await_datagram(&self, timeout: Millis) -> Option<Addrd<Vec<u8>>> {
    let interval = Milliseconds(self.poll_interval.0.max(1));
    let polls = timeout.0 / interval.0 + u64::from(timeout.0 % interval.0 != 0);

    (0..polls).find_map(|_| {
                self.inbox.poll().ok().or_else(|| {
                                        self.sleep.sleep(interval);
                                        None
                                      })
              })
  }
}

impl<T: Transport, S: Sleep> Exchange for Exchanger<T, S> {
  fn exchange(&self, req: &Request, timeout: Millis) -> Result<Response, Error> {
    log::debug!("-> {}", logging::req_summary(req));

    let bytes = codec::encode(req)?;
    self.send(&bytes);

    let dgram = self.await_datagram(timeout).ok_or_else(|| {
                                               log::warn!("No response after {}ms", timeout.0);
                                               Error::Timeout
                                             })?;

    log::trace!("Received {} bytes from {}: {}",
                dgram.data().len(),
                dgram.addr(),
                logging::hex(dgram.data()));

    codec::decode(dgram.data()).map_err(Error::from)
                               .perform(|resp| log::debug!("<- {}", logging::resp_summary(resp)))
                               .filter(|resp| resp.payload.len() <= self.capacity,
                                       |resp| Error::BufferTooSmall { capacity: self.capacity,
                                                                      size: resp.payload.len() })
  }
}
