use std::net::SocketAddr;

use crate::retry::Attempts;

/// Data that came from a network socket
#[derive(PartialEq, PartialOrd, Eq, Ord, Hash, Debug, Clone, Copy)]
pub struct Addrd<T>(pub T, pub SocketAddr);

impl<T> Addrd<T> {
  /// Borrow the contents of this Addressed
  pub fn as_ref(&self) -> Addrd<&T> {
    Addrd(self.data(), self.addr())
  }

  /// Discard the socket and get the data in this Addressed
  pub fn unwrap(self) -> T {
    self.0
  }

  /// Map the data contained in this Addressed
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Addrd<R> {
    Addrd(f(self.0), self.1)
  }

  /// Borrow the contents of the addressed item
  pub fn data(&self) -> &T {
    &self.0
  }

  /// Copy the socket address for the data
  pub fn addr(&self) -> SocketAddr {
    self.1
  }
}

/// A datagram transport connected to a single remote peer
///
/// Both operations block. `recv` has no timeout of its own; waiting
/// for a response with a deadline is layered on top by the
/// [`Exchanger`](crate::exchange::Exchanger).
///
/// `send` and `recv` take `&self` because they are called concurrently:
/// `recv` from the receiver thread and `send` from the session.
pub trait Transport: Send + Sync + 'static {
  /// The error yielded by transport operations
  type Error: core::fmt::Debug + Send;

  /// Send a datagram to the connected peer, yielding the number of bytes sent
  fn send(&self, bytes: &[u8]) -> Result<usize, Self::Error>;

  /// Block until a datagram arrives, copy it into `buffer` and
  /// yield its length along with the address of the sender.
  ///
  /// It is expected that (like [`std::net::UdpSocket`]) if the message is larger
  /// than the buffer, those bytes are dropped and not considered an error condition.
  fn recv(&self, buffer: &mut [u8]) -> Result<Addrd<usize>, Self::Error>;
}

/// Why bringing up a [`Link`] failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError<E> {
  /// The network refused our credentials. Retrying will not help.
  AuthFailure,
  /// Any other failure; may succeed if attempted again
  Other(E),
}

impl<E> LinkError<E> {
  /// Is this an authentication failure?
  pub fn is_auth_failure(&self) -> bool {
    matches!(self, Self::AuthFailure)
  }
}

/// The network link underneath the transport (e.g. a cellular modem)
pub trait Link {
  /// Transport opened over this link once it is up
  type Transport: Transport;

  /// The error yielded by link operations
  type Error: core::fmt::Debug;

  /// Is the link currently up?
  fn is_up(&self) -> bool;

  /// Make a single attempt at bringing the link up
  fn connect(&mut self) -> Result<(), LinkError<Self::Error>>;

  /// Open a transport to the platform over this link
  fn open(&mut self) -> Result<Self::Transport, Self::Error>;
}

/// Bring `link` up, attempting to connect back-to-back (no delay)
/// up to `attempts` times.
///
/// Authentication failures are returned immediately.
/// An already-up link is not reconnected.
pub fn connect<L: Link>(link: &mut L, attempts: Attempts) -> Result<(), LinkError<L::Error>> {
  let mut attempt = 0u16;

  while !link.is_up() {
    attempt += 1;
    match link.connect() {
      | Ok(()) => {
        log::info!("Connection established");
        break;
      },
      | Err(LinkError::AuthFailure) => {
        log::error!("Authentication failure");
        return Err(LinkError::AuthFailure);
      },
      | Err(LinkError::Other(e)) if attempt >= attempts.0 => {
        log::error!("Fatal connection failure: {:?}", e);
        return Err(LinkError::Other(e));
      },
      | Err(LinkError::Other(e)) => {
        log::warn!("Couldn't connect: {:?}, will retry", e);
      },
    }
  }

  Ok(())
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::test::LinkMock;

  #[test]
  fn connect_up_link_does_nothing() {
    let mut link = LinkMock::up();
    connect(&mut link, Attempts(4)).unwrap();
    assert_eq!(link.connects(), 0);
  }

  #[test]
  fn connect_retries_immediately() {
    let mut link = LinkMock::failing(2);
    connect(&mut link, Attempts(4)).unwrap();
    assert_eq!(link.connects(), 3);
    assert!(link.is_up());
  }

  #[test]
  fn connect_gives_up() {
    let mut link = LinkMock::failing(10);
    assert_eq!(connect(&mut link, Attempts(4)),
               Err(LinkError::Other("no signal")));
    assert_eq!(link.connects(), 4);
  }

  #[test]
  fn connect_auth_failure_is_immediate() {
    let mut link = LinkMock::auth_failure();
    assert_eq!(connect(&mut link, Attempts(4)), Err(LinkError::AuthFailure));
    assert_eq!(link.connects(), 1);
  }
}
