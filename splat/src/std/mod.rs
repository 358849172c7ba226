use std::io;
use std::net::{SocketAddr, UdpSocket};

use embedded_time::rate::Fraction;

use crate::net::{Addrd, Link, LinkError, Transport};
use crate::time::{Millis, Sleep};

impl Transport for UdpSocket {
  type Error = io::Error;

  fn send(&self, bytes: &[u8]) -> io::Result<usize> {
    UdpSocket::send(self, bytes)
  }

  fn recv(&self, buffer: &mut [u8]) -> io::Result<Addrd<usize>> {
    self.recv_from(buffer).map(|(n, addr)| Addrd(n, addr))
  }
}

/// A [`Link`] for hosts whose network is always available
/// (e.g. a gateway on ethernet, or a development machine).
///
/// "Connecting" cannot fail, and opening the link binds a UDP socket
/// and connects it to the platform.
#[derive(Debug, Clone, Copy)]
pub struct UdpLink {
  server: SocketAddr,
  bind: SocketAddr,
  up: bool,
}

impl UdpLink {
  /// Create a link that binds to `bind` and talks to `server`
  pub fn new(bind: SocketAddr, server: SocketAddr) -> Self {
    Self { server,
           bind,
           up: false }
  }
}

impl Link for UdpLink {
  type Transport = UdpSocket;
  type Error = io::Error;

  fn is_up(&self) -> bool {
    self.up
  }

  fn connect(&mut self) -> Result<(), LinkError<io::Error>> {
    self.up = true;
    Ok(())
  }

  fn open(&mut self) -> io::Result<UdpSocket> {
    let sock = UdpSocket::bind(self.bind)?;
    sock.connect(self.server)?;
    log::debug!("Bound {} talking to {}", sock.local_addr()?, self.server);
    Ok(sock)
  }
}

/// Implement [`embedded_time::Clock`] using [`std::time`] primitives
#[derive(Debug, Clone, Copy)]
pub struct Clock(std::time::Instant);

impl Default for Clock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock {
  /// Create a new clock
  pub fn new() -> Self {
    Self(std::time::Instant::now())
  }
}

impl embedded_time::Clock for Clock {
  type T = u64;

  // microseconds
  const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

  fn try_now(&self) -> Result<embedded_time::Instant<Self>, embedded_time::clock::Error> {
    let now = std::time::Instant::now();
    let elapsed = now.duration_since(self.0);
    Ok(embedded_time::Instant::new(elapsed.as_micros() as u64))
  }
}

impl Sleep for Clock {
  fn sleep(&self, dur: Millis) {
    std::thread::sleep(std::time::Duration::from_millis(dur.0))
  }
}

#[cfg(test)]
mod test {
  use embedded_time::duration::Milliseconds;

  use super::*;
  use crate::time;

  #[test]
  fn clock_sleeps() {
    let clock = Clock::new();
    let start = time::now_millis(&clock);
    clock.sleep(Milliseconds(20));
    assert!(time::now_millis(&clock).0 - start.0 >= 20);
  }

  #[test]
  fn udp_link_roundtrip() {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let mut link = UdpLink::new("127.0.0.1:0".parse().unwrap(),
                                server.local_addr().unwrap());

    assert!(!link.is_up());
    crate::net::connect(&mut link, crate::retry::Attempts(1)).unwrap();
    assert!(link.is_up());

    let sock = link.open().unwrap();
    assert_eq!(Transport::send(&sock, b"ping").unwrap(), 4);

    let mut buf = [0u8; 16];
    let (n, from) = server.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"ping");

    server.send_to(b"pong", from).unwrap();
    let dgram = Transport::recv(&sock, &mut buf).unwrap();
    assert_eq!(&buf[..*dgram.data()], b"pong");
    assert_eq!(dgram.addr(), server.local_addr().unwrap());
  }
}
