use core::convert::Infallible;
use std::net::SocketAddr;

use toad_stem::Stem;

use crate::net::Addrd;

#[derive(Debug, Default)]
struct Slot {
  payload: Vec<u8>,
  from: Option<SocketAddr>,
  pending: usize,
}

/// A single-slot mailbox shared between the [receiver thread](crate::recv)
/// and whoever is waiting for a response.
///
/// The inbox holds at most one datagram. Publishing while a datagram
/// is still unconsumed overwrites it (the most recent datagram wins), but the
/// pending count keeps counting so a consumer can tell how many arrived.
///
/// Every operation holds the same lock for its whole duration, so a consumer
/// never observes a payload from one datagram with the length of another.
///
/// ```
/// use splat::inbox::Inbox;
///
/// let inbox = Inbox::default();
/// let addr = "127.0.0.1:5683".parse().unwrap();
///
/// inbox.publish(b"first", addr);
/// inbox.publish(b"second", addr);
/// assert_eq!(inbox.peek_count_and_len(), (2, 6));
///
/// assert_eq!(inbox.take().unwrap().unwrap(), b"second".to_vec());
/// assert_eq!(inbox.peek_count_and_len(), (1, 6));
/// ```
#[derive(Debug)]
pub struct Inbox(Stem<Slot>);

impl Default for Inbox {
  fn default() -> Self {
    Self::new()
  }
}

impl Inbox {
  /// Create an empty inbox
  pub fn new() -> Self {
    Self(Stem::new(Slot::default()))
  }

  /// Store a datagram, replacing whatever was stored before,
  /// and bump the pending count.
  ///
  /// Never blocks for longer than it takes a consumer to copy a datagram out.
  pub fn publish(&self, bytes: &[u8], from: SocketAddr) {
    self.0.map_mut(|slot| {
            if slot.pending > 0 {
              log::warn!("Overwriting {} byte datagram that was never consumed ({} pending)",
                         slot.payload.len(),
                         slot.pending);
            }

            slot.payload.clear();
            slot.payload.extend_from_slice(bytes);
            slot.from = Some(from);
            slot.pending += 1;
          })
  }

  /// Number of datagrams published and not yet taken, along with
  /// the length of the stored datagram
  pub fn peek_count_and_len(&self) -> (usize, usize) {
    self.0.map_ref(|slot| (slot.pending, slot.payload.len()))
  }

  /// If any datagram is pending, decrement the pending count and
  /// yield a copy of the stored (most recent) datagram.
  ///
  /// Yields `None` and leaves the count at zero otherwise.
  pub fn take(&self) -> Option<Addrd<Vec<u8>>> {
    self.0.map_mut(|slot| match slot.from {
            | Some(from) if slot.pending > 0 => {
              slot.pending -= 1;
              Some(Addrd(slot.payload.clone(), from))
            },
            | _ => None,
          })
  }

  /// [`Inbox::take`], yielding [`nb::Error::WouldBlock`] when nothing is pending
  pub fn poll(&self) -> nb::Result<Addrd<Vec<u8>>, Infallible> {
    self.take().ok_or(nb::Error::WouldBlock)
  }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;
  use std::thread;

  use super::*;

  fn addr() -> SocketAddr {
    "10.0.0.1:5683".parse().unwrap()
  }

  #[test]
  fn empty() {
    let inbox = Inbox::new();
    assert_eq!(inbox.peek_count_and_len(), (0, 0));
    assert_eq!(inbox.take(), None);
    assert_eq!(inbox.poll(), Err(nb::Error::WouldBlock));
    assert_eq!(inbox.peek_count_and_len(), (0, 0));
  }

  #[test]
  fn take_yields_most_recent_and_decrements() {
    let inbox = Inbox::new();
    let sizes = [3usize, 1, 7, 2];

    sizes.iter().enumerate().for_each(|(ix, n)| {
                              inbox.publish(&vec![ix as u8; *n], addr());
                              assert_eq!(inbox.peek_count_and_len(), (ix + 1, *n));
                            });

    assert_eq!(inbox.take(), Some(Addrd(vec![3u8; 2], addr())));
    assert_eq!(inbox.peek_count_and_len(), (3, 2));
  }

  #[test]
  fn count_never_goes_below_zero() {
    let inbox = Inbox::new();
    inbox.publish(b"a", addr());

    assert!(inbox.take().is_some());
    assert!(inbox.take().is_none());
    assert!(inbox.take().is_none());
    assert_eq!(inbox.peek_count_and_len(), (0, 1));

    inbox.publish(b"bc", addr());
    assert_eq!(inbox.peek_count_and_len(), (1, 2));
    assert_eq!(inbox.poll().map(Addrd::unwrap), Ok(b"bc".to_vec()));
  }

  #[test]
  fn publish_take_interleavings() {
    // (publishes before take) -> expected count after take
    [(0usize, 0usize), (1, 0), (2, 1), (5, 4)].into_iter()
                                              .for_each(|(publishes, after)| {
                                                let inbox = Inbox::new();
                                                (0..publishes).for_each(|n| {
                                                                inbox.publish(&[n as u8], addr())
                                                              });

                                                let taken = inbox.take().map(Addrd::unwrap);
                                                let last = publishes.checked_sub(1)
                                                                    .map(|n| vec![n as u8]);

                                                assert_eq!(taken, last);
                                                assert_eq!(inbox.peek_count_and_len().0, after);
                                              });
  }

  #[test]
  fn concurrent_publishers_are_all_counted() {
    let inbox = Arc::new(Inbox::new());

    let handles = (0..4u8).map(|n| {
                            let inbox = inbox.clone();
                            thread::spawn(move || {
                              (0..100).for_each(|_| inbox.publish(&[n; 4], addr()))
                            })
                          })
                          .collect::<Vec<_>>();

    handles.into_iter().for_each(|h| h.join().unwrap());

    let (count, len) = inbox.peek_count_and_len();
    assert_eq!(count, 400);
    assert_eq!(len, 4);

    let Addrd(bytes, _) = inbox.take().unwrap();
    assert!(bytes.iter().all(|b| *b == bytes[0]));
  }
}
