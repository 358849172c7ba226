use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use toad_stem::Stem;

use crate::inbox::Inbox;
use crate::net::Transport;

/// Lifecycle of the receiver thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
  /// Blocking on the transport, publishing every datagram
  Running,
  /// The transport errored and the thread exited.
  ///
  /// This is terminal; the receiver is never restarted.
  Stopped,
}

/// Handle to the background receiver thread
#[derive(Debug)]
pub struct Receiver {
  state: Arc<Stem<State>>,
  handle: JoinHandle<()>,
}

impl Receiver {
  /// Spawn a thread named `splat-recv` that reads datagrams of
  /// up to `buf_size` bytes from `transport` and publishes them to `inbox`
  /// until the transport errors.
  pub fn spawn<T: Transport>(transport: Arc<T>,
                             inbox: Arc<Inbox>,
                             buf_size: usize)
                             -> io::Result<Self> {
    let state = Arc::new(Stem::new(State::Running));
    let state_thread = state.clone();

    thread::Builder::new().name("splat-recv".into())
                          .spawn(move || {
                            let mut buf = vec![0u8; buf_size];
                            let e = run(transport.as_ref(), inbox.as_ref(), &mut buf);
                            log::error!("Receiver stopped: {:?}", e);
                            state_thread.map_mut(|s| *s = State::Stopped);
                          })
                          .map(|handle| Self { state, handle })
  }

  /// Current state of the receiver
  pub fn state(&self) -> State {
    self.state.map_ref(|s| *s)
  }

  /// Is the receiver still running?
  pub fn is_running(&self) -> bool {
    self.state() == State::Running
  }

  /// Block until the receiver thread exits
  pub fn join(self) -> thread::Result<()> {
    self.handle.join()
  }
}

/// Receive datagrams from `transport` forever, publishing each to `inbox`.
///
/// Returns only when the transport yields an error.
pub fn run<T: Transport>(transport: &T, inbox: &Inbox, buf: &mut [u8]) -> T::Error {
  loop {
    match transport.recv(buf) {
      | Ok(dgram) => {
        let n = (*dgram.data()).min(buf.len());
        log::trace!("Received {} byte datagram from {}", n, dgram.addr());
        inbox.publish(&buf[..n], dgram.addr());
      },
      | Err(e) => return e,
    }
  }
}
