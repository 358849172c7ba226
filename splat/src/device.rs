use core::convert::Infallible;
use std::io;
use std::sync::Arc;

use crate::config::Config;
use crate::exchange::Exchanger;
use crate::inbox::Inbox;
use crate::net::{Link, LinkError};
use crate::recv::Receiver;
use crate::sensor::Sensor;
use crate::session::{self, Fatal, Session};
use crate::time::{Clock, Sleep};

/// Errors that stop a device for good
#[derive(Debug)]
pub enum Error<E> {
  /// The network refused our credentials
  AuthFailure,
  /// The link could not be brought up or opened
  Link(E),
  /// The receiver thread could not be spawned
  Receiver(io::Error),
  /// The session could not establish the device's identity
  Session(Fatal),
}

impl<E> From<LinkError<E>> for Error<E> {
  fn from(e: LinkError<E>) -> Self {
    match e {
      | LinkError::AuthFailure => Self::AuthFailure,
      | LinkError::Other(e) => Self::Link(e),
    }
  }
}

impl<E> From<Fatal> for Error<E> {
  fn from(e: Fatal) -> Self {
    Self::Session(e)
  }
}

/// The exchanger a [`Device`] talks to the platform with
pub type DeviceExchanger<L, C> = Exchanger<<L as Link>::Transport, C>;

/// A device wired up and connected to the platform.
///
/// ```no_run
/// use embedded_time::duration::Milliseconds;
/// use splat::config::{Config, Device as Creds};
/// use splat::device::Device;
/// use splat::sensor::{Sample, Simulated};
/// use splat::std::{Clock, UdpLink};
///
/// let creds = Creds { digest: "d1g3st".into(),
///                     serial: "SN123".into(),
///                     api_key: "k3y".into() };
/// let config = Config::new(creds, "10.0.0.1:5683".parse().unwrap());
/// let link = UdpLink::new(config.bind, config.server);
///
/// let device = Device::start(link, Clock::new(), config).unwrap();
/// let sensor = Simulated::new(0, Sample { temperature: 20.0, humidity: 50 });
///
/// // only returns if the device could not be identified
/// let err = device.run(sensor).unwrap_err();
/// ```
pub struct Device<L: Link, C> {
  link: L,
  receiver: Receiver,
  session: Session<DeviceExchanger<L, C>, C>,
}

impl<L, C> core::fmt::Debug for Device<L, C> where L: Link
{
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Device")
     .field("link_up", &self.link.is_up())
     .field("receiver", &self.receiver.state())
     .field("session", &self.session.state())
     .finish()
  }
}

impl<L, C> Device<L, C>
  where L: Link,
        C: Clock + Sleep + Clone
{
  /// Bring the link up, open a transport over it, start the receiver thread
  /// and create a session ready to [`run`](Device::run).
  pub fn start(mut link: L, clock: C, config: Config) -> Result<Self, Error<L::Error>> {
    session::connect(&mut link, &clock, &config)?;

    let transport = Arc::new(link.open().map_err(Error::Link)?);
    let inbox = Arc::new(Inbox::new());
    let receiver = Receiver::spawn(transport.clone(), inbox.clone(), config.buffers.recv)
      .map_err(Error::Receiver)?;

    let exchanger = Exchanger::new(transport,
                                   inbox,
                                   clock.clone(),
                                   config.msg.poll_interval,
                                   config.buffers.json);

    Ok(Self { link,
              receiver,
              session: Session::new(exchanger, clock, config) })
  }

  /// The underlying link
  pub fn link(&self) -> &L {
    &self.link
  }

  /// Handle to the receiver thread
  pub fn receiver(&self) -> &Receiver {
    &self.receiver
  }

  /// The device's session
  pub fn session(&self) -> &Session<DeviceExchanger<L, C>, C> {
    &self.session
  }

  /// The device's session, mutably
  pub fn session_mut(&mut self) -> &mut Session<DeviceExchanger<L, C>, C> {
    &mut self.session
  }

  /// Resolve the device's identity, then upload readings from `sensor` forever.
  ///
  /// Only returns if the identity could not be established.
  pub fn run<S: Sensor>(mut self, sensor: S) -> Result<Infallible, Error<L::Error>> {
    self.session.resolve_identity()?;
    self.session.operate(sensor)
  }
}
