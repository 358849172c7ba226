//! `splat` is a CoAP client for devices that report to a cloud
//! IoT "smart platform" over a cellular link.
//!
//! A device running `splat`:
//! - brings up its network link and opens a UDP socket to the platform
//! - looks up the identity the platform assigned to it, registering first if it has none
//! - periodically uploads sensor readings for the rest of its life
//!
//! ## The link is unreliable
//! Cellular round-trips are measured in seconds and UDP offers no acknowledgement,
//! ordering or delivery guarantees. `splat` does not lean on CoAP's confirmable
//! retransmission to cope with this; instead every exchange is a single
//! request answered (or not) within a bounded wait, and each stage of the session
//! retries whole exchanges with a fixed delay.
//!
//! ## Moving parts
//! ```text
//!  Session ──▶ Exchanger ──encode──▶ Transport ──▶ (network)
//!                  ▲
//!                  └── poll ── Inbox ◀── publish ── Receiver thread ◀── Transport
//! ```
//! - [`recv`]: a thread that blocks on the socket and publishes every datagram into the [`inbox`]
//! - [`exchange`]: sends a request, then polls the inbox for its response until a timeout
//! - [`session`]: the connect → identify (→ register) → upload state machine
//! - [`device`]: wires all of the above together for a concrete [`net::Link`]
//!
//! Only one request may be awaiting a response at a time; the inbox holds a single
//! datagram and the most recent arrival wins.

#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
// -
// style
#![allow(clippy::unused_unit)]
// -
// deny
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(not(test), deny(unsafe_code))]
// -
// warnings
#![cfg_attr(not(test), warn(unreachable_pub))]


pub(crate) mod logging;
pub(crate) mod result_ext;

/// customizable retrying of fallible operations
pub mod retry;

/// time abstractions
pub mod time;

/// configuring runtime behavior
pub mod config;

/// network abstractions
pub mod net;

/// single-slot mailbox shared by the receiver thread and the exchanger
pub mod inbox;

/// background datagram receiver
pub mod recv;

/// requests
pub mod req;

/// responses
pub mod resp;

/// translating requests & responses to and from CoAP messages
pub mod codec;

/// request / response correlation
pub mod exchange;

/// smart platform endpoints & payloads
pub mod api;

/// sensor abstraction
pub mod sensor;

/// connection progress indicator
pub mod indicator;

/// device session state machine
pub mod session;

/// bootstrapping a device from a link, a clock and a config
pub mod device;

/// `std`-only splat stuff
#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub mod std;

mod option;

pub use option::ContentFormat;
