//! The `client` module defines the broker's view of one connected subscriber.
//!
//! A `Client` is the sending half of a per-connection channel. The transport
//! owns the receiving half and drains it into the socket; once the socket
//! goes away the channel closes and the client reports itself as not open.

pub mod pubsub_client;
pub use pubsub_client::{Client, ClientId};
