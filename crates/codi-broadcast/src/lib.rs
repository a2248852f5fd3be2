//! Delivers progress events from worker processes to WebSocket subscribers
//! across a process boundary, via Redis pub/sub.
//!
//! Two roles, one per side of the bus:
//! - [`publisher::RedisBroadcastPublisher`] — any process hands a message to
//!   [`codi_core::ports::BroadcastPort`] without knowing who's listening.
//! - [`subscriber::start_subscriber`] — the gateway process listens and fans
//!   each envelope out through a [`connection::ConnectionRegistry`].
//!
//! Best-effort, at-most-once per connection. No ordering guarantee across
//! publishers; reconnection is the client's responsibility.

pub mod channels;
pub mod connection;
pub mod publisher;
pub mod subscriber;

pub use channels::{signal_channel, WEBSOCKET_CHANNEL};
pub use connection::{BroadcastConnection, ConnectionRegistry};
pub use publisher::RedisBroadcastPublisher;
pub use subscriber::start_subscriber;
