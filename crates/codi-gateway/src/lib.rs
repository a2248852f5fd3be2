//! The WebSocket surface: accepts per-project connections, dispatches
//! inbound frames to the workflow executor, and fans outcomes back out
//! through the shared connection registry.
//!
//! No auth, REST, or webhook routes live here — those are a deployment
//! concern layered in front of this router, not part of the core surface.
//!
//! # Main types
//!
//! - [`GatewayServer`] — builds the Axum router.
//! - [`router::MessageRouter`] — dispatches inbound frames.
//! - [`connection::WsConnection`] — one live socket as a [`codi_broadcast::BroadcastConnection`].
//! - [`WsApprovalChannel`] — human-in-the-loop approval over the WebSocket surface.

pub mod connection;
pub mod router;
pub mod server;
pub mod ws_approval;

pub use connection::WsConnection;
pub use router::{InboundMessage, MessageRouter, OutboundMessage};
pub use server::GatewayServer;
pub use ws_approval::WsApprovalChannel;
