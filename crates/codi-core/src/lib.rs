//! Core types shared across the workflow subsystems: errors, message/tool
//! shapes, approval types, and the port traits that external systems
//! (persistence, broadcast) are wired in through.
//!
//! # Main types
//!
//! - [`CodiError`] / [`CodiResult`] — unified error enum and result alias.
//! - [`Role`] / [`Message`] — a single message within a conversation session.
//! - [`ToolCall`] / [`ToolResult`] — tool invocation request/response shapes.
//! - [`approval::ApprovalChannel`] — human-in-the-loop approval gate.
//! - [`ports::PersistencePort`] / [`ports::BroadcastPort`] — optional outward ports.

pub mod approval;
pub mod error;
pub mod message;
pub mod ports;
pub mod tool;

pub use error::{CodiError, CodiResult};
pub use message::{Message, Role};
pub use tool::{ToolCall, ToolResult};
