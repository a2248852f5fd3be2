//! Deterministic Redis channel naming, shared by the publisher and
//! subscriber sides of the bridge.

/// Single well-known channel every publisher's general progress events fan
/// out on, and every gateway process subscribes to.
pub const WEBSOCKET_CHANNEL: &str = "codi:websocket:messages";

/// Per-project channel for signals the front end can push back to worker
/// processes (plan approvals, cancellations).
pub fn signal_channel(project_id: &str) -> String {
    format!("codi:project:{project_id}:signals")
}
