//! Signal types: the closed vocabulary agents coordinate over instead of
//! talking to each other directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A typed event that drives agent activation, derived from artifact state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Project needs initial setup.
    NeedsScaffold,
    /// Project needs to be built.
    NeedsBuild,
    /// Build failed, needs fix.
    BuildFailed,
    /// No preview URL available.
    NeedsPreview,
    /// Preview needs refresh.
    PreviewStale,
    /// Code needs to be written.
    NeedsImplementation,
    /// Code needs review.
    CodeReviewNeeded,
    /// Tests need fix.
    TestsFailing,
    /// Uncommitted changes present.
    DirtyGitState,
    /// Changes ready to commit.
    NeedsCommit,
    /// Commits ready to push.
    NeedsPush,
    /// Plan was approved.
    PlanApproved,
    /// Plan was rejected.
    PlanRejected,
    /// A task completed.
    TaskComplete,
    /// Error needs handling.
    ErrorOccurred,
    /// Error was fixed.
    ErrorResolved,
    /// Code needs analysis.
    NeedsAnalysis,
    /// User intent was parsed.
    IntentParsed,
    /// UI needs design.
    NeedsUiDesign,
    /// UI needs polish.
    NeedsUiPolish,
}

/// How urgently a signal should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignalPriority {
    /// Must be handled immediately.
    Critical,
    /// Handle soon.
    High,
    /// Standard priority.
    #[default]
    Normal,
    /// Handle when convenient.
    Low,
}

/// A runtime emission of a [`Signal`], carrying context for handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEvent {
    /// The signal that fired.
    pub signal: Signal,
    /// The project this emission is scoped to.
    pub project_id: String,
    /// Free-form context handed to handlers.
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
    /// Agent name or `"system"`.
    pub source: String,
    /// Emission priority.
    pub priority: SignalPriority,
    /// Artifact ids related to this emission.
    #[serde(default)]
    pub artifact_ids: Vec<String>,
    /// UTC emission timestamp.
    pub emitted_at: DateTime<Utc>,
    /// Short correlation id for tracing this emission across logs.
    pub correlation_id: String,
}

/// Pairs of signals that cannot both be active for the same project at
/// once. Checked in both directions unless the pair is explicitly
/// one-directional (see [`incompatible_counterparts`]).
///
/// `plan_approved` and `plan_rejected` are mutually exclusive: approving a
/// plan clears a prior rejection and vice versa. `error_resolved` clears a
/// prior `error_occurred`, but resolving one error must not suppress a
/// later, unrelated `error_occurred` — so the reverse entry is
/// intentionally absent.
pub fn incompatible_counterparts(signal: Signal) -> &'static [Signal] {
    match signal {
        Signal::ErrorResolved => &[Signal::ErrorOccurred],
        Signal::PlanApproved => &[Signal::PlanRejected],
        Signal::PlanRejected => &[Signal::PlanApproved],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_signals_are_symmetric() {
        assert_eq!(
            incompatible_counterparts(Signal::PlanApproved),
            &[Signal::PlanRejected]
        );
        assert_eq!(
            incompatible_counterparts(Signal::PlanRejected),
            &[Signal::PlanApproved]
        );
    }

    #[test]
    fn error_resolution_is_one_directional() {
        assert_eq!(
            incompatible_counterparts(Signal::ErrorResolved),
            &[Signal::ErrorOccurred]
        );
        assert!(incompatible_counterparts(Signal::ErrorOccurred).is_empty());
    }

    #[test]
    fn signal_serializes_snake_case() {
        let json = serde_json::to_string(&Signal::NeedsBuild).unwrap();
        assert_eq!(json, "\"needs_build\"");
    }
}
