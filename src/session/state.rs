use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::selection::SelectableItem;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    Idle,
    /// Scanning the keyword set (static items plus stabilized suggestions).
    ScanningOptions,
    /// Waiting on phrase generation for the confirmed keyword.
    Generating,
    /// Scanning the generated phrases.
    ScanningResults,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "Idle",
            SessionPhase::ScanningOptions => "ScanningOptions",
            SessionPhase::Generating => "Generating",
            SessionPhase::ScanningResults => "ScanningResults",
        }
    }

    pub fn is_scanning(&self) -> bool {
        matches!(
            self,
            SessionPhase::ScanningOptions | SessionPhase::ScanningResults
        )
    }
}

/// What observers see after every transition and scan tick.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub items: Vec<SelectableItem>,
    /// Scan position; `None` outside scanning or in dwell mode.
    pub highlighted: Option<usize>,
    pub busy: bool,
    /// Keyword whose phrases are being generated or scanned.
    pub selected: Option<SelectableItem>,
    pub last_spoken: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IgnoreReason {
    /// A confirm-triggered chain is still outstanding.
    Busy,
    /// No scanning phase is active.
    NotScanning,
    /// Dwell mode with nothing under focus.
    NoTarget,
    Placeholder,
    /// The target is no longer part of the current set.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    Accepted(SelectableItem),
    Ignored(IgnoreReason),
}

impl ConfirmOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ConfirmOutcome::Accepted(_))
    }
}
