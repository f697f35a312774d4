use tokio::sync::mpsc;

use crate::selection::SelectableItem;

/// Messages from the timing engines. Only the session orchestrator consumes
/// them; engines never look at session phase.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Dwell threshold reached on this target. Sent once per confirmation.
    DwellConfirmed(SelectableItem),
    /// Scan highlight moved.
    ScanTick { index: usize },
}

pub type EventSender = mpsc::UnboundedSender<EngineEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
