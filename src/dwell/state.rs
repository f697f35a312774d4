use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

use crate::selection::SelectableItem;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DwellPhase {
    #[default]
    Idle,
    Tracking,
    /// Entered the instant a confirmation fires; focus is ignored until it ends.
    Cooldown,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DwellState {
    pub phase: DwellPhase,
    /// Set only while the confirmation timer runs.
    pub active_target: Option<SelectableItem>,
    /// Set only during the cooldown that follows a confirmation.
    pub confirmed_id: Option<String>,
    #[serde(skip)]
    pub started_at: Option<Instant>,
    /// Bumped on every transition that invalidates a pending timer.
    #[serde(skip)]
    pub epoch: u64,
}

impl DwellState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_cooldown(&self) -> bool {
        self.phase == DwellPhase::Cooldown
    }

    pub fn is_tracking(&self, id: &str) -> bool {
        self.phase == DwellPhase::Tracking
            && self.active_target.as_ref().is_some_and(|t| t.id == id)
    }

    /// Starts tracking from zero progress and returns the epoch the new
    /// dwell timer must present when it fires.
    pub fn begin_tracking(&mut self, target: SelectableItem, now: Instant) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.phase = DwellPhase::Tracking;
        self.active_target = Some(target);
        self.confirmed_id = None;
        self.started_at = Some(now);
        self.epoch
    }

    pub fn release(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.phase = DwellPhase::Idle;
        self.active_target = None;
        self.started_at = None;
    }

    /// Tracking → confirmed → cooldown in one step. Returns the confirmed
    /// target and the epoch the cooldown timer must present.
    pub fn confirm(&mut self) -> Option<(SelectableItem, u64)> {
        if self.phase != DwellPhase::Tracking {
            return None;
        }
        let target = self.active_target.take()?;

        self.epoch = self.epoch.wrapping_add(1);
        self.phase = DwellPhase::Cooldown;
        self.confirmed_id = Some(target.id.clone());
        self.started_at = None;
        Some((target, self.epoch))
    }

    pub fn end_cooldown(&mut self) {
        self.phase = DwellPhase::Idle;
        self.confirmed_id = None;
    }

    pub fn reset(&mut self) {
        let epoch = self.epoch.wrapping_add(1);
        *self = Self {
            epoch,
            ..Self::default()
        };
    }

    /// Elapsed / duration while tracking, clamped to 1; zero otherwise.
    pub fn progress(&self, now: Instant, duration: Duration) -> f32 {
        match (self.phase, self.started_at) {
            (DwellPhase::Tracking, Some(started)) => {
                let elapsed = now.saturating_duration_since(started).as_secs_f32();
                (elapsed / duration.as_secs_f32()).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> SelectableItem {
        SelectableItem::fixed(id)
    }

    #[test]
    fn confirm_moves_into_cooldown_and_marks_target() {
        let mut state = DwellState::new();
        let tracked_epoch = state.begin_tracking(item("HELP"), Instant::now());
        let (target, cooldown_epoch) = state.confirm().unwrap();

        assert_eq!(target.id, "HELP");
        assert!(state.in_cooldown());
        assert_eq!(state.confirmed_id.as_deref(), Some("HELP"));
        assert!(state.active_target.is_none());
        assert_ne!(tracked_epoch, cooldown_epoch);
    }

    #[test]
    fn confirm_without_tracking_is_none() {
        let mut state = DwellState::new();
        assert!(state.confirm().is_none());
        state.begin_tracking(item("PAIN"), Instant::now());
        state.release();
        assert!(state.confirm().is_none());
    }

    #[test]
    fn progress_is_zero_outside_tracking() {
        let mut state = DwellState::new();
        let now = Instant::now();
        assert_eq!(state.progress(now, Duration::from_millis(1000)), 0.0);

        state.begin_tracking(item("HELP"), now);
        let halfway = state.progress(now + Duration::from_millis(500), Duration::from_millis(1000));
        assert!((halfway - 0.5).abs() < 1e-3);
        let past = state.progress(now + Duration::from_millis(5000), Duration::from_millis(1000));
        assert_eq!(past, 1.0);

        state.confirm();
        assert_eq!(state.progress(now, Duration::from_millis(1000)), 0.0);
    }
}
