use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use tokio::{sync::Mutex, task::JoinHandle, time::Instant};

use crate::events::{EngineEvent, EventSender};
use crate::selection::SelectableItem;

use super::DwellState;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

struct DwellInner {
    state: DwellState,
    dwell_timer: Option<JoinHandle<()>>,
    cooldown_timer: Option<JoinHandle<()>>,
}

impl DwellInner {
    fn abort_timers(&mut self) {
        if let Some(handle) = self.dwell_timer.take() {
            handle.abort();
        }
        if let Some(handle) = self.cooldown_timer.take() {
            handle.abort();
        }
    }
}

/// Confirms a target once it has held focus for the dwell duration, then
/// ignores focus for the cooldown window.
#[derive(Clone)]
pub struct DwellEngine {
    inner: Arc<Mutex<DwellInner>>,
    dwell_duration: Duration,
    cooldown: Duration,
    events: EventSender,
}

impl DwellEngine {
    pub fn new(dwell_duration: Duration, cooldown: Duration, events: EventSender) -> Result<Self> {
        if dwell_duration.is_zero() {
            bail!("dwell duration must be greater than zero");
        }
        if cooldown.is_zero() {
            bail!("dwell cooldown must be greater than zero");
        }

        Ok(Self {
            inner: Arc::new(Mutex::new(DwellInner {
                state: DwellState::new(),
                dwell_timer: None,
                cooldown_timer: None,
            })),
            dwell_duration,
            cooldown,
            events,
        })
    }

    pub async fn get_state(&self) -> DwellState {
        self.inner.lock().await.state.clone()
    }

    /// Returns true when a new dwell timer was started.
    pub async fn focus(&self, target: SelectableItem) -> bool {
        let mut inner = self.inner.lock().await;

        if inner.state.in_cooldown() {
            log_debug!("dwell focus on {} ignored during cooldown", target.id);
            return false;
        }
        if inner.state.is_tracking(&target.id) {
            return false;
        }

        if let Some(handle) = inner.dwell_timer.take() {
            handle.abort();
        }

        log_debug!("dwell tracking {}", target.id);
        let epoch = inner.state.begin_tracking(target, Instant::now());

        let shared = self.inner.clone();
        let duration = self.dwell_duration;
        let cooldown = self.cooldown;
        let events = self.events.clone();
        inner.dwell_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            fire_confirmation(shared, epoch, cooldown, events).await;
        }));

        true
    }

    pub async fn release(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state.active_target.is_none() {
            return;
        }
        if let Some(handle) = inner.dwell_timer.take() {
            handle.abort();
        }
        inner.state.release();
    }

    pub async fn current_progress(&self) -> f32 {
        let inner = self.inner.lock().await;
        inner.state.progress(Instant::now(), self.dwell_duration)
    }

    /// Cancels every pending timer and forgets any tracking or cooldown.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        inner.abort_timers();
        inner.state.reset();
    }
}

async fn fire_confirmation(
    shared: Arc<Mutex<DwellInner>>,
    epoch: u64,
    cooldown: Duration,
    events: EventSender,
) {
    let mut inner = shared.lock().await;
    if inner.state.epoch != epoch {
        // Lost the race with a refocus or release.
        return;
    }

    let Some((target, cooldown_epoch)) = inner.state.confirm() else {
        return;
    };
    // Dropping our own handle only detaches it.
    inner.dwell_timer = None;

    log_info!("dwell confirmed {}", target.id);
    let _ = events.send(EngineEvent::DwellConfirmed(target));

    let cooldown_shared = shared.clone();
    inner.cooldown_timer = Some(tokio::spawn(async move {
        tokio::time::sleep(cooldown).await;
        let mut inner = cooldown_shared.lock().await;
        if inner.state.epoch == cooldown_epoch && inner.state.in_cooldown() {
            inner.state.end_cooldown();
            inner.cooldown_timer = None;
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{self, EventReceiver};
    use tokio::time::sleep;

    fn engine() -> (DwellEngine, EventReceiver) {
        let (tx, rx) = events::channel();
        let engine =
            DwellEngine::new(Duration::from_millis(1500), Duration::from_millis(1000), tx).unwrap();
        (engine, rx)
    }

    fn item(id: &str) -> SelectableItem {
        SelectableItem::fixed(id)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[test]
    fn rejects_zero_durations() {
        let (tx, _rx) = events::channel();
        assert!(DwellEngine::new(Duration::ZERO, Duration::from_millis(1), tx.clone()).is_err());
        assert!(DwellEngine::new(Duration::from_millis(1), Duration::ZERO, tx).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn confirms_once_after_duration_then_ignores_focus_during_cooldown() {
        let (engine, mut rx) = engine();
        assert!(engine.focus(item("X")).await);

        sleep(Duration::from_millis(1499)).await;
        assert!(drain(&mut rx).is_empty());

        sleep(Duration::from_millis(101)).await;
        assert_eq!(drain(&mut rx), vec![EngineEvent::DwellConfirmed(item("X"))]);
        let state = engine.get_state().await;
        assert!(state.in_cooldown());
        assert_eq!(state.confirmed_id.as_deref(), Some("X"));

        // 1600ms .. 2500ms: cooldown swallows focus.
        assert!(!engine.focus(item("X")).await);
        sleep(Duration::from_millis(800)).await;
        assert!(!engine.focus(item("Y")).await);
        assert_eq!(engine.current_progress().await, 0.0);

        sleep(Duration::from_millis(200)).await;
        let state = engine.get_state().await;
        assert!(!state.in_cooldown());
        assert!(state.confirmed_id.is_none());
        assert!(engine.focus(item("Y")).await);
    }

    #[tokio::test(start_paused = true)]
    async fn refocusing_same_target_does_not_restart_timer() {
        let (engine, mut rx) = engine();
        engine.focus(item("X")).await;
        sleep(Duration::from_millis(1000)).await;
        assert!(!engine.focus(item("X")).await);
        sleep(Duration::from_millis(600)).await;
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_targets_confirms_only_the_final_one() {
        let (engine, mut rx) = engine();
        engine.focus(item("A")).await;
        sleep(Duration::from_millis(700)).await;
        engine.focus(item("B")).await;
        sleep(Duration::from_millis(1400)).await;
        engine.focus(item("A")).await;

        sleep(Duration::from_millis(1499)).await;
        assert!(drain(&mut rx).is_empty());
        let progress = engine.current_progress().await;
        assert!(progress > 0.99 && progress < 1.0);

        sleep(Duration::from_millis(2)).await;
        assert_eq!(drain(&mut rx), vec![EngineEvent::DwellConfirmed(item("A"))]);

        sleep(Duration::from_millis(5000)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn release_cancels_tracking() {
        let (engine, mut rx) = engine();
        engine.focus(item("X")).await;
        sleep(Duration::from_millis(1000)).await;
        assert!(engine.current_progress().await > 0.6);

        engine.release().await;
        assert_eq!(engine.current_progress().await, 0.0);

        sleep(Duration::from_millis(3000)).await;
        assert!(drain(&mut rx).is_empty());
        assert!(engine.get_state().await.active_target.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_silences_pending_timers() {
        let (engine, mut rx) = engine();
        engine.focus(item("X")).await;
        sleep(Duration::from_millis(500)).await;
        engine.shutdown().await;

        sleep(Duration::from_millis(3000)).await;
        assert!(drain(&mut rx).is_empty());
    }
}
