use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::events::{EngineEvent, EventSender};

use super::ScanSession;

// Logs every tick at debug level
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Cycles a highlight through `item_count` positions at a fixed interval.
///
/// The highlight only moves while the engine is active, unpaused and has
/// items; otherwise the index stays frozen where it was.
#[derive(Clone)]
pub struct ScanEngine {
    session: Arc<Mutex<ScanSession>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    events: EventSender,
}

impl ScanEngine {
    pub fn new(events: EventSender) -> Self {
        Self {
            session: Arc::new(Mutex::new(ScanSession::new())),
            ticker: Arc::new(Mutex::new(None)),
            events,
        }
    }

    pub async fn get_session(&self) -> ScanSession {
        self.session.lock().await.clone()
    }

    pub async fn current_index(&self) -> usize {
        self.session.lock().await.index
    }

    /// Activates scanning. The index is kept; call `reset` first for a new list.
    pub async fn start(&self, item_count: usize, interval: Duration) -> Result<()> {
        if interval.as_millis() == 0 {
            bail!("scan interval must be at least 1ms, got {:?}", interval);
        }

        {
            let mut session = self.session.lock().await;
            session.active = true;
            session.paused = false;
            session.interval_ms = interval.as_millis() as u64;
            session.set_item_count(item_count);
        }

        log_info!(
            "scan started over {} items every {}ms",
            item_count,
            interval.as_millis()
        );
        self.sync_ticker().await;
        Ok(())
    }

    pub async fn pause(&self) {
        self.session.lock().await.paused = true;
        self.sync_ticker().await;
    }

    /// Continues from the frozen index after a full interval.
    pub async fn resume(&self) {
        self.session.lock().await.paused = false;
        self.sync_ticker().await;
    }

    pub async fn reset(&self) {
        self.session.lock().await.index = 0;
    }

    /// Resizes the scanned list in place. Dropping to zero suspends the
    /// ticker; growing back from zero restarts it.
    pub async fn set_item_count(&self, item_count: usize) {
        let was_ticking = {
            let mut session = self.session.lock().await;
            let was_ticking = session.should_tick();
            session.set_item_count(item_count);
            was_ticking
        };

        let is_ticking = self.session.lock().await.should_tick();
        if was_ticking != is_ticking {
            self.sync_ticker().await;
        }
    }

    pub async fn stop(&self) {
        self.session.lock().await.stop();
        self.cancel_ticker().await;
    }

    /// Starts or cancels the ticker to match the session flags. A running
    /// ticker is always replaced so the next tick is one full interval away.
    async fn sync_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let (epoch, interval) = {
            let mut session = self.session.lock().await;
            let epoch = session.next_epoch();
            if !session.should_tick() {
                return;
            }
            (epoch, Duration::from_millis(session.interval_ms))
        };

        let session = self.session.clone();
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + interval, interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;

                let index = {
                    let mut guard = session.lock().await;
                    if guard.epoch != epoch || !guard.should_tick() {
                        break;
                    }
                    guard.advance()
                };

                log_debug!("scan tick -> {}", index);
                if events.send(EngineEvent::ScanTick { index }).is_err() {
                    break;
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}
