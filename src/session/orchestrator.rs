use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use log::{debug, info, warn};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use crate::{
    config::{EngineConfig, InputMode},
    detection::{Detection, DetectionFilter},
    dwell::DwellEngine,
    events::{self, EngineEvent, EventReceiver},
    phrases::{fallback_phrases, sanitize_phrases, PhraseGenerator},
    scan::ScanEngine,
    selection::{build_selectable_set, SelectableItem, SlotStabilizer},
    speech::SpeechOutput,
};

use super::{ConfirmOutcome, IgnoreReason, SessionPhase, SessionSnapshot};

struct SessionInner {
    phase: SessionPhase,
    /// Set while a confirm-triggered chain is outstanding; confirms are
    /// dropped, not queued, while it is up.
    busy: bool,
    /// Tags async work; bumped on every transition that makes pending
    /// results meaningless.
    epoch: u64,
    session_id: Option<String>,
    started_at: Option<chrono::DateTime<Utc>>,
    /// Lives for the whole process, across sessions.
    stabilizer: SlotStabilizer,
    /// Replaced wholesale on every change, never edited in place.
    items: Arc<Vec<SelectableItem>>,
    selected: Option<SelectableItem>,
    last_spoken: Option<String>,
}

impl SessionInner {
    fn bump_epoch(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }

    fn clear_session(&mut self) {
        self.bump_epoch();
        self.phase = SessionPhase::Idle;
        self.busy = false;
        self.session_id = None;
        self.started_at = None;
        self.items = Arc::new(Vec::new());
        self.selected = None;
    }
}

enum Choice {
    Highlighted,
    Item(SelectableItem),
}

/// Top-level state machine: owns the session phase and busy guard, drives the
/// scan and dwell engines, and sequences phrase generation and speech.
///
/// Handles are cheap clones. Dropping the last one cancels the event pump,
/// pending timers and any in-flight generation, same as `shutdown`.
#[derive(Clone)]
pub struct SessionOrchestrator {
    inner: Arc<Mutex<SessionInner>>,
    config: Arc<EngineConfig>,
    static_items: Arc<Vec<SelectableItem>>,
    filter: DetectionFilter,
    scan: ScanEngine,
    dwell: DwellEngine,
    generator: Arc<dyn PhraseGenerator>,
    speech: Arc<dyn SpeechOutput>,
    snapshot_tx: Arc<watch::Sender<SessionSnapshot>>,
    shutdown: CancellationToken,
    pump: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// Shared by user-facing handles only; background tasks hold `detached` copies.
    drop_guard: Option<Arc<DropGuard>>,
}

impl SessionOrchestrator {
    /// Must be called inside a tokio runtime; spawns the engine event pump.
    pub fn new(
        config: EngineConfig,
        generator: Arc<dyn PhraseGenerator>,
        speech: Arc<dyn SpeechOutput>,
    ) -> Result<Self> {
        config.validate()?;

        let (events_tx, events_rx) = events::channel();
        let scan = ScanEngine::new(events_tx.clone());
        let dwell = DwellEngine::new(config.dwell_duration(), config.cooldown(), events_tx)?;
        let stabilizer = SlotStabilizer::new(config.slot_count)?;

        let static_items: Vec<SelectableItem> = config
            .static_items
            .iter()
            .map(|label| SelectableItem::fixed(label))
            .collect();

        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());
        let shutdown = CancellationToken::new();

        let orchestrator = Self {
            inner: Arc::new(Mutex::new(SessionInner {
                phase: SessionPhase::Idle,
                busy: false,
                epoch: 0,
                session_id: None,
                started_at: None,
                stabilizer,
                items: Arc::new(Vec::new()),
                selected: None,
                last_spoken: None,
            })),
            filter: DetectionFilter::new(config.min_detection_confidence),
            config: Arc::new(config),
            static_items: Arc::new(static_items),
            scan,
            dwell,
            generator,
            speech,
            snapshot_tx: Arc::new(snapshot_tx),
            drop_guard: Some(Arc::new(shutdown.clone().drop_guard())),
            shutdown,
            pump: Arc::new(Mutex::new(None)),
        };

        let handle = tokio::spawn(orchestrator.detached().pump_events(events_rx));
        if let Ok(mut guard) = orchestrator.pump.try_lock() {
            *guard = Some(handle);
        }

        Ok(orchestrator)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.lock().await.phase
    }

    /// The keyword set as it would be offered right now, whatever the phase.
    pub async fn keywords(&self) -> Vec<SelectableItem> {
        let inner = self.inner.lock().await;
        build_selectable_set(&self.static_items, inner.stabilizer.slots())
    }

    /// The set the engines currently operate over.
    pub async fn items(&self) -> Arc<Vec<SelectableItem>> {
        self.inner.lock().await.items.clone()
    }

    pub async fn dwell_progress(&self) -> f32 {
        self.dwell.current_progress().await
    }

    /// IDLE → SCANNING_OPTIONS over the current keyword set.
    pub async fn start(&self) -> Result<SessionSnapshot> {
        let mut inner = self.inner.lock().await;
        if inner.phase != SessionPhase::Idle {
            bail!("session already active");
        }

        let items = build_selectable_set(&self.static_items, inner.stabilizer.slots());
        let item_count = items.len();

        inner.bump_epoch();
        inner.phase = SessionPhase::ScanningOptions;
        inner.busy = false;
        inner.session_id = Some(Uuid::new_v4().to_string());
        inner.started_at = Some(Utc::now());
        inner.items = Arc::new(items);
        inner.selected = None;

        self.scan.reset().await;
        if self.config.input_mode == InputMode::Scan {
            self.scan
                .start(item_count, self.config.scan_interval())
                .await?;
        }

        info!(
            "session {} started over {} items",
            inner.session_id.as_deref().unwrap_or_default(),
            item_count
        );
        Ok(self.publish(&inner).await)
    }

    /// The single user "confirm" signal, however it was produced.
    ///
    /// In scan mode it acts on the highlighted item, in dwell mode on the
    /// item currently under focus.
    pub async fn confirm(&self) -> ConfirmOutcome {
        let choice = match self.config.input_mode {
            InputMode::Scan => Choice::Highlighted,
            InputMode::Dwell => match self.dwell.get_state().await.active_target {
                Some(target) => Choice::Item(target),
                None => return ConfirmOutcome::Ignored(IgnoreReason::NoTarget),
            },
        };
        self.accept_confirm(choice).await
    }

    /// Any phase → IDLE. In-flight generation and speech are left to finish
    /// but their results are discarded.
    pub async fn cancel(&self) {
        let mut inner = self.inner.lock().await;
        let from = inner.phase;
        inner.clear_session();

        self.scan.stop().await;
        self.dwell.release().await;

        if from != SessionPhase::Idle {
            info!("session cancelled from {}", from.as_str());
        }
        self.publish(&inner).await;
    }

    /// Feeds one raw detector frame through the confidence filter.
    pub async fn ingest_detections(&self, detections: &[Detection]) {
        let labels = self.filter.labels(detections);
        self.update_detections(labels).await;
    }

    /// Feeds one detector label report into the slot stabilizer. While the
    /// keyword set is on screen it is rebuilt to match.
    pub async fn update_detections<I, S>(&self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut inner = self.inner.lock().await;
        if !inner.stabilizer.update(labels) {
            return;
        }
        if inner.phase != SessionPhase::ScanningOptions {
            return;
        }

        let items = build_selectable_set(&self.static_items, inner.stabilizer.slots());
        self.scan.set_item_count(items.len()).await;

        let dwell_target = self.dwell.get_state().await.active_target;
        if let Some(target) = dwell_target {
            if !items.iter().any(|item| item.id == target.id) {
                self.dwell.release().await;
            }
        }

        inner.items = Arc::new(items);
        self.publish(&inner).await;
    }

    /// Dwell mode only: starts or keeps dwelling on `item_id`. Returns true
    /// when a new dwell timer started.
    pub async fn focus(&self, item_id: &str) -> bool {
        if self.config.input_mode != InputMode::Dwell {
            return false;
        }

        let inner = self.inner.lock().await;
        if inner.busy || !inner.phase.is_scanning() {
            return false;
        }
        let Some(item) = inner.items.iter().find(|item| item.id == item_id) else {
            return false;
        };
        if !item.is_actionable() {
            return false;
        }

        self.dwell.focus(item.clone()).await
    }

    pub async fn release(&self) {
        self.dwell.release().await;
    }

    /// Stops every timer, the event pump and any pending generation task.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.scan.stop().await;
        self.dwell.shutdown().await;
        if let Some(handle) = self.pump.lock().await.take() {
            handle.abort();
        }
    }

    async fn accept_confirm(&self, choice: Choice) -> ConfirmOutcome {
        let mut inner = self.inner.lock().await;

        if inner.busy || inner.phase == SessionPhase::Generating {
            debug!("confirm dropped: busy");
            return ConfirmOutcome::Ignored(IgnoreReason::Busy);
        }
        if !inner.phase.is_scanning() {
            return ConfirmOutcome::Ignored(IgnoreReason::NotScanning);
        }

        let item = match choice {
            Choice::Highlighted => {
                let index = self.scan.current_index().await;
                inner.items.get(index).cloned()
            }
            Choice::Item(target) => inner.items.iter().find(|item| item.id == target.id).cloned(),
        };
        let Some(item) = item else {
            debug!("confirm dropped: target left the current set");
            return ConfirmOutcome::Ignored(IgnoreReason::Stale);
        };
        if !item.is_actionable() {
            return ConfirmOutcome::Ignored(IgnoreReason::Placeholder);
        }

        inner.busy = true;
        self.dwell.release().await;
        self.speech.speak(&item.label);
        inner.last_spoken = Some(item.label.clone());

        match inner.phase {
            SessionPhase::ScanningOptions => {
                let epoch = inner.bump_epoch();
                inner.phase = SessionPhase::Generating;
                inner.selected = Some(item.clone());
                self.scan.pause().await;

                info!("keyword {} confirmed; generating phrases", item.label);
                self.spawn_generation(epoch, item.label.clone());
            }
            SessionPhase::ScanningResults => {
                info!("phrase confirmed: {}", item.label);
                inner.clear_session();
                self.scan.stop().await;
            }
            SessionPhase::Idle | SessionPhase::Generating => {}
        }

        self.publish(&inner).await;
        ConfirmOutcome::Accepted(item)
    }

    /// A handle that does not keep the session alive.
    fn detached(&self) -> Self {
        Self {
            drop_guard: None,
            ..self.clone()
        }
    }

    fn spawn_generation(&self, epoch: u64, keyword: String) {
        let this = self.detached();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = this.run_generation(epoch, keyword) => {}
            }
        });
    }

    async fn run_generation(&self, epoch: u64, keyword: String) {
        let timeout = self.config.generate_timeout();
        let outcome = match tokio::time::timeout(timeout, self.generator.generate(&keyword)).await {
            Ok(Ok(raw)) => sanitize_phrases(raw, self.config.phrase_count)
                .ok_or_else(|| anyhow!("generator returned no usable phrases")),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(anyhow!(
                "phrase generation timed out after {}ms",
                timeout.as_millis()
            )),
        };

        self.apply_generation(epoch, &keyword, outcome).await;
    }

    async fn apply_generation(&self, epoch: u64, keyword: &str, outcome: Result<Vec<String>>) {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch || inner.phase != SessionPhase::Generating {
            debug!("discarding stale phrases for {keyword}");
            return;
        }

        let phrases = match outcome {
            Ok(phrases) => phrases,
            Err(err) if self.config.use_fallback_phrases => {
                warn!("phrase generation for {keyword} failed, using fallback: {err:#}");
                fallback_phrases(keyword)
                    .into_iter()
                    .take(self.config.phrase_count)
                    .collect()
            }
            Err(err) => {
                warn!("phrase generation for {keyword} failed: {err:#}");
                inner.clear_session();
                self.scan.stop().await;
                self.publish(&inner).await;
                return;
            }
        };

        let items: Vec<SelectableItem> = phrases
            .iter()
            .enumerate()
            .map(|(index, text)| SelectableItem::phrase(index, text))
            .collect();
        let item_count = items.len();

        inner.bump_epoch();
        inner.phase = SessionPhase::ScanningResults;
        inner.items = Arc::new(items);

        self.scan.reset().await;
        if self.config.input_mode == InputMode::Scan {
            if let Err(err) = self
                .scan
                .start(item_count, self.config.scan_interval())
                .await
            {
                warn!("failed to restart scan over phrases: {err:#}");
            }
        }
        inner.busy = false;

        info!("{} phrases ready for {keyword}", item_count);
        self.publish(&inner).await;
    }

    async fn pump_events(self, mut events: EventReceiver) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(EngineEvent::DwellConfirmed(target)) => {
                        let outcome = self.accept_confirm(Choice::Item(target)).await;
                        debug!("dwell confirmation -> {outcome:?}");
                    }
                    Some(EngineEvent::ScanTick { .. }) => {
                        let inner = self.inner.lock().await;
                        self.publish(&inner).await;
                    }
                    None => break,
                },
            }
        }

        self.scan.stop().await;
        self.dwell.shutdown().await;
        debug!("event pump stopped");
    }

    async fn publish(&self, inner: &SessionInner) -> SessionSnapshot {
        let highlighted = if inner.phase.is_scanning() && self.config.input_mode == InputMode::Scan {
            Some(self.scan.current_index().await)
        } else {
            None
        };

        let snapshot = SessionSnapshot {
            phase: inner.phase,
            session_id: inner.session_id.clone(),
            started_at: inner.started_at,
            items: (*inner.items).clone(),
            highlighted,
            busy: inner.busy,
            selected: inner.selected.clone(),
            last_spoken: inner.last_spoken.clone(),
        };

        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }
}
