use std::sync::{
    mpsc::{self, Sender},
    Mutex,
};
use std::thread;

use anyhow::{anyhow, Result};
use log::{info, warn};

/// Fire-and-forget speech. Each call interrupts whatever is still playing.
pub trait SpeechOutput: Send + Sync {
    fn speak(&self, text: &str);
}

/// The synthesizer behind a [`SpeechWorker`]. Moved onto the worker thread
/// on first use and only ever called from there.
pub trait SpeechBackend: Send + 'static {
    fn stop(&mut self);
    fn speak(&mut self, text: &str) -> Result<()>;
}

/// Backend that only logs; used when no synthesizer is wired in.
#[derive(Debug, Default)]
pub struct LogSpeechBackend;

impl SpeechBackend for LogSpeechBackend {
    fn stop(&mut self) {}

    fn speak(&mut self, text: &str) -> Result<()> {
        info!("speak: {text}");
        Ok(())
    }
}

enum SpeechCommand {
    Speak(String),
}

/// Serializes utterances onto a dedicated thread and enforces
/// stop-before-speak so audio never overlaps.
pub struct SpeechWorker {
    tx: Mutex<Option<Sender<SpeechCommand>>>,
    backend: Mutex<Option<Box<dyn SpeechBackend>>>,
}

impl SpeechWorker {
    pub fn new(backend: impl SpeechBackend) -> Self {
        Self {
            tx: Mutex::new(None),
            backend: Mutex::new(Some(Box::new(backend))),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<SpeechCommand>> {
        let mut tx_guard = self.tx.lock().map_err(|e| anyhow!(e.to_string()))?;
        if let Some(tx) = tx_guard.as_ref() {
            return Ok(tx.clone());
        }

        let mut backend = self
            .backend
            .lock()
            .map_err(|e| anyhow!(e.to_string()))?
            .take()
            .ok_or_else(|| anyhow!("speech worker thread already exited"))?;

        let (tx, rx) = mpsc::channel::<SpeechCommand>();

        thread::Builder::new()
            .name("speech-worker".to_string())
            .spawn(move || {
                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        SpeechCommand::Speak(text) => {
                            backend.stop();
                            if let Err(err) = backend.speak(&text) {
                                warn!("speech backend failed: {err:#}");
                            }
                        }
                    }
                }
            })?;

        *tx_guard = Some(tx.clone());
        Ok(tx)
    }
}

impl SpeechOutput for SpeechWorker {
    fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        let sent = self
            .ensure_thread()
            .and_then(|tx| {
                tx.send(SpeechCommand::Speak(text.to_string()))
                    .map_err(|e| anyhow!(e.to_string()))
            });
        if let Err(err) = sent {
            warn!("dropping utterance {text:?}: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[derive(Clone, Default)]
    struct Recording(Arc<Mutex<Vec<String>>>);

    impl SpeechBackend for Recording {
        fn stop(&mut self) {
            self.0.lock().unwrap().push("<stop>".into());
        }

        fn speak(&mut self, text: &str) -> Result<()> {
            self.0.lock().unwrap().push(text.into());
            Ok(())
        }
    }

    fn wait_for(log: &Recording, len: usize) -> Vec<String> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let snapshot = log.0.lock().unwrap().clone();
            if snapshot.len() >= len || Instant::now() > deadline {
                return snapshot;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn every_utterance_interrupts_the_previous_one() {
        let log = Recording::default();
        let worker = SpeechWorker::new(log.clone());
        worker.speak("HELP");
        worker.speak("I need water.");

        assert_eq!(
            wait_for(&log, 4),
            vec!["<stop>", "HELP", "<stop>", "I need water."]
        );
    }

    #[test]
    fn blank_text_is_not_spoken() {
        let log = Recording::default();
        let worker = SpeechWorker::new(log.clone());
        worker.speak("   ");
        worker.speak("PAIN");
        assert_eq!(wait_for(&log, 2), vec!["<stop>", "PAIN"]);
    }
}
