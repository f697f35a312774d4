pub mod config;
pub mod detection;
pub mod driver;
pub mod dwell;
pub mod events;
pub mod phrases;
pub mod scan;
pub mod selection;
pub mod session;
pub mod speech;
mod utils;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;

use config::EngineConfig;
use phrases::CannedPhraseGenerator;
use session::SessionOrchestrator;
use speech::{LogSpeechBackend, SpeechWorker};

const DEFAULT_CONFIG_PATH: &str = "assistive-select.json";

pub fn run() -> Result<()> {
    let debug_mode = std::env::var("ASSIST_SELECT_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(if debug_mode {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = EngineConfig::load(&config_path)?;

    log::info!(
        "assistive-select starting in {:?} mode (config: {})",
        config.input_mode,
        config_path.display()
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let orchestrator = SessionOrchestrator::new(
            config,
            Arc::new(CannedPhraseGenerator::new(Duration::from_millis(1000))),
            Arc::new(SpeechWorker::new(LogSpeechBackend)),
        )?;

        let mut snapshots = orchestrator.subscribe();
        let watcher = tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                let line = driver::describe(&snapshots.borrow_and_update());
                log::info!("{line}");
            }
        });

        let result = driver::run_console(orchestrator.clone()).await;
        orchestrator.shutdown().await;
        watcher.abort();
        result
    })
}
