use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path, time::Duration};

/// How the user drives confirmation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum InputMode {
    /// Auto-advancing highlight plus a single confirm switch.
    #[default]
    Scan,
    /// Sustained focus on a target confirms it.
    Dwell,
}

/// Timing and layout knobs for the whole selection engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub dwell_duration_ms: u64,
    pub cooldown_ms: u64,
    pub scan_interval_ms: u64,
    /// Number of stabilized dynamic slots appended after the static items.
    pub slot_count: usize,
    pub static_items: Vec<String>,
    pub input_mode: InputMode,
    /// Detections scoring below this are never offered as suggestions.
    pub min_detection_confidence: f32,
    pub generate_timeout_ms: u64,
    pub phrase_count: usize,
    /// When false a failed generation returns the session to idle instead
    /// of offering the templated phrases.
    pub use_fallback_phrases: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dwell_duration_ms: 1500,
            cooldown_ms: 1000,
            scan_interval_ms: 1200,
            slot_count: 2,
            static_items: vec!["HELP".into(), "EMERGENCY".into(), "PAIN".into()],
            input_mode: InputMode::Scan,
            min_detection_confidence: 0.45,
            generate_timeout_ms: 8000,
            phrase_count: 3,
            use_fallback_phrases: true,
        }
    }
}

impl EngineConfig {
    /// Reads a JSON config. A missing file yields the defaults; a present but
    /// unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config at {}", path.display()))?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dwell_duration_ms == 0 {
            bail!("dwellDurationMs must be greater than zero");
        }
        if self.cooldown_ms == 0 {
            bail!("cooldownMs must be greater than zero");
        }
        if self.scan_interval_ms == 0 {
            bail!("scanIntervalMs must be greater than zero");
        }
        if self.generate_timeout_ms == 0 {
            bail!("generateTimeoutMs must be greater than zero");
        }
        if self.slot_count == 0 {
            bail!("slotCount must be at least 1");
        }
        if self.phrase_count == 0 {
            bail!("phraseCount must be at least 1");
        }
        if self.static_items.is_empty() {
            bail!("staticItems must not be empty");
        }
        if self.static_items.iter().any(|label| label.trim().is_empty()) {
            bail!("staticItems must not contain blank labels");
        }
        let mut seen = HashSet::new();
        for label in &self.static_items {
            let normalized = label.trim().to_uppercase();
            if !seen.insert(normalized.clone()) {
                bail!("staticItems contains duplicate label {normalized:?}");
            }
        }
        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            bail!(
                "minDetectionConfidence must be within [0, 1], got {}",
                self.min_detection_confidence
            );
        }
        Ok(())
    }

    pub fn dwell_duration(&self) -> Duration {
        Duration::from_millis(self.dwell_duration_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_millis(self.generate_timeout_ms)
    }
}
