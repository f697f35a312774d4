use serde::Serialize;

#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScanSession {
    pub active: bool,
    pub paused: bool,
    pub item_count: usize,
    pub index: usize,
    pub interval_ms: u64,
    /// Identifies the ticker allowed to advance `index`.
    #[serde(skip)]
    pub epoch: u64,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ticker should be running: active, unpaused and non-empty.
    pub fn should_tick(&self) -> bool {
        self.active && !self.paused && self.item_count > 0
    }

    pub fn advance(&mut self) -> usize {
        if self.item_count > 0 {
            self.index = (self.index + 1) % self.item_count;
        }
        self.index
    }

    /// Keeps the frozen index inside a resized list.
    pub fn set_item_count(&mut self, item_count: usize) {
        self.item_count = item_count;
        if item_count > 0 && self.index >= item_count {
            self.index = item_count - 1;
        }
    }

    pub fn next_epoch(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }

    pub fn stop(&mut self) {
        let epoch = self.epoch.wrapping_add(1);
        *self = Self {
            epoch,
            ..Self::default()
        };
    }
}
