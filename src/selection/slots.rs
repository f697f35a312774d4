use anyhow::{bail, Result};
use serde::Serialize;

/// One stabilized dynamic position.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub index: usize,
    pub content: Option<String>,
}

/// Turns a flickering stream of detected labels into at most `K` stable
/// suggestions.
///
/// A label keeps its slot for as long as it keeps being re-detected; new
/// labels overwrite slots round-robin. Nothing is ever evicted except by
/// being overwritten.
#[derive(Debug, Clone)]
pub struct SlotStabilizer {
    slots: Vec<Slot>,
    next_write: usize,
}

impl SlotStabilizer {
    pub fn new(slot_count: usize) -> Result<Self> {
        if slot_count == 0 {
            bail!("slot count must be at least 1");
        }

        Ok(Self {
            slots: (0..slot_count)
                .map(|index| Slot {
                    index,
                    content: None,
                })
                .collect(),
            next_write: 0,
        })
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Feeds one detector report. Returns whether any slot changed.
    ///
    /// At most `K` writes happen per call; labels beyond that are picked up
    /// on a later report since detectors re-report continuously.
    pub fn update<I, S>(&mut self, detected: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen: Vec<String> = Vec::new();
        for label in detected {
            let normalized = label.as_ref().trim().to_uppercase();
            if normalized.is_empty() || seen.contains(&normalized) {
                continue;
            }
            seen.push(normalized);
        }

        let capacity = self.slots.len();
        let mut writes = 0;

        for label in seen {
            if writes == capacity {
                break;
            }
            if self.contains(&label) {
                continue;
            }

            self.slots[self.next_write].content = Some(label);
            self.next_write = (self.next_write + 1) % capacity;
            writes += 1;
        }

        writes > 0
    }

    fn contains(&self, label: &str) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.content.as_deref() == Some(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(stabilizer: &SlotStabilizer) -> Vec<Option<&str>> {
        stabilizer
            .slots()
            .iter()
            .map(|slot| slot.content.as_deref())
            .collect()
    }

    #[test]
    fn starts_empty() {
        let stabilizer = SlotStabilizer::new(2).unwrap();
        assert_eq!(contents(&stabilizer), vec![None, None]);
    }

    #[test]
    fn rejects_zero_slots() {
        assert!(SlotStabilizer::new(0).is_err());
    }

    #[test]
    fn round_robin_replaces_oldest_write() {
        let mut stabilizer = SlotStabilizer::new(2).unwrap();
        stabilizer.update(["a"]);
        stabilizer.update(["b"]);
        stabilizer.update(["c"]);
        assert_eq!(contents(&stabilizer), vec![Some("C"), Some("B")]);
    }

    #[test]
    fn repeated_reports_do_not_churn() {
        let mut stabilizer = SlotStabilizer::new(2).unwrap();
        stabilizer.update(["cup", "bottle"]);
        let before = contents(&stabilizer)
            .into_iter()
            .map(|c| c.map(str::to_string))
            .collect::<Vec<_>>();

        for _ in 0..10 {
            assert!(!stabilizer.update(["bottle", "cup"]));
        }

        let after = contents(&stabilizer)
            .into_iter()
            .map(|c| c.map(str::to_string))
            .collect::<Vec<_>>();
        assert_eq!(before, after);

        // Pointer did not move either: the next new label goes to slot 0.
        stabilizer.update(["chair"]);
        assert_eq!(contents(&stabilizer), vec![Some("CHAIR"), Some("BOTTLE")]);
    }

    #[test]
    fn dedupes_and_normalizes_case() {
        let mut stabilizer = SlotStabilizer::new(2).unwrap();
        stabilizer.update(["Cup", "cup", " CUP "]);
        assert_eq!(contents(&stabilizer), vec![Some("CUP"), None]);
    }

    #[test]
    fn same_report_fills_in_input_order() {
        let mut stabilizer = SlotStabilizer::new(2).unwrap();
        stabilizer.update(["laptop", "phone"]);
        assert_eq!(contents(&stabilizer), vec![Some("LAPTOP"), Some("PHONE")]);
    }

    #[test]
    fn caps_writes_per_report_at_slot_count() {
        let mut stabilizer = SlotStabilizer::new(2).unwrap();
        stabilizer.update(["a", "b", "c", "d"]);
        assert_eq!(contents(&stabilizer), vec![Some("A"), Some("B")]);

        // C and D land on the following report.
        stabilizer.update(["a", "b", "c", "d"]);
        assert_eq!(contents(&stabilizer), vec![Some("C"), Some("D")]);
    }

    #[test]
    fn empty_report_keeps_slots() {
        let mut stabilizer = SlotStabilizer::new(2).unwrap();
        stabilizer.update(["cup"]);
        assert!(!stabilizer.update(Vec::<String>::new()));
        assert_eq!(contents(&stabilizer), vec![Some("CUP"), None]);
    }
}
