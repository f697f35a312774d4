use serde::{Deserialize, Serialize};

/// Label the detector's class table uses for unmapped indices.
const UNKNOWN_LABEL: &str = "???";

/// One detector hit. Box geometry stays with the renderer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Reduces a raw detector frame to the label set fed into the slot stabilizer.
#[derive(Debug, Clone, Copy)]
pub struct DetectionFilter {
    min_confidence: f32,
}

impl DetectionFilter {
    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }

    /// Labels scoring strictly above the threshold, in detector order. Duplicates are
    /// left for the stabilizer to fold.
    pub fn labels(&self, detections: &[Detection]) -> Vec<String> {
        detections
            .iter()
            .filter(|d| d.confidence > self.min_confidence)
            .map(|d| d.label.trim())
            .filter(|label| !label.is_empty() && *label != UNKNOWN_LABEL)
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_low_confidence_and_unknown_labels() {
        let filter = DetectionFilter::new(0.45);
        let frame = vec![
            Detection::new("cup", 0.91),
            Detection::new("person", 0.30),
            Detection::new("???", 0.99),
            Detection::new("  ", 0.80),
            Detection::new("bottle", 0.46),
            Detection::new("chair", 0.45),
        ];
        assert_eq!(filter.labels(&frame), vec!["cup", "bottle"]);
    }

    #[test]
    fn empty_frame_yields_no_labels() {
        assert!(DetectionFilter::new(0.5).labels(&[]).is_empty());
    }
}
