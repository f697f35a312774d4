use serde::{Deserialize, Serialize};

/// Label shown for a slot that has never received a detection.
pub const PLACEHOLDER_LABEL: &str = "SCANNING";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SelectableItem {
    /// Unique within the current set and stable while the content is unchanged.
    pub id: String,
    /// Display and speech text.
    pub label: String,
    pub is_dynamic: bool,
    /// Placeholders fill empty slots; confirming one does nothing.
    #[serde(default)]
    pub is_placeholder: bool,
}

impl SelectableItem {
    pub fn fixed(label: &str) -> Self {
        let label = label.trim().to_uppercase();
        Self {
            id: label.clone(),
            label,
            is_dynamic: false,
            is_placeholder: false,
        }
    }

    pub fn from_slot(index: usize, label: &str) -> Self {
        Self {
            id: format!("{label}_SLOT_{index}"),
            label: label.to_string(),
            is_dynamic: true,
            is_placeholder: false,
        }
    }

    pub fn placeholder(index: usize) -> Self {
        Self {
            id: format!("SCANNING_{index}"),
            label: PLACEHOLDER_LABEL.to_string(),
            is_dynamic: true,
            is_placeholder: true,
        }
    }

    pub fn phrase(index: usize, text: &str) -> Self {
        Self {
            id: format!("PHRASE_{index}"),
            label: text.to_string(),
            is_dynamic: true,
            is_placeholder: false,
        }
    }

    pub fn is_actionable(&self) -> bool {
        !self.is_placeholder
    }
}
