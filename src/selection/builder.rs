use super::{SelectableItem, Slot};

/// Static items first, in their fixed order, then one entry per slot in slot
/// order. Empty slots become placeholders.
pub fn build_selectable_set(static_items: &[SelectableItem], slots: &[Slot]) -> Vec<SelectableItem> {
    static_items
        .iter()
        .cloned()
        .chain(slots.iter().map(|slot| match slot.content.as_deref() {
            Some(label) => SelectableItem::from_slot(slot.index, label),
            None => SelectableItem::placeholder(slot.index),
        }))
        .collect()
}
