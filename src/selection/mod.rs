pub mod builder;
pub mod item;
pub mod slots;

pub use builder::build_selectable_set;
pub use item::{SelectableItem, PLACEHOLDER_LABEL};
pub use slots::{Slot, SlotStabilizer};
