pub mod engine;
pub mod state;

pub use engine::DwellEngine;
pub use state::{DwellPhase, DwellState};
