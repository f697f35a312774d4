pub mod engine;
pub mod state;

pub use engine::ScanEngine;
pub use state::ScanSession;
