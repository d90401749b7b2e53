pub mod affect;
pub mod config;
pub mod logging;
pub mod protocol;
pub mod state;

pub use affect::{AffectEngine, EngineConfig};
pub use state::AppState;
