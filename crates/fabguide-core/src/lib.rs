pub mod commands;
pub mod context;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod ids;
pub mod intents;
pub mod model;
pub mod outcomes;
pub mod prioritize;
pub mod search;
pub mod state;
pub mod types;

pub use commands::*;
pub use context::*;
pub use engine::*;
pub use error::*;
pub use feedback::*;
pub use ids::*;
pub use intents::*;
pub use model::*;
pub use outcomes::*;
pub use prioritize::*;
pub use search::*;
pub use state::*;
pub use types::*;
