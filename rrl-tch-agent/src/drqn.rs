//! DRQN agent.
mod base;
mod config;
mod hidden;
mod model;
pub use base::Drqn;
pub use config::DrqnConfig;
pub use hidden::HiddenStateStrategy;
pub use model::{DrqnModel, DrqnModelConfig};
