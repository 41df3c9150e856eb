mod base;
mod config;
pub use base::DrqnModel;
pub use config::DrqnModelConfig;
