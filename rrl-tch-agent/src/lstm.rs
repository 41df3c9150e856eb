//! Recurrent representation network.
mod base;
mod config;
pub use base::LstmEncoder;
pub use config::LstmEncoderConfig;
