//! Core functionalities.
mod agent;
mod replay_buffer;
mod transition;
pub use agent::Agent;
pub use replay_buffer::ReplayBufferBase;
pub use transition::{RecurrentSnapshot, Transition, UpdateInfo};
