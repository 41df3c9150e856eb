#![warn(missing_docs)]
//! Backend-agnostic building blocks for recurrent value-based agents.
//!
//! This crate holds the contracts shared by agents and the collaborators they
//! consume: schedules, a sequence replay buffer, records and loggers, and a hook
//! for inspecting training internals. Tensor backends live in separate crates.
pub mod error;
pub mod inspect;
pub mod logger;
pub mod record;
pub mod replay_buffer;
pub mod schedule;

mod base;
pub use base::{Agent, RecurrentSnapshot, ReplayBufferBase, Transition, UpdateInfo};
