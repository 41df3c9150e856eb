//! Replay buffer cutting stored transitions into fixed-length sequences.
//!
//! Recurrent agents train on sequences rather than on single transitions.
//! [`SequenceReplayBuffer`] stores transitions in a ring and samples batches of
//! `max_seq_len`-long windows, each starting at a stored transition. Windows
//! that run past the end of an episode are padded, and the padded steps are
//! flagged through [`SequenceBatch::mask`].
mod base;
mod batch;
mod config;
pub use base::SequenceReplayBuffer;
pub use batch::{RecurrentBatch, SequenceBatch};
pub use config::SequenceReplayBufferConfig;
