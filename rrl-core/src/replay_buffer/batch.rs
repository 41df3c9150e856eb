//! Batches of sequences.
use ndarray::{Array2, Array3, ArrayD};

/// Recurrent states attached to a [`SequenceBatch`], each shaped
/// `[batch_size, num_layers, hidden_size]`.
#[derive(Debug, Clone)]
pub struct RecurrentBatch {
    /// Hidden state active before the first step of each sequence.
    pub hidden_state: Array3<f32>,

    /// Cell state active before the first step of each sequence.
    pub cell_state: Array3<f32>,

    /// Hidden state active before the second step of each sequence,
    /// i.e. the state the target network starts from.
    pub next_hidden_state: Array3<f32>,

    /// Cell state counterpart of `next_hidden_state`.
    pub next_cell_state: Array3<f32>,
}

/// A batch of `max_seq_len`-long sequences.
///
/// Every per-step field is shaped `[batch_size, max_seq_len, ...]`.
#[derive(Debug, Clone)]
pub struct SequenceBatch {
    /// Observations, `[batch_size, max_seq_len, *obs_shape]`.
    pub observation: ArrayD<f32>,

    /// Observations following each step, zero where the step ends an episode.
    pub next_observation: ArrayD<f32>,

    /// Actions taken.
    pub action: Array2<i64>,

    /// Rewards.
    pub reward: Array2<f32>,

    /// `1.0` where the step ends an episode or is padding.
    pub done: Array2<f32>,

    /// `1.0` for stored steps, `0.0` for padding after an episode end.
    pub mask: Array2<f32>,

    /// Agent ids, `-1` where untagged or padding.
    pub agent_id: Array2<i64>,

    /// Recurrent states, present when the buffer stores them.
    pub recurrent: Option<RecurrentBatch>,
}

impl SequenceBatch {
    /// Number of sequences.
    pub fn batch_size(&self) -> usize {
        self.action.shape()[0]
    }

    /// Length of each sequence.
    pub fn seq_len(&self) -> usize {
        self.action.shape()[1]
    }
}
