//! Replay buffer interface.
use anyhow::Result;

/// Interface of replay buffers that store transitions and cut them into
/// fixed-length training sequences.
pub trait ReplayBufferBase {
    /// Configuration parameters for the replay buffer.
    type Config: Clone;

    /// A single stored item, typically a transition.
    type Item;

    /// The type of batch generated for training.
    type Batch;

    /// Builds a new replay buffer from the given configuration.
    fn build(config: &Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Stores one transition.
    fn add(&mut self, item: Self::Item) -> Result<()>;

    /// Samples a batch of `batch_size` sequences.
    ///
    /// Fails if [`ReplayBufferBase::num_sequences`] is zero.
    fn sample(&mut self, batch_size: usize) -> Result<Self::Batch>;

    /// Number of stored transitions.
    fn size(&self) -> usize;

    /// Number of positions from which a complete sequence can be sampled.
    fn num_sequences(&self) -> usize;

    /// Length of the sampled sequences.
    fn max_seq_len(&self) -> usize;
}
