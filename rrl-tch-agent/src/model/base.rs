//! Definition of interfaces of neural networks.
use anyhow::Result;
use std::path::Path;
use tch::{nn, nn::LSTMState, nn::VarStore, Tensor};

/// Base interface.
pub trait ModelBase {
    /// Returns `var_store` as mutable reference.
    fn get_var_store_mut(&mut self) -> &mut nn::VarStore;

    /// Returns `var_store`.
    fn get_var_store(&self) -> &nn::VarStore;

    /// Save parameters of the neural network.
    fn save<T: AsRef<Path>>(&self, path: T) -> Result<()>;

    /// Load parameters of the neural network.
    fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()>;
}

/// Recurrent network that can be initialized with [`VarStore`] and configuration.
///
/// Like the feed-forward sub-models, structs implementing this trait share a
/// [`VarStore`] with the model they are part of, and can be cloned into
/// another [`VarStore`] when creating a target network.
///
/// Inputs are batch-first sequences `[batch_size, seq_len, ..]`. The recurrent
/// state is an [`LSTMState`] whose tensors are shaped
/// `[num_layers, batch_size, hidden_size]`.
///
/// [`VarStore`]: https://docs.rs/tch/0.16.0/tch/nn/struct.VarStore.html
pub trait RecurrentSubModel {
    /// Configuration from which [`RecurrentSubModel`] is constructed.
    type Config;

    /// Builds [`RecurrentSubModel`] with [`VarStore`] and [`RecurrentSubModel::Config`].
    fn build(var_store: &VarStore, config: Self::Config) -> Self;

    /// Clones [`RecurrentSubModel`] with [`VarStore`].
    fn clone_with_var_store(&self, var_store: &VarStore) -> Self;

    /// Processes a sequence from the given state, returning the output sequence
    /// and the state after the last step.
    fn forward(&self, xs: &Tensor, state: &LSTMState) -> (Tensor, LSTMState);

    /// Zero state for `batch_size` sequences.
    fn init_hidden(&self, batch_size: i64) -> LSTMState;

    /// Number of stacked recurrent layers.
    fn num_layers(&self) -> i64;

    /// Size of the hidden state of a layer.
    fn hidden_size(&self) -> i64;

    /// Number of input features per step.
    fn in_dim(&self) -> i64;
}
