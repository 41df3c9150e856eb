//! Agent.
use super::UpdateInfo;
use crate::record::Record;
use anyhow::Result;
use ndarray::ArrayD;
use std::path::Path;

/// Represents a trainable policy driven by an environment-interaction loop.
///
/// The loop calls [`Agent::act`] and [`Agent::update`] strictly alternately:
/// `act` on the current observation, then `update` with the transition the
/// chosen action produced. No two calls on the same agent may interleave.
pub trait Agent {
    /// Returns an action in `[0, act_dim)` for the given observation.
    ///
    /// Recurrent agents advance their hidden state as a side effect.
    fn act(&mut self, obs: &ArrayD<f32>) -> Result<i64>;

    /// Consumes the transition produced by the last action.
    ///
    /// Returns a [`Record`] describing the optimization step if one ran.
    fn update(&mut self, info: UpdateInfo) -> Result<Option<Record>>;

    /// Set the agent to training mode.
    fn train(&mut self);

    /// Set the agent to evaluation mode.
    fn eval(&mut self);

    /// Return if it is in training mode.
    fn is_train(&self) -> bool;

    /// Save the parameters of the agent in the given directory.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Load the parameters of the agent from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
