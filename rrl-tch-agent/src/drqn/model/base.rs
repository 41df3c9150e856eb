use super::DrqnModelConfig;
use crate::{
    model::{ModelBase, RecurrentSubModel},
    opt::{Optimizer, OptimizerConfig},
    util::{grad_abs_max, param_snapshot, NamedValues},
};
use anyhow::{anyhow, Result};
use log::{info, trace};
use rrl_core::error::RrlError;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tch::{
    nn,
    nn::{LSTMState, Module},
    Device, Kind, Tensor,
};

/// Recurrent action-value function of DRQN agents.
///
/// A representation network `Q` followed by a linear head with one output
/// per action. Target networks are created with [`DrqnModel::clone_frozen`]
/// and have no optimizer.
pub struct DrqnModel<Q>
where
    Q: RecurrentSubModel,
    Q::Config: DeserializeOwned + Serialize + Clone,
{
    device: Device,
    var_store: nn::VarStore,

    // Number of actions.
    act_dim: i64,

    // Output dimension of the representation network.
    feature_dim: i64,

    q: Q,
    head: nn::Linear,

    // None for target networks
    opt: Option<Optimizer>,
    opt_config: OptimizerConfig,
}

impl<Q> DrqnModel<Q>
where
    Q: RecurrentSubModel,
    Q::Config: DeserializeOwned + Serialize + Clone,
{
    /// Constructs the model with `act_dim` outputs.
    pub fn build(config: DrqnModelConfig<Q::Config>, act_dim: i64, device: Device) -> Result<Self> {
        let q_config = config
            .q_config
            .ok_or_else(|| RrlError::InvalidConfig("q_config is not set".to_string()))?;
        let var_store = nn::VarStore::new(device);
        let q = Q::build(&var_store, q_config);
        let feature_dim = Self::probe_feature_dim(&q, device)?;
        let head = Self::create_head(&var_store, feature_dim, act_dim);

        config.init_fn.apply(&var_store)?;
        let opt = config.opt_config.build(&var_store)?;
        info!(
            "Build DRQN model: feature_dim = {}, act_dim = {}, init = {:?}",
            feature_dim, act_dim, config.init_fn
        );

        Ok(Self {
            device,
            var_store,
            act_dim,
            feature_dim,
            q,
            head,
            opt: Some(opt),
            opt_config: config.opt_config,
        })
    }

    /// Runs the representation network on a dummy step to find its output size.
    fn probe_feature_dim(q: &Q, device: Device) -> Result<i64> {
        let ys = tch::no_grad(|| {
            let xs = Tensor::zeros(&[1, 1, q.in_dim()], (Kind::Float, device));
            q.forward(&xs, &q.init_hidden(1)).0
        });
        ys.size()
            .last()
            .copied()
            .ok_or_else(|| anyhow!("Representation network returned a scalar"))
    }

    fn create_head(var_store: &nn::VarStore, feature_dim: i64, act_dim: i64) -> nn::Linear {
        nn::linear(
            var_store.root() / "q_head",
            feature_dim,
            act_dim,
            Default::default(),
        )
    }

    /// Returns a copy of the model whose parameters do not require gradients.
    pub fn clone_frozen(&self) -> Result<Self> {
        let mut var_store = nn::VarStore::new(self.device);
        let q = self.q.clone_with_var_store(&var_store);
        let head = Self::create_head(&var_store, self.feature_dim, self.act_dim);
        var_store.copy(&self.var_store)?;
        var_store.freeze();

        Ok(Self {
            device: self.device,
            var_store,
            act_dim: self.act_dim,
            feature_dim: self.feature_dim,
            q,
            head,
            opt: None,
            opt_config: self.opt_config.clone(),
        })
    }

    /// Outputs action values `[batch, seq, act_dim]` for observation
    /// sequences `[batch, seq, ..]`, with the state after the last step.
    pub fn forward(&self, xs: &Tensor, state: &LSTMState) -> (Tensor, LSTMState) {
        let (features, state) = self.features(xs, state);
        (self.action_values(&features), state)
    }

    /// Output of the representation network, `[batch, seq, feature_dim]`.
    pub fn features(&self, xs: &Tensor, state: &LSTMState) -> (Tensor, LSTMState) {
        self.q.forward(xs, state)
    }

    /// Applies the head to the output of [`DrqnModel::features`].
    pub fn action_values(&self, features: &Tensor) -> Tensor {
        let q = self.head.forward(features);
        debug_assert_eq!(q.size().last(), Some(&self.act_dim));
        q
    }

    /// Zero state for `batch_size` sequences.
    pub fn init_hidden(&self, batch_size: i64) -> LSTMState {
        self.q.init_hidden(batch_size)
    }

    /// Flattened size of a single observation the model accepts.
    pub fn in_dim(&self) -> i64 {
        self.q.in_dim()
    }

    /// Number of layers of the recurrent core.
    pub fn num_layers(&self) -> i64 {
        self.q.num_layers()
    }

    /// Hidden size of the recurrent core.
    pub fn hidden_size(&self) -> i64 {
        self.q.hidden_size()
    }

    /// Zeroes gradients, backpropagates `loss`, clips gradients element-wise
    /// to `[-grad_clip, grad_clip]` if given, and steps the optimizer.
    ///
    /// Returns the maximum absolute gradient before clipping.
    pub fn backward_step(&mut self, loss: &Tensor, grad_clip: Option<f64>) -> Result<f32> {
        let opt = self
            .opt
            .as_mut()
            .ok_or_else(|| anyhow!("Frozen model cannot be optimized"))?;
        opt.zero_grad();
        loss.backward();
        let grad_max = grad_abs_max(&self.var_store)?;
        if let Some(max) = grad_clip {
            opt.clip_grad_value(max);
        }
        opt.step();
        trace!("backward step, grad_max = {}", grad_max);
        Ok(grad_max)
    }

    /// Returns the weights, biases and gradients of the model.
    pub fn param_snapshot(&self) -> Result<(NamedValues, NamedValues, NamedValues)> {
        param_snapshot(&self.var_store)
    }
}

impl<Q> ModelBase for DrqnModel<Q>
where
    Q: RecurrentSubModel,
    Q::Config: DeserializeOwned + Serialize + Clone,
{
    fn get_var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.var_store
    }

    fn get_var_store(&self) -> &nn::VarStore {
        &self.var_store
    }

    fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.var_store.save(&path)?;
        info!("Save DRQN model to {:?}", path.as_ref());
        let vs = self.var_store.variables();
        for (name, _) in vs.iter() {
            trace!("Save variable {}", name);
        }
        Ok(())
    }

    fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.var_store.load(&path)?;
        info!("Load DRQN model from {:?}", path.as_ref());
        Ok(())
    }
}
