//! Optimizer of the online Q-network.
use anyhow::Result;
use log::trace;
use serde::{Deserialize, Serialize};
use tch::nn::{self, OptimizerConfig as _, VarStore};

fn default_beta1() -> f64 {
    0.9
}

fn default_beta2() -> f64 {
    0.999
}

fn default_wd() -> f64 {
    0.01
}

fn default_eps() -> f64 {
    1e-8
}

/// Optimizer settings, part of [`DrqnModelConfig`](crate::drqn::DrqnModelConfig).
///
/// Omitted AdamW coefficients take the values of [`tch::nn::AdamW::default`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    Adam { lr: f64 },

    AdamW {
        lr: f64,
        #[serde(default = "default_beta1")]
        beta1: f64,
        #[serde(default = "default_beta2")]
        beta2: f64,
        #[serde(default = "default_wd")]
        wd: f64,
        #[serde(default = "default_eps")]
        eps: f64,
        #[serde(default)]
        amsgrad: bool,
    },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam { lr: 0.001 }
    }
}

impl OptimizerConfig {
    /// Learning rate.
    pub fn lr(&self) -> f64 {
        match self {
            Self::Adam { lr } | Self::AdamW { lr, .. } => *lr,
        }
    }

    /// Builds the optimizer over the trainable variables of `vs`.
    pub fn build(&self, vs: &VarStore) -> Result<Optimizer> {
        let inner = match *self {
            Self::Adam { lr } => nn::Adam::default().build(vs, lr)?,
            Self::AdamW {
                lr,
                beta1,
                beta2,
                wd,
                eps,
                amsgrad,
            } => nn::AdamW {
                beta1,
                beta2,
                wd,
                eps,
                amsgrad,
            }
            .build(vs, lr)?,
        };
        trace!("Build optimizer {:?}", self);
        Ok(Optimizer { inner })
    }
}

/// Optimizer owned by a trainable [`DrqnModel`](crate::drqn::DrqnModel).
///
/// Gradient clipping happens between backpropagation and the update, so the
/// three phases are exposed separately.
pub struct Optimizer {
    inner: nn::Optimizer,
}

impl Optimizer {
    pub fn zero_grad(&mut self) {
        self.inner.zero_grad();
    }

    /// Clips gradients element-wise to `[-max, max]`.
    pub fn clip_grad_value(&mut self, max: f64) {
        self.inner.clip_grad_value(max);
    }

    pub fn step(&mut self) {
        self.inner.step();
    }
}
