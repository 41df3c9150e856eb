//! Configuration of DRQN agent.
use super::DrqnModelConfig;
use crate::{util::CriticLoss, Device};
use anyhow::Result;
use log::info;
use rrl_core::{replay_buffer::SequenceReplayBufferConfig, schedule::ScheduleConfig};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    default::Default,
    fmt::Debug,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Constructs [`Drqn`](super::Drqn).
///
/// `Q` is the configuration of the recurrent representation network.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(bound(deserialize = "Q: DeserializeOwned"))]
pub struct DrqnConfig<Q>
where
    Q: DeserializeOwned + Serialize + Debug + PartialEq + Clone,
{
    pub(super) model_config: DrqnModelConfig<Q>,
    pub(super) replay_buffer_config: SequenceReplayBufferConfig,
    pub(super) obs_shape: Vec<usize>,
    pub(super) act_dim: i64,
    pub(super) discount_rate: f64,
    pub(super) grad_clip: Option<f64>,
    pub(super) reward_clip: Option<f32>,
    pub(super) update_period_schedule: ScheduleConfig<bool>,
    pub(super) target_net_soft_update: bool,
    pub(super) target_net_update_fraction: f64,
    pub(super) target_net_update_schedule: ScheduleConfig<bool>,
    pub(super) epsilon_schedule: ScheduleConfig<f64>,
    pub(super) test_epsilon: f64,
    pub(super) min_replay_history: usize,
    pub(super) batch_size: usize,
    pub(super) persist_hidden_state: bool,
    #[serde(default)]
    pub(super) critic_loss: CriticLoss,
    pub(super) log_frequency: usize,
    #[serde(default)]
    pub(super) inspect_period: Option<usize>,
    pub(super) id: usize,
    pub(super) seed: u64,
    pub device: Device,
    pub(super) train: bool,
}

impl<Q> Default for DrqnConfig<Q>
where
    Q: DeserializeOwned + Serialize + Debug + PartialEq + Clone,
{
    /// Constructs DRQN config with default parameters.
    fn default() -> Self {
        Self {
            model_config: Default::default(),
            replay_buffer_config: Default::default(),
            obs_shape: vec![1],
            act_dim: 1,
            discount_rate: 0.99,
            grad_clip: None,
            reward_clip: None,
            update_period_schedule: ScheduleConfig::every(1),
            target_net_soft_update: false,
            target_net_update_fraction: 0.05,
            target_net_update_schedule: ScheduleConfig::every(10000),
            epsilon_schedule: ScheduleConfig::Linear {
                init_value: 1.0,
                end_value: 0.1,
                steps: 100000,
            },
            test_epsilon: 0.001,
            min_replay_history: 5000,
            batch_size: 32,
            persist_hidden_state: false,
            critic_loss: CriticLoss::SmoothL1,
            log_frequency: 100,
            inspect_period: None,
            id: 0,
            seed: 42,
            device: Device::Cpu,
            train: true,
        }
    }
}

impl<Q> DrqnConfig<Q>
where
    Q: DeserializeOwned + Serialize + Debug + PartialEq + Clone,
{
    /// Sets the configuration of the model.
    pub fn model_config(mut self, v: DrqnModelConfig<Q>) -> Self {
        self.model_config = v;
        self
    }

    /// Sets the configuration of the replay buffer.
    ///
    /// Its observation shape and recurrent state shape are overwritten
    /// by the agent.
    pub fn replay_buffer_config(mut self, v: SequenceReplayBufferConfig) -> Self {
        self.replay_buffer_config = v;
        self
    }

    /// Shape of observations.
    pub fn obs_shape(mut self, v: Vec<usize>) -> Self {
        self.obs_shape = v;
        self
    }

    /// Number of actions.
    pub fn act_dim(mut self, v: i64) -> Self {
        self.act_dim = v;
        self
    }

    /// Discount factor of rewards.
    pub fn discount_rate(mut self, v: f64) -> Self {
        self.discount_rate = v;
        self
    }

    /// Element-wise gradient clipping.
    pub fn grad_clip(mut self, v: Option<f64>) -> Self {
        self.grad_clip = v;
        self
    }

    /// Reward clipping.
    pub fn reward_clip(mut self, v: Option<f32>) -> Self {
        self.reward_clip = v;
        self
    }

    /// Schedule deciding at which steps a training step runs.
    pub fn update_period_schedule(mut self, v: ScheduleConfig<bool>) -> Self {
        self.update_period_schedule = v;
        self
    }

    /// Uses soft updates of the target network instead of copies.
    pub fn target_net_soft_update(mut self, v: bool) -> Self {
        self.target_net_soft_update = v;
        self
    }

    /// Mixing fraction of soft updates.
    pub fn target_net_update_fraction(mut self, v: f64) -> Self {
        self.target_net_update_fraction = v;
        self
    }

    /// Schedule deciding at which steps the target network is synchronized.
    pub fn target_net_update_schedule(mut self, v: ScheduleConfig<bool>) -> Self {
        self.target_net_update_schedule = v;
        self
    }

    /// Exploration rate in training mode after learning has started.
    pub fn epsilon_schedule(mut self, v: ScheduleConfig<f64>) -> Self {
        self.epsilon_schedule = v;
        self
    }

    /// Exploration rate in evaluation mode.
    pub fn test_epsilon(mut self, v: f64) -> Self {
        self.test_epsilon = v;
        self
    }

    /// Number of stored transitions before learning starts.
    pub fn min_replay_history(mut self, v: usize) -> Self {
        self.min_replay_history = v;
        self
    }

    /// Batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Stores hidden states with transitions and replays them at training time.
    pub fn persist_hidden_state(mut self, v: bool) -> Self {
        self.persist_hidden_state = v;
        self
    }

    /// Loss function of the critic.
    pub fn critic_loss(mut self, v: CriticLoss) -> Self {
        self.critic_loss = v;
        self
    }

    /// Logging period in agent steps.
    pub fn log_frequency(mut self, v: usize) -> Self {
        self.log_frequency = v;
        self
    }

    /// Period of training inspections in training steps.
    pub fn inspect_period(mut self, v: Option<usize>) -> Self {
        self.inspect_period = v;
        self
    }

    /// Identifier of the agent, used as its logging timescale.
    pub fn id(mut self, v: usize) -> Self {
        self.id = v;
        self
    }

    /// Seed of random number generators.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Device.
    pub fn device(mut self, device: tch::Device) -> Self {
        self.device = device.into();
        self
    }

    /// Whether the agent starts in training mode.
    pub fn train(mut self, v: bool) -> Self {
        self.train = v;
        self
    }

    /// Loads [`DrqnConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of DRQN agent from {}", path_.display());
        Ok(b)
    }

    /// Saves [`DrqnConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of DRQN agent into {}", path_.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lstm::LstmEncoderConfig,
        opt::OptimizerConfig,
    };
    use tempdir::TempDir;

    #[test]
    fn test_serde_drqn_config() -> Result<()> {
        let model_config = DrqnModelConfig::default()
            .q_config(LstmEncoderConfig::new(4, vec![], 32, 1))
            .opt_config(OptimizerConfig::Adam { lr: 0.0001 });
        let config = DrqnConfig::<LstmEncoderConfig>::default()
            .model_config(model_config)
            .obs_shape(vec![4])
            .act_dim(2)
            .persist_hidden_state(true)
            .grad_clip(Some(10.0))
            .target_net_update_schedule(ScheduleConfig::every(500))
            .device(tch::Device::Cpu);

        let dir = TempDir::new("drqn_config")?;
        let path = dir.path().join("drqn_config.yaml");
        config.save(&path)?;
        let config_ = DrqnConfig::<LstmEncoderConfig>::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
