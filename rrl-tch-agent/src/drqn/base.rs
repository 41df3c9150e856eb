//! DRQN agent implemented with tch-rs.
use super::{config::DrqnConfig, hidden::HiddenStateStrategy, model::DrqnModel};
use crate::{
    model::{ModelBase, RecurrentSubModel},
    util::{arrayd_to_tensor, tensor_to_vec, track, CriticLoss},
};
use anyhow::Result;
use log::{debug, info, trace, warn};
use ndarray::ArrayD;
use rrl_core::{
    error::RrlError,
    inspect::{Inspector, NullInspector, TrainingSnapshot},
    logger::{Logger, NullLogger},
    record::{Record, RecordValue},
    replay_buffer::{SequenceBatch, SequenceReplayBuffer},
    schedule::{PeriodicSchedule, Schedule, SwitchSchedule},
    Agent, ReplayBufferBase, Transition, UpdateInfo,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{convert::TryFrom, fmt::Debug, fs, path::Path};
use tch::{nn::LSTMState, Device, Kind, Tensor};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Deep recurrent Q-network agent.
///
/// The agent owns the online and target networks, the replay buffer and the
/// hidden state of the online network for the episode being played.
///
/// The environment-interaction loop calls [`Agent::act`] and
/// [`Agent::update`] alternately:
///
/// ```mermaid
/// graph LR
///     A[act] -->|hidden state advances| B[environment]
///     B --> C[update]
///     C -->|transition| D[SequenceReplayBuffer]
///     D -->|sequences| E[training step]
///     E -->|schedule| F[target sync]
///     C --> A
/// ```
///
/// 1. `act` selects an epsilon-greedy action. In training mode, epsilon is 1
///    until `min_replay_history` transitions have been seen, then follows
///    the epsilon schedule. In evaluation mode it is `test_epsilon`.
///    The forward pass runs without gradient tracking and always updates
///    the hidden state.
/// 2. `update` resets the hidden state at the end of an episode. In training
///    mode it stores the transition, then runs a training step if learning
///    has started, the buffer holds a complete sequence and the update period
///    schedule fires. The target network is synchronized whenever its
///    schedule fires, whether or not a training step ran.
///
/// How sampled sequences recover hidden states is decided by the
/// [`HiddenStateStrategy`].
pub struct Drqn<Q>
where
    Q: RecurrentSubModel,
    Q::Config: DeserializeOwned + Serialize + Debug + PartialEq + Clone,
{
    qnet: DrqnModel<Q>,
    qnet_tgt: DrqnModel<Q>,
    replay_buffer: SequenceReplayBuffer,
    hidden: LSTMState,
    strategy: HiddenStateStrategy,

    obs_shape: Vec<usize>,
    act_dim: i64,
    batch_size: usize,
    discount_rate: f64,
    grad_clip: Option<f64>,
    reward_clip: Option<f32>,
    critic_loss: CriticLoss,

    learn_schedule: Box<dyn Schedule<bool>>,
    epsilon_schedule: Box<dyn Schedule<f64>>,
    update_period_schedule: Box<dyn Schedule<bool>>,
    target_net_update_schedule: Box<dyn Schedule<bool>>,
    target_net_soft_update: bool,
    target_net_update_fraction: f64,
    test_epsilon: f64,

    logger: Box<dyn Logger>,
    log_frequency: usize,
    timescale: String,
    inspector: Box<dyn Inspector>,
    inspect_period: Option<usize>,

    train: bool,
    episode_start: bool,
    n_updates: usize,
    rng: fastrand::Rng,
    device: Device,
}

impl<Q> Drqn<Q>
where
    Q: RecurrentSubModel,
    Q::Config: DeserializeOwned + Serialize + Debug + PartialEq + Clone,
{
    /// Constructs DRQN agent.
    pub fn build(config: DrqnConfig<Q::Config>) -> Result<Self> {
        if config.act_dim <= 0 {
            return Err(RrlError::InvalidConfig("act_dim must be positive".to_string()).into());
        }
        if config.batch_size == 0 {
            return Err(RrlError::InvalidConfig("batch_size must be positive".to_string()).into());
        }
        Self::check_clips(&config)?;

        let device: Device = config.device.into();
        let qnet = DrqnModel::build(config.model_config, config.act_dim, device)?;
        let obs_dim = config.obs_shape.iter().product::<usize>() as i64;
        if obs_dim != qnet.in_dim() {
            return Err(RrlError::InvalidConfig(format!(
                "obs_shape {:?} has {} elements, the Q-network takes {}",
                config.obs_shape,
                obs_dim,
                qnet.in_dim()
            ))
            .into());
        }
        let qnet_tgt = qnet.clone_frozen()?;
        let strategy = HiddenStateStrategy::new(config.persist_hidden_state);

        let replay_buffer_config = config
            .replay_buffer_config
            .obs_shape(config.obs_shape.clone())
            .recurrent_state_shape(
                strategy.recurrent_state_shape(qnet.num_layers(), qnet.hidden_size()),
            );
        let replay_buffer = SequenceReplayBuffer::build(&replay_buffer_config)?;
        let hidden = qnet.init_hidden(1);

        let timescale = format!("agent_{}", config.id);
        let mut logger: Box<dyn Logger> = Box::new(NullLogger::new());
        logger.register_timescale(
            &timescale,
            Box::new(PeriodicSchedule::new(false, true, config.log_frequency)),
        );
        info!(
            "Build DRQN agent {}: act_dim = {}, persist_hidden_state = {}",
            config.id, config.act_dim, config.persist_hidden_state
        );

        Ok(Self {
            qnet,
            qnet_tgt,
            replay_buffer,
            hidden,
            strategy,
            obs_shape: config.obs_shape,
            act_dim: config.act_dim,
            batch_size: config.batch_size,
            discount_rate: config.discount_rate,
            grad_clip: config.grad_clip,
            reward_clip: config.reward_clip,
            critic_loss: config.critic_loss,
            learn_schedule: Box::new(SwitchSchedule::new(false, true, config.min_replay_history)),
            epsilon_schedule: config.epsilon_schedule.build()?,
            update_period_schedule: config.update_period_schedule.build()?,
            target_net_update_schedule: config.target_net_update_schedule.build()?,
            target_net_soft_update: config.target_net_soft_update,
            target_net_update_fraction: config.target_net_update_fraction,
            test_epsilon: config.test_epsilon,
            logger,
            log_frequency: config.log_frequency,
            timescale,
            inspector: Box::new(NullInspector),
            inspect_period: config.inspect_period,
            train: config.train,
            episode_start: true,
            n_updates: 0,
            rng: fastrand::Rng::with_seed(config.seed),
            device,
        })
    }

    /// Sets the logger, registering the timescale of the agent.
    pub fn with_logger(mut self, mut logger: Box<dyn Logger>) -> Self {
        logger.register_timescale(
            &self.timescale,
            Box::new(PeriodicSchedule::new(false, true, self.log_frequency)),
        );
        self.logger = logger;
        self
    }

    /// Sets the inspector run every `inspect_period` training steps.
    pub fn with_inspector(mut self, inspector: Box<dyn Inspector>) -> Self {
        self.inspector = inspector;
        self
    }

    /// Returns the online network.
    pub fn qnet(&self) -> &DrqnModel<Q> {
        &self.qnet
    }

    /// Returns the target network.
    pub fn qnet_tgt(&self) -> &DrqnModel<Q> {
        &self.qnet_tgt
    }

    /// Returns the replay buffer.
    pub fn replay_buffer(&self) -> &SequenceReplayBuffer {
        &self.replay_buffer
    }

    /// Returns the replay buffer as mutable reference.
    pub fn replay_buffer_mut(&mut self) -> &mut SequenceReplayBuffer {
        &mut self.replay_buffer
    }

    /// Returns the live hidden state of the online network.
    pub fn hidden_state(&self) -> &LSTMState {
        &self.hidden
    }

    /// Returns the number of training steps done.
    pub fn n_updates(&self) -> usize {
        self.n_updates
    }

    /// Converts an observation to a tensor `[1, 1, ..]`.
    fn obs_to_tensor(&self, obs: &ArrayD<f32>) -> Result<Tensor> {
        if obs.shape() != self.obs_shape.as_slice() {
            return Err(RrlError::ObservationShape {
                expected: self.obs_shape.clone(),
                actual: obs.shape().to_vec(),
            }
            .into());
        }
        Ok(arrayd_to_tensor::<f32, f32, _>(obs, true)?
            .unsqueeze(0)
            .to(self.device))
    }

    fn batch_to_tensors(&self, batch: &SequenceBatch) -> Result<[Tensor; 6]> {
        let d = self.device;
        Ok([
            arrayd_to_tensor::<f32, f32, _>(&batch.observation, false)?.to(d),
            arrayd_to_tensor::<f32, f32, _>(&batch.next_observation, false)?.to(d),
            arrayd_to_tensor::<i64, i64, _>(&batch.action, false)?.to(d),
            arrayd_to_tensor::<f32, f32, _>(&batch.reward, false)?.to(d),
            arrayd_to_tensor::<f32, f32, _>(&batch.done, false)?.to(d),
            arrayd_to_tensor::<f32, f32, _>(&batch.mask, false)?.to(d),
        ])
    }

    /// Samples a batch of sequences and applies a gradient step on the online network.
    fn train_step(&mut self) -> Result<Record> {
        let batch = self.replay_buffer.sample(self.batch_size)?;
        let (state, state_tgt) = self
            .strategy
            .training_states(&batch, &self.qnet, self.device)?;
        let [obs, next_obs, act, reward, done, mask] = self.batch_to_tensors(&batch)?;

        let (features, _) = self.qnet.features(&obs, &state);
        let pred = self
            .qnet
            .action_values(&features)
            .gather(-1, &act.unsqueeze(-1), false)
            .squeeze_dim(-1);

        let tgt = tch::no_grad(|| {
            let (q, _) = self.qnet_tgt.forward(&next_obs, &state_tgt);
            let (q_max, _) = q.max_dim(-1, false);
            &reward + self.discount_rate * q_max * (1.0 - &done)
        });

        let loss = (self.critic_loss.elementwise(&pred, &tgt) * &mask).mean(Kind::Float);
        let grad_max_abs = self.qnet.backward_step(&loss, self.grad_clip)?;
        self.n_updates += 1;

        let loss = f32::try_from(loss.detach())?;
        let (mean_pred_q, mean_target_q) = tch::no_grad(|| -> Result<(f32, f32)> {
            let n = mask.sum(Kind::Float);
            let mean_pred_q = f32::try_from((pred.detach() * &mask).sum(Kind::Float) / &n)?;
            let mean_target_q = f32::try_from((&tgt * &mask).sum(Kind::Float) / &n)?;
            Ok((mean_pred_q, mean_target_q))
        })?;
        debug!(
            "Training step {}: loss = {}, mean_pred_q = {}",
            self.n_updates, loss, mean_pred_q
        );

        if self.logger.should_log(&self.timescale) {
            self.logger.log_scalar("train_loss", loss, &self.timescale);
        }

        if let Some(period) = self.inspect_period {
            if period > 0 && self.n_updates % period == 0 {
                self.inspect(loss, &pred, &features)?;
            }
        }

        Ok(Record::from_slice(&[
            ("loss", RecordValue::Scalar(loss)),
            ("mean_pred_q", RecordValue::Scalar(mean_pred_q)),
            ("mean_target_q", RecordValue::Scalar(mean_target_q)),
            ("grad_max_abs", RecordValue::Scalar(grad_max_abs)),
        ]))
    }

    fn check_clips(config: &DrqnConfig<Q::Config>) -> Result<()> {
        if let Some(c) = config.reward_clip {
            if c.is_nan() || c < 0.0 {
                return Err(RrlError::InvalidConfig(format!("reward_clip = {}", c)).into());
            }
        }
        if let Some(c) = config.grad_clip {
            if c.is_nan() || c < 0.0 {
                return Err(RrlError::InvalidConfig(format!("grad_clip = {}", c)).into());
            }
        }
        let tau = config.target_net_update_fraction;
        if !(0.0..=1.0).contains(&tau) {
            return Err(RrlError::InvalidConfig(format!(
                "target_net_update_fraction = {} is not in [0, 1]",
                tau
            ))
            .into());
        }
        Ok(())
    }

    /// Runs the inspector on the current training step; findings are only logged.
    fn inspect(&mut self, loss: f32, pred: &Tensor, features: &Tensor) -> Result<()> {
        let (weights, biases, gradients) = self.qnet.param_snapshot()?;
        let snapshot = TrainingSnapshot {
            step: self.n_updates,
            loss,
            q_values: tensor_to_vec(pred)?,
            weights,
            biases,
            gradients,
            activations: vec![("features".to_string(), tensor_to_vec(features)?)],
        };
        for finding in self.inspector.inspect(&snapshot) {
            warn!(
                "Training step {}: {:?}: {}",
                self.n_updates, finding.kind, finding.message
            );
        }
        Ok(())
    }

    /// Synchronizes the target network with the online network.
    fn sync_target(&mut self) -> Result<()> {
        if self.target_net_soft_update {
            track(
                self.qnet_tgt.get_var_store(),
                self.qnet.get_var_store(),
                self.target_net_update_fraction,
            )?;
            debug!("Soft update of the target network");
        } else {
            self.qnet_tgt
                .get_var_store_mut()
                .copy(self.qnet.get_var_store())?;
            debug!("Hard update of the target network");
        }
        Ok(())
    }
}

impl<Q> Agent for Drqn<Q>
where
    Q: RecurrentSubModel,
    Q::Config: DeserializeOwned + Serialize + Debug + PartialEq + Clone,
{
    fn act(&mut self, obs: &ArrayD<f32>) -> Result<i64> {
        let obs = self.obs_to_tensor(obs)?;

        let epsilon = match self.train {
            true => {
                let epsilon = match self.learn_schedule.get_value() {
                    true => self.epsilon_schedule.update(),
                    false => 1.0,
                };
                if self.logger.update_step(&self.timescale) {
                    self.logger
                        .log_scalar("epsilon", epsilon as f32, &self.timescale);
                }
                epsilon
            }
            false => self.test_epsilon,
        };

        let _guard = tch::no_grad_guard();
        self.strategy.before_forward(&self.hidden)?;
        let (q, hidden) = self.qnet.forward(&obs, &self.hidden);
        self.hidden = hidden;

        let act = match self.rng.f64() < epsilon {
            true => self.rng.i64(0..self.act_dim),
            false => i64::try_from(q.flatten(0, -1).argmax(0, false))?,
        };

        if self.train && self.logger.should_log(&self.timescale) && self.episode_start {
            let qval = f32::try_from(q.max())?;
            self.logger.log_scalar("train_qval", qval, &self.timescale);
            self.episode_start = false;
        }
        trace!("act = {}, epsilon = {}", act, epsilon);

        Ok(act)
    }

    fn update(&mut self, info: UpdateInfo) -> Result<Option<Record>> {
        if info.done {
            self.episode_start = true;
            self.hidden = self.qnet.init_hidden(1);
        }

        if !self.train {
            return Ok(None);
        }

        let tr = Transition::from_update_info(info, self.reward_clip);
        self.replay_buffer.add(self.strategy.attach(tr)?)?;

        let record = if self.learn_schedule.update()
            && self.replay_buffer.num_sequences() > 0
            && self.update_period_schedule.update()
        {
            Some(self.train_step()?)
        } else {
            None
        };

        if self.target_net_update_schedule.update() {
            self.sync_target()?;
        }

        Ok(record)
    }

    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        self.qnet.save(path.join("qnet.pt"))?;
        self.qnet_tgt.save(path.join("qnet_tgt.pt"))?;
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.qnet.load(path.join("qnet.pt"))?;
        self.qnet_tgt.load(path.join("qnet_tgt.pt"))?;
        Ok(())
    }
}
