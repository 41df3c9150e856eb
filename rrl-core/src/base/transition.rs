//! Per-step records exchanged between the interaction loop, agents and buffers.
use ndarray::ArrayD;

/// Raw information of one environment step, handed to [`Agent::update`].
///
/// [`Agent::update`]: crate::Agent::update
#[derive(Clone, Debug)]
pub struct UpdateInfo {
    /// Observation on which the action was taken.
    pub observation: ArrayD<f32>,

    /// Action taken.
    pub action: i64,

    /// Reward received after the action.
    pub reward: f32,

    /// If the episode terminated with this step.
    pub done: bool,

    /// Identifier of the acting agent.
    pub agent_id: Option<usize>,
}

impl UpdateInfo {
    /// Constructs an update info without agent id.
    pub fn new(observation: ArrayD<f32>, action: i64, reward: f32, done: bool) -> Self {
        Self {
            observation,
            action,
            reward,
            done,
            agent_id: None,
        }
    }

    /// Tags the step with an agent id.
    pub fn agent_id(mut self, id: usize) -> Self {
        self.agent_id = Some(id);
        self
    }
}

/// Recurrent state of a network, flattened from `[num_layers, 1, hidden_size]`.
#[derive(Clone, Debug, PartialEq)]
pub struct RecurrentSnapshot {
    /// Hidden state `h`.
    pub hidden: Vec<f32>,

    /// Cell state `c`.
    pub cell: Vec<f32>,
}

impl RecurrentSnapshot {
    /// Zero state with `n` elements per tensor.
    pub fn zeros(n: usize) -> Self {
        Self {
            hidden: vec![0f32; n],
            cell: vec![0f32; n],
        }
    }
}

/// Preprocessed transition as stored in a replay buffer.
///
/// `recurrent` holds the state that was active *before* the forward pass that
/// produced `action`. It is present only for agents persisting hidden states.
#[derive(Clone, Debug)]
pub struct Transition {
    /// Observation on which the action was taken.
    pub observation: ArrayD<f32>,

    /// Action taken.
    pub action: i64,

    /// Reward, possibly clipped.
    pub reward: f32,

    /// If the episode terminated with this step.
    pub done: bool,

    /// Identifier of the acting agent.
    pub agent_id: Option<usize>,

    /// Snapshot of the recurrent state that produced the action.
    pub recurrent: Option<RecurrentSnapshot>,
}

impl Transition {
    /// Builds a transition from raw step information.
    ///
    /// With `reward_clip = Some(c)` the reward is clipped into `[-c, c]`.
    /// A negative or NaN `c` clips nothing.
    pub fn from_update_info(info: UpdateInfo, reward_clip: Option<f32>) -> Self {
        let reward = match reward_clip {
            Some(c) if c >= 0.0 => info.reward.clamp(-c, c),
            _ => info.reward,
        };

        Self {
            observation: info.observation,
            action: info.action,
            reward,
            done: info.done,
            agent_id: info.agent_id,
            recurrent: None,
        }
    }

    /// Attaches a recurrent-state snapshot.
    pub fn with_recurrent(mut self, snapshot: RecurrentSnapshot) -> Self {
        self.recurrent = Some(snapshot);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn info(reward: f32) -> UpdateInfo {
        UpdateInfo::new(ArrayD::zeros(IxDyn(&[3])), 1, reward, false)
    }

    #[test]
    fn test_reward_clip() {
        for r in [-10.0f32, -1.5, -0.2, 0.0, 0.7, 3.0, 250.0] {
            let tr = Transition::from_update_info(info(r), Some(1.0));
            assert!(tr.reward >= -1.0 && tr.reward <= 1.0);
        }
        let tr = Transition::from_update_info(info(0.25), Some(1.0));
        assert_eq!(tr.reward, 0.25);
    }

    #[test]
    fn test_no_reward_clip() {
        let tr = Transition::from_update_info(info(250.0), None);
        assert_eq!(tr.reward, 250.0);
        assert!(tr.recurrent.is_none());
    }

    #[test]
    fn test_invalid_reward_clip_is_ignored() {
        for c in [-1.0f32, f32::NAN] {
            let tr = Transition::from_update_info(info(0.5), Some(c));
            assert_eq!(tr.reward, 0.5);
        }
    }

    #[test]
    fn test_agent_id_is_forwarded() {
        let tr = Transition::from_update_info(info(0.0).agent_id(3), None);
        assert_eq!(tr.agent_id, Some(3));
    }
}
