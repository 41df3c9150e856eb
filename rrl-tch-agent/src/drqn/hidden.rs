//! Handling of the hidden state of the recurrent core.
use super::DrqnModel;
use crate::{
    model::RecurrentSubModel,
    util::{arrayd_to_tensor, tensor_to_vec},
};
use anyhow::Result;
use ndarray::Array3;
use rrl_core::{error::RrlError, replay_buffer::SequenceBatch, RecurrentSnapshot, Transition};
use serde::{de::DeserializeOwned, Serialize};
use tch::{nn::LSTMState, Device, Tensor};

/// How hidden states are stored with transitions and recovered at training time.
///
/// Both strategies carry the live hidden state across the steps of an episode
/// and reset it at episode boundaries. They differ in the state sampled
/// sequences are replayed from.
#[derive(Debug, Clone, PartialEq)]
pub enum HiddenStateStrategy {
    /// Sequences are replayed from zero states, for both the online and the
    /// target network.
    ///
    /// The zero state generally differs from the state the sequence was
    /// acted from, unless the sequence starts an episode.
    Bootstrap,

    /// The state before each action is stored with its transition, and
    /// sequences are replayed from the state stored with their first step.
    Persist {
        /// State before the last forward pass of [`Drqn::act`](super::Drqn).
        prev: Option<RecurrentSnapshot>,
    },
}

impl HiddenStateStrategy {
    /// Constructs the strategy.
    pub fn new(persist_hidden_state: bool) -> Self {
        match persist_hidden_state {
            true => Self::Persist { prev: None },
            false => Self::Bootstrap,
        }
    }

    /// Returns `true` if hidden states are stored with transitions.
    pub fn is_persisting(&self) -> bool {
        matches!(self, Self::Persist { .. })
    }

    /// Shape `[num_layers, hidden_size]` of stored snapshots, if any.
    pub fn recurrent_state_shape(&self, num_layers: i64, hidden_size: i64) -> Option<[usize; 2]> {
        match self {
            Self::Bootstrap => None,
            Self::Persist { .. } => Some([num_layers as usize, hidden_size as usize]),
        }
    }

    /// Called with the live state right before it is consumed by a forward pass.
    pub fn before_forward(&mut self, live: &LSTMState) -> Result<()> {
        if let Self::Persist { prev } = self {
            *prev = Some(snapshot(live)?);
        }
        Ok(())
    }

    /// Attaches the snapshot taken before the last action to `tr`.
    pub fn attach(&mut self, tr: Transition) -> Result<Transition> {
        match self {
            Self::Bootstrap => Ok(tr),
            Self::Persist { prev } => match prev.take() {
                Some(s) => Ok(tr.with_recurrent(s)),
                None => Err(RrlError::MissingRecurrentState.into()),
            },
        }
    }

    /// Returns the states the online and the target network start the sampled
    /// sequences from.
    ///
    /// With [`HiddenStateStrategy::Persist`], the target network starts from the
    /// snapshot stored with the second step of each sequence, or zeros if the
    /// first step ends an episode.
    pub fn training_states<Q>(
        &self,
        batch: &SequenceBatch,
        qnet: &DrqnModel<Q>,
        device: Device,
    ) -> Result<(LSTMState, LSTMState)>
    where
        Q: RecurrentSubModel,
        Q::Config: DeserializeOwned + Serialize + Clone,
    {
        match self {
            Self::Bootstrap => {
                let batch_size = batch.batch_size() as i64;
                Ok((qnet.init_hidden(batch_size), qnet.init_hidden(batch_size)))
            }
            Self::Persist { .. } => {
                let r = batch
                    .recurrent
                    .as_ref()
                    .ok_or(RrlError::MissingRecurrentState)?;
                Ok((
                    batch_state(&r.hidden_state, &r.cell_state, device)?,
                    batch_state(&r.next_hidden_state, &r.next_cell_state, device)?,
                ))
            }
        }
    }
}

/// Copies a state of batch size one.
pub(super) fn snapshot(state: &LSTMState) -> Result<RecurrentSnapshot> {
    Ok(RecurrentSnapshot {
        hidden: tensor_to_vec(&state.h())?,
        cell: tensor_to_vec(&state.c())?,
    })
}

/// Converts `[batch, num_layers, hidden_size]` arrays to an [`LSTMState`].
fn batch_state(h: &Array3<f32>, c: &Array3<f32>, device: Device) -> Result<LSTMState> {
    let to_state = |a: &Array3<f32>| -> Result<Tensor> {
        Ok(arrayd_to_tensor::<f32, f32, _>(a, false)?
            .permute(&[1, 0, 2])
            .contiguous()
            .to(device))
    };
    Ok(LSTMState((to_state(h)?, to_state(c)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};
    use rrl_core::UpdateInfo;
    use tch::Kind;

    fn transition() -> Transition {
        let obs = ArrayD::zeros(IxDyn(&[2]));
        Transition::from_update_info(UpdateInfo::new(obs, 0, 0.0, false), None)
    }

    #[test]
    fn test_bootstrap_attaches_nothing() -> Result<()> {
        let mut strategy = HiddenStateStrategy::new(false);
        let live = LSTMState((
            Tensor::ones(&[1, 1, 3], (Kind::Float, Device::Cpu)),
            Tensor::ones(&[1, 1, 3], (Kind::Float, Device::Cpu)),
        ));
        strategy.before_forward(&live)?;
        assert!(strategy.attach(transition())?.recurrent.is_none());
        assert_eq!(strategy.recurrent_state_shape(1, 3), None);
        Ok(())
    }

    #[test]
    fn test_persist_attaches_each_snapshot_once() -> Result<()> {
        let mut strategy = HiddenStateStrategy::new(true);
        let h = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0]).reshape(&[2, 1, 2]);
        let live = LSTMState((h.shallow_clone(), -h));
        strategy.before_forward(&live)?;

        let tr = strategy.attach(transition())?;
        let s = tr.recurrent.unwrap();
        assert_eq!(s.hidden, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.cell, vec![-1.0, -2.0, -3.0, -4.0]);
        assert!(strategy.attach(transition()).is_err());
        assert_eq!(strategy.recurrent_state_shape(2, 2), Some([2, 2]));
        Ok(())
    }

    #[test]
    fn test_batch_state_layout() -> Result<()> {
        // [batch = 2, layers = 3, hidden = 1]
        let a = Array3::from_shape_vec((2, 3, 1), vec![0., 1., 2., 10., 11., 12.])?;
        let state = batch_state(&a, &a, Device::Cpu)?;
        assert_eq!(state.h().size(), vec![3, 2, 1]);
        assert_eq!(state.h().double_value(&[2, 1, 0]), 12.0);
        Ok(())
    }
}
