//! Ring storage of transitions with sequence sampling.
use super::{RecurrentBatch, SequenceBatch, SequenceReplayBufferConfig};
use crate::{error::RrlError, ReplayBufferBase, Transition};
use anyhow::Result;
use log::{info, trace};
use ndarray::{Array2, Array3, ArrayD, IxDyn};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Replay buffer sampling `max_seq_len`-long sequences of transitions.
///
/// Transitions are kept in chronological order in a ring of `capacity`
/// slots. A sequence starting at position `p` covers `p..p + max_seq_len`; steps
/// after an episode end inside the window are padding. A start position is
/// ready once every step of its window, and the next observation of every
/// non-terminal step, is stored. Since only the trailing steps of an unfinished
/// episode can be unready, the ready positions are always the chronological
/// prefix `0..num_sequences()`.
pub struct SequenceReplayBuffer {
    capacity: usize,
    max_seq_len: usize,
    obs_shape: Vec<usize>,
    obs_len: usize,
    state_shape: Option<[usize; 2]>,
    state_len: usize,

    observation: Vec<f32>,
    action: Vec<i64>,
    reward: Vec<f32>,
    done: Vec<bool>,
    agent_id: Vec<i64>,
    hidden: Vec<f32>,
    cell: Vec<f32>,

    /// Slot written by the next `add`.
    i: usize,

    /// Number of stored transitions.
    size: usize,

    /// Number of stored transitions since the last episode end.
    open_tail: usize,

    rng: StdRng,
}

impl SequenceReplayBuffer {
    /// Slot of the chronological position `p`.
    #[inline]
    fn slot(&self, p: usize) -> usize {
        (self.i + self.capacity - self.size + p) % self.capacity
    }

    fn validate(&self, tr: &Transition) -> Result<()> {
        if tr.observation.shape() != self.obs_shape.as_slice() {
            return Err(RrlError::ObservationShape {
                expected: self.obs_shape.clone(),
                actual: tr.observation.shape().to_vec(),
            }
            .into());
        }
        match (&self.state_shape, &tr.recurrent) {
            (Some(_), None) => Err(RrlError::MissingRecurrentState.into()),
            (None, Some(_)) => Err(RrlError::UnexpectedRecurrentState.into()),
            (Some(_), Some(s)) => {
                for n in [s.hidden.len(), s.cell.len()] {
                    if n != self.state_len {
                        return Err(RrlError::RecurrentStateShape {
                            expected: self.state_len,
                            actual: n,
                        }
                        .into());
                    }
                }
                Ok(())
            }
            (None, None) => Ok(()),
        }
    }

    fn copy_obs(&self, slot: usize, dst: &mut [f32]) {
        let o = slot * self.obs_len;
        dst.copy_from_slice(&self.observation[o..o + self.obs_len]);
    }

    fn copy_state(&self, src: &[f32], slot: Option<usize>, dst: &mut [f32]) {
        match slot {
            Some(slot) => {
                let o = slot * self.state_len;
                dst.copy_from_slice(&src[o..o + self.state_len]);
            }
            None => dst.iter_mut().for_each(|v| *v = 0.0),
        }
    }

    /// Returns `true` if recurrent states are stored.
    pub fn stores_recurrent_state(&self) -> bool {
        self.state_shape.is_some()
    }
}

impl ReplayBufferBase for SequenceReplayBuffer {
    type Config = SequenceReplayBufferConfig;
    type Item = Transition;
    type Batch = SequenceBatch;

    fn build(config: &Self::Config) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity;
        let obs_len = config.obs_shape.iter().product::<usize>();
        let state_len = config
            .recurrent_state_shape
            .map_or(0, |[layers, hidden]| layers * hidden);
        info!(
            "Construct sequence replay buffer with capacity = {}, max_seq_len = {}",
            capacity, config.max_seq_len
        );

        Ok(Self {
            capacity,
            max_seq_len: config.max_seq_len,
            obs_shape: config.obs_shape.clone(),
            obs_len,
            state_shape: config.recurrent_state_shape,
            state_len,
            observation: vec![0f32; capacity * obs_len],
            action: vec![0; capacity],
            reward: vec![0f32; capacity],
            done: vec![false; capacity],
            agent_id: vec![-1; capacity],
            hidden: vec![0f32; capacity * state_len],
            cell: vec![0f32; capacity * state_len],
            i: 0,
            size: 0,
            open_tail: 0,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    fn add(&mut self, tr: Transition) -> Result<()> {
        self.validate(&tr)?;
        let i = self.i;

        let o = i * self.obs_len;
        for (dst, src) in self.observation[o..o + self.obs_len]
            .iter_mut()
            .zip(tr.observation.iter())
        {
            *dst = *src;
        }
        self.action[i] = tr.action;
        self.reward[i] = tr.reward;
        self.done[i] = tr.done;
        self.agent_id[i] = tr.agent_id.map_or(-1, |id| id as i64);
        if let Some(s) = &tr.recurrent {
            let o = i * self.state_len;
            self.hidden[o..o + self.state_len].copy_from_slice(&s.hidden);
            self.cell[o..o + self.state_len].copy_from_slice(&s.cell);
        }

        self.i = (self.i + 1) % self.capacity;
        self.size = (self.size + 1).min(self.capacity);
        self.open_tail = if tr.done { 0 } else { self.open_tail + 1 };
        trace!("SequenceReplayBuffer::add(), size = {}", self.size);
        Ok(())
    }

    fn sample(&mut self, batch_size: usize) -> Result<SequenceBatch> {
        let n_ready = self.num_sequences();
        if n_ready == 0 {
            return Err(RrlError::NotEnoughTransitions(self.max_seq_len).into());
        }

        let (b, l, ol, sl) = (batch_size, self.max_seq_len, self.obs_len, self.state_len);
        let mut observation = vec![0f32; b * l * ol];
        let mut next_observation = vec![0f32; b * l * ol];
        let mut action = vec![0i64; b * l];
        let mut reward = vec![0f32; b * l];
        let mut done = vec![1f32; b * l];
        let mut mask = vec![0f32; b * l];
        let mut agent_id = vec![-1i64; b * l];
        let mut states = [
            vec![0f32; b * sl],
            vec![0f32; b * sl],
            vec![0f32; b * sl],
            vec![0f32; b * sl],
        ];

        for ib in 0..b {
            let p = self.rng.gen_range(0..n_ready);

            if self.stores_recurrent_state() {
                let first = self.slot(p);
                let second = match self.done[first] {
                    true => None,
                    false => Some(self.slot(p + 1)),
                };
                let r = ib * sl..(ib + 1) * sl;
                self.copy_state(&self.hidden, Some(first), &mut states[0][r.clone()]);
                self.copy_state(&self.cell, Some(first), &mut states[1][r.clone()]);
                self.copy_state(&self.hidden, second, &mut states[2][r.clone()]);
                self.copy_state(&self.cell, second, &mut states[3][r]);
            }

            for t in 0..l {
                let j = ib * l + t;
                let slot = self.slot(p + t);
                self.copy_obs(slot, &mut observation[j * ol..(j + 1) * ol]);
                if !self.done[slot] {
                    let next = self.slot(p + t + 1);
                    self.copy_obs(next, &mut next_observation[j * ol..(j + 1) * ol]);
                }
                action[j] = self.action[slot];
                reward[j] = self.reward[slot];
                done[j] = if self.done[slot] { 1.0 } else { 0.0 };
                mask[j] = 1.0;
                agent_id[j] = self.agent_id[slot];

                if self.done[slot] {
                    break;
                }
            }
        }

        let mut shape = vec![b, l];
        shape.extend_from_slice(&self.obs_shape);
        let recurrent = match self.state_shape {
            None => None,
            Some([layers, hidden]) => {
                let [h, c, nh, nc] = states;
                let to3 = |v| Array3::from_shape_vec((b, layers, hidden), v);
                Some(RecurrentBatch {
                    hidden_state: to3(h)?,
                    cell_state: to3(c)?,
                    next_hidden_state: to3(nh)?,
                    next_cell_state: to3(nc)?,
                })
            }
        };

        Ok(SequenceBatch {
            observation: ArrayD::from_shape_vec(IxDyn(&shape), observation)?,
            next_observation: ArrayD::from_shape_vec(IxDyn(&shape), next_observation)?,
            action: Array2::from_shape_vec((b, l), action)?,
            reward: Array2::from_shape_vec((b, l), reward)?,
            done: Array2::from_shape_vec((b, l), done)?,
            mask: Array2::from_shape_vec((b, l), mask)?,
            agent_id: Array2::from_shape_vec((b, l), agent_id)?,
            recurrent,
        })
    }

    fn size(&self) -> usize {
        self.size
    }

    fn num_sequences(&self) -> usize {
        let unready = self.open_tail.min(self.max_seq_len).min(self.size);
        self.size - unready
    }

    fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }
}
