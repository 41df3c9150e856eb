//! Configuration of [`SequenceReplayBuffer`](super::SequenceReplayBuffer).
use crate::error::RrlError;
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`SequenceReplayBuffer`](super::SequenceReplayBuffer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SequenceReplayBufferConfig {
    /// Maximum number of stored transitions.
    pub capacity: usize,

    /// Length of sampled sequences.
    pub max_seq_len: usize,

    /// Shape of a single observation.
    pub obs_shape: Vec<usize>,

    /// `[num_layers, hidden_size]` of stored recurrent states, if any.
    #[serde(default)]
    pub recurrent_state_shape: Option<[usize; 2]>,

    /// Random seed used for sampling.
    pub seed: u64,
}

impl Default for SequenceReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10000,
            max_seq_len: 10,
            obs_shape: vec![1],
            recurrent_state_shape: None,
            seed: 42,
        }
    }
}

impl SequenceReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the length of sampled sequences.
    pub fn max_seq_len(mut self, max_seq_len: usize) -> Self {
        self.max_seq_len = max_seq_len;
        self
    }

    /// Sets the observation shape.
    pub fn obs_shape(mut self, obs_shape: Vec<usize>) -> Self {
        self.obs_shape = obs_shape;
        self
    }

    /// Stores recurrent-state snapshots of the given `[num_layers, hidden_size]`.
    pub fn recurrent_state_shape(mut self, shape: Option<[usize; 2]>) -> Self {
        self.recurrent_state_shape = shape;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks that the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(RrlError::InvalidConfig("capacity must be positive".to_string()).into());
        }
        if self.max_seq_len == 0 {
            return Err(
                RrlError::InvalidConfig("max_seq_len must be positive".to_string()).into(),
            );
        }
        Ok(())
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of replay buffer from {}", path_.display());
        Ok(b)
    }

    /// Saves the configuration into a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of replay buffer into {}", path_.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_save_and_load() -> Result<()> {
        let config = SequenceReplayBufferConfig::default()
            .capacity(500)
            .max_seq_len(4)
            .obs_shape(vec![2, 3])
            .recurrent_state_shape(Some([1, 16]));
        let dir = TempDir::new("replay_buffer_config")?;
        let path = dir.path().join("replay_buffer.yaml");
        config.save(&path)?;
        assert_eq!(SequenceReplayBufferConfig::load(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_validate() {
        assert!(SequenceReplayBufferConfig::default().validate().is_ok());
        assert!(SequenceReplayBufferConfig::default()
            .max_seq_len(0)
            .validate()
            .is_err());
        assert!(SequenceReplayBufferConfig::default()
            .capacity(0)
            .validate()
            .is_err());
    }
}
