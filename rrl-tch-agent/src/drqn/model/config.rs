use crate::{init::InitFn, opt::OptimizerConfig};
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`DrqnModel`](super::DrqnModel).
///
/// `Q` is the configuration of the recurrent representation network.
pub struct DrqnModelConfig<Q> {
    pub(super) q_config: Option<Q>,
    pub(super) opt_config: OptimizerConfig,
    #[serde(default)]
    pub(super) init_fn: InitFn,
}

impl<Q> Default for DrqnModelConfig<Q> {
    fn default() -> Self {
        Self {
            q_config: None,
            opt_config: OptimizerConfig::default(),
            init_fn: InitFn::Default,
        }
    }
}

impl<Q> DrqnModelConfig<Q>
where
    Q: DeserializeOwned + Serialize,
{
    /// Sets configurations of the representation network.
    pub fn q_config(mut self, v: Q) -> Self {
        self.q_config = Some(v);
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets the initialization of parameters.
    pub fn init_fn(mut self, v: InitFn) -> Self {
        self.init_fn = v;
        self
    }

    /// Constructs [`DrqnModelConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DrqnModelConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lstm::LstmEncoderConfig;
    use tempdir::TempDir;

    #[test]
    fn test_serde_drqn_model_config() -> Result<()> {
        let config = DrqnModelConfig::default()
            .q_config(LstmEncoderConfig::new(4, vec![32], 16, 1))
            .opt_config(OptimizerConfig::Adam { lr: 0.0003 })
            .init_fn(InitFn::Orthogonal { gain: 1.0 });

        let dir = TempDir::new("drqn_model_config")?;
        let path = dir.path().join("drqn_model_config.yaml");
        config.save(&path)?;
        let config_ = DrqnModelConfig::<LstmEncoderConfig>::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
