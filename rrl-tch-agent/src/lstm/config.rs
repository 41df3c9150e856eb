use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`LstmEncoder`](super::LstmEncoder).
pub struct LstmEncoderConfig {
    pub(super) in_dim: i64,
    pub(super) units: Vec<i64>,
    pub(super) hidden_size: i64,
    pub(super) num_layers: i64,
}

impl Default for LstmEncoderConfig {
    fn default() -> Self {
        Self {
            in_dim: 1,
            units: vec![],
            hidden_size: 64,
            num_layers: 1,
        }
    }
}

impl LstmEncoderConfig {
    /// Constructs the configuration.
    ///
    /// `units` are the widths of the ReLU layers applied to each step
    /// before the LSTM, which may be empty.
    pub fn new(in_dim: i64, units: Vec<i64>, hidden_size: i64, num_layers: i64) -> Self {
        Self {
            in_dim,
            units,
            hidden_size,
            num_layers,
        }
    }

    /// Sets the number of input features per step.
    pub fn in_dim(mut self, v: i64) -> Self {
        self.in_dim = v;
        self
    }

    /// Sets the widths of the layers before the LSTM.
    pub fn units(mut self, v: Vec<i64>) -> Self {
        self.units = v;
        self
    }

    /// Sets the hidden size of the LSTM.
    pub fn hidden_size(mut self, v: i64) -> Self {
        self.hidden_size = v;
        self
    }

    /// Sets the number of LSTM layers.
    pub fn num_layers(mut self, v: i64) -> Self {
        self.num_layers = v;
        self
    }
}
