use super::LstmEncoderConfig;
use crate::model::RecurrentSubModel;
use tch::{
    nn,
    nn::{LSTMState, Module, RNN},
    Device, Tensor,
};

/// Per-step ReLU layers followed by a multi-layer LSTM.
///
/// Observations of each step are flattened, so inputs `[batch, seq, ..]`
/// produce outputs `[batch, seq, hidden_size]`.
pub struct LstmEncoder {
    config: LstmEncoderConfig,
    device: Device,
    seq: nn::Sequential,
    lstm: nn::LSTM,
}

impl LstmEncoder {
    fn create_net(
        var_store: &nn::VarStore,
        config: &LstmEncoderConfig,
    ) -> (nn::Sequential, nn::LSTM) {
        let p = &(var_store.root() / "lstm_encoder");
        let mut seq = nn::seq();
        let mut in_dim = config.in_dim;

        for (i, &out_dim) in config.units.iter().enumerate() {
            seq = seq.add(nn::linear(
                p / format!("{}{}", "ln", i),
                in_dim,
                out_dim,
                Default::default(),
            ));
            seq = seq.add_fn(|x| x.relu());
            in_dim = out_dim;
        }

        let rnn_config = nn::RNNConfig {
            num_layers: config.num_layers,
            batch_first: true,
            ..Default::default()
        };
        let lstm = nn::lstm(p / "lstm", in_dim, config.hidden_size, rnn_config);

        (seq, lstm)
    }
}

impl RecurrentSubModel for LstmEncoder {
    type Config = LstmEncoderConfig;

    fn build(var_store: &nn::VarStore, config: Self::Config) -> Self {
        let device = var_store.device();
        let (seq, lstm) = Self::create_net(var_store, &config);

        Self {
            config,
            device,
            seq,
            lstm,
        }
    }

    fn clone_with_var_store(&self, var_store: &nn::VarStore) -> Self {
        let config = self.config.clone();
        let device = var_store.device();
        let (seq, lstm) = Self::create_net(var_store, &config);

        Self {
            config,
            device,
            seq,
            lstm,
        }
    }

    fn forward(&self, xs: &Tensor, state: &LSTMState) -> (Tensor, LSTMState) {
        let xs = self.seq.forward(&xs.to(self.device).flatten(2, -1));
        self.lstm.seq_init(&xs, state)
    }

    fn init_hidden(&self, batch_size: i64) -> LSTMState {
        self.lstm.zero_state(batch_size)
    }

    fn num_layers(&self) -> i64 {
        self.config.num_layers
    }

    fn hidden_size(&self) -> i64 {
        self.config.hidden_size
    }

    fn in_dim(&self) -> i64 {
        self.config.in_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Kind;

    #[test]
    fn test_output_and_state_shapes() {
        let vs = nn::VarStore::new(Device::Cpu);
        let config = LstmEncoderConfig::new(6, vec![16], 8, 2);
        let encoder = LstmEncoder::build(&vs, config);

        // [batch, seq, 2, 3] is flattened to 6 features per step.
        let xs = Tensor::rand(&[4, 5, 2, 3], (Kind::Float, Device::Cpu));
        let (ys, state) = encoder.forward(&xs, &encoder.init_hidden(4));
        assert_eq!(ys.size(), vec![4, 5, 8]);
        assert_eq!(state.h().size(), vec![2, 4, 8]);
        assert_eq!(state.c().size(), vec![2, 4, 8]);
    }

    #[test]
    fn test_init_hidden_is_zero() {
        let vs = nn::VarStore::new(Device::Cpu);
        let encoder = LstmEncoder::build(&vs, LstmEncoderConfig::default().in_dim(3));
        let state = encoder.init_hidden(1);
        assert_eq!(state.h().size(), vec![1, 1, 64]);
        assert_eq!(state.h().abs().sum(Kind::Float).double_value(&[]), 0.0);
        assert_eq!(state.c().abs().sum(Kind::Float).double_value(&[]), 0.0);
    }

    #[test]
    fn test_state_is_carried() {
        let vs = nn::VarStore::new(Device::Cpu);
        let encoder = LstmEncoder::build(&vs, LstmEncoderConfig::new(2, vec![], 4, 1));
        let xs = Tensor::rand(&[1, 6, 2], (Kind::Float, Device::Cpu));

        // Feeding the sequence in two halves gives the same result as a single pass.
        let (ys, _) = encoder.forward(&xs, &encoder.init_hidden(1));
        let (_, s) = encoder.forward(&xs.narrow(1, 0, 3), &encoder.init_hidden(1));
        let (ys2, _) = encoder.forward(&xs.narrow(1, 3, 3), &s);
        let diff = (ys.narrow(1, 3, 3) - ys2).abs().max().double_value(&[]);
        assert!(diff < 1e-5);
    }
}
