//! Weight initialization of Q-networks.
use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use tch::{nn::VarStore, Device, Kind, Tensor};

/// Initialization applied to the parameters of a network after construction.
///
/// Except for [`InitFn::Default`], which keeps the initialization of libtorch,
/// every weight with two or more dimensions is re-initialized and every bias
/// is set to zero.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy, Default)]
pub enum InitFn {
    /// Keeps the initialization of libtorch.
    #[default]
    Default,

    /// Glorot uniform initialization.
    XavierUniform,

    /// Kaiming normal initialization for ReLU, with fan-in mode.
    HeNormal,

    /// Orthogonal initialization scaled by `gain`.
    Orthogonal {
        /// Scaling factor.
        gain: f64,
    },
}

/// Returns `(fan_in, fan_out)` of a weight shaped `[out, in, ..]`.
fn fans(size: &[i64]) -> (f64, f64) {
    let receptive: i64 = size[2..].iter().product();
    ((size[1] * receptive) as f64, (size[0] * receptive) as f64)
}

/// Random tensor of the given shape with orthonormal rows or columns.
fn orthogonal(size: &[i64], device: Device) -> Result<Tensor> {
    let rows = size[0];
    let cols = size[1..].iter().product::<i64>();
    let flat = Tensor::f_randn(&[rows, cols], (Kind::Float, device))?;
    let flat = match rows < cols {
        true => flat.transpose(0, 1),
        false => flat,
    };

    let (q, r) = Tensor::f_linalg_qr(&flat, "reduced")?;
    // Makes the decomposition unique.
    let q = q * r.diagonal(0, 0, 1).sign();
    let q = match rows < cols {
        true => q.transpose(0, 1),
        false => q,
    };

    Ok(q.contiguous().f_reshape(size)?)
}

impl InitFn {
    /// Initializes the variables in `var_store`.
    pub fn apply(&self, var_store: &VarStore) -> Result<()> {
        if *self == Self::Default {
            return Ok(());
        }

        tch::no_grad(|| -> Result<()> {
            for (name, mut var) in var_store.variables() {
                if name.contains("bias") {
                    let _ = var.f_zero_()?;
                } else if var.dim() >= 2 {
                    self.init_weight(&mut var)?;
                    debug!("Initialize {} with {:?}", name, self);
                }
            }
            Ok(())
        })
    }

    fn init_weight(&self, w: &mut Tensor) -> Result<()> {
        let size = w.size();
        let (fan_in, fan_out) = fans(&size);

        match self {
            Self::Default => {}
            Self::XavierUniform => {
                let a = (6.0 / (fan_in + fan_out)).sqrt();
                let _ = w.f_uniform_(-a, a)?;
            }
            Self::HeNormal => {
                let std = (2.0 / fan_in).sqrt();
                let _ = w.f_normal_(0.0, std)?;
            }
            Self::Orthogonal { gain } => {
                let q = orthogonal(&size, w.device())?.to_kind(w.kind());
                let _ = w.f_copy_(&(q * *gain))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::nn;

    fn linear_var_store(in_dim: i64, out_dim: i64) -> VarStore {
        let vs = VarStore::new(Device::Cpu);
        let _ = nn::linear(vs.root() / "l", in_dim, out_dim, Default::default());
        vs
    }

    fn abs_max(t: &Tensor) -> f64 {
        t.abs().max().double_value(&[])
    }

    #[test]
    fn test_xavier_uniform() -> Result<()> {
        let vs = linear_var_store(30, 20);
        InitFn::XavierUniform.apply(&vs)?;
        let vars = vs.variables();
        assert!(abs_max(&vars["l.weight"]) <= (6.0f64 / 50.0).sqrt());
        assert_eq!(abs_max(&vars["l.bias"]), 0.0);
        Ok(())
    }

    #[test]
    fn test_orthogonal() -> Result<()> {
        let vs = linear_var_store(3, 5);
        InitFn::Orthogonal { gain: 1.0 }.apply(&vs)?;
        let w = &vs.variables()["l.weight"];
        assert_eq!(w.size(), vec![5, 3]);

        // 5x3 weight has orthonormal columns.
        let eye = Tensor::eye(3, (Kind::Float, Device::Cpu));
        assert!(abs_max(&(w.transpose(0, 1).matmul(w) - eye)) < 1e-4);
        Ok(())
    }

    #[test]
    fn test_default_keeps_parameters() -> Result<()> {
        let vs = linear_var_store(4, 2);
        let before = vs.variables()["l.bias"].copy();
        InitFn::Default.apply(&vs)?;
        assert_eq!(abs_max(&(&vs.variables()["l.bias"] - before)), 0.0);
        Ok(())
    }
}
