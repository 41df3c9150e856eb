//! Utilities.
use anyhow::{anyhow, Result};
use log::trace;
use ndarray::{Array, Dimension};
use num_traits::cast::AsPrimitive;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use tch::{nn::VarStore, Kind, Reduction, Tensor};

/// Critic loss type.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy, Default)]
pub enum CriticLoss {
    /// Mean squared error.
    Mse,

    /// Smooth L1 loss with `beta = 1.0`.
    #[default]
    SmoothL1,
}

impl CriticLoss {
    /// Returns the loss of each element, without reduction.
    pub fn elementwise(&self, pred: &Tensor, tgt: &Tensor) -> Tensor {
        match self {
            Self::Mse => pred.mse_loss(tgt, Reduction::None),
            Self::SmoothL1 => pred.smooth_l1_loss(tgt, Reduction::None, 1.0),
        }
    }
}

/// Apply soft update on variables.
///
/// Variables are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track(dest: &VarStore, src: &VarStore, tau: f64) -> Result<()> {
    let src = src.variables();
    let mut dest = dest.variables();
    if src.len() != dest.len() {
        return Err(anyhow!(
            "Number of variables differs: {} and {}",
            src.len(),
            dest.len()
        ));
    }

    tch::no_grad(|| -> Result<()> {
        for (name, src) in src.iter() {
            let dest = dest
                .get_mut(name)
                .ok_or_else(|| anyhow!("Variable {} not found", name))?;
            dest.copy_(&(tau * src + (1.0 - tau) * &*dest));
        }
        Ok(())
    })?;
    trace!("soft update");
    Ok(())
}

/// Converts [`ndarray::Array`] to [`Tensor`] of the same shape.
pub fn arrayd_to_tensor<T1, T2, D>(a: &Array<T1, D>, add_batch_dim: bool) -> Result<Tensor>
where
    T1: AsPrimitive<T2>,
    T2: Copy + 'static + tch::kind::Element,
    D: Dimension,
{
    let v = a.iter().map(|e| e.as_()).collect::<Vec<T2>>();
    let shape = a.shape().iter().map(|x| *x as i64).collect::<Vec<_>>();
    let t = Tensor::f_from_slice(&v)?.f_reshape(shape.as_slice())?;

    Ok(match add_batch_dim {
        true => t.unsqueeze(0),
        false => t,
    })
}

/// Flattens a tensor into a vector of `f32` on CPU.
pub fn tensor_to_vec(t: &Tensor) -> Result<Vec<f32>> {
    let t = t
        .detach()
        .to_kind(Kind::Float)
        .to(tch::Device::Cpu)
        .flatten(0, -1);
    Ok(Vec::<f32>::try_from(&t)?)
}

/// Parameters flattened to vectors, keyed by variable name.
pub type NamedValues = Vec<(String, Vec<f32>)>;

/// Returns the weights, biases and gradients of the variables in `var_store`.
///
/// Variables are sorted by name. Gradients are included only for variables
/// that have one.
pub fn param_snapshot(var_store: &VarStore) -> Result<(NamedValues, NamedValues, NamedValues)> {
    let mut vars = var_store.variables().into_iter().collect::<Vec<_>>();
    vars.sort_by(|a, b| a.0.cmp(&b.0));

    let (mut weights, mut biases, mut grads) = (vec![], vec![], vec![]);
    for (name, var) in vars.iter() {
        let values = tensor_to_vec(var)?;
        match name.contains("bias") {
            true => biases.push((name.clone(), values)),
            false => weights.push((name.clone(), values)),
        }
        let grad = var.grad();
        if grad.defined() {
            grads.push((name.clone(), tensor_to_vec(&grad)?));
        }
    }

    Ok((weights, biases, grads))
}

/// Returns the maximum absolute value of the gradients in `var_store`.
pub fn grad_abs_max(var_store: &VarStore) -> Result<f32> {
    let mut max = 0f32;
    for var in var_store.trainable_variables() {
        let grad = var.grad();
        if grad.defined() {
            max = max.max(f32::try_from(grad.abs().max())?);
        }
    }
    Ok(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};
    use tch::{nn::Init, Device};

    #[test]
    fn test_track() -> Result<()> {
        let src = VarStore::new(Device::Cpu);
        let dest = VarStore::new(Device::Cpu);
        let _ = src.root().var("w", &[3], Init::Const(1.0));
        let _ = dest.root().var("w", &[3], Init::Const(0.0));

        track(&dest, &src, 0.1)?;
        let w = tensor_to_vec(&dest.variables()["w"])?;
        for v in w {
            assert!((v - 0.1).abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_arrayd_to_tensor_keeps_shape() -> Result<()> {
        let a = ArrayD::from_shape_vec(IxDyn(&[2, 3]), (0..6).map(|x| x as f32).collect())?;
        let t = arrayd_to_tensor::<f32, f32, _>(&a, true)?;
        assert_eq!(t.size(), vec![1, 2, 3]);
        assert_eq!(f32::try_from(t.get(0).get(1).get(0))?, 3.0);
        Ok(())
    }

    #[test]
    fn test_critic_loss_is_elementwise() -> Result<()> {
        let pred = Tensor::from_slice(&[0.0f32, 0.0, 0.0]);
        let tgt = Tensor::from_slice(&[0.5f32, 2.0, -1.0]);

        let l1 = tensor_to_vec(&CriticLoss::SmoothL1.elementwise(&pred, &tgt))?;
        assert_eq!(l1, vec![0.125, 1.5, 0.5]);
        let mse = tensor_to_vec(&CriticLoss::Mse.elementwise(&pred, &tgt))?;
        assert_eq!(mse, vec![0.25, 4.0, 1.0]);
        Ok(())
    }
}
