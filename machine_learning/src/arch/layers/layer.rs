use ndarray::{Array4, ArrayView4};

use super::{AvgPool, Pointwise, Upsample};
use crate::{Result, arch::activations::ActFn};

#[derive(Clone, Debug)]
pub enum Layer {
    Pointwise(Pointwise),
    Activation(ActFn),
    Upsample(Upsample),
    AvgPool(AvgPool),
}
use Layer::*;

impl Layer {
    pub fn pointwise(dim: (usize, usize)) -> Self {
        Pointwise(super::Pointwise::new(dim))
    }

    pub fn activation(act_fn: ActFn) -> Self {
        Activation(act_fn)
    }

    pub fn upsample(scale: usize) -> Self {
        Upsample(super::Upsample::new(scale))
    }

    pub fn avg_pool(k: usize) -> Self {
        AvgPool(super::AvgPool::new(k))
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        match self {
            Pointwise(l) => l.size(),
            _ => 0,
        }
    }

    pub fn forward(&self, params: &[f32], x: ArrayView4<f32>) -> Result<Array4<f32>> {
        match self {
            Pointwise(l) => l.forward(params, x),
            Activation(act_fn) => Ok(x.mapv(|v| act_fn.f(v))),
            Upsample(l) => l.forward(x),
            AvgPool(l) => l.forward(x),
        }
    }

    pub fn backward(
        &self,
        params: &[f32],
        grad: Option<&mut [f32]>,
        x: ArrayView4<f32>,
        d: ArrayView4<f32>,
    ) -> Result<Array4<f32>> {
        match self {
            Pointwise(l) => l.backward(params, grad, x, d),
            Activation(act_fn) => {
                let mut dx = d.to_owned();
                dx.zip_mut_with(&x, |d, &x| *d *= act_fn.df(x));
                Ok(dx)
            }
            Upsample(l) => l.backward(x, d),
            AvgPool(l) => l.backward(x, d),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Pointwise(l) => {
                let (c_in, c_out) = l.dim();
                format!("Pointwise({c_in} -> {c_out}), {} params", l.size())
            }
            Activation(act_fn) => act_fn.name(),
            Upsample(l) => format!("Upsample(nearest, x{})", l.scale()),
            AvgPool(l) => format!("AvgPool({k}x{k})", k = l.kernel()),
        }
    }
}
