use super::LeakyRelu;

/// Element-wise activation functions a layer can apply.
#[derive(Clone, Debug)]
pub enum ActFn {
    LeakyRelu(LeakyRelu),
}
use ActFn::*;

impl ActFn {
    pub fn leaky_relu(slope: f32) -> Self {
        LeakyRelu(LeakyRelu::new(slope))
    }

    pub fn f(&self, x: f32) -> f32 {
        match self {
            LeakyRelu(a) => a.f(x),
        }
    }

    pub fn df(&self, x: f32) -> f32 {
        match self {
            LeakyRelu(a) => a.df(x),
        }
    }

    pub fn name(&self) -> String {
        match self {
            LeakyRelu(a) => format!("LeakyReLU(slope={})", a.slope()),
        }
    }
}
