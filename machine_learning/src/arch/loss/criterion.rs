use ndarray::{Array, ArrayView, Dimension};

use super::{L1, LossFn, Mse};

/// A pixel-wise criterion picked by name from the training options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Criterion {
    L1,
    L2,
}

impl Criterion {
    /// Parses `"l1"` or `"l2"`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "l1" => Some(Self::L1),
            "l2" => Some(Self::L2),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::L1 => "l1",
            Self::L2 => "l2",
        }
    }
}

impl LossFn for Criterion {
    fn loss<D: Dimension>(&self, y_pred: ArrayView<f32, D>, y: ArrayView<f32, D>) -> f32 {
        match self {
            Self::L1 => L1.loss(y_pred, y),
            Self::L2 => Mse.loss(y_pred, y),
        }
    }

    fn loss_prime<D: Dimension>(
        &self,
        y_pred: ArrayView<f32, D>,
        y: ArrayView<f32, D>,
    ) -> Array<f32, D> {
        match self {
            Self::L1 => L1.loss_prime(y_pred, y),
            Self::L2 => Mse.loss_prime(y_pred, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names_only() {
        assert_eq!(Criterion::from_name("l1"), Some(Criterion::L1));
        assert_eq!(Criterion::from_name("l2"), Some(Criterion::L2));
        assert_eq!(Criterion::from_name("huber"), None);
    }
}
