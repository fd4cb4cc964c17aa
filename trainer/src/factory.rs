use std::iter;

use machine_learning::arch::{Network, Sequential, activations::ActFn, layers::Layer};
use rand::rngs::StdRng;

use crate::{configs::Options, error::Result};

/// Builds the networks a model is made of.
pub trait NetworkFactory {
    fn generator(&self, options: &Options, rng: &mut StdRng) -> Result<Box<dyn Network>>;

    fn discriminator(&self, options: &Options, rng: &mut StdRng) -> Result<Box<dyn Network>>;

    /// The network whose activations the feature loss compares.
    fn feature_extractor(&self, options: &Options, rng: &mut StdRng)
    -> Result<Box<dyn Network>>;
}

/// Builds every network out of per-pixel dense layers, leaky ReLUs, nearest neighbour up-sampling
/// and average pooling, all Kaiming initialized.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointwiseFactory;

const SLOPE: f32 = 0.2;

fn block(c_in: usize, c_out: usize) -> impl Iterator<Item = Layer> {
    [
        Layer::pointwise((c_in, c_out)),
        Layer::activation(ActFn::leaky_relu(SLOPE)),
    ]
    .into_iter()
}

fn build<I>(layers: I, rng: &mut StdRng) -> Result<Box<dyn Network>>
where
    I: IntoIterator<Item = Layer>,
{
    let mut net = Sequential::new(layers);
    net.kaiming_init(rng)?;
    Ok(Box::new(net))
}

impl NetworkFactory for PointwiseFactory {
    fn generator(&self, options: &Options, rng: &mut StdRng) -> Result<Box<dyn Network>> {
        let g = &options.network_g;
        let in_nc = g.in_nc + usize::from(g.noise_input);

        let layers = block(in_nc, g.nf)
            .chain((0..g.nb).flat_map(|_| block(g.nf, g.nf)))
            .chain(iter::once(Layer::upsample(options.scale)))
            .chain(iter::once(Layer::pointwise((g.nf, g.out_nc))));

        build(layers, rng)
    }

    fn discriminator(&self, options: &Options, rng: &mut StdRng) -> Result<Box<dyn Network>> {
        let d = &options.network_d;

        let layers = block(d.in_nc, d.nf)
            .chain((0..d.nb).flat_map(|_| iter::once(Layer::avg_pool(2)).chain(block(d.nf, d.nf))))
            .chain(iter::once(Layer::pointwise((d.nf, 1))));

        build(layers, rng)
    }

    fn feature_extractor(
        &self,
        options: &Options,
        rng: &mut StdRng,
    ) -> Result<Box<dyn Network>> {
        let f = &options.network_f;

        let layers = block(options.network_g.out_nc, f.nf)
            .chain((1..f.depth).flat_map(|_| block(f.nf, f.nf)));

        build(layers, rng)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array4;
    use rand::SeedableRng;

    use super::*;

    fn options() -> Options {
        serde_json::from_value(serde_json::json!({
            "scale": 2,
            "path": { "models": "/tmp/models", "log": "/tmp/log" },
            "network_g": { "in_nc": 3, "out_nc": 3, "nf": 4, "nb": 1, "noise_input": true },
            "network_d": { "in_nc": 3, "nf": 4, "nb": 2 },
            "network_f": { "nf": 5, "depth": 2 },
        }))
        .unwrap()
    }

    #[test]
    fn shapes_line_up() {
        let options = options();
        let mut rng = StdRng::seed_from_u64(0);

        let g = PointwiseFactory.generator(&options, &mut rng).unwrap();
        let d = PointwiseFactory.discriminator(&options, &mut rng).unwrap();
        let f = PointwiseFactory.feature_extractor(&options, &mut rng).unwrap();

        let lr = Array4::zeros((2, 4, 4, 4));
        let sr = g.forward(lr.view()).unwrap();
        assert_eq!(sr.dim(), (2, 3, 8, 8));
        assert_eq!(d.forward(sr.view()).unwrap().dim(), (2, 1, 2, 2));
        assert_eq!(f.forward(sr.view()).unwrap().dim(), (2, 5, 8, 8));

        assert_eq!(d.receptive_field(), 4);
        assert_eq!(g.size(), 4 * 5 + 4 * 5 + 3 * 5);
    }
}
