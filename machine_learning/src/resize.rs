//! Bilinear resampling with half-pixel centers, the same sampling grid as
//! `align_corners = false`.

use ndarray::{Array4, ArrayView4};

/// Source taps for every output coordinate along one axis.
fn taps(out_len: usize, in_len: usize) -> Vec<(usize, usize, f32)> {
    let scale = in_len as f32 / out_len as f32;

    (0..out_len)
        .map(|o| {
            let src = ((o as f32 + 0.5) * scale - 0.5).max(0.0);
            let i0 = (src.floor() as usize).min(in_len - 1);
            let i1 = (i0 + 1).min(in_len - 1);
            (i0, i1, src - i0 as f32)
        })
        .collect()
}

/// Resizes the spatial dimensions of `x` to `(oh, ow)`.
pub fn bilinear(x: ArrayView4<f32>, (oh, ow): (usize, usize)) -> Array4<f32> {
    let (n, c, h, w) = x.dim();
    if (h, w) == (oh, ow) {
        return x.to_owned();
    }
    if h == 0 || w == 0 {
        return Array4::zeros((n, c, oh, ow));
    }

    let rows = taps(oh, h);
    let cols = taps(ow, w);

    Array4::from_shape_fn((n, c, oh, ow), |(b, ch, i, j)| {
        let (y0, y1, ly) = rows[i];
        let (x0, x1, lx) = cols[j];
        let top = x[[b, ch, y0, x0]] * (1.0 - lx) + x[[b, ch, y0, x1]] * lx;
        let bottom = x[[b, ch, y1, x0]] * (1.0 - lx) + x[[b, ch, y1, x1]] * lx;
        top * (1.0 - ly) + bottom * ly
    })
}

/// Scatters the gradient of `bilinear`'s output back onto an input of spatial size `(h, w)`.
pub fn bilinear_backward(d: ArrayView4<f32>, (h, w): (usize, usize)) -> Array4<f32> {
    let (n, c, oh, ow) = d.dim();
    if (h, w) == (oh, ow) {
        return d.to_owned();
    }

    let mut dx = Array4::zeros((n, c, h, w));
    if h == 0 || w == 0 {
        return dx;
    }

    let rows = taps(oh, h);
    let cols = taps(ow, w);

    for ((b, ch, i, j), &g) in d.indexed_iter() {
        let (y0, y1, ly) = rows[i];
        let (x0, x1, lx) = cols[j];
        dx[[b, ch, y0, x0]] += g * (1.0 - ly) * (1.0 - lx);
        dx[[b, ch, y0, x1]] += g * (1.0 - ly) * lx;
        dx[[b, ch, y1, x0]] += g * ly * (1.0 - lx);
        dx[[b, ch, y1, x1]] += g * ly * lx;
    }

    dx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downscaling_by_two_averages_blocks() {
        let x = Array4::from_shape_fn((1, 1, 4, 4), |(_, _, i, j)| (i * 4 + j) as f32);
        let y = bilinear(x.view(), (2, 2));

        // Half-pixel centers land exactly between the four pixels of each 2x2 block.
        assert_eq!(y.iter().copied().collect::<Vec<_>>(), [2.5, 4.5, 10.5, 12.5]);
    }

    #[test]
    fn upscaling_a_constant_keeps_it_constant() {
        let x = Array4::from_elem((1, 2, 3, 3), 0.7);
        let y = bilinear(x.view(), (7, 5));

        assert_eq!(y.dim(), (1, 2, 7, 5));
        assert!(y.iter().all(|&v| (v - 0.7).abs() < 1e-6));
    }

    #[test]
    fn backward_is_the_adjoint_of_forward() {
        let x = Array4::from_shape_fn((1, 1, 5, 3), |(_, _, i, j)| (i as f32 * 0.3 - j as f32).sin());
        let d = Array4::from_shape_fn((1, 1, 2, 4), |(_, _, i, j)| (i + 2 * j) as f32 * 0.1);

        let lhs = (&bilinear(x.view(), (2, 4)) * &d).sum();
        let rhs = (&x * &bilinear_backward(d.view(), (5, 3))).sum();

        assert!((lhs - rhs).abs() < 1e-5);
    }
}
