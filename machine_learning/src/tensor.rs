//! Layout helpers for `(batch, channels, height, width)` tensors.

use ndarray::{Array2, Array4, ArrayView4, Dimension};

use crate::{MlErr, Result};

/// Flattens an image tensor into one row per pixel, `(n * h * w, c)`.
pub fn to_rows(x: ArrayView4<f32>) -> Result<Array2<f32>> {
    let (n, c, h, w) = x.dim();
    let rows = x
        .permuted_axes([0, 2, 3, 1])
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order((n * h * w, c))?;

    Ok(rows)
}

/// Inverse of `to_rows`. `rows` may be in any memory layout.
///
/// # Arguments
/// * `rows` - One row per pixel, `(n * h * w, c)`.
/// * `(n, h, w)` - The batch and spatial dimensions of the resulting tensor.
pub fn from_rows(rows: Array2<f32>, (n, h, w): (usize, usize, usize)) -> Result<Array4<f32>> {
    let c = rows.ncols();
    let x = rows
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order((n, h, w, c))?
        .permuted_axes([0, 3, 1, 2])
        .as_standard_layout()
        .into_owned();

    Ok(x)
}

/// Fails unless both tensors have the exact same shape.
pub fn ensure_same_shape<D: Dimension>(
    what: &'static str,
    a: &ndarray::ArrayView<f32, D>,
    b: &ndarray::ArrayView<f32, D>,
) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(MlErr::SizeMismatch {
            what,
            got: a.len(),
            expected: b.len(),
        });
    }

    Ok(())
}
