//! Row-wise kernels over `ndarray` matrices used by the decoder step.
//!
//! Every function here treats row *i* independently, which is what keeps
//! one hypothesis from leaking into another inside a batched step.

use ndarray::{Array1, Array2, Axis};

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Applies the logistic function element-wise.
pub fn sigmoid_inplace(a: &mut Array2<f32>) {
    a.mapv_inplace(sigmoid);
}

/// Numerically stable softmax over a vector.
pub fn softmax_1d_inplace(a: &mut Array1<f32>) {
    let max = a.fold(f32::NEG_INFINITY, |m, &x| m.max(x));
    a.mapv_inplace(|x| (x - max).exp());
    let sum = a.sum();
    if sum > 0.0 {
        a.mapv_inplace(|x| x / sum);
    }
}

/// Numerically stable softmax over each row.
pub fn softmax_rows_inplace(a: &mut Array2<f32>) {
    for mut row in a.axis_iter_mut(Axis(0)) {
        let max = row.fold(f32::NEG_INFINITY, |m, &x| m.max(x));
        row.mapv_inplace(|x| (x - max).exp());
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|x| x / sum);
        }
    }
}

/// Gathers rows of `source` into a freshly allocated matrix.
///
/// Row `i` of the result is `source[indices[i]]`. Indices may repeat or skip
/// rows, so the result never aliases `source`.
///
/// # Panics
/// Panics if an index is out of bounds; callers validate backpointers first.
pub fn assemble_rows(source: &Array2<f32>, indices: &[usize]) -> Array2<f32> {
    let cols = source.ncols();
    let mut out = Array2::<f32>::zeros((indices.len(), cols));
    for (mut dest, &src_idx) in out.axis_iter_mut(Axis(0)).zip(indices) {
        dest.assign(&source.row(src_idx));
    }
    out
}
