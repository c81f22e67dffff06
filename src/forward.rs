//! Forward pass.

use crate::{Model, Trace};

/// Runs one example through `model`, overwriting `trace`, and returns the output.
///
/// - `o[0] = [1, x]`
/// - hidden layers: `net[k] = W[k-1]ᵀ·o[k-1]`, `o[k] = [1, act(net[k])]`
/// - output layer: `net[N] = o[N] = W[N-1]ᵀ·o[N-1]`, no activation and no bias
///   entry; classification models then replace `o[N]` with its softmax
///
/// Shape contract (panics on violation):
/// - `input.len() == model.input_dim()`
/// - `trace` was built for a model with the same layer shapes
pub fn feed_forward<'a, M: Model + ?Sized>(
    model: &M,
    input: &[f64],
    trace: &'a mut Trace,
) -> &'a [f64] {
    let layers = model.layers();
    let n = layers.len();
    assert!(n > 0, "model must have at least one layer");
    assert_eq!(
        input.len(),
        model.input_dim(),
        "input len {} does not match model input_dim {}",
        input.len(),
        model.input_dim()
    );
    assert!(
        trace.fits(layers),
        "trace was built for a different model shape ({} layers, model has {n})",
        trace.num_layers()
    );

    let act = model.activation();

    trace.o[0][0] = 1.0;
    trace.o[0][1..].copy_from_slice(input);

    for (idx, layer) in layers.iter().enumerate() {
        let k = idx + 1;
        // o[k-1] is read while net[k] and o[k] are written.
        let (lower, upper) = trace.o.split_at_mut(k);
        let prev = &lower[k - 1];
        let out = &mut upper[0];
        let net = &mut trace.net[k];

        layer.affine_into(prev, net);

        if k < n {
            out[0] = 1.0;
            act.apply_into(net, &mut out[1..]);
        } else {
            out.copy_from_slice(net);
        }
    }

    if model.is_classification() {
        softmax_in_place(&mut trace.o[n]);
    }

    trace.output()
}

/// Numerically stable softmax: subtract the maximum, exponentiate, normalize.
///
/// Panics if `xs` is empty.
#[inline]
pub fn softmax_in_place(xs: &mut [f64]) {
    assert!(!xs.is_empty(), "softmax requires at least one entry");

    let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0_f64;
    for x in xs.iter_mut() {
        *x = (*x - max_x).exp();
        sum += *x;
    }
    let inv_sum = 1.0 / sum;
    for x in xs.iter_mut() {
        *x *= inv_sum;
    }
}
