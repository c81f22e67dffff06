//! Backward pass.

use crate::{Deltas, Model, Trace};

/// Computes the error signal of every layer for one example.
///
/// You must call [`crate::feed_forward`] first; `trace` supplies the cached `net`
/// values and `y_estimated` is normally `trace.output()`.
///
/// - `delta[N-1] = y_estimated - y_true`, the net-input gradient for both
///   softmax + cross-entropy and identity + squared error
/// - `delta[k-1] = (W[k] without its bias row) · delta[k] ⊙ act'(net[k])`
///
/// Shape contract (panics on violation):
/// - `y_true.len() == y_estimated.len() == model.output_dim()`
/// - `trace` and `deltas` were built for a model with the same layer shapes
pub fn back_propagate<M: Model + ?Sized>(
    model: &M,
    y_true: &[f64],
    y_estimated: &[f64],
    trace: &Trace,
    deltas: &mut Deltas,
) {
    let layers = model.layers();
    let n = layers.len();
    assert!(n > 0, "model must have at least one layer");
    assert_eq!(
        y_true.len(),
        model.output_dim(),
        "target len {} does not match model output_dim {}",
        y_true.len(),
        model.output_dim()
    );
    assert_eq!(
        y_estimated.len(),
        model.output_dim(),
        "estimate len {} does not match model output_dim {}",
        y_estimated.len(),
        model.output_dim()
    );
    assert!(
        trace.fits(layers),
        "trace was built for a different model shape ({} layers, model has {n})",
        trace.num_layers()
    );
    assert!(
        deltas.fits(layers),
        "deltas were built for a different model shape ({} layers, model has {n})",
        deltas.num_layers()
    );

    let act = model.activation();

    for ((d, &est), &y) in deltas.delta[n - 1]
        .iter_mut()
        .zip(y_estimated)
        .zip(y_true)
    {
        *d = est - y;
    }

    for k in (1..n).rev() {
        let (lower, upper) = deltas.delta.split_at_mut(k);
        let upstream = &mut lower[k - 1];
        layers[k].propagate_into(&upper[0], upstream);
        act.scale_by_derivative(trace.net(k), upstream);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Activation, Layer, Mlp, Optimizer, Task, feed_forward};

    fn two_layer(task: Task) -> Mlp {
        let hidden = Layer::from_parts(2, 2, vec![0.1, -0.1, 0.4, -0.3, 0.2, 0.5]).unwrap();
        let output = Layer::from_parts(2, 3, vec![0.0, 0.1, -0.1, 0.7, -0.2, 0.3, 0.5, 0.6, -0.4])
            .unwrap();
        Mlp::from_parts(vec![hidden, output], Activation::Tanh, task, Optimizer::Sgd).unwrap()
    }

    #[test]
    fn output_delta_is_estimate_minus_target() {
        for task in [Task::Classification, Task::Regression] {
            let mlp = two_layer(task);
            let mut trace = Trace::new(&mlp);
            let mut deltas = Deltas::new(&mlp);
            let y = [0.0, 1.0, 0.0];

            let est = feed_forward(&mlp, &[0.5, -1.5], &mut trace).to_vec();
            back_propagate(&mlp, &y, &est, &trace, &mut deltas);

            let expected: Vec<f64> = est.iter().zip(&y).map(|(e, t)| e - t).collect();
            assert_eq!(deltas.get(1), expected.as_slice());
        }
    }

    #[test]
    fn hidden_delta_excludes_the_bias_row() {
        let mlp = two_layer(Task::Regression);
        let mut trace = Trace::new(&mlp);
        let mut deltas = Deltas::new(&mlp);
        let y = [0.2, -0.1, 0.4];

        let est = feed_forward(&mlp, &[0.5, -1.5], &mut trace).to_vec();
        back_propagate(&mlp, &y, &est, &trace, &mut deltas);

        let out = mlp.layers()[1].coeffs();
        let top = deltas.get(1);
        for j in 0..2 {
            // Row j + 1 of the output layer maps hidden unit j.
            let row = &out[(j + 1) * 3..(j + 2) * 3];
            let back: f64 = row.iter().zip(top).map(|(w, d)| w * d).sum();
            let expected = back * Activation::Tanh.derivative(trace.net(1)[j]);
            assert!((deltas.get(0)[j] - expected).abs() < 1e-12);
        }
    }
}
