//! Reusable per-example buffers and per-layer gradient storage.
//!
//! A `Trace` and `Deltas` are rebuilt for every example, but their storage is
//! allocated once per model shape and overwritten in place. `Gradients` holds one
//! matrix per layer, shaped like that layer's coefficients.

use crate::{Layer, Model};

/// Forward-pass cache for one example.
///
/// For a model with `N` layers, both `net` and `o` have `N + 1` entries:
///
/// - `net[0]` is unused (empty); `net[k]` has `layers[k-1].out_dim()` entries.
/// - `o[0] = [1, x]`.
/// - `o[k] = [1, act(net[k])]` for hidden layers `0 < k < N`.
/// - `o[N]` is the network output with no bias entry (softmax for classification).
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub(crate) net: Vec<Vec<f64>>,
    pub(crate) o: Vec<Vec<f64>>,
}

impl Trace {
    pub fn new<M: Model + ?Sized>(model: &M) -> Self {
        Self::for_layers(model.layers())
    }

    pub fn for_layers(layers: &[Layer]) -> Self {
        let n = layers.len();
        let mut net = Vec::with_capacity(n + 1);
        let mut o = Vec::with_capacity(n + 1);

        net.push(Vec::new());
        o.push(vec![0.0; layers.first().map_or(1, Layer::rows)]);

        for (k, layer) in layers.iter().enumerate() {
            net.push(vec![0.0; layer.out_dim()]);
            let bias = usize::from(k + 1 < n);
            o.push(vec![0.0; layer.out_dim() + bias]);
        }

        Self { net, o }
    }

    /// Number of layers this trace was built for.
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.o.len() - 1
    }

    /// Pre-activation of layer `k` (`1..=N`).
    #[inline]
    pub fn net(&self, k: usize) -> &[f64] {
        &self.net[k]
    }

    /// Post-activation of layer `k` (`0..=N`).
    #[inline]
    pub fn o(&self, k: usize) -> &[f64] {
        &self.o[k]
    }

    /// Network output of the most recent forward pass.
    #[inline]
    pub fn output(&self) -> &[f64] {
        self.o
            .last()
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// True if this trace has the buffer sizes `layers` needs.
    pub fn fits(&self, layers: &[Layer]) -> bool {
        let n = layers.len();
        if self.o.len() != n + 1 || self.net.len() != n + 1 {
            return false;
        }
        if n > 0 && self.o[0].len() != layers[0].rows() {
            return false;
        }
        layers.iter().enumerate().all(|(k, layer)| {
            let bias = usize::from(k + 1 < n);
            self.net[k + 1].len() == layer.out_dim() && self.o[k + 1].len() == layer.out_dim() + bias
        })
    }
}

/// Backward-pass error signals for one example: `delta[k]` has
/// `layers[k].out_dim()` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Deltas {
    pub(crate) delta: Vec<Vec<f64>>,
}

impl Deltas {
    pub fn new<M: Model + ?Sized>(model: &M) -> Self {
        Self::for_layers(model.layers())
    }

    pub fn for_layers(layers: &[Layer]) -> Self {
        Self {
            delta: layers.iter().map(|l| vec![0.0; l.out_dim()]).collect(),
        }
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.delta.len()
    }

    #[inline]
    pub fn get(&self, k: usize) -> &[f64] {
        &self.delta[k]
    }

    pub fn fits(&self, layers: &[Layer]) -> bool {
        self.delta.len() == layers.len()
            && self
                .delta
                .iter()
                .zip(layers)
                .all(|(d, l)| d.len() == l.out_dim())
    }
}

/// One matrix per layer, shaped `(in_dim + 1, out_dim)` like the layer itself.
///
/// The batch aggregator first accumulates raw gradients here and then turns them
/// into the update handed to the model's optimizer hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    layers: Vec<Vec<f64>>,
    out_dims: Vec<usize>,
}

impl Gradients {
    pub fn new<M: Model + ?Sized>(model: &M) -> Self {
        Self::zeros_like(model.layers())
    }

    pub fn zeros_like(layers: &[Layer]) -> Self {
        Self {
            layers: layers.iter().map(|l| vec![0.0; l.coeffs().len()]).collect(),
            out_dims: layers.iter().map(Layer::out_dim).collect(),
        }
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Row-major matrix for layer `k`, bias row first.
    #[inline]
    pub fn layer(&self, k: usize) -> &[f64] {
        &self.layers[k]
    }

    #[inline]
    pub fn layer_mut(&mut self, k: usize) -> &mut [f64] {
        &mut self.layers[k]
    }

    /// Bias row of layer `k`.
    #[inline]
    pub fn bias_row(&self, k: usize) -> &[f64] {
        &self.layers[k][..self.out_dims[k]]
    }

    #[inline]
    pub fn out_dim(&self, k: usize) -> usize {
        self.out_dims[k]
    }

    pub fn fill_zero(&mut self) {
        for g in &mut self.layers {
            g.fill(0.0);
        }
    }

    /// Element-wise `self += other`.
    pub fn add_assign(&mut self, other: &Gradients) {
        assert_eq!(
            self.layers.len(),
            other.layers.len(),
            "gradients have {} layers, other has {}",
            self.layers.len(),
            other.layers.len()
        );
        for (a, b) in self.layers.iter_mut().zip(&other.layers) {
            debug_assert_eq!(a.len(), b.len());
            for (x, &y) in a.iter_mut().zip(b) {
                *x += y;
            }
        }
    }

    pub fn fits(&self, layers: &[Layer]) -> bool {
        self.layers.len() == layers.len()
            && self
                .layers
                .iter()
                .zip(layers)
                .all(|(g, l)| g.len() == l.coeffs().len())
    }
}
