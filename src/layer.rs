//! Dense, bias-augmented layer weights.
//!
//! A layer transition from `in_dim` to `out_dim` units is stored as one row-major
//! matrix `W` of shape `(in_dim + 1, out_dim)`. Row 0 multiplies the constant `1`
//! prepended to every input, so it holds the biases; rows `1..=in_dim` hold the
//! weights proper.
//!
//! ```text
//!           out_0  out_1  ...
//!   bias  [ b_0    b_1    ... ]   <- row 0
//!   in_0  [ w_00   w_01   ... ]
//!   in_1  [ w_10   w_11   ... ]
//! ```

use rand::Rng;

use crate::matmul::gemm_f64;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Weight initialization scheme. Bias rows always start at zero.
pub enum Init {
    /// Uniform in `[-sqrt(6 / (in + out)), sqrt(6 / (in + out))]`.
    #[default]
    Xavier,
    /// Uniform in `[-sqrt(6 / in), sqrt(6 / in)]`.
    He,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    in_dim: usize,
    out_dim: usize,
    /// Row-major matrix with shape (in_dim + 1, out_dim). Row 0 is the bias row.
    coeffs: Vec<f64>,
}

impl Layer {
    /// All-zero layer.
    #[inline]
    pub fn new(in_dim: usize, out_dim: usize) -> Self {
        Self {
            in_dim,
            out_dim,
            coeffs: vec![0.0; (in_dim + 1) * out_dim],
        }
    }

    pub fn new_with_rng<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        init: Init,
        rng: &mut R,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }

        let limit = match init {
            Init::Xavier => (6.0 / (in_dim + out_dim) as f64).sqrt(),
            Init::He => (6.0 / in_dim as f64).sqrt(),
        };

        let mut layer = Self::new(in_dim, out_dim);
        for w in &mut layer.coeffs[out_dim..] {
            *w = rng.gen_range(-limit..limit);
        }
        Ok(layer)
    }

    /// Build a layer from an existing `(in_dim + 1, out_dim)` row-major matrix.
    pub fn from_parts(in_dim: usize, out_dim: usize, coeffs: Vec<f64>) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }
        let expected = (in_dim + 1)
            .checked_mul(out_dim)
            .ok_or_else(|| Error::InvalidConfig("layer shape overflow".to_owned()))?;
        if coeffs.len() != expected {
            return Err(Error::shape("layer coefficients", coeffs.len(), expected));
        }
        if coeffs.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "layer coefficients must be finite".to_owned(),
            ));
        }

        Ok(Self {
            in_dim,
            out_dim,
            coeffs,
        })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// Number of matrix rows, including the bias row.
    #[inline]
    pub fn rows(&self) -> usize {
        self.in_dim + 1
    }

    /// Full row-major matrix, bias row first.
    #[inline]
    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    #[inline]
    pub fn coeffs_mut(&mut self) -> &mut [f64] {
        &mut self.coeffs
    }

    #[inline]
    pub fn bias_row(&self) -> &[f64] {
        &self.coeffs[..self.out_dim]
    }

    /// Rows `1..=in_dim` (everything but the bias), row-major `(in_dim, out_dim)`.
    #[inline]
    pub fn weight_rows(&self) -> &[f64] {
        &self.coeffs[self.out_dim..]
    }

    /// `self += scale * update`, element-wise over the full matrix.
    #[inline]
    pub fn add_scaled(&mut self, update: &[f64], scale: f64) {
        assert_eq!(
            update.len(),
            self.coeffs.len(),
            "update len {} does not match layer len {}",
            update.len(),
            self.coeffs.len()
        );
        for (w, &u) in self.coeffs.iter_mut().zip(update) {
            *w = scale.mul_add(u, *w);
        }
    }

    /// `net = Wᵀ · input`, where `input` is already bias-augmented.
    ///
    /// Shape contract:
    /// - `input.len() == self.rows()`
    /// - `net.len() == self.out_dim()`
    #[inline]
    pub fn affine_into(&self, input: &[f64], net: &mut [f64]) {
        debug_assert_eq!(input.len(), self.rows());
        debug_assert_eq!(net.len(), self.out_dim);

        // Wᵀ is (out_dim, rows): element (i, p) lives at coeffs[p * out_dim + i].
        gemm_f64(
            self.out_dim,
            1,
            self.rows(),
            1.0,
            &self.coeffs,
            1,
            self.out_dim,
            input,
            1,
            1,
            0.0,
            net,
            1,
            1,
        );
    }

    /// `upstream = W[1..] · delta`: propagates an error signal through the weight
    /// rows only. The bias unit has no incoming net input, so row 0 is skipped.
    ///
    /// Shape contract:
    /// - `delta.len() == self.out_dim()`
    /// - `upstream.len() == self.in_dim()`
    #[inline]
    pub fn propagate_into(&self, delta: &[f64], upstream: &mut [f64]) {
        debug_assert_eq!(delta.len(), self.out_dim);
        debug_assert_eq!(upstream.len(), self.in_dim);

        gemm_f64(
            self.in_dim,
            1,
            self.out_dim,
            1.0,
            self.weight_rows(),
            self.out_dim,
            1,
            delta,
            1,
            1,
            0.0,
            upstream,
            1,
            1,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sample_layer() -> Layer {
        // in_dim = 2, out_dim = 2
        // bias [0.5, -1.0]
        // in_0 [1.0,  2.0]
        // in_1 [3.0,  4.0]
        Layer::from_parts(2, 2, vec![0.5, -1.0, 1.0, 2.0, 3.0, 4.0]).unwrap()
    }

    #[test]
    fn affine_uses_bias_row_and_weights() {
        let layer = sample_layer();
        let mut net = [0.0_f64; 2];
        layer.affine_into(&[1.0, 10.0, 100.0], &mut net);
        assert_eq!(net, [0.5 + 10.0 + 300.0, -1.0 + 20.0 + 400.0]);
    }

    #[test]
    fn propagate_skips_bias_row() {
        let layer = sample_layer();
        let mut upstream = [0.0_f64; 2];
        layer.propagate_into(&[1.0, -1.0], &mut upstream);
        assert_eq!(upstream, [1.0 - 2.0, 3.0 - 4.0]);
    }

    #[test]
    fn from_parts_validates_shape_and_finiteness() {
        assert!(matches!(
            Layer::from_parts(2, 2, vec![0.0; 4]),
            Err(Error::ShapeMismatch { got: 4, expected: 6, .. })
        ));
        assert!(Layer::from_parts(1, 1, vec![0.0, f64::NAN]).is_err());
        assert!(Layer::from_parts(0, 1, vec![]).is_err());
    }

    #[test]
    fn seeded_init_leaves_bias_row_at_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        let layer = Layer::new_with_rng(4, 3, Init::Xavier, &mut rng).unwrap();
        assert!(layer.bias_row().iter().all(|&b| b == 0.0));

        let limit = (6.0_f64 / 7.0).sqrt();
        assert!(layer.weight_rows().iter().all(|w| w.abs() <= limit));
        assert!(layer.weight_rows().iter().any(|&w| w != 0.0));
    }

    #[test]
    fn add_scaled_touches_every_entry() {
        let mut layer = sample_layer();
        layer.add_scaled(&[1.0; 6], -0.5);
        assert_eq!(layer.coeffs(), &[0.0, -1.5, 0.5, 1.5, 2.5, 3.5]);
    }
}
