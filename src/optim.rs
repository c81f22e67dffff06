//! Optimizers behind the [`crate::Model`] hooks.
//!
//! The kernel hands every hook a finished *update* (`-stepsize * grad / n + λW̃`),
//! so each optimizer here only decides how that update reaches the parameters:
//!
//! - `Sgd`: `W += update`
//! - `Momentum`: `v = μv + update; W += v`
//! - `Nesterov`: pre-step `W += μv`, then `v = μv + update; W += update`
//!
//! With Nesterov the pre-step already moved `W` by `μv_old`, so adding `update`
//! afterwards lands on `W_old + v_new`, the same point classic momentum reaches,
//! but with the gradient taken at the look-ahead position.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Gradients, Layer, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
/// Optimizer choice for a concrete [`crate::Mlp`].
pub enum Optimizer {
    /// Plain SGD.
    #[default]
    Sgd,
    /// Classical momentum.
    Momentum { momentum: f64 },
    /// Nesterov accelerated gradient.
    Nesterov { momentum: f64 },
}

impl Optimizer {
    /// Validate optimizer hyperparameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Optimizer::Sgd => Ok(()),
            Optimizer::Momentum { momentum } | Optimizer::Nesterov { momentum } => {
                if !(momentum.is_finite() && (0.0..1.0).contains(&momentum)) {
                    return Err(Error::InvalidConfig(format!(
                        "momentum must be finite and in [0,1), got {momentum}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Allocate optimizer state (zero velocity) for `layers`.
    pub fn state(self, layers: &[Layer]) -> Result<OptimizerState> {
        self.validate()?;

        let velocity = match self {
            Optimizer::Sgd => Vec::new(),
            Optimizer::Momentum { .. } | Optimizer::Nesterov { .. } => layers
                .iter()
                .map(|layer| vec![0.0; layer.coeffs().len()])
                .collect(),
        };

        Ok(OptimizerState {
            optimizer: self,
            velocity,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
/// Owned optimizer state: the chosen optimizer plus one velocity matrix per layer.
pub struct OptimizerState {
    optimizer: Optimizer,
    velocity: Vec<Vec<f64>>,
}

impl OptimizerState {
    #[inline]
    pub fn optimizer(&self) -> Optimizer {
        self.optimizer
    }

    /// Velocity matrix for layer `idx` (empty slice for plain SGD).
    #[inline]
    pub fn velocity(&self, idx: usize) -> &[f64] {
        self.velocity.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nesterov look-ahead: `W += μv`.
    pub fn pre_step(&self, layers: &mut [Layer]) {
        if let Optimizer::Nesterov { momentum } = self.optimizer {
            debug_assert_eq!(self.velocity.len(), layers.len());
            for (layer, v) in layers.iter_mut().zip(&self.velocity) {
                layer.add_scaled(v, momentum);
            }
        }
    }

    /// `v = μv + update` for momentum optimizers; no-op for SGD.
    pub fn update_velocity(&mut self, update: &Gradients) {
        let momentum = match self.optimizer {
            Optimizer::Sgd => return,
            Optimizer::Momentum { momentum } | Optimizer::Nesterov { momentum } => momentum,
        };

        assert_eq!(
            self.velocity.len(),
            update.num_layers(),
            "velocity has {} layers, update has {}",
            self.velocity.len(),
            update.num_layers()
        );
        for (k, v) in self.velocity.iter_mut().enumerate() {
            let u = update.layer(k);
            debug_assert_eq!(v.len(), u.len());
            for (vi, &ui) in v.iter_mut().zip(u) {
                *vi = momentum.mul_add(*vi, ui);
            }
        }
    }

    /// Apply the step to `layers`.
    pub fn update_position(&self, layers: &mut [Layer], update: &Gradients) {
        assert_eq!(
            layers.len(),
            update.num_layers(),
            "model has {} layers, update has {}",
            layers.len(),
            update.num_layers()
        );

        match self.optimizer {
            Optimizer::Momentum { .. } => {
                for (layer, v) in layers.iter_mut().zip(&self.velocity) {
                    layer.add_scaled(v, 1.0);
                }
            }
            Optimizer::Sgd | Optimizer::Nesterov { .. } => {
                for (k, layer) in layers.iter_mut().enumerate() {
                    layer.add_scaled(update.layer(k), 1.0);
                }
            }
        }
    }
}
