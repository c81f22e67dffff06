//! The parameter-container contract.
//!
//! The kernel never owns model parameters. It reads layer matrices and the two
//! selectors through [`Model`], and mutates parameters only through the three
//! optimizer hooks. Any optimizer (plain SGD, momentum, Nesterov, Adam, ...) can sit
//! behind these hooks without the kernel noticing.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Activation, Gradients, Layer};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
/// What the output layer produces.
pub enum Task {
    /// Softmax probabilities, trained with element-wise cross-entropy.
    Classification,
    /// Raw affine outputs, trained with squared error.
    #[default]
    Regression,
}

/// A feed-forward parameter container the kernel can train and evaluate.
///
/// Implementors must keep the layer stack chained:
/// `layers()[k + 1].in_dim() == layers()[k].out_dim()`.
pub trait Model {
    /// Layer matrices, input side first. Must not be empty.
    fn layers(&self) -> &[Layer];

    /// Hidden-layer activation.
    fn activation(&self) -> Activation;

    fn task(&self) -> Task;

    /// Move parameters to the look-ahead position before the gradient is taken
    /// (Nesterov). Containers without look-ahead leave this a no-op.
    fn momentum_pre_step(&mut self);

    /// Fold a finished update (already negated, scaled and regularized) into the
    /// optimizer's velocity.
    fn update_velocity(&mut self, update: &Gradients);

    /// Move parameters given the same update passed to `update_velocity`.
    fn update_position(&mut self, update: &Gradients);

    #[inline]
    fn num_layers(&self) -> usize {
        self.layers().len()
    }

    #[inline]
    fn is_classification(&self) -> bool {
        self.task() == Task::Classification
    }

    #[inline]
    fn input_dim(&self) -> usize {
        self.layers()
            .first()
            .map(Layer::in_dim)
            .unwrap_or_default()
    }

    #[inline]
    fn output_dim(&self) -> usize {
        self.layers()
            .last()
            .map(Layer::out_dim)
            .unwrap_or_default()
    }
}

/// Check that a layer stack is non-empty and chained.
pub fn validate_layers(layers: &[Layer]) -> crate::Result<()> {
    if layers.is_empty() {
        return Err(crate::Error::InvalidConfig(
            "model must have at least one layer".to_owned(),
        ));
    }
    for (k, pair) in layers.windows(2).enumerate() {
        if pair[1].in_dim() != pair[0].out_dim() {
            return Err(crate::Error::InvalidConfig(format!(
                "layer {} in_dim {} does not match layer {k} out_dim {}",
                k + 1,
                pair[1].in_dim(),
                pair[0].out_dim()
            )));
        }
    }
    Ok(())
}
