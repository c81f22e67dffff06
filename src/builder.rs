//! Model builder.
//!
//! `MlpBuilder` is the recommended way to define a concrete [`Mlp`]. All hidden
//! layers share one activation; the output layer is always affine (plus softmax for
//! classification). The initializer follows the activation:
//!
//! - `tanh` / `sigmoid`: Xavier/Glorot
//! - `relu`: He/Kaiming

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Activation, Error, Init, Layer, Mlp, Optimizer, Result, Task};

#[derive(Debug, Clone)]
/// Builder for an `Mlp`.
///
/// ```rust
/// use mlp_kernel::{Activation, MlpBuilder, Optimizer};
///
/// # fn main() -> mlp_kernel::Result<()> {
/// let mlp = MlpBuilder::new(4)?
///     .hidden(8)?
///     .hidden(8)?
///     .activation(Activation::Relu)
///     .optimizer(Optimizer::Nesterov { momentum: 0.9 })
///     .classifier(3)?
///     .build_with_seed(0)?;
/// # Ok(())
/// # }
/// ```
pub struct MlpBuilder {
    input_dim: usize,
    hidden: Vec<usize>,
    activation: Activation,
    optimizer: Optimizer,
    output: Option<(usize, Task)>,
}

impl MlpBuilder {
    /// Start building an MLP that accepts inputs of length `input_dim`.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            input_dim,
            hidden: Vec::new(),
            activation: Activation::default(),
            optimizer: Optimizer::default(),
            output: None,
        })
    }

    /// Append a hidden layer with `units` outputs.
    pub fn hidden(mut self, units: usize) -> Result<Self> {
        if units == 0 {
            return Err(Error::InvalidConfig(
                "hidden layer units must be > 0".to_owned(),
            ));
        }
        self.hidden.push(units);
        Ok(self)
    }

    /// Hidden-layer activation (default: tanh).
    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Optimizer behind the model's hooks (default: plain SGD).
    pub fn optimizer(mut self, optimizer: Optimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Softmax output over `classes` units.
    pub fn classifier(self, classes: usize) -> Result<Self> {
        self.output(classes, Task::Classification)
    }

    /// Linear output with `outputs` units.
    pub fn regressor(self, outputs: usize) -> Result<Self> {
        self.output(outputs, Task::Regression)
    }

    fn output(mut self, units: usize, task: Task) -> Result<Self> {
        if units == 0 {
            return Err(Error::InvalidConfig(
                "output layer units must be > 0".to_owned(),
            ));
        }
        self.output = Some((units, task));
        Ok(self)
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Mlp> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Mlp> {
        let (out_dim, task) = self.output.ok_or_else(|| {
            Error::InvalidConfig("an output layer (classifier or regressor) is required".to_owned())
        })?;
        self.optimizer.validate()?;

        let init = default_init_for_activation(self.activation);
        let mut layers = Vec::with_capacity(self.hidden.len() + 1);
        let mut in_dim = self.input_dim;
        for units in self.hidden.iter().copied().chain(std::iter::once(out_dim)) {
            layers.push(Layer::new_with_rng(in_dim, units, init, rng)?);
            in_dim = units;
        }

        Mlp::from_parts(layers, self.activation, task, self.optimizer)
    }
}

#[inline]
pub(crate) fn default_init_for_activation(act: Activation) -> Init {
    match act {
        Activation::Tanh | Activation::Sigmoid => Init::Xavier,
        Activation::Relu => Init::He,
    }
}
