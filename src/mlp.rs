use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::builder::default_init_for_activation;
use crate::model::validate_layers;
use crate::{
    Activation, Deltas, Error, Gradients, Layer, Model, Optimizer, OptimizerState, Result,
    Task, Trace, TrainConfig, Trainer,
};

/// The crate's own parameter container: a chained stack of bias-augmented layers,
/// one hidden activation, a task flag and the optimizer state behind the
/// [`Model`] hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    layers: Vec<Layer>,
    activation: Activation,
    task: Task,
    optimizer: OptimizerState,
}

impl Mlp {
    /// Random initialization from a sizes list (input, hidden..., output).
    pub fn new_with_seed(
        sizes: &[usize],
        activation: Activation,
        task: Task,
        seed: u64,
    ) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(Error::InvalidConfig(
                "sizes must include input and output dims".to_owned(),
            ));
        }
        if sizes.contains(&0) {
            return Err(Error::InvalidConfig(
                "all layer sizes must be > 0".to_owned(),
            ));
        }

        let init = default_init_for_activation(activation);
        let mut rng = StdRng::seed_from_u64(seed);
        let layers = sizes
            .windows(2)
            .map(|w| Layer::new_with_rng(w[0], w[1], init, &mut rng))
            .collect::<Result<Vec<_>>>()?;

        Self::from_parts(layers, activation, task, Optimizer::Sgd)
    }

    /// Assemble a model from explicit layers.
    pub fn from_parts(
        layers: Vec<Layer>,
        activation: Activation,
        task: Task,
        optimizer: Optimizer,
    ) -> Result<Self> {
        validate_layers(&layers)?;
        let optimizer = optimizer.state(&layers)?;
        Ok(Self {
            layers,
            activation,
            task,
            optimizer,
        })
    }

    /// Replace the optimizer, resetting its velocity.
    pub fn with_optimizer(mut self, optimizer: Optimizer) -> Result<Self> {
        self.optimizer = optimizer.state(&self.layers)?;
        Ok(self)
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    /// Direct parameter access, outside the training hooks.
    #[inline]
    pub fn layer_mut(&mut self, idx: usize) -> Option<&mut Layer> {
        self.layers.get_mut(idx)
    }

    #[inline]
    pub fn optimizer(&self) -> &OptimizerState {
        &self.optimizer
    }

    pub fn trace(&self) -> Trace {
        Trace::new(self)
    }

    pub fn deltas(&self) -> Deltas {
        Deltas::new(self)
    }

    pub fn gradients(&self) -> Gradients {
        Gradients::new(self)
    }

    /// Convenience constructor: allocate all training buffers.
    pub fn trainer(&self, config: TrainConfig) -> Result<Trainer> {
        Trainer::new(self, config)
    }
}

impl Model for Mlp {
    #[inline]
    fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[inline]
    fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    fn task(&self) -> Task {
        self.task
    }

    fn momentum_pre_step(&mut self) {
        self.optimizer.pre_step(&mut self.layers);
    }

    fn update_velocity(&mut self, update: &Gradients) {
        self.optimizer.update_velocity(update);
    }

    fn update_position(&mut self, update: &Gradients) {
        self.optimizer.update_position(&mut self.layers, update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::feed_forward;

    #[test]
    fn seeded_init_is_deterministic() {
        let a = Mlp::new_with_seed(&[2, 3, 1], Activation::Tanh, Task::Regression, 123).unwrap();
        let b = Mlp::new_with_seed(&[2, 3, 1], Activation::Tanh, Task::Regression, 123).unwrap();
        assert_eq!(a, b);

        let mut ta = a.trace();
        let mut tb = b.trace();
        let x = [0.3, -0.7];
        assert_eq!(
            feed_forward(&a, &x, &mut ta).to_vec(),
            feed_forward(&b, &x, &mut tb).to_vec()
        );
    }

    #[test]
    fn reports_dimensions_through_the_model_trait() {
        let mlp =
            Mlp::new_with_seed(&[4, 8, 8, 3], Activation::Relu, Task::Classification, 0).unwrap();
        assert_eq!(mlp.num_layers(), 3);
        assert_eq!(mlp.input_dim(), 4);
        assert_eq!(mlp.output_dim(), 3);
        assert!(mlp.is_classification());
        assert_eq!(mlp.layer(1).unwrap().rows(), 9);
    }

    #[test]
    fn rejects_bad_sizes_and_unchained_layers() {
        assert!(Mlp::new_with_seed(&[3], Activation::Tanh, Task::Regression, 0).is_err());
        assert!(Mlp::new_with_seed(&[3, 0, 1], Activation::Tanh, Task::Regression, 0).is_err());
        assert!(
            Mlp::from_parts(
                vec![Layer::new(2, 3), Layer::new(2, 1)],
                Activation::Tanh,
                Task::Regression,
                Optimizer::Sgd,
            )
            .is_err()
        );
        assert!(
            Mlp::from_parts(
                vec![Layer::new(2, 1)],
                Activation::Tanh,
                Task::Regression,
                Optimizer::Momentum { momentum: 2.0 },
            )
            .is_err()
        );
    }

    #[test]
    fn hooks_route_through_the_optimizer_state() {
        let mut mlp = Mlp::from_parts(
            vec![Layer::from_parts(1, 1, vec![0.0, 0.0]).unwrap()],
            Activation::Tanh,
            Task::Regression,
            Optimizer::Nesterov { momentum: 0.5 },
        )
        .unwrap();

        let mut update = mlp.gradients();
        update.layer_mut(0).copy_from_slice(&[1.0, 2.0]);

        mlp.momentum_pre_step();
        mlp.update_velocity(&update);
        mlp.update_position(&update);
        assert_eq!(mlp.layer(0).unwrap().coeffs(), &[1.0, 2.0]);

        // Second step: look-ahead moves by 0.5 * v before the update lands.
        mlp.momentum_pre_step();
        assert_eq!(mlp.layer(0).unwrap().coeffs(), &[1.5, 3.0]);
        mlp.update_velocity(&update);
        mlp.update_position(&update);
        assert_eq!(mlp.layer(0).unwrap().coeffs(), &[2.5, 5.0]);
        assert_eq!(mlp.optimizer().velocity(0), &[1.5, 3.0]);
    }
}
