//! Drives the kernel through a third-party `Model` implementation and checks that
//! parameters only move through the optimizer hooks, in order.

use mlp_kernel::{
    Activation, Batch, Gradients, Layer, Model, Task, TrainConfig, Trainer, feed_forward,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    PreStep,
    Velocity,
    Position,
}

/// Plain-SGD container that records every hook invocation.
struct Recording {
    layers: Vec<Layer>,
    calls: Vec<Call>,
    last_update: Option<Gradients>,
}

impl Recording {
    fn new() -> Self {
        let hidden = Layer::from_parts(2, 2, vec![0.1, -0.1, 0.2, 0.3, -0.4, 0.5]).unwrap();
        let output = Layer::from_parts(2, 1, vec![0.05, 0.6, -0.7]).unwrap();
        Self {
            layers: vec![hidden, output],
            calls: Vec::new(),
            last_update: None,
        }
    }
}

impl Model for Recording {
    fn layers(&self) -> &[Layer] {
        &self.layers
    }

    fn activation(&self) -> Activation {
        Activation::Tanh
    }

    fn task(&self) -> Task {
        Task::Regression
    }

    fn momentum_pre_step(&mut self) {
        self.calls.push(Call::PreStep);
    }

    fn update_velocity(&mut self, update: &Gradients) {
        self.calls.push(Call::Velocity);
        self.last_update = Some(update.clone());
    }

    fn update_position(&mut self, update: &Gradients) {
        self.calls.push(Call::Position);
        for (k, layer) in self.layers.iter_mut().enumerate() {
            layer.add_scaled(update.layer(k), 1.0);
        }
    }
}

#[test]
fn hooks_fire_once_per_step_in_order() {
    let mut model = Recording::new();
    let mut trainer = Trainer::new(&model, TrainConfig::default()).unwrap();
    let batch = Batch::single(&[1.0, 2.0], &[0.5]).unwrap();

    trainer.loss_and_update_model(&mut model, &batch, 0.1).unwrap();
    trainer.loss_and_update_model(&mut model, &batch, 0.1).unwrap();

    assert_eq!(
        model.calls,
        vec![
            Call::PreStep,
            Call::Velocity,
            Call::Position,
            Call::PreStep,
            Call::Velocity,
            Call::Position,
        ]
    );
}

#[test]
fn velocity_and_position_receive_the_same_update() {
    let mut model = Recording::new();
    let before = model.layers.clone();
    let mut trainer = Trainer::new(&model, TrainConfig { lambda: 0.2 }).unwrap();
    let batch = Batch::single(&[1.0, 2.0], &[0.5]).unwrap();

    trainer.loss_and_update_model(&mut model, &batch, 0.1).unwrap();

    let update = model.last_update.as_ref().unwrap();
    assert_eq!(update, trainer.gradients());
    for (k, (old, new)) in before.iter().zip(&model.layers).enumerate() {
        for ((o, n), u) in old.coeffs().iter().zip(new.coeffs()).zip(update.layer(k)) {
            assert!((n - o - u).abs() < 1e-15);
        }
    }
}

#[test]
fn loss_and_gradient_leaves_the_model_alone() {
    let model = Recording::new();
    let mut trainer = Trainer::new(&model, TrainConfig::default()).unwrap();
    let batch = Batch::single(&[1.0, 2.0], &[0.5]).unwrap();

    let total = trainer.loss_and_gradient(&model, &batch, 0.1).unwrap();
    assert!(total > 0.0);
    assert!(model.calls.is_empty());
}

#[test]
fn failed_validation_fires_no_hooks() {
    let mut model = Recording::new();
    let mut trainer = Trainer::new(&model, TrainConfig::default()).unwrap();
    let bad = Batch::single(&[1.0, 2.0, 3.0], &[0.5]).unwrap();

    assert!(trainer.loss_and_update_model(&mut model, &bad, 0.1).is_err());
    assert!(model.calls.is_empty());

    let mut trace = mlp_kernel::Trace::new(&model);
    let out = feed_forward(&model, &[1.0, 2.0], &mut trace);
    assert_eq!(out.len(), 1);
}
