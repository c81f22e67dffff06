//! Activation functions.
//!
//! Every hidden layer of a model shares one activation, chosen by the model's
//! selector. The output layer never uses it: its post-activation is either the raw
//! affine output (regression) or a softmax (classification).
//!
//! Derivatives are taken with respect to the *pre-activation* `net`, which is what the
//! forward pass caches in [`crate::Trace`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
/// Hidden-layer activation selector.
pub enum Activation {
    Relu,
    Sigmoid,
    #[default]
    Tanh,
}

impl Activation {
    /// Value of the activation at `x`.
    #[inline]
    pub fn forward(self, x: f64) -> f64 {
        match self {
            Activation::Relu => relu(x),
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
        }
    }

    /// Derivative of the activation at the pre-activation value `x`.
    ///
    /// The ReLU subgradient at 0 is taken as 0.
    #[inline]
    pub fn derivative(self, x: f64) -> f64 {
        match self {
            Activation::Relu => relu_derivative(x),
            Activation::Sigmoid => sigmoid_derivative(x),
            Activation::Tanh => tanh_derivative(x),
        }
    }

    /// Writes `activation(net[i])` into `out[i]`.
    ///
    /// The variant is resolved once, outside the element loop.
    #[inline]
    pub fn apply_into(self, net: &[f64], out: &mut [f64]) {
        assert_eq!(
            net.len(),
            out.len(),
            "net len {} does not match out len {}",
            net.len(),
            out.len()
        );
        let f = self.scalar();
        for (o, &x) in out.iter_mut().zip(net) {
            *o = f(x);
        }
    }

    /// Multiplies `out[i]` by `activation'(net[i])` in place.
    #[inline]
    pub fn scale_by_derivative(self, net: &[f64], out: &mut [f64]) {
        assert_eq!(
            net.len(),
            out.len(),
            "net len {} does not match out len {}",
            net.len(),
            out.len()
        );
        let df = self.scalar_derivative();
        for (o, &x) in out.iter_mut().zip(net) {
            *o *= df(x);
        }
    }

    #[inline]
    fn scalar(self) -> fn(f64) -> f64 {
        match self {
            Activation::Relu => relu,
            Activation::Sigmoid => sigmoid,
            Activation::Tanh => f64::tanh,
        }
    }

    #[inline]
    fn scalar_derivative(self) -> fn(f64) -> f64 {
        match self {
            Activation::Relu => relu_derivative,
            Activation::Sigmoid => sigmoid_derivative,
            Activation::Tanh => tanh_derivative,
        }
    }
}

#[inline]
fn relu(x: f64) -> f64 {
    if x > 0.0 { x } else { 0.0 }
}

#[inline]
fn relu_derivative(x: f64) -> f64 {
    if x > 0.0 { 1.0 } else { 0.0 }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    // Branch on sign so `exp` never overflows.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[inline]
fn sigmoid_derivative(x: f64) -> f64 {
    let s = sigmoid(x);
    s * (1.0 - s)
}

#[inline]
fn tanh_derivative(x: f64) -> f64 {
    let t = x.tanh();
    1.0 - t * t
}
