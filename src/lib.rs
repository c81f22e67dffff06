//! Training and inference kernel for bias-augmented feed-forward MLPs.
//!
//! `mlp-kernel` implements the per-example math of a dense network (forward pass,
//! backpropagation, loss) and a batch step that turns accumulated gradients into an
//! optimizer update. Parameters live behind the [`Model`] trait, so any container
//! with a chained layer stack and three optimizer hooks can be trained. [`Mlp`] is
//! the crate's own container, backed by SGD, momentum or Nesterov state.
//!
//! # Panics vs `Result`
//!
//! Two layers of API:
//!
//! - Low-level hot path (panics on misuse):
//!   - [`feed_forward`], [`back_propagate`], [`loss::loss`]
//!     Shape mismatches are programmer error and panic via `assert!`.
//!
//! - High-level entry points (shape-checked):
//!   - [`Trainer::loss_and_update_model`], [`Trainer::gradient_in_place`],
//!     [`Trainer::loss_and_gradient`], [`predict`], [`predict_into`]
//!     These validate inputs and return [`Result`]. A failed call leaves the model
//!     untouched.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f64`.
//! - Layer `k` is a row-major `(in_dim + 1, out_dim)` matrix. Row 0 holds the bias;
//!   rows `1..` hold the weights, so `net[k + 1] = Wᵀ · o[k]` with `o[k][0] == 1`.
//! - A [`Batch`] stores inputs `(len, input_dim)` and targets `(len, target_dim)` as
//!   flat row-major buffers.
//!
//! # Logging
//!
//! The crate emits through the [`log`] facade: `debug!` per training step, `trace!`
//! per finalized update and `warn!` when a batch loss is not finite. Install any
//! logger (for example `env_logger`) in the binary to see them.
//!
//! # Quick start
//!
//! ```rust
//! use mlp_kernel::{Activation, Batch, MlpBuilder, PredictMode, TrainConfig};
//!
//! # fn main() -> mlp_kernel::Result<()> {
//! let xs = vec![
//!     vec![0.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![1.0, 0.0],
//!     vec![1.0, 1.0],
//! ];
//! let ys = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 1.0], vec![1.0, 0.0]];
//! let batch = Batch::from_rows(&xs, &ys)?;
//!
//! let mut mlp = MlpBuilder::new(2)?
//!     .hidden(8)?
//!     .activation(Activation::Tanh)
//!     .classifier(2)?
//!     .build_with_seed(0)?;
//!
//! let mut trainer = mlp.trainer(TrainConfig { lambda: 1e-4 })?;
//! for _ in 0..100 {
//!     trainer.loss_and_update_model(&mut mlp, &batch, 0.5)?;
//! }
//!
//! let class = mlp_kernel::predict(&mlp, &[1.0, 0.0], PredictMode::ClassIndex)?;
//! assert_eq!(class.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Allocation-free evaluation (advanced)
//!
//! The hot path works on caller-owned buffers. Allocate them once and reuse:
//!
//! ```rust
//! use mlp_kernel::{Activation, Mlp, Task, back_propagate, feed_forward};
//!
//! # fn main() -> mlp_kernel::Result<()> {
//! let mlp = Mlp::new_with_seed(&[3, 8, 2], Activation::Tanh, Task::Regression, 0)?;
//! let mut trace = mlp.trace();
//! let mut deltas = mlp.deltas();
//!
//! let x = [0.1, -0.2, 0.3];
//! let y = [0.0, 1.0];
//! feed_forward(&mlp, &x, &mut trace);
//! let estimate = trace.output().to_vec();
//! back_propagate(&mlp, &y, &estimate, &trace, &mut deltas);
//! let _err = mlp_kernel::loss::loss(&y, &estimate, false);
//! # Ok(())
//! # }
//! ```
//!
//! # MSRV
//!
//! The minimum supported Rust version is specified in `Cargo.toml`.

pub mod activation;
pub mod backward;
pub mod builder;
pub mod data;
pub mod error;
pub mod forward;
pub mod layer;
pub mod loss;
pub(crate) mod matmul;
pub mod mlp;
pub mod model;
pub mod optim;
pub mod predict;
pub mod scratch;
pub mod train;

pub use activation::Activation;
pub use backward::back_propagate;
pub use builder::MlpBuilder;
pub use data::Batch;
pub use error::{Error, Result};
pub use forward::{feed_forward, softmax_in_place};
pub use layer::{Init, Layer};
pub use loss::Loss;
pub use mlp::Mlp;
pub use model::{Model, Task};
pub use optim::{Optimizer, OptimizerState};
pub use predict::{PredictMode, argmax, collapse, predict, predict_into};
pub use scratch::{Deltas, Gradients, Trace};
pub use train::{TrainConfig, Trainer, batch_loss, example_loss};
