//! Batch gradient aggregation and the optimizer step.
//!
//! The aggregator runs forward + backward for every row of a batch, accumulates the
//! outer products `o[k] ⊗ delta[k]` per layer, and finally turns the sum into the
//! update handed to the model's hooks:
//!
//! ```text
//! update[k] = -stepsize * grad[k] / rows + λ·W̃[k]
//! ```
//!
//! where `W̃[k]` is `W[k]` with its bias row zeroed.

use log::{debug, trace, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::matmul::gemm_f64;
use crate::model::validate_layers;
use crate::{
    Batch, Deltas, Error, Gradients, Layer, Loss, Model, Result, Trace, back_propagate,
    feed_forward,
};

/// Rows per work unit when accumulating in parallel.
#[cfg(feature = "rayon")]
pub const PAR_CHUNK_ROWS: usize = 64;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Training hyperparameters that stay fixed for a whole run.
///
/// A [`Trainer`] captures its config at construction; build a new trainer to change
/// it.
pub struct TrainConfig {
    /// L2 regularization coefficient. Never applied to bias rows.
    pub lambda: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self { lambda: 0.0 }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "lambda must be finite and >= 0, got {}",
                self.lambda
            )));
        }
        Ok(())
    }
}

/// Reusable buffers for training a specific model shape.
///
/// Steady-state training reuses the trace, deltas and gradients across rows and
/// batches.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainConfig,
    trace: Trace,
    deltas: Deltas,
    grads: Gradients,
}

impl Trainer {
    pub fn new<M: Model + ?Sized>(model: &M, config: TrainConfig) -> Result<Self> {
        config.validate()?;
        validate_layers(model.layers())?;
        Ok(Self {
            config,
            trace: Trace::new(model),
            deltas: Deltas::new(model),
            grads: Gradients::new(model),
        })
    }

    #[inline]
    pub fn config(&self) -> TrainConfig {
        self.config
    }

    /// Update produced by the most recent `loss_and_gradient` call.
    #[inline]
    pub fn gradients(&self) -> &Gradients {
        &self.grads
    }

    /// One training step on `batch`. Returns the batch's total (unnormalized) loss.
    ///
    /// Order of operations:
    /// 1. `model.momentum_pre_step()`
    /// 2. gradient + update at the (possibly look-ahead) position
    /// 3. `model.update_velocity(update)`
    /// 4. `model.update_position(update)`
    ///
    /// Nothing is mutated if validation fails.
    pub fn loss_and_update_model<M: Model + ?Sized>(
        &mut self,
        model: &mut M,
        batch: &Batch,
        stepsize: f64,
    ) -> Result<f64> {
        self.check(model, batch, stepsize)?;

        model.momentum_pre_step();
        let total = self.loss_and_gradient(&*model, batch, stepsize)?;
        self.apply(model, batch.len(), stepsize, total);
        Ok(total)
    }

    /// Single-example step: the example becomes a one-row batch.
    pub fn gradient_in_place<M: Model + ?Sized>(
        &mut self,
        model: &mut M,
        input: &[f64],
        target: &[f64],
        stepsize: f64,
    ) -> Result<f64> {
        let batch = Batch::single(input, target)?;
        self.loss_and_update_model(model, &batch, stepsize)
    }

    /// Accumulates the batch gradient and converts it into an update, stored in
    /// [`Trainer::gradients`]. Returns the batch's total (unnormalized) loss.
    ///
    /// The model is only read.
    pub fn loss_and_gradient<M: Model + ?Sized>(
        &mut self,
        model: &M,
        batch: &Batch,
        stepsize: f64,
    ) -> Result<f64> {
        self.check(model, batch, stepsize)?;

        self.grads.fill_zero();
        let total = accumulate_rows(
            model,
            batch,
            0..batch.len(),
            &mut self.trace,
            &mut self.deltas,
            &mut self.grads,
        );
        finalize_update(
            model.layers(),
            &mut self.grads,
            batch.len(),
            stepsize,
            self.config.lambda,
        );
        Ok(total)
    }

    /// Like [`Trainer::loss_and_gradient`], with rows split into chunks of
    /// [`PAR_CHUNK_ROWS`] processed in parallel.
    ///
    /// Partial gradients are summed in chunk order, so the result is reproducible
    /// run to run.
    #[cfg(feature = "rayon")]
    pub fn par_loss_and_gradient<M: Model + Sync + ?Sized>(
        &mut self,
        model: &M,
        batch: &Batch,
        stepsize: f64,
    ) -> Result<f64> {
        use rayon::prelude::*;

        self.check(model, batch, stepsize)?;

        let starts: Vec<usize> = (0..batch.len()).step_by(PAR_CHUNK_ROWS).collect();
        let partials: Vec<(f64, Gradients)> = starts
            .par_iter()
            .map(|&start| {
                let end = (start + PAR_CHUNK_ROWS).min(batch.len());
                let mut trace = Trace::new(model);
                let mut deltas = Deltas::new(model);
                let mut grads = Gradients::new(model);
                let loss = accumulate_rows(
                    model,
                    batch,
                    start..end,
                    &mut trace,
                    &mut deltas,
                    &mut grads,
                );
                (loss, grads)
            })
            .collect();

        self.grads.fill_zero();
        let mut total = 0.0_f64;
        for (loss, grads) in &partials {
            total += loss;
            self.grads.add_assign(grads);
        }

        finalize_update(
            model.layers(),
            &mut self.grads,
            batch.len(),
            stepsize,
            self.config.lambda,
        );
        Ok(total)
    }

    /// Parallel counterpart of [`Trainer::loss_and_update_model`].
    #[cfg(feature = "rayon")]
    pub fn par_loss_and_update_model<M: Model + Sync + ?Sized>(
        &mut self,
        model: &mut M,
        batch: &Batch,
        stepsize: f64,
    ) -> Result<f64> {
        self.check(model, batch, stepsize)?;

        model.momentum_pre_step();
        let total = self.par_loss_and_gradient(&*model, batch, stepsize)?;
        self.apply(model, batch.len(), stepsize, total);
        Ok(total)
    }

    fn apply<M: Model + ?Sized>(&self, model: &mut M, rows: usize, stepsize: f64, total: f64) {
        model.update_velocity(&self.grads);
        model.update_position(&self.grads);

        if !total.is_finite() {
            warn!("non-finite batch loss {total} over {rows} rows (stepsize {stepsize})");
        }
        debug!("train step: rows={rows} loss={total} stepsize={stepsize}");
    }

    fn check<M: Model + ?Sized>(&self, model: &M, batch: &Batch, stepsize: f64) -> Result<()> {
        if !(stepsize.is_finite() && stepsize > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "stepsize must be finite and > 0, got {stepsize}"
            )));
        }
        if batch.is_empty() {
            return Err(Error::InvalidData("batch must not be empty".to_owned()));
        }
        if batch.input_dim() != model.input_dim() {
            return Err(Error::shape(
                "batch input width",
                batch.input_dim(),
                model.input_dim(),
            ));
        }
        if batch.target_dim() != model.output_dim() {
            return Err(Error::shape(
                "batch target width",
                batch.target_dim(),
                model.output_dim(),
            ));
        }

        let layers = model.layers();
        if !(self.trace.fits(layers) && self.deltas.fits(layers) && self.grads.fits(layers)) {
            return Err(Error::InvalidConfig(
                "trainer buffers were built for a different model shape".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Forward + backward over `rows`, adding `o[k] ⊗ delta[k]` into `grads` and
/// returning the summed loss.
fn accumulate_rows<M: Model + ?Sized>(
    model: &M,
    batch: &Batch,
    rows: std::ops::Range<usize>,
    trace: &mut Trace,
    deltas: &mut Deltas,
    grads: &mut Gradients,
) -> f64 {
    let loss_fn = Loss::for_task(model.task());
    let mut total = 0.0_f64;

    for i in rows {
        let input = batch.input(i);
        let target = batch.target(i);

        feed_forward(model, input, trace);
        back_propagate(model, target, trace.output(), trace, deltas);

        for (k, layer) in model.layers().iter().enumerate() {
            add_outer_product(layer, trace.o(k), deltas.get(k), grads.layer_mut(k));
        }

        total += loss_fn.forward(target, trace.output());
    }

    total
}

/// `grad += lower ⊗ delta`, shaped `(rows, out_dim)` like `layer`.
#[inline]
fn add_outer_product(layer: &Layer, lower: &[f64], delta: &[f64], grad: &mut [f64]) {
    debug_assert_eq!(lower.len(), layer.rows());
    debug_assert_eq!(delta.len(), layer.out_dim());
    debug_assert_eq!(grad.len(), layer.coeffs().len());

    let out = layer.out_dim();
    gemm_f64(
        layer.rows(),
        out,
        1,
        1.0,
        lower,
        1,
        1,
        delta,
        out,
        1,
        1.0,
        grad,
        out,
        1,
    );
}

/// Turns summed gradients into the update `-stepsize * grad / rows + λ·W̃`.
fn finalize_update(
    layers: &[Layer],
    grads: &mut Gradients,
    rows: usize,
    stepsize: f64,
    lambda: f64,
) {
    let inv_rows = 1.0 / rows as f64;

    for (k, layer) in layers.iter().enumerate() {
        let out = grads.out_dim(k);
        let g = grads.layer_mut(k);
        let (g_bias, g_weights) = g.split_at_mut(out);

        for gi in g_bias {
            *gi = -stepsize * (*gi * inv_rows);
        }
        for (gi, &w) in g_weights.iter_mut().zip(layer.weight_rows()) {
            *gi = lambda.mul_add(w, -stepsize * *gi * inv_rows);
        }
    }

    trace!("finalized update: layers={} rows={rows} lambda={lambda}", layers.len());
}

/// Forward pass + loss for one example.
pub fn example_loss<M: Model + ?Sized>(model: &M, input: &[f64], target: &[f64]) -> Result<f64> {
    validate_layers(model.layers())?;
    if input.len() != model.input_dim() {
        return Err(Error::shape("input", input.len(), model.input_dim()));
    }
    if target.len() != model.output_dim() {
        return Err(Error::shape("target", target.len(), model.output_dim()));
    }

    let mut trace = Trace::new(model);
    let output = feed_forward(model, input, &mut trace);
    Ok(Loss::for_task(model.task()).forward(target, output))
}

/// Summed per-example loss over a batch, without touching the model.
pub fn batch_loss<M: Model + ?Sized>(model: &M, batch: &Batch) -> Result<f64> {
    validate_layers(model.layers())?;
    if batch.is_empty() {
        return Err(Error::InvalidData("batch must not be empty".to_owned()));
    }
    if batch.input_dim() != model.input_dim() {
        return Err(Error::shape(
            "batch input width",
            batch.input_dim(),
            model.input_dim(),
        ));
    }
    if batch.target_dim() != model.output_dim() {
        return Err(Error::shape(
            "batch target width",
            batch.target_dim(),
            model.output_dim(),
        ));
    }

    let loss_fn = Loss::for_task(model.task());
    let mut trace = Trace::new(model);
    let mut total = 0.0_f64;
    for (input, target) in batch.rows() {
        let output = feed_forward(model, input, &mut trace);
        total += loss_fn.forward(target, output);
    }
    Ok(total)
}

/// One-shot training step that allocates its own [`Trainer`].
pub fn loss_and_update_model<M: Model + ?Sized>(
    model: &mut M,
    batch: &Batch,
    stepsize: f64,
    config: TrainConfig,
) -> Result<f64> {
    Trainer::new(&*model, config)?.loss_and_update_model(model, batch, stepsize)
}

/// One-shot single-example training step.
pub fn gradient_in_place<M: Model + ?Sized>(
    model: &mut M,
    input: &[f64],
    target: &[f64],
    stepsize: f64,
    config: TrainConfig,
) -> Result<f64> {
    Trainer::new(&*model, config)?.gradient_in_place(model, input, target, stepsize)
}

/// One-shot aggregation: returns the total loss and the update without applying it.
pub fn loss_and_gradient<M: Model + ?Sized>(
    model: &M,
    batch: &Batch,
    stepsize: f64,
    config: TrainConfig,
) -> Result<(f64, Gradients)> {
    let mut trainer = Trainer::new(model, config)?;
    let total = trainer.loss_and_gradient(model, batch, stepsize)?;
    Ok((total, trainer.grads))
}
