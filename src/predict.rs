//! Inference.
//!
//! Classification models can collapse their probability vector into a one-hot
//! vector or a single class index; regression models always return the raw output.

use crate::model::validate_layers;
use crate::{Error, Model, Result, Trace, feed_forward};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Shape of a prediction.
pub enum PredictMode {
    /// The network output as-is (class probabilities for classification).
    #[default]
    Raw,
    /// 1 at the most probable class, 0 elsewhere.
    OneHot,
    /// A single element holding the most probable class index.
    ClassIndex,
}

/// Predict the output for one example, allocating a fresh trace.
pub fn predict<M: Model + ?Sized>(model: &M, input: &[f64], mode: PredictMode) -> Result<Vec<f64>> {
    validate_layers(model.layers())?;
    let mut trace = Trace::new(model);
    let mut out = match mode {
        PredictMode::ClassIndex if model.is_classification() => vec![0.0; 1],
        _ => vec![0.0; model.output_dim()],
    };
    predict_into(model, input, mode, &mut trace, &mut out)?;
    Ok(out)
}

/// Shape-safe, non-allocating inference.
///
/// `out` must have length 1 for `ClassIndex` on a classification model and
/// `model.output_dim()` otherwise.
pub fn predict_into<M: Model + ?Sized>(
    model: &M,
    input: &[f64],
    mode: PredictMode,
    trace: &mut Trace,
    out: &mut [f64],
) -> Result<()> {
    if input.len() != model.input_dim() {
        return Err(Error::shape("input", input.len(), model.input_dim()));
    }
    if !trace.fits(model.layers()) {
        return Err(Error::InvalidConfig(
            "trace was built for a different model shape".to_owned(),
        ));
    }
    let mode = if model.is_classification() {
        mode
    } else {
        PredictMode::Raw
    };
    let expected = match mode {
        PredictMode::ClassIndex => 1,
        PredictMode::Raw | PredictMode::OneHot => model.output_dim(),
    };
    if out.len() != expected {
        return Err(Error::shape("prediction buffer", out.len(), expected));
    }

    let output = feed_forward(model, input, trace);
    collapse_into(output, mode, out);
    Ok(())
}

/// Apply `mode` to a network output, returning a new vector.
pub fn collapse(output: &[f64], mode: PredictMode) -> Vec<f64> {
    let len = match mode {
        PredictMode::ClassIndex => 1,
        PredictMode::Raw | PredictMode::OneHot => output.len(),
    };
    let mut out = vec![0.0; len];
    collapse_into(output, mode, &mut out);
    out
}

/// Index of the largest entry; ties go to the first. Panics on empty input.
#[inline]
pub fn argmax(xs: &[f64]) -> usize {
    assert!(!xs.is_empty(), "argmax requires at least one entry");
    let mut best = 0;
    for (i, &x) in xs.iter().enumerate().skip(1) {
        if x > xs[best] {
            best = i;
        }
    }
    best
}

fn collapse_into(output: &[f64], mode: PredictMode, out: &mut [f64]) {
    match mode {
        PredictMode::Raw => out.copy_from_slice(output),
        PredictMode::OneHot => {
            out.fill(0.0);
            out[argmax(output)] = 1.0;
        }
        PredictMode::ClassIndex => out[0] = argmax(output) as f64,
    }
}
