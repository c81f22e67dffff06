//! Trains a small 3-class classifier with Nesterov momentum.
//!
//! Run with `RUST_LOG=debug cargo run --example train_step` to see per-step logs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mlp_kernel::{
    Activation, Batch, MlpBuilder, Optimizer, PredictMode, TrainConfig, batch_loss, predict,
};

fn main() -> mlp_kernel::Result<()> {
    env_logger::init();

    // Three uniform blobs in 2D.
    let mut rng = StdRng::seed_from_u64(0);
    let centers = [[-1.0, -1.0], [1.0, -1.0], [0.0, 1.0]];
    let per_class = 64;
    let mut xs = Vec::with_capacity(3 * per_class);
    let mut ys = Vec::with_capacity(3 * per_class);
    for (class, center) in centers.iter().enumerate() {
        for _ in 0..per_class {
            xs.push(vec![
                center[0] + rng.gen_range(-0.3..0.3),
                center[1] + rng.gen_range(-0.3..0.3),
            ]);
            let mut one_hot = vec![0.0; 3];
            one_hot[class] = 1.0;
            ys.push(one_hot);
        }
    }
    let batch = Batch::from_rows(&xs, &ys)?;

    let mut mlp = MlpBuilder::new(2)?
        .hidden(16)?
        .activation(Activation::Relu)
        .optimizer(Optimizer::Nesterov { momentum: 0.9 })
        .classifier(3)?
        .build_with_seed(0)?;
    let mut trainer = mlp.trainer(TrainConfig { lambda: 1e-4 })?;

    for step in 0..200 {
        let loss = trainer.loss_and_update_model(&mut mlp, &batch, 0.05)?;
        if step % 20 == 0 {
            println!("step={step} loss={:.4}", loss / batch.len() as f64);
        }
    }

    let mut correct = 0;
    for (x, y) in batch.rows() {
        let class = predict(&mlp, x, PredictMode::ClassIndex)?[0] as usize;
        if y[class] == 1.0 {
            correct += 1;
        }
    }
    println!(
        "final loss={:.4} accuracy={:.3}",
        batch_loss(&mlp, &batch)? / batch.len() as f64,
        correct as f64 / batch.len() as f64
    );

    Ok(())
}
