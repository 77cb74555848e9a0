//! A toy trainer for simulated participants.

use anyhow::anyhow;
use rand::{rngs::StdRng, Rng, SeedableRng};

use fedround_core::model::{ParameterSet, Tensor};
use fedround_sdk::{TrainError, Trainer};

/// Pulls every parameter towards the mean of the batch with plain gradient steps on the
/// squared error.
#[derive(Debug, Clone, Copy)]
pub struct MeanSeeker {
    /// The step size.
    pub learning_rate: f64,
}

impl Trainer for MeanSeeker {
    type Batch = Vec<f64>;

    fn train_on_batch(
        &mut self,
        params: &mut ParameterSet,
        batch: &Vec<f64>,
    ) -> Result<(), TrainError> {
        if batch.is_empty() {
            return Err(anyhow!("empty batch"));
        }
        let target = batch.iter().sum::<f64>() / batch.len() as f64;
        for tensor in params.iter_mut() {
            step(tensor, target, self.learning_rate);
        }
        Ok(())
    }
}

fn step(tensor: &mut Tensor, target: f64, learning_rate: f64) {
    if let Some(data) = tensor.as_f32_mut() {
        for x in data {
            *x += (learning_rate * (target - f64::from(*x))) as f32;
        }
    } else if let Some(data) = tensor.as_f64_mut() {
        for x in data {
            *x += learning_rate * (target - *x);
        }
    }
}

/// Draws `batches` batches of `batch_size` samples around a participant specific center.
pub fn local_data(seed: u64, batches: usize, batch_size: usize) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let center = rng.gen_range(-1.0..1.0);
    (0..batches)
        .map(|_| {
            (0..batch_size)
                .map(|_| center + rng.gen_range(-0.1..0.1))
                .collect()
        })
        .collect()
}
