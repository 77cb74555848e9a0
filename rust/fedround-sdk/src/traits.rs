use fedround_core::model::ParameterSet;

/// An error raised by a [`Trainer`].
pub type TrainError = anyhow::Error;

#[cfg_attr(test, mockall::automock(type Batch = Vec<f32>;))]
/// A local optimizer.
///
/// The participant owns the model and the iteration over epochs and batches. A trainer only
/// applies one optimization step per batch, and it may keep its own state between steps, such
/// as momentum buffers.
pub trait Trainer {
    /// A batch of local training data.
    type Batch;

    /// Updates the parameters in place from one batch of local data.
    ///
    /// # Errors
    /// An error aborts the training. The participant discards every change made in the
    /// current call to [`Participant::train_local_model()`].
    ///
    /// [`Participant::train_local_model()`]: crate::Participant::train_local_model
    fn train_on_batch(
        &mut self,
        params: &mut ParameterSet,
        batch: &Self::Batch,
    ) -> Result<(), TrainError>;
}
