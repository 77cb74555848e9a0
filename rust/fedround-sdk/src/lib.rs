#![cfg_attr(docsrs, feature(doc_cfg))]
//! This crate provides the participant side of a fedround federated learning round.
//!
//! In every round a [`Participant`]:
//!
//! 1. receives the global model the coordinator signed and checks the signature against the
//!    public key of the coordinator,
//! 2. trains its copy of the model on local data through a [`Trainer`],
//! 3. encodes the trained parameters and signs them with its own key.
//!
//! ```
//! use fedround_core::{
//!     crypto::{ByteObject, SigningKeyPair},
//!     model::{BinaryCodec, ParameterCodec, ParameterSet, Tensor},
//! };
//! use fedround_sdk::{Participant, Phase, TrainError, Trainer};
//!
//! /// Moves every parameter by the value of the batch.
//! struct Shift;
//!
//! impl Trainer for Shift {
//!     type Batch = f64;
//!
//!     fn train_on_batch(
//!         &mut self,
//!         params: &mut ParameterSet,
//!         batch: &f64,
//!     ) -> Result<(), TrainError> {
//!         params.iter_mut().for_each(|tensor| tensor.add_scalar(*batch));
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = SigningKeyPair::generate();
//! let global = ParameterSet::new(vec![Tensor::from_f32(vec![2], vec![1.0, 2.0])?]);
//! let payload = BinaryCodec.encode(&global);
//! let signature = coordinator.secret.sign_detached(&payload);
//!
//! let mut participant = Participant::new("alice")?;
//! participant.receive_global_model(&payload, signature.as_slice(), &coordinator.public)?;
//! participant.train_local_model(&mut Shift, &[0.5, 0.5], 1)?;
//! assert_eq!(participant.phase(), Phase::Trained);
//!
//! let update = participant.compose_update()?;
//! assert!(update.verify(&participant.public_key()));
//! # Ok(())
//! # }
//! ```

mod participant;
mod traits;

pub use self::{
    participant::{Participant, ParticipantError, Phase},
    traits::{TrainError, Trainer},
};
