//! Wrappers around some of the [sodiumoxide] crypto primitives.
//!
//! The wrappers provide methods defined on structs instead of the sodiumoxide functions. This is
//! done for the `Ed25519` signature key pairs and their corresponding seeds as well as the `SHA256`
//! hash function.
//!
//! # Examples
//! ## Signing of messages
//! ```
//! # use fedround_core::crypto::SigningKeyPair;
//! let keys = SigningKeyPair::generate();
//! let message = b"Hello world!".to_vec();
//! let signature = keys.secret.sign_detached(&message);
//! assert!(keys.public.verify_detached(&signature, &message));
//! ```
//!
//! ## Verifying untrusted signature bytes
//! ```
//! # use fedround_core::crypto::SigningKeyPair;
//! let keys = SigningKeyPair::generate();
//! let message = b"Hello world!".to_vec();
//! // a truncated signature is rejected instead of panicking
//! assert!(!keys.public.verify_raw(&[0_u8; 12], &message));
//! ```
//!
//! [sodiumoxide]: https://docs.rs/sodiumoxide/

pub(crate) mod hash;
pub(crate) mod sign;

pub use self::{
    hash::Sha256,
    sign::{PublicSigningKey, SecretSigningKey, Signature, SigningKeyPair, SigningKeySeed},
};

/// An interface for slicing into cryptographic byte objects.
pub trait ByteObject: Sized {
    /// Length in bytes of this object
    const LENGTH: usize;

    /// Creates a new object with all the bytes initialized to `0`.
    fn zeroed() -> Self;

    /// Gets the object byte representation.
    fn as_slice(&self) -> &[u8];

    /// Creates an object from the given buffer.
    ///
    /// # Errors
    /// Returns `None` if the length of the byte-slice isn't equal to the length of the object.
    fn from_slice(bytes: &[u8]) -> Option<Self>;

    /// Creates an object from the given buffer.
    ///
    /// # Panics
    /// Panics if the length of the byte-slice isn't equal to the length of the object.
    fn from_slice_unchecked(bytes: &[u8]) -> Self {
        Self::from_slice(bytes).unwrap()
    }

    /// A helper for instantiating an object filled with the given value
    fn fill_with(value: u8) -> Self {
        Self::from_slice_unchecked(&vec![value; Self::LENGTH])
    }
}
