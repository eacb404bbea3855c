//! SM9 identity-based cryptography (GB/T 38635, GM/T 0044) and the SMS4 block
//! cipher (GB/T 32907) in Rust.
//!
//! The [`sm9`] module implements the identity-based scheme over the SM9 BN256
//! pairing-friendly curve (via the [`sm9_core`](https://crates.io/crates/sm9_core)
//! backend): domain setup, per-identity key extraction, hybrid KEM+DEM
//! encryption, a standalone key encapsulation, and signatures. The [`sms4`]
//! module implements the 32-round block cipher together with its modes of
//! operation, key wrap and the two-key EDE variant.
//!
//! # Examples
//!
//! ```
//! use gmsm::sm9::{self, CurveId};
//! use gmsm::sm9::enc::{self, EncParameters};
//!
//! const ID: &[u8] = b"Bob";
//! let mut rng = rand::thread_rng();
//!
//! // Generate domain parameters and the master secret of the key authority.
//! let (params, master) = sm9::setup(CurveId::Sm9Bn256V1, &mut rng).unwrap();
//!
//! // Extract a decryption key for an identity.
//! let usk = enc::extract_user_secret_key(&params, &master, ID).unwrap();
//!
//! // Anyone holding the public parameters can encrypt to the identity.
//! let ct = enc::encrypt(&params, &EncParameters::recommended(), ID, b"hello", &mut rng).unwrap();
//!
//! let pt = enc::decrypt(&params, &EncParameters::recommended(), &ct, &usk, ID).unwrap();
//! assert_eq!(&pt[..], b"hello");
//! ```

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(any(test, feature = "std"))]
extern crate std;

extern crate alloc;

use alloc::vec::Vec;

mod codec;
mod error;
mod util;

pub mod sm9;
pub mod sms4;

pub use crate::error::Error;

/// Values with a canonical byte encoding.
///
/// The encoding is a strict DER subset (definite, minimal-length TLV), so two
/// implementations encoding the same value produce byte-identical output.
pub trait Codec: Sized {
    /// Encodes this value to its canonical byte representation.
    fn to_bytes(&self) -> Vec<u8>;

    /// Decodes a value from its canonical byte representation.
    ///
    /// Rejects trailing data and non-minimal length encodings.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error>;
}
