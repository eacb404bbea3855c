//! The SM9 auxiliary functions H1, H2 and the counter-mode KDF (GB/T 38635.1).
//!
//! H1 and H2 expand their input through SM3 into a 320-bit integer and reduce
//! it into the range `[1, N-1]`, where N is the order of the SM9 groups. The
//! KDF is the same SM3 counter construction without the range reduction.

use alloc::vec::Vec;

use crypto_bigint::{Encoding, NonZero, U320};
use sm3::{Digest, Sm3};
use sm9_core::Fr;

use crate::Error;

/// Digest algorithms recognized for key derivation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DigestAlg {
    /// The SM3 digest (GB/T 32905), the algorithm the standard mandates.
    Sm3,
}

impl DigestAlg {
    /// Output size of the digest in bytes.
    pub fn output_len(self) -> usize {
        match self {
            DigestAlg::Sm3 => 32,
        }
    }
}

const H1_PREFIX: u8 = 0x01;
const H2_PREFIX: u8 = 0x02;

/// Width of the intermediate hash value of H1/H2 in bytes (320 bits).
const HA_BYTES: usize = 40;

/// N - 1 as a 320-bit integer, N the order of the SM9 BN256 groups.
const N_MINUS_ONE: U320 = U320::from_be_hex(
    "0000000000000000b640000002a3a6f1d603ab4ff58ec74449f2934b18ea8beee56ee19cd69ecf24",
);

/// The counter-mode key derivation function.
///
/// `chunks` are concatenated as the shared secret bit string Z. Fails with
/// [`Error::KdfFailure`] if `klen` exceeds the construction's capacity.
pub(crate) fn kdf(md: DigestAlg, chunks: &[&[u8]], klen: usize) -> Result<Vec<u8>, Error> {
    let DigestAlg::Sm3 = md;
    let v = md.output_len();

    if klen == 0 {
        return Ok(Vec::new());
    }
    let rounds = (klen + v - 1) / v;
    if rounds > u32::MAX as usize {
        return Err(Error::KdfFailure);
    }

    let mut out = Vec::with_capacity(rounds * v);
    for ct in 1..=rounds as u32 {
        let mut h = Sm3::new();
        for chunk in chunks {
            h.update(chunk);
        }
        h.update(ct.to_be_bytes());
        out.extend_from_slice(&h.finalize());
    }
    out.truncate(klen);
    Ok(out)
}

/// Expands `prefix || chunks...` into 320 bits and reduces into `[1, N-1]`.
fn hash_to_range(prefix: u8, chunks: &[&[u8]]) -> Result<Fr, Error> {
    let mut input: Vec<&[u8]> = Vec::with_capacity(chunks.len() + 1);
    let prefix = [prefix];
    input.push(&prefix);
    input.extend_from_slice(chunks);

    let ha = kdf(DigestAlg::Sm3, &input, HA_BYTES)?;
    let wide = U320::from_be_slice(&ha);

    let modulus: NonZero<U320> =
        Option::from(NonZero::new(N_MINUS_ONE)).ok_or(Error::HashFailure)?;
    let reduced = wide.rem(&modulus).wrapping_add(&U320::ONE);

    let bytes = reduced.to_be_bytes();
    Fr::from_slice(&bytes[HA_BYTES - 32..]).ok_or(Error::HashFailure)
}

/// H1: maps an identity and its function identifier into `[1, N-1]`.
pub(crate) fn h1(id: &[u8], hid: u8) -> Result<Fr, Error> {
    hash_to_range(H1_PREFIX, &[id, &[hid]])
}

/// H2: maps a message and a target-group element into `[1, N-1]`.
pub(crate) fn h2(message: &[u8], w: &[u8]) -> Result<Fr, Error> {
    hash_to_range(H2_PREFIX, &[message, w])
}
