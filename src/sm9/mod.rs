//! The SM9 identity-based scheme (GB/T 38635, GM/T 0044) over the SM9 BN256
//! pairing-friendly curve.
//!
//! One [`setup`] call produces the domain parameters and the key authority's
//! master secret as an inseparable pair. Per-identity keys are extracted in
//! [`sig`] (signature system, user keys on G1) and [`enc`] (encryption
//! system, user keys on G2); the two systems are separated by the standard's
//! fixed function identifiers `hid1 = 0x01` and `hid3 = 0x03`, so a key
//! extracted for one use can never stand in for the other.
//!
//! Pairing and group arithmetic come from the [`sm9_core`] backend; this
//! module only ever consumes its public contract.

use core::fmt;

use alloc::vec::Vec;
use rand::{CryptoRng, RngCore};
use sm9_core::{Fr, G1, G2, Group};

use crate::codec::{self, Reader};
use crate::{Codec, Error};

pub(crate) mod hash;

pub mod enc;
pub mod kem;
pub mod sig;

pub use hash::DigestAlg;

/// Maximum identity length in bytes.
pub const MAX_ID_LEN: usize = 65535;

/// Serialized size of a G1 element (uncompressed x || y).
pub const G1_BYTES: usize = 64;

/// Serialized size of a G2 element.
pub const G2_BYTES: usize = 128;

/// Serialized size of a target-group element.
pub const GT_BYTES: usize = 384;

/// Serialized size of a scalar.
pub const SCALAR_BYTES: usize = 32;

/// Function identifier of the signature system.
pub(crate) const HID_SIGN: u8 = 0x01;

/// Function identifier of the encryption system.
pub(crate) const HID_ENCRYPT: u8 = 0x03;

/// Named curves known to the registry.
///
/// Only `sm9bn256v1` carries a pairing; the other recognized names exist so
/// that "known curve, but not pairing-friendly" and "unknown name" are
/// distinguishable failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurveId {
    /// The 256-bit Barreto-Naehrig curve of GB/T 38635.
    Sm9Bn256V1,
}

impl CurveId {
    /// Resolves a curve name.
    ///
    /// Returns [`Error::InvalidCurve`] for a recognized curve without a
    /// pairing and [`Error::NotNamedCurve`] for an unknown name.
    pub fn by_name(name: &str) -> Result<Self, Error> {
        match name {
            "sm9bn256v1" => Ok(CurveId::Sm9Bn256V1),
            "sm2p256v1" | "secp256k1" | "prime256v1" => Err(Error::InvalidCurve),
            _ => Err(Error::NotNamedCurve),
        }
    }

    /// The registry name of this curve.
    pub fn name(self) -> &'static str {
        match self {
            CurveId::Sm9Bn256V1 => "sm9bn256v1",
        }
    }
}

/// Domain parameters shared by every participant.
///
/// Holds the signature-system master public point `Ppub-s = [ks]P2` and the
/// encryption-system master public point `Ppub-e = [ks]P1`. Immutable and
/// safely shared read-only across threads.
#[derive(Clone, PartialEq)]
pub struct PublicParameters {
    pub(crate) curve: CurveId,
    pub(crate) ppub_s: G2,
    pub(crate) ppub_e: G1,
}

impl PublicParameters {
    /// The curve these parameters were generated on.
    pub fn curve(&self) -> CurveId {
        self.curve
    }
}

impl fmt::Debug for PublicParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicParameters")
            .field("curve", &self.curve.name())
            .finish()
    }
}

/// The key authority's master secret.
///
/// Generated together with [`PublicParameters`] by [`setup`]; the pair never
/// diverges. Must never leave the issuing authority's process boundary.
#[derive(Clone, PartialEq)]
pub struct MasterSecret {
    pub(crate) ks: Fr,
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterSecret(..)")
    }
}

/// Generates domain parameters and the matching master secret.
pub fn setup<R: RngCore + CryptoRng>(
    curve: CurveId,
    rng: &mut R,
) -> Result<(PublicParameters, MasterSecret), Error> {
    let CurveId::Sm9Bn256V1 = curve;
    let ks = rand_fr(rng);

    Ok((
        PublicParameters {
            curve,
            ppub_s: G2::one() * ks,
            ppub_e: G1::one() * ks,
        },
        MasterSecret { ks },
    ))
}

/// Draws a uniformly random nonzero scalar.
pub(crate) fn rand_fr<R: RngCore + CryptoRng>(rng: &mut R) -> Fr {
    loop {
        let mut buf = [0u8; SCALAR_BYTES];
        rng.fill_bytes(&mut buf);
        if let Some(fr) = Fr::from_slice(&buf) {
            if !fr.is_zero() {
                return fr;
            }
        }
    }
}

pub(crate) fn check_id(id: &[u8]) -> Result<(), Error> {
    if id.is_empty() {
        return Err(Error::InvalidId);
    }
    if id.len() > MAX_ID_LEN {
        return Err(Error::InvalidIdLength);
    }
    Ok(())
}

/// The shared extraction step: `t2 = ks * (H1(id || hid) + ks)^-1`.
pub(crate) fn extract_scalar(msk: &MasterSecret, id: &[u8], hid: u8) -> Result<Fr, Error> {
    check_id(id)?;
    let h = hash::h1(id, hid)?;
    let t1 = h + msk.ks;
    if t1.is_zero() {
        return Err(Error::ZeroId);
    }
    let t2 = msk.ks * t1.inverse().ok_or(Error::ComputePairingFailure)?;
    Ok(t2)
}

pub(crate) fn g1_to_bytes(p: &G1) -> [u8; G1_BYTES] {
    p.to_slice()
}

pub(crate) fn g1_from_bytes(bytes: &[u8]) -> Result<G1, Error> {
    G1::from_slice(bytes).map_err(|_| Error::InvalidInput)
}

pub(crate) fn g2_to_bytes(p: &G2) -> [u8; G2_BYTES] {
    p.to_slice()
}

pub(crate) fn g2_from_bytes(bytes: &[u8]) -> Result<G2, Error> {
    G2::from_slice(bytes).map_err(|_| Error::InvalidInput)
}

impl Codec for PublicParameters {
    fn to_bytes(&self) -> Vec<u8> {
        let mut content = Vec::new();
        codec::write_octet_string(&mut content, self.curve.name().as_bytes());
        codec::write_octet_string(&mut content, &g1_to_bytes(&self.ppub_e));
        codec::write_octet_string(&mut content, &g2_to_bytes(&self.ppub_s));
        codec::wrap_sequence(&content)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(bytes);
        let mut seq = r.read_sequence()?;
        r.finish()?;

        let name = seq.read_octet_string()?;
        let name = core::str::from_utf8(name).map_err(|_| Error::ParsePairing)?;
        let curve = CurveId::by_name(name).map_err(|_| Error::ParsePairing)?;

        let ppub_e = g1_from_bytes(seq.read_octet_string()?)?;
        let ppub_s = g2_from_bytes(seq.read_octet_string()?)?;
        seq.finish()?;

        Ok(PublicParameters {
            curve,
            ppub_s,
            ppub_e,
        })
    }
}

impl Codec for MasterSecret {
    fn to_bytes(&self) -> Vec<u8> {
        let mut content = Vec::new();
        codec::write_octet_string(&mut content, &self.ks.to_slice());
        codec::wrap_sequence(&content)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(bytes);
        let mut seq = r.read_sequence()?;
        r.finish()?;
        let ks_bytes: [u8; SCALAR_BYTES] = seq.read_octet_array()?;
        seq.finish()?;

        let ks = Fr::from_slice(&ks_bytes).ok_or(Error::InvalidInput)?;
        if ks.is_zero() {
            return Err(Error::InvalidKey);
        }
        Ok(MasterSecret { ks })
    }
}
