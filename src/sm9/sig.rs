//! The SM9 signature system (GB/T 38635.2).
//!
//! The master public point of this system is `Ppub-s = [ks]P2`. A user's
//! signing key is the G1 point `ds = [ks * (H1(id || 0x01) + ks)^-1]P1`.
//! Signing combines a fresh scalar `r` with the pairing value
//! `g = e(P1, Ppub-s)`: `w = g^r`, `h = H2(digest || w)`, `S = [(r - h)]ds`.
//! Verification recomputes `w' = e(S, [H1(id || 0x01)]P2 + Ppub-s) * g^h` and
//! accepts iff `H2(digest || w') == h` — an exact algebraic equality.

use core::fmt;

use alloc::vec::Vec;
use rand::{CryptoRng, RngCore};
use sm9_core::{pairing, Fr, G1, G2, Group, Gt};

use crate::codec::{self, Reader};
use crate::sm9::{
    self, hash, MasterSecret, PublicParameters, G1_BYTES, HID_SIGN, SCALAR_BYTES,
};
use crate::{Codec, Error};

/// Required digest length in bytes (an SM3 digest of the message).
pub const DIGEST_BYTES: usize = 32;

/// Serialized signature size: SEQUENCE { h, S }.
pub const SIGNATURE_BYTES: usize = 2 + (2 + SCALAR_BYTES) + (2 + G1_BYTES);

/// A user's signing key, bound to exactly one identity.
#[derive(Clone, PartialEq)]
pub struct UserSecretKey {
    pub(crate) ds: G1,
}

impl fmt::Debug for UserSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sig::UserSecretKey(..)")
    }
}

/// An SM9 signature: the scalar `h` and the G1 point `S`.
///
/// Carries no identity reference; the identity is supplied out-of-band to
/// [`verify`].
#[derive(Clone, PartialEq)]
pub struct Signature {
    pub(crate) h: Fr,
    pub(crate) s: G1,
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Signature(..)")
    }
}

/// Extracts the signing key for an identity.
pub fn extract_user_secret_key(
    params: &PublicParameters,
    msk: &MasterSecret,
    id: &[u8],
) -> Result<UserSecretKey, Error> {
    let sm9::CurveId::Sm9Bn256V1 = params.curve;
    let t2 = sm9::extract_scalar(msk, id, HID_SIGN)?;
    Ok(UserSecretKey { ds: G1::one() * t2 })
}

/// Signs a 32-byte message digest.
pub fn sign<R: RngCore + CryptoRng>(
    params: &PublicParameters,
    usk: &UserSecretKey,
    digest: &[u8],
    rng: &mut R,
) -> Result<Signature, Error> {
    if digest.len() != DIGEST_BYTES {
        return Err(Error::InvalidDigestLength);
    }
    let g = pairing(G1::one(), params.ppub_s);

    loop {
        let r = sm9::rand_fr(rng);
        if let Some((h, l)) = sign_scalars(&g, digest, r)? {
            return Ok(Signature { h, s: usk.ds * l });
        }
        // l = (r - h) mod N was zero; redraw r.
    }
}

/// Computes `(h, l)` for a fixed `r`; `None` when `l` degenerates to zero.
fn sign_scalars(g: &Gt, digest: &[u8], r: Fr) -> Result<Option<(Fr, Fr)>, Error> {
    let w = g.pow(r);
    let h = hash::h2(digest, &w.to_slice())?;
    let l = r - h;
    if l.is_zero() {
        Ok(None)
    } else {
        Ok(Some((h, l)))
    }
}

/// Verifies a signature over a 32-byte digest for the given identity.
pub fn verify(
    params: &PublicParameters,
    digest: &[u8],
    sig: &Signature,
    id: &[u8],
) -> Result<(), Error> {
    if digest.len() != DIGEST_BYTES {
        return Err(Error::InvalidDigestLength);
    }
    sm9::check_id(id)?;
    if sig.h.is_zero() || sig.s.is_zero() {
        return Err(Error::InvalidSignature);
    }

    let g = pairing(G1::one(), params.ppub_s);
    let t = g.pow(sig.h);

    let h1 = hash::h1(id, HID_SIGN)?;
    let p = G2::one() * h1 + params.ppub_s;
    if p.is_zero() {
        return Err(Error::ZeroId);
    }

    let u = pairing(sig.s, p);
    let w = u * t;
    let h2 = hash::h2(digest, &w.to_slice())?;

    if h2 == sig.h {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}

/// Flat-buffer form of [`sign`]: writes the encoded signature into `out`.
///
/// An undersized (e.g. empty) buffer reports [`Error::BufferTooSmall`] with
/// the required length before anything is written.
pub fn sign_into<R: RngCore + CryptoRng>(
    params: &PublicParameters,
    usk: &UserSecretKey,
    digest: &[u8],
    rng: &mut R,
    out: &mut [u8],
) -> Result<usize, Error> {
    if out.len() < SIGNATURE_BYTES {
        return Err(Error::BufferTooSmall {
            needed: SIGNATURE_BYTES,
        });
    }
    let sig = sign(params, usk, digest, rng)?;
    let bytes = sig.to_bytes();
    out[..bytes.len()].copy_from_slice(&bytes);
    Ok(bytes.len())
}

/// Flat-buffer form of [`verify`]: consumes an encoded signature.
pub fn verify_bytes(
    params: &PublicParameters,
    digest: &[u8],
    sig: &[u8],
    id: &[u8],
) -> Result<(), Error> {
    // A structurally broken signature verifies exactly like a wrong one.
    let sig = Signature::from_bytes(sig).map_err(|_| Error::InvalidSignature)?;
    verify(params, digest, &sig, id)
}

impl Codec for UserSecretKey {
    fn to_bytes(&self) -> Vec<u8> {
        let mut content = Vec::new();
        codec::write_octet_string(&mut content, &sm9::g1_to_bytes(&self.ds));
        codec::wrap_sequence(&content)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(bytes);
        let mut seq = r.read_sequence()?;
        r.finish()?;
        let ds = sm9::g1_from_bytes(seq.read_octet_string()?)?;
        seq.finish()?;
        if ds.is_zero() {
            return Err(Error::InvalidKey);
        }
        Ok(UserSecretKey { ds })
    }
}

impl Codec for Signature {
    fn to_bytes(&self) -> Vec<u8> {
        let mut content = Vec::new();
        codec::write_octet_string(&mut content, &self.h.to_slice());
        codec::write_octet_string(&mut content, &sm9::g1_to_bytes(&self.s));
        codec::wrap_sequence(&content)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(bytes);
        let mut seq = r.read_sequence()?;
        r.finish()?;
        let h_bytes: [u8; SCALAR_BYTES] = seq.read_octet_array()?;
        let s = sm9::g1_from_bytes(seq.read_octet_string()?)?;
        seq.finish()?;

        let h = Fr::from_slice(&h_bytes).ok_or(Error::InvalidInput)?;
        Ok(Signature { h, s })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sm9::CurveId;
    use hex_literal::hex;

    const ID: &[u8] = b"Alice";

    fn default_setup() -> (PublicParameters, MasterSecret, UserSecretKey) {
        let mut rng = rand::thread_rng();
        let (params, msk) = sm9::setup(CurveId::Sm9Bn256V1, &mut rng).unwrap();
        let usk = extract_user_secret_key(&params, &msk, ID).unwrap();
        (params, msk, usk)
    }

    fn digest_of(msg: &[u8]) -> [u8; DIGEST_BYTES] {
        use sm3::{Digest, Sm3};
        Sm3::digest(msg).into()
    }

    #[test]
    fn sign_verify_round_trip() {
        let mut rng = rand::thread_rng();
        let (params, _, usk) = default_setup();
        let digest = digest_of(b"message");

        let sig = sign(&params, &usk, &digest, &mut rng).unwrap();
        verify(&params, &digest, &sig, ID).unwrap();
    }

    #[test]
    fn signatures_are_randomized() {
        let mut rng = rand::thread_rng();
        let (params, _, usk) = default_setup();
        let digest = digest_of(b"message");

        let a = sign(&params, &usk, &digest, &mut rng).unwrap();
        let b = sign(&params, &usk, &digest, &mut rng).unwrap();
        assert_ne!(a.to_bytes(), b.to_bytes());
        verify(&params, &digest, &a, ID).unwrap();
        verify(&params, &digest, &b, ID).unwrap();
    }

    #[test]
    fn rejects_wrong_digest_identity_and_tampered_signature() {
        let mut rng = rand::thread_rng();
        let (params, _, usk) = default_setup();
        let digest = digest_of(b"message");
        let sig = sign(&params, &usk, &digest, &mut rng).unwrap();

        // Flipped digest bit.
        let mut bad = digest;
        bad[0] ^= 1;
        assert_eq!(verify(&params, &bad, &sig, ID), Err(Error::InvalidSignature));

        // Wrong identity.
        assert_eq!(
            verify(&params, &digest, &sig, b"Bob"),
            Err(Error::InvalidSignature)
        );

        // Every flipped signature byte must fail (structurally or on the
        // equation), never verify.
        let bytes = sig.to_bytes();
        for i in 2..bytes.len() {
            let mut corrupt = bytes.clone();
            corrupt[i] ^= 1;
            assert!(verify_bytes(&params, &digest, &corrupt, ID).is_err());
        }
    }

    #[test]
    fn rejects_bad_digest_length() {
        let mut rng = rand::thread_rng();
        let (params, _, usk) = default_setup();
        assert_eq!(
            sign(&params, &usk, b"short", &mut rng),
            Err(Error::InvalidDigestLength)
        );
    }

    #[test]
    fn signature_round_trips_through_codec() {
        let mut rng = rand::thread_rng();
        let (params, _, usk) = default_setup();
        let digest = digest_of(b"message");
        let sig = sign(&params, &usk, &digest, &mut rng).unwrap();

        let bytes = sig.to_bytes();
        assert_eq!(bytes.len(), SIGNATURE_BYTES);
        let sig2 = Signature::from_bytes(&bytes).unwrap();
        assert_eq!(sig, sig2);

        let usk2 = UserSecretKey::from_bytes(&usk.to_bytes()).unwrap();
        assert_eq!(usk, usk2);
    }

    #[test]
    fn sign_into_reports_required_length() {
        let mut rng = rand::thread_rng();
        let (params, _, usk) = default_setup();
        let digest = digest_of(b"message");

        assert_eq!(
            sign_into(&params, &usk, &digest, &mut rng, &mut []),
            Err(Error::BufferTooSmall {
                needed: SIGNATURE_BYTES
            })
        );

        let mut buf = [0u8; SIGNATURE_BYTES];
        let n = sign_into(&params, &usk, &digest, &mut rng, &mut buf).unwrap();
        assert_eq!(n, SIGNATURE_BYTES);
        verify_bytes(&params, &digest, &buf[..n], ID).unwrap();
    }

    // GM/T 0044.2 Annex A: master key ks, deterministic r, message
    // "Chinese IBS standard", identity "Alice".
    #[test]
    fn signature_example_from_standard() {
        let ks = Fr::from_slice(&hex!(
            "000130e78459d78545cb54c587e02cf480ce0b66340f319f348a1d5b1f2dc5f4"
        ))
        .unwrap();
        let msk = MasterSecret { ks };
        let params = PublicParameters {
            curve: CurveId::Sm9Bn256V1,
            ppub_s: G2::one() * ks,
            ppub_e: G1::one() * ks,
        };
        let usk = extract_user_secret_key(&params, &msk, ID).unwrap();

        let r = Fr::from_slice(&hex!(
            "00033c8616b06704813203dfd00965022ed15975c662337aed648835dc4b1cbe"
        ))
        .unwrap();
        let g = pairing(G1::one(), params.ppub_s);
        let message = b"Chinese IBS standard";

        let (h, l) = sign_scalars(&g, message, r).unwrap().unwrap();
        assert_eq!(
            h.to_slice(),
            hex!("823c4b21e4bd2dfe1ed92c606653e996668563152fc33f55d7bfbb9bd9705adb")
        );

        // The resulting signature must satisfy the verification equation for
        // the standard's message, taken here as the raw H2 input.
        let sig = Signature { h, s: usk.ds * l };
        let p = G2::one() * hash::h1(ID, HID_SIGN).unwrap() + params.ppub_s;
        let w = pairing(sig.s, p) * g.pow(sig.h);
        assert_eq!(hash::h2(message, &w.to_slice()).unwrap(), sig.h);
    }
}
