//! Standalone SM9 key encapsulation: wrap a fresh symmetric key to an
//! identity and recover it with the identity's decryption key.
//!
//! This is the KEM half of the hybrid scheme in [`enc`](crate::sm9::enc),
//! exposed on its own for callers that bring their own data encapsulation:
//! `C = [r]QB`, `K = KDF(C || w || id, klen)` with `w = e(Ppub-e, P2)^r`.

use core::fmt;

use alloc::vec::Vec;
use rand::{CryptoRng, RngCore};
use sm9_core::{pairing, G1, G2, Group};
use zeroize::Zeroizing;

use crate::codec::{self, Reader};
use crate::sm9::{self, enc, hash, PublicParameters, HID_ENCRYPT};
use crate::{Codec, Error};

/// The encapsulation point `C = [r]QB`, sent alongside the wrapped payload.
#[derive(Clone, PartialEq)]
pub struct EncappedKey(pub(crate) G1);

impl fmt::Debug for EncappedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncappedKey(..)")
    }
}

/// Wraps a fresh `key_len`-byte symmetric key to `id`.
///
/// Returns the derived key together with the encapsulation the recipient
/// needs to recover it. The derived key is zeroized on drop.
pub fn wrap_key<R: RngCore + CryptoRng>(
    params: &PublicParameters,
    id: &[u8],
    key_len: usize,
    rng: &mut R,
) -> Result<(Zeroizing<Vec<u8>>, EncappedKey), Error> {
    if key_len == 0 {
        return Err(Error::InvalidParameter);
    }
    sm9::check_id(id)?;
    let h1 = hash::h1(id, HID_ENCRYPT)?;
    let q = G1::one() * h1 + params.ppub_e;
    if q.is_zero() {
        return Err(Error::ZeroId);
    }
    let g = pairing(params.ppub_e, G2::one());

    loop {
        let r = sm9::rand_fr(rng);
        let c = q * r;
        let w = g.pow(r);

        let k = enc::kem_kdf(sm9::DigestAlg::Sm3, &c, &w, id, key_len)?;
        // An all-zero derivation is rejected by the standard; redraw r.
        if k.iter().all(|&b| b == 0) {
            continue;
        }
        return Ok((k, EncappedKey(c)));
    }
}

/// Recovers the symmetric key from an encapsulation.
pub fn unwrap_key(
    params: &PublicParameters,
    encapped: &EncappedKey,
    usk: &enc::UserSecretKey,
    id: &[u8],
    key_len: usize,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let sm9::CurveId::Sm9Bn256V1 = params.curve;
    if key_len == 0 {
        return Err(Error::InvalidParameter);
    }
    sm9::check_id(id)?;
    if encapped.0.is_zero() {
        return Err(Error::InvalidCiphertext);
    }

    let w = pairing(encapped.0, usk.de);
    let k = enc::kem_kdf(sm9::DigestAlg::Sm3, &encapped.0, &w, id, key_len)?;
    if k.iter().all(|&b| b == 0) {
        return Err(Error::KdfFailure);
    }
    Ok(k)
}

impl Codec for EncappedKey {
    fn to_bytes(&self) -> Vec<u8> {
        let mut content = Vec::new();
        codec::write_octet_string(&mut content, &sm9::g1_to_bytes(&self.0));
        codec::wrap_sequence(&content)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let parse = |bytes: &[u8]| -> Result<EncappedKey, Error> {
            let mut r = Reader::new(bytes);
            let mut seq = r.read_sequence()?;
            r.finish()?;
            let c = sm9::g1_from_bytes(seq.read_octet_string()?)?;
            seq.finish()?;
            Ok(EncappedKey(c))
        };
        parse(bytes).map_err(|_| Error::InvalidCiphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sm9::CurveId;

    const ID: &[u8] = b"Bob";

    fn default_setup() -> (PublicParameters, enc::UserSecretKey) {
        let mut rng = rand::thread_rng();
        let (params, msk) = sm9::setup(CurveId::Sm9Bn256V1, &mut rng).unwrap();
        let usk = enc::extract_user_secret_key(&params, &msk, ID).unwrap();
        (params, usk)
    }

    #[test]
    fn wrap_unwrap_round_trip() {
        let mut rng = rand::thread_rng();
        let (params, usk) = default_setup();

        for key_len in [1usize, 16, 32, 48, 100] {
            let (k, encapped) = wrap_key(&params, ID, key_len, &mut rng).unwrap();
            assert_eq!(k.len(), key_len);
            let k2 = unwrap_key(&params, &encapped, &usk, ID, key_len).unwrap();
            assert_eq!(&k[..], &k2[..]);
        }
    }

    #[test]
    fn wrap_is_randomized() {
        let mut rng = rand::thread_rng();
        let (params, _) = default_setup();

        let (ka, ca) = wrap_key(&params, ID, 32, &mut rng).unwrap();
        let (kb, cb) = wrap_key(&params, ID, 32, &mut rng).unwrap();
        assert_ne!(&ka[..], &kb[..]);
        assert_ne!(ca, cb);
    }

    #[test]
    fn wrong_identity_key_derives_different_secret() {
        let mut rng = rand::thread_rng();
        let (params, msk) = sm9::setup(CurveId::Sm9Bn256V1, &mut rng).unwrap();
        let usk = enc::extract_user_secret_key(&params, &msk, ID).unwrap();
        let other = enc::extract_user_secret_key(&params, &msk, b"Carol").unwrap();

        let (k, encapped) = wrap_key(&params, ID, 32, &mut rng).unwrap();
        let wrong = unwrap_key(&params, &encapped, &other, ID, 32).unwrap();
        assert_ne!(&k[..], &wrong[..]);
    }

    #[test]
    fn zero_length_key_is_rejected() {
        let mut rng = rand::thread_rng();
        let (params, usk) = default_setup();

        assert_eq!(
            wrap_key(&params, ID, 0, &mut rng).err(),
            Some(Error::InvalidParameter)
        );
        let (_, encapped) = wrap_key(&params, ID, 16, &mut rng).unwrap();
        assert_eq!(
            unwrap_key(&params, &encapped, &usk, ID, 0).err(),
            Some(Error::InvalidParameter)
        );
    }

    #[test]
    fn zero_point_is_rejected() {
        let (params, usk) = default_setup();
        let zero = EncappedKey(G1::zero());
        assert_eq!(
            unwrap_key(&params, &zero, &usk, ID, 32).err(),
            Some(Error::InvalidCiphertext)
        );
    }

    #[test]
    fn encapped_key_codec_round_trip() {
        let mut rng = rand::thread_rng();
        let (params, usk) = default_setup();

        let (k, encapped) = wrap_key(&params, ID, 32, &mut rng).unwrap();
        let bytes = encapped.to_bytes();
        let encapped2 = EncappedKey::from_bytes(&bytes).unwrap();
        assert_eq!(encapped, encapped2);
        let k2 = unwrap_key(&params, &encapped2, &usk, ID, 32).unwrap();
        assert_eq!(&k[..], &k2[..]);

        assert_eq!(
            EncappedKey::from_bytes(&bytes[..bytes.len() - 1]),
            Err(Error::InvalidCiphertext)
        );
    }
}
