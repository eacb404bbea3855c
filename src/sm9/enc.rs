//! The SM9 public-key encryption system (GB/T 38635.4): a hybrid KEM+DEM.
//!
//! The master public point of this system is `Ppub-e = [ks]P1`; a user's
//! decryption key is the G2 point `de = [ks * (H1(id || 0x03) + ks)^-1]P2`.
//! Encryption encapsulates to `C1 = [r]([H1(id || 0x03)]P1 + Ppub-e)`,
//! expands `w = e(Ppub-e, P2)^r` through the KDF into DEM and MAC key
//! material, produces `C2` with the configured symmetric cipher and
//! authenticates it as `C3 = MAC(K2, C2)`. Decryption recomputes `w` as
//! `e(C1, de)` (bilinearity), verifies the MAC in constant time and only
//! then decrypts.

use core::fmt;

use alloc::vec::Vec;
use arrayref::array_ref;
use hmac::{Hmac, Mac};
use rand::{CryptoRng, RngCore};
use sm3::Sm3;
use sm9_core::{pairing, G1, G2, Group, Gt};
use zeroize::Zeroizing;

use crate::codec::{self, Reader};
use crate::sm9::{
    self, hash, DigestAlg, MasterSecret, PublicParameters, G1_BYTES, HID_ENCRYPT,
};
use crate::sms4::{self, Sms4Key, SMS4_BLOCK_SIZE, SMS4_KEY_LENGTH};
use crate::{util, Codec, Error};

type HmacSm3 = Hmac<Sm3>;

/// Block ciphers recognized for the cipher-based MAC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockCipherAlg {
    /// SMS4 (GB/T 32907).
    Sms4,
}

/// Symmetric ciphers recognized for the DEM payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncCipher {
    /// The standard's stream construction: the plaintext XORed with KDF
    /// output of equal length.
    Xor,
    /// SMS4 in CBC mode with PKCS#7 padding; key and IV come from the KDF.
    Sms4Cbc,
    /// SMS4 in CTR mode; key and initial counter come from the KDF.
    Sms4Ctr,
}

/// MAC constructions recognized for the integrity tag `C3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MacAlg {
    /// CBC-MAC under a block cipher: zero IV, zero padding, final block.
    CbcMac(BlockCipherAlg),
    /// HMAC under a digest.
    Hmac(DigestAlg),
}

/// Per-call configuration of the hybrid scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncParameters {
    /// Digest used by the key derivation function.
    pub kdf_md: DigestAlg,
    /// Symmetric cipher for the DEM payload.
    pub enc_cipher: EncCipher,
    /// MAC over the DEM payload.
    pub mac: MacAlg,
}

impl EncParameters {
    /// The recommended configuration: SM3 KDF, SMS4-CBC payload, SMS4
    /// CBC-MAC.
    pub const fn recommended() -> Self {
        EncParameters {
            kdf_md: DigestAlg::Sm3,
            enc_cipher: EncCipher::Sms4Cbc,
            mac: MacAlg::CbcMac(BlockCipherAlg::Sms4),
        }
    }

    /// DEM key and IV widths for a plaintext of `msg_len` bytes.
    fn dem_layout(&self, msg_len: usize) -> (usize, usize) {
        match self.enc_cipher {
            EncCipher::Xor => (msg_len, 0),
            EncCipher::Sms4Cbc | EncCipher::Sms4Ctr => (SMS4_KEY_LENGTH, SMS4_BLOCK_SIZE),
        }
    }

    fn mac_key_len(&self) -> usize {
        match self.mac {
            MacAlg::CbcMac(BlockCipherAlg::Sms4) => SMS4_KEY_LENGTH,
            MacAlg::Hmac(md) => md.output_len(),
        }
    }

    fn mac_tag_len(&self) -> usize {
        match self.mac {
            MacAlg::CbcMac(BlockCipherAlg::Sms4) => SMS4_BLOCK_SIZE,
            MacAlg::Hmac(md) => md.output_len(),
        }
    }

    /// Length of `C2` for a plaintext of `msg_len` bytes.
    fn c2_len(&self, msg_len: usize) -> usize {
        match self.enc_cipher {
            EncCipher::Xor | EncCipher::Sms4Ctr => msg_len,
            // PKCS#7 always pads, up to a whole extra block.
            EncCipher::Sms4Cbc => (msg_len / SMS4_BLOCK_SIZE + 1) * SMS4_BLOCK_SIZE,
        }
    }

    /// Checks that an incoming `C2`/`C3` pair is structurally possible under
    /// this configuration.
    fn check_ciphertext(&self, c2: &[u8], c3: &[u8]) -> Result<(), Error> {
        if c3.len() != self.mac_tag_len() {
            return Err(Error::InvalidCiphertext);
        }
        if let EncCipher::Sms4Cbc = self.enc_cipher {
            if c2.is_empty() || c2.len() % SMS4_BLOCK_SIZE != 0 {
                return Err(Error::InvalidCiphertext);
            }
        }
        Ok(())
    }

    fn mac(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
        match self.mac {
            MacAlg::CbcMac(BlockCipherAlg::Sms4) => {
                if key.len() != SMS4_KEY_LENGTH {
                    return Err(Error::InvalidKeyLength);
                }
                Ok(cbc_mac(array_ref![key, 0, SMS4_KEY_LENGTH], data).to_vec())
            }
            MacAlg::Hmac(DigestAlg::Sm3) => {
                let mut mac =
                    HmacSm3::new_from_slice(key).map_err(|_| Error::GenerateMacFailure)?;
                mac.update(data);
                Ok(mac.finalize().into_bytes().to_vec())
            }
        }
    }

    fn dem_encrypt(&self, key: &[u8], iv: &[u8], msg: &[u8]) -> Result<Vec<u8>, Error> {
        match self.enc_cipher {
            EncCipher::Xor => {
                let mut out = msg.to_vec();
                util::xor_in_place(&mut out, key);
                Ok(out)
            }
            EncCipher::Sms4Cbc => {
                let k = Sms4Key::new_encrypt(array_ref![key, 0, SMS4_KEY_LENGTH]);
                let padded = pkcs7_pad(msg);
                sms4::modes::cbc_encrypt(&k, array_ref![iv, 0, SMS4_BLOCK_SIZE], &padded)
            }
            EncCipher::Sms4Ctr => {
                let mut out = msg.to_vec();
                let mut ctr = sms4::modes::Ctr128::new(
                    array_ref![key, 0, SMS4_KEY_LENGTH],
                    *array_ref![iv, 0, SMS4_BLOCK_SIZE],
                );
                ctr.apply_keystream(&mut out);
                Ok(out)
            }
        }
    }

    fn dem_decrypt(&self, key: &[u8], iv: &[u8], c2: &[u8]) -> Result<Vec<u8>, Error> {
        match self.enc_cipher {
            EncCipher::Xor => {
                let mut out = c2.to_vec();
                util::xor_in_place(&mut out, key);
                Ok(out)
            }
            EncCipher::Sms4Cbc => {
                let k = Sms4Key::new_decrypt(array_ref![key, 0, SMS4_KEY_LENGTH]);
                let padded =
                    sms4::modes::cbc_decrypt(&k, array_ref![iv, 0, SMS4_BLOCK_SIZE], c2)?;
                pkcs7_unpad(&padded).map(<[u8]>::to_vec)
            }
            EncCipher::Sms4Ctr => {
                let mut out = c2.to_vec();
                let mut ctr = sms4::modes::Ctr128::new(
                    array_ref![key, 0, SMS4_KEY_LENGTH],
                    *array_ref![iv, 0, SMS4_BLOCK_SIZE],
                );
                ctr.apply_keystream(&mut out);
                Ok(out)
            }
        }
    }
}

/// CBC-MAC with zero IV and zero padding; the tag is the final CBC block.
fn cbc_mac(key: &[u8; SMS4_KEY_LENGTH], data: &[u8]) -> [u8; SMS4_BLOCK_SIZE] {
    let k = Sms4Key::new_encrypt(key);
    let mut state = [0u8; SMS4_BLOCK_SIZE];
    let mut chunks = data.chunks(SMS4_BLOCK_SIZE);
    loop {
        let mut block = [0u8; SMS4_BLOCK_SIZE];
        match chunks.next() {
            Some(chunk) => block[..chunk.len()].copy_from_slice(chunk),
            None if data.is_empty() => {}
            None => break,
        }
        util::xor_in_place(&mut state, &block);
        state = k.encrypt_block(&state);
        if data.is_empty() {
            break;
        }
    }
    state
}

fn pkcs7_pad(msg: &[u8]) -> Zeroizing<Vec<u8>> {
    let pad = SMS4_BLOCK_SIZE - msg.len() % SMS4_BLOCK_SIZE;
    let mut out = Zeroizing::new(Vec::with_capacity(msg.len() + pad));
    out.extend_from_slice(msg);
    out.resize(msg.len() + pad, pad as u8);
    out
}

fn pkcs7_unpad(padded: &[u8]) -> Result<&[u8], Error> {
    let pad = *padded.last().ok_or(Error::InvalidCiphertext)? as usize;
    if pad == 0 || pad > SMS4_BLOCK_SIZE || pad > padded.len() {
        return Err(Error::InvalidCiphertext);
    }
    let (msg, tail) = padded.split_at(padded.len() - pad);
    if tail.iter().any(|&b| b as usize != pad) {
        return Err(Error::InvalidCiphertext);
    }
    Ok(msg)
}

/// A user's decryption key, bound to exactly one identity.
#[derive(Clone, PartialEq)]
pub struct UserSecretKey {
    pub(crate) de: G2,
}

impl fmt::Debug for UserSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("enc::UserSecretKey(..)")
    }
}

/// An SM9 ciphertext: the encapsulation point `C1`, the DEM payload `C2` and
/// the MAC tag `C3`.
#[derive(Clone, PartialEq)]
pub struct Ciphertext {
    pub(crate) c1: G1,
    pub(crate) c2: Vec<u8>,
    pub(crate) c3: Vec<u8>,
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ciphertext")
            .field("c2_len", &self.c2.len())
            .field("c3_len", &self.c3.len())
            .finish()
    }
}

impl Ciphertext {
    /// Length of this ciphertext's canonical encoding.
    pub fn encoded_len(&self) -> usize {
        encoded_ciphertext_len(self.c2.len(), self.c3.len())
    }
}

fn encoded_ciphertext_len(c2_len: usize, c3_len: usize) -> usize {
    let content =
        codec::tlv_len(G1_BYTES) + codec::tlv_len(c2_len) + codec::tlv_len(c3_len);
    codec::tlv_len(content)
}

/// Extracts the decryption key for an identity.
pub fn extract_user_secret_key(
    params: &PublicParameters,
    msk: &MasterSecret,
    id: &[u8],
) -> Result<UserSecretKey, Error> {
    let sm9::CurveId::Sm9Bn256V1 = params.curve;
    let t2 = sm9::extract_scalar(msk, id, HID_ENCRYPT)?;
    Ok(UserSecretKey { de: G2::one() * t2 })
}

/// The encryptor's per-identity point `QB = [H1(id || 0x03)]P1 + Ppub-e`.
fn identity_point(params: &PublicParameters, id: &[u8]) -> Result<G1, Error> {
    sm9::check_id(id)?;
    let h1 = hash::h1(id, HID_ENCRYPT)?;
    let q = G1::one() * h1 + params.ppub_e;
    if q.is_zero() {
        return Err(Error::ZeroId);
    }
    Ok(q)
}

/// Derives `klen` bytes of key material from the encapsulation.
pub(crate) fn kem_kdf(
    md: DigestAlg,
    c1: &G1,
    w: &Gt,
    id: &[u8],
    klen: usize,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let c1_bytes = sm9::g1_to_bytes(c1);
    let w_bytes = w.to_slice();
    hash::kdf(md, &[&c1_bytes, &w_bytes, id], klen).map(Zeroizing::new)
}

/// Encrypts `msg` to the holder of `id`'s decryption key.
pub fn encrypt<R: RngCore + CryptoRng>(
    params: &PublicParameters,
    encparams: &EncParameters,
    id: &[u8],
    msg: &[u8],
    rng: &mut R,
) -> Result<Ciphertext, Error> {
    let q = identity_point(params, id)?;
    let g = pairing(params.ppub_e, G2::one());

    let (dem_key_len, iv_len) = encparams.dem_layout(msg.len());
    let klen = dem_key_len + iv_len + encparams.mac_key_len();

    loop {
        let r = sm9::rand_fr(rng);
        let c1 = q * r;
        let w = g.pow(r);

        let k = kem_kdf(encparams.kdf_md, &c1, &w, id, klen)?;
        let (k1, rest) = k.split_at(dem_key_len);
        let (iv, k2) = rest.split_at(iv_len);

        // The stream construction must not emit the plaintext unmasked.
        if encparams.enc_cipher == EncCipher::Xor
            && !k1.is_empty()
            && k1.iter().all(|&b| b == 0)
        {
            continue;
        }

        let c2 = encparams.dem_encrypt(k1, iv, msg)?;
        let c3 = encparams.mac(k2, &c2)?;
        return Ok(Ciphertext { c1, c2, c3 });
    }
}

/// Decrypts a ciphertext with the key extracted for `id`.
///
/// The MAC over `C2` is recomputed and compared in constant time before any
/// DEM decryption happens; a mismatch is reported as the uniform
/// [`Error::InvalidSignature`] regardless of where it occurred.
pub fn decrypt(
    params: &PublicParameters,
    encparams: &EncParameters,
    ct: &Ciphertext,
    usk: &UserSecretKey,
    id: &[u8],
) -> Result<Vec<u8>, Error> {
    let sm9::CurveId::Sm9Bn256V1 = params.curve;
    sm9::check_id(id)?;
    if ct.c1.is_zero() {
        return Err(Error::InvalidCiphertext);
    }
    encparams.check_ciphertext(&ct.c2, &ct.c3)?;

    let w = pairing(ct.c1, usk.de);

    let (dem_key_len, iv_len) = encparams.dem_layout(ct.c2.len());
    let klen = dem_key_len + iv_len + encparams.mac_key_len();
    let k = kem_kdf(encparams.kdf_md, &ct.c1, &w, id, klen)?;
    let (k1, rest) = k.split_at(dem_key_len);
    let (iv, k2) = rest.split_at(iv_len);

    let tag = encparams.mac(k2, &ct.c2)?;
    if !util::ct_eq(&tag, &ct.c3) {
        return Err(Error::InvalidSignature);
    }

    if encparams.enc_cipher == EncCipher::Xor
        && !k1.is_empty()
        && k1.iter().all(|&b| b == 0)
    {
        return Err(Error::KdfFailure);
    }

    encparams.dem_decrypt(k1, iv, &ct.c2)
}

/// [`encrypt`] with [`EncParameters::recommended`].
pub fn encrypt_with_recommended<R: RngCore + CryptoRng>(
    params: &PublicParameters,
    id: &[u8],
    msg: &[u8],
    rng: &mut R,
) -> Result<Ciphertext, Error> {
    encrypt(params, &EncParameters::recommended(), id, msg, rng)
}

/// [`decrypt`] with [`EncParameters::recommended`].
pub fn decrypt_with_recommended(
    params: &PublicParameters,
    ct: &Ciphertext,
    usk: &UserSecretKey,
    id: &[u8],
) -> Result<Vec<u8>, Error> {
    decrypt(params, &EncParameters::recommended(), ct, usk, id)
}

/// Length of the encoded ciphertext produced for a plaintext of `msg_len`
/// bytes under `encparams`.
pub fn ciphertext_len(encparams: &EncParameters, msg_len: usize) -> usize {
    encoded_ciphertext_len(encparams.c2_len(msg_len), encparams.mac_tag_len())
}

/// Flat-buffer form of [`encrypt`]: writes the encoded ciphertext into
/// `out`.
///
/// An undersized (e.g. empty) buffer reports [`Error::BufferTooSmall`] with
/// the required length before anything is written, so a call with an empty
/// buffer doubles as the length query.
pub fn encrypt_into<R: RngCore + CryptoRng>(
    params: &PublicParameters,
    encparams: &EncParameters,
    id: &[u8],
    msg: &[u8],
    rng: &mut R,
    out: &mut [u8],
) -> Result<usize, Error> {
    let needed = ciphertext_len(encparams, msg.len());
    if out.len() < needed {
        return Err(Error::BufferTooSmall { needed });
    }
    let ct = encrypt(params, encparams, id, msg, rng)?;
    let bytes = ct.to_bytes();
    debug_assert_eq!(bytes.len(), needed);
    out[..bytes.len()].copy_from_slice(&bytes);
    Ok(bytes.len())
}

/// Flat-buffer form of [`decrypt`]: consumes an encoded ciphertext and
/// writes the plaintext into `out`, returning the plaintext length.
///
/// The required capacity is bounded by the payload length of the encoded
/// ciphertext; the bound is checked before anything is written.
pub fn decrypt_into(
    params: &PublicParameters,
    encparams: &EncParameters,
    ct_bytes: &[u8],
    usk: &UserSecretKey,
    id: &[u8],
    out: &mut [u8],
) -> Result<usize, Error> {
    let ct = Ciphertext::from_bytes(ct_bytes)?;
    let needed = ct.c2.len();
    if out.len() < needed {
        return Err(Error::BufferTooSmall { needed });
    }
    let msg = decrypt(params, encparams, &ct, usk, id)?;
    out[..msg.len()].copy_from_slice(&msg);
    Ok(msg.len())
}

impl Codec for UserSecretKey {
    fn to_bytes(&self) -> Vec<u8> {
        let mut content = Vec::new();
        codec::write_octet_string(&mut content, &sm9::g2_to_bytes(&self.de));
        codec::wrap_sequence(&content)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(bytes);
        let mut seq = r.read_sequence()?;
        r.finish()?;
        let de = sm9::g2_from_bytes(seq.read_octet_string()?)?;
        seq.finish()?;
        if de.is_zero() {
            return Err(Error::InvalidKey);
        }
        Ok(UserSecretKey { de })
    }
}

impl Codec for Ciphertext {
    fn to_bytes(&self) -> Vec<u8> {
        let mut content = Vec::new();
        codec::write_octet_string(&mut content, &sm9::g1_to_bytes(&self.c1));
        codec::write_octet_string(&mut content, &self.c2);
        codec::write_octet_string(&mut content, &self.c3);
        codec::wrap_sequence(&content)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let parse = |bytes: &[u8]| -> Result<Ciphertext, Error> {
            let mut r = Reader::new(bytes);
            let mut seq = r.read_sequence()?;
            r.finish()?;
            let c1 = sm9::g1_from_bytes(seq.read_octet_string()?)?;
            let c2 = seq.read_octet_string()?.to_vec();
            let c3 = seq.read_octet_string()?.to_vec();
            seq.finish()?;
            Ok(Ciphertext { c1, c2, c3 })
        };
        parse(bytes).map_err(|_| Error::InvalidCiphertext)
    }
}
