//! RFC 3394 key wrapping under SMS4.
//!
//! Wraps key material of at least two 64-bit halves into a blob one half
//! longer; the default integrity check value is the RFC's `0xA6` pattern.
//! Unwrapping verifies the recovered check value in constant time and fails
//! closed without releasing any output.

use alloc::vec::Vec;
use zeroize::Zeroize;

use crate::sms4::{Sms4Key, SMS4_BLOCK_SIZE, SMS4_KEY_LENGTH};
use crate::{util, Error};

/// The default initial value of RFC 3394 section 2.2.3.
pub const WRAP_DEFAULT_IV: [u8; 8] = [0xa6; 8];

const SEMIBLOCK: usize = 8;

fn check_keydata_len(len: usize) -> Result<usize, Error> {
    if len < 2 * SEMIBLOCK || len % SEMIBLOCK != 0 {
        return Err(Error::InvalidInput);
    }
    Ok(len / SEMIBLOCK)
}

/// Wraps `keydata` under `kek`. `keydata` must be a multiple of 8 bytes and
/// at least 16; the output is 8 bytes longer.
pub fn wrap_key(
    kek: &[u8; SMS4_KEY_LENGTH],
    icv: Option<&[u8; SEMIBLOCK]>,
    keydata: &[u8],
) -> Result<Vec<u8>, Error> {
    let n = check_keydata_len(keydata.len())?;
    let key = Sms4Key::new_encrypt(kek);

    let mut out = Vec::with_capacity(SEMIBLOCK + keydata.len());
    out.extend_from_slice(icv.unwrap_or(&WRAP_DEFAULT_IV));
    out.extend_from_slice(keydata);

    let mut block = [0u8; SMS4_BLOCK_SIZE];
    for j in 0..6 {
        for i in 1..=n {
            block[..SEMIBLOCK].copy_from_slice(&out[..SEMIBLOCK]);
            block[SEMIBLOCK..].copy_from_slice(&out[i * SEMIBLOCK..(i + 1) * SEMIBLOCK]);
            let b = key.encrypt_block(&block);

            let t = (n * j + i) as u64;
            out[..SEMIBLOCK].copy_from_slice(&b[..SEMIBLOCK]);
            for (a, t) in out[..SEMIBLOCK].iter_mut().zip(t.to_be_bytes()) {
                *a ^= t;
            }
            out[i * SEMIBLOCK..(i + 1) * SEMIBLOCK].copy_from_slice(&b[SEMIBLOCK..]);
        }
    }
    block.zeroize();
    Ok(out)
}

/// Unwraps `wrapped` under `kek`, verifying the integrity check value.
///
/// An integrity failure reports the uniform [`Error::InvalidSignature`] and
/// releases no key material.
pub fn unwrap_key(
    kek: &[u8; SMS4_KEY_LENGTH],
    icv: Option<&[u8; SEMIBLOCK]>,
    wrapped: &[u8],
) -> Result<Vec<u8>, Error> {
    if wrapped.len() < SEMIBLOCK {
        return Err(Error::InvalidInput);
    }
    let n = check_keydata_len(wrapped.len() - SEMIBLOCK)?;
    let key = Sms4Key::new_decrypt(kek);

    let mut out = wrapped.to_vec();
    let mut block = [0u8; SMS4_BLOCK_SIZE];
    for j in (0..6).rev() {
        for i in (1..=n).rev() {
            let t = (n * j + i) as u64;
            block[..SEMIBLOCK].copy_from_slice(&out[..SEMIBLOCK]);
            for (a, t) in block[..SEMIBLOCK].iter_mut().zip(t.to_be_bytes()) {
                *a ^= t;
            }
            block[SEMIBLOCK..].copy_from_slice(&out[i * SEMIBLOCK..(i + 1) * SEMIBLOCK]);
            let b = key.encrypt_block(&block);

            out[..SEMIBLOCK].copy_from_slice(&b[..SEMIBLOCK]);
            out[i * SEMIBLOCK..(i + 1) * SEMIBLOCK].copy_from_slice(&b[SEMIBLOCK..]);
        }
    }
    block.zeroize();

    let expected = icv.unwrap_or(&WRAP_DEFAULT_IV);
    if !util::ct_eq(&out[..SEMIBLOCK], expected) {
        out.zeroize();
        return Err(Error::InvalidSignature);
    }
    out.drain(..SEMIBLOCK);
    Ok(out)
}
