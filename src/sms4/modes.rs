//! Modes of operation over the SMS4 block primitive.
//!
//! ECB and CBC are one-shot, whole-block functions. CFB-128, OFB-128 and
//! CTR-128 are stateful byte streams: a mode value carries its shift
//! register or counter plus an intra-block offset, so a stream can be
//! processed in arbitrary chunk sizes and resumed mid-block with identical
//! output.

use alloc::vec::Vec;
use zeroize::Zeroize;

use crate::sms4::{check_whole_blocks, Sms4Key, SMS4_BLOCK_SIZE, SMS4_KEY_LENGTH};
use crate::{util, Error};

/// ECB encryption. `data` must be a whole number of blocks.
pub fn ecb_encrypt(key: &Sms4Key, data: &[u8]) -> Result<Vec<u8>, Error> {
    check_whole_blocks(data)?;
    let mut out = data.to_vec();
    for chunk in out.chunks_exact_mut(SMS4_BLOCK_SIZE) {
        let block = key.encrypt_block(arrayref::array_ref![chunk, 0, SMS4_BLOCK_SIZE]);
        chunk.copy_from_slice(&block);
    }
    Ok(out)
}

/// ECB decryption; `key` must hold a decryption schedule.
pub fn ecb_decrypt(key: &Sms4Key, data: &[u8]) -> Result<Vec<u8>, Error> {
    ecb_encrypt(key, data)
}

/// CBC encryption. `data` must be a whole number of blocks; padding is the
/// caller's concern.
pub fn cbc_encrypt(
    key: &Sms4Key,
    iv: &[u8; SMS4_BLOCK_SIZE],
    data: &[u8],
) -> Result<Vec<u8>, Error> {
    check_whole_blocks(data)?;
    let mut out = data.to_vec();
    let mut chain = *iv;
    for chunk in out.chunks_exact_mut(SMS4_BLOCK_SIZE) {
        util::xor_in_place(chunk, &chain);
        chain = key.encrypt_block(arrayref::array_ref![chunk, 0, SMS4_BLOCK_SIZE]);
        chunk.copy_from_slice(&chain);
    }
    Ok(out)
}

/// CBC decryption; `key` must hold a decryption schedule.
pub fn cbc_decrypt(
    key: &Sms4Key,
    iv: &[u8; SMS4_BLOCK_SIZE],
    data: &[u8],
) -> Result<Vec<u8>, Error> {
    check_whole_blocks(data)?;
    let mut out = Vec::with_capacity(data.len());
    let mut chain = *iv;
    for chunk in data.chunks_exact(SMS4_BLOCK_SIZE) {
        let mut block = key.encrypt_block(arrayref::array_ref![chunk, 0, SMS4_BLOCK_SIZE]);
        util::xor_in_place(&mut block, &chain);
        out.extend_from_slice(&block);
        chain.copy_from_slice(chunk);
    }
    Ok(out)
}

/// CFB-128 stream state. Encryption and decryption differ, so both are
/// exposed; one value must be used for a single direction only.
pub struct Cfb128 {
    key: Sms4Key,
    iv: [u8; SMS4_BLOCK_SIZE],
    num: usize,
}

impl Drop for Cfb128 {
    fn drop(&mut self) {
        self.iv.zeroize();
    }
}

impl Cfb128 {
    pub fn new(key: &[u8; SMS4_KEY_LENGTH], iv: [u8; SMS4_BLOCK_SIZE]) -> Self {
        Cfb128 {
            key: Sms4Key::new_encrypt(key),
            iv,
            num: 0,
        }
    }

    /// Encrypts `data` in place, continuing the stream.
    pub fn encrypt(&mut self, data: &mut [u8]) {
        for byte in data {
            if self.num == 0 {
                self.iv = self.key.encrypt_block(&self.iv);
            }
            *byte ^= self.iv[self.num];
            // The shift register takes the ciphertext byte.
            self.iv[self.num] = *byte;
            self.num = (self.num + 1) % SMS4_BLOCK_SIZE;
        }
    }

    /// Decrypts `data` in place, continuing the stream.
    pub fn decrypt(&mut self, data: &mut [u8]) {
        for byte in data {
            if self.num == 0 {
                self.iv = self.key.encrypt_block(&self.iv);
            }
            let c = *byte;
            *byte ^= self.iv[self.num];
            self.iv[self.num] = c;
            self.num = (self.num + 1) % SMS4_BLOCK_SIZE;
        }
    }
}

/// OFB-128 stream state. The keystream is independent of the data, so one
/// operation serves both directions.
pub struct Ofb128 {
    key: Sms4Key,
    iv: [u8; SMS4_BLOCK_SIZE],
    num: usize,
}

impl Drop for Ofb128 {
    fn drop(&mut self) {
        self.iv.zeroize();
    }
}

impl Ofb128 {
    pub fn new(key: &[u8; SMS4_KEY_LENGTH], iv: [u8; SMS4_BLOCK_SIZE]) -> Self {
        Ofb128 {
            key: Sms4Key::new_encrypt(key),
            iv,
            num: 0,
        }
    }

    /// XORs the keystream into `data`, continuing the stream.
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data {
            if self.num == 0 {
                self.iv = self.key.encrypt_block(&self.iv);
            }
            *byte ^= self.iv[self.num];
            self.num = (self.num + 1) % SMS4_BLOCK_SIZE;
        }
    }
}

/// CTR-128 stream state with a big-endian counter over the full block.
pub struct Ctr128 {
    key: Sms4Key,
    counter: [u8; SMS4_BLOCK_SIZE],
    ecount: [u8; SMS4_BLOCK_SIZE],
    num: usize,
}

impl Drop for Ctr128 {
    fn drop(&mut self) {
        self.counter.zeroize();
        self.ecount.zeroize();
    }
}

impl Ctr128 {
    pub fn new(key: &[u8; SMS4_KEY_LENGTH], counter: [u8; SMS4_BLOCK_SIZE]) -> Self {
        Ctr128 {
            key: Sms4Key::new_encrypt(key),
            counter,
            ecount: [0u8; SMS4_BLOCK_SIZE],
            num: 0,
        }
    }

    /// XORs the keystream into `data`, continuing the stream. Serves both
    /// directions.
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for byte in data {
            if self.num == 0 {
                self.ecount = self.key.encrypt_block(&self.counter);
                increment_be(&mut self.counter);
            }
            *byte ^= self.ecount[self.num];
            self.num = (self.num + 1) % SMS4_BLOCK_SIZE;
        }
    }
}

/// Increments a big-endian counter block, wrapping at 2^128.
fn increment_be(counter: &mut [u8; SMS4_BLOCK_SIZE]) {
    for byte in counter.iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use rand::RngCore;

    fn random_key_iv() -> ([u8; SMS4_KEY_LENGTH], [u8; SMS4_BLOCK_SIZE]) {
        let mut rng = rand::thread_rng();
        let mut key = [0u8; SMS4_KEY_LENGTH];
        let mut iv = [0u8; SMS4_BLOCK_SIZE];
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut iv);
        (key, iv)
    }

    #[test]
    fn ecb_round_trip_and_block_check() {
        let (key, _) = random_key_iv();
        let enc = Sms4Key::new_encrypt(&key);
        let dec = Sms4Key::new_decrypt(&key);

        let msg = [0x42u8; 3 * SMS4_BLOCK_SIZE];
        let ct = ecb_encrypt(&enc, &msg).unwrap();
        assert_eq!(ecb_decrypt(&dec, &ct).unwrap(), msg);

        // Identical plaintext blocks leak through ECB.
        assert_eq!(&ct[..16], &ct[16..32]);

        assert_eq!(ecb_encrypt(&enc, &msg[..17]), Err(Error::InvalidInput));
    }

    #[test]
    fn cbc_round_trip_and_iv_sensitivity() {
        let (key, iv) = random_key_iv();
        let enc = Sms4Key::new_encrypt(&key);
        let dec = Sms4Key::new_decrypt(&key);

        let msg = [0x42u8; 3 * SMS4_BLOCK_SIZE];
        let ct = cbc_encrypt(&enc, &iv, &msg).unwrap();
        assert_eq!(cbc_decrypt(&dec, &iv, &ct).unwrap(), msg);

        // Chaining hides equal plaintext blocks.
        assert_ne!(&ct[..16], &ct[16..32]);

        let mut iv2 = iv;
        iv2[0] ^= 1;
        assert_ne!(cbc_encrypt(&enc, &iv2, &msg).unwrap(), ct);

        assert_eq!(cbc_encrypt(&enc, &iv, &msg[..1]), Err(Error::InvalidInput));
    }

    #[test]
    fn cfb_round_trip_any_length() {
        let (key, iv) = random_key_iv();
        let msg = b"an odd-length message crossing block boundaries";

        let mut data = msg.to_vec();
        Cfb128::new(&key, iv).encrypt(&mut data);
        assert_ne!(&data[..], &msg[..]);
        Cfb128::new(&key, iv).decrypt(&mut data);
        assert_eq!(&data[..], &msg[..]);
    }

    #[test]
    fn stream_modes_chunked_equals_one_shot() {
        let (key, iv) = random_key_iv();
        let mut rng = rand::thread_rng();
        let mut msg = vec![0u8; 100];
        rng.fill_bytes(&mut msg);

        // Split points that land mid-block exercise the resumable state.
        for splits in [[7usize, 16, 33], [1, 2, 3], [16, 32, 48]] {
            let mut one_shot = msg.clone();
            Cfb128::new(&key, iv).encrypt(&mut one_shot);
            let mut chunked = msg.clone();
            let mut cfb = Cfb128::new(&key, iv);
            let mut at = 0;
            for &split in &splits {
                cfb.encrypt(&mut chunked[at..split]);
                at = split;
            }
            cfb.encrypt(&mut chunked[at..]);
            assert_eq!(chunked, one_shot);

            let mut one_shot = msg.clone();
            Ofb128::new(&key, iv).apply_keystream(&mut one_shot);
            let mut chunked = msg.clone();
            let mut ofb = Ofb128::new(&key, iv);
            let mut at = 0;
            for &split in &splits {
                ofb.apply_keystream(&mut chunked[at..split]);
                at = split;
            }
            ofb.apply_keystream(&mut chunked[at..]);
            assert_eq!(chunked, one_shot);

            let mut one_shot = msg.clone();
            Ctr128::new(&key, iv).apply_keystream(&mut one_shot);
            let mut chunked = msg.clone();
            let mut ctr = Ctr128::new(&key, iv);
            let mut at = 0;
            for &split in &splits {
                ctr.apply_keystream(&mut chunked[at..split]);
                at = split;
            }
            ctr.apply_keystream(&mut chunked[at..]);
            assert_eq!(chunked, one_shot);
        }
    }

    #[test]
    fn ofb_and_ctr_are_involutions() {
        let (key, iv) = random_key_iv();
        let msg = b"short";

        let mut data = msg.to_vec();
        Ofb128::new(&key, iv).apply_keystream(&mut data);
        Ofb128::new(&key, iv).apply_keystream(&mut data);
        assert_eq!(&data[..], &msg[..]);

        let mut data = msg.to_vec();
        Ctr128::new(&key, iv).apply_keystream(&mut data);
        Ctr128::new(&key, iv).apply_keystream(&mut data);
        assert_eq!(&data[..], &msg[..]);
    }

    #[test]
    fn ctr_counter_wraps() {
        let mut counter = [0xffu8; SMS4_BLOCK_SIZE];
        increment_be(&mut counter);
        assert_eq!(counter, [0u8; SMS4_BLOCK_SIZE]);

        let mut counter = [0u8; SMS4_BLOCK_SIZE];
        counter[15] = 0xff;
        increment_be(&mut counter);
        assert_eq!(counter[14], 1);
        assert_eq!(counter[15], 0);
    }

    #[test]
    fn keystream_differs_per_iv() {
        let (key, iv) = random_key_iv();
        let mut iv2 = iv;
        iv2[15] ^= 1;

        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        Ctr128::new(&key, iv).apply_keystream(&mut a);
        Ctr128::new(&key, iv2).apply_keystream(&mut b);
        assert_ne!(a, b);
    }
}
