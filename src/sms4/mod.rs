//! The SMS4 block cipher (GB/T 32907): 128-bit blocks, 128-bit keys,
//! 32 rounds of an unbalanced Feistel network.
//!
//! [`Sms4Key`] holds an expanded round-key schedule. Decryption is the same
//! round function over the reversed schedule, so a key is expanded for one
//! direction at construction time and [`Sms4Key::encrypt_block`] serves both;
//! the mode layers in [`modes`] pick the direction they need. Schedules are
//! zeroized on drop.

use zeroize::Zeroize;

use crate::Error;

pub mod ede;
pub mod modes;
pub mod wrap;

/// Key length in bytes.
pub const SMS4_KEY_LENGTH: usize = 16;

/// Block size in bytes.
pub const SMS4_BLOCK_SIZE: usize = 16;

/// Number of rounds, which is also the number of round keys.
pub const SMS4_NUM_ROUNDS: usize = 32;

#[rustfmt::skip]
const SBOX: [u8; 256] = [
    0xd6, 0x90, 0xe9, 0xfe, 0xcc, 0xe1, 0x3d, 0xb7, 0x16, 0xb6, 0x14, 0xc2, 0x28, 0xfb, 0x2c, 0x05,
    0x2b, 0x67, 0x9a, 0x76, 0x2a, 0xbe, 0x04, 0xc3, 0xaa, 0x44, 0x13, 0x26, 0x49, 0x86, 0x06, 0x99,
    0x9c, 0x42, 0x50, 0xf4, 0x91, 0xef, 0x98, 0x7a, 0x33, 0x54, 0x0b, 0x43, 0xed, 0xcf, 0xac, 0x62,
    0xe4, 0xb3, 0x1c, 0xa9, 0xc9, 0x08, 0xe8, 0x95, 0x80, 0xdf, 0x94, 0xfa, 0x75, 0x8f, 0x3f, 0xa6,
    0x47, 0x07, 0xa7, 0xfc, 0xf3, 0x73, 0x17, 0xba, 0x83, 0x59, 0x3c, 0x19, 0xe6, 0x85, 0x4f, 0xa8,
    0x68, 0x6b, 0x81, 0xb2, 0x71, 0x64, 0xda, 0x8b, 0xf8, 0xeb, 0x0f, 0x4b, 0x70, 0x56, 0x9d, 0x35,
    0x1e, 0x24, 0x0e, 0x5e, 0x63, 0x58, 0xd1, 0xa2, 0x25, 0x22, 0x7c, 0x3b, 0x01, 0x21, 0x78, 0x87,
    0xd4, 0x00, 0x46, 0x57, 0x9f, 0xd3, 0x27, 0x52, 0x4c, 0x36, 0x02, 0xe7, 0xa0, 0xc4, 0xc8, 0x9e,
    0xea, 0xbf, 0x8a, 0xd2, 0x40, 0xc7, 0x38, 0xb5, 0xa3, 0xf7, 0xf2, 0xce, 0xf9, 0x61, 0x15, 0xa1,
    0xe0, 0xae, 0x5d, 0xa4, 0x9b, 0x34, 0x1a, 0x55, 0xad, 0x93, 0x32, 0x30, 0xf5, 0x8c, 0xb1, 0xe3,
    0x1d, 0xf6, 0xe2, 0x2e, 0x82, 0x66, 0xca, 0x60, 0xc0, 0x29, 0x23, 0xab, 0x0d, 0x53, 0x4e, 0x6f,
    0xd5, 0xdb, 0x37, 0x45, 0xde, 0xfd, 0x8e, 0x2f, 0x03, 0xff, 0x6a, 0x72, 0x6d, 0x6c, 0x5b, 0x51,
    0x8d, 0x1b, 0xaf, 0x92, 0xbb, 0xdd, 0xbc, 0x7f, 0x11, 0xd9, 0x5c, 0x41, 0x1f, 0x10, 0x5a, 0xd8,
    0x0a, 0xc1, 0x31, 0x88, 0xa5, 0xcd, 0x7b, 0xbd, 0x2d, 0x74, 0xd0, 0x12, 0xb8, 0xe5, 0xb4, 0xb0,
    0x89, 0x69, 0x97, 0x4a, 0x0c, 0x96, 0x77, 0x7e, 0x65, 0xb9, 0xf1, 0x09, 0xc5, 0x6e, 0xc6, 0x84,
    0x18, 0xf0, 0x7d, 0xec, 0x3a, 0xdc, 0x4d, 0x20, 0x79, 0xee, 0x5f, 0x3e, 0xd7, 0xcb, 0x39, 0x48,
];

/// The system parameter FK.
const FK: [u32; 4] = [0xa3b1bac6, 0x56aa3350, 0x677d9197, 0xb27022dc];

/// The fixed parameter CK: `CK[i][j] = (4i + j) * 7 mod 256`.
const CK: [u32; SMS4_NUM_ROUNDS] = {
    let mut ck = [0u32; SMS4_NUM_ROUNDS];
    let mut i = 0;
    while i < SMS4_NUM_ROUNDS {
        let mut word = 0u32;
        let mut j = 0;
        while j < 4 {
            word = (word << 8) | (((4 * i + j) * 7 % 256) as u32);
            j += 1;
        }
        ck[i] = word;
        i += 1;
    }
    ck
};

/// The nonlinear transformation tau: byte-wise S-box over a word.
fn tau(x: u32) -> u32 {
    let b = x.to_be_bytes();
    u32::from_be_bytes([
        SBOX[b[0] as usize],
        SBOX[b[1] as usize],
        SBOX[b[2] as usize],
        SBOX[b[3] as usize],
    ])
}

/// Round transformation T: tau followed by the linear transformation L.
fn t_enc(x: u32) -> u32 {
    let b = tau(x);
    b ^ b.rotate_left(2) ^ b.rotate_left(10) ^ b.rotate_left(18) ^ b.rotate_left(24)
}

/// Key-schedule transformation T': tau followed by L'.
fn t_key(x: u32) -> u32 {
    let b = tau(x);
    b ^ b.rotate_left(13) ^ b.rotate_left(23)
}

/// An expanded SMS4 key schedule for one direction.
#[derive(Clone)]
pub struct Sms4Key {
    rk: [u32; SMS4_NUM_ROUNDS],
}

impl Drop for Sms4Key {
    fn drop(&mut self) {
        self.rk.zeroize();
    }
}

impl Sms4Key {
    /// Expands `key` into an encryption schedule.
    pub fn new_encrypt(key: &[u8; SMS4_KEY_LENGTH]) -> Self {
        let mut k = [0u32; 4];
        for (i, chunk) in key.chunks_exact(4).enumerate() {
            k[i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) ^ FK[i];
        }

        let mut rk = [0u32; SMS4_NUM_ROUNDS];
        for (i, ck) in CK.iter().enumerate() {
            let next = k[0] ^ t_key(k[1] ^ k[2] ^ k[3] ^ ck);
            rk[i] = next;
            k = [k[1], k[2], k[3], next];
        }
        k.zeroize();
        Sms4Key { rk }
    }

    /// Expands `key` into a decryption schedule (the encryption schedule
    /// reversed).
    pub fn new_decrypt(key: &[u8; SMS4_KEY_LENGTH]) -> Self {
        let mut key = Self::new_encrypt(key);
        key.rk.reverse();
        key
    }

    /// Runs the 32-round cipher over one block with this schedule.
    ///
    /// With an encryption schedule this encrypts; with a decryption schedule
    /// it decrypts.
    pub fn encrypt_block(&self, block: &[u8; SMS4_BLOCK_SIZE]) -> [u8; SMS4_BLOCK_SIZE] {
        let mut x = [0u32; 4];
        for (i, chunk) in block.chunks_exact(4).enumerate() {
            x[i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        for rk in &self.rk {
            let next = x[0] ^ t_enc(x[1] ^ x[2] ^ x[3] ^ rk);
            x = [x[1], x[2], x[3], next];
        }

        let mut out = [0u8; SMS4_BLOCK_SIZE];
        // The final reverse transformation R: output words in reverse order.
        for (i, word) in x.iter().rev().enumerate() {
            out[4 * i..4 * i + 4].copy_from_slice(&word.to_be_bytes());
        }
        out
    }

    /// Processes eight consecutive blocks in place.
    pub fn encrypt_blocks8(&self, blocks: &mut [u8; 8 * SMS4_BLOCK_SIZE]) {
        self.encrypt_in_place(blocks);
    }

    /// Processes sixteen consecutive blocks in place.
    pub fn encrypt_blocks16(&self, blocks: &mut [u8; 16 * SMS4_BLOCK_SIZE]) {
        self.encrypt_in_place(blocks);
    }

    fn encrypt_in_place(&self, data: &mut [u8]) {
        for chunk in data.chunks_exact_mut(SMS4_BLOCK_SIZE) {
            let block = self.encrypt_block(arrayref::array_ref![chunk, 0, SMS4_BLOCK_SIZE]);
            chunk.copy_from_slice(&block);
        }
    }
}

pub(crate) fn check_whole_blocks(data: &[u8]) -> Result<(), Error> {
    if data.len() % SMS4_BLOCK_SIZE != 0 {
        return Err(Error::InvalidInput);
    }
    Ok(())
}
